mod common;
use common::{add_main, builder, compile, compile_err};

use std::path::Path;

use goscript::ast::Stmt;
use goscript::config::CompileConfig;
use goscript::diagnostics::CompileError;

#[test]
fn goto_is_rejected_with_its_location() {
    let mut b = builder();
    let jump = b.stmt(Stmt::Goto("L".into()));
    add_main(&mut b, vec![jump]);

    let err = compile_err(&b.finish());
    match &err {
        CompileError::Unsupported { msg, .. } => assert!(msg.contains("goto L"), "{msg}"),
        other => panic!("expected an unsupported-construct error, got {other:?}"),
    }
    assert!(err.span().is_some());
    assert!(err.to_string().starts_with("Unsupported construct: "), "{err}");
}

#[test]
fn define_with_mismatched_counts_is_an_arity_error() {
    // a, b := 1, 2, 3
    let mut bld = builder();
    let int = bld.int();
    let a = bld.var("a", int);
    let b = bld.var("b", int);
    let values = vec![bld.int_lit(1), bld.int_lit(2), bld.int_lit(3)];
    let def = bld.define(&[a, b], values);
    add_main(&mut bld, vec![def]);

    let err = compile_err(&bld.finish());
    assert!(matches!(err, CompileError::Arity { .. }), "{err:?}");
    assert!(err.to_string().contains("2 variables but 3 values"), "{err}");
}

#[test]
fn dot_import_is_unsupported() {
    let mut b = builder();
    b.import("strings", Some("."));
    add_main(&mut b, vec![]);

    let err = compile_err(&b.finish());
    assert!(matches!(err, CompileError::Unsupported { .. }), "{err:?}");
    assert!(err.to_string().contains("dot import of \"strings\""), "{err}");
}

#[test]
fn blank_import_is_kept_for_side_effects() {
    let mut b = builder();
    b.import("embed", Some("_"));
    add_main(&mut b, vec![]);

    let out = compile(&b.finish());
    assert!(out.contains("import \"@goscript/embed\""), "{out}");
    assert!(!out.contains("import * as _"), "{out}");
}

#[test]
fn malformed_package_json_is_an_input_error() {
    let err = goscript::load_package_json("{\"name\": \"main\"").unwrap_err();
    assert!(matches!(err, CompileError::Input { .. }), "{err:?}");
    assert!(err.to_string().starts_with("Invalid input: malformed package JSON"), "{err}");
    assert_eq!(err.span(), None);
}

#[test]
fn config_rejects_unknown_keys() {
    let err = CompileConfig::from_toml("[output]\nformat = \"esm\"\n", Path::new("goscript.toml")).unwrap_err();
    match err {
        CompileError::Config { msg, path } => {
            assert!(msg.contains("invalid syntax"), "{msg}");
            assert_eq!(path, Path::new("goscript.toml"));
        }
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[test]
fn config_rejects_empty_mapping() {
    let err = CompileConfig::from_toml("[imports.map]\n\"example.com/lib\" = \"\"\n", Path::new("goscript.toml"))
        .unwrap_err();
    assert!(err.to_string().contains("maps to an empty path"), "{err}");
}

#[test]
fn errors_without_source_still_render() {
    // No source text: ariadne is skipped and only the message is printed.
    let err = CompileError::codegen("nothing to point at");
    goscript::diagnostics::render_error(None, "index.go", &err);
    let err = CompileError::unsupported("goto L", goscript::span::Span::new(0, 4));
    goscript::diagnostics::render_error(Some("goto L"), "index.go", &err);
}
