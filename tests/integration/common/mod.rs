#![allow(dead_code)]

use std::process::Command;

use goscript::analysis::Analysis;
use goscript::ast::build::AstBuilder;
use goscript::ast::{ObjId, Package, Stmt};
use goscript::span::Spanned;
use goscript::config::CompileConfig;
use goscript::diagnostics::{CompileError, CompileWarning};

pub const PKG_PATH: &str = "example.com/app";

pub fn goscript() -> Command {
    Command::new(env!("CARGO_BIN_EXE_goscript"))
}

/// A builder for package `main` at `example.com/app`.
pub fn builder() -> AstBuilder {
    AstBuilder::new("main", PKG_PATH)
}

/// Declare `func name()` with `body` and add it to the package.
pub fn add_func(b: &mut AstBuilder, name: &str, body: Vec<Spanned<Stmt>>) -> ObjId {
    let f = b.declare_func(name, &[], &[]);
    let decl = b.func_decl(f, &[], body);
    b.add_func(decl);
    f
}

/// Declare `func main()` with `body`.
pub fn add_main(b: &mut AstBuilder, body: Vec<Spanned<Stmt>>) -> ObjId {
    add_func(b, "main", body)
}

/// Generated TypeScript for the package. Panics with the error on failure.
pub fn compile(pkg: &Package) -> String {
    match goscript::compile_package(pkg, &CompileConfig::default()) {
        Ok(out) => out.files.into_iter().next().map(|f| f.source).unwrap_or_default(),
        Err(err) => panic!("compilation failed: {err}"),
    }
}

pub fn compile_with_warnings(pkg: &Package) -> (String, Vec<CompileWarning>) {
    match goscript::compile_package(pkg, &CompileConfig::default()) {
        Ok(out) => {
            let source = out.files.into_iter().next().map(|f| f.source).unwrap_or_default();
            (source, out.warnings)
        }
        Err(err) => panic!("compilation failed: {err}"),
    }
}

pub fn compile_err(pkg: &Package) -> CompileError {
    match goscript::compile_package(pkg, &CompileConfig::default()) {
        Ok(out) => panic!(
            "expected an error, got:\n{}",
            out.files.into_iter().next().map(|f| f.source).unwrap_or_default()
        ),
        Err(err) => err,
    }
}

pub fn analyze(pkg: &Package) -> Analysis {
    goscript::analyze_package(pkg)
}

/// The lines of `source` with indentation removed, for order-sensitive checks.
pub fn lines(source: &str) -> Vec<String> {
    source.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()).collect()
}

/// Assert that every fragment occurs in `source`, in the given order.
pub fn assert_in_order(source: &str, fragments: &[&str]) {
    let mut from = 0;
    for fragment in fragments {
        match source[from..].find(fragment) {
            Some(pos) => from += pos + fragment.len(),
            None => panic!("missing (or out of order) `{fragment}` in:\n{source}"),
        }
    }
}
