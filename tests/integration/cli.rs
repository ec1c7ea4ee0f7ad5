mod common;
use common::{add_main, builder, goscript};

use std::path::Path;

use goscript::ast::Package;

/// `func main() { ch := make(chan int, 1); ch <- 1; println(<-ch) }`
fn channel_package() -> Package {
    let mut b = builder();
    let int = b.int();
    let chan = b.chan(goscript::types::ChanDir::Both, int);
    let ch = b.var("ch", chan);
    let ty = b.type_expr(chan);
    let cap = b.int_lit(1);
    let make = b.call_builtin("make", vec![ty, cap], Some(chan));
    let def = b.define(&[ch], vec![make]);
    let ch_ref = b.ident(ch);
    let one = b.int_lit(1);
    let send = b.send(ch_ref, one);
    let ch_ref = b.ident(ch);
    let recv = b.recv(ch_ref);
    let print = b.call_builtin("println", vec![recv], None);
    let print = b.expr_stmt(print);
    add_main(&mut b, vec![def, send, print]);
    b.finish()
}

fn write_package(dir: &Path, pkg: &Package) -> std::path::PathBuf {
    let path = dir.join("app.json");
    std::fs::write(&path, serde_json::to_string(pkg).unwrap()).unwrap();
    path
}

#[test]
fn compile_writes_module_and_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_package(dir.path(), &channel_package());
    let out_dir = dir.path().join("out");

    let output = goscript().arg("compile").arg(&input).arg("-o").arg(&out_dir).output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let module = out_dir.join("example.com/app/index.ts");
    let source = std::fs::read_to_string(&module).unwrap();
    assert!(source.starts_with("// Code generated by goscript. DO NOT EDIT."), "{source}");
    assert!(source.contains("export async function main(): Promise<void> {"), "{source}");
    assert!(out_dir.join("builtin.ts").is_file());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("index.ts"), "{stdout}");
    assert!(stdout.contains("builtin.ts"), "{stdout}");
}

#[test]
fn no_runtime_flag_skips_the_support_module() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_package(dir.path(), &channel_package());
    let out_dir = dir.path().join("out");

    let output =
        goscript().arg("compile").arg(&input).arg("-o").arg(&out_dir).arg("--no-runtime").output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(out_dir.join("example.com/app/index.ts").is_file());
    assert!(!out_dir.join("builtin.ts").exists());
}

#[test]
fn config_file_next_to_the_input_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_package(dir.path(), &channel_package());
    std::fs::write(
        dir.path().join("goscript.toml"),
        "[output]\ndir = \"ts\"\nemit_runtime = false\n\n[imports]\nruntime = \"./builtin\"\n",
    )
    .unwrap();

    let output = goscript().current_dir(dir.path()).arg("compile").arg(&input).output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let source = std::fs::read_to_string(dir.path().join("ts/example.com/app/index.ts")).unwrap();
    assert!(source.contains("import * as $ from \"./builtin\""), "{source}");
}

#[test]
fn analyze_prints_facts() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_package(dir.path(), &channel_package());

    let output = goscript().arg("analyze").arg(&input).output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("package main (example.com/app)"), "{stdout}");
    assert!(stdout.contains("functions:"), "{stdout}");
    assert!(stdout.contains("  func main: async"), "{stdout}");
    assert!(stdout.contains("fixpoint iterations:"), "{stdout}");
}

#[test]
fn malformed_input_exits_with_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.json");
    std::fs::write(&input, "{ not json").unwrap();

    let output = goscript().arg("compile").arg(&input).arg("-o").arg(dir.path().join("out")).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("malformed package JSON"), "{stderr}");
    assert!(!dir.path().join("out").exists());
}

#[test]
fn missing_input_reports_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("missing.json");

    let output = goscript().arg("analyze").arg(&input).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error[io]"), "{stderr}");
    assert!(stderr.contains("missing.json"), "{stderr}");
}
