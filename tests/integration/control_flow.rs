mod common;
use common::{add_func, add_main, assert_in_order, builder, compile, compile_err, lines};

use goscript::ast::build::AstBuilder;
use goscript::ast::{BinOp, ObjId, Stmt};
use goscript::diagnostics::CompileError;
use goscript::span::Spanned;

fn println(b: &mut AstBuilder, value: i64) -> Spanned<Stmt> {
    let arg = b.int_lit(value);
    let call = b.call_builtin("println", vec![arg], None);
    b.expr_stmt(call)
}

fn int_var(b: &mut AstBuilder, name: &str, init: i64) -> (ObjId, Spanned<Stmt>) {
    let int = b.int();
    let v = b.var(name, int);
    let value = b.int_lit(init);
    let stmt = b.define(&[v], vec![value]);
    (v, stmt)
}

#[test]
fn if_else_chain() {
    let mut b = builder();
    let (x, def_x) = int_var(&mut b, "x", 3);
    let x_ref = b.ident(x);
    let two = b.int_lit(2);
    let inner_cond = b.binary(BinOp::Eq, x_ref, two);
    let p2 = println(&mut b, 2);
    let p3 = println(&mut b, 3);
    let inner = b.if_stmt(inner_cond, vec![p2], Some(vec![p3]));
    let x_ref = b.ident(x);
    let one = b.int_lit(1);
    let cond = b.binary(BinOp::Lt, x_ref, one);
    let p1 = println(&mut b, 1);
    // `else if` arrives as an `if` statement wrapped in a block.
    let outer = b.if_stmt(cond, vec![p1], Some(vec![inner]));
    add_main(&mut b, vec![def_x, outer]);

    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &["let x = 3", "if (x < 1) {", "$.println(1)", "} else {", "if (x === 2) {", "$.println(2)", "} else {", "$.println(3)"],
    );
}

#[test]
fn three_clause_loop() {
    // for i := 0; i < 3; i++ { println(i) }
    let mut b = builder();
    let (i, init) = int_var(&mut b, "i", 0);
    let i_ref = b.ident(i);
    let three = b.int_lit(3);
    let cond = b.binary(BinOp::Lt, i_ref, three);
    let i_ref = b.ident(i);
    let post = b.inc(i_ref);
    let i_ref = b.ident(i);
    let print = b.call_builtin("println", vec![i_ref], None);
    let print = b.expr_stmt(print);
    let lp = b.for_stmt(Some(init), Some(cond), Some(post), vec![print]);
    add_main(&mut b, vec![lp]);

    let out = compile(&b.finish());
    assert!(out.contains("for (let i = 0; i < 3; i++) {"), "{out}");
    assert!(out.contains("$.println(i)"), "{out}");
}

#[test]
fn condition_only_and_infinite_loops() {
    let mut b = builder();
    let (n, def_n) = int_var(&mut b, "n", 0);
    let n_ref = b.ident(n);
    let ten = b.int_lit(10);
    let cond = b.binary(BinOp::Lt, n_ref, ten);
    let n_ref = b.ident(n);
    let inc = b.inc(n_ref);
    let while_loop = b.for_stmt(None, Some(cond), None, vec![inc]);
    let brk = b.brk(None);
    let forever = b.for_stmt(None, None, None, vec![brk]);
    add_main(&mut b, vec![def_n, while_loop, forever]);

    let out = compile(&b.finish());
    assert_in_order(&out, &["while (n < 10) {", "n++", "for (;;) {", "break"]);
}

#[test]
fn labeled_break_out_of_nested_loops() {
    let mut b = builder();
    let brk = b.brk(Some("outer"));
    let inner = b.for_stmt(None, None, None, vec![brk]);
    let outer = b.for_stmt(None, None, None, vec![inner]);
    let labeled = b.labeled("outer", outer);
    add_main(&mut b, vec![labeled]);

    let out = compile(&b.finish());
    assert_in_order(&out, &["outer: for (;;) {", "for (;;) {", "break outer"]);
}

#[test]
fn switch_with_fallthrough_and_default() {
    // switch x { case 1: println(1); fallthrough; case 2, 3: println(2); default: println(0) }
    let mut b = builder();
    let (x, def_x) = int_var(&mut b, "x", 1);
    let one = b.int_lit(1);
    let p1 = println(&mut b, 1);
    let fall = b.stmt(Stmt::Fallthrough);
    let c1 = b.case(vec![one], vec![p1, fall]);
    let two = b.int_lit(2);
    let three = b.int_lit(3);
    let p2 = println(&mut b, 2);
    let c2 = b.case(vec![two, three], vec![p2]);
    let p0 = println(&mut b, 0);
    let dflt = b.case(vec![], vec![p0]);
    let tag = b.ident(x);
    let sw = b.switch_stmt(Some(tag), vec![c1, c2, dflt]);
    add_main(&mut b, vec![def_x, sw]);

    let out = compile(&b.finish());
    let ls = lines(&out);
    let case1 = ls.iter().position(|l| l == "case 1: {").expect("case 1");
    assert_eq!(ls[case1 + 1], "$.println(1)");
    // Falls into the next case: no break before it.
    assert_eq!(ls[case1 + 2], "}");
    assert_eq!(ls[case1 + 3], "case 2:");
    assert_eq!(ls[case1 + 4], "case 3: {");
    assert_in_order(&out, &["switch (x) {", "case 3: {", "$.println(2)", "break", "default: {", "$.println(0)", "break"]);
}

#[test]
fn tagless_switch_matches_true() {
    let mut b = builder();
    let (x, def_x) = int_var(&mut b, "x", 5);
    let x_ref = b.ident(x);
    let zero = b.int_lit(0);
    let cond = b.binary(BinOp::Gt, x_ref, zero);
    let p = println(&mut b, 1);
    let c = b.case(vec![cond], vec![p]);
    let sw = b.switch_stmt(None, vec![c]);
    add_main(&mut b, vec![def_x, sw]);

    let out = compile(&b.finish());
    assert_in_order(&out, &["switch (true) {", "case x > 0: {"]);
}

#[test]
fn type_switch_binds_the_narrowed_value() {
    // switch v := x.(type) { case int: println(v); default: println(0) }
    let mut b = builder();
    let any = b.empty_interface();
    let int = b.int();
    let x = b.var("x", any);
    let decl = b.var_decl(&[x], Some(any), vec![]);
    let v_int = b.var("v", int);
    let v_ref = b.ident(v_int);
    let print = b.call_builtin("println", vec![v_ref], None);
    let print = b.expr_stmt(print);
    let case_int = b.type_case(vec![Some(int)], Some(v_int), vec![print]);
    let v_any = b.var("v", any);
    let p0 = println(&mut b, 0);
    let dflt = b.type_case(vec![], Some(v_any), vec![p0]);
    let subject = b.ident(x);
    let ts = b.type_switch(Some("v"), subject, vec![case_int, dflt]);
    add_main(&mut b, vec![decl, ts]);

    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &[
            "$.typeSwitch(x, [",
            "{ types: [{ kind: $.TypeKind.Basic, name: \"int\" }], body: (v: number) => {",
            "$.println(v)",
            "], (v: any) => {",
            "$.println(0)",
        ],
    );
}

#[test]
fn deferred_calls_run_from_a_disposal_stack() {
    // defer println(1); println(2)
    let mut b = builder();
    let arg = b.int_lit(1);
    let deferred = b.call_builtin("println", vec![arg], None);
    let defer = b.defer_stmt(deferred);
    let p2 = println(&mut b, 2);
    add_main(&mut b, vec![defer, p2]);

    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &[
            "export function main(): void {",
            "const __defer = new $.DisposableStack()",
            "try {",
            "__defer.defer(() => { $.println(1) })",
            "$.println(2)",
            "} catch (_e) {",
            "__defer.fail(_e)",
            "} finally {",
            "__defer.dispose()",
        ],
    );
}

#[test]
fn inner_scope_shadowing_gets_a_fresh_name() {
    // x := 1; { x := x + 1; println(x) }; println(x)
    let mut b = builder();
    let (x, def_x) = int_var(&mut b, "x", 1);
    let int = b.int();
    let inner_x = b.var("x", int);
    let x_ref = b.ident(x);
    let one = b.int_lit(1);
    let sum = b.binary(BinOp::Add, x_ref, one);
    let def_inner = b.define(&[inner_x], vec![sum]);
    let inner_ref = b.ident(inner_x);
    let print_inner = b.call_builtin("println", vec![inner_ref], None);
    let print_inner = b.expr_stmt(print_inner);
    let block = b.block(vec![def_inner, print_inner]);
    let block = b.stmt(Stmt::Block(block));
    let x_ref = b.ident(x);
    let print_outer = b.call_builtin("println", vec![x_ref], None);
    let print_outer = b.expr_stmt(print_outer);
    add_main(&mut b, vec![def_x, block, print_outer]);

    let out = compile(&b.finish());
    assert_in_order(&out, &["let x = 1", "let x_1 = x + 1", "$.println(x_1)", "$.println(x)"]);
}

#[test]
fn swap_and_integer_division() {
    // a, b := 7, 2; a, b = b, a; println(a / b)
    let mut bld = builder();
    let int = bld.int();
    let a = bld.var("a", int);
    let b_var = bld.var("b", int);
    let seven = bld.int_lit(7);
    let two = bld.int_lit(2);
    let def = bld.define(&[a, b_var], vec![seven, two]);
    let la = bld.ident(a);
    let lb = bld.ident(b_var);
    let ra = bld.ident(a);
    let rb = bld.ident(b_var);
    let swap = bld.assign(vec![la, lb], vec![rb, ra]);
    let l = bld.ident(a);
    let r = bld.ident(b_var);
    let div = bld.binary(BinOp::Div, l, r);
    let print = bld.call_builtin("println", vec![div], None);
    let print = bld.expr_stmt(print);
    add_main(&mut bld, vec![def, swap, print]);

    let out = compile(&bld.finish());
    assert_in_order(&out, &["let a = 7", "let b = 2", ";[a, b] = [b, a]", "$.println($.idiv(a, b))"]);
}

#[test]
fn range_over_slice_binds_index_and_value() {
    let mut b = builder();
    let int = b.int();
    let slice = b.slice(int);
    let xs = b.var("xs", slice);
    let decl = b.var_decl(&[xs], Some(slice), vec![]);
    let i = b.var("i", int);
    let v = b.var("v", int);
    let v_ref = b.ident(v);
    let print = b.call_builtin("println", vec![v_ref], None);
    let print = b.expr_stmt(print);
    let xs_ref = b.ident(xs);
    let range = b.range_stmt(Some(i), Some(v), xs_ref, vec![print]);
    add_main(&mut b, vec![decl, range]);

    let out = compile(&b.finish());
    assert!(out.contains("const _range_1 = xs"), "{out}");
    assert!(out.contains("$.len(_range_1); i < _n_1; i++) {"), "{out}");
    assert!(out.contains("_range_1![i]"), "{out}");
    assert!(out.contains("$.println(v)"), "{out}");
}

#[test]
fn range_over_integer() {
    let mut b = builder();
    let int = b.int();
    let i = b.var("i", int);
    let i_ref = b.ident(i);
    let print = b.call_builtin("println", vec![i_ref], None);
    let print = b.expr_stmt(print);
    let n = b.int_lit(3);
    let range = b.range_stmt(Some(i), None, n, vec![print]);
    add_main(&mut b, vec![range]);

    let out = compile(&b.finish());
    assert!(out.contains("for (let i = 0, _n_1 = 3; i < _n_1; i++) {"), "{out}");
}

#[test]
fn deferred_closure_can_change_a_named_result() {
    // func double() (n int) { defer func() { n = n * 2 }(); return 1 }
    let mut b = builder();
    let int = b.int();
    let double = b.declare_func("double", &[], &[int]);
    let n = b.named_result("n", int);
    let target = b.ident(n);
    let n_ref = b.ident(n);
    let two = b.int_lit(2);
    let product = b.binary(BinOp::Mul, n_ref, two);
    let store = b.assign(vec![target], vec![product]);
    let lit = b.func_lit(vec![], &[], vec![store]);
    let call = b.call(lit, vec![]);
    let defer = b.defer_stmt(call);
    let one = b.int_lit(1);
    let ret = b.ret(vec![one]);
    let decl = b.func_decl_named(double, &[], &[n], vec![defer, ret]);
    b.add_func(decl);

    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &[
            "export function double(): number {",
            "let n: number = 0",
            "const __defer = new $.DisposableStack()",
            "__body: try {",
            "__defer.defer((): void => {",
            "n = n * 2",
            "n = 1",
            "break __body",
            "} catch (_e) {",
            "__defer.fail(_e)",
            "__defer.dispose()",
            "return n",
        ],
    );
}

#[test]
fn recover_in_a_deferred_closure() {
    // func safe() { defer func() { r := recover(); println(r) }(); panic("boom") }
    let mut b = builder();
    let any = b.empty_interface();
    let r = b.var("r", any);
    let rec = b.call_builtin("recover", vec![], Some(any));
    let def_r = b.define(&[r], vec![rec]);
    let r_ref = b.ident(r);
    let show = b.call_builtin("println", vec![r_ref], None);
    let show = b.expr_stmt(show);
    let lit = b.func_lit(vec![], &[], vec![def_r, show]);
    let call = b.call(lit, vec![]);
    let defer = b.defer_stmt(call);
    let msg = b.str_lit("boom");
    let boom = b.call_builtin("panic", vec![msg], None);
    let boom = b.expr_stmt(boom);
    add_func(&mut b, "safe", vec![defer, boom]);

    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &[
            "export function safe(): void {",
            "const __defer = new $.DisposableStack()",
            "try {",
            "__defer.defer((): void => {",
            "= $.recover()",
            "$.println(r)",
            "$.panic(\"boom\")",
            "} catch (_e) {",
            "__defer.fail(_e)",
            "} finally {",
            "__defer.dispose()",
        ],
    );
    assert!(!out.contains("__body"), "{out}");
}

/// `func each(seq func(yield func(string, int) bool), ch chan int)` whose range body
/// is `body_of(k, v, ch)`.
fn range_over_func(
    body_of: impl FnOnce(&mut AstBuilder, ObjId, ObjId, ObjId) -> Vec<Spanned<Stmt>>,
) -> goscript::ast::Package {
    let mut b = builder();
    let string = b.string();
    let int = b.int();
    let boolean = b.bool();
    let yield_ty = b.signature(&[string, int], &[boolean]);
    let seq_ty = b.signature(&[yield_ty], &[]);
    let chan = b.chan(goscript::types::ChanDir::Both, int);
    let each = b.declare_func("each", &[seq_ty, chan], &[]);
    let seq = b.param("seq", seq_ty);
    let ch = b.param("ch", chan);
    let k = b.var("k", string);
    let v = b.var("v", int);
    let body = body_of(&mut b, k, v, ch);
    let seq_ref = b.ident(seq);
    let range = b.range_stmt(Some(k), Some(v), seq_ref, body);
    let decl = b.func_decl(each, &[seq, ch], vec![range]);
    b.add_func(decl);
    b.finish()
}

#[test]
fn range_over_func_becomes_a_yield_callback() {
    let pkg = range_over_func(|b, k, v, _| {
        let k_ref = b.ident(k);
        let v_ref = b.ident(v);
        let call = b.call_builtin("println", vec![k_ref, v_ref], None);
        vec![b.expr_stmt(call)]
    });

    let out = compile(&pkg);
    assert_in_order(&out, &["seq((k: string, v: number): boolean => {", "$.println(k, v)", "return true", "})"]);
}

#[test]
fn range_over_func_body_that_blocks_is_unsupported() {
    let pkg = range_over_func(|b, _, _, ch| {
        let ch_ref = b.ident(ch);
        let recv = b.recv(ch_ref);
        vec![b.expr_stmt(recv)]
    });

    let err = compile_err(&pkg);
    assert!(matches!(err, CompileError::Unsupported { .. }), "{err:?}");
    assert!(err.to_string().contains("range-over-func body that blocks"), "{err}");
}
