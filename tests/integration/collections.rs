mod common;
use common::{add_main, assert_in_order, builder, compile};

use goscript::ast::build::AstBuilder;
use goscript::ast::{ObjId, Stmt};
use goscript::span::Spanned;
use goscript::types::TypeId;

fn print(b: &mut AstBuilder, value: Spanned<goscript::ast::Expr>) -> Spanned<Stmt> {
    let call = b.call_builtin("println", vec![value], None);
    b.expr_stmt(call)
}

/// `m := make(map[string]int)`
fn make_map(b: &mut AstBuilder) -> (ObjId, TypeId, Spanned<Stmt>) {
    let string = b.string();
    let int = b.int();
    let map = b.map(string, int);
    let m = b.var("m", map);
    let ty = b.type_expr(map);
    let make = b.call_builtin("make", vec![ty], Some(map));
    let stmt = b.define(&[m], vec![make]);
    (m, map, stmt)
}

#[test]
fn map_reads_writes_and_deletes() {
    // m["a"] = 1; println(m["b"]); delete(m, "a")
    let mut b = builder();
    let (m, _, def_m) = make_map(&mut b);
    let m_ref = b.ident(m);
    let key = b.str_lit("a");
    let slot = b.index(m_ref, key);
    let one = b.int_lit(1);
    let store = b.assign(vec![slot], vec![one]);

    let m_ref = b.ident(m);
    let key = b.str_lit("b");
    let read = b.index(m_ref, key);
    let show = print(&mut b, read);

    let m_ref = b.ident(m);
    let key = b.str_lit("a");
    let delete = b.call_builtin("delete", vec![m_ref, key], None);
    let delete = b.expr_stmt(delete);
    add_main(&mut b, vec![def_m, store, show, delete]);

    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &[
            "= new Map<string, number>()",
            "$.mapSet(m, \"a\", 1)",
            "$.println($.mapGet(m, \"b\", 0))",
            "$.mapDelete(m, \"a\")",
        ],
    );
}

#[test]
fn map_lookup_with_presence_flag() {
    // v, ok := m["a"]
    let mut b = builder();
    let (m, _, def_m) = make_map(&mut b);
    let int = b.int();
    let boolean = b.bool();
    let v = b.var("v", int);
    let ok = b.var("ok", boolean);
    let m_ref = b.ident(m);
    let key = b.str_lit("a");
    let lookup = b.index(m_ref, key);
    let def = b.define(&[v, ok], vec![lookup]);
    add_main(&mut b, vec![def_m, def]);

    let out = compile(&b.finish());
    assert!(out.contains("let [v, ok] = $.mapGetOk(m, \"a\", 0)"), "{out}");
}

#[test]
fn map_literal_and_range() {
    // m := map[string]int{"x": 1}; for k, v := range m { println(k, v) }
    let mut b = builder();
    let string = b.string();
    let int = b.int();
    let map = b.map(string, int);
    let key = b.str_lit("x");
    let one = b.int_lit(1);
    let entry = b.key_value(key, one);
    let lit = b.composite(map, vec![entry]);
    let m = b.var("m", map);
    let def_m = b.define(&[m], vec![lit]);

    let k = b.var("k", string);
    let v = b.var("v", int);
    let k_ref = b.ident(k);
    let v_ref = b.ident(v);
    let call = b.call_builtin("println", vec![k_ref, v_ref], None);
    let call = b.expr_stmt(call);
    let m_ref = b.ident(m);
    let range = b.range_stmt(Some(k), Some(v), m_ref, vec![call]);
    add_main(&mut b, vec![def_m, range]);

    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &[
            "new Map<string, number>([[\"x\", 1]])",
            "for (const [k, v] of $.mapEntries(m)) {",
            "$.println(k, v)",
        ],
    );
}

#[test]
fn slice_literal_append_and_len() {
    // xs := []int{1, 2}; xs = append(xs, 3); println(len(xs))
    let mut b = builder();
    let int = b.int();
    let slice = b.slice(int);
    let one = b.int_lit(1);
    let two = b.int_lit(2);
    let lit = b.composite(slice, vec![one, two]);
    let xs = b.var("xs", slice);
    let def = b.define(&[xs], vec![lit]);

    let xs_ref = b.ident(xs);
    let three = b.int_lit(3);
    let appended = b.call_builtin("append", vec![xs_ref, three], Some(slice));
    let target = b.ident(xs);
    let store = b.assign(vec![target], vec![appended]);

    let xs_ref = b.ident(xs);
    let len = b.call_builtin("len", vec![xs_ref], Some(int));
    let show = print(&mut b, len);
    add_main(&mut b, vec![def, store, show]);

    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &["let xs = $.arrayToSlice<number>([1, 2])", "xs = $.append(xs, 3)", "$.println($.len(xs))"],
    );
}

#[test]
fn make_copy_and_reslice() {
    // dst := make([]int, 3); copy(dst, src[1:])
    let mut b = builder();
    let int = b.int();
    let slice = b.slice(int);
    let src = b.var("src", slice);
    let decl_src = b.var_decl(&[src], Some(slice), vec![]);
    let ty = b.type_expr(slice);
    let three = b.int_lit(3);
    let make = b.call_builtin("make", vec![ty, three], Some(slice));
    let dst = b.var("dst", slice);
    let def_dst = b.define(&[dst], vec![make]);

    let src_ref = b.ident(src);
    let low = b.int_lit(1);
    let tail = b.slice_expr(src_ref, Some(low), None);
    let dst_ref = b.ident(dst);
    let copy = b.call_builtin("copy", vec![dst_ref, tail], Some(int));
    let copy = b.expr_stmt(copy);
    add_main(&mut b, vec![decl_src, def_dst, copy]);

    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &["let dst = $.makeSlice<number>(3, undefined, () => 0)", "$.copy(dst, $.goSlice(src, 1))"],
    );
}

#[test]
fn fixed_arrays_are_plain_arrays() {
    // var a [3]int; a[0] = 5
    let mut b = builder();
    let int = b.int();
    let array = b.array(3, int);
    let a = b.var("a", array);
    let decl = b.var_decl(&[a], Some(array), vec![]);
    let a_ref = b.ident(a);
    let zero = b.int_lit(0);
    let slot = b.index(a_ref, zero);
    let five = b.int_lit(5);
    let store = b.assign(vec![slot], vec![five]);
    add_main(&mut b, vec![decl, store]);

    let out = compile(&b.finish());
    assert!(out.contains("= [0, 0, 0]"), "{out}");
    assert!(out.contains("a[0] = 5"), "{out}");
    assert!(!out.contains("a![0]"), "{out}");
}

#[test]
fn comma_ok_type_assertion() {
    // var x any; n, ok := x.(int)
    let mut b = builder();
    let any = b.empty_interface();
    let int = b.int();
    let boolean = b.bool();
    let x = b.var("x", any);
    let decl = b.var_decl(&[x], Some(any), vec![]);
    let n = b.var("n", int);
    let ok = b.var("ok", boolean);
    let x_ref = b.ident(x);
    let assert = b.type_assert_ok(x_ref, int);
    let def = b.define(&[n, ok], vec![assert]);
    add_main(&mut b, vec![decl, def]);

    let out = compile(&b.finish());
    assert!(
        out.contains(
            "let { value: n, ok: ok } = $.typeAssertOk<number>(x, { kind: $.TypeKind.Basic, name: \"int\" }, 0)"
        ),
        "{out}"
    );
}

#[test]
fn range_over_string_yields_runes() {
    // var s string; for i, r := range s { println(i, r) }
    let mut b = builder();
    let string = b.string();
    let int = b.int();
    let s = b.var("s", string);
    let decl = b.var_decl(&[s], Some(string), vec![]);
    let i = b.var("i", int);
    let r = b.var("r", int);
    let i_ref = b.ident(i);
    let r_ref = b.ident(r);
    let call = b.call_builtin("println", vec![i_ref, r_ref], None);
    let call = b.expr_stmt(call);
    let s_ref = b.ident(s);
    let range = b.range_stmt(Some(i), Some(r), s_ref, vec![call]);
    add_main(&mut b, vec![decl, range]);

    let out = compile(&b.finish());
    assert_in_order(&out, &["for (const [i, r] of $.stringRange(s)) {", "$.println(i, r)"]);
}

#[test]
fn range_over_pointer_to_array_reads_the_box() {
    // func sum(p *[3]int) { for i, v := range p { println(i, v) } }
    let mut b = builder();
    let int = b.int();
    let array = b.array(3, int);
    let ptr = b.pointer(array);
    let sum = b.declare_func("sum", &[ptr], &[]);
    let p = b.param("p", ptr);
    let i = b.var("i", int);
    let v = b.var("v", int);
    let i_ref = b.ident(i);
    let v_ref = b.ident(v);
    let call = b.call_builtin("println", vec![i_ref, v_ref], None);
    let call = b.expr_stmt(call);
    let p_ref = b.ident(p);
    let range = b.range_stmt(Some(i), Some(v), p_ref, vec![call]);
    let decl = b.func_decl(sum, &[p], vec![range]);
    b.add_func(decl);

    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &[
            "const _range_1 = p!.value",
            "for (let i = 0, _n_1 = $.len(_range_1); i < _n_1; i++) {",
            "let v = _range_1[i]",
            "$.println(i, v)",
        ],
    );
}

#[test]
fn range_operand_is_evaluated_once() {
    // for _, v := range xs { xs = nil; println(v) }
    let mut b = builder();
    let int = b.int();
    let slice = b.slice(int);
    let xs = b.var("xs", slice);
    let decl = b.var_decl(&[xs], Some(slice), vec![]);
    let v = b.var("v", int);
    let target = b.ident(xs);
    let nil = b.nil(Some(slice));
    let clear = b.assign(vec![target], vec![nil]);
    let v_ref = b.ident(v);
    let show = print(&mut b, v_ref);
    let xs_ref = b.ident(xs);
    let range = b.range_stmt(None, Some(v), xs_ref, vec![clear, show]);
    add_main(&mut b, vec![decl, range]);

    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &[
            "const _range_1 = xs",
            "for (let _i_1 = 0, _n_1 = $.len(_range_1); _i_1 < _n_1; _i_1++) {",
            "let v = _range_1![_i_1]",
            "xs = null",
            "$.println(v)",
        ],
    );
}
