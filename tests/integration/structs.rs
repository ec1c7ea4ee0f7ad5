mod common;
use common::{add_main, assert_in_order, builder, compile, compile_with_warnings, lines};

use goscript::ast::BinOp;
use goscript::ast::build::AstBuilder;
use goscript::ast::ObjId;
use goscript::diagnostics::CompileWarning;
use goscript::types::TypeId;

/// `type Point struct { X, Y int }` with its field objects.
fn point(b: &mut AstBuilder) -> (TypeId, ObjId, ObjId) {
    let int = b.int();
    let st = b.struct_type(&[("X", int), ("Y", int)]);
    let t = b.declare_type("Point", st);
    let x = b.field("X", int);
    let y = b.field("Y", int);
    (t, x, y)
}

#[test]
fn struct_becomes_a_class_with_boxed_fields() {
    let mut b = builder();
    point(&mut b);
    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &[
            "export class Point {",
            "public get X(): number {",
            "return this._fields.X.value",
            "public set X(value: number) {",
            "this._fields.X.value = value",
            "public _fields: {",
            "X: $.VarRef<number>;",
            "constructor(init?: Partial<{X?: number, Y?: number}>) {",
            "X: $.varRef(init?.X ?? 0),",
            "public clone(): Point {",
            "const cloned = new Point()",
            "return cloned",
        ],
    );

    let registration = lines(&out).into_iter().find(|l| l.starts_with("static __typeInfo")).unwrap();
    insta::assert_snapshot!(registration, @r#"static __typeInfo = $.registerStructType("example.com/app.Point", () => new Point(), [], Point, {"X": { kind: $.TypeKind.Basic, name: "int" }, "Y": { kind: $.TypeKind.Basic, name: "int" }})"#);
}

#[test]
fn keyed_literal_and_value_copy() {
    // p := Point{X: 1, Y: 2}; q := p
    let mut b = builder();
    let (t, x, y) = point(&mut b);
    let one = b.int_lit(1);
    let two = b.int_lit(2);
    let kx = b.field_value(x, one);
    let ky = b.field_value(y, two);
    let lit = b.composite(t, vec![kx, ky]);
    let p = b.var("p", t);
    let def_p = b.define(&[p], vec![lit]);
    let q = b.var("q", t);
    let p_ref = b.ident(p);
    let def_q = b.define(&[q], vec![p_ref]);
    add_main(&mut b, vec![def_p, def_q]);

    let out = compile(&b.finish());
    assert!(out.contains("let p = new Point({ X: 1, Y: 2 })"), "{out}");
    assert!(out.contains("let q = p.clone()"), "{out}");
}

#[test]
fn struct_comparison_is_by_value() {
    // println(p == q)
    let mut b = builder();
    let (t, _, _) = point(&mut b);
    let p = b.var("p", t);
    let q = b.var("q", t);
    let decl = b.var_decl(&[p, q], Some(t), vec![]);
    let l = b.ident(p);
    let r = b.ident(q);
    let eq = b.binary(BinOp::Eq, l, r);
    let print = b.call_builtin("println", vec![eq], None);
    let print = b.expr_stmt(print);
    add_main(&mut b, vec![decl, print]);

    let out = compile(&b.finish());
    assert!(out.contains("$.println($.structEquals(p, q))"), "{out}");
}

#[test]
fn value_receiver_method_is_a_class_member() {
    // func (p Point) Sum() int { return p.X + p.Y }
    let mut b = builder();
    let (t, x, y) = point(&mut b);
    let int = b.int();
    let sum = b.declare_method(t, "Sum", false, &[], &[int]);
    let recv = b.receiver("p", t);
    let p_ref = b.ident(recv);
    let px = b.selector(p_ref, x);
    let p_ref = b.ident(recv);
    let py = b.selector(p_ref, y);
    let total = b.binary(BinOp::Add, px, py);
    let ret = b.ret(vec![total]);
    let decl = b.method_decl(sum, Some(recv), t, &[], vec![ret]);
    b.add_func(decl);

    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &["export class Point {", "public Sum(): number {", "const p = this", "return p.X + p.Y", "static __typeInfo"],
    );
    assert!(out.contains("[\"Sum\"]"), "{out}");
}

#[test]
fn embedded_struct_promotes_its_fields() {
    // type Base struct { ID int }; type User struct { Base; Name string }
    let mut b = builder();
    let int = b.int();
    let string = b.string();
    let base_st = b.struct_type(&[("ID", int)]);
    let base = b.declare_type("Base", base_st);
    let user_st = b.struct_type_embedded(&[("Base", base, true), ("Name", string, false)]);
    b.declare_type("User", user_st);

    let out = compile(&b.finish());
    assert_in_order(&out, &["export class User {", "public get ID(): number {", "return this.Base.ID", "this.Base.ID = value"]);
}

#[test]
fn ambiguous_promotion_keeps_the_first_embedding() {
    // type A struct { X int }; type B struct { X int }; type C struct { A; B }
    let mut b = builder();
    let int = b.int();
    let a_st = b.struct_type(&[("X", int)]);
    let a = b.declare_type("A", a_st);
    let b_st = b.struct_type(&[("X", int)]);
    let bt = b.declare_type("B", b_st);
    let c_st = b.struct_type_embedded(&[("A", a, true), ("B", bt, true)]);
    b.declare_type("C", c_st);

    let (out, warnings) = compile_with_warnings(&b.finish());
    assert!(out.contains("return this.A.X"), "{out}");
    assert!(!out.contains("return this.B.X"), "{out}");
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    match &warnings[0] {
        CompileWarning::AmbiguousPromotion { type_name, member, kept, dropped } => {
            assert_eq!(type_name, "C");
            assert_eq!(member, "X");
            assert_eq!(kept, "A");
            assert_eq!(dropped, "B");
        }
        other => panic!("unexpected warning {other:?}"),
    }
}

#[test]
fn interface_becomes_a_type_and_a_registration() {
    let mut b = builder();
    let float = b.float64();
    let sig = b.signature(&[], &[float]);
    let iface = b.interface_type(&[("Area", sig)]);
    b.declare_type("Shape", iface);

    let out = compile(&b.finish());
    assert!(out.contains("export type Shape = "), "{out}");
    assert!(out.contains("$.registerInterfaceType(\"example.com/app.Shape\", null, "), "{out}");
}

#[test]
fn named_basic_type_methods_live_on_a_companion() {
    // type Celsius float64; func (c Celsius) Frozen() bool { return false }
    let mut b = builder();
    let float = b.float64();
    let celsius = b.declare_type("Celsius", float);
    let boolean = b.bool();
    let frozen = b.declare_method(celsius, "Frozen", false, &[], &[boolean]);
    let recv = b.receiver("c", celsius);
    let f = b.bool_lit(false);
    let ret = b.ret(vec![f]);
    let decl = b.method_decl(frozen, Some(recv), celsius, &[], vec![ret]);
    b.add_func(decl);

    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &["export type Celsius = number", "export const Celsius = {", "Frozen(c: Celsius): boolean {", "return false"],
    );
}

#[test]
fn pointer_receiver_sees_field_writes() {
    // func (p *Point) Move() { p.X = 5 }
    let mut b = builder();
    let (t, x, _) = point(&mut b);
    let ptr = b.pointer(t);
    let mv = b.declare_method(t, "Move", true, &[], &[]);
    let recv = b.receiver("p", ptr);
    let p_ref = b.ident(recv);
    let field = b.selector(p_ref, x);
    let five = b.int_lit(5);
    let store = b.assign(vec![field], vec![five]);
    let decl = b.method_decl(mv, Some(recv), ptr, &[], vec![store]);
    b.add_func(decl);

    let out = compile(&b.finish());
    assert_in_order(&out, &["public Move(): void {", "const p = this", "p!.X = 5"]);
}

#[test]
fn address_of_boxed_struct_passes_the_instance() {
    // func set(q *Point) { q.X = 7 }
    // func main() { s := Point{}; p := &s; set(&s); println(s.X) }
    // func fresh() *Point { s := Point{}; p := &s; return &s }
    let mut b = builder();
    let (t, x, _) = point(&mut b);
    let ptr = b.pointer(t);

    let set = b.declare_func("set", &[ptr], &[]);
    let q = b.param("q", ptr);
    let q_ref = b.ident(q);
    let field = b.selector(q_ref, x);
    let seven = b.int_lit(7);
    let store = b.assign(vec![field], vec![seven]);
    let decl = b.func_decl(set, &[q], vec![store]);
    b.add_func(decl);

    let s = b.var("s", t);
    let lit = b.composite(t, vec![]);
    let def_s = b.define(&[s], vec![lit]);
    let p = b.var("p", ptr);
    let s_ref = b.ident(s);
    let addr = b.addr_of(s_ref);
    let def_p = b.define(&[p], vec![addr]);
    let s_ref = b.ident(s);
    let addr = b.addr_of(s_ref);
    let call = b.call_func(set, vec![addr]);
    let call = b.expr_stmt(call);
    let s_ref = b.ident(s);
    let read = b.selector(s_ref, x);
    let show = b.call_builtin("println", vec![read], None);
    let show = b.expr_stmt(show);
    add_main(&mut b, vec![def_s, def_p, call, show]);

    let fresh = b.declare_func("fresh", &[], &[ptr]);
    let s2 = b.var("s", t);
    let lit = b.composite(t, vec![]);
    let def_s2 = b.define(&[s2], vec![lit]);
    let p2 = b.var("p", ptr);
    let s2_ref = b.ident(s2);
    let addr = b.addr_of(s2_ref);
    let def_p2 = b.define(&[p2], vec![addr]);
    let s2_ref = b.ident(s2);
    let addr = b.addr_of(s2_ref);
    let ret = b.ret(vec![addr]);
    let decl = b.func_decl(fresh, &[], vec![def_s2, def_p2, ret]);
    b.add_func(decl);

    let out = compile(&b.finish());
    assert_in_order(&out, &["function set(q: Point | null): void {", "q!.X = 7"]);
    assert_in_order(
        &out,
        &[
            "export function main(): void {",
            "let s = $.varRef(new Point())",
            "let p: $.VarRef<Point> | null = s",
            "set(s.value)",
            "$.println(s.value.X)",
        ],
    );
    assert_in_order(&out, &["function fresh(): Point | null {", "let p: $.VarRef<Point> | null = s", "return s.value"]);
    assert!(!out.contains("set(s)"), "{out}");
}

#[test]
fn method_expression_call_passes_the_receiver_first() {
    // func (p Point) Scale(k int) int { return p.X * k }
    // func main() { p := Point{}; println(Point.Scale(p, 3)) }
    let mut b = builder();
    let (t, x, _) = point(&mut b);
    let int = b.int();
    let scale = b.declare_method(t, "Scale", false, &[int], &[int]);
    let recv = b.receiver("p", t);
    let k = b.param("k", int);
    let p_ref = b.ident(recv);
    let px = b.selector(p_ref, x);
    let k_ref = b.ident(k);
    let product = b.binary(BinOp::Mul, px, k_ref);
    let ret = b.ret(vec![product]);
    let decl = b.method_decl(scale, Some(recv), t, &[k], vec![ret]);
    b.add_func(decl);

    let p = b.var("p", t);
    let lit = b.composite(t, vec![]);
    let def_p = b.define(&[p], vec![lit]);
    // `Point.Scale` has the receiver as its first parameter.
    let expr_sig = b.signature(&[t, int], &[int]);
    let base = b.type_expr(t);
    let sel = b.ident_for(scale);
    let method = b.expr(goscript::ast::ExprKind::Selector { base: Box::new(base), sel }, Some(expr_sig));
    let p_ref = b.ident(p);
    let three = b.int_lit(3);
    let call = b.call(method, vec![p_ref, three]);
    let show = b.call_builtin("println", vec![call], None);
    let show = b.expr_stmt(show);
    add_main(&mut b, vec![def_p, show]);

    let out = compile(&b.finish());
    assert!(out.contains("$.println(p.Scale(3))"), "{out}");
}
