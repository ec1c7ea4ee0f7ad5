mod common;
use common::{add_func, add_main, analyze, builder};

use goscript::ast::build::AstBuilder;
use goscript::ast::{CommOp, ObjId};
use goscript::types::{ChanDir, TypeId};

fn int_chan(b: &mut AstBuilder) -> TypeId {
    let int = b.int();
    b.chan(ChanDir::Both, int)
}

/// A function taking `ch chan int` with the body built by `body`.
fn chan_func<F>(b: &mut AstBuilder, name: &str, body: F) -> ObjId
where
    F: FnOnce(&mut AstBuilder, ObjId) -> Vec<goscript::span::Spanned<goscript::ast::Stmt>>,
{
    let chan = int_chan(b);
    let f = b.declare_func(name, &[chan], &[]);
    let p = b.param("ch", chan);
    let stmts = body(b, p);
    let decl = b.func_decl(f, &[p], stmts);
    b.add_func(decl);
    f
}

#[test]
fn address_of_boxes_only_the_source() {
    let mut b = builder();
    let int = b.int();
    let ptr = b.pointer(int);
    let v = b.var("v", int);
    let p = b.var("p", ptr);
    let q = b.var("q", ptr);
    let zero = b.int_lit(0);
    let def_v = b.define(&[v], vec![zero]);
    let v_ref = b.ident(v);
    let addr = b.addr_of(v_ref);
    let def_p = b.define(&[p], vec![addr]);
    let p_ref = b.ident(p);
    let def_q = b.define(&[q], vec![p_ref]);
    add_main(&mut b, vec![def_v, def_p, def_q]);

    let analysis = analyze(&b.finish());
    assert!(analysis.obj_needs_boxing(v));
    assert!(!analysis.obj_needs_boxing(p));
    assert!(!analysis.obj_needs_boxing(q));
}

#[test]
fn pointer_to_pointer_boxes_both_levels() {
    // v := 1; p := &v; pp := &p
    let mut b = builder();
    let int = b.int();
    let ptr = b.pointer(int);
    let pptr = b.pointer(ptr);
    let v = b.var("v", int);
    let p = b.var("p", ptr);
    let pp = b.var("pp", pptr);
    let one = b.int_lit(1);
    let def_v = b.define(&[v], vec![one]);
    let v_ref = b.ident(v);
    let addr = b.addr_of(v_ref);
    let def_p = b.define(&[p], vec![addr]);
    let p_ref = b.ident(p);
    let addr = b.addr_of(p_ref);
    let def_pp = b.define(&[pp], vec![addr]);
    add_main(&mut b, vec![def_v, def_p, def_pp]);

    let analysis = analyze(&b.finish());
    assert!(analysis.obj_needs_boxing(v));
    assert!(analysis.obj_needs_boxing(p));
    assert!(!analysis.obj_needs_boxing(pp));
}

#[test]
fn pointer_method_on_non_struct_value_takes_its_address() {
    // type Counter int; func (c *Counter) Inc() {}; var c Counter; c.Inc()
    let mut b = builder();
    let int = b.int();
    let counter = b.declare_type("Counter", int);
    let counter_ptr = b.pointer(counter);
    let inc = b.declare_method(counter, "Inc", true, &[], &[]);
    let decl = b.method_decl(inc, None, counter_ptr, &[], vec![]);
    b.add_func(decl);

    let c = b.var("c", counter);
    let decl_c = b.var_decl(&[c], Some(counter), vec![]);
    let c_ref = b.ident(c);
    let call = b.method_call(c_ref, inc, vec![]);
    let call = b.expr_stmt(call);
    add_main(&mut b, vec![decl_c, call]);

    let analysis = analyze(&b.finish());
    assert!(analysis.obj_needs_boxing(c));
}

#[test]
fn struct_values_are_not_boxed_for_pointer_methods() {
    let mut b = builder();
    let st = b.struct_type(&[]);
    let t = b.declare_type("T", st);
    let t_ptr = b.pointer(t);
    let touch = b.declare_method(t, "Touch", true, &[], &[]);
    let decl = b.method_decl(touch, None, t_ptr, &[], vec![]);
    b.add_func(decl);
    let s = b.var("s", t);
    let decl_s = b.var_decl(&[s], Some(t), vec![]);
    let s_ref = b.ident(s);
    let call = b.method_call(s_ref, touch, vec![]);
    let call = b.expr_stmt(call);
    add_main(&mut b, vec![decl_s, call]);

    let analysis = analyze(&b.finish());
    assert!(!analysis.obj_needs_boxing(s));
}

#[test]
fn channel_operations_are_direct_suspension_points() {
    let mut b = builder();
    let sender = chan_func(&mut b, "sender", |b, ch| {
        let ch_ref = b.ident(ch);
        let one = b.int_lit(1);
        vec![b.send(ch_ref, one)]
    });
    let ranger = chan_func(&mut b, "ranger", |b, ch| {
        let int = b.int();
        let v = b.var("v", int);
        let ch_ref = b.ident(ch);
        vec![b.range_stmt(Some(v), None, ch_ref, vec![])]
    });
    let selector = chan_func(&mut b, "selector", |b, ch| {
        let ch_ref = b.ident(ch);
        let clause = b.comm_clause(Some(CommOp::Recv { lhs: vec![], define: false, chan: ch_ref }), vec![]);
        let default = b.comm_clause(None, vec![]);
        vec![b.select_stmt(vec![clause, default])]
    });
    let closer = chan_func(&mut b, "closer", |b, ch| {
        let ch_ref = b.ident(ch);
        let close = b.call_builtin("close", vec![ch_ref], None);
        vec![b.expr_stmt(close)]
    });

    let analysis = analyze(&b.finish());
    assert!(analysis.is_func_obj_async(sender));
    assert!(analysis.is_func_obj_async(ranger));
    assert!(analysis.is_func_obj_async(selector));
    assert!(!analysis.is_func_obj_async(closer));
}

#[test]
fn launched_literal_is_async_but_its_parent_is_not() {
    // go func() { ch <- 1 }()
    let mut b = builder();
    let chan = int_chan(&mut b);
    let ch = b.global_var("ch", chan);
    b.add_global(&[ch], Some(chan), vec![]);
    let ch_ref = b.ident(ch);
    let one = b.int_lit(1);
    let send = b.send(ch_ref, one);
    let lit = b.func_lit(vec![], &[], vec![send]);
    let lit_id = lit.node.id;
    let call = b.call(lit, vec![]);
    let go = b.go_stmt(call);
    let main = add_main(&mut b, vec![go]);

    let analysis = analyze(&b.finish());
    assert!(analysis.is_node_async(lit_id));
    assert!(!analysis.is_func_obj_async(main));
}

#[test]
fn called_literal_taints_the_function_that_calls_it() {
    // f := func() { <-ch }; f()
    let mut b = builder();
    let chan = int_chan(&mut b);
    let ch = b.global_var("ch", chan);
    b.add_global(&[ch], Some(chan), vec![]);
    let ch_ref = b.ident(ch);
    let recv = b.recv(ch_ref);
    let recv = b.expr_stmt(recv);
    let lit = b.func_lit(vec![], &[], vec![recv]);
    let sig = lit.node.ty.expect("literal has a signature");
    let f = b.var("f", sig);
    let def_f = b.define(&[f], vec![lit]);
    let call = b.call_func(f, vec![]);
    let call_id = call.node.id;
    let call = b.expr_stmt(call);
    let main = add_main(&mut b, vec![def_f, call]);

    let analysis = analyze(&b.finish());
    assert!(analysis.is_call_async(call_id));
    assert!(analysis.is_func_obj_async(main));
}

#[test]
fn unknown_function_values_are_assumed_synchronous() {
    // func apply(f func()) { f() }
    let mut b = builder();
    let sig = b.signature(&[], &[]);
    let apply = b.declare_func("apply", &[sig], &[]);
    let f = b.param("f", sig);
    let call = b.call_func(f, vec![]);
    let call_id = call.node.id;
    let call = b.expr_stmt(call);
    let decl = b.func_decl(apply, &[f], vec![call]);
    b.add_func(decl);

    let analysis = analyze(&b.finish());
    assert!(!analysis.is_call_async(call_id));
    assert!(!analysis.is_func_obj_async(apply));
}

#[test]
fn runtime_wait_group_wait_suspends() {
    let mut b = builder();
    let empty = b.struct_type(&[]);
    let wg_ty = b.external_named("sync", "WaitGroup", empty);
    let wait = b.external_method(wg_ty, "Wait", &[], &[]);
    let done = b.external_method(wg_ty, "Done", &[], &[]);
    b.import("sync", None);

    let wg = b.global_var("wg", wg_ty);
    b.add_global(&[wg], Some(wg_ty), vec![]);
    let wg_ref = b.ident(wg);
    let call = b.method_call(wg_ref, wait, vec![]);
    let call = b.expr_stmt(call);
    let waiter = add_func(&mut b, "waiter", vec![call]);
    let wg_ref = b.ident(wg);
    let call = b.method_call(wg_ref, done, vec![]);
    let call = b.expr_stmt(call);
    let finisher = add_func(&mut b, "finisher", vec![call]);

    let analysis = analyze(&b.finish());
    assert!(analysis.is_func_obj_async(waiter));
    assert!(!analysis.is_func_obj_async(finisher));
    assert!(analysis.is_method_async("sync", "WaitGroup", "Wait"));
}

#[test]
fn propagation_converges_in_few_rounds() {
    // a -> b -> c -> d, d receives.
    let mut b = builder();
    let chan = int_chan(&mut b);
    let names = ["a", "b", "c", "d"];
    let funcs: Vec<ObjId> = names.iter().map(|n| b.declare_func(n, &[chan], &[])).collect();
    for (i, f) in funcs.iter().enumerate() {
        let p = b.param("ch", chan);
        let p_ref = b.ident(p);
        let stmt = match funcs.get(i + 1) {
            Some(next) => {
                let call = b.call_func(*next, vec![p_ref]);
                b.expr_stmt(call)
            }
            None => {
                let recv = b.recv(p_ref);
                b.expr_stmt(recv)
            }
        };
        let decl = b.func_decl(*f, &[p], vec![stmt]);
        b.add_func(decl);
    }

    let analysis = analyze(&b.finish());
    assert!(funcs.iter().all(|f| analysis.is_func_obj_async(*f)));
    assert!(analysis.iterations >= 1);
    assert!(analysis.iterations <= funcs.len() + 1, "took {} rounds", analysis.iterations);
}
