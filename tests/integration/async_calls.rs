mod common;
use common::{add_func, add_main, assert_in_order, builder, compile};

use goscript::ast::build::AstBuilder;
use goscript::ast::ObjId;
use goscript::types::{ChanDir, TypeId};

fn int_chan(b: &mut AstBuilder) -> TypeId {
    let int = b.int();
    b.chan(ChanDir::Both, int)
}

/// `ch := make(chan int, cap)`
fn make_chan(b: &mut AstBuilder, name: &str, cap: i64) -> (ObjId, goscript::span::Spanned<goscript::ast::Stmt>) {
    let chan = int_chan(b);
    let ch = b.var(name, chan);
    let ty = b.type_expr(chan);
    let cap = b.int_lit(cap);
    let make = b.call_builtin("make", vec![ty, cap], Some(chan));
    let stmt = b.define(&[ch], vec![make]);
    (ch, stmt)
}

#[test]
fn channel_receive_makes_caller_chain_async() {
    // func recvOne(ch chan int) int { return <-ch }
    // func main() { ch := make(chan int, 1); ch <- 1; x := recvOne(ch); println(x) }
    let mut b = builder();
    let int = b.int();
    let chan = int_chan(&mut b);
    let recv_one = b.declare_func("recvOne", &[chan], &[int]);
    let ch_param = b.param("ch", chan);
    let ch_ref = b.ident(ch_param);
    let recv = b.recv(ch_ref);
    let ret = b.ret(vec![recv]);
    let decl = b.func_decl(recv_one, &[ch_param], vec![ret]);
    b.add_func(decl);

    let (ch, def_ch) = make_chan(&mut b, "ch", 1);
    let ch_ref = b.ident(ch);
    let one = b.int_lit(1);
    let send = b.send(ch_ref, one);
    let x = b.var("x", int);
    let ch_ref = b.ident(ch);
    let call = b.call_func(recv_one, vec![ch_ref]);
    let def_x = b.define(&[x], vec![call]);
    let x_ref = b.ident(x);
    let print = b.call_builtin("println", vec![x_ref], None);
    let print = b.expr_stmt(print);
    add_main(&mut b, vec![def_ch, send, def_x, print]);

    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &[
            "async function recvOne(ch: $.Channel<number> | null): Promise<number> {",
            "return await $.chanRecv(ch)",
            "export async function main(): Promise<void> {",
            "$.makeChannel<number>(1, 0)",
            "await $.chanSend(ch, 1)",
            "let x = await recvOne(ch)",
        ],
    );
}

#[test]
fn plain_functions_stay_synchronous() {
    let mut b = builder();
    let int = b.int();
    let double = b.declare_func("double", &[int], &[int]);
    let n = b.param("n", int);
    let l = b.ident(n);
    let r = b.int_lit(2);
    let product = b.binary(goscript::ast::BinOp::Mul, l, r);
    let ret = b.ret(vec![product]);
    let decl = b.func_decl(double, &[n], vec![ret]);
    b.add_func(decl);
    let arg = b.int_lit(4);
    let call = b.call_func(double, vec![arg]);
    let call = b.expr_stmt(call);
    add_main(&mut b, vec![call]);

    let out = compile(&b.finish());
    assert!(out.contains("function double(n: number): number {"), "{out}");
    assert!(out.contains("export function main(): void {"), "{out}");
    assert!(!out.contains("await"), "{out}");
    assert!(!out.contains("async"), "{out}");
}

#[test]
fn forward_reference_to_async_callee() {
    // main calls first, first calls second (declared later), second receives.
    let mut b = builder();
    let chan = int_chan(&mut b);
    let first = b.declare_func("first", &[chan], &[]);
    let second = b.declare_func("second", &[chan], &[]);

    let main_ch = {
        let (ch, def) = make_chan(&mut b, "ch", 0);
        let ch_ref = b.ident(ch);
        let call = b.call_func(first, vec![ch_ref]);
        let call = b.expr_stmt(call);
        add_main(&mut b, vec![def, call]);
        ch
    };
    let _ = main_ch;

    let p = b.param("ch", chan);
    let p_ref = b.ident(p);
    let call = b.call_func(second, vec![p_ref]);
    let call = b.expr_stmt(call);
    let decl = b.func_decl(first, &[p], vec![call]);
    b.add_func(decl);

    let p = b.param("ch", chan);
    let p_ref = b.ident(p);
    let recv = b.recv(p_ref);
    let recv = b.expr_stmt(recv);
    let decl = b.func_decl(second, &[p], vec![recv]);
    b.add_func(decl);

    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &[
            "export async function main(): Promise<void> {",
            "await first(ch)",
            "async function first(",
            "await second(ch)",
            "async function second(",
            "await $.chanRecv(ch)",
        ],
    );
}

#[test]
fn mutual_recursion_reaches_the_fixpoint() {
    // ping calls pong, pong calls ping and sends on a channel.
    let mut b = builder();
    let chan = int_chan(&mut b);
    let ping = b.declare_func("ping", &[chan], &[]);
    let pong = b.declare_func("pong", &[chan], &[]);

    let p = b.param("ch", chan);
    let p_ref = b.ident(p);
    let call = b.call_func(pong, vec![p_ref]);
    let call = b.expr_stmt(call);
    let decl = b.func_decl(ping, &[p], vec![call]);
    b.add_func(decl);

    let p = b.param("ch", chan);
    let p_ref = b.ident(p);
    let one = b.int_lit(1);
    let send = b.send(p_ref, one);
    let p_ref = b.ident(p);
    let call = b.call_func(ping, vec![p_ref]);
    let call = b.expr_stmt(call);
    let decl = b.func_decl(pong, &[p], vec![send, call]);
    b.add_func(decl);

    let out = compile(&b.finish());
    assert!(out.contains("async function ping(ch: $.Channel<number> | null): Promise<void> {"), "{out}");
    assert!(out.contains("async function pong(ch: $.Channel<number> | null): Promise<void> {"), "{out}");
    assert!(out.contains("await pong(ch)"), "{out}");
    assert!(out.contains("await ping(ch)"), "{out}");
}

#[test]
fn goroutine_launch_does_not_make_the_caller_async() {
    // func worker(ch chan int) { ch <- 1 }
    // func main() { ch := make(chan int); go worker(ch) }
    let mut b = builder();
    let chan = int_chan(&mut b);
    let worker = b.declare_func("worker", &[chan], &[]);
    let p = b.param("ch", chan);
    let p_ref = b.ident(p);
    let one = b.int_lit(1);
    let send = b.send(p_ref, one);
    let decl = b.func_decl(worker, &[p], vec![send]);
    b.add_func(decl);

    let (ch, def_ch) = make_chan(&mut b, "ch", 0);
    let ch_ref = b.ident(ch);
    let call = b.call_func(worker, vec![ch_ref]);
    let go = b.go_stmt(call);
    add_main(&mut b, vec![def_ch, go]);

    let out = compile(&b.finish());
    assert_in_order(
        &out,
        &[
            "async function worker(",
            "export function main(): void {",
            "const _arg_1 = ch",
            "$.go(async () => { await worker(_arg_1) })",
        ],
    );
}

#[test]
fn interface_call_is_async_when_an_implementer_blocks() {
    // type Waiter interface { Wait() }
    // type Slow struct { ch chan int }
    // func (s *Slow) Wait() { <-s.ch }
    // func run(w Waiter) { w.Wait() }
    let mut b = builder();
    let chan = int_chan(&mut b);
    let wait_sig = b.signature(&[], &[]);
    let iface = b.interface_type(&[("Wait", wait_sig)]);
    let waiter = b.declare_type("Waiter", iface);
    let st = b.struct_type(&[("ch", chan)]);
    let slow = b.declare_type("Slow", st);
    let slow_ptr = b.pointer(slow);
    let ch_field = b.field("ch", chan);

    let wait = b.declare_method(slow, "Wait", true, &[], &[]);
    let s = b.receiver("s", slow_ptr);
    let s_ref = b.ident(s);
    let field = b.selector(s_ref, ch_field);
    let recv = b.recv(field);
    let recv = b.expr_stmt(recv);
    let decl = b.method_decl(wait, Some(s), slow_ptr, &[], vec![recv]);
    b.add_func(decl);

    let run = b.declare_func("run", &[waiter], &[]);
    let w = b.param("w", waiter);
    let iface_wait = b.interface_method("Wait", &[], &[]);
    let w_ref = b.ident(w);
    let call = b.method_call(w_ref, iface_wait, vec![]);
    let call = b.expr_stmt(call);
    let decl = b.func_decl(run, &[w], vec![call]);
    b.add_func(decl);

    let out = compile(&b.finish());
    assert!(out.contains("public async Wait(): Promise<void> {"), "{out}");
    assert!(out.contains("await $.chanRecv(s!.ch)"), "{out}");
    assert!(out.contains("async function run(w: Waiter | null): Promise<void> {"), "{out}");
    assert!(out.contains("await w!.Wait()"), "{out}");
}

#[test]
fn interface_call_stays_sync_without_blocking_implementers() {
    let mut b = builder();
    let wait_sig = b.signature(&[], &[]);
    let iface = b.interface_type(&[("Wait", wait_sig)]);
    let waiter = b.declare_type("Waiter", iface);
    let st = b.struct_type(&[]);
    let fast = b.declare_type("Fast", st);
    let fast_ptr = b.pointer(fast);
    let wait = b.declare_method(fast, "Wait", true, &[], &[]);
    let decl = b.method_decl(wait, None, fast_ptr, &[], vec![]);
    b.add_func(decl);

    let run = b.declare_func("run", &[waiter], &[]);
    let w = b.param("w", waiter);
    let iface_wait = b.interface_method("Wait", &[], &[]);
    let w_ref = b.ident(w);
    let call = b.method_call(w_ref, iface_wait, vec![]);
    let call = b.expr_stmt(call);
    let decl = b.func_decl(run, &[w], vec![call]);
    b.add_func(decl);

    let out = compile(&b.finish());
    assert!(out.contains("function run(w: Waiter | null): void {"), "{out}");
    assert!(out.contains("w!.Wait()"), "{out}");
    assert!(!out.contains("await"), "{out}");
}

#[test]
fn runtime_blocking_call_is_awaited() {
    // import "time"; func nap() { time.Sleep(1) }
    let mut b = builder();
    let int64 = b.int64();
    let time = b.import("time", None);
    let sleep = b.external_func("time", "Sleep", &[int64], &[]);
    let callee = b.qualified(time, sleep);
    let arg = b.int_lit(1);
    let call = b.call(callee, vec![arg]);
    let call = b.expr_stmt(call);
    add_func(&mut b, "nap", vec![call]);

    let out = compile(&b.finish());
    assert!(out.contains("import * as time from \"@goscript/time\""), "{out}");
    assert!(out.contains("async function nap(): Promise<void> {"), "{out}");
    assert!(out.contains("await time.Sleep("), "{out}");
}
