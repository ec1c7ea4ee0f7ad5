//! Property tests for async propagation over the call graph.
//!
//! Every caller of an async function is async, whatever order the functions were
//! declared in and however the calls cycle.

use std::collections::HashSet;

use goscript::analysis::{Analysis, BindingGraph, CallTarget, FuncId, FuncKind};
use goscript::ast::NodeId;
use proptest::prelude::*;

fn arb_call_graph() -> impl Strategy<Value = (usize, Vec<(usize, usize)>, usize)> {
    (2usize..16).prop_flat_map(|n| {
        let calls = prop::collection::vec((0..n, 0..n), 0..40);
        (Just(n), calls, 0..n)
    })
}

fn build(n: usize, calls: &[(usize, usize)], leaf: usize) -> (BindingGraph, Vec<FuncId>) {
    let mut graph = BindingGraph::new("example.com/prop");
    let funcs: Vec<FuncId> = (0..n)
        .map(|i| graph.add_function(&format!("f{i}"), FuncKind::Func { obj: None }, NodeId(i as u32), None))
        .collect();
    graph.mark_direct_async(funcs[leaf]);
    for (k, (caller, callee)) in calls.iter().enumerate() {
        let site = NodeId(10_000 + k as u32);
        graph.add_call(Some(funcs[*caller]), site, CallTarget::Func(funcs[*callee]));
    }
    (graph, funcs)
}

/// Functions that reach `leaf` through calls, `leaf` included.
fn callers_of(n: usize, calls: &[(usize, usize)], leaf: usize) -> HashSet<usize> {
    let mut reached = HashSet::from([leaf]);
    loop {
        let before = reached.len();
        for (caller, callee) in calls {
            if reached.contains(callee) {
                reached.insert(*caller);
            }
        }
        if reached.len() == before || reached.len() == n {
            return reached;
        }
    }
}

proptest! {
    #[test]
    fn prop_async_is_monotone_over_calls((n, calls, leaf) in arb_call_graph()) {
        let (graph, funcs) = build(n, &calls, leaf);
        let analysis = Analysis::resolve(graph, None);
        for (caller, callee) in &calls {
            if analysis.is_async(funcs[*callee]) {
                prop_assert!(analysis.is_async(funcs[*caller]), "f{} calls async f{}", caller, callee);
            }
        }
    }

    #[test]
    fn prop_async_is_exactly_the_transitive_callers((n, calls, leaf) in arb_call_graph()) {
        let (graph, funcs) = build(n, &calls, leaf);
        let analysis = Analysis::resolve(graph, None);
        let expected = callers_of(n, &calls, leaf);
        for (i, f) in funcs.iter().enumerate() {
            prop_assert_eq!(analysis.is_async(*f), expected.contains(&i), "f{}", i);
        }
    }

    #[test]
    fn prop_call_sites_follow_their_callee((n, calls, leaf) in arb_call_graph()) {
        let (graph, funcs) = build(n, &calls, leaf);
        let analysis = Analysis::resolve(graph, None);
        for (k, (_, callee)) in calls.iter().enumerate() {
            let site = NodeId(10_000 + k as u32);
            prop_assert_eq!(analysis.is_call_async(site), analysis.is_async(funcs[*callee]));
        }
    }
}

#[test]
fn launched_literal_does_not_taint_its_parent() {
    let mut graph = BindingGraph::new("example.com/prop");
    let main = graph.add_function("main", FuncKind::Func { obj: None }, NodeId(1), None);
    let worker = graph.add_function("lit", FuncKind::Lit, NodeId(2), Some(main));
    graph.mark_direct_async(worker);
    graph.mark_launched(worker);
    let analysis = Analysis::resolve(graph, None);
    assert!(analysis.is_async(worker));
    assert!(!analysis.is_async(main));
}

#[test]
fn inline_literal_taints_its_parent() {
    let mut graph = BindingGraph::new("example.com/prop");
    let main = graph.add_function("main", FuncKind::Func { obj: None }, NodeId(1), None);
    let body = graph.add_function("lit", FuncKind::Lit, NodeId(2), Some(main));
    graph.mark_direct_async(body);
    let analysis = Analysis::resolve(graph, None);
    assert!(analysis.is_async(main));
}

#[test]
fn any_async_candidate_makes_the_dispatch_async() {
    let mut graph = BindingGraph::new("example.com/prop");
    let caller = graph.add_function("run", FuncKind::Func { obj: None }, NodeId(1), None);
    let quick = graph.add_function("Quick", FuncKind::Func { obj: None }, NodeId(2), None);
    let slow = graph.add_function("Slow", FuncKind::Func { obj: None }, NodeId(3), None);
    graph.mark_direct_async(slow);
    graph.add_call(Some(caller), NodeId(50), CallTarget::Candidates(vec![quick, slow]));
    let analysis = Analysis::resolve(graph, None);
    assert!(analysis.is_call_async(NodeId(50)));
    assert!(analysis.is_async(caller));
    assert!(!analysis.is_async(quick));
}
