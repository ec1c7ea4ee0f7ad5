//! Per-package semantic analysis: which bindings need heap boxes and which
//! functions must become async.

pub mod graph;
pub mod resolve;

pub use graph::{Binding, BindingGraph, BindingId, CallTarget, Edge, EdgeKind, Endpoint, FuncId, FuncKind, FunctionFact, build_graph};
pub use resolve::{ASYNC_RUNTIME_METHODS, Analysis, needs_boxed_deref};

use crate::ast::Package;

/// Build and resolve the analysis for `pkg`. Read-only afterwards.
pub fn analyze(pkg: &Package) -> Analysis {
    let graph = build_graph(pkg);
    Analysis::resolve(graph, Some(&pkg.types))
}
