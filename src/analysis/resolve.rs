//! Boxing and async resolution over a `BindingGraph`.
//!
//! Boxing facts are a direct read of the edges. Async-ness is a monotone boolean
//! lattice over the call graph: a worklist seeded with every function that suspends
//! by itself, propagating to callers and to the enclosing function of non-launched
//! literals until nothing changes. Order of declaration does not matter.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, trace};

use super::graph::{BindingGraph, BindingId, CallTarget, EdgeKind, Endpoint, FuncId, FunctionFact};
use crate::ast::{NodeId, ObjId};
use crate::types::{Type, TypeId, TypeTable};

/// Functions and methods of the standard-library port that suspend.
/// Keyed by (package path, receiver type name, method name); package functions use an empty type name.
pub const ASYNC_RUNTIME_METHODS: &[(&str, &str, &str)] = &[
    ("sync", "Mutex", "Lock"),
    ("sync", "RWMutex", "Lock"),
    ("sync", "RWMutex", "RLock"),
    ("sync", "WaitGroup", "Wait"),
    ("sync", "Once", "Do"),
    ("sync", "Cond", "Wait"),
    ("time", "", "Sleep"),
];

pub fn is_runtime_async(pkg: &str, ty: &str, name: &str) -> bool {
    ASYNC_RUNTIME_METHODS.iter().any(|(p, t, n)| *p == pkg && *t == ty && *n == name)
}

/// `*T` needs a `.value` unwrap on dereference unless `T` is a struct, which is already
/// a reference in the target. Each pointer level of a pointer-to-pointer needs one unwrap.
pub fn needs_boxed_deref(types: &TypeTable, pointer: TypeId) -> bool {
    match types.underlying_type(pointer) {
        Some(Type::Pointer(elem)) => !types.is_struct(*elem),
        _ => false,
    }
}

/// Read-only analysis result for one package.
#[derive(Debug, Clone)]
pub struct Analysis {
    graph: BindingGraph,
    boxed: Vec<bool>,
    boxed_access: Vec<bool>,
    async_funcs: Vec<bool>,
    /// (package, type, method) -> async, for methods declared in this package.
    methods: HashMap<(String, String, String), bool>,
    pub iterations: usize,
}

impl Analysis {
    /// Resolve every fact of `graph`. With `types`, methods become queryable by
    /// (package, type, method) through `is_method_async`.
    pub fn resolve(graph: BindingGraph, types: Option<&TypeTable>) -> Self {
        let boxed: Vec<bool> = graph
            .bindings()
            .iter()
            .map(|b| b.destinations.iter().any(|e| e.kind == EdgeKind::AddressOf))
            .collect();

        let boxed_access: Vec<bool> = graph
            .bindings()
            .iter()
            .enumerate()
            .map(|(i, b)| {
                if boxed[i] {
                    return true;
                }
                b.pointer_to_struct
                    && b.sources.iter().any(|e| match (e.kind, e.peer) {
                        (EdgeKind::AddressOf, Endpoint::Binding(src)) => {
                            boxed.get(src.0 as usize).copied().unwrap_or(false)
                        }
                        _ => false,
                    })
            })
            .collect();

        let (async_funcs, iterations) = propagate_async(&graph);

        let mut methods = HashMap::new();
        if let Some(types) = types {
            for (i, f) in graph.functions().iter().enumerate() {
                if let super::graph::FuncKind::Method { recv, .. } = &f.kind {
                    if let Some(named) = types.named(*recv) {
                        methods.insert((named.pkg.clone(), named.name.clone(), f.name.clone()), async_funcs[i]);
                    }
                }
            }
        }

        debug!(
            boxed = boxed.iter().filter(|b| **b).count(),
            async_functions = async_funcs.iter().filter(|a| **a).count(),
            iterations,
            "resolved analysis for {}",
            graph.pkg_path
        );

        Self { graph, boxed, boxed_access, async_funcs, methods, iterations }
    }

    pub fn graph(&self) -> &BindingGraph {
        &self.graph
    }

    pub fn needs_boxing(&self, b: BindingId) -> bool {
        self.boxed.get(b.0 as usize).copied().unwrap_or(false)
    }

    pub fn needs_boxed_access(&self, b: BindingId) -> bool {
        self.boxed_access.get(b.0 as usize).copied().unwrap_or(false)
    }

    pub fn obj_needs_boxing(&self, obj: ObjId) -> bool {
        self.graph.binding_of(obj).is_some_and(|b| self.needs_boxing(b))
    }

    pub fn obj_needs_boxed_access(&self, obj: ObjId) -> bool {
        self.graph.binding_of(obj).is_some_and(|b| self.needs_boxed_access(b))
    }

    pub fn is_async(&self, f: FuncId) -> bool {
        self.async_funcs.get(f.0 as usize).copied().unwrap_or(false)
    }

    pub fn is_func_obj_async(&self, obj: ObjId) -> bool {
        self.graph.func_of_obj(obj).is_some_and(|f| self.is_async(f))
    }

    /// Async-ness of a function declaration or literal, by its node id.
    pub fn is_node_async(&self, node: NodeId) -> bool {
        self.graph.func_of_node(node).is_some_and(|f| self.is_async(f))
    }

    /// Whether the call expression `call` must be awaited.
    pub fn is_call_async(&self, call: NodeId) -> bool {
        self.graph.call_target(call).is_some_and(|target| self.target_async(target))
    }

    /// Same bit as `is_call_async`, for the call a `defer` statement registers.
    pub fn is_async_deferred_call(&self, call: NodeId) -> bool {
        self.is_call_async(call)
    }

    pub fn is_method_async(&self, pkg: &str, ty: &str, method: &str) -> bool {
        if is_runtime_async(pkg, ty, method) {
            return true;
        }
        self.methods.get(&(pkg.to_string(), ty.to_string(), method.to_string())).copied().unwrap_or(false)
    }

    /// Whether `node` lies inside a function that ends up async.
    pub fn in_async_function(&self, node: NodeId) -> bool {
        self.graph.enclosing(node).is_some_and(|f| self.is_async(f))
    }

    pub fn function_for_node(&self, node: NodeId) -> Option<&FunctionFact> {
        self.graph.func_of_node(node).and_then(|f| self.graph.function(f))
    }

    pub fn named_results(&self, node: NodeId) -> &[ObjId] {
        self.function_for_node(node).map(|f| f.named_results.as_slice()).unwrap_or(&[])
    }

    fn target_async(&self, target: &CallTarget) -> bool {
        match target {
            CallTarget::Func(f) => self.is_async(*f),
            CallTarget::Candidates(fs) => fs.iter().any(|f| self.is_async(*f)),
            CallTarget::External { pkg, ty, name } => self.is_method_async(pkg, ty, name),
            CallTarget::Unknown => false,
        }
    }
}

/// Worklist fixpoint. Returns the async bit per function and the number of propagation steps.
fn propagate_async(graph: &BindingGraph) -> (Vec<bool>, usize) {
    let n = graph.functions().len();
    let mut is_async: Vec<bool> = graph.functions().iter().map(|f| f.direct_async).collect();
    // dependents[g] = functions that become async when g does.
    let mut dependents: Vec<Vec<FuncId>> = vec![Vec::new(); n];

    for (i, f) in graph.functions().iter().enumerate() {
        let caller = FuncId(i as u32);
        for site in &f.calls {
            match graph.call_target(*site) {
                Some(CallTarget::Func(g)) => push_dep(&mut dependents, *g, caller),
                Some(CallTarget::Candidates(gs)) => {
                    for g in gs {
                        push_dep(&mut dependents, *g, caller);
                    }
                }
                Some(CallTarget::External { pkg, ty, name }) => {
                    if is_runtime_async(pkg, ty, name) {
                        is_async[i] = true;
                    }
                }
                Some(CallTarget::Unknown) | None => {}
            }
        }
        if let (Some(parent), false) = (f.parent, f.launched) {
            push_dep(&mut dependents, caller, parent);
        }
    }

    let mut worklist: VecDeque<FuncId> =
        is_async.iter().enumerate().filter(|(_, a)| **a).map(|(i, _)| FuncId(i as u32)).collect();
    let mut steps = 0;
    while let Some(g) = worklist.pop_front() {
        steps += 1;
        for f in &dependents[g.0 as usize] {
            let slot = &mut is_async[f.0 as usize];
            if !*slot {
                *slot = true;
                trace!(
                    "{} is async through {}",
                    graph.function(*f).map(|x| x.name.as_str()).unwrap_or("?"),
                    graph.function(g).map(|x| x.name.as_str()).unwrap_or("?")
                );
                worklist.push_back(*f);
            }
        }
    }
    (is_async, steps)
}

fn push_dep(dependents: &mut [Vec<FuncId>], callee: FuncId, caller: FuncId) {
    if let Some(slot) = dependents.get_mut(callee.0 as usize) {
        slot.push(caller);
    }
}
