//! Binding graph construction.
//!
//! One walk over the typed AST records, per variable binding, every value or address
//! flow into and out of it, and per function-like node (declaration or literal) the
//! facts the async resolver needs: direct suspension points, call sites, enclosing
//! function and named results.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::ast::*;
use crate::span::Spanned;
use crate::types::{TypeId, TypeTable};
use crate::visit::{Visitor, walk_expr, walk_stmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    DirectCopy,
    AddressOf,
}

/// The other end of a flow edge: a tracked binding, or a location with no binding
/// (a call argument, a struct field, a return value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Binding(BindingId),
    Anonymous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub kind: EdgeKind,
    pub peer: Endpoint,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub obj: Option<ObjId>,
    pub name: String,
    pub ty: Option<TypeId>,
    /// Enclosing function; `None` for package-level variables.
    pub scope: Option<FuncId>,
    /// Declared type is a pointer to a struct.
    pub pointer_to_struct: bool,
    pub sources: Vec<Edge>,
    pub destinations: Vec<Edge>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FuncKind {
    Func { obj: Option<ObjId> },
    Method { obj: Option<ObjId>, recv: TypeId },
    Lit,
}

#[derive(Debug, Clone)]
pub struct FunctionFact {
    pub name: String,
    pub kind: FuncKind,
    /// `FuncDecl::id` or the `FuncLit` expression id.
    pub node: NodeId,
    /// Lexically enclosing function, for literals.
    pub parent: Option<FuncId>,
    /// Launched directly by a `go` statement: its suspension does not block the parent.
    pub launched: bool,
    /// Performs a channel operation or a `select` itself.
    pub direct_async: bool,
    /// Call sites in the body (excluding the call a `go` statement launches).
    pub calls: Vec<NodeId>,
    pub named_results: Vec<ObjId>,
    pub has_defer: bool,
}

/// What a call site resolves to once the whole package has been seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    Func(FuncId),
    /// Dynamic dispatch (interface method, closure held in a variable): any of these may run.
    Candidates(Vec<FuncId>),
    /// Function or method declared in another package.
    External { pkg: String, ty: String, name: String },
    Unknown,
}

#[derive(Debug, Clone, Default)]
pub struct BindingGraph {
    pub pkg_path: String,
    bindings: Vec<Binding>,
    functions: Vec<FunctionFact>,
    binding_of: HashMap<ObjId, BindingId>,
    func_of_obj: HashMap<ObjId, FuncId>,
    func_of_node: HashMap<NodeId, FuncId>,
    call_sites: HashMap<NodeId, CallTarget>,
    /// Innermost enclosing function of call expressions, literals and deferred calls.
    enclosing: HashMap<NodeId, FuncId>,
}

impl BindingGraph {
    pub fn new(pkg_path: &str) -> Self {
        Self { pkg_path: pkg_path.to_string(), ..Self::default() }
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn functions(&self) -> &[FunctionFact] {
        &self.functions
    }

    pub fn binding(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(id.0 as usize)
    }

    pub fn function(&self, id: FuncId) -> Option<&FunctionFact> {
        self.functions.get(id.0 as usize)
    }

    pub fn binding_of(&self, obj: ObjId) -> Option<BindingId> {
        self.binding_of.get(&obj).copied()
    }

    pub fn func_of_obj(&self, obj: ObjId) -> Option<FuncId> {
        self.func_of_obj.get(&obj).copied()
    }

    pub fn func_of_node(&self, node: NodeId) -> Option<FuncId> {
        self.func_of_node.get(&node).copied()
    }

    pub fn call_target(&self, call: NodeId) -> Option<&CallTarget> {
        self.call_sites.get(&call)
    }

    pub fn enclosing(&self, node: NodeId) -> Option<FuncId> {
        self.enclosing.get(&node).copied()
    }

    pub fn add_binding(
        &mut self,
        obj: Option<ObjId>,
        name: &str,
        ty: Option<TypeId>,
        scope: Option<FuncId>,
        pointer_to_struct: bool,
    ) -> BindingId {
        let id = BindingId(self.bindings.len() as u32);
        self.bindings.push(Binding {
            obj,
            name: name.to_string(),
            ty,
            scope,
            pointer_to_struct,
            sources: Vec::new(),
            destinations: Vec::new(),
        });
        if let Some(obj) = obj {
            self.binding_of.insert(obj, id);
        }
        id
    }

    /// Record a flow of `kind` from `from` into `to`, on both ends.
    pub fn add_edge(&mut self, from: Endpoint, to: Endpoint, kind: EdgeKind) {
        if let Endpoint::Binding(dst) = to {
            if let Some(b) = self.bindings.get_mut(dst.0 as usize) {
                b.sources.push(Edge { kind, peer: from });
            }
        }
        if let Endpoint::Binding(src) = from {
            if let Some(b) = self.bindings.get_mut(src.0 as usize) {
                b.destinations.push(Edge { kind, peer: to });
            }
        }
    }

    pub fn add_function(&mut self, name: &str, kind: FuncKind, node: NodeId, parent: Option<FuncId>) -> FuncId {
        let id = FuncId(self.functions.len() as u32);
        match &kind {
            FuncKind::Func { obj: Some(obj) } | FuncKind::Method { obj: Some(obj), .. } => {
                self.func_of_obj.insert(*obj, id);
            }
            _ => {}
        }
        self.func_of_node.insert(node, id);
        self.functions.push(FunctionFact {
            name: name.to_string(),
            kind,
            node,
            parent,
            launched: false,
            direct_async: false,
            calls: Vec::new(),
            named_results: Vec::new(),
            has_defer: false,
        });
        id
    }

    pub fn mark_direct_async(&mut self, func: FuncId) {
        if let Some(f) = self.functions.get_mut(func.0 as usize) {
            f.direct_async = true;
        }
    }

    pub fn mark_launched(&mut self, func: FuncId) {
        if let Some(f) = self.functions.get_mut(func.0 as usize) {
            f.launched = true;
        }
    }

    /// Record a resolved call site. `caller` is `None` for calls that do not block
    /// their enclosing function (the call a `go` statement launches, package initializers).
    pub fn add_call(&mut self, caller: Option<FuncId>, site: NodeId, target: CallTarget) {
        if let Some(caller) = caller {
            if let Some(f) = self.functions.get_mut(caller.0 as usize) {
                f.calls.push(site);
            }
        }
        self.call_sites.insert(site, target);
    }

    pub fn set_enclosing(&mut self, node: NodeId, func: FuncId) {
        self.enclosing.insert(node, func);
    }

    /// Concrete methods named `name` whose receiver implements `iface`.
    fn interface_candidates(&self, types: &TypeTable, iface: TypeId, name: &str) -> Vec<FuncId> {
        self.functions
            .iter()
            .enumerate()
            .filter_map(|(i, f)| match &f.kind {
                FuncKind::Method { recv, .. } if f.name == name && types.implements(*recv, iface) => {
                    Some(FuncId(i as u32))
                }
                _ => None,
            })
            .collect()
    }

    fn method_on(&self, recv: TypeId, name: &str) -> Option<FuncId> {
        self.functions.iter().position(|f| f.name == name && matches!(&f.kind, FuncKind::Method { recv: r, .. } if *r == recv)).map(|i| FuncId(i as u32))
    }
}

/// A call site before the whole package has been seen.
#[derive(Debug, Clone)]
enum RawCallee {
    Func(ObjId),
    Method { obj: ObjId, recv: TypeId },
    Interface { iface: TypeId, name: String },
    Binding(BindingId),
    Lit(NodeId),
    Unknown,
}

/// Build the binding graph for a whole package.
pub fn build_graph(pkg: &Package) -> BindingGraph {
    let mut builder = GraphBuilder {
        pkg,
        graph: BindingGraph::new(&pkg.path),
        current: None,
        go_call: None,
        launched_lits: HashSet::new(),
        tracked_addr: HashSet::new(),
        raw_calls: Vec::new(),
        lit_assignments: Vec::new(),
    };
    builder.visit_package(pkg);
    builder.finish()
}

struct GraphBuilder<'a> {
    pkg: &'a Package,
    graph: BindingGraph,
    current: Option<FuncId>,
    /// Id of the call expression the enclosing `go` statement launches.
    go_call: Option<NodeId>,
    launched_lits: HashSet<NodeId>,
    /// `&x` expressions already recorded as a binding-to-binding edge.
    tracked_addr: HashSet<NodeId>,
    raw_calls: Vec<(Option<FuncId>, NodeId, RawCallee)>,
    /// (binding, function literal node) pairs from `f := func() {...}`.
    lit_assignments: Vec<(BindingId, NodeId)>,
}

impl GraphBuilder<'_> {
    fn types(&self) -> &TypeTable {
        &self.pkg.types
    }

    fn ensure_binding(&mut self, obj: ObjId) -> Option<BindingId> {
        if let Some(id) = self.graph.binding_of(obj) {
            return Some(id);
        }
        let pkg = self.pkg;
        let object = pkg.object(obj)?;
        if !object.is_variable() {
            return None;
        }
        let ptr_struct = object.ty.is_some_and(|t| self.types().is_pointer_to_struct(t));
        let scope = if object.package_level { None } else { self.current };
        Some(self.graph.add_binding(Some(obj), &object.name, object.ty, scope, ptr_struct))
    }

    fn binding_for_ident(&mut self, ident: &Ident) -> Option<BindingId> {
        if ident.is_blank() {
            return None;
        }
        ident.obj.and_then(|obj| self.ensure_binding(obj))
    }

    fn declare_sig(&mut self, sig: &FuncSig) {
        for p in sig.params.iter().chain(sig.results.iter()) {
            if let Some(name) = &p.name {
                self.binding_for_ident(name);
            }
        }
    }

    fn is_value_struct(&self, ty: Option<TypeId>) -> bool {
        ty.is_some_and(|t| self.types().is_struct(t))
    }

    /// Record the flow `dst <- rhs` for an assignment-like node.
    fn record_flow(&mut self, dst: BindingId, rhs: &Spanned<Expr>) {
        let rhs_expr = rhs.node.unparen();
        match &rhs_expr.kind {
            ExprKind::Ident(ident) => {
                if let Some(src) = self.binding_for_ident(ident) {
                    self.graph.add_edge(Endpoint::Binding(src), Endpoint::Binding(dst), EdgeKind::DirectCopy);
                }
            }
            ExprKind::Unary { op: UnaryOp::Addr, operand } => {
                if let Some(ident) = operand.node.as_ident() {
                    if let Some(src) = self.binding_for_ident(ident) {
                        self.graph.add_edge(Endpoint::Binding(src), Endpoint::Binding(dst), EdgeKind::AddressOf);
                        self.tracked_addr.insert(rhs_expr.id);
                    }
                }
            }
            ExprKind::FuncLit { .. } => self.lit_assignments.push((dst, rhs_expr.id)),
            // Composite literals and calls are fresh values; anything else is not tracked.
            _ => {}
        }
    }

    fn record_pairs(&mut self, lhs: &[Option<BindingId>], rhs: &[Spanned<Expr>]) {
        if lhs.len() != rhs.len() {
            return;
        }
        for (dst, value) in lhs.iter().zip(rhs) {
            if let Some(dst) = dst {
                self.record_flow(*dst, value);
            }
        }
    }

    fn raw_callee(&mut self, func: &Spanned<Expr>) -> Option<RawCallee> {
        let pkg = self.pkg;
        let func_expr = func.node.unparen();
        match &func_expr.kind {
            ExprKind::Ident(ident) => {
                let obj = ident.obj?;
                let object = pkg.object(obj)?;
                match object.kind {
                    ObjKind::Func => Some(RawCallee::Func(obj)),
                    ObjKind::Var | ObjKind::Param | ObjKind::NamedResult | ObjKind::Receiver => {
                        self.binding_for_ident(ident).map(RawCallee::Binding)
                    }
                    ObjKind::Builtin | ObjKind::TypeName => None,
                    _ => Some(RawCallee::Unknown),
                }
            }
            ExprKind::Type(_) => None,
            ExprKind::FuncLit { .. } => Some(RawCallee::Lit(func_expr.id)),
            ExprKind::Selector { base, sel } => {
                let Some(obj) = sel.obj else {
                    return Some(RawCallee::Unknown);
                };
                let object = pkg.object(obj)?;
                match object.kind {
                    ObjKind::Func => Some(RawCallee::Func(obj)),
                    ObjKind::Method => {
                        let base_ty = base.node.ty;
                        if let Some(bt) = base_ty.filter(|t| self.types().is_interface(*t)) {
                            return Some(RawCallee::Interface { iface: bt, name: sel.name.clone() });
                        }
                        let recv = object.recv.or_else(|| base_ty.map(|t| self.types().deref(t)));
                        match recv {
                            Some(recv) => Some(RawCallee::Method { obj, recv }),
                            None => Some(RawCallee::Unknown),
                        }
                    }
                    ObjKind::TypeName => None,
                    _ => Some(RawCallee::Unknown),
                }
            }
            _ => Some(RawCallee::Unknown),
        }
    }

    /// `v.M()` with a pointer-receiver method on a non-struct addressable value takes `&v`.
    fn record_implicit_address(&mut self, func: &Spanned<Expr>) {
        let ExprKind::Selector { base, sel } = &func.node.unparen().kind else {
            return;
        };
        let Some(ident) = base.node.as_ident() else {
            return;
        };
        let Some(base_ty) = base.node.ty else {
            return;
        };
        if self.types().is_pointer(base_ty) || self.types().is_struct(base_ty) || self.types().is_interface(base_ty) {
            return;
        }
        let pointer_recv = self.types().method(base_ty, &sel.name).is_some_and(|m| m.pointer_recv);
        if pointer_recv {
            if let Some(src) = self.binding_for_ident(ident) {
                self.graph.add_edge(Endpoint::Binding(src), Endpoint::Anonymous, EdgeKind::AddressOf);
            }
        }
    }

    fn enter_function(&mut self, id: FuncId) -> Option<FuncId> {
        std::mem::replace(&mut self.current, Some(id))
    }

    fn closures_of(&self, binding: BindingId, lits: &HashMap<BindingId, Vec<FuncId>>) -> Vec<FuncId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![binding];
        while let Some(b) = stack.pop() {
            if !seen.insert(b) {
                continue;
            }
            if let Some(fs) = lits.get(&b) {
                out.extend(fs.iter().copied());
            }
            if let Some(binding) = self.graph.binding(b) {
                for edge in &binding.sources {
                    if let (EdgeKind::DirectCopy, Endpoint::Binding(src)) = (edge.kind, edge.peer) {
                        stack.push(src);
                    }
                }
            }
        }
        out.sort();
        out.dedup();
        out
    }

    fn finish(mut self) -> BindingGraph {
        let mut lits: HashMap<BindingId, Vec<FuncId>> = HashMap::new();
        for (binding, node) in std::mem::take(&mut self.lit_assignments) {
            if let Some(f) = self.graph.func_of_node(node) {
                lits.entry(binding).or_default().push(f);
            }
        }
        for node in std::mem::take(&mut self.launched_lits) {
            if let Some(f) = self.graph.func_of_node(node) {
                self.graph.mark_launched(f);
            }
        }

        let raw_calls = std::mem::take(&mut self.raw_calls);
        for (caller, site, raw) in raw_calls {
            let target = self.resolve_callee(raw, &lits);
            self.graph.add_call(caller, site, target);
        }

        debug!(
            bindings = self.graph.bindings.len(),
            functions = self.graph.functions.len(),
            call_sites = self.graph.call_sites.len(),
            "built binding graph for {}",
            self.graph.pkg_path
        );
        self.graph
    }

    fn resolve_callee(&self, raw: RawCallee, lits: &HashMap<BindingId, Vec<FuncId>>) -> CallTarget {
        match raw {
            RawCallee::Func(obj) => {
                if let Some(f) = self.graph.func_of_obj(obj) {
                    return CallTarget::Func(f);
                }
                match self.pkg.object(obj) {
                    Some(object) if object.pkg != self.pkg.path => {
                        CallTarget::External { pkg: object.pkg.clone(), ty: String::new(), name: object.name.clone() }
                    }
                    _ => CallTarget::Unknown,
                }
            }
            RawCallee::Method { obj, recv } => {
                if let Some(f) = self.graph.func_of_obj(obj) {
                    return CallTarget::Func(f);
                }
                let name = self.pkg.object(obj).map(|o| o.name.clone()).unwrap_or_default();
                if let Some(f) = self.graph.method_on(recv, &name) {
                    return CallTarget::Func(f);
                }
                match self.types().named(recv) {
                    Some(named) if named.pkg != self.pkg.path => {
                        CallTarget::External { pkg: named.pkg.clone(), ty: named.name.clone(), name }
                    }
                    _ => CallTarget::Unknown,
                }
            }
            RawCallee::Interface { iface, name } => {
                let candidates = self.graph.interface_candidates(self.types(), iface, &name);
                if candidates.is_empty() {
                    // Interfaces from other packages dispatch to methods we cannot see.
                    match self.types().named(iface) {
                        Some(named) if !named.pkg.is_empty() && named.pkg != self.pkg.path => {
                            CallTarget::External { pkg: named.pkg.clone(), ty: named.name.clone(), name }
                        }
                        _ => CallTarget::Unknown,
                    }
                } else {
                    CallTarget::Candidates(candidates)
                }
            }
            RawCallee::Binding(b) => {
                let closures = self.closures_of(b, lits);
                if closures.is_empty() { CallTarget::Unknown } else { CallTarget::Candidates(closures) }
            }
            RawCallee::Lit(node) => match self.graph.func_of_node(node) {
                Some(f) => CallTarget::Func(f),
                None => CallTarget::Unknown,
            },
            RawCallee::Unknown => CallTarget::Unknown,
        }
    }
}

impl Visitor for GraphBuilder<'_> {
    fn visit_func_decl(&mut self, func: &FuncDecl) {
        let kind = match &func.recv {
            Some(recv) => FuncKind::Method { obj: func.name.obj, recv: self.types().deref(recv.ty) },
            None => FuncKind::Func { obj: func.name.obj },
        };
        let id = self.graph.add_function(&func.name.name, kind, func.id, None);
        let saved = self.enter_function(id);

        if let Some(recv) = &func.recv {
            if let Some(name) = &recv.name {
                self.binding_for_ident(name);
            }
        }
        self.declare_sig(&func.sig);
        let named_results: Vec<ObjId> = func.sig.results.iter().filter_map(|r| r.name.as_ref()?.obj).collect();
        if let Some(f) = self.graph.functions.get_mut(id.0 as usize) {
            f.named_results = named_results;
        }

        if let Some(body) = &func.body {
            self.visit_block(body);
        }
        self.current = saved;
    }

    fn visit_value_spec(&mut self, spec: &ValueSpec) {
        let lhs: Vec<Option<BindingId>> = spec.names.iter().map(|n| self.binding_for_ident(n)).collect();
        self.record_pairs(&lhs, &spec.values);
        for value in &spec.values {
            self.visit_expr(value);
        }
    }

    fn visit_stmt(&mut self, stmt: &Spanned<Stmt>) {
        match &stmt.node {
            Stmt::Define { lhs, rhs } => {
                let dsts: Vec<Option<BindingId>> = lhs.iter().map(|n| self.binding_for_ident(n)).collect();
                self.record_pairs(&dsts, rhs);
            }
            Stmt::Assign { lhs, op: None, rhs } => {
                let dsts: Vec<Option<BindingId>> = lhs
                    .iter()
                    .map(|e| match e.node.as_ident() {
                        Some(ident) => self.binding_for_ident(ident),
                        None => None,
                    })
                    .collect();
                self.record_pairs(&dsts, rhs);
            }
            Stmt::Send { .. } | Stmt::Select { .. } => {
                if let Some(f) = self.current {
                    self.graph.mark_direct_async(f);
                }
            }
            Stmt::Range { key, value, iterable, define, .. } => {
                if *define {
                    for e in [key, value].into_iter().flatten() {
                        if let Some(ident) = e.node.as_ident() {
                            self.binding_for_ident(ident);
                        }
                    }
                }
                if iterable.node.ty.is_some_and(|t| self.types().is_chan(t)) {
                    if let Some(f) = self.current {
                        self.graph.mark_direct_async(f);
                    }
                }
            }
            Stmt::TypeSwitch { cases, .. } => {
                for case in cases {
                    if let Some(obj) = case.binding_obj {
                        self.ensure_binding(obj);
                    }
                }
            }
            Stmt::Go(call) => {
                if let ExprKind::Call { func, .. } = &call.node.unparen().kind {
                    if matches!(func.node.unparen().kind, ExprKind::FuncLit { .. }) {
                        self.launched_lits.insert(func.node.unparen().id);
                    }
                }
                let saved = self.go_call.replace(call.node.unparen().id);
                walk_stmt(self, stmt);
                self.go_call = saved;
                return;
            }
            Stmt::Defer(call) => {
                if let Some(f) = self.current {
                    if let Some(fact) = self.graph.functions.get_mut(f.0 as usize) {
                        fact.has_defer = true;
                    }
                    self.graph.set_enclosing(call.node.id, f);
                }
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        match &expr.node.kind {
            ExprKind::FuncLit { sig, body } => {
                let id = self.graph.add_function("func literal", FuncKind::Lit, expr.node.id, self.current);
                if let Some(parent) = self.current {
                    self.graph.set_enclosing(expr.node.id, parent);
                }
                let saved = self.enter_function(id);
                self.declare_sig(sig);
                let named_results: Vec<ObjId> = sig.results.iter().filter_map(|r| r.name.as_ref()?.obj).collect();
                if let Some(f) = self.graph.functions.get_mut(id.0 as usize) {
                    f.named_results = named_results;
                }
                // A literal launched by `go` runs on its own; calls inside it still belong to it.
                let saved_go = self.go_call.take();
                self.visit_block(body);
                self.go_call = saved_go;
                self.current = saved;
                return;
            }
            ExprKind::Unary { op: UnaryOp::Recv, .. } => {
                if let Some(f) = self.current {
                    self.graph.mark_direct_async(f);
                }
            }
            ExprKind::Unary { op: UnaryOp::Addr, operand } => {
                if !self.tracked_addr.contains(&expr.node.id) && !self.is_value_struct(operand.node.ty) {
                    if let Some(ident) = operand.node.as_ident() {
                        if let Some(src) = self.binding_for_ident(ident) {
                            self.graph.add_edge(Endpoint::Binding(src), Endpoint::Anonymous, EdgeKind::AddressOf);
                        }
                    }
                }
            }
            ExprKind::Call { func, .. } => {
                if let Some(f) = self.current {
                    self.graph.set_enclosing(expr.node.id, f);
                }
                self.record_implicit_address(func);
                if let Some(raw) = self.raw_callee(func) {
                    let blocks_caller = self.go_call != Some(expr.node.id);
                    let caller = if blocks_caller { self.current } else { None };
                    self.raw_calls.push((caller, expr.node.id, raw));
                }
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}
