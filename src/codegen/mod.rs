//! Statement and expression generation.
//!
//! One package is one compilation unit and produces one target module. Analysis runs
//! first; the generator then walks every file's declarations depth-first, querying the
//! resolver for boxing and async facts and the translator for types and zero values.
//!
//! Expressions render to strings. Statements write to the generator's `CodeWriter`;
//! constructs that need a statement list inside an expression (function literals,
//! select and type-switch handlers) render into a nested writer and splice the text.

mod assign;
mod call;
mod expr;
mod lit;
mod range;
mod stmt;
mod switch;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::analysis::Analysis;
use crate::ast::*;
use crate::config::CompileConfig;
use crate::diagnostics::{CompileError, CompileWarning};
use crate::emit::CodeWriter;
use crate::span::{Span, Spanned};
use crate::synth::StructModel;
use crate::translate::{Translator, package_alias};
use crate::types::{Type, TypeId, TypeTable};
use crate::visit::scope_tracker::{ScopeTracker, escape_ident};
use crate::visit::{Visitor, walk_expr, walk_stmt};

/// The generated module for one package.
#[derive(Debug, Clone)]
pub struct GeneratedUnit {
    /// Path relative to the output directory.
    pub path: PathBuf,
    pub source: String,
    pub warnings: Vec<CompileWarning>,
}

/// Where the module for `pkg_path` is written, relative to the output directory.
pub fn output_path(pkg_path: &str) -> PathBuf {
    PathBuf::from(pkg_path).join("index.ts")
}

pub fn generate_package(pkg: &Package, analysis: &Analysis, config: &CompileConfig) -> Result<GeneratedUnit, CompileError> {
    let imports = collect_imports(pkg)?;
    let mut generator = Generator::new(pkg, analysis, config, &imports.aliases);
    generator.emit_package(&imports.side_effect)?;
    debug!(warnings = generator.warnings.len(), "generated package {}", pkg.path);
    Ok(GeneratedUnit { path: output_path(&pkg.path), source: generator.w.finish(), warnings: generator.warnings })
}

struct Imports {
    /// Package path -> module alias.
    aliases: BTreeMap<String, String>,
    /// Blank imports, kept for their side effects.
    side_effect: Vec<String>,
}

fn collect_imports(pkg: &Package) -> Result<Imports, CompileError> {
    let mut aliases: BTreeMap<String, String> = BTreeMap::new();
    let mut side_effect = Vec::new();
    for file in &pkg.files {
        for import in &file.imports {
            let path = &import.node.path;
            let alias = match import.node.alias.as_deref() {
                Some("_") => {
                    if !side_effect.contains(path) {
                        side_effect.push(path.clone());
                    }
                    continue;
                }
                Some(".") => return Err(CompileError::unsupported(format!("dot import of \"{path}\""), import.span)),
                Some(alias) => escape_ident(alias),
                None => package_alias(path),
            };
            if aliases.contains_key(path) {
                continue;
            }
            let mut unique = alias.clone();
            let mut n = 1;
            while aliases.values().any(|a| *a == unique) || unique == "$" {
                n += 1;
                unique = format!("{alias}_{n}");
            }
            aliases.insert(path.clone(), unique);
        }
    }
    Ok(Imports { aliases, side_effect })
}

/// A construct `break`/`continue` can target, innermost last.
#[derive(Debug, Clone)]
pub(crate) enum Frame {
    Loop { label: Option<String> },
    /// A native target `switch`.
    Switch { label: Option<String> },
    /// A statement list running inside a callback (select case, type-switch case,
    /// range-over-func body). Leaving it takes a `return`.
    Callback { index: usize, label: Option<String>, kind: CallbackKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallbackKind {
    /// select and type-switch handlers: `return` leaves the construct.
    Handler,
    /// range-over-func yield: `return true` continues, `return false` stops.
    Yield,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Signal {
    Return,
    Break(Option<String>),
    Continue(Option<String>),
}

/// Control flow that has to leave a callback and be replayed outside it.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallbackState {
    pub flow_var: String,
    pub signals: Vec<Signal>,
    pub awaited: bool,
}

/// Per-function generation state.
#[derive(Debug, Clone, Default)]
pub(crate) struct FnCtx {
    pub results: Vec<TypeId>,
    pub named_results: Vec<ObjId>,
    pub defer_stack: Option<String>,
    /// Label of the `try` wrapping the body when deferred calls may observe named results.
    pub body_label: Option<String>,
    pub frames: Vec<Frame>,
    pub callbacks: Vec<CallbackState>,
}

pub(crate) struct Generator<'a> {
    pub pkg: &'a Package,
    pub analysis: &'a Analysis,
    pub config: &'a CompileConfig,
    pub tr: Translator<'a>,
    pub w: CodeWriter,
    pub names: ScopeTracker,
    pub warnings: Vec<CompileWarning>,
    pub fns: Vec<FnCtx>,
    pub structs: HashMap<TypeId, StructModel>,
    /// Methods by receiver named type.
    pub methods: HashMap<TypeId, Vec<&'a FuncDecl>>,
    /// Label attached to the next loop, switch or select.
    pub pending_label: Option<String>,
    pub init_funcs: Vec<(String, bool)>,
}

impl<'a> Generator<'a> {
    fn new(
        pkg: &'a Package,
        analysis: &'a Analysis,
        config: &'a CompileConfig,
        imports: &'a BTreeMap<String, String>,
    ) -> Self {
        let mut methods: HashMap<TypeId, Vec<&'a FuncDecl>> = HashMap::new();
        for file in &pkg.files {
            for decl in &file.decls {
                if let Decl::Func(func) = decl {
                    if let Some(recv) = &func.recv {
                        methods.entry(pkg.types.deref(recv.ty)).or_default().push(func);
                    }
                }
            }
        }
        Self {
            pkg,
            analysis,
            config,
            tr: Translator::new(&pkg.types, &pkg.path, imports),
            w: CodeWriter::new(),
            names: ScopeTracker::with_initial_scope(),
            warnings: Vec::new(),
            fns: Vec::new(),
            structs: HashMap::new(),
            methods,
            pending_label: None,
            init_funcs: Vec::new(),
        }
    }

    // ---- lookups ----

    pub fn types(&self) -> &'a TypeTable {
        &self.pkg.types
    }

    pub fn obj(&self, id: ObjId) -> Option<&'a Object> {
        self.pkg.object(id)
    }

    pub fn fn_ctx(&self) -> Option<&FnCtx> {
        self.fns.last()
    }

    pub fn fn_ctx_mut(&mut self) -> Option<&mut FnCtx> {
        self.fns.last_mut()
    }

    /// Record a degraded default taken because the front end supplied no type.
    pub fn missing_type(&mut self, what: &str, span: Span) {
        let warning = CompileWarning::MissingType { what: what.to_string(), span };
        warn!("{warning}");
        self.warnings.push(warning);
    }

    pub fn expr_type(&mut self, e: &Spanned<Expr>, what: &str) -> Option<TypeId> {
        if e.node.ty.is_none() {
            self.missing_type(what, e.span);
        }
        e.node.ty
    }

    pub fn type_str(&self, ty: TypeId) -> String {
        self.tr.render_str(ty)
    }

    pub fn zero(&self, ty: TypeId) -> String {
        self.tr.zero_value(ty)
    }

    pub fn zero_opt(&mut self, ty: Option<TypeId>, span: Span) -> String {
        match ty {
            Some(t) => self.zero(t),
            None => {
                self.missing_type("zero value", span);
                "null".to_string()
            }
        }
    }

    /// Struct model of a named struct type, built on first use. Ambiguity warnings are
    /// only reported for types declared in this package.
    pub fn struct_model(&mut self, ty: TypeId) -> Option<&StructModel> {
        let named = self.types().deref(ty);
        if !self.structs.contains_key(&named) {
            let mut scratch = Vec::new();
            let model = StructModel::build(self.types(), named, &mut scratch)?;
            let local = self.types().named(named).is_some_and(|n| n.pkg == self.pkg.path);
            if local {
                self.warnings.extend(scratch);
            }
            self.structs.insert(named, model);
        }
        self.structs.get(&named)
    }

    /// Emitted name of a declared object: tracked name, or the escaped source name.
    pub fn name_of(&self, obj: ObjId) -> String {
        match self.names.name_of(obj) {
            Some(name) => name.to_string(),
            None => self.obj(obj).map(|o| escape_ident(&o.name)).unwrap_or_else(|| "_".to_string()),
        }
    }

    pub fn is_boxed(&self, obj: ObjId) -> bool {
        self.analysis.obj_needs_boxing(obj)
    }

    pub fn needs_value_access(&self, obj: ObjId) -> bool {
        self.analysis.obj_needs_boxing(obj) || self.analysis.obj_needs_boxed_access(obj)
    }

    pub fn await_expr(&mut self, call: String) -> String {
        self.mark_await();
        format!("await {call}")
    }

    /// Note that an `await` was emitted in the innermost function or callback.
    pub fn mark_await(&mut self) {
        if let Some(ctx) = self.fns.last_mut() {
            let innermost = ctx.frames.iter().rev().find_map(|f| match f {
                Frame::Callback { index, .. } => Some(*index),
                _ => None,
            });
            if let Some(index) = innermost {
                if let Some(state) = ctx.callbacks.get_mut(index) {
                    state.awaited = true;
                }
            }
        }
    }

    /// Render whatever `f` writes into a nested writer `extra` levels deeper than the
    /// current line.
    pub fn render_nested<F>(&mut self, extra: usize, f: F) -> Result<String, CompileError>
    where
        F: FnOnce(&mut Self) -> Result<(), CompileError>,
    {
        let level = self.w.level() + extra;
        let saved = std::mem::replace(&mut self.w, CodeWriter::with_indent(level));
        let result = f(self);
        let inner = std::mem::replace(&mut self.w, saved);
        result?;
        Ok(inner.finish())
    }

    // ---- package ----

    fn emit_package(&mut self, side_effect: &[String]) -> Result<(), CompileError> {
        let pkg = self.pkg;
        self.w.write_line("// Code generated by goscript. DO NOT EDIT.");
        self.w.blank_line();
        self.w.write_line(&format!("import * as $ from {}", quote(&self.config.runtime_import)));
        for (path, alias) in self.tr.imports {
            self.w.write_line(&format!("import * as {alias} from {}", quote(&self.config.map_import_path(path))));
        }
        for path in side_effect {
            self.w.write_line(&format!("import {}", quote(&self.config.map_import_path(path))));
        }

        self.declare_globals();

        for file in &pkg.files {
            for decl in &file.decls {
                if let Decl::Type(spec) = decl {
                    self.w.blank_line();
                    let docs = docs_for(file, spec.id);
                    self.emit_type_spec(spec, docs, true).map_err(|e| e.in_context(&spec.name.name))?;
                }
            }
        }
        for file in &pkg.files {
            for decl in &file.decls {
                if let Decl::Const(spec) = decl {
                    self.w.blank_line();
                    self.emit_docs(docs_for(file, spec.id));
                    self.emit_const_spec(spec, true)?;
                }
            }
        }
        for file in &pkg.files {
            for decl in &file.decls {
                if let Decl::Var(spec) = decl {
                    self.w.blank_line();
                    self.emit_docs(docs_for(file, spec.id));
                    self.emit_var_spec(spec, true)?;
                }
            }
        }
        for file in &pkg.files {
            for decl in &file.decls {
                if let Decl::Func(func) = decl {
                    if func.recv.is_none() {
                        self.w.blank_line();
                        self.emit_docs(docs_for(file, func.id));
                        self.emit_func_decl(func).map_err(|e| e.in_context(&func.name.name))?;
                    }
                }
            }
        }

        if !self.init_funcs.is_empty() {
            self.w.blank_line();
            for (name, is_async) in std::mem::take(&mut self.init_funcs) {
                if is_async {
                    self.w.write_line(&format!("await {name}()"));
                } else {
                    self.w.write_line(&format!("{name}()"));
                }
            }
        }
        Ok(())
    }

    fn declare_globals(&mut self) {
        let pkg = self.pkg;
        for file in &pkg.files {
            for decl in &file.decls {
                match decl {
                    Decl::Func(func) if func.recv.is_none() => {
                        if let Some(obj) = func.name.obj {
                            if func.name.name != "init" {
                                self.names.declare_global(&func.name.name, obj);
                            }
                        }
                    }
                    Decl::Var(spec) | Decl::Const(spec) => {
                        for name in &spec.names {
                            if let (Some(obj), false) = (name.obj, name.is_blank()) {
                                self.names.declare_global(&name.name, obj);
                            }
                        }
                    }
                    Decl::Type(spec) => {
                        if let Some(obj) = spec.name.obj {
                            self.names.declare_global(&spec.name.name, obj);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn emit_docs(&mut self, docs: &[String]) {
        for line in docs {
            self.w.write_line(&format!("// {line}"));
        }
    }

    /// Type declarations. Local ones are emitted without `export`.
    pub fn emit_type_spec(&mut self, spec: &TypeSpec, docs: &[String], top_level: bool) -> Result<(), CompileError> {
        if spec.alias {
            let line = format!("type {} = {}", escape_ident(&spec.name.name), self.type_str(spec.ty));
            self.emit_docs(docs);
            self.w.write_line(&if top_level { format!("export {line}") } else { line });
            return Ok(());
        }
        let id = spec.ty;
        let text = self.render_nested(0, |g| {
            let types = g.types();
            match types.underlying_type(id) {
                Some(Type::Struct { .. }) => {
                    let Some(model) = g.struct_model(id).cloned() else {
                        return Err(CompileError::codegen(format!("no struct model for {}", spec.name.name)));
                    };
                    let methods = g.render_methods(id, false)?;
                    let tr = &g.tr;
                    crate::synth::class::emit_struct_class(&mut g.w, tr, &model, docs, &methods);
                }
                Some(Type::Interface(_)) => {
                    let tr = &g.tr;
                    crate::synth::iface::emit_interface(&mut g.w, tr, id, docs);
                }
                _ => {
                    let methods = g.render_methods(id, true)?;
                    let tr = &g.tr;
                    crate::synth::iface::emit_named_type(&mut g.w, tr, id, docs, &methods);
                }
            }
            Ok(())
        })?;
        if top_level {
            self.w.write_literally(&text);
        } else {
            self.w.write_literally(&strip_export(&text));
        }
        Ok(())
    }

    fn render_methods(&mut self, ty: TypeId, companion: bool) -> Result<Vec<String>, CompileError> {
        let decls = self.methods.get(&ty).cloned().unwrap_or_default();
        let mut out = Vec::new();
        for func in decls {
            out.push(self.render_method(func, companion).map_err(|e| e.in_context(&func.name.name))?);
        }
        Ok(out)
    }

    // ---- functions ----

    fn emit_func_decl(&mut self, func: &'a FuncDecl) -> Result<(), CompileError> {
        let Some(body) = &func.body else {
            return Err(CompileError::unsupported(
                format!("function '{}' has no body", func.name.name),
                func.span,
            ));
        };
        let is_async = self.analysis.is_node_async(func.id);
        let name = if func.name.name == "init" {
            let name = self.names.fresh("init");
            self.init_funcs.push((name.clone(), is_async));
            name
        } else {
            self.name_of_ident(&func.name)
        };
        let exported = func.name.name.starts_with(|c: char| c.is_uppercase()) || func.name.name == "main";

        self.names.push_scope();
        let (params, prologue) = self.render_params(&func.sig.params)?;
        let ret = self.result_annotation(&func.sig, is_async);
        let header = format!(
            "{}{}function {name}({params}){ret}",
            if exported { "export " } else { "" },
            if is_async { "async " } else { "" }
        );
        self.w.open_block(&header);
        let result = self.emit_function_body(func.id, is_async, &func.sig, body, prologue);
        self.w.close_block("");
        self.names.pop_scope();
        result
    }

    /// A method as class member text, or as a companion-object entry for named
    /// non-struct types.
    fn render_method(&mut self, func: &'a FuncDecl, companion: bool) -> Result<String, CompileError> {
        let Some(body) = &func.body else {
            return Err(CompileError::unsupported(format!("method '{}' has no body", func.name.name), func.span));
        };
        let Some(recv) = &func.recv else {
            return Err(CompileError::codegen("method without receiver"));
        };
        let is_async = self.analysis.is_node_async(func.id);
        let name = crate::synth::member_name(&func.name.name);

        let level = self.w.level() + 1;
        let saved = std::mem::replace(&mut self.w, CodeWriter::with_indent(level));
        self.names.push_scope();
        let result = (|| -> Result<(), CompileError> {
            let mut prologue = Vec::new();
            let mut params = Vec::new();
            let recv_obj = recv.name.as_ref().filter(|n| !n.is_blank()).and_then(|n| n.obj);
            if companion {
                let recv_name = match (&recv.name, recv_obj) {
                    (Some(ident), Some(obj)) => self.declare_param(ident, obj, recv.ty, &mut prologue),
                    _ => "_recv".to_string(),
                };
                params.push(format!("{recv_name}: {}", self.type_str(recv.ty)));
            } else if let (Some(ident), Some(obj)) = (&recv.name, recv_obj) {
                let emitted = self.names.declare(&ident.name, obj);
                let pointer = self.types().is_pointer(recv.ty);
                let value = if !pointer && receiver_mutated(body, obj, self.types()) {
                    "this.clone()"
                } else {
                    "this"
                };
                if self.is_boxed(obj) {
                    prologue.push(format!("let {emitted} = $.varRef({value})"));
                } else {
                    prologue.push(format!("const {emitted} = {value}"));
                }
            }
            let (rest, mut rest_prologue) = self.render_params(&func.sig.params)?;
            if !rest.is_empty() {
                params.push(rest);
            }
            prologue.append(&mut rest_prologue);
            let ret = self.result_annotation(&func.sig, is_async);
            let header = format!(
                "{}{}{name}({}){ret}",
                if companion { "" } else { "public " },
                if is_async { "async " } else { "" },
                params.join(", ")
            );
            self.w.open_block(&header);
            let body_result = self.emit_function_body(func.id, is_async, &func.sig, body, prologue);
            self.w.close_block(if companion { "," } else { "" });
            body_result
        })();
        self.names.pop_scope();
        let text = std::mem::replace(&mut self.w, saved).finish();
        result.map(|_| text)
    }

    pub fn name_of_ident(&mut self, ident: &Ident) -> String {
        match ident.obj {
            Some(obj) => self.name_of(obj),
            None => escape_ident(&ident.name),
        }
    }

    /// Declare one parameter. Boxed parameters arrive under a raw name and are boxed
    /// in the prologue.
    fn declare_param(&mut self, ident: &Ident, obj: ObjId, _ty: TypeId, prologue: &mut Vec<String>) -> String {
        let emitted = self.names.declare(&ident.name, obj);
        if self.is_boxed(obj) {
            let raw = format!("_{emitted}");
            prologue.push(format!("let {emitted} = $.varRef({raw})"));
            raw
        } else {
            emitted
        }
    }

    /// Parameter list text plus prologue lines for boxed parameters.
    pub fn render_params(&mut self, params: &[ParamDecl]) -> Result<(String, Vec<String>), CompileError> {
        let mut out = Vec::new();
        let mut prologue = Vec::new();
        for (i, p) in params.iter().enumerate() {
            let ty = self.type_str(p.ty);
            let name = match &p.name {
                Some(ident) if !ident.is_blank() => match ident.obj {
                    Some(obj) => self.declare_param(ident, obj, p.ty, &mut prologue),
                    None => escape_ident(&ident.name),
                },
                _ => format!("_p{i}"),
            };
            out.push(format!("{name}: {ty}"));
        }
        Ok((out.join(", "), prologue))
    }

    pub fn result_annotation(&self, sig: &FuncSig, is_async: bool) -> String {
        let results: Vec<TypeId> = sig.results.iter().map(|r| r.ty).collect();
        let ty = self.tr.results_type_of(&results).render();
        if is_async { format!(": Promise<{ty}>") } else { format!(": {ty}") }
    }

    /// Body of a function declaration, method or literal, including named results and
    /// the disposal scope for deferred calls.
    pub fn emit_function_body(
        &mut self,
        node: NodeId,
        is_async: bool,
        sig: &FuncSig,
        body: &Spanned<Block>,
        prologue: Vec<String>,
    ) -> Result<(), CompileError> {
        let has_defer = self.analysis.function_for_node(node).is_some_and(|f| f.has_defer);
        let named_results: Vec<ObjId> = sig.results.iter().filter_map(|r| r.name.as_ref().and_then(|n| n.obj)).collect();
        let results: Vec<TypeId> = sig.results.iter().map(|r| r.ty).collect();

        self.fns.push(FnCtx {
            results: results.clone(),
            named_results: named_results.clone(),
            ..FnCtx::default()
        });

        let outcome = (|| -> Result<(), CompileError> {
            for line in &prologue {
                self.w.write_line(line);
            }
            for r in &sig.results {
                let Some(ident) = &r.name else { continue };
                let Some(obj) = ident.obj else { continue };
                let name = self.names.declare(if ident.is_blank() { "_r" } else { &ident.name }, obj);
                let zero = self.zero(r.ty);
                if self.is_boxed(obj) {
                    self.w.write_line(&format!("let {name} = $.varRef({zero})"));
                } else {
                    self.w.write_line(&format!("let {name}: {} = {zero}", self.type_str(r.ty)));
                }
            }

            if !has_defer {
                return self.emit_stmts(&body.node.stmts);
            }

            let stack = "__defer".to_string();
            let class = if is_async { "AsyncDisposableStack" } else { "DisposableStack" };
            self.w.write_line(&format!("const {stack} = new $.{class}()"));
            let label = (!named_results.is_empty()).then(|| "__body".to_string());
            if let Some(ctx) = self.fn_ctx_mut() {
                ctx.defer_stack = Some(stack.clone());
                ctx.body_label = label.clone();
            }
            if let Some(label) = &label {
                self.w.write(&format!("{label}: "));
            }
            self.w.open_block("try");
            self.emit_stmts(&body.node.stmts)?;
            self.w.dedent();
            self.w.write_line("} catch (_e) {");
            self.w.indent();
            self.w.write_line(&format!("{stack}.fail(_e)"));
            self.w.dedent();
            self.w.write_line("} finally {");
            self.w.indent();
            if is_async {
                self.w.write_line(&format!("await {stack}.disposeAsync()"));
            } else {
                self.w.write_line(&format!("{stack}.dispose()"));
            }
            self.w.close_block("");

            if !results.is_empty() {
                let value = if named_results.is_empty() {
                    let zeros: Vec<String> = results.iter().map(|t| self.zero(*t)).collect();
                    tuple_text(zeros)
                } else {
                    self.named_results_value()
                };
                self.w.write_line(&format!("return {value}"));
            }
            Ok(())
        })();

        self.fns.pop();
        outcome
    }

    /// Current values of the named results as a return value.
    pub fn named_results_value(&self) -> String {
        let Some(ctx) = self.fn_ctx() else {
            return String::new();
        };
        let parts: Vec<String> = ctx
            .named_results
            .iter()
            .map(|obj| {
                let name = self.name_of(*obj);
                if self.needs_value_access(*obj) { format!("{name}.value") } else { name }
            })
            .collect();
        tuple_text(parts)
    }
}

/// A single value, or an array literal for several.
pub fn tuple_text(parts: Vec<String>) -> String {
    if parts.len() == 1 {
        parts.into_iter().next().unwrap_or_default()
    } else {
        format!("[{}]", parts.join(", "))
    }
}

pub fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

fn docs_for(file: &SourceFile, id: NodeId) -> &[String] {
    file.comments.get(&id).map(Vec::as_slice).unwrap_or(&[])
}

/// Local declarations are not module exports.
fn strip_export(text: &str) -> String {
    text.lines()
        .map(|line| {
            let trimmed = line.trim_start();
            match trimmed.strip_prefix("export ") {
                Some(rest) => format!("{}{rest}\n", &line[..line.len() - trimmed.len()]),
                None => format!("{line}\n"),
            }
        })
        .collect()
}

/// Whether a value receiver is written through in the method body, which requires the
/// method to work on a copy.
fn receiver_mutated(body: &Spanned<Block>, recv: ObjId, types: &TypeTable) -> bool {
    let mut finder = MutationFinder { target: recv, types, found: false };
    finder.visit_block(body);
    finder.found
}

struct MutationFinder<'t> {
    target: ObjId,
    types: &'t TypeTable,
    found: bool,
}

impl MutationFinder<'_> {
    fn rooted_at_target(&self, e: &Expr) -> bool {
        match &e.unparen().kind {
            ExprKind::Ident(ident) => ident.obj == Some(self.target),
            ExprKind::Selector { base, .. } => {
                base.node.ty.is_none_or(|t| !self.types.is_pointer(t)) && self.rooted_at_target(&base.node)
            }
            ExprKind::Index { base, .. } => {
                base.node.ty.is_some_and(|t| self.types.is_array(t)) && self.rooted_at_target(&base.node)
            }
            _ => false,
        }
    }
}

impl Visitor for MutationFinder<'_> {
    fn visit_stmt(&mut self, stmt: &Spanned<Stmt>) {
        match &stmt.node {
            Stmt::Assign { lhs, .. } => {
                if lhs.iter().any(|e| self.rooted_at_target(&e.node)) {
                    self.found = true;
                }
            }
            Stmt::IncDec { target, .. } => {
                if self.rooted_at_target(&target.node) {
                    self.found = true;
                }
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        match &expr.node.kind {
            ExprKind::Unary { op: UnaryOp::Addr, operand } if self.rooted_at_target(&operand.node) => {
                self.found = true;
            }
            ExprKind::Call { func, .. } => {
                if let ExprKind::Selector { base, sel } = &func.node.unparen().kind {
                    let pointer_recv = base
                        .node
                        .ty
                        .and_then(|t| self.types.method(t, &sel.name))
                        .is_some_and(|m| m.pointer_recv);
                    if pointer_recv && self.rooted_at_target(&base.node) {
                        self.found = true;
                    }
                }
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}
