//! Calls, conversions, builtins, `go` and `defer`.

use crate::ast::*;
use crate::codegen::Generator;
use crate::codegen::expr::Selection;
use crate::diagnostics::CompileError;
use crate::span::Spanned;
use crate::synth::member_name;
use crate::types::{BasicKind, Type, TypeId};

const BUILTINS: &[&str] = &[
    "len", "cap", "append", "make", "new", "delete", "copy", "close", "panic", "recover", "print", "println", "min",
    "max", "clear", "complex", "real", "imag",
];

/// A call split into callee and rendered arguments, so `go` and `defer` can evaluate
/// the arguments early.
pub(crate) struct CallParts {
    pub callee: String,
    pub args: Vec<String>,
}

impl CallParts {
    fn render(&self) -> String {
        format!("{}({})", self.callee, self.args.join(", "))
    }
}

impl Generator<'_> {
    pub fn call_expr(
        &mut self,
        func: &Spanned<Expr>,
        args: &[Spanned<Expr>],
        ellipsis: bool,
        e: &Spanned<Expr>,
    ) -> Result<String, CompileError> {
        if let Some(target) = self.conversion_target(func) {
            let [arg] = args else {
                return Err(CompileError::arity(format!("conversion takes 1 argument, got {}", args.len()), e.span));
            };
            return self.conversion(target, arg);
        }
        if let Some(name) = self.builtin_name(func) {
            return self.builtin_call(name, args, ellipsis, e);
        }
        let parts = self.call_parts(func, args, ellipsis)?;
        let text = parts.render();
        if self.analysis.is_call_async(e.node.id) { Ok(self.await_expr(text)) } else { Ok(text) }
    }

    fn conversion_target(&self, func: &Spanned<Expr>) -> Option<TypeId> {
        match &func.node.unparen().kind {
            ExprKind::Type(t) => Some(*t),
            ExprKind::Ident(ident) => {
                let obj = ident.obj.and_then(|o| self.obj(o))?;
                match obj.kind {
                    ObjKind::TypeName => obj.ty.or(func.node.ty),
                    _ => None,
                }
            }
            ExprKind::Selector { base, sel } => {
                let Selection::Package(_) = self.selection(base, sel) else {
                    return None;
                };
                if let Some(obj) = sel.obj.and_then(|o| self.obj(o)) {
                    return match obj.kind {
                        ObjKind::TypeName => obj.ty.or(func.node.ty),
                        _ => None,
                    };
                }
                func.node.ty.filter(|t| !self.types().is_signature(*t))
            }
            _ => None,
        }
    }

    fn builtin_name<'e>(&self, func: &'e Spanned<Expr>) -> Option<&'e str> {
        let ExprKind::Ident(ident) = &func.node.unparen().kind else {
            return None;
        };
        match ident.obj.and_then(|o| self.obj(o)) {
            Some(obj) if obj.kind == ObjKind::Builtin => Some(ident.name.as_str()),
            None if BUILTINS.contains(&ident.name.as_str()) => Some(ident.name.as_str()),
            _ => None,
        }
    }

    pub(crate) fn call_parts(
        &mut self,
        func: &Spanned<Expr>,
        args: &[Spanned<Expr>],
        ellipsis: bool,
    ) -> Result<CallParts, CompileError> {
        let mut leading = Vec::new();
        let callee = match &func.node.unparen().kind {
            ExprKind::Selector { base, sel } => match self.selection(base, sel) {
                Selection::Package(path) => format!("{}.{}", self.package_ref(&path), sel.name),
                Selection::Method => match self.companion_receiver(base, sel)? {
                    Some((companion, recv)) => {
                        leading.push(recv);
                        format!("{companion}.{}", member_name(&sel.name))
                    }
                    None => format!("{}.{}", self.member_base(base)?, member_name(&sel.name)),
                },
                Selection::MethodExpr(t) => {
                    let types = self.types();
                    let named = types.deref(t);
                    if types.is_struct(named) || types.is_interface(named) {
                        let Some((recv, rest)) = args.split_first() else {
                            return Err(CompileError::arity("method expression call without receiver", func.span));
                        };
                        let recv_text = self.operand(recv)?;
                        let recv_text = if types.is_pointer(t) || types.is_interface(named) {
                            format!("{recv_text}!")
                        } else {
                            recv_text
                        };
                        let callee = format!("{recv_text}.{}", member_name(&sel.name));
                        let sig = func.node.ty.and_then(|ft| types.signature(ft)).cloned();
                        let params: Vec<TypeId> =
                            sig.as_ref().map(|s| s.params.iter().skip(1).copied().collect()).unwrap_or_default();
                        let variadic = sig.as_ref().is_some_and(|s| s.variadic);
                        let rendered = self.call_args(rest, &params, variadic, ellipsis)?;
                        return Ok(CallParts { callee, args: rendered });
                    }
                    self.expr(func)?
                }
                Selection::Field => format!("{}!", self.expr(func)?),
            },
            ExprKind::Ident(ident) => {
                let text = self.ident_expr(ident);
                let is_func_decl = ident.obj.and_then(|o| self.obj(o)).is_some_and(|o| o.kind == ObjKind::Func);
                if is_func_decl { text } else { format!("{text}!") }
            }
            ExprKind::FuncLit { .. } => format!("({})", self.expr(func)?),
            _ => format!("{}!", self.operand(func)?),
        };

        let types = self.types();
        let sig = func.node.ty.and_then(|t| types.signature(t)).cloned();
        let params: Vec<TypeId> = sig.as_ref().map(|s| s.params.clone()).unwrap_or_default();
        let variadic = sig.as_ref().is_some_and(|s| s.variadic);
        let mut rendered = leading;
        rendered.extend(self.call_args(args, &params, variadic, ellipsis)?);
        Ok(CallParts { callee, args: rendered })
    }

    fn call_args(
        &mut self,
        args: &[Spanned<Expr>],
        params: &[TypeId],
        variadic: bool,
        ellipsis: bool,
    ) -> Result<Vec<String>, CompileError> {
        // f(g()) where g returns several values.
        if let [only] = args {
            let tuple = only.node.ty.is_some_and(|t| matches!(self.types().get(t), Some(Type::Tuple(items)) if items.len() > 1));
            if tuple && matches!(only.node.unparen().kind, ExprKind::Call { .. }) {
                return Ok(vec![format!("...{}", self.expr(only)?)]);
            }
        }
        let fixed = if variadic && !ellipsis { params.len().saturating_sub(1) } else { usize::MAX };
        let mut out = Vec::new();
        let mut pack = Vec::new();
        let pack_elem = params.last().and_then(|t| self.types().elem(*t));
        for (i, arg) in args.iter().enumerate() {
            if i >= fixed {
                pack.push(match pack_elem {
                    Some(t) => self.coerce(arg, t)?,
                    None => self.expr(arg)?,
                });
                continue;
            }
            out.push(match params.get(i) {
                Some(t) => self.coerce(arg, *t)?,
                None => self.expr(arg)?,
            });
        }
        if variadic && !ellipsis {
            if pack.is_empty() {
                out.push("null".to_string());
            } else {
                out.push(format!("$.arrayToSlice([{}])", pack.join(", ")));
            }
        }
        Ok(out)
    }

    // ---- conversions ----

    fn conversion(&mut self, target: TypeId, arg: &Spanned<Expr>) -> Result<String, CompileError> {
        let x = self.expr(arg)?;
        let types = self.types();
        let Some(src) = arg.node.ty else {
            self.missing_type("conversion operand", arg.span);
            return Ok(x);
        };

        if types.is_interface(target) {
            return Ok(self.into_interface(x, arg));
        }
        if types.is_string(target) {
            if types.is_string(src) {
                return Ok(x);
            }
            if let Some(k) = types.basic(src).filter(|k| k.is_integer()) {
                let n = if k.is_wide() { format!("Number({x})") } else { x };
                return Ok(format!("$.runeToString({n})"));
            }
            return Ok(match types.elem(src).and_then(|e| types.basic(e)) {
                Some(BasicKind::Uint8) => format!("$.bytesToString({x})"),
                Some(BasicKind::Int32) => format!("$.runesToString({x})"),
                _ => x,
            });
        }
        if types.is_slice(target) && types.is_string(src) {
            return Ok(match types.elem(target).and_then(|e| types.basic(e)) {
                Some(BasicKind::Int32) => format!("$.stringToRunes({x})"),
                _ => format!("$.stringToBytes({x})"),
            });
        }
        if let (Some(tk), Some(sk)) = (types.basic(target), types.basic(src)) {
            if tk.is_numeric() && sk.is_numeric() {
                return Ok(numeric_conversion(x, tk, sk));
            }
            return Ok(x);
        }
        if types.has_value_semantics(target) && !arg.node.is_fresh_value() {
            return Ok(self.tr.clone_expr(&x, src));
        }
        Ok(x)
    }

    // ---- builtins ----

    fn builtin_call(
        &mut self,
        name: &str,
        args: &[Spanned<Expr>],
        ellipsis: bool,
        e: &Spanned<Expr>,
    ) -> Result<String, CompileError> {
        let types = self.types();
        let arity = |n: usize| -> Result<(), CompileError> {
            if args.len() < n {
                Err(CompileError::arity(format!("{name} needs {n} argument(s), got {}", args.len()), e.span))
            } else {
                Ok(())
            }
        };
        match name {
            "len" | "cap" => {
                arity(1)?;
                Ok(format!("$.{name}({})", self.expr(&args[0])?))
            }
            "append" => {
                arity(1)?;
                let slice_ty = args[0].node.ty.or(e.node.ty);
                let elem = slice_ty.and_then(|t| types.elem(t));
                let mut parts = vec![self.expr(&args[0])?];
                if ellipsis {
                    if let Some(rest) = args.get(1) {
                        let text = self.expr(rest)?;
                        if rest.node.ty.is_some_and(|t| types.is_string(t)) {
                            parts.push(format!("...$.toArray($.stringToBytes({text}))"));
                        } else {
                            parts.push(format!("...$.toArray({text})"));
                        }
                    }
                } else {
                    for arg in &args[1..] {
                        parts.push(match elem {
                            Some(t) => self.coerce(arg, t)?,
                            None => self.expr(arg)?,
                        });
                    }
                }
                Ok(format!("$.append({})", parts.join(", ")))
            }
            "make" => {
                arity(1)?;
                let Some(t) = type_argument(&args[0]) else {
                    return Err(CompileError::unsupported("make without a type argument", e.span));
                };
                match types.underlying_type(t) {
                    Some(Type::Slice(elem)) => {
                        let len = match args.get(1) {
                            Some(a) => self.expr(a)?,
                            None => "0".to_string(),
                        };
                        let cap = match args.get(2) {
                            Some(a) => self.expr(a)?,
                            None => "undefined".to_string(),
                        };
                        Ok(format!(
                            "$.makeSlice<{}>({len}, {cap}, () => {})",
                            self.type_str(*elem),
                            self.zero(*elem)
                        ))
                    }
                    Some(Type::Map { key, value }) => {
                        Ok(format!("new Map<{}, {}>()", self.type_str(*key), self.type_str(*value)))
                    }
                    Some(Type::Chan { elem, .. }) => {
                        let cap = match args.get(1) {
                            Some(a) => self.expr(a)?,
                            None => "0".to_string(),
                        };
                        Ok(format!("$.makeChannel<{}>({cap}, {})", self.type_str(*elem), self.zero(*elem)))
                    }
                    _ => Err(CompileError::unsupported(format!("make({})", types.display(t)), e.span)),
                }
            }
            "new" => {
                arity(1)?;
                let Some(t) = type_argument(&args[0]) else {
                    return Err(CompileError::unsupported("new without a type argument", e.span));
                };
                if types.is_struct(t) {
                    Ok(self.zero(t))
                } else {
                    Ok(format!("$.varRef<{}>({})", self.type_str(t), self.zero(t)))
                }
            }
            "delete" => {
                arity(2)?;
                Ok(format!("$.mapDelete({}, {})", self.expr(&args[0])?, self.expr(&args[1])?))
            }
            "copy" => {
                arity(2)?;
                Ok(format!("$.copy({}, {})", self.expr(&args[0])?, self.expr(&args[1])?))
            }
            "close" => {
                arity(1)?;
                Ok(format!("$.close({})", self.expr(&args[0])?))
            }
            "panic" => {
                arity(1)?;
                let v = self.expr(&args[0])?;
                Ok(format!("$.panic({})", self.into_interface(v, &args[0])))
            }
            "recover" => Ok("$.recover()".to_string()),
            "print" | "println" | "min" | "max" => {
                let mut parts = Vec::new();
                for arg in args {
                    parts.push(self.expr(arg)?);
                }
                Ok(format!("$.{name}({})", parts.join(", ")))
            }
            "clear" => {
                arity(1)?;
                let target = self.expr(&args[0])?;
                match args[0].node.ty.filter(|t| types.is_slice(*t)).and_then(|t| types.elem(t)) {
                    Some(elem) => Ok(format!("$.clear({target}, () => {})", self.zero(elem))),
                    None => Ok(format!("$.clear({target})")),
                }
            }
            other => Err(CompileError::unsupported(format!("builtin {other}"), e.span)),
        }
    }

    // ---- go / defer ----

    pub fn emit_go(&mut self, call: &Spanned<Expr>) -> Result<(), CompileError> {
        let body = self.deferred_body(call, "go")?;
        self.w.write_line(&format!("$.go({body})"));
        Ok(())
    }

    pub fn emit_defer(&mut self, call: &Spanned<Expr>) -> Result<(), CompileError> {
        let Some(stack) = self.fn_ctx().and_then(|ctx| ctx.defer_stack.clone()) else {
            return Err(CompileError::codegen("defer outside a function with a disposal scope"));
        };
        let body = self.deferred_body(call, "defer")?;
        self.w.write_line(&format!("{stack}.defer({body})"));
        Ok(())
    }

    /// The function handed to `$.go` or to the disposal stack. Arguments are evaluated
    /// now, the call itself later.
    fn deferred_body(&mut self, call: &Spanned<Expr>, what: &str) -> Result<String, CompileError> {
        let ExprKind::Call { func, args, ellipsis } = &call.node.unparen().kind else {
            return Err(CompileError::unsupported(format!("{what} requires a function call"), call.span));
        };
        if args.is_empty() && matches!(func.node.unparen().kind, ExprKind::FuncLit { .. }) {
            return self.expr(func);
        }
        let mut is_async =
            self.analysis.is_call_async(call.node.id) || self.analysis.is_async_deferred_call(call.node.id);
        let text = if self.conversion_target(func).is_some() || self.builtin_name(func).is_some() {
            let text = self.expr(call)?;
            is_async |= text.contains("await ");
            text
        } else {
            let mut parts = self.call_parts(func, args, *ellipsis)?;
            for arg in parts.args.iter_mut() {
                if !is_constant_text(arg) && !arg.starts_with("...") {
                    let tmp = self.names.fresh("arg");
                    self.w.write_line(&format!("const {tmp} = {arg}"));
                    *arg = tmp;
                }
            }
            parts.render()
        };
        if is_async {
            Ok(format!("async () => {{ await {text} }}"))
        } else {
            Ok(format!("() => {{ {text} }}"))
        }
    }
}

/// The type named by the first argument of `make`/`new`.
fn type_argument(arg: &Spanned<Expr>) -> Option<TypeId> {
    match &arg.node.unparen().kind {
        ExprKind::Type(t) => Some(*t),
        _ => arg.node.ty,
    }
}

fn numeric_conversion(x: String, tk: BasicKind, sk: BasicKind) -> String {
    if tk.is_float() {
        return if sk.is_wide() { format!("Number({x})") } else { x };
    }
    let untyped = matches!(sk, BasicKind::UntypedInt | BasicKind::UntypedRune | BasicKind::UntypedFloat);
    let mut v = if sk.is_float() && !untyped { format!("Math.trunc({x})") } else { x };
    if tk.is_wide() {
        if !sk.is_wide() {
            return format!("BigInt({v})");
        }
        if tk.is_unsigned() != sk.is_unsigned() {
            let f = if tk.is_unsigned() { "asUintN" } else { "asIntN" };
            return format!("BigInt.{f}(64, {v})");
        }
        return v;
    }
    if sk.is_wide() {
        v = format!("Number({v})");
    }
    if untyped {
        return v;
    }
    match tk.bit_width() {
        Some(bits) if bits < 64 && (tk != sk) => format!("$.wrapInt({v}, {bits}, {})", !tk.is_unsigned()),
        _ => v,
    }
}

fn is_constant_text(text: &str) -> bool {
    text == "null"
        || text == "true"
        || text == "false"
        || text.parse::<f64>().is_ok()
        || (text.starts_with('"') && text.ends_with('"') && text.len() >= 2)
}
