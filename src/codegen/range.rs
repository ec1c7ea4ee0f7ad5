//! `for ... range` over integers, slices, arrays, strings, maps, channels and
//! iterator functions.

use crate::ast::*;
use crate::codegen::{CallbackKind, Frame, Generator};
use crate::diagnostics::CompileError;
use crate::span::{Span, Spanned};
use crate::types::{Type, TypeId};

/// How a range variable reaches the body.
enum LoopVar {
    /// Not wanted (absent or `_`).
    Skip,
    /// Declared directly in the loop header under this name.
    Direct(String),
    /// Received into a temporary and bound at the top of the body.
    Bound { temp: String, target: Spanned<Expr> },
}

impl LoopVar {
    fn header_name(&self, skip: &str) -> String {
        match self {
            LoopVar::Skip => skip.to_string(),
            LoopVar::Direct(name) | LoopVar::Bound { temp: name, .. } => name.clone(),
        }
    }
}

impl Generator<'_> {
    pub fn emit_range(
        &mut self,
        key: Option<&Spanned<Expr>>,
        value: Option<&Spanned<Expr>>,
        define: bool,
        iterable: &Spanned<Expr>,
        body: &Spanned<Block>,
        span: Span,
    ) -> Result<(), CompileError> {
        let label = self.take_label();
        let Some(ty) = self.expr_type(iterable, "range expression") else {
            return Err(CompileError::unsupported("range over a value of unknown type", span));
        };
        let types = self.types();
        let iter_text = self.expr(iterable)?;
        self.names.push_scope();
        let result = (|| -> Result<(), CompileError> {
            match types.underlying_type(ty) {
                Some(Type::Basic(kind)) if kind.is_integer() => {
                    let wide = kind.is_wide();
                    self.range_int(key, define, &iter_text, wide, label, body)
                }
                Some(Type::Basic(_)) => self.range_string(key, value, define, &iter_text, label, body),
                Some(Type::Slice(elem)) | Some(Type::Array { elem, .. }) => {
                    let access = if types.is_array(ty) { "" } else { "!" };
                    self.range_indexed(key, value, define, &iter_text, access, *elem, label, body)
                }
                Some(Type::Pointer(inner)) if types.is_array(*inner) => {
                    let elem = types.elem(*inner).unwrap_or(*inner);
                    let boxed_array = format!("{}!.value", iter_text);
                    self.range_indexed(key, value, define, &boxed_array, "", elem, label, body)
                }
                Some(Type::Map { .. }) => self.range_map(key, value, define, &iter_text, label, body),
                Some(Type::Chan { .. }) => self.range_chan(key, define, &iter_text, label, body),
                Some(Type::Signature(sig)) => {
                    let sig = sig.clone();
                    self.range_func(key, value, define, &iter_text, &sig.params, label, body, span)
                }
                _ => Err(CompileError::unsupported(format!("range over {}", types.display(ty)), span)),
            }
        })();
        self.names.pop_scope();
        result
    }

    fn range_int(
        &mut self,
        key: Option<&Spanned<Expr>>,
        define: bool,
        n: &str,
        wide: bool,
        label: Option<String>,
        body: &Spanned<Block>,
    ) -> Result<(), CompileError> {
        let var = self.loop_var(key, define, "i");
        let i = var.header_name(&self.names.fresh("i"));
        let limit = self.names.fresh("n");
        let (zero, step) = if wide { ("0n", format!("{i} += 1n")) } else { ("0", format!("{i}++")) };
        let header = format!("for (let {i} = {zero}, {limit} = {n}; {i} < {limit}; {step})");
        self.loop_body(&header, label, vec![var], body)
    }

    #[allow(clippy::too_many_arguments)]
    fn range_indexed(
        &mut self,
        key: Option<&Spanned<Expr>>,
        value: Option<&Spanned<Expr>>,
        define: bool,
        target: &str,
        access: &str,
        elem: TypeId,
        label: Option<String>,
        body: &Spanned<Block>,
    ) -> Result<(), CompileError> {
        // Evaluated once, before the first iteration; reassigning the operand in the
        // body does not change what is iterated.
        let subject = self.names.fresh("range");
        self.w.open_block("");
        self.w.write_line(&format!("const {subject} = {target}"));
        let key_var = self.loop_var(key, define, "i");
        let i = key_var.header_name(&self.names.fresh("i"));
        let limit = self.names.fresh("n");
        let header = format!("for (let {i} = 0, {limit} = $.len({subject}); {i} < {limit}; {i}++)");
        let mut vars = vec![key_var];
        if let Some(v) = value.filter(|v| !is_blank(v)) {
            let element = self.tr.clone_expr(&format!("{subject}{access}[{i}]"), elem);
            vars.push(LoopVar::Bound { temp: element, target: v.clone() });
        }
        let result = self.loop_body_with(&header, label, vars, body, define);
        self.w.close_block("");
        result
    }

    fn range_string(
        &mut self,
        key: Option<&Spanned<Expr>>,
        value: Option<&Spanned<Expr>>,
        define: bool,
        s: &str,
        label: Option<String>,
        body: &Spanned<Block>,
    ) -> Result<(), CompileError> {
        let k = self.loop_var(key, define, "i");
        let v = self.loop_var(value, define, "r");
        let pattern = destructure_pair(&k, &v);
        let header = format!("for (const {pattern} of $.stringRange({s}))");
        self.loop_body(&header, label, vec![k, v], body)
    }

    fn range_map(
        &mut self,
        key: Option<&Spanned<Expr>>,
        value: Option<&Spanned<Expr>>,
        define: bool,
        m: &str,
        label: Option<String>,
        body: &Spanned<Block>,
    ) -> Result<(), CompileError> {
        let k = self.loop_var(key, define, "k");
        let v = self.loop_var(value, define, "v");
        let pattern = destructure_pair(&k, &v);
        let header = format!("for (const {pattern} of $.mapEntries({m}))");
        self.loop_body(&header, label, vec![k, v], body)
    }

    fn range_chan(
        &mut self,
        key: Option<&Spanned<Expr>>,
        define: bool,
        ch: &str,
        label: Option<String>,
        body: &Spanned<Block>,
    ) -> Result<(), CompileError> {
        let v = self.loop_var(key, define, "v");
        let received = v.header_name(&self.names.fresh("v"));
        let ok = self.names.fresh("ok");
        self.w.open_block(&format!("{}for (;;)", Self::label_prefix(&label)));
        let recv = self.await_expr(format!("$.chanRecvWithOk({ch})"));
        self.w.write_line(&format!("const [{received}, {ok}] = {recv}"));
        self.w.write_line(&format!("if (!{ok}) break"));
        self.bind_loop_vars(vec![v], define)?;
        self.push_frame(Frame::Loop { label });
        let result = self.emit_scoped(&body.node.stmts);
        self.pop_frame();
        result?;
        self.w.close_block("");
        Ok(())
    }

    /// `for k, v := range seq`: the body becomes the yield callback.
    #[allow(clippy::too_many_arguments)]
    fn range_func(
        &mut self,
        key: Option<&Spanned<Expr>>,
        value: Option<&Spanned<Expr>>,
        define: bool,
        iterator: &str,
        params: &[TypeId],
        label: Option<String>,
        body: &Spanned<Block>,
        span: Span,
    ) -> Result<(), CompileError> {
        let types = self.types();
        let yield_params: Vec<TypeId> =
            params.first().and_then(|y| types.signature(*y)).map(|s| s.params.clone()).unwrap_or_default();
        let mut vars = Vec::new();
        let mut decl = Vec::new();
        for (i, target) in [key, value].into_iter().enumerate() {
            let Some(ty) = yield_params.get(i) else { break };
            let var = self.loop_var(target, define, if i == 0 { "k" } else { "v" });
            let name = var.header_name(&self.names.fresh("arg"));
            decl.push(format!("{name}: {}", self.type_str(*ty)));
            vars.push(var);
        }
        let index = self.open_callback(label, CallbackKind::Yield);
        let inner = self.render_nested(1, |g| {
            g.bind_loop_vars(vars, define)?;
            g.emit_scoped(&body.node.stmts)?;
            g.w.write_line("return true");
            Ok(())
        });
        let state = self.close_callback(index);
        let inner = inner?;
        if state.awaited {
            return Err(CompileError::unsupported("range-over-func body that blocks", span));
        }
        let pad = self.w.padding();
        let text = format!("{pad}{iterator}(({}): boolean => {{\n{inner}{pad}}})\n", decl.join(", "));
        self.finish_callback(&state, &text)
    }

    // ---- shared ----

    /// Classify one range variable. Variables declared by the loop that need no box
    /// live in the header; everything else goes through a temporary.
    fn loop_var(&mut self, target: Option<&Spanned<Expr>>, define: bool, hint: &str) -> LoopVar {
        let Some(target) = target.filter(|t| !is_blank(t)) else {
            return LoopVar::Skip;
        };
        if define {
            if let Some(ident) = target.node.as_ident() {
                let plain = ident.obj.is_some_and(|o| !self.needs_value_access(o));
                if plain {
                    return LoopVar::Direct(self.declare_ident(ident));
                }
            }
        }
        LoopVar::Bound { temp: self.names.fresh(hint), target: target.clone() }
    }

    fn bind_loop_vars(&mut self, vars: Vec<LoopVar>, define: bool) -> Result<(), CompileError> {
        for var in vars {
            let LoopVar::Bound { temp, target } = var else { continue };
            let ident = target.node.as_ident();
            let value = self.box_for_binding(ident.and_then(|i| i.obj), temp);
            match ident {
                Some(ident) if define => {
                    let name = self.declare_ident(ident);
                    let ty = self.obj_type(ident).or(target.node.ty);
                    self.write_declaration(&name, ident.obj, &value, ty, "", false);
                }
                _ => {
                    let lv = self.lvalue(&target)?;
                    self.write_store(lv, value);
                }
            }
        }
        Ok(())
    }

    fn loop_body(
        &mut self,
        header: &str,
        label: Option<String>,
        vars: Vec<LoopVar>,
        body: &Spanned<Block>,
    ) -> Result<(), CompileError> {
        self.loop_body_with(header, label, vars, body, true)
    }

    fn loop_body_with(
        &mut self,
        header: &str,
        label: Option<String>,
        vars: Vec<LoopVar>,
        body: &Spanned<Block>,
        define: bool,
    ) -> Result<(), CompileError> {
        self.w.open_block(&format!("{}{header}", Self::label_prefix(&label)));
        self.bind_loop_vars(vars, define)?;
        self.push_frame(Frame::Loop { label });
        let result = self.emit_scoped(&body.node.stmts);
        self.pop_frame();
        result?;
        self.w.close_block("");
        Ok(())
    }
}

fn is_blank(e: &Spanned<Expr>) -> bool {
    e.node.as_ident().is_some_and(Ident::is_blank)
}

/// `[k, v]`, `[k]` or `[, v]`.
fn destructure_pair(k: &LoopVar, v: &LoopVar) -> String {
    match (k, v) {
        (_, LoopVar::Skip) => format!("[{}]", k.header_name("")),
        _ => format!("[{}, {}]", k.header_name(""), v.header_name("")),
    }
}
