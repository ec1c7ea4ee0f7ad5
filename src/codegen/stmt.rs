//! Statements, blocks and the control-flow frames that `break`, `continue` and
//! `return` resolve against.

use crate::ast::*;
use crate::codegen::{CallbackKind, CallbackState, Frame, Generator, Signal, quote};
use crate::diagnostics::CompileError;
use crate::span::{Span, Spanned};

impl Generator<'_> {
    pub fn emit_stmts(&mut self, stmts: &[Spanned<Stmt>]) -> Result<(), CompileError> {
        for stmt in stmts {
            self.emit_stmt(stmt)?;
        }
        Ok(())
    }

    /// Statements of a nested block in their own name scope.
    pub fn emit_scoped(&mut self, stmts: &[Spanned<Stmt>]) -> Result<(), CompileError> {
        self.names.push_scope();
        let result = self.emit_stmts(stmts);
        self.names.pop_scope();
        result
    }

    pub fn emit_stmt(&mut self, stmt: &Spanned<Stmt>) -> Result<(), CompileError> {
        match &stmt.node {
            Stmt::Expr(e) => {
                let text = self.expr(e)?;
                self.w.write_line(&text);
            }
            Stmt::Define { lhs, rhs } => self.emit_define(lhs, rhs, stmt.span)?,
            Stmt::Var(spec) => self.emit_var_spec(spec, false)?,
            Stmt::Const(spec) => self.emit_const_spec(spec, false)?,
            Stmt::Type(spec) => self.emit_type_spec(spec, &[], false)?,
            Stmt::Assign { lhs, op, rhs } => self.emit_assign(lhs, *op, rhs, stmt.span)?,
            Stmt::IncDec { target, inc } => self.emit_inc_dec(target, *inc)?,
            Stmt::Send { chan, value } => {
                let line = self.send_expr(chan, value)?;
                self.w.write_line(&line);
            }
            Stmt::Go(call) => self.emit_go(call)?,
            Stmt::Defer(call) => self.emit_defer(call)?,
            Stmt::Return(values) => self.emit_return(values, stmt.span)?,
            Stmt::Break(label) => self.emit_break(label.as_deref(), stmt.span)?,
            Stmt::Continue(label) => self.emit_continue(label.as_deref(), stmt.span)?,
            Stmt::Goto(label) => {
                return Err(CompileError::unsupported(format!("goto {label}"), stmt.span));
            }
            // Handled by the enclosing switch, which omits the case's `break`.
            Stmt::Fallthrough => {}
            Stmt::Block(block) => {
                self.w.open_block("");
                self.emit_scoped(&block.node.stmts)?;
                self.w.close_block("");
            }
            Stmt::If { init, cond, then_block, else_branch } => {
                self.emit_if(init.as_deref(), cond, then_block, else_branch.as_deref())?
            }
            Stmt::For { init, cond, post, body } => {
                self.emit_for(init.as_deref(), cond.as_ref(), post.as_deref(), body)?
            }
            Stmt::Range { key, value, define, iterable, body } => {
                self.emit_range(key.as_ref(), value.as_ref(), *define, iterable, body, stmt.span)?
            }
            Stmt::Switch { init, tag, cases } => self.emit_switch(init.as_deref(), tag.as_ref(), cases)?,
            Stmt::TypeSwitch { init, binding, subject, cases } => {
                self.emit_type_switch(init.as_deref(), binding.as_ref(), subject, cases)?
            }
            Stmt::Select { cases } => self.emit_select(cases, stmt.span)?,
            Stmt::Labeled { label, stmt: inner } => {
                if is_labelable(&inner.node) {
                    self.pending_label = Some(label.clone());
                }
                self.emit_stmt(inner)?;
                self.pending_label = None;
            }
            Stmt::Empty => {}
        }
        Ok(())
    }

    pub fn take_label(&mut self) -> Option<String> {
        self.pending_label.take()
    }

    /// `label: ` prefix for a native loop or switch.
    pub fn label_prefix(label: &Option<String>) -> String {
        match label {
            Some(l) => format!("{l}: "),
            None => String::new(),
        }
    }

    // ---- if / for ----

    fn emit_if(
        &mut self,
        init: Option<&Spanned<Stmt>>,
        cond: &Spanned<Expr>,
        then_block: &Spanned<Block>,
        else_branch: Option<&Spanned<Stmt>>,
    ) -> Result<(), CompileError> {
        if let Some(init) = init {
            self.w.open_block("");
            self.names.push_scope();
            self.emit_stmt(init)?;
        }
        let cond_text = self.expr(cond)?;
        self.w.open_block(&format!("if ({})", strip_parens(&cond_text)));
        self.emit_scoped(&then_block.node.stmts)?;
        self.emit_else(else_branch)?;
        if init.is_some() {
            self.names.pop_scope();
            self.w.close_block("");
        }
        Ok(())
    }

    fn emit_else(&mut self, else_branch: Option<&Spanned<Stmt>>) -> Result<(), CompileError> {
        let Some(branch) = else_branch else {
            self.w.close_block("");
            return Ok(());
        };
        self.w.dedent();
        match &branch.node {
            Stmt::If { init: None, cond, then_block, else_branch } => {
                let cond_text = self.expr(cond)?;
                self.w.write_line(&format!("}} else if ({}) {{", strip_parens(&cond_text)));
                self.w.indent();
                self.emit_scoped(&then_block.node.stmts)?;
                self.emit_else(else_branch.as_deref())
            }
            Stmt::Block(block) => {
                self.w.write_line("} else {");
                self.w.indent();
                self.emit_scoped(&block.node.stmts)?;
                self.w.close_block("");
                Ok(())
            }
            _ => {
                self.w.write_line("} else {");
                self.w.indent();
                self.names.push_scope();
                let result = self.emit_stmt(branch);
                self.names.pop_scope();
                result?;
                self.w.close_block("");
                Ok(())
            }
        }
    }

    fn emit_for(
        &mut self,
        init: Option<&Spanned<Stmt>>,
        cond: Option<&Spanned<Expr>>,
        post: Option<&Spanned<Stmt>>,
        body: &Spanned<Block>,
    ) -> Result<(), CompileError> {
        let label = self.take_label();
        self.names.push_scope();
        let result = (|| -> Result<(), CompileError> {
            let init_text = match init {
                Some(stmt) => self.render_nested(1, |g| g.emit_stmt(stmt))?,
                None => String::new(),
            };
            let inline_init = single_line(&init_text);
            let wrapped = !init_text.is_empty() && inline_init.is_none();
            if wrapped {
                self.w.open_block("");
                self.w.write_literally(&init_text);
            }
            let cond_text = match cond {
                Some(c) => strip_parens(&self.expr(c)?).to_string(),
                None => String::new(),
            };
            let post_text = match post {
                Some(stmt) => self.render_post(stmt)?,
                None => String::new(),
            };
            let header = if init.is_none() && post.is_none() {
                if cond_text.is_empty() { "for (;;)".to_string() } else { format!("while ({cond_text})") }
            } else {
                format!("for ({}; {cond_text}; {post_text})", inline_init.unwrap_or_default())
            };
            self.w.open_block(&format!("{}{header}", Self::label_prefix(&label)));
            self.push_frame(Frame::Loop { label: label.clone() });
            let body_result = self.emit_scoped(&body.node.stmts);
            self.pop_frame();
            body_result?;
            self.w.close_block("");
            if wrapped {
                self.w.close_block("");
            }
            Ok(())
        })();
        self.names.pop_scope();
        result
    }

    /// The post statement of a three-clause loop as header text. Statements that need
    /// more than one line run in an immediately invoked arrow function.
    fn render_post(&mut self, stmt: &Spanned<Stmt>) -> Result<String, CompileError> {
        let text = self.render_nested(1, |g| g.emit_stmt(stmt))?;
        if let Some(line) = single_line(&text) {
            return Ok(line);
        }
        let pad = self.w.padding();
        if text.contains("await ") {
            Ok(format!("await (async () => {{\n{text}{pad}}})()"))
        } else {
            Ok(format!("(() => {{\n{text}{pad}}})()"))
        }
    }

    // ---- frames ----

    pub fn push_frame(&mut self, frame: Frame) {
        if let Some(ctx) = self.fn_ctx_mut() {
            ctx.frames.push(frame);
        }
    }

    pub fn pop_frame(&mut self) {
        if let Some(ctx) = self.fn_ctx_mut() {
            ctx.frames.pop();
        }
    }

    /// Start a callback-backed construct: handler bodies rendered until
    /// `close_callback` run inside a target function.
    pub fn open_callback(&mut self, label: Option<String>, kind: CallbackKind) -> usize {
        let flow_var = self.names.fresh("flow");
        let Some(ctx) = self.fn_ctx_mut() else {
            return 0;
        };
        ctx.callbacks.push(CallbackState { flow_var, ..CallbackState::default() });
        let index = ctx.callbacks.len() - 1;
        ctx.frames.push(Frame::Callback { index, label, kind });
        index
    }

    pub fn close_callback(&mut self, index: usize) -> CallbackState {
        match self.fn_ctx_mut() {
            Some(ctx) => {
                ctx.frames.pop();
                ctx.callbacks.get(index).cloned().unwrap_or_default()
            }
            None => CallbackState::default(),
        }
    }

    /// Write a callback-backed construct: the flow variable its handlers may set, the
    /// construct itself, then the replay of whatever control flow escaped it.
    pub fn finish_callback(&mut self, state: &CallbackState, text: &str) -> Result<(), CompileError> {
        if !state.signals.is_empty() {
            self.w.write_line(&format!("let {}: any = undefined", state.flow_var));
        }
        self.w.write_literally(text);
        let flow = &state.flow_var;
        for signal in &state.signals {
            match signal {
                Signal::Return => {
                    self.w.open_block(&format!("if ({flow}?.kind === \"return\")"));
                    let has_results = self.fn_ctx().is_some_and(|ctx| !ctx.results.is_empty());
                    let value = has_results.then(|| format!("{flow}.value"));
                    self.emit_return_text(value)?;
                    self.w.close_block("");
                }
                Signal::Break(label) => {
                    self.w.open_block(&format!("if ({flow}?.kind === \"break\"{})", label_check(flow, label)));
                    self.emit_break(label.as_deref(), Span::dummy())?;
                    self.w.close_block("");
                }
                Signal::Continue(label) => {
                    self.w.open_block(&format!("if ({flow}?.kind === \"continue\"{})", label_check(flow, label)));
                    self.emit_continue(label.as_deref(), Span::dummy())?;
                    self.w.close_block("");
                }
            }
        }
        Ok(())
    }

    fn frames(&self) -> Vec<Frame> {
        self.fn_ctx().map(|ctx| ctx.frames.clone()).unwrap_or_default()
    }

    /// Leave the innermost callback with `signal`, recording it for replay.
    fn escape_callback(&mut self, index: usize, kind: CallbackKind, signal: Signal, value: Option<String>) {
        let Some(state) = self.fn_ctx_mut().and_then(|ctx| ctx.callbacks.get_mut(index)) else {
            return;
        };
        let flow = state.flow_var.clone();
        if !state.signals.contains(&signal) {
            state.signals.push(signal.clone());
        }
        let record = match (&signal, value) {
            (Signal::Return, Some(v)) => format!("{{ kind: \"return\", value: {v} }}"),
            (Signal::Return, None) => "{ kind: \"return\" }".to_string(),
            (Signal::Break(label), _) => flow_record("break", label),
            (Signal::Continue(label), _) => flow_record("continue", label),
        };
        self.w.write_line(&format!("{flow} = {record}"));
        self.w.write_line(exit_callback(kind));
    }

    fn emit_break(&mut self, label: Option<&str>, span: Span) -> Result<(), CompileError> {
        let frames = self.frames();
        let mut crossed: Option<(usize, CallbackKind)> = None;
        for frame in frames.iter().rev() {
            let frame_label = match frame {
                Frame::Loop { label: l } | Frame::Switch { label: l } | Frame::Callback { label: l, .. } => l,
            };
            let hit = label.is_none_or(|wanted| frame_label.as_deref() == Some(wanted));
            if hit {
                if let Some((index, kind)) = crossed {
                    self.escape_callback(index, kind, Signal::Break(label.map(String::from)), None);
                    return Ok(());
                }
                match frame {
                    Frame::Callback { kind, .. } => self.w.write_line(exit_callback(*kind)),
                    _ => match label {
                        Some(l) => self.w.write_line(&format!("break {l}")),
                        None => self.w.write_line("break"),
                    },
                }
                return Ok(());
            }
            if let Frame::Callback { index, kind, .. } = frame {
                crossed.get_or_insert((*index, *kind));
            }
        }
        Err(CompileError::codegen(format!("break outside of loop, switch or select at {}..{}", span.start, span.end)))
    }

    fn emit_continue(&mut self, label: Option<&str>, span: Span) -> Result<(), CompileError> {
        let frames = self.frames();
        let mut crossed: Option<(usize, CallbackKind)> = None;
        for frame in frames.iter().rev() {
            let (frame_label, is_loop) = match frame {
                Frame::Loop { label: l } => (l, true),
                Frame::Callback { label: l, kind: CallbackKind::Yield, .. } => (l, true),
                Frame::Switch { label: l } | Frame::Callback { label: l, .. } => (l, false),
            };
            let hit = is_loop
                && match label {
                    Some(wanted) => frame_label.as_deref() == Some(wanted),
                    None => true,
                };
            if hit {
                if let Some((index, kind)) = crossed {
                    self.escape_callback(index, kind, Signal::Continue(label.map(String::from)), None);
                    return Ok(());
                }
                match (frame, label) {
                    (Frame::Callback { .. }, _) => self.w.write_line("return true"),
                    (_, Some(l)) => self.w.write_line(&format!("continue {l}")),
                    (_, None) => self.w.write_line("continue"),
                }
                return Ok(());
            }
            if let Frame::Callback { index, kind, .. } = frame {
                crossed.get_or_insert((*index, *kind));
            }
        }
        Err(CompileError::codegen(format!("continue outside of loop at {}..{}", span.start, span.end)))
    }

    fn emit_return(&mut self, values: &[Spanned<Expr>], span: Span) -> Result<(), CompileError> {
        let results = self.fn_ctx().map(|ctx| ctx.results.clone()).unwrap_or_default();
        let value = if values.is_empty() {
            let named = self.fn_ctx().is_some_and(|ctx| !ctx.named_results.is_empty());
            if named { Some(self.named_results_value()) } else { None }
        } else if values.len() == 1 && results.len() > 1 {
            // `return f()` forwarding a tuple.
            Some(self.expr(&values[0])?)
        } else {
            if values.len() != results.len() && !results.is_empty() {
                return Err(CompileError::arity(
                    format!("return has {} values, function has {} results", values.len(), results.len()),
                    span,
                ));
            }
            let mut parts = Vec::new();
            for (i, v) in values.iter().enumerate() {
                let text = match results.get(i) {
                    Some(ty) => self.coerce(v, *ty)?,
                    None => self.expr(v)?,
                };
                parts.push(text);
            }
            Some(super::tuple_text(parts))
        };
        self.emit_return_text(value)
    }

    /// Return `value` from the current function, crossing any callbacks in between.
    pub fn emit_return_text(&mut self, value: Option<String>) -> Result<(), CompileError> {
        let innermost = self.frames().iter().rev().find_map(|f| match f {
            Frame::Callback { index, kind, .. } => Some((*index, *kind)),
            _ => None,
        });
        if let Some((index, kind)) = innermost {
            self.escape_callback(index, kind, Signal::Return, value);
            return Ok(());
        }
        let (body_label, named) = match self.fn_ctx() {
            Some(ctx) => (ctx.body_label.clone(), ctx.named_results.clone()),
            None => (None, vec![]),
        };
        match (body_label, value) {
            (Some(label), value) => {
                if let Some(v) = value {
                    let current = self.named_results_value();
                    if v != current {
                        let targets: Vec<String> = named
                            .iter()
                            .map(|obj| {
                                let name = self.name_of(*obj);
                                if self.needs_value_access(*obj) { format!("{name}.value") } else { name }
                            })
                            .collect();
                        if targets.len() == 1 {
                            self.w.write_line(&format!("{} = {v}", targets[0]));
                        } else {
                            self.w.write_line(&format!("[{}] = {v}", targets.join(", ")));
                        }
                    }
                }
                self.w.write_line(&format!("break {label}"));
            }
            (None, Some(v)) => self.w.write_line(&format!("return {v}")),
            (None, None) => self.w.write_line("return"),
        }
        Ok(())
    }
}

fn is_labelable(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::For { .. } | Stmt::Range { .. } | Stmt::Switch { .. } | Stmt::TypeSwitch { .. } | Stmt::Select { .. }
    )
}

fn flow_record(kind: &str, label: &Option<String>) -> String {
    match label {
        Some(l) => format!("{{ kind: \"{kind}\", label: {} }}", quote(l)),
        None => format!("{{ kind: \"{kind}\" }}"),
    }
}

fn label_check(flow: &str, label: &Option<String>) -> String {
    match label {
        Some(l) => format!(" && {flow}.label === {}", quote(l)),
        None => String::new(),
    }
}

/// Leaving a callback early: handlers return, yield bodies stop the iteration.
fn exit_callback(kind: CallbackKind) -> &'static str {
    match kind {
        CallbackKind::Handler => "return",
        CallbackKind::Yield => "return false",
    }
}

/// The text of a one-line rendering without its newline.
fn single_line(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.contains('\n') {
        return None;
    }
    Some(trimmed.to_string())
}

/// Conditions are rendered in their own parentheses by `if`/`while`.
pub(crate) fn strip_parens(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'(') || bytes.last() != Some(&b')') {
        return text;
    }
    let mut depth = 0i32;
    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i != text.len() - 1 {
                    return text;
                }
            }
            _ => {}
        }
    }
    &text[1..text.len() - 1]
}
