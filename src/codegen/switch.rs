//! `switch`, type switches and `select`.

use crate::ast::*;
use crate::codegen::{CallbackKind, Frame, Generator};
use crate::diagnostics::CompileError;
use crate::span::{Span, Spanned};
use crate::translate::descriptor::describe;

impl Generator<'_> {
    pub fn emit_switch(
        &mut self,
        init: Option<&Spanned<Stmt>>,
        tag: Option<&Spanned<Expr>>,
        cases: &[CaseClause],
    ) -> Result<(), CompileError> {
        let label = self.take_label();
        if let Some(init) = init {
            self.w.open_block("");
            self.names.push_scope();
            self.emit_stmt(init)?;
        }
        let result = self.switch_body(label, tag, cases);
        if init.is_some() {
            self.names.pop_scope();
            self.w.close_block("");
        }
        result
    }

    fn switch_body(
        &mut self,
        label: Option<String>,
        tag: Option<&Spanned<Expr>>,
        cases: &[CaseClause],
    ) -> Result<(), CompileError> {
        let tag_ty = tag.and_then(|t| t.node.ty);
        let by_value = tag_ty.is_some_and(|t| self.types().has_value_semantics(t));
        let (head, struct_tag) = match tag {
            Some(t) if by_value => {
                let tmp = self.names.fresh("tag");
                let text = self.expr(t)?;
                self.w.write_line(&format!("const {tmp} = {text}"));
                ("true".to_string(), Some(tmp))
            }
            Some(t) => (super::stmt::strip_parens(&self.expr(t)?).to_string(), None),
            None => ("true".to_string(), None),
        };
        self.w.open_block(&format!("{}switch ({head})", Self::label_prefix(&label)));
        self.push_frame(Frame::Switch { label });
        let result = (|| -> Result<(), CompileError> {
            for clause in cases {
                self.emit_case_clause(clause, struct_tag.as_deref())?;
            }
            Ok(())
        })();
        self.pop_frame();
        result?;
        self.w.close_block("");
        Ok(())
    }

    fn emit_case_clause(
        &mut self,
        clause: &CaseClause,
        struct_tag: Option<&str>,
    ) -> Result<(), CompileError> {
        let mut labels = Vec::new();
        for e in &clause.exprs {
            let text = match struct_tag {
                Some(tag) => format!("$.structEquals({tag}, {})", self.expr(e)?),
                None => self.expr(e)?,
            };
            labels.push(text);
        }
        if clause.is_default() {
            self.w.open_block("default:");
        } else {
            let last = labels.len() - 1;
            for (i, text) in labels.iter().enumerate() {
                if i == last {
                    self.w.open_block(&format!("case {text}:"));
                } else {
                    self.w.write_line(&format!("case {text}:"));
                }
            }
        }
        self.emit_scoped(&clause.body)?;
        if !ends_case(&clause.body) {
            self.w.write_line("break");
        }
        self.w.close_block("");
        Ok(())
    }

    // ---- type switch ----

    pub fn emit_type_switch(
        &mut self,
        init: Option<&Spanned<Stmt>>,
        binding: Option<&Ident>,
        subject: &Spanned<Expr>,
        cases: &[TypeCaseClause],
    ) -> Result<(), CompileError> {
        let label = self.take_label();
        if let Some(init) = init {
            self.w.open_block("");
            self.names.push_scope();
            self.emit_stmt(init)?;
        }
        let result = self.type_switch_body(label, binding, subject, cases);
        if init.is_some() {
            self.names.pop_scope();
            self.w.close_block("");
        }
        result
    }

    fn type_switch_body(
        &mut self,
        label: Option<String>,
        binding: Option<&Ident>,
        subject: &Spanned<Expr>,
        cases: &[TypeCaseClause],
    ) -> Result<(), CompileError> {
        let subject = match &subject.node.unparen().kind {
            ExprKind::TypeAssert { base, ty: None } => base.as_ref(),
            _ => subject,
        };
        let subject_text = self.expr(subject)?;
        let bound = binding.is_some_and(|b| !b.is_blank());

        let index = self.open_callback(label, CallbackKind::Handler);
        let rendered = (|| -> Result<(Vec<(String, String, String)>, Option<(String, String)>), CompileError> {
            let mut arms = Vec::new();
            let mut default = None;
            for clause in cases {
                let single = match clause.types.as_slice() {
                    [Some(t)] => Some(*t),
                    _ => None,
                };
                let param_ty = match single {
                    Some(t) => self.type_str(t),
                    None => "any".to_string(),
                };
                let depth = if clause.is_default() { 1 } else { 2 };
                let mut param = String::new();
                let body = self.render_nested(depth, |g| {
                    g.names.push_scope();
                    let result = (|| -> Result<(), CompileError> {
                        if let (true, Some(obj)) = (bound, clause.binding_obj) {
                            let name = binding.map(|b| b.name.as_str()).unwrap_or("v");
                            let declared = g.names.declare(name, obj);
                            if g.is_boxed(obj) {
                                param = format!("_{declared}");
                                g.w.write_line(&format!("let {declared} = $.varRef({param})"));
                            } else {
                                param = declared;
                            }
                        }
                        g.emit_stmts(&clause.body)
                    })();
                    g.names.pop_scope();
                    result
                })?;
                let param = if param.is_empty() { "_v".to_string() } else { param };
                let signature = format!("({param}: {param_ty})");
                if clause.is_default() {
                    default = Some((signature, body));
                } else {
                    let descs: Vec<String> = clause
                        .types
                        .iter()
                        .map(|t| match t {
                            Some(t) => describe(self.types(), *t),
                            None => "null".to_string(),
                        })
                        .collect();
                    arms.push((descs.join(", "), signature, body));
                }
            }
            Ok((arms, default))
        })();
        let state = self.close_callback(index);
        let (arms, default) = rendered?;

        let prefix = if state.awaited { "async " } else { "" };
        let pad = self.w.padding();
        let inner_pad = format!("{pad}  ");
        let mut text = String::new();
        let call = format!("$.typeSwitch({subject_text}, [");
        let call = if state.awaited { self.await_expr(call) } else { call };
        text.push_str(&format!("{pad}{call}\n"));
        for (descs, signature, body) in arms {
            text.push_str(&format!("{inner_pad}{{ types: [{descs}], body: {prefix}{signature} => {{\n"));
            text.push_str(&body);
            text.push_str(&format!("{inner_pad}}} }},\n"));
        }
        match default {
            Some((signature, body)) => {
                text.push_str(&format!("{pad}], {prefix}{signature} => {{\n"));
                text.push_str(&body);
                text.push_str(&format!("{pad}}})\n"));
            }
            None => text.push_str(&format!("{pad}])\n")),
        }
        self.finish_callback(&state, &text)
    }

    // ---- select ----

    pub fn emit_select(&mut self, cases: &[CommClause], span: Span) -> Result<(), CompileError> {
        let label = self.take_label();
        let has_default = cases.iter().any(|c| c.comm.is_none());
        if cases.iter().filter(|c| c.comm.is_none()).count() > 1 {
            return Err(CompileError::unsupported("select with more than one default", span));
        }

        // Channel operands are evaluated before any case is chosen.
        let mut heads = Vec::new();
        for (id, clause) in cases.iter().enumerate() {
            let head = match &clause.comm {
                Some(CommOp::Recv { chan, .. }) => {
                    format!("id: {id}, isSend: false, channel: {}", self.expr(chan)?)
                }
                Some(CommOp::Send { chan, value }) => {
                    let ch = self.expr(chan)?;
                    let elem = chan.node.ty.and_then(|t| self.types().elem(t));
                    let v = match elem {
                        Some(t) => self.coerce(value, t)?,
                        None => self.expr(value)?,
                    };
                    format!("id: {id}, isSend: true, channel: {ch}, value: {v}")
                }
                None => "id: -1, isSend: false, channel: null".to_string(),
            };
            heads.push(head);
        }

        let index = self.open_callback(label, CallbackKind::Handler);
        let rendered = (|| -> Result<Vec<(String, String)>, CompileError> {
            let mut arms = Vec::new();
            for (clause, head) in cases.iter().zip(heads) {
                let mut uses_result = false;
                let body = self.render_nested(2, |g| {
                    g.names.push_scope();
                    let result = (|| -> Result<(), CompileError> {
                        if let Some(CommOp::Recv { lhs, define, .. }) = &clause.comm {
                            uses_result = g.bind_received(lhs, *define)?;
                        }
                        g.emit_stmts(&clause.body)
                    })();
                    g.names.pop_scope();
                    result
                })?;
                let param = if uses_result { "result" } else { "" };
                arms.push((format!("{head}, onSelected: async ({param}) => {{"), body));
            }
            Ok(arms)
        })();
        let state = self.close_callback(index);
        let arms = rendered?;

        let pad = self.w.padding();
        let inner_pad = format!("{pad}  ");
        let call = self.await_expr("$.selectStatement([".to_string());
        let mut text = format!("{pad}{call}\n");
        for (open, body) in arms {
            text.push_str(&format!("{inner_pad}{{ {open}\n"));
            text.push_str(&body);
            text.push_str(&format!("{inner_pad}}} }},\n"));
        }
        text.push_str(&format!("{pad}], {has_default})\n"));
        self.finish_callback(&state, &text)
    }

    /// `case v, ok := <-ch`: bind the received value and flag. Returns whether the
    /// handler needs its `result` parameter.
    fn bind_received(&mut self, lhs: &[Spanned<Expr>], define: bool) -> Result<bool, CompileError> {
        let mut used = false;
        for (target, source) in lhs.iter().zip(["result.value", "result.ok"]) {
            if target.node.as_ident().is_some_and(Ident::is_blank) {
                continue;
            }
            used = true;
            let ident = target.node.as_ident();
            let value = self.box_for_binding(ident.and_then(|i| i.obj), source.to_string());
            match ident {
                Some(ident) if define => {
                    let name = self.declare_ident(ident);
                    let ty = self.obj_type(ident).or(target.node.ty);
                    self.write_declaration(&name, ident.obj, &value, ty, "", false);
                }
                _ => {
                    let lv = self.lvalue(target)?;
                    self.write_store(lv, value);
                }
            }
        }
        Ok(used)
    }
}

/// Whether a case body already leaves the case: its last statement transfers
/// control or falls through.
fn ends_case(body: &[Spanned<Stmt>]) -> bool {
    matches!(
        body.last().map(|s| &s.node),
        Some(Stmt::Return(_)) | Some(Stmt::Break(_)) | Some(Stmt::Continue(_)) | Some(Stmt::Fallthrough)
    )
}
