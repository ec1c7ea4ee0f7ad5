//! Declarations and assignments: `:=`, `var`, `const`, `=`, `op=`, `++`/`--`.
//!
//! Every value that flows into a variable, field, element or parameter goes through
//! `coerce`, which copies struct and array values and wraps named non-struct values
//! on their way into an interface.

use crate::ast::*;
use crate::codegen::Generator;
use crate::diagnostics::CompileError;
use crate::span::{Span, Spanned};
use crate::translate::descriptor::{describe, registered_name};
use crate::types::{Type, TypeId};

/// Where an assignment writes.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LValue {
    /// Anything the target can assign with `=`.
    Plain(String),
    MapSet { map: String, key: String },
    /// `*p = v` on a struct pointer: fields are overwritten in place.
    StructDeref(String),
    Blank,
}

/// How a multi-valued right-hand side is unpacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Destructure {
    Array,
    /// `{ value, ok }` from a comma-ok type assertion.
    Object,
}

impl Generator<'_> {
    /// `e` rendered as a value stored into a location of type `target`.
    pub fn coerce(&mut self, e: &Spanned<Expr>, target: TypeId) -> Result<String, CompileError> {
        let text = self.expr(e)?;
        Ok(self.coerce_text(text, e, target))
    }

    pub fn coerce_text(&self, text: String, e: &Spanned<Expr>, target: TypeId) -> String {
        let types = self.types();
        let fresh = e.node.is_fresh_value() || text == "null";
        if types.has_value_semantics(target) && !types.is_interface(target) {
            return if fresh { text } else { self.tr.clone_expr(&text, target) };
        }
        if !types.is_interface(target) {
            return text;
        }
        self.into_interface(text, e)
    }

    /// A value stored into an interface: named non-struct values carry their type
    /// name and methods, struct and array values are copied.
    pub fn into_interface(&self, text: String, e: &Spanned<Expr>) -> String {
        let types = self.types();
        let fresh = e.node.is_fresh_value() || text == "null";
        let Some(src) = e.node.ty else {
            return text;
        };
        if types.is_interface(src) {
            return text;
        }
        if let Some(named) = types.named(src) {
            if !named.pkg.is_empty() && !types.is_struct(src) {
                let name = registered_name(types, src).unwrap_or_else(|| named.name.clone());
                let companion = if named.methods.is_empty() {
                    "{}".to_string()
                } else {
                    self.tr.qualified_name(src).unwrap_or_else(|| named.name.clone())
                };
                return format!("$.wrapNamed({text}, {}, {companion})", super::quote(&name));
            }
        }
        if types.has_value_semantics(src) && !fresh {
            return self.tr.clone_expr(&text, src);
        }
        text
    }

    /// Value stored into the variable `obj`. A pointer variable whose reads unwrap a
    /// box must hold a box.
    fn binding_value(&mut self, obj: Option<ObjId>, e: &Spanned<Expr>, ty: Option<TypeId>) -> Result<String, CompileError> {
        let boxed_access = obj.is_some_and(|o| !self.is_boxed(o) && self.analysis.obj_needs_boxed_access(o));
        if boxed_access {
            if let Some(shared) = self.boxed_struct_address(e) {
                return Ok(shared);
            }
        }
        let text = match ty {
            Some(t) => self.coerce(e, t)?,
            None => self.expr(e)?,
        };
        if boxed_access && text != "null" {
            return Ok(format!("$.varRef({text})"));
        }
        Ok(text)
    }

    /// `&x` where `x` is boxed: the box itself, shared with the pointer.
    fn boxed_struct_address(&self, e: &Spanned<Expr>) -> Option<String> {
        let ident = e.node.as_address_of_ident()?;
        let obj = ident.obj?;
        self.is_boxed(obj).then(|| self.raw_ident(ident))
    }

    pub(crate) fn obj_type(&self, ident: &Ident) -> Option<TypeId> {
        ident.obj.and_then(|o| self.obj(o)).and_then(|o| o.ty)
    }

    /// `let name = value`, boxing when the variable's address is taken.
    pub(crate) fn write_declaration(&mut self, name: &str, obj: Option<ObjId>, value: &str, ty: Option<TypeId>, prefix: &str, annotate: bool) {
        let boxed = obj.is_some_and(|o| self.is_boxed(o));
        let boxed_access = !boxed && obj.is_some_and(|o| self.analysis.obj_needs_boxed_access(o));
        let annotation = match ty {
            // A struct pointer that shares a boxed variable holds the box.
            Some(t) if boxed_access => {
                let pointee = self.types().pointee(t).unwrap_or(t);
                format!(": $.VarRef<{}> | null", self.type_str(pointee))
            }
            Some(t) if annotate || self.tr.render(t).is_nullable() => {
                let rendered = self.type_str(t);
                if boxed { format!(": $.VarRef<{rendered}>") } else { format!(": {rendered}") }
            }
            _ => String::new(),
        };
        if boxed {
            self.w.write_line(&format!("{prefix}let {name}{annotation} = $.varRef({value})"));
        } else {
            self.w.write_line(&format!("{prefix}let {name}{annotation} = {value}"));
        }
    }

    /// Evaluate a discarded value for its side effects.
    fn write_discard(&mut self, text: String, e: &Spanned<Expr>) {
        if matches!(e.node.unparen().kind, ExprKind::Call { .. } | ExprKind::Unary { op: UnaryOp::Recv, .. }) {
            self.w.write_line(&text);
        }
    }

    // ---- := ----

    pub fn emit_define(&mut self, lhs: &[Ident], rhs: &[Spanned<Expr>], span: Span) -> Result<(), CompileError> {
        if lhs.len() == rhs.len() {
            let mut values = Vec::new();
            for (ident, e) in lhs.iter().zip(rhs) {
                let ty = self.obj_type(ident).or(e.node.ty);
                if ident.is_blank() {
                    values.push(self.expr(e)?);
                } else {
                    values.push(self.binding_value(ident.obj, e, ty)?);
                }
            }
            let existing: Vec<bool> = lhs.iter().map(|i| i.obj.is_some_and(|o| self.names.is_declared(o))).collect();
            let use_temps = lhs.len() > 1 && existing.iter().any(|e| *e);
            let values = if use_temps { self.spill(values) } else { values };
            for ((ident, value), e) in lhs.iter().zip(values).zip(rhs) {
                self.define_one(ident, value, e)?;
            }
            return Ok(());
        }
        if rhs.len() == 1 {
            let (text, shape, _) = self.multi_value(&rhs[0], lhs.len())?;
            let all_new_plain = lhs.iter().all(|i| {
                i.is_blank() || i.obj.is_some_and(|o| !self.names.is_declared(o) && !self.needs_value_access(o))
            });
            if all_new_plain {
                let names: Vec<String> = lhs
                    .iter()
                    .map(|i| match i.obj {
                        Some(obj) if !i.is_blank() => self.names.declare(&i.name, obj),
                        _ => String::new(),
                    })
                    .collect();
                let pattern = destructure_pattern(&names, shape);
                self.w.write_line(&format!("let {pattern} = {text}"));
                return Ok(());
            }
            let temps = self.unpack(&text, shape, lhs.len());
            for (i, ident) in lhs.iter().enumerate() {
                if ident.is_blank() {
                    continue;
                }
                let value = self.box_for_binding(ident.obj, temps[i].clone());
                let declared = ident.obj.is_some_and(|o| self.names.is_declared(o));
                if declared {
                    let lv = self.ident_lvalue(ident);
                    self.write_store(lv, value);
                } else {
                    let name = self.declare_ident(ident);
                    let ty = self.obj_type(ident);
                    self.write_declaration(&name, ident.obj, &value, ty, "", false);
                }
            }
            return Ok(());
        }
        Err(CompileError::arity(
            format!("assignment mismatch: {} variables but {} values", lhs.len(), rhs.len()),
            span,
        ))
    }

    fn define_one(&mut self, ident: &Ident, value: String, e: &Spanned<Expr>) -> Result<(), CompileError> {
        if ident.is_blank() {
            self.write_discard(value, e);
            return Ok(());
        }
        if ident.obj.is_some_and(|o| self.names.is_declared(o)) {
            let lv = self.ident_lvalue(ident);
            self.write_store(lv, value);
            return Ok(());
        }
        let ty = self.obj_type(ident).or(e.node.ty);
        let name = self.declare_ident(ident);
        self.write_declaration(&name, ident.obj, &value, ty, "", false);
        Ok(())
    }

    pub(crate) fn declare_ident(&mut self, ident: &Ident) -> String {
        match ident.obj {
            Some(obj) => self.names.declare(&ident.name, obj),
            None => crate::visit::scope_tracker::escape_ident(&ident.name),
        }
    }

    /// Boxed-access pointers receiving a destructured value.
    pub(crate) fn box_for_binding(&self, obj: Option<ObjId>, value: String) -> String {
        match obj {
            Some(o) if !self.is_boxed(o) && self.analysis.obj_needs_boxed_access(o) => format!("$.varRef({value})"),
            _ => value,
        }
    }

    /// Bind each value to a fresh constant so later stores see the old values.
    fn spill(&mut self, values: Vec<String>) -> Vec<String> {
        values
            .into_iter()
            .map(|v| {
                let tmp = self.names.fresh("tmp");
                self.w.write_line(&format!("const {tmp} = {v}"));
                tmp
            })
            .collect()
    }

    /// Destructure `text` into `n` fresh constants.
    fn unpack(&mut self, text: &str, shape: Destructure, n: usize) -> Vec<String> {
        let temps: Vec<String> = (0..n).map(|_| self.names.fresh("tmp")).collect();
        let pattern = destructure_pattern(&temps, shape);
        self.w.write_line(&format!("const {pattern} = {text}"));
        temps
    }

    /// A right-hand side producing several values: a tuple-returning call or a
    /// comma-ok form.
    fn multi_value(
        &mut self,
        e: &Spanned<Expr>,
        n: usize,
    ) -> Result<(String, Destructure, Vec<Option<TypeId>>), CompileError> {
        let bool_ty = None;
        match &e.node.unparen().kind {
            ExprKind::TypeAssert { base, ty: Some(t) } if n == 2 => {
                let base_text = self.expr(base)?;
                let text = format!(
                    "$.typeAssertOk<{}>({base_text}, {}, {})",
                    self.type_str(*t),
                    describe(self.types(), *t),
                    self.zero(*t)
                );
                Ok((text, Destructure::Object, vec![Some(*t), bool_ty]))
            }
            ExprKind::Index { base, index } if n == 2 && base.node.ty.is_some_and(|t| self.types().is_map(t)) => {
                let map = self.expr(base)?;
                let key = self.expr(index)?;
                let value_ty = base.node.ty.and_then(|t| self.types().elem(t));
                let zero = self.zero_opt(value_ty, e.span);
                Ok((format!("$.mapGetOk({map}, {key}, {zero})"), Destructure::Array, vec![value_ty, bool_ty]))
            }
            ExprKind::Unary { op: UnaryOp::Recv, operand } if n == 2 => {
                let ch = self.expr(operand)?;
                let elem = operand.node.ty.and_then(|t| self.types().elem(t));
                let text = self.await_expr(format!("$.chanRecvWithOk({ch})"));
                Ok((text, Destructure::Array, vec![elem, bool_ty]))
            }
            ExprKind::Call { .. } => {
                let text = self.expr(e)?;
                let component_types = match e.node.ty.and_then(|t| self.types().get(t)) {
                    Some(Type::Tuple(items)) => items.iter().map(|t| Some(*t)).collect(),
                    _ => vec![None; n],
                };
                if component_types.len() != n {
                    return Err(CompileError::arity(
                        format!("assignment mismatch: {n} variables but call returns {} values", component_types.len()),
                        e.span,
                    ));
                }
                Ok((text, Destructure::Array, component_types))
            }
            _ => Err(CompileError::arity(format!("assignment mismatch: {n} variables but 1 value"), e.span)),
        }
    }

    // ---- var / const ----

    pub fn emit_var_spec(&mut self, spec: &ValueSpec, top_level: bool) -> Result<(), CompileError> {
        let n = spec.names.len();
        let m = spec.values.len();
        if m != 0 && m != n && m != 1 {
            return Err(CompileError::arity(
                format!("assignment mismatch: {n} variables but {m} values"),
                spec.span,
            ));
        }
        if m == 1 && n > 1 {
            let (text, shape, component_types) = self.multi_value(&spec.values[0], n)?;
            let temps = self.unpack(&text, shape, n);
            for (i, ident) in spec.names.iter().enumerate() {
                if ident.is_blank() {
                    continue;
                }
                let ty = spec.ty.or(self.obj_type(ident)).or(component_types.get(i).copied().flatten());
                let value = self.box_for_binding(ident.obj, temps[i].clone());
                self.declare_var(ident, &value, ty, top_level);
            }
            return Ok(());
        }
        for (i, ident) in spec.names.iter().enumerate() {
            let ty = spec.ty.or(self.obj_type(ident));
            let value = match spec.values.get(i) {
                Some(e) if ident.is_blank() => {
                    let text = self.expr(e)?;
                    self.write_discard(text, e);
                    continue;
                }
                Some(e) => self.binding_value(ident.obj, e, ty.or(e.node.ty))?,
                None if ident.is_blank() => continue,
                None => self.zero_opt(ty, ident.span),
            };
            self.declare_var(ident, &value, ty, top_level);
        }
        Ok(())
    }

    fn declare_var(&mut self, ident: &Ident, value: &str, ty: Option<TypeId>, top_level: bool) {
        let (name, prefix) = if top_level {
            let name = self.name_of_ident(ident);
            let exported = ident.name.starts_with(|c: char| c.is_uppercase());
            (name, if exported { "export " } else { "" })
        } else {
            (self.declare_ident(ident), "")
        };
        self.write_declaration(&name, ident.obj, value, ty, prefix, true);
    }

    pub fn emit_const_spec(&mut self, spec: &ValueSpec, top_level: bool) -> Result<(), CompileError> {
        for (i, ident) in spec.names.iter().enumerate() {
            if ident.is_blank() {
                continue;
            }
            let ty = spec.ty.or(self.obj_type(ident));
            let value = match spec.values.get(i) {
                Some(e) => self.expr(e)?,
                None => self.zero_opt(ty, ident.span),
            };
            let (name, prefix) = if top_level {
                let exported = ident.name.starts_with(|c: char| c.is_uppercase());
                (self.name_of_ident(ident), if exported { "export " } else { "" })
            } else {
                (self.declare_ident(ident), "")
            };
            self.w.write_line(&format!("{prefix}const {name} = {value}"));
        }
        Ok(())
    }

    // ---- = / op= ----

    pub fn emit_assign(
        &mut self,
        lhs: &[Spanned<Expr>],
        op: Option<BinOp>,
        rhs: &[Spanned<Expr>],
        span: Span,
    ) -> Result<(), CompileError> {
        if let Some(op) = op {
            let (Some(target), Some(value)) = (lhs.first(), rhs.first()) else {
                return Err(CompileError::arity("compound assignment needs one operand on each side", span));
            };
            return self.emit_compound(target, op, value);
        }

        if lhs.len() == rhs.len() {
            if lhs.len() == 1 {
                let lv = self.lvalue(&lhs[0])?;
                if lv == LValue::Blank {
                    let text = self.expr(&rhs[0])?;
                    self.write_discard(text, &rhs[0]);
                    return Ok(());
                }
                let value = self.assigned_value(&lhs[0], &rhs[0])?;
                self.write_store(lv, value);
                return Ok(());
            }
            let mut values = Vec::new();
            for (target, e) in lhs.iter().zip(rhs) {
                values.push(self.assigned_value(target, e)?);
            }
            let mut lvalues = Vec::new();
            for target in lhs {
                lvalues.push(self.lvalue(target)?);
            }
            if lvalues.iter().all(|lv| matches!(lv, LValue::Plain(_))) {
                let targets: Vec<String> = lvalues
                    .into_iter()
                    .map(|lv| match lv {
                        LValue::Plain(t) => t,
                        _ => String::new(),
                    })
                    .collect();
                self.w.write_line(&format!(";[{}] = [{}]", targets.join(", "), values.join(", ")));
                return Ok(());
            }
            let temps = self.spill(values);
            for (lv, value) in lvalues.into_iter().zip(temps) {
                self.write_store(lv, value);
            }
            return Ok(());
        }

        if rhs.len() == 1 {
            let (text, shape, _) = self.multi_value(&rhs[0], lhs.len())?;
            let mut lvalues = Vec::new();
            for target in lhs {
                lvalues.push(self.lvalue(target)?);
            }
            let simple = shape == Destructure::Array
                && lvalues.iter().all(|lv| matches!(lv, LValue::Plain(_) | LValue::Blank))
                && lhs.iter().all(|t| !self.target_needs_box(t));
            if simple {
                let targets: Vec<String> = lvalues
                    .into_iter()
                    .map(|lv| match lv {
                        LValue::Plain(t) => t,
                        _ => String::new(),
                    })
                    .collect();
                self.w.write_line(&format!(";[{}] = {text}", targets.join(", ")));
                return Ok(());
            }
            let temps = self.unpack(&text, shape, lhs.len());
            for ((lv, tmp), target) in lvalues.into_iter().zip(temps).zip(lhs) {
                if lv == LValue::Blank {
                    continue;
                }
                let obj = target.node.as_ident().and_then(|i| i.obj);
                let value = self.box_for_binding(obj, tmp);
                self.write_store(lv, value);
            }
            return Ok(());
        }

        Err(CompileError::arity(
            format!("assignment mismatch: {} variables but {} values", lhs.len(), rhs.len()),
            span,
        ))
    }

    fn target_needs_box(&self, target: &Spanned<Expr>) -> bool {
        target
            .node
            .as_ident()
            .and_then(|i| i.obj)
            .is_some_and(|o| !self.is_boxed(o) && self.analysis.obj_needs_boxed_access(o))
    }

    fn assigned_value(&mut self, target: &Spanned<Expr>, e: &Spanned<Expr>) -> Result<String, CompileError> {
        match target.node.as_ident() {
            Some(ident) if !ident.is_blank() => {
                let ty = target.node.ty.or(self.obj_type(ident));
                self.binding_value(ident.obj, e, ty)
            }
            _ => match target.node.ty {
                Some(t) => self.coerce(e, t),
                None => self.expr(e),
            },
        }
    }

    fn emit_compound(&mut self, target: &Spanned<Expr>, op: BinOp, value: &Spanned<Expr>) -> Result<(), CompileError> {
        let lv = self.lvalue(target)?;
        let rhs = self.expr(value)?;
        let ty = target.node.ty;
        let native = matches!(lv, LValue::Plain(_)) && native_compound(self, op, ty);
        match lv {
            LValue::Plain(t) if native => {
                self.w.write_line(&format!("{t} {}= {rhs}", op.source_text()));
            }
            lv => {
                let current = self.expr(target)?;
                let combined = self.binary_text(op, &current, &rhs, ty, ty);
                self.write_store(lv, combined);
            }
        }
        Ok(())
    }

    pub fn emit_inc_dec(&mut self, target: &Spanned<Expr>, inc: bool) -> Result<(), CompileError> {
        let lv = self.lvalue(target)?;
        let wide = target.node.ty.is_some_and(|t| self.tr.is_bigint(t));
        match lv {
            LValue::Plain(t) => self.w.write_line(&format!("{t}{}", if inc { "++" } else { "--" })),
            lv => {
                let current = self.expr(target)?;
                let one = if wide { "1n" } else { "1" };
                let op = if inc { "+" } else { "-" };
                self.write_store(lv, format!("{current} {op} {one}"));
            }
        }
        Ok(())
    }

    // ---- locations ----

    pub fn lvalue(&mut self, e: &Spanned<Expr>) -> Result<LValue, CompileError> {
        match &e.node.kind {
            ExprKind::Paren(inner) => self.lvalue(inner),
            ExprKind::Ident(ident) => Ok(self.ident_lvalue(ident)),
            ExprKind::Index { base, index } if base.node.ty.is_some_and(|t| self.types().is_map(t)) => {
                let map = self.expr(base)?;
                let key = self.expr(index)?;
                Ok(LValue::MapSet { map, key })
            }
            ExprKind::Star(pointer) if pointer.node.ty.is_some_and(|t| self.types().is_pointer_to_struct(t)) => {
                let p = self.expr(pointer)?;
                Ok(LValue::StructDeref(format!("{p}!")))
            }
            ExprKind::Selector { .. } | ExprKind::Index { .. } | ExprKind::Star(_) => Ok(LValue::Plain(self.expr(e)?)),
            _ => Err(CompileError::unsupported("cannot assign to this expression", e.span)),
        }
    }

    fn ident_lvalue(&self, ident: &Ident) -> LValue {
        if ident.is_blank() {
            return LValue::Blank;
        }
        let Some(obj) = ident.obj else {
            return LValue::Plain(crate::visit::scope_tracker::escape_ident(&ident.name));
        };
        let name = self.name_of(obj);
        if self.is_boxed(obj) { LValue::Plain(format!("{name}.value")) } else { LValue::Plain(name) }
    }

    pub fn write_store(&mut self, lv: LValue, value: String) {
        match lv {
            LValue::Plain(target) => self.w.write_line(&format!("{target} = {value}")),
            LValue::MapSet { map, key } => self.w.write_line(&format!("$.mapSet({map}, {key}, {value})")),
            LValue::StructDeref(target) => self.w.write_line(&format!("$.assignStruct({target}, {value})")),
            LValue::Blank => {}
        }
    }
}

/// Whether `x op= y` can be emitted as is.
fn native_compound(g: &Generator<'_>, op: BinOp, ty: Option<TypeId>) -> bool {
    let kind = ty.and_then(|t| g.types().basic(t));
    match op {
        BinOp::AndNot => false,
        BinOp::Div => !kind.is_some_and(|k| k.is_integer() && !k.is_wide()),
        BinOp::Shr => !kind.is_some_and(|k| k.is_unsigned() && !k.is_wide()),
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Rem | BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl => {
            true
        }
        _ => false,
    }
}

/// `[a, , c]` or `{ value: a, ok: c }`; empty names are skipped.
pub(crate) fn destructure_pattern(names: &[String], shape: Destructure) -> String {
    match shape {
        Destructure::Array => format!("[{}]", names.join(", ")),
        Destructure::Object => {
            let keys = ["value", "ok"];
            let parts: Vec<String> = names
                .iter()
                .zip(keys)
                .filter(|(n, _)| !n.is_empty())
                .map(|(n, k)| format!("{k}: {n}"))
                .collect();
            format!("{{ {} }}", parts.join(", "))
        }
    }
}
