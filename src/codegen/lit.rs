//! Basic and composite literals.

use crate::ast::*;
use crate::codegen::{Generator, quote};
use crate::diagnostics::CompileError;
use crate::span::Spanned;
use crate::synth::member_name;
use crate::types::{Type, TypeId};
use crate::visit::scope_tracker::escape_ident;

impl Generator<'_> {
    pub fn lit_expr(&self, value: &ConstValue, ty: Option<TypeId>) -> String {
        let wide = ty.is_some_and(|t| self.tr.is_bigint(t));
        match value {
            ConstValue::Bool(b) => b.to_string(),
            ConstValue::Int(digits) if wide => format!("{digits}n"),
            ConstValue::Int(digits) => digits.clone(),
            ConstValue::Float(f) => float_text(*f),
            ConstValue::String(s) => quote(s),
            ConstValue::Rune(r) if wide => format!("{r}n"),
            ConstValue::Rune(r) => r.to_string(),
        }
    }

    pub fn composite_expr(
        &mut self,
        ty: Option<TypeId>,
        elts: &[Spanned<Expr>],
        e: &Spanned<Expr>,
    ) -> Result<String, CompileError> {
        let Some(ty) = ty else {
            self.missing_type("composite literal", e.span);
            return Ok("null".to_string());
        };
        let types = self.types();
        // Elided `&T{...}` inside an outer literal.
        if let Some(pointee) = types.pointee(ty) {
            let lit = self.composite_expr(Some(pointee), elts, e)?;
            return Ok(if types.is_struct(pointee) { lit } else { format!("$.varRef({lit})") });
        }
        match types.underlying_type(ty) {
            Some(Type::Struct { fields }) => {
                let fields: Vec<(String, TypeId)> = fields.iter().map(|f| (f.name.clone(), f.ty)).collect();
                let values = self.struct_values(&fields, elts, e)?;
                if types.named(ty).is_some() {
                    let name = self.tr.qualified_name(ty).unwrap_or_else(|| self.type_str(ty));
                    if values.is_empty() {
                        return Ok(format!("new {name}()"));
                    }
                    let parts: Vec<String> =
                        values.into_iter().map(|(field, v)| format!("{}: {v}", member_name(&field))).collect();
                    return Ok(format!("new {name}({{ {} }})", parts.join(", ")));
                }
                // Anonymous struct: a plain object with every field present.
                let mut parts = Vec::new();
                for (field, fty) in &fields {
                    let v = match values.iter().find(|(name, _)| name == field) {
                        Some((_, v)) => v.clone(),
                        None => self.zero(*fty),
                    };
                    parts.push(format!("{}: {v}", escape_ident(field)));
                }
                if parts.is_empty() { Ok("{}".to_string()) } else { Ok(format!("{{ {} }}", parts.join(", "))) }
            }
            Some(Type::Slice(elem)) => {
                let elem = *elem;
                let items = self.indexed_values(elem, elts, None)?;
                Ok(format!("$.arrayToSlice<{}>([{}])", self.type_str(elem), items.join(", ")))
            }
            Some(Type::Array { len, elem }) => {
                let elem = *elem;
                let items = self.indexed_values(elem, elts, Some(*len))?;
                Ok(format!("[{}]", items.join(", ")))
            }
            Some(Type::Map { key, value }) => {
                let (key, value) = (*key, *value);
                let mut entries = Vec::new();
                for elt in elts {
                    let ExprKind::KeyValue { key: k, value: v } = &elt.node.kind else {
                        return Err(CompileError::unsupported("map literal element without a key", elt.span));
                    };
                    let k = self.element(k, key)?;
                    let v = self.element(v, value)?;
                    entries.push(format!("[{k}, {v}]"));
                }
                let (kt, vt) = (self.type_str(key), self.type_str(value));
                if entries.is_empty() {
                    Ok(format!("new Map<{kt}, {vt}>()"))
                } else {
                    Ok(format!("new Map<{kt}, {vt}>([{}])", entries.join(", ")))
                }
            }
            _ => Err(CompileError::unsupported(format!("composite literal of type {}", types.display(ty)), e.span)),
        }
    }

    /// Field values of a struct literal, in source order. Positional literals list
    /// every field; keyed ones only those present.
    fn struct_values(
        &mut self,
        fields: &[(String, TypeId)],
        elts: &[Spanned<Expr>],
        e: &Spanned<Expr>,
    ) -> Result<Vec<(String, String)>, CompileError> {
        let mut out = Vec::new();
        for (i, elt) in elts.iter().enumerate() {
            let (name, value) = match &elt.node.kind {
                ExprKind::KeyValue { key, value } => {
                    let Some(ident) = key.node.as_ident() else {
                        return Err(CompileError::unsupported("struct literal key is not a field name", key.span));
                    };
                    (ident.name.clone(), value.as_ref())
                }
                _ => match fields.get(i) {
                    Some((name, _)) => (name.clone(), elt),
                    None => {
                        return Err(CompileError::arity(
                            format!("too many values in struct literal ({} fields)", fields.len()),
                            e.span,
                        ));
                    }
                },
            };
            let Some((_, fty)) = fields.iter().find(|(f, _)| *f == name) else {
                return Err(CompileError::unsupported(format!("unknown field {name} in struct literal"), elt.span));
            };
            let v = self.field_init(value, *fty)?;
            out.push((name, v));
        }
        Ok(out)
    }

    /// A field initializer. Struct constructors copy value-semantics fields themselves.
    fn field_init(&mut self, value: &Spanned<Expr>, target: TypeId) -> Result<String, CompileError> {
        if self.types().has_value_semantics(target) && !self.types().is_interface(target) {
            return self.element(value, target);
        }
        self.coerce(value, target)
    }

    /// An element of a literal, with elided composite types filled in from the container.
    fn element(&mut self, value: &Spanned<Expr>, target: TypeId) -> Result<String, CompileError> {
        if let ExprKind::Composite { ty: None, elts } = &value.node.kind {
            return self.composite_expr(value.node.ty.or(Some(target)), elts, value);
        }
        if let ExprKind::Unary { op: UnaryOp::Addr, operand } = &value.node.kind {
            if let ExprKind::Composite { ty: None, elts } = &operand.node.kind {
                return self.composite_expr(Some(target), elts, value);
            }
        }
        let fresh_struct = self.types().has_value_semantics(target) && value.node.is_fresh_value();
        if fresh_struct { self.expr(value) } else { self.coerce(value, target) }
    }

    /// Elements of a slice or array literal placed at their (possibly keyed) index,
    /// gaps and array tails filled with the zero value.
    fn indexed_values(
        &mut self,
        elem: TypeId,
        elts: &[Spanned<Expr>],
        len: Option<u64>,
    ) -> Result<Vec<String>, CompileError> {
        let mut slots: Vec<Option<String>> = Vec::new();
        let mut next = 0usize;
        for elt in elts {
            let value = match &elt.node.kind {
                ExprKind::KeyValue { key, value } => {
                    next = literal_index(key)?;
                    value.as_ref()
                }
                _ => elt,
            };
            let text = self.element(value, elem)?;
            if slots.len() <= next {
                slots.resize(next + 1, None);
            }
            slots[next] = Some(text);
            next += 1;
        }
        if let Some(len) = len {
            let len = usize::try_from(len).unwrap_or(usize::MAX);
            if slots.len() < len {
                slots.resize(len, None);
            }
        }
        let zero = self.zero(elem);
        Ok(slots.into_iter().map(|s| s.unwrap_or_else(|| zero.clone())).collect())
    }
}

fn literal_index(key: &Spanned<Expr>) -> Result<usize, CompileError> {
    match &key.node.unparen().kind {
        ExprKind::Lit(ConstValue::Int(digits)) => digits
            .parse::<usize>()
            .map_err(|_| CompileError::unsupported(format!("literal index {digits}"), key.span)),
        _ => Err(CompileError::unsupported("non-constant index in a literal", key.span)),
    }
}

fn float_text(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else {
        f.to_string()
    }
}
