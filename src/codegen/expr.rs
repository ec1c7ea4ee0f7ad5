//! Expressions.

use crate::ast::*;
use crate::codegen::Generator;
use crate::diagnostics::CompileError;
use crate::span::Spanned;
use crate::synth::{EmbedKind, member_name};
use crate::translate::descriptor::describe;
use crate::types::{BasicKind, TypeId};
use crate::visit::scope_tracker::escape_ident;

/// What a selector picks out of its base.
pub(crate) enum Selection {
    Field,
    Method,
    Package(String),
    /// `T.Method`: a method expression on a type.
    MethodExpr(TypeId),
}

impl Generator<'_> {
    pub fn expr(&mut self, e: &Spanned<Expr>) -> Result<String, CompileError> {
        match &e.node.kind {
            ExprKind::Ident(ident) => Ok(self.ident_expr(ident)),
            ExprKind::Lit(value) => Ok(self.lit_expr(value, e.node.ty)),
            ExprKind::Composite { ty, elts } => self.composite_expr(ty.or(e.node.ty), elts, e),
            ExprKind::KeyValue { .. } => {
                Err(CompileError::unsupported("key-value pair outside a composite literal", e.span))
            }
            ExprKind::FuncLit { sig, body } => self.func_lit(e.node.id, sig, body),
            ExprKind::Selector { base, sel } => self.selector_expr(base, sel),
            ExprKind::Index { base, index } => self.index_expr(base, index, e),
            ExprKind::Slice { base, low, high, max } => {
                self.slice_expr(base, low.as_deref(), high.as_deref(), max.as_deref())
            }
            ExprKind::TypeAssert { base, ty: Some(t) } => {
                let base_text = self.expr(base)?;
                Ok(format!("$.typeAssert<{}>({base_text}, {})", self.type_str(*t), describe(self.types(), *t)))
            }
            ExprKind::TypeAssert { ty: None, .. } => {
                Err(CompileError::unsupported("x.(type) outside a type switch", e.span))
            }
            ExprKind::Call { func, args, ellipsis } => self.call_expr(func, args, *ellipsis, e),
            ExprKind::Star(pointer) => self.deref_expr(pointer),
            ExprKind::Unary { op, operand } => self.unary_expr(*op, operand, e),
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.operand(lhs)?;
                let r = self.operand(rhs)?;
                Ok(self.binary_text(*op, &l, &r, lhs.node.ty, rhs.node.ty))
            }
            ExprKind::Paren(inner) => {
                let text = self.expr(inner)?;
                if is_atomic(&inner.node) && !text.starts_with("await ") { Ok(text) } else { Ok(format!("({text})")) }
            }
            ExprKind::Type(t) => Ok(self.type_str(*t)),
        }
    }

    /// An operand of a binary expression, parenthesized when it binds looser.
    pub fn operand(&mut self, e: &Spanned<Expr>) -> Result<String, CompileError> {
        let text = self.expr(e)?;
        let needs_parens = match &e.node.kind {
            ExprKind::Binary { .. } | ExprKind::FuncLit { .. } => true,
            ExprKind::Paren(_) => false,
            _ => text.starts_with("await "),
        };
        Ok(if needs_parens { format!("({text})") } else { text })
    }

    pub fn ident_expr(&self, ident: &Ident) -> String {
        let Some(obj_id) = ident.obj else {
            return match ident.name.as_str() {
                "nil" => "null".to_string(),
                "true" | "false" => ident.name.clone(),
                other => escape_ident(other),
            };
        };
        let Some(obj) = self.obj(obj_id) else {
            return escape_ident(&ident.name);
        };
        match &obj.kind {
            ObjKind::Nil => "null".to_string(),
            ObjKind::PkgName { path } => self.package_ref(path),
            ObjKind::TypeName => match obj.ty {
                Some(t) => self.tr.qualified_name(t).unwrap_or_else(|| escape_ident(&ident.name)),
                None => escape_ident(&ident.name),
            },
            ObjKind::Builtin => escape_ident(&ident.name),
            ObjKind::Const if ident.name == "true" || ident.name == "false" => ident.name.clone(),
            _ => {
                let name = self.name_of(obj_id);
                if self.needs_value_access(obj_id) { format!("{name}.value") } else { name }
            }
        }
    }

    /// The raw binding, without unwrapping its box: the box itself for boxed variables.
    pub fn raw_ident(&self, ident: &Ident) -> String {
        match ident.obj {
            Some(obj) => self.name_of(obj),
            None => escape_ident(&ident.name),
        }
    }

    pub fn package_ref(&self, path: &str) -> String {
        self.tr.imports.get(path).cloned().unwrap_or_else(|| crate::translate::package_alias(path))
    }

    // ---- selectors ----

    pub fn selection(&self, base: &Spanned<Expr>, sel: &Ident) -> Selection {
        if let ExprKind::Ident(ident) = &base.node.unparen().kind {
            if let Some(obj) = ident.obj.and_then(|o| self.obj(o)) {
                match &obj.kind {
                    ObjKind::PkgName { path } => return Selection::Package(path.clone()),
                    ObjKind::TypeName => {
                        if let Some(t) = obj.ty {
                            return Selection::MethodExpr(t);
                        }
                    }
                    _ => {}
                }
            }
        }
        if let ExprKind::Type(t) = &base.node.unparen().kind {
            return Selection::MethodExpr(*t);
        }
        let Some(base_ty) = base.node.ty else {
            return Selection::Field;
        };
        let types = self.types();
        let target = types.deref(base_ty);
        if types.is_interface(target) {
            return Selection::Method;
        }
        if let Some(fields) = types.struct_fields(target) {
            if fields.iter().any(|f| f.name == sel.name) {
                return Selection::Field;
            }
        }
        if types.method(target, &sel.name).is_some() {
            return Selection::Method;
        }
        if let Some(model) = self.structs.get(&target) {
            if model.promoted_field(&sel.name).is_some() {
                return Selection::Field;
            }
            if model.promoted_method(&sel.name).is_some() {
                return Selection::Method;
            }
        }
        // Fall back on the selector's own type: a function type that is not a field is a method.
        match sel.obj.and_then(|o| self.obj(o)).map(|o| &o.kind) {
            Some(ObjKind::Method) | Some(ObjKind::Func) => Selection::Method,
            _ => Selection::Field,
        }
    }

    /// `base.` or `base!.` depending on whether the base is a pointer.
    pub fn member_base(&mut self, base: &Spanned<Expr>) -> Result<String, CompileError> {
        let text = self.operand(base)?;
        let pointer = base.node.ty.is_some_and(|t| self.types().is_pointer(t));
        let nullable = base.node.ty.is_some_and(|t| {
            let types = self.types();
            types.is_interface(t) && !types.is_empty_interface(t)
        });
        Ok(if pointer || nullable { format!("{text}!") } else { text })
    }

    fn selector_expr(&mut self, base: &Spanned<Expr>, sel: &Ident) -> Result<String, CompileError> {
        if let Some(t) = base.node.ty {
            // Promotion needs the struct model; make sure it exists before classifying.
            let target = self.types().deref(t);
            if self.types().is_struct(target) {
                let _ = self.struct_model(target);
            }
        }
        match self.selection(base, sel) {
            Selection::Package(path) => Ok(format!("{}.{}", self.package_ref(&path), sel.name)),
            Selection::Field => {
                let b = self.member_base(base)?;
                Ok(format!("{b}.{}", member_name(&sel.name)))
            }
            Selection::Method => self.method_value(base, sel),
            Selection::MethodExpr(t) => Ok(self.method_expr(t, sel)),
        }
    }

    /// `x.M` used as a value: the method bound to its receiver.
    fn method_value(&mut self, base: &Spanned<Expr>, sel: &Ident) -> Result<String, CompileError> {
        let name = member_name(&sel.name);
        if let Some((companion, recv)) = self.companion_receiver(base, sel)? {
            return Ok(format!("((...args: any[]) => {companion}.{name}({recv}, ...args))"));
        }
        let b = self.member_base(base)?;
        if is_simple_path(&b) {
            Ok(format!("{b}.{name}.bind({b})"))
        } else {
            Ok(format!("((r: any) => r.{name}.bind(r))({b})"))
        }
    }

    fn method_expr(&self, t: TypeId, sel: &Ident) -> String {
        let types = self.types();
        let named = types.deref(t);
        let name = member_name(&sel.name);
        if types.named(named).is_some() && !types.is_struct(named) && !types.is_interface(named) {
            let companion = self.tr.qualified_name(named).unwrap_or_else(|| escape_ident(&sel.name));
            return format!("{companion}.{name}");
        }
        format!("((recv: any, ...args: any[]) => recv.{name}(...args))")
    }

    /// For methods of named non-struct types: the companion object and the receiver
    /// argument (the box for pointer receivers).
    pub fn companion_receiver(
        &mut self,
        base: &Spanned<Expr>,
        sel: &Ident,
    ) -> Result<Option<(String, String)>, CompileError> {
        let Some(base_ty) = base.node.ty else {
            return Ok(None);
        };
        let types = self.types();
        let named_ty = types.deref(base_ty);
        let Some(named) = types.named(named_ty) else {
            return Ok(None);
        };
        if types.is_struct(named_ty) || types.is_interface(named_ty) {
            return Ok(None);
        }
        let Some(method) = named.methods.iter().find(|m| m.name == sel.name) else {
            return Ok(None);
        };
        let pointer_recv = method.pointer_recv;
        let companion = self.tr.qualified_name(named_ty).unwrap_or_else(|| named.name.clone());
        let base_is_pointer = types.is_pointer(base_ty);
        let recv = match (pointer_recv, base_is_pointer) {
            (true, true) => self.expr(base)?,
            (true, false) => self.address_of(base)?,
            (false, true) => format!("{}!.value", self.operand(base)?),
            (false, false) => self.expr(base)?,
        };
        Ok(Some((companion, recv)))
    }

    // ---- index / slice / deref ----

    fn index_expr(&mut self, base: &Spanned<Expr>, index: &Spanned<Expr>, e: &Spanned<Expr>) -> Result<String, CompileError> {
        let Some(base_ty) = base.node.ty else {
            self.missing_type("index base", e.span);
            let b = self.operand(base)?;
            let i = self.expr(index)?;
            return Ok(format!("{b}![{i}]"));
        };
        let types = self.types();
        let i = self.expr(index)?;
        if types.is_map(base_ty) {
            let m = self.expr(base)?;
            let zero = self.zero_opt(types.elem(base_ty), e.span);
            return Ok(format!("$.mapGet({m}, {i}, {zero})"));
        }
        if types.is_string(base_ty) {
            let s = self.expr(base)?;
            return Ok(format!("$.indexString({s}, {i})"));
        }
        let b = self.operand(base)?;
        if types.is_array(base_ty) {
            return Ok(format!("{b}[{i}]"));
        }
        if types.is_pointer(base_ty) {
            return Ok(format!("{b}!.value[{i}]"));
        }
        Ok(format!("{b}![{i}]"))
    }

    fn slice_expr(
        &mut self,
        base: &Spanned<Expr>,
        low: Option<&Spanned<Expr>>,
        high: Option<&Spanned<Expr>>,
        max: Option<&Spanned<Expr>>,
    ) -> Result<String, CompileError> {
        let is_string = base.node.ty.is_some_and(|t| self.types().is_string(t));
        let is_pointer = base.node.ty.is_some_and(|t| self.types().is_pointer(t));
        let mut b = self.expr(base)?;
        if is_pointer {
            b = format!("{b}!.value");
        }
        let mut bounds = Vec::new();
        for bound in [low, high, max] {
            bounds.push(match bound {
                Some(x) => self.expr(x)?,
                None => "undefined".to_string(),
            });
        }
        while bounds.last().is_some_and(|s| s == "undefined") {
            bounds.pop();
        }
        let mut args = vec![b];
        args.extend(bounds);
        if is_string {
            Ok(format!("$.sliceString({})", args.join(", ")))
        } else {
            Ok(format!("$.goSlice({})", args.join(", ")))
        }
    }

    /// `*p`: struct pointers are the struct; every other pointer is a box.
    fn deref_expr(&mut self, pointer: &Spanned<Expr>) -> Result<String, CompileError> {
        let p = self.operand(pointer)?;
        let to_struct = pointer.node.ty.is_some_and(|t| self.types().is_pointer_to_struct(t));
        if to_struct { Ok(format!("{p}!")) } else { Ok(format!("{p}!.value")) }
    }

    // ---- unary / binary ----

    fn unary_expr(&mut self, op: UnaryOp, operand: &Spanned<Expr>, e: &Spanned<Expr>) -> Result<String, CompileError> {
        match op {
            UnaryOp::Addr => self.address_of(operand),
            UnaryOp::Recv => {
                let ch = self.expr(operand)?;
                Ok(self.await_expr(format!("$.chanRecv({ch})")))
            }
            UnaryOp::Plus => self.expr(operand),
            UnaryOp::Neg => Ok(format!("-{}", self.operand(operand)?)),
            UnaryOp::Not => Ok(format!("!{}", self.operand(operand)?)),
            UnaryOp::BitNot => {
                let x = self.operand(operand)?;
                let kind = e.node.ty.and_then(|t| self.types().basic(t));
                match kind {
                    Some(k) if k.is_unsigned() && !k.is_wide() => {
                        let bits = k.bit_width().unwrap_or(32);
                        Ok(format!("$.wrapInt(~{x}, {bits}, false)"))
                    }
                    Some(BasicKind::Uint64) => Ok(format!("BigInt.asUintN(64, ~{x})")),
                    _ => Ok(format!("~{x}")),
                }
            }
        }
    }

    /// `&x`: the box (or struct reference) that stands for the location. A boxed
    /// struct yields the instance inside its box; only pointer bindings with boxed
    /// access take the box itself (see `boxed_struct_address`).
    pub fn address_of(&mut self, operand: &Spanned<Expr>) -> Result<String, CompileError> {
        let ty = operand.node.ty;
        let is_struct = ty.is_some_and(|t| self.types().is_struct(t));
        match &operand.node.kind {
            ExprKind::Paren(inner) => self.address_of(inner),
            ExprKind::Composite { .. } => {
                let lit = self.expr(operand)?;
                if is_struct { Ok(lit) } else { Ok(format!("$.varRef({lit})")) }
            }
            ExprKind::Ident(ident) => {
                let raw = self.raw_ident(ident);
                let boxed = ident.obj.is_some_and(|o| self.is_boxed(o));
                match (boxed, is_struct) {
                    (true, true) => Ok(format!("{raw}.value")),
                    (true, false) | (false, true) => Ok(raw),
                    (false, false) => Ok(format!("$.varRef({raw})")),
                }
            }
            ExprKind::Selector { base, sel } => {
                if let Selection::Package(path) = self.selection(base, sel) {
                    return Ok(format!("$.varRef({}.{})", self.package_ref(&path), sel.name));
                }
                if is_struct {
                    return self.expr(operand);
                }
                let Some(base_ty) = base.node.ty else {
                    return Ok(format!("$.varRef({})", self.expr(operand)?));
                };
                let b = self.member_base(base)?;
                let owner = self.types().deref(base_ty);
                match self.field_box(&b, owner, &sel.name, 0) {
                    Some(path) => Ok(path),
                    None => Ok(format!("$.varRef({})", self.expr(operand)?)),
                }
            }
            ExprKind::Index { base, index } => {
                let base_ty = base.node.ty;
                if is_struct {
                    return self.expr(operand);
                }
                let i = self.expr(index)?;
                match base_ty {
                    Some(t) if self.types().is_slice(t) || self.types().is_array(t) => {
                        let b = self.expr(base)?;
                        Ok(format!("$.indexRef({b}!, {i})"))
                    }
                    Some(t) if self.types().is_pointer(t) => {
                        let b = self.operand(base)?;
                        Ok(format!("$.indexRef({b}!.value, {i})"))
                    }
                    _ => Ok(format!("$.varRef({})", self.expr(operand)?)),
                }
            }
            ExprKind::Star(pointer) => self.expr(pointer),
            _ => Ok(format!("$.varRef({})", self.expr(operand)?)),
        }
    }

    /// Path to the box holding field `name` of struct `owner`, following promotions.
    fn field_box(&mut self, base: &str, owner: TypeId, name: &str, depth: usize) -> Option<String> {
        if depth > 16 {
            return None;
        }
        let model = self.struct_model(owner)?.clone();
        if model.field(name).is_some() {
            return Some(format!("{base}._fields.{}", member_name(name)));
        }
        let promoted = model.promoted_field(name)?;
        let via = model.field(&promoted.via)?;
        let next = match promoted.via_kind {
            EmbedKind::PointerToStruct => format!("{base}.{}!", member_name(&promoted.via)),
            _ => format!("{base}.{}", member_name(&promoted.via)),
        };
        let inner = self.types().deref(via.ty);
        self.field_box(&next, inner, name, depth + 1)
    }

    /// Binary operator text. `lhs_ty` drives the operator choice; `rhs_ty` only matters
    /// for shifts of 64-bit values.
    pub fn binary_text(&self, op: BinOp, l: &str, r: &str, lhs_ty: Option<TypeId>, rhs_ty: Option<TypeId>) -> String {
        let types = self.types();
        let kind = lhs_ty.and_then(|t| types.basic(t));
        let value_eq = lhs_ty.is_some_and(|t| types.has_value_semantics(t)) && l != "null" && r != "null";
        let int = kind.is_some_and(|k| k.is_integer() && !k.is_wide());
        let unsigned = kind.is_some_and(|k| k.is_unsigned() && !k.is_wide());
        let wide = kind.is_some_and(BasicKind::is_wide);
        match op {
            BinOp::Eq if value_eq => format!("$.structEquals({l}, {r})"),
            BinOp::Neq if value_eq => format!("!$.structEquals({l}, {r})"),
            BinOp::Eq => format!("{l} === {r}"),
            BinOp::Neq => format!("{l} !== {r}"),
            BinOp::Div if int => format!("$.idiv({l}, {r})"),
            BinOp::AndNot => format!("{l} & ~{}", wrap_unary_operand(r)),
            BinOp::Shr if unsigned => format!("{l} >>> {r}"),
            BinOp::Shl | BinOp::Shr if wide && !rhs_ty.is_some_and(|t| self.tr.is_bigint(t)) => {
                format!("{l} {} BigInt({r})", op.source_text())
            }
            _ => format!("{l} {} {r}", op.source_text()),
        }
    }

    pub fn send_expr(&mut self, chan: &Spanned<Expr>, value: &Spanned<Expr>) -> Result<String, CompileError> {
        let ch = self.expr(chan)?;
        let elem = chan.node.ty.and_then(|t| self.types().elem(t));
        let v = match elem {
            Some(t) => self.coerce(value, t)?,
            None => self.expr(value)?,
        };
        Ok(self.await_expr(format!("$.chanSend({ch}, {v})")))
    }

    // ---- function literals ----

    fn func_lit(&mut self, node: NodeId, sig: &FuncSig, body: &Spanned<Block>) -> Result<String, CompileError> {
        let is_async = self.analysis.is_node_async(node);
        self.names.push_scope();
        let result = (|| -> Result<String, CompileError> {
            let (params, prologue) = self.render_params(&sig.params)?;
            let ret = self.result_annotation(sig, is_async);
            let inner = self.render_nested(1, |g| g.emit_function_body(node, is_async, sig, body, prologue))?;
            let pad = self.w.padding();
            Ok(format!("{}({params}){ret} => {{\n{inner}{pad}}}", if is_async { "async " } else { "" }))
        })();
        self.names.pop_scope();
        result
    }
}

/// Expressions whose rendering never needs surrounding parentheses.
fn is_atomic(e: &Expr) -> bool {
    matches!(
        e.kind,
        ExprKind::Ident(_) | ExprKind::Lit(_) | ExprKind::Call { .. } | ExprKind::Selector { .. } | ExprKind::Index { .. }
    )
}

fn wrap_unary_operand(r: &str) -> String {
    if r.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') { r.to_string() } else { format!("({r})") }
}

/// `a`, `a.b`, `a!.b`: safe to evaluate twice.
fn is_simple_path(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '!' || c == '$')
}
