//! Programmatic construction of typed packages.
//!
//! Front ends that link against the library (and the test-suite) build packages
//! through `AstBuilder` instead of going through JSON. The builder hands out fresh
//! `NodeId`s, keeps the object table and type table consistent, and fills in the
//! resolved type of every expression it creates.

use std::collections::BTreeMap;

use super::*;
use crate::types::{BasicKind, ChanDir, FieldDef, InterfaceType, MethodSig, NamedType, SignatureType, Type};

pub struct AstBuilder {
    name: String,
    path: String,
    next_node: u32,
    pub types: TypeTable,
    objects: Vec<Object>,
    files: Vec<SourceFile>,
    error_type: Option<TypeId>,
}

impl AstBuilder {
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            next_node: 1,
            types: TypeTable::new(),
            objects: Vec::new(),
            files: vec![SourceFile {
                name: format!("{name}.go"),
                source: None,
                imports: Vec::new(),
                decls: Vec::new(),
                comments: BTreeMap::new(),
            }],
            error_type: None,
        }
    }

    pub fn finish(self) -> Package {
        Package { name: self.name, path: self.path, files: self.files, objects: self.objects, types: self.types }
    }

    pub fn pkg_path(&self) -> &str {
        &self.path
    }

    /// Start a new source file; later declarations go there.
    pub fn new_file(&mut self, name: &str) {
        self.files.push(SourceFile {
            name: name.to_string(),
            source: None,
            imports: Vec::new(),
            decls: Vec::new(),
            comments: BTreeMap::new(),
        });
    }

    fn current_file(&mut self) -> &mut SourceFile {
        if self.files.is_empty() {
            self.new_file("main.go");
        }
        let last = self.files.len() - 1;
        &mut self.files[last]
    }

    pub fn add_decl(&mut self, decl: Decl) {
        self.current_file().decls.push(decl);
    }

    pub fn add_comment(&mut self, node: NodeId, text: &str) {
        self.current_file().comments.entry(node).or_default().push(text.to_string());
    }

    pub fn import(&mut self, path: &str, alias: Option<&str>) -> ObjId {
        let name = alias.map(str::to_string).unwrap_or_else(|| path.rsplit('/').next().unwrap_or(path).to_string());
        let obj = self.add_object(&name, ObjKind::PkgName { path: path.to_string() }, None, true);
        let span = self.span();
        self.current_file().imports.push(Spanned::new(
            Import { path: path.to_string(), alias: alias.map(str::to_string), obj: Some(obj) },
            span,
        ));
        obj
    }

    pub fn node(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    fn span(&self) -> Span {
        let n = self.next_node as usize;
        Span::new(n, n + 1)
    }

    // ── Types ───────────────────────────────────────────────────────

    pub fn basic(&mut self, kind: BasicKind) -> TypeId {
        self.types.add(Type::Basic(kind))
    }

    pub fn int(&mut self) -> TypeId {
        self.basic(BasicKind::Int)
    }

    pub fn int64(&mut self) -> TypeId {
        self.basic(BasicKind::Int64)
    }

    pub fn float64(&mut self) -> TypeId {
        self.basic(BasicKind::Float64)
    }

    pub fn string(&mut self) -> TypeId {
        self.basic(BasicKind::String)
    }

    pub fn bool(&mut self) -> TypeId {
        self.basic(BasicKind::Bool)
    }

    pub fn byte(&mut self) -> TypeId {
        self.basic(BasicKind::Uint8)
    }

    pub fn pointer(&mut self, elem: TypeId) -> TypeId {
        self.types.add(Type::Pointer(elem))
    }

    pub fn slice(&mut self, elem: TypeId) -> TypeId {
        self.types.add(Type::Slice(elem))
    }

    pub fn array(&mut self, len: u64, elem: TypeId) -> TypeId {
        self.types.add(Type::Array { len, elem })
    }

    pub fn map(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.types.add(Type::Map { key, value })
    }

    pub fn chan(&mut self, dir: ChanDir, elem: TypeId) -> TypeId {
        self.types.add(Type::Chan { dir, elem })
    }

    pub fn signature(&mut self, params: &[TypeId], results: &[TypeId]) -> TypeId {
        self.types.add(Type::Signature(SignatureType { params: params.to_vec(), results: results.to_vec(), variadic: false }))
    }

    pub fn variadic_signature(&mut self, params: &[TypeId], results: &[TypeId]) -> TypeId {
        self.types.add(Type::Signature(SignatureType { params: params.to_vec(), results: results.to_vec(), variadic: true }))
    }

    pub fn tuple(&mut self, items: &[TypeId]) -> TypeId {
        self.types.add(Type::Tuple(items.to_vec()))
    }

    pub fn struct_type(&mut self, fields: &[(&str, TypeId)]) -> TypeId {
        let fields = fields.iter().map(|(name, ty)| FieldDef { name: name.to_string(), ty: *ty, embedded: false }).collect();
        self.types.add(Type::Struct { fields })
    }

    /// Struct with explicit embedding flags: `(name, type, embedded)`.
    pub fn struct_type_embedded(&mut self, fields: &[(&str, TypeId, bool)]) -> TypeId {
        let fields = fields
            .iter()
            .map(|(name, ty, embedded)| FieldDef { name: name.to_string(), ty: *ty, embedded: *embedded })
            .collect();
        self.types.add(Type::Struct { fields })
    }

    pub fn interface_type(&mut self, methods: &[(&str, TypeId)]) -> TypeId {
        let methods = methods
            .iter()
            .map(|(name, sig)| MethodSig { name: name.to_string(), sig: *sig, pointer_recv: false })
            .collect();
        self.types.add(Type::Interface(InterfaceType { methods, embeds: Vec::new() }))
    }

    pub fn empty_interface(&mut self) -> TypeId {
        self.types.add(Type::Interface(InterfaceType { methods: Vec::new(), embeds: Vec::new() }))
    }

    /// The predeclared `error` type.
    pub fn error(&mut self) -> TypeId {
        if let Some(id) = self.error_type {
            return id;
        }
        let string = self.string();
        let sig = self.signature(&[], &[string]);
        let iface = self.interface_type(&[("Error", sig)]);
        let id = self.types.add(Type::Named(NamedType {
            name: "error".into(),
            pkg: String::new(),
            underlying: iface,
            methods: Vec::new(),
        }));
        self.error_type = Some(id);
        id
    }

    /// Declare a named type in this package. The underlying type can be set later
    /// with `set_underlying`, which allows self-referential types.
    pub fn named(&mut self, name: &str, underlying: TypeId) -> TypeId {
        let pkg = self.path.clone();
        self.types.add(Type::Named(NamedType { name: name.to_string(), pkg, underlying, methods: Vec::new() }))
    }

    pub fn set_underlying(&mut self, named: TypeId, underlying: TypeId) {
        if let Some(Type::Named(n)) = self.types.get_mut(named) {
            n.underlying = underlying;
        }
    }

    /// Named type plus its `TypeName` object and declaration, in one go.
    pub fn declare_type(&mut self, name: &str, underlying: TypeId) -> TypeId {
        let ty = self.named(name, underlying);
        self.declare_type_spec(name, ty);
        ty
    }

    pub fn declare_type_spec(&mut self, name: &str, ty: TypeId) -> TypeSpec {
        let obj = self.add_object(name, ObjKind::TypeName, Some(ty), true);
        let spec = TypeSpec { id: self.node(), name: self.ident_for(obj), ty, alias: false, span: self.span() };
        self.add_decl(Decl::Type(spec.clone()));
        spec
    }

    // ── Objects ─────────────────────────────────────────────────────

    fn add_object(&mut self, name: &str, kind: ObjKind, ty: Option<TypeId>, package_level: bool) -> ObjId {
        let id = ObjId(self.objects.len() as u32);
        self.objects.push(Object { name: name.to_string(), kind, ty, pkg: self.path.clone(), package_level, recv: None });
        id
    }

    pub fn object(&self, id: ObjId) -> &Object {
        &self.objects[id.0 as usize]
    }

    pub fn var(&mut self, name: &str, ty: TypeId) -> ObjId {
        self.add_object(name, ObjKind::Var, Some(ty), false)
    }

    pub fn global_var(&mut self, name: &str, ty: TypeId) -> ObjId {
        self.add_object(name, ObjKind::Var, Some(ty), true)
    }

    pub fn param(&mut self, name: &str, ty: TypeId) -> ObjId {
        self.add_object(name, ObjKind::Param, Some(ty), false)
    }

    pub fn receiver(&mut self, name: &str, ty: TypeId) -> ObjId {
        self.add_object(name, ObjKind::Receiver, Some(ty), false)
    }

    pub fn named_result(&mut self, name: &str, ty: TypeId) -> ObjId {
        self.add_object(name, ObjKind::NamedResult, Some(ty), false)
    }

    pub fn field(&mut self, name: &str, ty: TypeId) -> ObjId {
        self.add_object(name, ObjKind::Field, Some(ty), false)
    }

    pub fn constant(&mut self, name: &str, ty: TypeId) -> ObjId {
        self.add_object(name, ObjKind::Const, Some(ty), true)
    }

    pub fn builtin(&mut self, name: &str) -> ObjId {
        self.add_object(name, ObjKind::Builtin, None, true)
    }

    pub fn declare_func(&mut self, name: &str, params: &[TypeId], results: &[TypeId]) -> ObjId {
        let sig = self.signature(params, results);
        self.add_object(name, ObjKind::Func, Some(sig), true)
    }

    /// Function object living in another package (e.g. `time.Sleep`).
    pub fn external_func(&mut self, pkg: &str, name: &str, params: &[TypeId], results: &[TypeId]) -> ObjId {
        let sig = self.signature(params, results);
        let id = ObjId(self.objects.len() as u32);
        self.objects.push(Object {
            name: name.to_string(),
            kind: ObjKind::Func,
            ty: Some(sig),
            pkg: pkg.to_string(),
            package_level: true,
            recv: None,
        });
        id
    }

    /// Declare a method on `named` and record it in the named type's method set.
    pub fn declare_method(
        &mut self,
        named: TypeId,
        name: &str,
        pointer_recv: bool,
        params: &[TypeId],
        results: &[TypeId],
    ) -> ObjId {
        let sig = self.signature(params, results);
        if let Some(Type::Named(n)) = self.types.get_mut(named) {
            n.methods.push(MethodSig { name: name.to_string(), sig, pointer_recv });
        }
        let obj = self.add_object(name, ObjKind::Method, Some(sig), true);
        self.objects[obj.0 as usize].recv = Some(named);
        obj
    }

    /// Method object for a type declared in another package (e.g. `sync.Mutex.Lock`).
    pub fn external_method(&mut self, recv: TypeId, name: &str, params: &[TypeId], results: &[TypeId]) -> ObjId {
        let sig = self.signature(params, results);
        let pkg = self.types.named(recv).map(|n| n.pkg.clone()).unwrap_or_default();
        if let Some(Type::Named(n)) = self.types.get_mut(recv) {
            n.methods.push(MethodSig { name: name.to_string(), sig, pointer_recv: true });
        }
        let id = ObjId(self.objects.len() as u32);
        self.objects.push(Object {
            name: name.to_string(),
            kind: ObjKind::Method,
            ty: Some(sig),
            pkg,
            package_level: true,
            recv: Some(recv),
        });
        id
    }

    /// Method object for calls through an interface value; the interface type itself
    /// carries the method set.
    pub fn interface_method(&mut self, name: &str, params: &[TypeId], results: &[TypeId]) -> ObjId {
        let sig = self.signature(params, results);
        self.add_object(name, ObjKind::Method, Some(sig), false)
    }

    /// Named type declared in another package, e.g. `sync.WaitGroup`.
    pub fn external_named(&mut self, pkg: &str, name: &str, underlying: TypeId) -> TypeId {
        self.types.add(Type::Named(NamedType { name: name.to_string(), pkg: pkg.to_string(), underlying, methods: Vec::new() }))
    }

    // ── Expressions ─────────────────────────────────────────────────

    pub fn expr(&mut self, kind: ExprKind, ty: Option<TypeId>) -> Spanned<Expr> {
        let id = self.node();
        Spanned::new(Expr { id, ty, kind }, self.span())
    }

    pub fn ident_for(&mut self, obj: ObjId) -> Ident {
        let name = self.objects[obj.0 as usize].name.clone();
        Ident { id: self.node(), name, obj: Some(obj), span: self.span() }
    }

    pub fn ident(&mut self, obj: ObjId) -> Spanned<Expr> {
        let ident = self.ident_for(obj);
        let ty = self.objects[obj.0 as usize].ty;
        self.expr(ExprKind::Ident(ident), ty)
    }

    pub fn blank(&mut self) -> Spanned<Expr> {
        let ident = Ident { id: self.node(), name: "_".into(), obj: None, span: self.span() };
        self.expr(ExprKind::Ident(ident), None)
    }

    pub fn blank_ident(&mut self) -> Ident {
        Ident { id: self.node(), name: "_".into(), obj: None, span: self.span() }
    }

    pub fn nil(&mut self, ty: Option<TypeId>) -> Spanned<Expr> {
        let obj = self.add_object("nil", ObjKind::Nil, None, true);
        let ident = Ident { id: self.node(), name: "nil".into(), obj: Some(obj), span: self.span() };
        self.expr(ExprKind::Ident(ident), ty)
    }

    pub fn int_lit(&mut self, value: i64) -> Spanned<Expr> {
        let ty = self.int();
        self.expr(ExprKind::Lit(ConstValue::Int(value.to_string())), Some(ty))
    }

    pub fn typed_int_lit(&mut self, value: i64, ty: TypeId) -> Spanned<Expr> {
        self.expr(ExprKind::Lit(ConstValue::Int(value.to_string())), Some(ty))
    }

    pub fn float_lit(&mut self, value: f64) -> Spanned<Expr> {
        let ty = self.float64();
        self.expr(ExprKind::Lit(ConstValue::Float(value)), Some(ty))
    }

    pub fn str_lit(&mut self, value: &str) -> Spanned<Expr> {
        let ty = self.string();
        self.expr(ExprKind::Lit(ConstValue::String(value.to_string())), Some(ty))
    }

    pub fn bool_lit(&mut self, value: bool) -> Spanned<Expr> {
        let ty = self.bool();
        self.expr(ExprKind::Lit(ConstValue::Bool(value)), Some(ty))
    }

    pub fn addr_of(&mut self, operand: Spanned<Expr>) -> Spanned<Expr> {
        let ty = operand.node.ty.map(|t| self.pointer(t));
        self.expr(ExprKind::Unary { op: UnaryOp::Addr, operand: Box::new(operand) }, ty)
    }

    pub fn deref(&mut self, operand: Spanned<Expr>) -> Spanned<Expr> {
        let ty = operand.node.ty.and_then(|t| self.types.pointee(t));
        self.expr(ExprKind::Star(Box::new(operand)), ty)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: Spanned<Expr>) -> Spanned<Expr> {
        let ty = match op {
            UnaryOp::Recv => operand.node.ty.and_then(|t| self.types.elem(t)),
            UnaryOp::Addr => operand.node.ty.map(|t| self.pointer(t)),
            _ => operand.node.ty,
        };
        self.expr(ExprKind::Unary { op, operand: Box::new(operand) }, ty)
    }

    pub fn recv(&mut self, chan: Spanned<Expr>) -> Spanned<Expr> {
        self.unary(UnaryOp::Recv, chan)
    }

    pub fn binary(&mut self, op: BinOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Expr> {
        let ty = if op.is_comparison() || matches!(op, BinOp::And | BinOp::Or) {
            Some(self.bool())
        } else {
            lhs.node.ty
        };
        self.expr(ExprKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }, ty)
    }

    pub fn paren(&mut self, inner: Spanned<Expr>) -> Spanned<Expr> {
        let ty = inner.node.ty;
        self.expr(ExprKind::Paren(Box::new(inner)), ty)
    }

    pub fn type_expr(&mut self, ty: TypeId) -> Spanned<Expr> {
        self.expr(ExprKind::Type(ty), Some(ty))
    }

    fn call_result_type(&mut self, sig: Option<TypeId>) -> Option<TypeId> {
        let sig = self.types.signature(sig?)?.clone();
        match sig.results.len() {
            0 => None,
            1 => Some(sig.results[0]),
            _ => Some(self.tuple(&sig.results)),
        }
    }

    /// Call through any function-valued expression; the result type comes from its signature.
    pub fn call(&mut self, func: Spanned<Expr>, args: Vec<Spanned<Expr>>) -> Spanned<Expr> {
        let ty = self.call_result_type(func.node.ty);
        self.expr(ExprKind::Call { func: Box::new(func), args, ellipsis: false }, ty)
    }

    pub fn call_spread(&mut self, func: Spanned<Expr>, args: Vec<Spanned<Expr>>) -> Spanned<Expr> {
        let ty = self.call_result_type(func.node.ty);
        self.expr(ExprKind::Call { func: Box::new(func), args, ellipsis: true }, ty)
    }

    pub fn call_func(&mut self, func: ObjId, args: Vec<Spanned<Expr>>) -> Spanned<Expr> {
        let callee = self.ident(func);
        self.call(callee, args)
    }

    /// Call a builtin (`len`, `append`, `make`, ...) with an explicit result type.
    pub fn call_builtin(&mut self, name: &str, args: Vec<Spanned<Expr>>, ty: Option<TypeId>) -> Spanned<Expr> {
        let obj = self.builtin(name);
        let callee = self.ident(obj);
        self.expr(ExprKind::Call { func: Box::new(callee), args, ellipsis: false }, ty)
    }

    pub fn conversion(&mut self, ty: TypeId, arg: Spanned<Expr>) -> Spanned<Expr> {
        let callee = self.type_expr(ty);
        self.expr(ExprKind::Call { func: Box::new(callee), args: vec![arg], ellipsis: false }, Some(ty))
    }

    pub fn selector(&mut self, base: Spanned<Expr>, member: ObjId) -> Spanned<Expr> {
        let sel = self.ident_for(member);
        let ty = self.objects[member.0 as usize].ty;
        self.expr(ExprKind::Selector { base: Box::new(base), sel }, ty)
    }

    pub fn method_call(&mut self, recv: Spanned<Expr>, method: ObjId, args: Vec<Spanned<Expr>>) -> Spanned<Expr> {
        let callee = self.selector(recv, method);
        self.call(callee, args)
    }

    /// `pkg.Name` where `pkg` is an import.
    pub fn qualified(&mut self, pkg: ObjId, member: ObjId) -> Spanned<Expr> {
        let base = self.ident(pkg);
        self.selector(base, member)
    }

    pub fn index(&mut self, base: Spanned<Expr>, index: Spanned<Expr>) -> Spanned<Expr> {
        let ty = match base.node.ty {
            Some(t) if self.types.is_string(t) => Some(self.byte()),
            Some(t) => match self.types.underlying_type(t) {
                Some(Type::Pointer(inner)) => {
                    let inner = *inner;
                    self.types.elem(inner)
                }
                _ => self.types.elem(t),
            },
            None => None,
        };
        self.expr(ExprKind::Index { base: Box::new(base), index: Box::new(index) }, ty)
    }

    pub fn slice_expr(
        &mut self,
        base: Spanned<Expr>,
        low: Option<Spanned<Expr>>,
        high: Option<Spanned<Expr>>,
    ) -> Spanned<Expr> {
        let ty = match base.node.ty {
            Some(t) => match self.types.underlying_type(t) {
                Some(Type::Array { elem, .. }) => {
                    let elem = *elem;
                    Some(self.slice(elem))
                }
                _ => Some(t),
            },
            None => None,
        };
        self.expr(
            ExprKind::Slice { base: Box::new(base), low: low.map(Box::new), high: high.map(Box::new), max: None },
            ty,
        )
    }

    pub fn composite(&mut self, ty: TypeId, elts: Vec<Spanned<Expr>>) -> Spanned<Expr> {
        self.expr(ExprKind::Composite { ty: Some(ty), elts }, Some(ty))
    }

    pub fn key_value(&mut self, key: Spanned<Expr>, value: Spanned<Expr>) -> Spanned<Expr> {
        self.expr(ExprKind::KeyValue { key: Box::new(key), value: Box::new(value) }, None)
    }

    /// `Field: value` inside a struct literal.
    pub fn field_value(&mut self, field: ObjId, value: Spanned<Expr>) -> Spanned<Expr> {
        let key = self.ident(field);
        self.key_value(key, value)
    }

    pub fn type_assert(&mut self, base: Spanned<Expr>, ty: TypeId) -> Spanned<Expr> {
        self.expr(ExprKind::TypeAssert { base: Box::new(base), ty: Some(ty) }, Some(ty))
    }

    /// `x.(T)` in comma-ok position: the node type is the `(T, bool)` tuple.
    pub fn type_assert_ok(&mut self, base: Spanned<Expr>, ty: TypeId) -> Spanned<Expr> {
        let b = self.bool();
        let tuple = self.tuple(&[ty, b]);
        self.expr(ExprKind::TypeAssert { base: Box::new(base), ty: Some(ty) }, Some(tuple))
    }

    pub fn func_lit(&mut self, params: Vec<ObjId>, results: &[TypeId], body: Vec<Spanned<Stmt>>) -> Spanned<Expr> {
        let sig = self.func_sig(&params, results, &[]);
        let ty = sig.ty;
        let body = self.block(body);
        self.expr(ExprKind::FuncLit { sig, body }, ty)
    }

    // ── Statements ──────────────────────────────────────────────────

    pub fn stmt(&mut self, stmt: Stmt) -> Spanned<Stmt> {
        Spanned::new(stmt, self.span())
    }

    pub fn block(&mut self, stmts: Vec<Spanned<Stmt>>) -> Spanned<Block> {
        Spanned::new(Block { stmts }, self.span())
    }

    pub fn expr_stmt(&mut self, expr: Spanned<Expr>) -> Spanned<Stmt> {
        self.stmt(Stmt::Expr(expr))
    }

    pub fn define(&mut self, lhs: &[ObjId], rhs: Vec<Spanned<Expr>>) -> Spanned<Stmt> {
        let lhs = lhs.iter().map(|o| self.ident_for(*o)).collect();
        self.stmt(Stmt::Define { lhs, rhs })
    }

    /// `:=` whose targets may include the blank identifier (`None`).
    pub fn define_with_blanks(&mut self, lhs: &[Option<ObjId>], rhs: Vec<Spanned<Expr>>) -> Spanned<Stmt> {
        let lhs = lhs
            .iter()
            .map(|o| match o {
                Some(o) => self.ident_for(*o),
                None => self.blank_ident(),
            })
            .collect();
        self.stmt(Stmt::Define { lhs, rhs })
    }

    pub fn var_decl(&mut self, names: &[ObjId], ty: Option<TypeId>, values: Vec<Spanned<Expr>>) -> Spanned<Stmt> {
        let spec = self.value_spec(names, ty, values);
        self.stmt(Stmt::Var(spec))
    }

    pub fn value_spec(&mut self, names: &[ObjId], ty: Option<TypeId>, values: Vec<Spanned<Expr>>) -> ValueSpec {
        let names = names.iter().map(|o| self.ident_for(*o)).collect();
        ValueSpec { id: self.node(), names, ty, values, span: self.span() }
    }

    pub fn assign(&mut self, lhs: Vec<Spanned<Expr>>, rhs: Vec<Spanned<Expr>>) -> Spanned<Stmt> {
        self.stmt(Stmt::Assign { lhs, op: None, rhs })
    }

    pub fn assign_op(&mut self, op: BinOp, lhs: Spanned<Expr>, rhs: Spanned<Expr>) -> Spanned<Stmt> {
        self.stmt(Stmt::Assign { lhs: vec![lhs], op: Some(op), rhs: vec![rhs] })
    }

    pub fn inc(&mut self, target: Spanned<Expr>) -> Spanned<Stmt> {
        self.stmt(Stmt::IncDec { target, inc: true })
    }

    pub fn dec(&mut self, target: Spanned<Expr>) -> Spanned<Stmt> {
        self.stmt(Stmt::IncDec { target, inc: false })
    }

    pub fn send(&mut self, chan: Spanned<Expr>, value: Spanned<Expr>) -> Spanned<Stmt> {
        self.stmt(Stmt::Send { chan, value })
    }

    pub fn go_stmt(&mut self, call: Spanned<Expr>) -> Spanned<Stmt> {
        self.stmt(Stmt::Go(call))
    }

    pub fn defer_stmt(&mut self, call: Spanned<Expr>) -> Spanned<Stmt> {
        self.stmt(Stmt::Defer(call))
    }

    pub fn ret(&mut self, values: Vec<Spanned<Expr>>) -> Spanned<Stmt> {
        self.stmt(Stmt::Return(values))
    }

    pub fn brk(&mut self, label: Option<&str>) -> Spanned<Stmt> {
        self.stmt(Stmt::Break(label.map(str::to_string)))
    }

    pub fn cont(&mut self, label: Option<&str>) -> Spanned<Stmt> {
        self.stmt(Stmt::Continue(label.map(str::to_string)))
    }

    pub fn if_stmt(
        &mut self,
        cond: Spanned<Expr>,
        then_stmts: Vec<Spanned<Stmt>>,
        else_stmts: Option<Vec<Spanned<Stmt>>>,
    ) -> Spanned<Stmt> {
        let then_block = self.block(then_stmts);
        let else_branch = else_stmts.map(|stmts| {
            let block = self.block(stmts);
            Box::new(self.stmt(Stmt::Block(block)))
        });
        self.stmt(Stmt::If { init: None, cond, then_block, else_branch })
    }

    pub fn for_stmt(
        &mut self,
        init: Option<Spanned<Stmt>>,
        cond: Option<Spanned<Expr>>,
        post: Option<Spanned<Stmt>>,
        body: Vec<Spanned<Stmt>>,
    ) -> Spanned<Stmt> {
        let body = self.block(body);
        self.stmt(Stmt::For { init: init.map(Box::new), cond, post: post.map(Box::new), body })
    }

    pub fn range_stmt(
        &mut self,
        key: Option<ObjId>,
        value: Option<ObjId>,
        iterable: Spanned<Expr>,
        body: Vec<Spanned<Stmt>>,
    ) -> Spanned<Stmt> {
        let key = key.map(|k| self.ident(k));
        let value = value.map(|v| self.ident(v));
        let body = self.block(body);
        self.stmt(Stmt::Range { key, value, define: true, iterable, body })
    }

    pub fn switch_stmt(&mut self, tag: Option<Spanned<Expr>>, cases: Vec<CaseClause>) -> Spanned<Stmt> {
        self.stmt(Stmt::Switch { init: None, tag, cases })
    }

    pub fn case(&mut self, exprs: Vec<Spanned<Expr>>, body: Vec<Spanned<Stmt>>) -> CaseClause {
        CaseClause { exprs, body, span: self.span() }
    }

    pub fn type_switch(
        &mut self,
        binding: Option<&str>,
        subject: Spanned<Expr>,
        cases: Vec<TypeCaseClause>,
    ) -> Spanned<Stmt> {
        let binding = binding.map(|name| Ident { id: self.node(), name: name.to_string(), obj: None, span: self.span() });
        self.stmt(Stmt::TypeSwitch { init: None, binding, subject, cases })
    }

    pub fn type_case(&mut self, types: Vec<Option<TypeId>>, binding_obj: Option<ObjId>, body: Vec<Spanned<Stmt>>) -> TypeCaseClause {
        TypeCaseClause { types, binding_obj, body, span: self.span() }
    }

    pub fn select_stmt(&mut self, cases: Vec<CommClause>) -> Spanned<Stmt> {
        self.stmt(Stmt::Select { cases })
    }

    pub fn comm_clause(&mut self, comm: Option<CommOp>, body: Vec<Spanned<Stmt>>) -> CommClause {
        CommClause { comm, body, span: self.span() }
    }

    pub fn labeled(&mut self, label: &str, stmt: Spanned<Stmt>) -> Spanned<Stmt> {
        self.stmt(Stmt::Labeled { label: label.to_string(), stmt: Box::new(stmt) })
    }

    // ── Declarations ────────────────────────────────────────────────

    fn func_sig(&mut self, params: &[ObjId], results: &[TypeId], named_results: &[ObjId]) -> FuncSig {
        let param_decls: Vec<ParamDecl> = params
            .iter()
            .map(|p| {
                let ty = self.objects[p.0 as usize].ty.unwrap_or(TypeId(0));
                ParamDecl { name: Some(self.ident_for(*p)), ty, variadic: false }
            })
            .collect();
        let result_decls: Vec<ParamDecl> = if named_results.is_empty() {
            results.iter().map(|ty| ParamDecl { name: None, ty: *ty, variadic: false }).collect()
        } else {
            named_results
                .iter()
                .map(|r| {
                    let ty = self.objects[r.0 as usize].ty.unwrap_or(TypeId(0));
                    ParamDecl { name: Some(self.ident_for(*r)), ty, variadic: false }
                })
                .collect()
        };
        let param_tys: Vec<TypeId> = param_decls.iter().map(|p| p.ty).collect();
        let result_tys: Vec<TypeId> = result_decls.iter().map(|p| p.ty).collect();
        let ty = self.signature(&param_tys, &result_tys);
        FuncSig { params: param_decls, results: result_decls, ty: Some(ty) }
    }

    fn result_types_of(&self, func: ObjId) -> Vec<TypeId> {
        self.objects[func.0 as usize]
            .ty
            .and_then(|t| self.types.signature(t))
            .map(|s| s.results.clone())
            .unwrap_or_default()
    }

    /// Declaration for a function created with `declare_func`.
    pub fn func_decl(&mut self, func: ObjId, params: &[ObjId], body: Vec<Spanned<Stmt>>) -> FuncDecl {
        let results = self.result_types_of(func);
        let sig = self.func_sig(params, &results, &[]);
        let name = self.ident_for(func);
        let body = self.block(body);
        FuncDecl { id: self.node(), name, recv: None, sig, body: Some(body), span: self.span() }
    }

    pub fn func_decl_named(
        &mut self,
        func: ObjId,
        params: &[ObjId],
        named_results: &[ObjId],
        body: Vec<Spanned<Stmt>>,
    ) -> FuncDecl {
        let sig = self.func_sig(params, &[], named_results);
        let name = self.ident_for(func);
        let body = self.block(body);
        FuncDecl { id: self.node(), name, recv: None, sig, body: Some(body), span: self.span() }
    }

    /// Declaration for a method created with `declare_method`.
    pub fn method_decl(
        &mut self,
        method: ObjId,
        recv: Option<ObjId>,
        recv_ty: TypeId,
        params: &[ObjId],
        body: Vec<Spanned<Stmt>>,
    ) -> FuncDecl {
        let results = self.result_types_of(method);
        let sig = self.func_sig(params, &results, &[]);
        let name = self.ident_for(method);
        let recv = Receiver { name: recv.map(|r| self.ident_for(r)), ty: recv_ty };
        let body = self.block(body);
        FuncDecl { id: self.node(), name, recv: Some(recv), sig, body: Some(body), span: self.span() }
    }

    pub fn add_func(&mut self, decl: FuncDecl) {
        self.add_decl(Decl::Func(decl));
    }

    pub fn add_global(&mut self, names: &[ObjId], ty: Option<TypeId>, values: Vec<Spanned<Expr>>) {
        let spec = self.value_spec(names, ty, values);
        self.add_decl(Decl::Var(spec));
    }

    pub fn add_const(&mut self, name: ObjId, value: Spanned<Expr>) {
        let ty = self.objects[name.0 as usize].ty;
        let spec = self.value_spec(&[name], ty, vec![value]);
        self.add_decl(Decl::Const(spec));
    }
}
