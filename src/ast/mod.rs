//! Typed AST handed over by the front end.
//!
//! Every node that the analysis or the generator needs to attach facts to carries a
//! `NodeId`; every identifier that names a declaration carries the `ObjId` of that
//! declaration; every expression carries its resolved `TypeId` when the front end
//! knew it. The core never re-derives any of this.

pub mod build;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::span::{Span, Spanned};
use crate::types::{TypeId, TypeTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjId(pub u32);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    /// Import path, e.g. `example.com/app/util`.
    pub path: String,
    pub files: Vec<SourceFile>,
    pub objects: Vec<Object>,
    pub types: TypeTable,
}

impl Package {
    pub fn object(&self, id: ObjId) -> Option<&Object> {
        self.objects.get(id.0 as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjKind {
    Var,
    Param,
    Receiver,
    NamedResult,
    Field,
    Func,
    Method,
    TypeName,
    Const,
    PkgName { path: String },
    Builtin,
    Nil,
}

/// A resolved declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    pub kind: ObjKind,
    pub ty: Option<TypeId>,
    /// Import path of the declaring package.
    pub pkg: String,
    /// Package-level declaration (as opposed to function-local).
    #[serde(default)]
    pub package_level: bool,
    /// For methods: the named type the method is declared on.
    #[serde(default)]
    pub recv: Option<TypeId>,
}

impl Object {
    pub fn is_variable(&self) -> bool {
        matches!(self.kind, ObjKind::Var | ObjKind::Param | ObjKind::Receiver | ObjKind::NamedResult)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// File name relative to the package directory, e.g. `main.go`.
    pub name: String,
    /// Original text, used only to render diagnostics.
    #[serde(default)]
    pub source: Option<String>,
    pub imports: Vec<Spanned<Import>>,
    pub decls: Vec<Decl>,
    /// Comment groups associated with declarations, keyed by the declaration's node.
    #[serde(default)]
    pub comments: BTreeMap<NodeId, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Import {
    pub path: String,
    pub alias: Option<String>,
    /// The `PkgName` object this import introduces into the file scope.
    pub obj: Option<ObjId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ident {
    pub id: NodeId,
    pub name: String,
    pub obj: Option<ObjId>,
    pub span: Span,
}

impl Ident {
    pub fn is_blank(&self) -> bool {
        self.name == "_"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Decl {
    Func(FuncDecl),
    Var(ValueSpec),
    Const(ValueSpec),
    Type(TypeSpec),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncDecl {
    pub id: NodeId,
    pub name: Ident,
    pub recv: Option<Receiver>,
    pub sig: FuncSig,
    /// `None` for functions implemented outside the source (assembly / linkname).
    pub body: Option<Spanned<Block>>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receiver {
    pub name: Option<Ident>,
    /// The receiver's declared type: the named type or a pointer to it.
    pub ty: TypeId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncSig {
    pub params: Vec<ParamDecl>,
    pub results: Vec<ParamDecl>,
    /// Resolved `Type::Signature` for the whole function, when known.
    pub ty: Option<TypeId>,
}

impl FuncSig {
    pub fn has_named_results(&self) -> bool {
        self.results.iter().any(|r| r.name.is_some())
    }

    pub fn is_variadic(&self) -> bool {
        self.params.last().is_some_and(|p| p.variadic)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: Option<Ident>,
    pub ty: TypeId,
    #[serde(default)]
    pub variadic: bool,
}

/// `var`/`const` declaration: `var a, b T = x, y`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueSpec {
    pub id: NodeId,
    pub names: Vec<Ident>,
    pub ty: Option<TypeId>,
    pub values: Vec<Spanned<Expr>>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSpec {
    pub id: NodeId,
    pub name: Ident,
    /// The `Named` type this declaration introduces (or, for aliases, the aliased type).
    pub ty: TypeId,
    #[serde(default)]
    pub alias: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Spanned<Stmt>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    Expr(Spanned<Expr>),
    /// `a, b := x, y`
    Define {
        lhs: Vec<Ident>,
        rhs: Vec<Spanned<Expr>>,
    },
    Var(ValueSpec),
    Const(ValueSpec),
    Type(TypeSpec),
    /// `a, b = x, y` or `a op= x` when `op` is set.
    Assign {
        lhs: Vec<Spanned<Expr>>,
        op: Option<BinOp>,
        rhs: Vec<Spanned<Expr>>,
    },
    IncDec {
        target: Spanned<Expr>,
        inc: bool,
    },
    Send {
        chan: Spanned<Expr>,
        value: Spanned<Expr>,
    },
    Go(Spanned<Expr>),
    Defer(Spanned<Expr>),
    Return(Vec<Spanned<Expr>>),
    Break(Option<String>),
    Continue(Option<String>),
    Goto(String),
    Fallthrough,
    Block(Spanned<Block>),
    If {
        init: Option<Box<Spanned<Stmt>>>,
        cond: Spanned<Expr>,
        then_block: Spanned<Block>,
        /// Either a `Stmt::Block` or a nested `Stmt::If`.
        else_branch: Option<Box<Spanned<Stmt>>>,
    },
    For {
        init: Option<Box<Spanned<Stmt>>>,
        cond: Option<Spanned<Expr>>,
        post: Option<Box<Spanned<Stmt>>>,
        body: Spanned<Block>,
    },
    Range {
        key: Option<Spanned<Expr>>,
        value: Option<Spanned<Expr>>,
        /// `for k, v := range x` (true) versus `for k, v = range x` (false).
        define: bool,
        iterable: Spanned<Expr>,
        body: Spanned<Block>,
    },
    Switch {
        init: Option<Box<Spanned<Stmt>>>,
        tag: Option<Spanned<Expr>>,
        cases: Vec<CaseClause>,
    },
    TypeSwitch {
        init: Option<Box<Spanned<Stmt>>>,
        /// `v` in `switch v := x.(type)`.
        binding: Option<Ident>,
        subject: Spanned<Expr>,
        cases: Vec<TypeCaseClause>,
    },
    Select {
        cases: Vec<CommClause>,
    },
    Labeled {
        label: String,
        stmt: Box<Spanned<Stmt>>,
    },
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseClause {
    /// Empty for `default`.
    pub exprs: Vec<Spanned<Expr>>,
    pub body: Vec<Spanned<Stmt>>,
    pub span: Span,
}

impl CaseClause {
    pub fn is_default(&self) -> bool {
        self.exprs.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeCaseClause {
    /// Listed types; `None` stands for the `nil` case. Empty for `default`.
    pub types: Vec<Option<TypeId>>,
    /// Implicit per-clause object for the switch binding, if the switch binds one.
    pub binding_obj: Option<ObjId>,
    pub body: Vec<Spanned<Stmt>>,
    pub span: Span,
}

impl TypeCaseClause {
    pub fn is_default(&self) -> bool {
        self.types.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommClause {
    /// `None` for `default`.
    pub comm: Option<CommOp>,
    pub body: Vec<Spanned<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CommOp {
    Send {
        chan: Spanned<Expr>,
        value: Spanned<Expr>,
    },
    /// `case v, ok := <-ch` / `case v = <-ch` / `case <-ch`.
    Recv {
        lhs: Vec<Spanned<Expr>>,
        define: bool,
        chan: Spanned<Expr>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub id: NodeId,
    pub ty: Option<TypeId>,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    Bool(bool),
    /// Decimal text so that values beyond `i64` survive the trip.
    Int(String),
    Float(f64),
    String(String),
    Rune(u32),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    Ident(Ident),
    Lit(ConstValue),
    /// `T{...}`; `ty` is `None` when elided inside an outer literal (the node's `ty` then holds it).
    Composite {
        ty: Option<TypeId>,
        elts: Vec<Spanned<Expr>>,
    },
    KeyValue {
        key: Box<Spanned<Expr>>,
        value: Box<Spanned<Expr>>,
    },
    FuncLit {
        sig: FuncSig,
        body: Spanned<Block>,
    },
    Selector {
        base: Box<Spanned<Expr>>,
        sel: Ident,
    },
    Index {
        base: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },
    Slice {
        base: Box<Spanned<Expr>>,
        low: Option<Box<Spanned<Expr>>>,
        high: Option<Box<Spanned<Expr>>>,
        max: Option<Box<Spanned<Expr>>>,
    },
    /// `x.(T)`; `ty` is `None` only inside a type switch header.
    TypeAssert {
        base: Box<Spanned<Expr>>,
        ty: Option<TypeId>,
    },
    Call {
        func: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
        /// `f(xs...)`
        #[serde(default)]
        ellipsis: bool,
    },
    Star(Box<Spanned<Expr>>),
    Unary {
        op: UnaryOp,
        operand: Box<Spanned<Expr>>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    Paren(Box<Spanned<Expr>>),
    /// A type used in expression position: conversion callee, `make`/`new` argument.
    Type(TypeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    Addr,
    Recv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Neq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    AndNot,
    Shl,
    Shr,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Neq | BinOp::Lt | BinOp::LtEq | BinOp::Gt | BinOp::GtEq)
    }

    pub fn source_text(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Neq => "!=",
            BinOp::Lt => "<",
            BinOp::LtEq => "<=",
            BinOp::Gt => ">",
            BinOp::GtEq => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::AndNot => "&^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }
}

impl Expr {
    /// Strip any number of parentheses.
    pub fn unparen(&self) -> &Expr {
        let mut cur = self;
        while let ExprKind::Paren(inner) = &cur.kind {
            cur = &inner.node;
        }
        cur
    }

    pub fn as_ident(&self) -> Option<&Ident> {
        match &self.unparen().kind {
            ExprKind::Ident(ident) => Some(ident),
            _ => None,
        }
    }

    /// `&ident`, returning the identifier.
    pub fn as_address_of_ident(&self) -> Option<&Ident> {
        match &self.unparen().kind {
            ExprKind::Unary { op: UnaryOp::Addr, operand } => operand.node.as_ident(),
            _ => None,
        }
    }

    /// Composite literals, `&T{...}`, and calls denote fresh values.
    pub fn is_fresh_value(&self) -> bool {
        match &self.unparen().kind {
            ExprKind::Composite { .. } | ExprKind::Call { .. } => true,
            ExprKind::Unary { op: UnaryOp::Addr, operand } => {
                matches!(operand.node.unparen().kind, ExprKind::Composite { .. })
            }
            _ => false,
        }
    }
}
