//! AST visitor infrastructure
//!
//! `Visitor` is a read-only traversal over the typed AST. Default implementations
//! recurse into all children; override the methods you need and call the matching
//! `walk_*` function to continue the default recursion. Omitting the walk call prunes
//! traversal at that node.
//!
//! ```rust
//! use goscript::ast::{Expr, ExprKind, ObjId};
//! use goscript::span::Spanned;
//! use goscript::visit::{Visitor, walk_expr};
//! use std::collections::HashSet;
//!
//! struct ObjCollector {
//!     seen: HashSet<ObjId>,
//! }
//!
//! impl Visitor for ObjCollector {
//!     fn visit_expr(&mut self, expr: &Spanned<Expr>) {
//!         if let ExprKind::Ident(ident) = &expr.node.kind {
//!             if let Some(obj) = ident.obj {
//!                 self.seen.insert(obj);
//!             }
//!         }
//!         walk_expr(self, expr);
//!     }
//! }
//! ```
//!
//! Passes where most arms need custom logic (the generator) use a manual `match`
//! instead.

pub mod scope_tracker;

use crate::ast::*;
use crate::span::Spanned;

pub trait Visitor: Sized {
    fn visit_package(&mut self, pkg: &Package) {
        walk_package(self, pkg);
    }

    fn visit_file(&mut self, file: &SourceFile) {
        walk_file(self, file);
    }

    fn visit_decl(&mut self, decl: &Decl) {
        walk_decl(self, decl);
    }

    fn visit_func_decl(&mut self, func: &FuncDecl) {
        walk_func_decl(self, func);
    }

    fn visit_value_spec(&mut self, spec: &ValueSpec) {
        walk_value_spec(self, spec);
    }

    fn visit_block(&mut self, block: &Spanned<Block>) {
        walk_block(self, block);
    }

    fn visit_stmt(&mut self, stmt: &Spanned<Stmt>) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Spanned<Expr>) {
        walk_expr(self, expr);
    }
}

pub fn walk_package<V: Visitor>(v: &mut V, pkg: &Package) {
    for file in &pkg.files {
        v.visit_file(file);
    }
}

pub fn walk_file<V: Visitor>(v: &mut V, file: &SourceFile) {
    for decl in &file.decls {
        v.visit_decl(decl);
    }
}

pub fn walk_decl<V: Visitor>(v: &mut V, decl: &Decl) {
    match decl {
        Decl::Func(func) => v.visit_func_decl(func),
        Decl::Var(spec) | Decl::Const(spec) => v.visit_value_spec(spec),
        Decl::Type(_) => {}
    }
}

pub fn walk_func_decl<V: Visitor>(v: &mut V, func: &FuncDecl) {
    if let Some(body) = &func.body {
        v.visit_block(body);
    }
}

pub fn walk_value_spec<V: Visitor>(v: &mut V, spec: &ValueSpec) {
    for value in &spec.values {
        v.visit_expr(value);
    }
}

pub fn walk_block<V: Visitor>(v: &mut V, block: &Spanned<Block>) {
    for stmt in &block.node.stmts {
        v.visit_stmt(stmt);
    }
}

fn walk_stmts<V: Visitor>(v: &mut V, stmts: &[Spanned<Stmt>]) {
    for stmt in stmts {
        v.visit_stmt(stmt);
    }
}

pub fn walk_stmt<V: Visitor>(v: &mut V, stmt: &Spanned<Stmt>) {
    match &stmt.node {
        Stmt::Expr(expr) | Stmt::Go(expr) | Stmt::Defer(expr) => v.visit_expr(expr),
        Stmt::Define { rhs, .. } => {
            for e in rhs {
                v.visit_expr(e);
            }
        }
        Stmt::Var(spec) | Stmt::Const(spec) => v.visit_value_spec(spec),
        Stmt::Type(_) => {}
        Stmt::Assign { lhs, rhs, .. } => {
            for e in lhs {
                v.visit_expr(e);
            }
            for e in rhs {
                v.visit_expr(e);
            }
        }
        Stmt::IncDec { target, .. } => v.visit_expr(target),
        Stmt::Send { chan, value } => {
            v.visit_expr(chan);
            v.visit_expr(value);
        }
        Stmt::Return(values) => {
            for e in values {
                v.visit_expr(e);
            }
        }
        Stmt::Break(_) | Stmt::Continue(_) | Stmt::Goto(_) | Stmt::Fallthrough | Stmt::Empty => {}
        Stmt::Block(block) => v.visit_block(block),
        Stmt::If { init, cond, then_block, else_branch } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            v.visit_expr(cond);
            v.visit_block(then_block);
            if let Some(else_branch) = else_branch {
                v.visit_stmt(else_branch);
            }
        }
        Stmt::For { init, cond, post, body } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(cond) = cond {
                v.visit_expr(cond);
            }
            if let Some(post) = post {
                v.visit_stmt(post);
            }
            v.visit_block(body);
        }
        Stmt::Range { key, value, iterable, body, .. } => {
            if let Some(key) = key {
                v.visit_expr(key);
            }
            if let Some(value) = value {
                v.visit_expr(value);
            }
            v.visit_expr(iterable);
            v.visit_block(body);
        }
        Stmt::Switch { init, tag, cases } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            if let Some(tag) = tag {
                v.visit_expr(tag);
            }
            for case in cases {
                for e in &case.exprs {
                    v.visit_expr(e);
                }
                walk_stmts(v, &case.body);
            }
        }
        Stmt::TypeSwitch { init, subject, cases, .. } => {
            if let Some(init) = init {
                v.visit_stmt(init);
            }
            v.visit_expr(subject);
            for case in cases {
                walk_stmts(v, &case.body);
            }
        }
        Stmt::Select { cases } => {
            for case in cases {
                match &case.comm {
                    Some(CommOp::Send { chan, value }) => {
                        v.visit_expr(chan);
                        v.visit_expr(value);
                    }
                    Some(CommOp::Recv { lhs, chan, .. }) => {
                        for e in lhs {
                            v.visit_expr(e);
                        }
                        v.visit_expr(chan);
                    }
                    None => {}
                }
                walk_stmts(v, &case.body);
            }
        }
        Stmt::Labeled { stmt, .. } => v.visit_stmt(stmt),
    }
}

pub fn walk_expr<V: Visitor>(v: &mut V, expr: &Spanned<Expr>) {
    match &expr.node.kind {
        ExprKind::Ident(_) | ExprKind::Lit(_) | ExprKind::Type(_) => {}
        ExprKind::Composite { elts, .. } => {
            for e in elts {
                v.visit_expr(e);
            }
        }
        ExprKind::KeyValue { key, value } => {
            v.visit_expr(key);
            v.visit_expr(value);
        }
        ExprKind::FuncLit { body, .. } => v.visit_block(body),
        ExprKind::Selector { base, .. } => v.visit_expr(base),
        ExprKind::Index { base, index } => {
            v.visit_expr(base);
            v.visit_expr(index);
        }
        ExprKind::Slice { base, low, high, max } => {
            v.visit_expr(base);
            for part in [low, high, max].into_iter().flatten() {
                v.visit_expr(part);
            }
        }
        ExprKind::TypeAssert { base, .. } => v.visit_expr(base),
        ExprKind::Call { func, args, .. } => {
            v.visit_expr(func);
            for arg in args {
                v.visit_expr(arg);
            }
        }
        ExprKind::Star(inner) | ExprKind::Paren(inner) => v.visit_expr(inner),
        ExprKind::Unary { operand, .. } => v.visit_expr(operand),
        ExprKind::Binary { lhs, rhs, .. } => {
            v.visit_expr(lhs);
            v.visit_expr(rhs);
        }
    }
}

/// Does `stmts` contain a statement matching `pred`, without descending into function literals?
pub fn any_stmt(stmts: &[Spanned<Stmt>], pred: fn(&Stmt) -> bool) -> bool {
    struct Finder {
        pred: fn(&Stmt) -> bool,
        found: bool,
    }

    impl Visitor for Finder {
        fn visit_stmt(&mut self, stmt: &Spanned<Stmt>) {
            if self.found {
                return;
            }
            if (self.pred)(&stmt.node) {
                self.found = true;
                return;
            }
            walk_stmt(self, stmt);
        }

        fn visit_expr(&mut self, expr: &Spanned<Expr>) {
            if matches!(expr.node.kind, ExprKind::FuncLit { .. }) {
                return;
            }
            walk_expr(self, expr);
        }
    }

    let mut finder = Finder { pred, found: false };
    walk_stmts(&mut finder, stmts);
    finder.found
}

/// Does `stmts` contain an expression matching `pred`, without descending into function literals?
pub fn any_expr(stmts: &[Spanned<Stmt>], pred: fn(&Expr) -> bool) -> bool {
    struct Finder {
        pred: fn(&Expr) -> bool,
        found: bool,
    }

    impl Visitor for Finder {
        fn visit_expr(&mut self, expr: &Spanned<Expr>) {
            if self.found {
                return;
            }
            if (self.pred)(&expr.node) {
                self.found = true;
                return;
            }
            if matches!(expr.node.kind, ExprKind::FuncLit { .. }) {
                return;
            }
            walk_expr(self, expr);
        }
    }

    let mut finder = Finder { pred, found: false };
    walk_stmts(&mut finder, stmts);
    finder.found
}
