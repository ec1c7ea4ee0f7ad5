/// Lexical naming scopes for the generator.
///
/// The target language forbids a `let` that reads a shadowed outer binding of the
/// same name in its own initializer (`x := x + 1` in a nested block), and it reserves
/// words the source language allows as identifiers. `ScopeTracker` hands out the
/// target-side name for every declared object: the source name when it is safe,
/// otherwise a suffixed variant that is unique among the visible bindings.
///
/// ```rust
/// use goscript::ast::ObjId;
/// use goscript::visit::scope_tracker::ScopeTracker;
///
/// let mut tracker = ScopeTracker::new();
/// tracker.push_scope();
/// assert_eq!(tracker.declare("x", ObjId(1)), "x");
///
/// tracker.push_scope();
/// assert_eq!(tracker.declare("x", ObjId(2)), "x_1");
/// assert_eq!(tracker.name_of(ObjId(2)), Some("x_1"));
///
/// tracker.pop_scope();
/// assert_eq!(tracker.lookup("x"), Some(ObjId(1)));
/// ```

use std::collections::HashMap;

use crate::ast::ObjId;

/// Words that cannot be used as binding names in the target.
const RESERVED: &[&str] = &[
    "arguments", "await", "class", "delete", "enum", "eval", "export", "extends", "function", "implements", "in",
    "instanceof", "let", "new", "null", "of", "private", "protected", "public", "static", "super", "this", "throw",
    "try", "typeof", "undefined", "void", "while", "with", "yield", "catch", "finally", "do", "debugger",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name) || name == "$"
}

/// Escape a source identifier that collides with a target keyword.
pub fn escape_ident(name: &str) -> String {
    if is_reserved(name) { format!("{name}_") } else { name.to_string() }
}

#[derive(Debug, Clone, Default)]
pub struct ScopeTracker {
    scopes: Vec<HashMap<String, ObjId>>,
    /// Emitted name per object. Survives scope exit so late references still resolve.
    names: HashMap<ObjId, String>,
    counter: HashMap<String, u32>,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_scope() -> Self {
        let mut tracker = Self::new();
        tracker.push_scope();
        tracker
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop_scope(&mut self) -> Option<HashMap<String, ObjId>> {
        self.scopes.pop()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Source-name lookup, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<ObjId> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).copied())
    }

    pub fn contains_in_current(&self, name: &str) -> bool {
        self.scopes.last().is_some_and(|scope| scope.contains_key(name))
    }

    pub fn is_declared(&self, obj: ObjId) -> bool {
        self.names.contains_key(&obj)
    }

    pub fn name_of(&self, obj: ObjId) -> Option<&str> {
        self.names.get(&obj).map(String::as_str)
    }

    /// Declare `obj` under source name `name` in the innermost scope and return its target name.
    /// Re-declaring the same object returns the name it already has.
    pub fn declare(&mut self, name: &str, obj: ObjId) -> String {
        if let Some(existing) = self.names.get(&obj) {
            return existing.clone();
        }
        let base = escape_ident(name);
        let shadows = self.lookup(name).is_some_and(|other| other != obj);
        let emitted = if shadows {
            let n = self.counter.entry(base.clone()).or_insert(0);
            *n += 1;
            format!("{base}_{n}")
        } else {
            base
        };
        if self.scopes.is_empty() {
            self.push_scope();
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), obj);
        }
        self.names.insert(obj, emitted.clone());
        emitted
    }

    /// Record a package-level object under its plain (escaped) name.
    pub fn declare_global(&mut self, name: &str, obj: ObjId) -> String {
        let emitted = escape_ident(name);
        if self.scopes.is_empty() {
            self.push_scope();
        }
        self.scopes[0].insert(name.to_string(), obj);
        self.names.insert(obj, emitted.clone());
        emitted
    }

    /// A fresh helper name that no source binding uses, e.g. `_tmp_1`.
    pub fn fresh(&mut self, prefix: &str) -> String {
        let n = self.counter.entry(format!("#{prefix}")).or_insert(0);
        *n += 1;
        format!("_{prefix}_{n}")
    }
}
