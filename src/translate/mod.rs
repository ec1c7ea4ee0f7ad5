//! Source type -> target type rendering and zero-value synthesis.
//!
//! | Source shape | Target |
//! |---|---|
//! | bool / string / numeric | `boolean` / `string` / `number` (`bigint` for 64-bit integers) |
//! | `*T` | `$.VarRef<T> \| null`, or `T \| null` when `T` is a struct |
//! | `[]T` | `$.Slice<T>` |
//! | `[N]T` | `T[]` |
//! | `map[K]V` | `Map<K, V> \| null` |
//! | `chan T` | `$.Channel<T> \| null`, directional channels as `$.ChannelRef<T, "send" \| "receive">` |
//! | struct | the synthesized class |
//! | interface | structural type `\| null`; the error shape is `$.GoError \| null` |
//! | func | closure type, `Promise`-wrapped when async, `\| null` |

pub mod descriptor;

use std::collections::BTreeMap;

use crate::types::{BasicKind, ChanDir, SignatureType, Type, TypeId, TypeTable};
use crate::visit::scope_tracker::escape_ident;

/// Arrays longer than this get a generated zero value instead of a literal.
const INLINE_ARRAY_ZERO_MAX: u64 = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum TsType {
    Number,
    BigInt,
    Boolean,
    String,
    Any,
    Void,
    Null,
    /// A class or type alias name, possibly qualified by an import alias.
    Ref(String),
    VarRef(Box<TsType>),
    Slice(Box<TsType>),
    Array(Box<TsType>),
    Map(Box<TsType>, Box<TsType>),
    Channel(Box<TsType>, ChanDir),
    /// Anonymous struct rendered as an object type.
    Object(Vec<(String, TsType)>),
    /// Structural interface: method name -> method type (a `Function`).
    Interface(Vec<(String, TsType)>),
    Error,
    Function { params: Vec<TsType>, result: Box<TsType>, is_async: bool },
    Tuple(Vec<TsType>),
    Nullable(Box<TsType>),
    Promise(Box<TsType>),
}

impl TsType {
    pub fn nullable(self) -> TsType {
        match self {
            TsType::Nullable(_) | TsType::Any | TsType::Null => self,
            other => TsType::Nullable(Box::new(other)),
        }
    }

    pub fn is_nullable(&self) -> bool {
        matches!(self, TsType::Nullable(_) | TsType::Any | TsType::Null)
    }

    fn needs_parens_in_postfix(&self) -> bool {
        matches!(self, TsType::Nullable(_) | TsType::Function { .. })
    }

    pub fn render(&self) -> String {
        match self {
            TsType::Number => "number".into(),
            TsType::BigInt => "bigint".into(),
            TsType::Boolean => "boolean".into(),
            TsType::String => "string".into(),
            TsType::Any => "any".into(),
            TsType::Void => "void".into(),
            TsType::Null => "null".into(),
            TsType::Ref(name) => name.clone(),
            TsType::VarRef(inner) => format!("$.VarRef<{}>", inner.render()),
            TsType::Slice(inner) => format!("$.Slice<{}>", inner.render()),
            TsType::Array(inner) => {
                if inner.needs_parens_in_postfix() {
                    format!("({})[]", inner.render())
                } else {
                    format!("{}[]", inner.render())
                }
            }
            TsType::Map(k, v) => format!("Map<{}, {}>", k.render(), v.render()),
            TsType::Channel(inner, ChanDir::Both) => format!("$.Channel<{}>", inner.render()),
            TsType::Channel(inner, ChanDir::Send) => format!("$.ChannelRef<{}, \"send\">", inner.render()),
            TsType::Channel(inner, ChanDir::Recv) => format!("$.ChannelRef<{}, \"receive\">", inner.render()),
            TsType::Object(fields) => {
                if fields.is_empty() {
                    return "{}".into();
                }
                let parts: Vec<String> = fields.iter().map(|(n, t)| format!("{n}: {}", t.render())).collect();
                format!("{{ {} }}", parts.join("; "))
            }
            TsType::Interface(methods) => {
                if methods.is_empty() {
                    return "{}".into();
                }
                let parts: Vec<String> = methods
                    .iter()
                    .map(|(name, sig)| match sig {
                        TsType::Function { params, result, is_async } => {
                            format!("{name}({}): {}", render_params(params), render_result(result, *is_async))
                        }
                        other => format!("{name}: {}", other.render()),
                    })
                    .collect();
                format!("{{ {} }}", parts.join("; "))
            }
            TsType::Error => "$.GoError".into(),
            TsType::Function { params, result, is_async } => {
                format!("({}) => {}", render_params(params), render_result(result, *is_async))
            }
            TsType::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(TsType::render).collect();
                format!("[{}]", parts.join(", "))
            }
            TsType::Nullable(inner) => {
                if matches!(**inner, TsType::Function { .. }) {
                    format!("({}) | null", inner.render())
                } else {
                    format!("{} | null", inner.render())
                }
            }
            TsType::Promise(inner) => format!("Promise<{}>", inner.render()),
        }
    }
}

fn render_params(params: &[TsType]) -> String {
    params.iter().enumerate().map(|(i, p)| format!("_p{i}: {}", p.render())).collect::<Vec<_>>().join(", ")
}

fn render_result(result: &TsType, is_async: bool) -> String {
    if is_async { format!("Promise<{}>", result.render()) } else { result.render() }
}

/// Renders types of one package. Named types from other packages are qualified by
/// the alias their package was imported under.
pub struct Translator<'a> {
    pub types: &'a TypeTable,
    pub pkg_path: &'a str,
    /// Package path -> import alias used in the generated module.
    pub imports: &'a BTreeMap<String, String>,
}

impl<'a> Translator<'a> {
    pub fn new(types: &'a TypeTable, pkg_path: &'a str, imports: &'a BTreeMap<String, String>) -> Self {
        Self { types, pkg_path, imports }
    }

    /// Target-side name of a named type: bare for local types, `alias.Name` otherwise.
    pub fn qualified_name(&self, id: TypeId) -> Option<String> {
        let named = self.types.named(id)?;
        if named.pkg.is_empty() || named.pkg == self.pkg_path {
            return Some(escape_ident(&named.name));
        }
        let alias = match self.imports.get(&named.pkg) {
            Some(alias) => alias.clone(),
            None => package_alias(&named.pkg),
        };
        Some(format!("{alias}.{}", named.name))
    }

    pub fn render(&self, id: TypeId) -> TsType {
        self.render_depth(id, 0)
    }

    pub fn render_opt(&self, id: Option<TypeId>) -> TsType {
        id.map(|t| self.render(t)).unwrap_or(TsType::Any)
    }

    pub fn render_str(&self, id: TypeId) -> String {
        self.render(id).render()
    }

    fn render_depth(&self, id: TypeId, depth: usize) -> TsType {
        if depth > 32 {
            return TsType::Any;
        }
        let d = depth + 1;
        match self.types.get(id) {
            None => TsType::Any,
            Some(Type::Basic(kind)) => render_basic(*kind),
            Some(Type::Named(named)) => {
                if named.pkg.is_empty() && named.name == "error" {
                    return TsType::Error.nullable();
                }
                let name = self.qualified_name(id).unwrap_or_else(|| named.name.clone());
                match self.types.underlying_type(id) {
                    Some(Type::Struct { .. }) => TsType::Ref(name),
                    Some(Type::Interface(_)) => TsType::Ref(name).nullable(),
                    _ => TsType::Ref(name),
                }
            }
            Some(Type::Pointer(elem)) => {
                if self.types.is_struct(*elem) {
                    self.render_depth(*elem, d).nullable()
                } else {
                    TsType::VarRef(Box::new(self.render_depth(*elem, d))).nullable()
                }
            }
            Some(Type::Slice(elem)) => TsType::Slice(Box::new(self.render_depth(*elem, d))),
            Some(Type::Array { elem, .. }) => TsType::Array(Box::new(self.render_depth(*elem, d))),
            Some(Type::Map { key, value }) => {
                TsType::Map(Box::new(self.render_depth(*key, d)), Box::new(self.render_depth(*value, d))).nullable()
            }
            Some(Type::Chan { dir, elem }) => TsType::Channel(Box::new(self.render_depth(*elem, d)), *dir).nullable(),
            Some(Type::Struct { fields }) => TsType::Object(
                fields.iter().map(|f| (escape_ident(&f.name), self.render_depth(f.ty, d))).collect(),
            ),
            Some(Type::Interface(_)) => {
                if self.types.is_empty_interface(id) {
                    TsType::Any
                } else if self.types.is_error_interface(id) {
                    TsType::Error.nullable()
                } else {
                    self.interface_shape(id, d).nullable()
                }
            }
            Some(Type::Signature(sig)) => self.render_signature_depth(sig, false, d).nullable(),
            Some(Type::Tuple(items)) => TsType::Tuple(items.iter().map(|t| self.render_depth(*t, d)).collect()),
        }
    }

    /// Structural body of an interface, without the `| null`.
    pub fn interface_shape(&self, id: TypeId, depth: usize) -> TsType {
        let methods = self
            .types
            .interface_methods(id)
            .into_iter()
            .map(|m| {
                let sig = match self.types.signature(m.sig) {
                    Some(sig) => self.render_signature_depth(sig, false, depth + 1),
                    None => TsType::Any,
                };
                (m.name, sig)
            })
            .collect();
        TsType::Interface(methods)
    }

    /// Right-hand side of `export type Name = ...` for a non-struct named type.
    pub fn alias_body(&self, named: TypeId) -> TsType {
        let underlying = self.types.underlying(named);
        match self.types.get(underlying) {
            Some(Type::Interface(_)) if self.types.is_empty_interface(underlying) => TsType::Any,
            Some(Type::Interface(_)) if self.types.is_error_interface(underlying) => TsType::Error,
            Some(Type::Interface(_)) => self.interface_shape(underlying, 0),
            _ => self.render(underlying),
        }
    }

    pub fn render_signature(&self, sig: &SignatureType, is_async: bool) -> TsType {
        self.render_signature_depth(sig, is_async, 0)
    }

    fn render_signature_depth(&self, sig: &SignatureType, is_async: bool, depth: usize) -> TsType {
        let params = sig.params.iter().map(|p| self.render_depth(*p, depth + 1)).collect();
        TsType::Function { params, result: Box::new(self.results_type(&sig.results, depth)), is_async }
    }

    /// Single result, a tuple for several, `void` for none.
    pub fn results_type_of(&self, results: &[TypeId]) -> TsType {
        self.results_type(results, 0)
    }

    fn results_type(&self, results: &[TypeId], depth: usize) -> TsType {
        match results {
            [] => TsType::Void,
            [one] => self.render_depth(*one, depth + 1),
            many => TsType::Tuple(many.iter().map(|r| self.render_depth(*r, depth + 1)).collect()),
        }
    }

    /// Zero value expression for `id`.
    pub fn zero_value(&self, id: TypeId) -> String {
        self.zero_depth(id, 0)
    }

    fn zero_depth(&self, id: TypeId, depth: usize) -> String {
        if depth > 32 {
            return "null".into();
        }
        let d = depth + 1;
        match self.types.get(id) {
            None => "null".into(),
            Some(Type::Basic(kind)) => zero_basic(*kind).into(),
            Some(Type::Named(named)) => match self.types.underlying_type(id) {
                Some(Type::Struct { .. }) => {
                    let name = self.qualified_name(id).unwrap_or_else(|| named.name.clone());
                    format!("new {name}()")
                }
                _ => self.zero_depth(named.underlying, d),
            },
            Some(Type::Array { len, elem }) => {
                let z = self.zero_depth(*elem, d);
                if *len <= INLINE_ARRAY_ZERO_MAX {
                    let items: Vec<&str> = (0..*len).map(|_| z.as_str()).collect();
                    format!("[{}]", items.join(", "))
                } else {
                    format!("Array.from({{ length: {len} }}, () => {z})")
                }
            }
            Some(Type::Struct { fields }) => {
                if fields.is_empty() {
                    return "{}".into();
                }
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| format!("{}: {}", escape_ident(&f.name), self.zero_depth(f.ty, d)))
                    .collect();
                format!("{{ {} }}", parts.join(", "))
            }
            Some(Type::Tuple(items)) => {
                let parts: Vec<String> = items.iter().map(|t| self.zero_depth(*t, d)).collect();
                format!("[{}]", parts.join(", "))
            }
            Some(Type::Pointer(_))
            | Some(Type::Slice(_))
            | Some(Type::Map { .. })
            | Some(Type::Chan { .. })
            | Some(Type::Interface(_))
            | Some(Type::Signature(_)) => "null".into(),
        }
    }

    /// `expr` copied the way an assignment of a value of type `id` copies it.
    pub fn clone_expr(&self, expr: &str, id: TypeId) -> String {
        match self.types.underlying_type(id) {
            Some(Type::Struct { .. }) if self.types.named(id).is_some() => format!("{expr}.clone()"),
            Some(Type::Struct { .. }) => format!("{{ ...{expr} }}"),
            Some(Type::Array { .. }) => format!("$.cloneArray({expr})"),
            _ => expr.to_string(),
        }
    }

    /// Whether values of `id` are 64-bit integers carried as `bigint`.
    pub fn is_bigint(&self, id: TypeId) -> bool {
        self.types.basic(id).is_some_and(BasicKind::is_wide)
    }
}

pub fn render_basic(kind: BasicKind) -> TsType {
    match kind {
        BasicKind::Bool | BasicKind::UntypedBool => TsType::Boolean,
        BasicKind::String | BasicKind::UntypedString => TsType::String,
        BasicKind::UntypedNil => TsType::Null,
        k if k.is_wide() => TsType::BigInt,
        _ => TsType::Number,
    }
}

pub fn zero_basic(kind: BasicKind) -> &'static str {
    match kind {
        BasicKind::Bool | BasicKind::UntypedBool => "false",
        BasicKind::String | BasicKind::UntypedString => "\"\"",
        BasicKind::UntypedNil => "null",
        k if k.is_wide() => "0n",
        _ => "0",
    }
}

/// Default import alias for a package path: its last segment, made identifier-safe.
pub fn package_alias(path: &str) -> String {
    let last = path.rsplit('/').next().unwrap_or(path);
    let mut out: String = last.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }).collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    escape_ident(&out)
}
