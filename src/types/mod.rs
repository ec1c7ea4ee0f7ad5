//! Source-language types as resolved by the front end.
//!
//! Types live in a `TypeTable` arena and refer to each other through `TypeId`, so
//! self-referential named types (`type Node struct { next *Node }`) need no boxing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BasicKind {
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    String,
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            BasicKind::Int
                | BasicKind::Int8
                | BasicKind::Int16
                | BasicKind::Int32
                | BasicKind::Int64
                | BasicKind::Uint
                | BasicKind::Uint8
                | BasicKind::Uint16
                | BasicKind::Uint32
                | BasicKind::Uint64
                | BasicKind::Uintptr
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
        )
    }

    pub fn is_unsigned(self) -> bool {
        matches!(
            self,
            BasicKind::Uint
                | BasicKind::Uint8
                | BasicKind::Uint16
                | BasicKind::Uint32
                | BasicKind::Uint64
                | BasicKind::Uintptr
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, BasicKind::Float32 | BasicKind::Float64 | BasicKind::UntypedFloat)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_string(self) -> bool {
        matches!(self, BasicKind::String | BasicKind::UntypedString)
    }

    pub fn is_bool(self) -> bool {
        matches!(self, BasicKind::Bool | BasicKind::UntypedBool)
    }

    /// 64-bit integer kinds are carried as `bigint` in the target.
    pub fn is_wide(self) -> bool {
        matches!(self, BasicKind::Int64 | BasicKind::Uint64)
    }

    /// Bit width for the sized integer kinds; `None` for platform-sized and non-integer kinds.
    pub fn bit_width(self) -> Option<u32> {
        match self {
            BasicKind::Int8 | BasicKind::Uint8 => Some(8),
            BasicKind::Int16 | BasicKind::Uint16 => Some(16),
            BasicKind::Int32 | BasicKind::Uint32 => Some(32),
            BasicKind::Int64 | BasicKind::Uint64 => Some(64),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Bool | BasicKind::UntypedBool => "bool",
            BasicKind::Int | BasicKind::UntypedInt => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 | BasicKind::UntypedRune => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 | BasicKind::UntypedFloat => "float64",
            BasicKind::String | BasicKind::UntypedString => "string",
            BasicKind::UntypedNil => "nil",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeId,
    #[serde(default)]
    pub embedded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSig {
    pub name: String,
    /// A `Type::Signature` (without the receiver).
    pub sig: TypeId,
    #[serde(default)]
    pub pointer_recv: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedType {
    pub name: String,
    /// Import path of the declaring package; empty for predeclared types such as `error`.
    pub pkg: String,
    pub underlying: TypeId,
    /// Methods declared directly on this named type (value and pointer receivers).
    #[serde(default)]
    pub methods: Vec<MethodSig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureType {
    pub params: Vec<TypeId>,
    pub results: Vec<TypeId>,
    #[serde(default)]
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceType {
    pub methods: Vec<MethodSig>,
    /// Embedded interfaces; their methods belong to this interface's method set.
    #[serde(default)]
    pub embeds: Vec<TypeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Basic(BasicKind),
    Named(NamedType),
    Pointer(TypeId),
    Slice(TypeId),
    Array { len: u64, elem: TypeId },
    Map { key: TypeId, value: TypeId },
    Chan { dir: ChanDir, elem: TypeId },
    Struct { fields: Vec<FieldDef> },
    Interface(InterfaceType),
    Signature(SignatureType),
    Tuple(Vec<TypeId>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeTable {
    types: Vec<Type>,
    #[serde(skip)]
    interned: HashMap<Type, TypeId>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type, reusing an existing id for structurally identical unnamed types.
    /// Named types are never deduplicated.
    pub fn add(&mut self, ty: Type) -> TypeId {
        if !matches!(ty, Type::Named(_)) {
            if let Some(id) = self.interned.get(&ty) {
                return *id;
            }
        }
        let id = TypeId(self.types.len() as u32);
        if !matches!(ty, Type::Named(_)) {
            self.interned.insert(ty.clone(), id);
        }
        self.types.push(ty);
        id
    }

    /// Rebuild the interning index after deserialization.
    pub fn reindex(&mut self) {
        self.interned.clear();
        for (i, ty) in self.types.iter().enumerate() {
            if !matches!(ty, Type::Named(_)) {
                self.interned.entry(ty.clone()).or_insert(TypeId(i as u32));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn get(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: TypeId) -> Option<&mut Type> {
        self.types.get_mut(id.0 as usize)
    }

    pub fn ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.types.len()).map(|i| TypeId(i as u32))
    }

    /// Follow `Named` links down to the first unnamed type.
    pub fn underlying(&self, id: TypeId) -> TypeId {
        let mut cur = id;
        // Bounded walk: a malformed table with a Named cycle must not hang.
        for _ in 0..64 {
            match self.get(cur) {
                Some(Type::Named(named)) => cur = named.underlying,
                _ => return cur,
            }
        }
        cur
    }

    pub fn underlying_type(&self, id: TypeId) -> Option<&Type> {
        self.get(self.underlying(id))
    }

    pub fn named(&self, id: TypeId) -> Option<&NamedType> {
        match self.get(id) {
            Some(Type::Named(named)) => Some(named),
            _ => None,
        }
    }

    pub fn basic(&self, id: TypeId) -> Option<BasicKind> {
        match self.underlying_type(id) {
            Some(Type::Basic(kind)) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_struct(&self, id: TypeId) -> bool {
        matches!(self.underlying_type(id), Some(Type::Struct { .. }))
    }

    pub fn is_interface(&self, id: TypeId) -> bool {
        matches!(self.underlying_type(id), Some(Type::Interface(_)))
    }

    pub fn is_string(&self, id: TypeId) -> bool {
        self.basic(id).is_some_and(BasicKind::is_string)
    }

    pub fn is_map(&self, id: TypeId) -> bool {
        matches!(self.underlying_type(id), Some(Type::Map { .. }))
    }

    pub fn is_slice(&self, id: TypeId) -> bool {
        matches!(self.underlying_type(id), Some(Type::Slice(_)))
    }

    pub fn is_array(&self, id: TypeId) -> bool {
        matches!(self.underlying_type(id), Some(Type::Array { .. }))
    }

    pub fn is_chan(&self, id: TypeId) -> bool {
        matches!(self.underlying_type(id), Some(Type::Chan { .. }))
    }

    pub fn is_signature(&self, id: TypeId) -> bool {
        matches!(self.underlying_type(id), Some(Type::Signature(_)))
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.underlying_type(id), Some(Type::Pointer(_)))
    }

    pub fn pointee(&self, id: TypeId) -> Option<TypeId> {
        match self.underlying_type(id) {
            Some(Type::Pointer(elem)) => Some(*elem),
            _ => None,
        }
    }

    pub fn is_pointer_to_struct(&self, id: TypeId) -> bool {
        self.pointee(id).is_some_and(|elem| self.is_struct(elem))
    }

    pub fn elem(&self, id: TypeId) -> Option<TypeId> {
        match self.underlying_type(id) {
            Some(Type::Pointer(elem)) | Some(Type::Slice(elem)) => Some(*elem),
            Some(Type::Array { elem, .. }) | Some(Type::Chan { elem, .. }) => Some(*elem),
            Some(Type::Map { value, .. }) => Some(*value),
            _ => None,
        }
    }

    pub fn struct_fields(&self, id: TypeId) -> Option<&[FieldDef]> {
        match self.underlying_type(id) {
            Some(Type::Struct { fields }) => Some(fields),
            _ => None,
        }
    }

    pub fn signature(&self, id: TypeId) -> Option<&SignatureType> {
        match self.underlying_type(id) {
            Some(Type::Signature(sig)) => Some(sig),
            _ => None,
        }
    }

    /// Strip one pointer level if present: the named type a method call resolves against.
    pub fn deref(&self, id: TypeId) -> TypeId {
        match self.get(id) {
            Some(Type::Pointer(elem)) => *elem,
            _ => id,
        }
    }

    /// Values of this type are copied on assignment and need a clone in the target.
    pub fn has_value_semantics(&self, id: TypeId) -> bool {
        matches!(self.underlying_type(id), Some(Type::Struct { .. }) | Some(Type::Array { .. }))
    }

    /// All methods an interface requires, including those of embedded interfaces,
    /// in declaration order with duplicates removed.
    pub fn interface_methods(&self, id: TypeId) -> Vec<MethodSig> {
        let mut out: Vec<MethodSig> = Vec::new();
        self.collect_interface_methods(id, &mut out, 0);
        out
    }

    fn collect_interface_methods(&self, id: TypeId, out: &mut Vec<MethodSig>, depth: usize) {
        if depth > 32 {
            return;
        }
        if let Some(Type::Interface(iface)) = self.underlying_type(id) {
            for m in &iface.methods {
                if !out.iter().any(|existing| existing.name == m.name) {
                    out.push(m.clone());
                }
            }
            for embed in &iface.embeds {
                self.collect_interface_methods(*embed, out, depth + 1);
            }
        }
    }

    /// The predeclared `error` shape: an interface whose only method is `Error() string`.
    pub fn is_error_interface(&self, id: TypeId) -> bool {
        if let Some(named) = self.named(id) {
            if named.name == "error" && named.pkg.is_empty() {
                return true;
            }
        }
        if !self.is_interface(id) {
            return false;
        }
        let methods = self.interface_methods(id);
        if methods.len() != 1 || methods[0].name != "Error" {
            return false;
        }
        match self.signature(methods[0].sig) {
            Some(sig) => sig.params.is_empty() && sig.results.len() == 1 && self.is_string(sig.results[0]),
            None => false,
        }
    }

    pub fn is_empty_interface(&self, id: TypeId) -> bool {
        self.is_interface(id) && self.interface_methods(id).is_empty()
    }

    /// Method declared directly on the named type (or the named type behind one pointer).
    pub fn method(&self, id: TypeId, name: &str) -> Option<&MethodSig> {
        self.named(self.deref(id))?.methods.iter().find(|m| m.name == name)
    }

    /// Whether the named type `id` declares every method the interface requires.
    /// Only names are compared; the front end has already checked signatures.
    pub fn implements(&self, id: TypeId, iface: TypeId) -> bool {
        let Some(named) = self.named(self.deref(id)) else {
            return false;
        };
        if self.is_interface(named.underlying) {
            return false;
        }
        self.interface_methods(iface)
            .iter()
            .all(|m| named.methods.iter().any(|own| own.name == m.name))
    }

    /// Human-readable source spelling, used in descriptors and diagnostics.
    pub fn display(&self, id: TypeId) -> String {
        self.display_depth(id, 0)
    }

    fn display_depth(&self, id: TypeId, depth: usize) -> String {
        if depth > 16 {
            return "...".to_string();
        }
        let d = depth + 1;
        match self.get(id) {
            None => "<unknown>".to_string(),
            Some(Type::Basic(kind)) => kind.name().to_string(),
            Some(Type::Named(named)) => {
                if named.pkg.is_empty() {
                    named.name.clone()
                } else {
                    format!("{}.{}", named.pkg, named.name)
                }
            }
            Some(Type::Pointer(elem)) => format!("*{}", self.display_depth(*elem, d)),
            Some(Type::Slice(elem)) => format!("[]{}", self.display_depth(*elem, d)),
            Some(Type::Array { len, elem }) => format!("[{len}]{}", self.display_depth(*elem, d)),
            Some(Type::Map { key, value }) => {
                format!("map[{}]{}", self.display_depth(*key, d), self.display_depth(*value, d))
            }
            Some(Type::Chan { dir, elem }) => {
                let elem = self.display_depth(*elem, d);
                match dir {
                    ChanDir::Both => format!("chan {elem}"),
                    ChanDir::Send => format!("chan<- {elem}"),
                    ChanDir::Recv => format!("<-chan {elem}"),
                }
            }
            Some(Type::Struct { fields }) => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| {
                        if f.embedded {
                            self.display_depth(f.ty, d)
                        } else {
                            format!("{} {}", f.name, self.display_depth(f.ty, d))
                        }
                    })
                    .collect();
                format!("struct{{{}}}", parts.join("; "))
            }
            Some(Type::Interface(_)) => {
                let methods: Vec<String> = self.interface_methods(id).iter().map(|m| format!("{}()", m.name)).collect();
                format!("interface{{{}}}", methods.join("; "))
            }
            Some(Type::Signature(sig)) => {
                let params: Vec<String> = sig.params.iter().map(|p| self.display_depth(*p, d)).collect();
                let results: Vec<String> = sig.results.iter().map(|r| self.display_depth(*r, d)).collect();
                match results.len() {
                    0 => format!("func({})", params.join(", ")),
                    1 => format!("func({}) {}", params.join(", "), results[0]),
                    _ => format!("func({}) ({})", params.join(", "), results.join(", ")),
                }
            }
            Some(Type::Tuple(items)) => {
                let items: Vec<String> = items.iter().map(|t| self.display_depth(*t, d)).collect();
                format!("({})", items.join(", "))
            }
        }
    }
}
