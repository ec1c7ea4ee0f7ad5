//! Runtime type descriptors consumed by `$.typeAssert`, `$.typeSwitch` and the
//! struct/interface registries.
//!
//! Named types are referenced by their registered name (`"main.Point"`); every other
//! shape is an object literal tagged with a `$.TypeKind`.

use crate::types::{ChanDir, Type, TypeId, TypeTable};

/// Name a named type is registered under at runtime: `pkg.Name`, or the bare name for
/// predeclared types such as `error`.
pub fn registered_name(types: &TypeTable, id: TypeId) -> Option<String> {
    let named = types.named(id)?;
    if named.pkg.is_empty() {
        Some(named.name.clone())
    } else {
        Some(format!("{}.{}", named.pkg, named.name))
    }
}

pub fn describe(types: &TypeTable, id: TypeId) -> String {
    describe_depth(types, id, 0)
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

fn describe_depth(types: &TypeTable, id: TypeId, depth: usize) -> String {
    if depth > 16 {
        return "{ kind: $.TypeKind.Interface, methods: [] }".to_string();
    }
    let d = depth + 1;
    match types.get(id) {
        None => "{ kind: $.TypeKind.Interface, methods: [] }".to_string(),
        Some(Type::Named(_)) => quote(&registered_name(types, id).unwrap_or_default()),
        Some(Type::Basic(kind)) => format!("{{ kind: $.TypeKind.Basic, name: {} }}", quote(kind.name())),
        Some(Type::Pointer(elem)) => {
            format!("{{ kind: $.TypeKind.Pointer, elemType: {} }}", describe_depth(types, *elem, d))
        }
        Some(Type::Slice(elem)) => {
            format!("{{ kind: $.TypeKind.Slice, elemType: {} }}", describe_depth(types, *elem, d))
        }
        Some(Type::Array { len, elem }) => format!(
            "{{ kind: $.TypeKind.Array, length: {len}, elemType: {} }}",
            describe_depth(types, *elem, d)
        ),
        Some(Type::Map { key, value }) => format!(
            "{{ kind: $.TypeKind.Map, keyType: {}, elemType: {} }}",
            describe_depth(types, *key, d),
            describe_depth(types, *value, d)
        ),
        Some(Type::Chan { dir, elem }) => {
            let direction = match dir {
                ChanDir::Both => "both",
                ChanDir::Send => "send",
                ChanDir::Recv => "receive",
            };
            format!(
                "{{ kind: $.TypeKind.Channel, direction: \"{direction}\", elemType: {} }}",
                describe_depth(types, *elem, d)
            )
        }
        Some(Type::Struct { fields }) => {
            let parts: Vec<String> =
                fields.iter().map(|f| format!("{}: {}", quote(&f.name), describe_depth(types, f.ty, d))).collect();
            format!("{{ kind: $.TypeKind.Struct, fields: {{ {} }} }}", parts.join(", "))
        }
        Some(Type::Interface(_)) => format!("{{ kind: $.TypeKind.Interface, methods: {} }}", method_table(types, id)),
        Some(Type::Signature(sig)) => {
            let params: Vec<String> = sig.params.iter().map(|p| describe_depth(types, *p, d)).collect();
            let results: Vec<String> = sig.results.iter().map(|r| describe_depth(types, *r, d)).collect();
            format!(
                "{{ kind: $.TypeKind.Function, params: [{}], results: [{}] }}",
                params.join(", "),
                results.join(", ")
            )
        }
        Some(Type::Tuple(items)) => {
            let parts: Vec<String> = items.iter().map(|t| describe_depth(types, *t, d)).collect();
            format!("{{ kind: $.TypeKind.Tuple, elems: [{}] }}", parts.join(", "))
        }
    }
}

/// `[{ name, args, returns }]` for every method an interface requires. Arguments and
/// results are described shallowly: dynamic checks only compare method names and arity.
pub fn method_table(types: &TypeTable, iface: TypeId) -> String {
    let entries: Vec<String> = types
        .interface_methods(iface)
        .iter()
        .map(|m| {
            let (args, returns) = match types.signature(m.sig) {
                Some(sig) => (sig.params.len(), sig.results.len()),
                None => (0, 0),
            };
            format!("{{ name: {}, args: {args}, returns: {returns} }}", quote(&m.name))
        })
        .collect();
    format!("[{}]", entries.join(", "))
}
