//! Struct and interface class synthesis.
//!
//! `StructModel::build` computes the member surface of a struct type: its own fields,
//! its embedded fields, and what each embedding promotes. `class` turns a model into a
//! target class; `iface` emits interfaces and named non-struct types.

pub mod class;
pub mod iface;

use std::collections::HashSet;

use tracing::warn;

use crate::diagnostics::CompileWarning;
use crate::types::{Type, TypeId, TypeTable};

/// Class members the synthesizer itself defines. A source member with one of these
/// names is renamed with a trailing underscore.
const CLASS_RESERVED: &[&str] = &["clone", "constructor", "_fields", "__typeInfo", "prototype"];

/// Target-side name of a struct field or method.
pub fn member_name(name: &str) -> String {
    if CLASS_RESERVED.contains(&name) { format!("{name}_") } else { name.to_string() }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldModel {
    pub name: String,
    pub ty: TypeId,
    pub embedded: bool,
}

/// How an embedded field reaches the value it embeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedKind {
    /// `Inner`: a struct value.
    Struct,
    /// `*Inner`: a nullable struct reference.
    PointerToStruct,
    /// An embedded interface value.
    Interface,
    /// A named non-struct type; its methods live on a companion object.
    Named,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromotedField {
    pub name: String,
    /// Name of the embedded field it is reached through.
    pub via: String,
    pub ty: TypeId,
    pub via_kind: EmbedKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromotedMethod {
    pub name: String,
    pub via: String,
    pub via_kind: EmbedKind,
    /// The named type whose method set the method came from.
    pub owner: TypeId,
    pub sig: TypeId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructModel {
    pub type_id: TypeId,
    pub name: String,
    pub fields: Vec<FieldModel>,
    /// Names of methods declared with this type as receiver.
    pub direct_methods: Vec<String>,
    pub promoted_fields: Vec<PromotedField>,
    pub promoted_methods: Vec<PromotedMethod>,
}

/// One member an embedding exposes.
enum Member {
    Field(TypeId),
    Method { owner: TypeId, sig: TypeId },
}

impl StructModel {
    /// Build the model of the named struct type `id`. Returns `None` if `id` is not a
    /// named struct.
    pub fn build(types: &TypeTable, id: TypeId, warnings: &mut Vec<CompileWarning>) -> Option<StructModel> {
        Self::build_depth(types, id, warnings, 0)
    }

    fn build_depth(
        types: &TypeTable,
        id: TypeId,
        warnings: &mut Vec<CompileWarning>,
        depth: usize,
    ) -> Option<StructModel> {
        let named = types.named(id)?;
        let fields = types.struct_fields(id)?;

        let mut model = StructModel {
            type_id: id,
            name: named.name.clone(),
            fields: fields
                .iter()
                .map(|f| FieldModel { name: f.name.clone(), ty: f.ty, embedded: f.embedded })
                .collect(),
            direct_methods: named.methods.iter().map(|m| m.name.clone()).collect(),
            promoted_fields: vec![],
            promoted_methods: vec![],
        };

        let direct: HashSet<&str> = model
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .chain(model.direct_methods.iter().map(String::as_str))
            .collect();
        // member name -> embedded field that supplied it
        let mut promoted: Vec<(String, String)> = Vec::new();
        let mut promoted_fields = Vec::new();
        let mut promoted_methods = Vec::new();

        for embed in model.fields.iter().filter(|f| f.embedded) {
            let Some((kind, target)) = embed_kind(types, embed.ty) else {
                continue;
            };
            for (member, info) in embedded_surface(types, kind, target, depth) {
                if direct.contains(member.as_str()) {
                    continue;
                }
                if let Some((_, kept)) = promoted.iter().find(|(m, _)| *m == member) {
                    if kept != &embed.name {
                        let warning = CompileWarning::AmbiguousPromotion {
                            type_name: model.name.clone(),
                            member: member.clone(),
                            kept: kept.clone(),
                            dropped: embed.name.clone(),
                        };
                        warn!("{warning}");
                        warnings.push(warning);
                    }
                    continue;
                }
                promoted.push((member.clone(), embed.name.clone()));
                match info {
                    Member::Field(ty) => promoted_fields.push(PromotedField {
                        name: member,
                        via: embed.name.clone(),
                        ty,
                        via_kind: kind,
                    }),
                    Member::Method { owner, sig } => promoted_methods.push(PromotedMethod {
                        name: member,
                        via: embed.name.clone(),
                        via_kind: kind,
                        owner,
                        sig,
                    }),
                }
            }
        }

        model.promoted_fields = promoted_fields;
        model.promoted_methods = promoted_methods;
        Some(model)
    }

    pub fn field(&self, name: &str) -> Option<&FieldModel> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn promoted_field(&self, name: &str) -> Option<&PromotedField> {
        self.promoted_fields.iter().find(|f| f.name == name)
    }

    pub fn promoted_method(&self, name: &str) -> Option<&PromotedMethod> {
        self.promoted_methods.iter().find(|m| m.name == name)
    }

    /// Every method callable on the class, direct ones first.
    pub fn all_method_names(&self) -> Vec<&str> {
        self.direct_methods
            .iter()
            .map(String::as_str)
            .chain(self.promoted_methods.iter().map(|m| m.name.as_str()))
            .collect()
    }
}

/// Classify an embedded field type; returns the kind and the named type it resolves to.
pub fn embed_kind(types: &TypeTable, ty: TypeId) -> Option<(EmbedKind, TypeId)> {
    if let Some(Type::Pointer(elem)) = types.get(ty) {
        return types.is_struct(*elem).then_some((EmbedKind::PointerToStruct, *elem));
    }
    types.named(ty)?;
    if types.is_struct(ty) {
        Some((EmbedKind::Struct, ty))
    } else if types.is_interface(ty) {
        Some((EmbedKind::Interface, ty))
    } else {
        Some((EmbedKind::Named, ty))
    }
}

/// Members an embedded type exposes to its embedder, in declaration order: its fields
/// (own and promoted), then its methods (own and promoted).
fn embedded_surface(
    types: &TypeTable,
    kind: EmbedKind,
    target: TypeId,
    depth: usize,
) -> Vec<(String, Member)> {
    let mut out = Vec::new();
    match kind {
        EmbedKind::Struct | EmbedKind::PointerToStruct => {
            if depth > 8 {
                return out;
            }
            // Nested ambiguities are reported when the embedded type itself is synthesized.
            let mut nested = Vec::new();
            let Some(inner) = StructModel::build_depth(types, target, &mut nested, depth + 1) else {
                return out;
            };
            for f in &inner.fields {
                out.push((f.name.clone(), Member::Field(f.ty)));
            }
            for f in &inner.promoted_fields {
                out.push((f.name.clone(), Member::Field(f.ty)));
            }
            if let Some(named) = types.named(target) {
                for m in &named.methods {
                    out.push((m.name.clone(), Member::Method { owner: target, sig: m.sig }));
                }
            }
            for m in &inner.promoted_methods {
                out.push((m.name.clone(), Member::Method { owner: m.owner, sig: m.sig }));
            }
        }
        EmbedKind::Interface => {
            for m in types.interface_methods(target) {
                out.push((m.name.clone(), Member::Method { owner: target, sig: m.sig }));
            }
        }
        EmbedKind::Named => {
            if let Some(named) = types.named(target) {
                for m in &named.methods {
                    out.push((m.name.clone(), Member::Method { owner: target, sig: m.sig }));
                }
            }
        }
    }
    out
}
