//! Interfaces and named non-struct types.

use crate::emit::CodeWriter;
use crate::translate::Translator;
use crate::translate::descriptor::{method_table, registered_name};
use crate::types::TypeId;
use crate::visit::scope_tracker::escape_ident;

/// `export type Name = { ... }` plus the runtime registration used by dynamic
/// assertions. The error shape aliases the runtime error type.
pub fn emit_interface(w: &mut CodeWriter, tr: &Translator, id: TypeId, docs: &[String]) {
    let Some(named) = tr.types.named(id) else {
        return;
    };
    let name = escape_ident(&named.name);
    for line in docs {
        w.write_line(&format!("// {line}"));
    }
    w.write_line(&format!("export type {name} = {}", tr.alias_body(id).render()));
    w.blank_line();
    let registered = registered_name(tr.types, id).unwrap_or_else(|| named.name.clone());
    w.write_line(&format!(
        "$.registerInterfaceType(\"{registered}\", null, {})",
        method_table(tr.types, tr.types.underlying(id))
    ));
}

/// `export type Name = <underlying>`; methods go on a companion object of the same name,
/// each taking the receiver as its first parameter.
pub fn emit_named_type(w: &mut CodeWriter, tr: &Translator, id: TypeId, docs: &[String], methods: &[String]) {
    let Some(named) = tr.types.named(id) else {
        return;
    };
    let name = escape_ident(&named.name);
    for line in docs {
        w.write_line(&format!("// {line}"));
    }
    w.write_line(&format!("export type {name} = {}", tr.alias_body(id).render()));
    if methods.is_empty() {
        return;
    }
    w.blank_line();
    w.open_block(&format!("export const {name} ="));
    for (i, method) in methods.iter().enumerate() {
        if i > 0 {
            w.blank_line();
        }
        w.write_literally(method);
    }
    w.close_block("");
}
