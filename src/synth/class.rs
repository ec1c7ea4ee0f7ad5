//! Class emission for struct types.

use crate::emit::CodeWriter;
use crate::synth::{EmbedKind, StructModel, member_name};
use crate::translate::Translator;
use crate::translate::descriptor::{describe, registered_name};
use crate::types::TypeId;

/// Emit the class for `model`. `methods` holds the already rendered method bodies
/// (one string per method, indented one level deeper than the class line).
pub fn emit_struct_class(w: &mut CodeWriter, tr: &Translator, model: &StructModel, docs: &[String], methods: &[String]) {
    let class = crate::visit::scope_tracker::escape_ident(&model.name);
    for line in docs {
        w.write_line(&format!("// {line}"));
    }
    w.open_block(&format!("export class {class}"));

    emit_accessors(w, tr, model);
    emit_field_storage(w, tr, model);
    emit_constructor(w, tr, model);
    emit_clone(w, tr, model, &class);

    for method in methods {
        w.blank_line();
        w.write_literally(method);
    }

    emit_promoted(w, tr, model);

    w.blank_line();
    emit_registration(w, tr, model, &class);
    w.close_block("");
}

fn emit_accessors(w: &mut CodeWriter, tr: &Translator, model: &StructModel) {
    for field in &model.fields {
        let name = member_name(&field.name);
        let ty = tr.render_str(field.ty);
        w.open_block(&format!("public get {name}(): {ty}"));
        w.write_line(&format!("return this._fields.{name}.value"));
        w.close_block("");
        w.open_block(&format!("public set {name}(value: {ty})"));
        w.write_line(&format!("this._fields.{name}.value = value"));
        w.close_block("");
        w.blank_line();
    }
}

fn emit_field_storage(w: &mut CodeWriter, tr: &Translator, model: &StructModel) {
    if model.fields.is_empty() {
        w.write_line("public _fields: {} = {}");
        w.blank_line();
        return;
    }
    w.open_block("public _fields:");
    for field in &model.fields {
        w.write_line(&format!("{}: $.VarRef<{}>;", member_name(&field.name), tr.render_str(field.ty)));
    }
    w.close_block("");
    w.blank_line();
}

fn emit_constructor(w: &mut CodeWriter, tr: &Translator, model: &StructModel) {
    let init_fields: Vec<String> = model
        .fields
        .iter()
        .map(|f| format!("{}?: {}", member_name(&f.name), tr.render_str(f.ty)))
        .collect();
    w.open_block(&format!("constructor(init?: Partial<{{{}}}>)", init_fields.join(", ")));
    if model.fields.is_empty() {
        w.write_line("void init");
    } else {
        w.open_block("this._fields =");
        for field in &model.fields {
            let name = member_name(&field.name);
            let zero = tr.zero_value(field.ty);
            let provided = tr.clone_expr(&format!("init.{name}"), field.ty);
            let value = if provided == format!("init.{name}") {
                format!("init?.{name} ?? {zero}")
            } else {
                format!("init?.{name} !== undefined ? {provided} : {zero}")
            };
            w.write_line(&format!("{name}: $.varRef({value}),"));
        }
        w.close_block("");
    }
    w.close_block("");
    w.blank_line();
}

fn emit_clone(w: &mut CodeWriter, tr: &Translator, model: &StructModel, class: &str) {
    w.open_block(&format!("public clone(): {class}"));
    w.write_line(&format!("const cloned = new {class}()"));
    if !model.fields.is_empty() {
        w.open_block("cloned._fields =");
        for field in &model.fields {
            let name = member_name(&field.name);
            let value = tr.clone_expr(&format!("this._fields.{name}.value"), field.ty);
            w.write_line(&format!("{name}: $.varRef({value}),"));
        }
        w.close_block("");
    }
    w.write_line("return cloned");
    w.close_block("");
}

/// Access path to the embedded value, asserting non-null where the embedding can be nil.
fn via_expr(via: &str, kind: EmbedKind) -> String {
    match kind {
        EmbedKind::Struct | EmbedKind::Named => format!("this.{}", member_name(via)),
        EmbedKind::PointerToStruct | EmbedKind::Interface => format!("this.{}!", member_name(via)),
    }
}

fn emit_promoted(w: &mut CodeWriter, tr: &Translator, model: &StructModel) {
    for field in &model.promoted_fields {
        let name = member_name(&field.name);
        let ty = tr.render_str(field.ty);
        let base = via_expr(&field.via, field.via_kind);
        w.blank_line();
        w.open_block(&format!("public get {name}(): {ty}"));
        w.write_line(&format!("return {base}.{name}"));
        w.close_block("");
        w.open_block(&format!("public set {name}(value: {ty})"));
        w.write_line(&format!("{base}.{name} = value"));
        w.close_block("");
    }

    for method in &model.promoted_methods {
        let name = member_name(&method.name);
        let params = promoted_params(tr, method.sig);
        let args: Vec<String> = (0..params.len()).map(|i| format!("_p{i}")).collect();
        let call = match method.via_kind {
            EmbedKind::Named => {
                let companion = tr.qualified_name(method.owner).unwrap_or_else(|| method.via.clone());
                let mut all = vec![via_expr(&method.via, method.via_kind)];
                all.extend(args.iter().cloned());
                format!("{companion}.{name}({})", all.join(", "))
            }
            kind => format!("{}.{name}({})", via_expr(&method.via, kind), args.join(", ")),
        };
        w.blank_line();
        w.open_block(&format!("public {name}({})", params.join(", ")));
        w.write_line(&format!("return {call}"));
        w.close_block("");
    }
}

fn promoted_params(tr: &Translator, sig: TypeId) -> Vec<String> {
    match tr.types.signature(sig) {
        Some(sig) => sig.params.iter().enumerate().map(|(i, p)| format!("_p{i}: {}", tr.render_str(*p))).collect(),
        None => vec![],
    }
}

fn emit_registration(w: &mut CodeWriter, tr: &Translator, model: &StructModel, class: &str) {
    let name = registered_name(tr.types, model.type_id).unwrap_or_else(|| model.name.clone());
    let methods: Vec<String> = model.all_method_names().iter().map(|m| format!("\"{}\"", member_name(m))).collect();
    let fields: Vec<String> = model
        .fields
        .iter()
        .map(|f| format!("\"{}\": {}", member_name(&f.name), describe(tr.types, f.ty)))
        .collect();
    w.write_line(&format!(
        "static __typeInfo = $.registerStructType(\"{name}\", () => new {class}(), [{}], {class}, {{{}}})",
        methods.join(", "),
        fields.join(", ")
    ));
}
