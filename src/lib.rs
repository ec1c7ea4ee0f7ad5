pub mod span;
pub mod diagnostics;
pub mod ast;
pub mod types;
pub mod visit;
pub mod analysis;
pub mod translate;
pub mod synth;
pub mod codegen;
pub mod emit;
pub mod config;
pub mod runtime;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use analysis::Analysis;
use ast::Package;
use codegen::GeneratedUnit;
use config::CompileConfig;
use diagnostics::{CompileError, CompileWarning};

/// Everything one compilation produced.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub files: Vec<GeneratedUnit>,
    pub warnings: Vec<CompileWarning>,
}

/// Run the binding-graph and async analysis for a package without generating code.
pub fn analyze_package(pkg: &Package) -> Analysis {
    debug!("analyzing package {}", pkg.path);
    analysis::analyze(pkg)
}

/// Compile one package (analysis, then generation) into its target module.
/// No file I/O.
pub fn compile_package(pkg: &Package, config: &CompileConfig) -> Result<CompileOutput, CompileError> {
    let analysis = analyze_package(pkg);
    let unit = codegen::generate_package(pkg, &analysis, config)?;
    let warnings = unit.warnings.clone();
    Ok(CompileOutput { files: vec![unit], warnings })
}

/// Parse the JSON form of a package handed over by a front end.
pub fn load_package_json(text: &str) -> Result<Package, CompileError> {
    let mut pkg: Package =
        serde_json::from_str(text).map_err(|e| CompileError::input(format!("malformed package JSON: {e}")))?;
    pkg.types.reindex();
    validate_package(&pkg)?;
    Ok(pkg)
}

/// Compile a package given as JSON.
pub fn compile_json(text: &str, config: &CompileConfig) -> Result<CompileOutput, CompileError> {
    let pkg = load_package_json(text)?;
    compile_package(&pkg, config)
}

/// Read `input`, compile it, and write the generated modules (and, if configured,
/// the runtime) under `config.output_dir`. Returns the written paths.
pub fn compile_file(input: &Path, config: &CompileConfig) -> Result<(CompileOutput, Vec<PathBuf>), CompileError> {
    let text = std::fs::read_to_string(input)
        .map_err(|e| CompileError::io(format!("could not read input: {e}"), input.to_path_buf()))?;
    let output = compile_json(&text, config)?;
    let written = write_output(&output, config)?;
    Ok((output, written))
}

pub fn write_output(output: &CompileOutput, config: &CompileConfig) -> Result<Vec<PathBuf>, CompileError> {
    let mut written = Vec::new();
    for unit in &output.files {
        let path = config.output_dir.join(&unit.path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CompileError::io(format!("could not create directory: {e}"), parent.to_path_buf()))?;
        }
        std::fs::write(&path, &unit.source)
            .map_err(|e| CompileError::io(format!("could not write output: {e}"), path.clone()))?;
        info!("wrote {}", path.display());
        written.push(path);
    }
    if config.emit_runtime {
        runtime::write_runtime(&config.output_dir)?;
        written.push(config.output_dir.join(runtime::RUNTIME_FILE));
    }
    Ok(written)
}

/// Reject dangling object and type references before anything indexes with them.
fn validate_package(pkg: &Package) -> Result<(), CompileError> {
    let n_types = pkg.types.len();
    for (i, obj) in pkg.objects.iter().enumerate() {
        if let Some(ty) = obj.ty {
            if ty.0 as usize >= n_types {
                return Err(CompileError::input(format!(
                    "object {i} ('{}') refers to unknown type {}",
                    obj.name, ty.0
                )));
            }
        }
    }
    for file in &pkg.files {
        for import in &file.imports {
            if let Some(obj) = import.node.obj {
                if pkg.object(obj).is_none() {
                    return Err(CompileError::input(format!(
                        "{}: import \"{}\" refers to unknown object {}",
                        file.name, import.node.path, obj.0
                    )));
                }
            }
        }
    }
    Ok(())
}
