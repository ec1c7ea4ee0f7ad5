use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::diagnostics::CompileError;

pub const CONFIG_FILE: &str = "goscript.toml";

/// Per-unit configuration consumed by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileConfig {
    /// Module specifier the generated code imports the runtime from.
    pub runtime_import: String,
    /// Write `builtin.ts` next to the generated files.
    pub emit_runtime: bool,
    pub output_dir: PathBuf,
    /// Explicit source package path -> target module specifier.
    pub path_map: BTreeMap<String, String>,
    /// Prefix for packages not listed in `path_map`.
    pub import_prefix: String,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            runtime_import: "@goscript/builtin".to_string(),
            emit_runtime: true,
            output_dir: PathBuf::from("output"),
            path_map: BTreeMap::new(),
            import_prefix: "@goscript/".to_string(),
        }
    }
}

impl CompileConfig {
    /// Output-path mapping: explicit entry first, otherwise `prefix + path`.
    pub fn map_import_path(&self, path: &str) -> String {
        match self.path_map.get(path) {
            Some(mapped) => mapped.clone(),
            None => format!("{}{}", self.import_prefix, path),
        }
    }

    /// Load `path`, falling back to defaults for every omitted key.
    pub fn load(path: &Path) -> Result<Self, CompileError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CompileError::config(format!("{CONFIG_FILE}: could not read file: {e}"), path.to_path_buf())
        })?;
        Self::from_toml(&content, path)
    }

    pub fn from_toml(content: &str, path: &Path) -> Result<Self, CompileError> {
        let raw: TomlConfig = toml::from_str(content).map_err(|e| {
            CompileError::config(format!("{CONFIG_FILE}: invalid syntax: {e}"), path.to_path_buf())
        })?;

        let mut config = Self::default();
        if let Some(output) = raw.output {
            if let Some(dir) = output.dir {
                if dir.trim().is_empty() {
                    return Err(CompileError::config(
                        format!("{CONFIG_FILE}: [output] dir cannot be empty"),
                        path.to_path_buf(),
                    ));
                }
                config.output_dir = PathBuf::from(dir);
            }
            if let Some(emit) = output.emit_runtime {
                config.emit_runtime = emit;
            }
        }
        if let Some(imports) = raw.imports {
            if let Some(prefix) = imports.prefix {
                config.import_prefix = prefix;
            }
            if let Some(runtime) = imports.runtime {
                config.runtime_import = runtime;
            }
            for (from, to) in imports.map {
                if to.trim().is_empty() {
                    return Err(CompileError::config(
                        format!("{CONFIG_FILE}: [imports.map] entry '{from}' maps to an empty path"),
                        path.to_path_buf(),
                    ));
                }
                config.path_map.insert(from, to);
            }
        }
        Ok(config)
    }

    /// Look for `goscript.toml` in `dir`; defaults when there is none.
    pub fn discover(dir: &Path) -> Result<Self, CompileError> {
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() { Self::load(&candidate) } else { Ok(Self::default()) }
    }
}

// ---- TOML deserialization types ----

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    output: Option<TomlOutput>,
    imports: Option<TomlImports>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlOutput {
    dir: Option<String>,
    emit_runtime: Option<bool>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlImports {
    prefix: Option<String>,
    runtime: Option<String>,
    #[serde(default)]
    map: BTreeMap<String, String>,
}
