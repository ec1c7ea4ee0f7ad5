//! The target-side support module every generated file imports as `$`.

use std::path::Path;

use crate::diagnostics::CompileError;

pub const RUNTIME_FILE: &str = "builtin.ts";

pub const BUILTIN_TS: &str = include_str!("builtin.ts");

/// Write `builtin.ts` into `dir`, creating the directory if needed.
pub fn write_runtime(dir: &Path) -> Result<(), CompileError> {
    std::fs::create_dir_all(dir).map_err(|e| CompileError::io(format!("could not create directory: {e}"), dir.to_path_buf()))?;
    let path = dir.join(RUNTIME_FILE);
    std::fs::write(&path, BUILTIN_TS).map_err(|e| CompileError::io(format!("could not write runtime: {e}"), path))
}

/// Whether the runtime exports `name`. Used by tests to keep generated calls and the
/// runtime in sync.
pub fn exports(name: &str) -> bool {
    ["function", "class", "const", "type", "interface", "enum"]
        .iter()
        .any(|kw| BUILTIN_TS.contains(&format!("export {kw} {name}")) || BUILTIN_TS.contains(&format!("export async {kw} {name}")))
}
