//! Loader script rendering.

use std::path::{Path, PathBuf};

use kiln_cache::LayoutTable;

use crate::error::{CompileError, CompileResult};
use crate::options::normalize_extname;

const LOADER_TEMPLATE: &str = include_str!("js/loader.js");
const EXTNAME_MARKER: &str = "/*__KILN_EXTNAME__*/";
const LAYOUTS_MARKER: &str = "/*__KILN_LAYOUTS__*/";

/// Render the standalone loader for caches named `*<extname>`.
///
/// Requiring the script registers `extname` with Node's module system and
/// exports `runBytecode` / `runBytecodeFile`. The header patch layouts in
/// `table` are embedded so the loader patches exactly like
/// [`HeaderPatcher`](kiln_cache::HeaderPatcher).
pub fn render_loader(extname: &str, table: &LayoutTable) -> CompileResult<String> {
    let extname = normalize_extname(extname)?;
    let extname = serde_json::to_string(&extname)
        .map_err(|e| CompileError::options(format!("unencodable extname: {}", e)))?;
    let layouts = table.to_loader_json().to_string();

    Ok(LOADER_TEMPLATE
        .replacen(EXTNAME_MARKER, &extname, 1)
        .replacen(LAYOUTS_MARKER, &layouts, 1))
}

/// Render the loader and write it to `dir/filename`, returning the path.
///
/// The generated file requires the cache by a bare relative name, so it is
/// written next to the cache.
pub async fn write_loader(
    dir: &Path,
    filename: &str,
    extname: &str,
    table: &LayoutTable,
) -> CompileResult<PathBuf> {
    let script = render_loader(extname, table)?;
    let path = dir.join(filename);
    tokio::fs::write(&path, script)
        .await
        .map_err(|e| CompileError::io("write loader", &path, e))?;
    tracing::debug!(path = %path.display(), "wrote loader");
    Ok(path)
}
