//! Discovery of engine executables.

use std::path::{Path, PathBuf};

use crate::error::{EngineError, EngineResult};

/// Environment variable overriding the Node.js executable
pub const NODE_ENV: &str = "KILN_NODE";

/// Environment variables naming an Electron executable, in priority order
pub const ELECTRON_ENV: &[&str] = &["KILN_ELECTRON", "ELECTRON_EXEC_PATH"];

/// Find the Node.js executable.
///
/// Search order: `explicit`, `$KILN_NODE`, `node` in `PATH`.
pub fn locate_node(explicit: Option<&Path>) -> EngineResult<PathBuf> {
    if let Some(path) = explicit {
        return existing("node", path);
    }
    if let Some(path) = std::env::var_os(NODE_ENV) {
        return existing("node", Path::new(&path));
    }

    which::which("node").map_err(|_| EngineError::missing("node", "not found in PATH"))
}

/// Find an Electron executable able to run as plain Node.
///
/// Search order: `explicit`, `$KILN_ELECTRON` / `$ELECTRON_EXEC_PATH`, the
/// `electron` npm package in a `node_modules` directory at or above
/// `search_from`, `electron` in `PATH`. Fails before anything is spawned.
pub fn locate_electron(explicit: Option<&Path>, search_from: &Path) -> EngineResult<PathBuf> {
    if let Some(path) = explicit {
        return existing("electron", path);
    }
    for var in ELECTRON_ENV {
        if let Some(path) = std::env::var_os(var) {
            return existing("electron", Path::new(&path));
        }
    }
    if let Some(path) = electron_from_node_modules(search_from) {
        tracing::debug!("Found electron package binary at {:?}", path);
        return Ok(path);
    }

    which::which("electron").map_err(|_| {
        EngineError::missing(
            "electron",
            format!(
                "no node_modules/electron above {} and not in PATH",
                search_from.display()
            ),
        )
    })
}

/// The `electron` package records its binary, relative to `dist/`, in `path.txt`
fn electron_from_node_modules(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        let package = dir.join("node_modules").join("electron");
        let relative = std::fs::read_to_string(package.join("path.txt")).ok()?;
        let binary = package.join("dist").join(relative.trim());
        binary.is_file().then_some(binary)
    })
}

fn existing(what: &'static str, path: &Path) -> EngineResult<PathBuf> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(EngineError::missing(what, path.display().to_string()))
    }
}
