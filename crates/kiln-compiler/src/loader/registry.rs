//! Extension-keyed module table.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{CompileError, CompileResult};
use crate::options::normalize_extname;

/// Loads one kind of file into a value
pub trait ExtensionHandler: Send + Sync {
    /// Load and evaluate the file at `path`
    fn load(&self, path: &Path) -> CompileResult<serde_json::Value>;
}

/// Something handlers can be registered with
pub trait ExtensionRegistry {
    /// Route files ending in `ext` to `handler`, replacing any previous one
    fn register(&mut self, ext: &str, handler: Arc<dyn ExtensionHandler>) -> CompileResult<()>;
}

/// Module table: extension handlers plus a cache of loaded modules keyed
/// by canonical path, so each file is evaluated at most once.
///
/// Concurrent requires of the same file wait for the first load instead of
/// running the handler again. A failed load leaves nothing behind, so the
/// next require retries. Handlers must not require their own file through
/// the same table.
#[derive(Default)]
pub struct ModuleTable {
    handlers: HashMap<String, Arc<dyn ExtensionHandler>>,
    cache: RwLock<HashMap<PathBuf, Arc<ModuleSlot>>>,
}

/// One cache entry, locked for the duration of its load
type ModuleSlot = Mutex<Option<serde_json::Value>>;

impl ModuleTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered extensions
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Load `path` through the handler for its extension, or return the
    /// cached value if it was loaded before
    pub fn require(&self, path: &Path) -> CompileResult<serde_json::Value> {
        let canonical = path
            .canonicalize()
            .map_err(|e| CompileError::io("resolve", path, e))?;

        let existing = self.cache.read().get(&canonical).cloned();
        if let Some(value) = existing.as_deref().and_then(|slot| slot.lock().as_ref().cloned()) {
            return Ok(value);
        }

        let ext = canonical
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let handler = self
            .handlers
            .get(&ext)
            .ok_or_else(|| CompileError::UnhandledExtension(ext.clone()))?;

        let slot = match existing {
            Some(slot) => slot,
            None => self
                .cache
                .write()
                .entry(canonical.clone())
                .or_default()
                .clone(),
        };

        let mut loaded = slot.lock();
        if let Some(value) = loaded.as_ref() {
            return Ok(value.clone());
        }

        let value = handler.load(&canonical)?;
        tracing::debug!(path = %canonical.display(), "loaded module");
        *loaded = Some(value.clone());
        Ok(value)
    }

    /// Whether `path` has finished loading
    pub fn is_cached(&self, path: &Path) -> bool {
        let Ok(canonical) = path.canonicalize() else {
            return false;
        };
        let slot = self.cache.read().get(&canonical).cloned();
        slot.and_then(|slot| slot.try_lock().map(|loaded| loaded.is_some()))
            .unwrap_or(false)
    }
}

impl ExtensionRegistry for ModuleTable {
    fn register(&mut self, ext: &str, handler: Arc<dyn ExtensionHandler>) -> CompileResult<()> {
        let ext = normalize_extname(ext)?;
        if self.handlers.insert(ext.clone(), handler).is_some() {
            tracing::debug!(ext = %ext, "replaced extension handler");
        }
        Ok(())
    }
}
