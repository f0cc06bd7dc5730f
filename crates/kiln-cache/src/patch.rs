//! Header patching
//!
//! A cache embeds the fingerprint of the engine build that produced it and the
//! engine refuses caches whose fingerprint differs from its own. Patching
//! copies the fingerprint bytes from a fresh cache made by the running engine
//! (the reference) into the target. Nothing else in the target is verified:
//! if the rest of the cache is incompatible the engine will still reject it
//! or, worse, accept it.

use std::borrow::Cow;

use crate::error::{CacheError, CacheResult};
use crate::layout::{EngineVersion, LayoutTable};

/// Source compiled to obtain the reference cache.
///
/// The content is irrelevant; it only has to be a valid, non-empty script.
pub const REFERENCE_SOURCE: &str = "\"ಠ_ಠ\"";

/// Capability to produce a reference cache from the engine that will load
/// the patched buffer.
pub trait ReferenceSource {
    /// Version of the engine the reference comes from
    fn engine_version(&self) -> &EngineVersion;

    /// Cache of [`REFERENCE_SOURCE`] compiled by that engine
    fn reference_cache(&self) -> CacheResult<Cow<'_, [u8]>>;
}

impl<T: ReferenceSource + ?Sized> ReferenceSource for &T {
    fn engine_version(&self) -> &EngineVersion {
        (**self).engine_version()
    }

    fn reference_cache(&self) -> CacheResult<Cow<'_, [u8]>> {
        (**self).reference_cache()
    }
}

/// Reference bytes captured ahead of time
#[derive(Debug, Clone)]
pub struct StaticReference {
    version: EngineVersion,
    bytes: Vec<u8>,
}

impl StaticReference {
    /// Wrap a reference cache produced by an engine of `version`
    pub fn new(version: EngineVersion, bytes: Vec<u8>) -> Self {
        Self { version, bytes }
    }
}

impl ReferenceSource for StaticReference {
    fn engine_version(&self) -> &EngineVersion {
        &self.version
    }

    fn reference_cache(&self) -> CacheResult<Cow<'_, [u8]>> {
        Ok(Cow::Borrowed(&self.bytes))
    }
}

/// Rewrites fingerprint bytes so a cache is accepted by the running engine
pub struct HeaderPatcher<R> {
    reference: R,
    table: LayoutTable,
}

impl<R: ReferenceSource> HeaderPatcher<R> {
    /// Patcher using the built-in layout table
    pub fn new(reference: R) -> Self {
        Self::with_table(reference, LayoutTable::default())
    }

    /// Patcher using a custom layout table
    pub fn with_table(reference: R, table: LayoutTable) -> Self {
        Self { reference, table }
    }

    /// The reference source
    pub fn reference(&self) -> &R {
        &self.reference
    }

    /// The layout table
    pub fn table(&self) -> &LayoutTable {
        &self.table
    }

    /// Patch `target` in place.
    ///
    /// Either every span is copied or, on error, `target` is left untouched.
    /// Patching twice yields the same bytes as patching once.
    pub fn patch_header(&self, target: &mut [u8]) -> CacheResult<()> {
        let version = self.reference.engine_version();
        let spans = self.table.spans_for(version);
        let reference = self.reference.reference_cache()?;

        let needed = spans.iter().map(|span| span.end()).max().unwrap_or(0);
        if reference.len() < needed {
            return Err(CacheError::reference(format!(
                "reference cache is {} bytes, layout for v{} needs {}",
                reference.len(),
                version,
                needed
            )));
        }
        if target.len() < needed {
            return Err(CacheError::too_short(needed, target.len()));
        }

        for span in spans {
            target[span.range()].copy_from_slice(&reference[span.range()]);
        }

        tracing::trace!(version = %version, spans = spans.len(), "patched cache header");
        Ok(())
    }
}
