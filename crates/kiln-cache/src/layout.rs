//! Versioned fingerprint layouts
//!
//! Engine releases have moved the build fingerprint around in the cache
//! header. Which bytes have to be copied from the reference cache therefore
//! depends on the version of the engine that will consume the cache. The
//! mapping is kept as an ordered table so that a new layout is one more entry
//! (built in, or read from `kiln.toml`) rather than another branch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::error::{CacheError, CacheResult};
use crate::header::{HEADER_MIN_LEN, SOURCE_LENGTH_OFFSET};

/// Engine (host runtime) version, e.g. `v20.11.1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EngineVersion {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Patch version
    pub patch: u32,
}

impl EngineVersion {
    /// Create a version from its components
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `v20.11.1`, `20.11`, `22` or `21.0.0-nightly2023`
    pub fn parse(input: &str) -> CacheResult<Self> {
        let trimmed = input.trim();
        let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let core = bare.split(['-', '+']).next().unwrap_or_default();

        let mut parts = core.split('.');
        let mut next = |required: bool| -> CacheResult<u32> {
            match parts.next() {
                Some(part) => part
                    .parse()
                    .map_err(|_| CacheError::InvalidVersion(input.to_string())),
                None if required => Err(CacheError::InvalidVersion(input.to_string())),
                None => Ok(0),
            }
        };

        let major = next(true)?;
        let minor = next(false)?;
        let patch = next(false)?;
        Ok(Self::new(major, minor, patch))
    }

    fn to_array(self) -> [u32; 3] {
        [self.major, self.minor, self.patch]
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for EngineVersion {
    type Err = CacheError;

    fn from_str(s: &str) -> CacheResult<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EngineVersion {
    type Error = CacheError;

    fn try_from(value: String) -> CacheResult<Self> {
        Self::parse(&value)
    }
}

impl From<EngineVersion> for String {
    fn from(value: EngineVersion) -> Self {
        value.to_string()
    }
}

/// Half-open version range: `min` inclusive, `below` exclusive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRange {
    /// Lowest matching version
    #[serde(default)]
    pub min: Option<EngineVersion>,
    /// First version that no longer matches
    #[serde(default)]
    pub below: Option<EngineVersion>,
}

impl VersionRange {
    /// Range matching every version
    pub const ANY: Self = Self {
        min: None,
        below: None,
    };

    /// Range `[min, below)`
    pub const fn between(min: EngineVersion, below: EngineVersion) -> Self {
        Self {
            min: Some(min),
            below: Some(below),
        }
    }

    /// Range `[min, ∞)`
    pub const fn starting_at(min: EngineVersion) -> Self {
        Self {
            min: Some(min),
            below: None,
        }
    }

    /// Check whether a version falls inside the range
    pub fn contains(&self, version: &EngineVersion) -> bool {
        self.min.is_none_or(|min| *version >= min)
            && self.below.is_none_or(|below| *version < below)
    }
}

/// A span of header bytes copied verbatim from the reference cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(usize, usize)", into = "(usize, usize)")]
pub struct ByteSpan {
    start: usize,
    end: usize,
}

impl ByteSpan {
    /// Create a span; it must be non-empty and stay clear of the length field
    pub fn new(start: usize, end: usize) -> CacheResult<Self> {
        let overlaps_length = start < HEADER_MIN_LEN && end > SOURCE_LENGTH_OFFSET;
        if start >= end || overlaps_length {
            return Err(CacheError::InvalidSpan { start, end });
        }
        Ok(Self { start, end })
    }

    const fn fixed(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// First byte (inclusive)
    pub fn start(&self) -> usize {
        self.start
    }

    /// Last byte (exclusive)
    pub fn end(&self) -> usize {
        self.end
    }

    /// Span as a range for slicing
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl TryFrom<(usize, usize)> for ByteSpan {
    type Error = CacheError;

    fn try_from((start, end): (usize, usize)) -> CacheResult<Self> {
        Self::new(start, end)
    }
}

impl From<ByteSpan> for (usize, usize) {
    fn from(span: ByteSpan) -> Self {
        (span.start, span.end)
    }
}

/// One table entry: versions in `range` copy `spans`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchLayout {
    /// Versions this layout applies to
    #[serde(flatten)]
    pub range: VersionRange,
    /// Bytes copied from the reference cache
    pub spans: Vec<ByteSpan>,
}

/// Ordered list of layouts; the first entry whose range matches wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutTable {
    entries: Vec<PatchLayout>,
}

const NARROW: &[ByteSpan] = &[ByteSpan::fixed(12, 16)];
const WIDE: &[ByteSpan] = &[ByteSpan::fixed(12, 16), ByteSpan::fixed(16, 20)];

impl Default for LayoutTable {
    /// Node 12.0 up to (not including) 20.1 keeps the fingerprint in 12..16;
    /// everything else needs 12..20.
    fn default() -> Self {
        Self {
            entries: vec![
                PatchLayout {
                    range: VersionRange::between(
                        EngineVersion::new(12, 0, 0),
                        EngineVersion::new(20, 1, 0),
                    ),
                    spans: NARROW.to_vec(),
                },
                PatchLayout {
                    range: VersionRange::ANY,
                    spans: WIDE.to_vec(),
                },
            ],
        }
    }
}

impl LayoutTable {
    /// Built-in table preceded by `overrides`, which take priority
    pub fn with_overrides(overrides: impl IntoIterator<Item = PatchLayout>) -> Self {
        let mut entries: Vec<PatchLayout> = overrides.into_iter().collect();
        entries.extend(Self::default().entries);
        Self { entries }
    }

    /// All entries in lookup order
    pub fn entries(&self) -> &[PatchLayout] {
        &self.entries
    }

    /// Spans to copy for an engine version
    pub fn spans_for(&self, version: &EngineVersion) -> &[ByteSpan] {
        self.entries
            .iter()
            .find(|layout| layout.range.contains(version))
            .map(|layout| layout.spans.as_slice())
            .unwrap_or(&[])
    }

    /// Table in the shape the generated loader script consumes:
    /// `[{ min: [M, m, p] | null, below: [M, m, p] | null, spans: [[s, e], ...] }]`
    pub fn to_loader_json(&self) -> serde_json::Value {
        let entries = self
            .entries
            .iter()
            .map(|layout| {
                serde_json::json!({
                    "min": layout.range.min.map(EngineVersion::to_array),
                    "below": layout.range.below.map(EngineVersion::to_array),
                    "spans": layout
                        .spans
                        .iter()
                        .map(|span| [span.start, span.end])
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        serde_json::Value::Array(entries)
    }
}
