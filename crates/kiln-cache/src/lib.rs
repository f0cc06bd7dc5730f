//! # Kiln Cache
//!
//! Byte-level handling of V8 code caches ("cached data") produced ahead of time.
//!
//! A cache buffer is opaque apart from a small header:
//!
//! | bytes   | meaning                                              |
//! |---------|------------------------------------------------------|
//! | 0..8    | engine owned                                         |
//! | 8..12   | little-endian length of the compiled source string   |
//! | 12..16  | build fingerprint                                    |
//! | 16..20  | build fingerprint (wider layout, newer engines only) |
//!
//! This crate reads the length field, rebuilds a content-free placeholder
//! source of that length, and rewrites the fingerprint bytes so a cache made
//! by one engine build is accepted by another build of the same family.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod header;
pub mod layout;
pub mod patch;
pub mod placeholder;

pub use error::{CacheError, CacheResult};
pub use header::{CacheHeader, decode_source_length, encode_source_length};
pub use layout::{ByteSpan, EngineVersion, LayoutTable, PatchLayout, VersionRange};
pub use patch::{HeaderPatcher, REFERENCE_SOURCE, ReferenceSource, StaticReference};
pub use placeholder::{FILLER, engine_len, placeholder_source, placeholder_utf8_len};
