//! Error types for kiln-compiler

use std::path::{Path, PathBuf};
use thiserror::Error;

use kiln_cache::CacheError;
use kiln_engine::EngineError;

/// Compiler error type
#[derive(Debug, Error)]
pub enum CompileError {
    /// Input of the wrong kind (e.g. source that is not UTF-8 text)
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected input kind
        expected: &'static str,
        /// What was given
        actual: String,
    },

    /// The engine refused a patched cache; there is no source to fall back to
    #[error("Invalid or incompatible cached data (cachedDataRejected): {}", path.display())]
    CacheRejected {
        /// Cache file
        path: PathBuf,
    },

    /// Filesystem error
    #[error("Failed to {op} {}: {source}", path.display())]
    FileIo {
        /// Operation that failed
        op: &'static str,
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Options could not be resolved
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// No handler registered for a file extension
    #[error("No handler registered for extension {0:?}")]
    UnhandledExtension(String),

    /// Engine error
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Cache format error
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl CompileError {
    /// Create a filesystem error
    pub fn io(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Self::FileIo {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create an invalid options error
    pub fn options(msg: impl Into<String>) -> Self {
        Self::InvalidOptions(msg.into())
    }
}

/// Result type using CompileError
pub type CompileResult<T> = Result<T, CompileError>;
