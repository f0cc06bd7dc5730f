//! Error types for kiln-engine

use std::path::PathBuf;
use thiserror::Error;

use kiln_cache::CacheError;

/// Engine error type
#[derive(Debug, Error)]
pub enum EngineError {
    /// A required executable could not be found
    #[error("{what} not found: {hint}")]
    DependencyMissing {
        /// What was searched for
        what: &'static str,
        /// Where it was searched
        hint: String,
    },

    /// The OS refused to start a child process
    #[error("Failed to spawn {}: {source}", program.display())]
    ChildProcess {
        /// Program that failed to start
        program: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The engine reported an error (syntax error, thrown exception, ...)
    #[error("Script error: {0}")]
    Script(String),

    /// The engine host sent something unexpected or went away
    #[error("Engine host protocol error: {0}")]
    Protocol(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Cache format error
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl EngineError {
    /// Create a dependency missing error
    pub fn missing(what: &'static str, hint: impl Into<String>) -> Self {
        Self::DependencyMissing {
            what,
            hint: hint.into(),
        }
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        Self::Protocol(format!("invalid JSON from engine host: {}", e))
    }
}

/// Result type using EngineError
pub type EngineResult<T> = Result<T, EngineError>;
