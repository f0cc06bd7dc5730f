//! One-time engine configuration.
//!
//! V8 compiles inner functions lazily and may flush bytecode of functions it
//! considers cold. Either way those functions would be missing from a cache,
//! so both are switched off. The flags are process-wide and only take effect
//! if set before the engine parses anything, which is why they are fixed once
//! here and handed to every engine constructor.

use std::sync::OnceLock;

static SETUP: OnceLock<EngineSetup> = OnceLock::new();

/// Engine flags relevant to cache completeness.
///
/// The default turns both off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineFlags {
    /// Compile inner functions lazily
    pub lazy: bool,
    /// Allow the engine to flush bytecode of cold functions
    pub flush_bytecode: bool,
}

impl EngineFlags {
    /// Command line form, e.g. `["--no-lazy", "--no-flush-bytecode"]`
    pub fn as_args(&self) -> Vec<&'static str> {
        let mut args = Vec::with_capacity(2);
        if !self.lazy {
            args.push("--no-lazy");
        }
        if !self.flush_bytecode {
            args.push("--no-flush-bytecode");
        }
        args
    }

    /// Statements applying the flags from inside a script
    pub fn set_flags_js(&self) -> String {
        self.as_args()
            .iter()
            .map(|flag| format!("v8.setFlagsFromString('{}');\n", flag))
            .collect()
    }
}

/// Proof that the process-wide engine configuration has been fixed
#[derive(Debug)]
pub struct EngineSetup {
    flags: EngineFlags,
}

impl EngineSetup {
    /// Fix the default configuration (idempotent)
    pub fn ensure() -> &'static EngineSetup {
        Self::ensure_with(EngineFlags::default())
    }

    /// Fix `flags` as the configuration. Only the first call decides; later
    /// calls return the existing setup.
    pub fn ensure_with(flags: EngineFlags) -> &'static EngineSetup {
        let setup = SETUP.get_or_init(|| {
            tracing::debug!(?flags, "engine configured");
            EngineSetup { flags }
        });
        setup.warn_if_conflicting(flags);
        setup
    }

    /// Warn when `requested` differs from the flags in effect. Returns
    /// whether it did.
    fn warn_if_conflicting(&self, requested: EngineFlags) -> bool {
        if self.flags == requested {
            return false;
        }
        tracing::warn!(
            current = ?self.flags,
            ?requested,
            "engine already configured, keeping current flags"
        );
        true
    }

    /// The configured flags
    pub fn flags(&self) -> EngineFlags {
        self.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        assert_eq!(
            EngineFlags::default().as_args(),
            vec!["--no-lazy", "--no-flush-bytecode"]
        );
    }

    #[test]
    fn test_lazy_allowed() {
        let flags = EngineFlags {
            lazy: true,
            flush_bytecode: false,
        };
        assert_eq!(flags.as_args(), vec!["--no-flush-bytecode"]);
    }

    #[test]
    fn test_set_flags_js() {
        let js = EngineFlags::default().set_flags_js();
        assert_eq!(
            js,
            "v8.setFlagsFromString('--no-lazy');\nv8.setFlagsFromString('--no-flush-bytecode');\n"
        );
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let first = EngineSetup::ensure();
        let second = EngineSetup::ensure_with(EngineFlags {
            lazy: true,
            flush_bytecode: true,
        });
        assert!(std::ptr::eq(first, second));
        assert_eq!(second.flags(), first.flags());
    }

    #[test]
    fn test_conflicting_flags_reported() {
        let setup = EngineSetup {
            flags: EngineFlags::default(),
        };
        assert!(!setup.warn_if_conflicting(EngineFlags::default()));
        assert!(setup.warn_if_conflicting(EngineFlags {
            lazy: true,
            flush_bytecode: false,
        }));
        assert_eq!(setup.flags(), EngineFlags::default());
    }
}
