//! Configuration file parsing for kiln.toml.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use kiln_cache::{LayoutTable, PatchLayout};
use kiln_compiler::{CompileOptionsBuilder, TargetConfig};

/// Config file names, searched in each directory from the cwd upward
const CONFIG_NAMES: &[&str] = &["kiln.toml", "kiln.config.toml", ".kilnrc.toml"];

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Engine executables
    #[serde(default)]
    pub engine: EngineConfig,

    /// Loader defaults
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Header patch layout overrides
    #[serde(default)]
    pub patch: PatchConfig,

    /// Build targets (`[[target]]`)
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetConfig>,

    /// Directory relative paths are resolved against (the config file's
    /// directory, or the cwd when no file was found)
    #[serde(skip)]
    pub root: PathBuf,
}

/// Engine executable overrides.
#[derive(Debug, Default, Deserialize)]
pub struct EngineConfig {
    /// Node.js executable for the engine host
    pub node: Option<PathBuf>,

    /// Electron executable for isolated compiles
    pub electron: Option<PathBuf>,
}

/// Loader defaults applied to every compile.
#[derive(Debug, Default, Deserialize)]
pub struct LoaderConfig {
    /// Loader script name
    pub filename: Option<String>,

    /// Cache file extension
    pub extname: Option<String>,
}

/// `[[patch.layout]]` entries.
#[derive(Debug, Default, Deserialize)]
pub struct PatchConfig {
    /// Layouts tried before the built-in table, first match wins
    #[serde(default)]
    pub layout: Vec<PatchLayout>,
}

impl Config {
    /// Layout table with the configured overrides in front
    pub fn layouts(&self) -> LayoutTable {
        LayoutTable::with_overrides(self.patch.layout.iter().cloned())
    }

    /// Resolve a config-relative path
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Node executable, resolved
    pub fn node(&self) -> Option<PathBuf> {
        self.engine.node.as_deref().map(|p| self.resolve(p))
    }

    /// Electron executable, resolved
    pub fn electron(&self) -> Option<PathBuf> {
        self.engine.electron.as_deref().map(|p| self.resolve(p))
    }

    /// Builder carrying the loader defaults and engine paths from the config
    pub fn base_builder(&self) -> CompileOptionsBuilder {
        let mut builder = CompileOptionsBuilder::default();
        if let Some(name) = &self.loader.filename {
            builder = builder.loader_filename(name);
        }
        if let Some(ext) = &self.loader.extname {
            builder = builder.extname(ext);
        }
        if let Some(electron) = self.electron() {
            builder = builder.electron_path(electron);
        }
        builder
    }

    /// Builder for a `[[target]]`, with its paths resolved against the config
    pub fn target_builder(&self, target: &TargetConfig) -> CompileOptionsBuilder {
        let resolved = TargetConfig {
            filename: self.resolve(&target.filename),
            output: target.output.as_deref().map(|p| self.resolve(p)),
            electron_path: target.electron_path.as_deref().map(|p| self.resolve(p)),
            ..target.clone()
        };
        resolved.to_builder(self.base_builder())
    }
}

/// Load configuration from a file or search for default config files.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config_path = path.map(PathBuf::from).or_else(find_config_file);

    match config_path {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            config.root = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            tracing::debug!(path = %path.display(), "loaded config");
            Ok(config)
        }
        Some(path) => Err(anyhow::anyhow!("Config file not found: {}", path.display())),
        None => Ok(Config {
            root: std::env::current_dir()?,
            ..Config::default()
        }),
    }
}

/// Search for configuration file in the current directory and parent directories.
fn find_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_from(&cwd)
}

fn find_config_from(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    })
}
