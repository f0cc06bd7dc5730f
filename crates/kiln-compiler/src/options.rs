//! Compilation options.
//!
//! Options are resolved once per compile through [`CompileOptionsBuilder`];
//! defaults are filled in by `build()` and the result is immutable.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{CompileError, CompileResult};

/// Default cache file extension
pub const DEFAULT_EXTNAME: &str = ".bin";

/// Default loader script name
pub const DEFAULT_LOADER_FILENAME: &str = "loader.js";

/// Resolved options for one compile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    filename: PathBuf,
    output: PathBuf,
    compile_as_module: bool,
    electron: bool,
    electron_path: Option<PathBuf>,
    create_loader: bool,
    loader_filename: String,
    extname: String,
}

impl CompileOptions {
    /// Start building options for `filename`
    pub fn builder(filename: impl Into<PathBuf>) -> CompileOptionsBuilder {
        CompileOptionsBuilder::new(filename)
    }

    /// Source file
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Output directory
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Wrap the source in the CommonJS module function before compiling
    pub fn compile_as_module(&self) -> bool {
        self.compile_as_module
    }

    /// Compile in an isolated Electron process
    pub fn electron(&self) -> bool {
        self.electron
    }

    /// Explicit Electron executable
    pub fn electron_path(&self) -> Option<&Path> {
        self.electron_path.as_deref()
    }

    /// Emit the loader script next to the cache
    pub fn create_loader(&self) -> bool {
        self.create_loader
    }

    /// Loader script file name
    pub fn loader_filename(&self) -> &str {
        &self.loader_filename
    }

    /// Cache file extension, always starting with `.`
    pub fn extname(&self) -> &str {
        &self.extname
    }

    /// Cache file name: the source's stem with `extname` appended
    /// (`app.js` → `app.bin`, `cli` → `cli.bin`)
    pub fn compiled_filename(&self) -> String {
        let stem = self
            .filename
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}{}", stem, self.extname)
    }

    /// Full path of the cache file
    pub fn cache_path(&self) -> PathBuf {
        self.output.join(self.compiled_filename())
    }

    /// Full path of the loader script
    pub fn loader_path(&self) -> PathBuf {
        self.output.join(&self.loader_filename)
    }
}

/// Builder for [`CompileOptions`]
#[derive(Debug, Clone, Default)]
pub struct CompileOptionsBuilder {
    filename: PathBuf,
    output: Option<PathBuf>,
    compile_as_module: bool,
    electron: bool,
    electron_path: Option<PathBuf>,
    create_loader: bool,
    loader_filename: Option<String>,
    extname: Option<String>,
}

impl CompileOptionsBuilder {
    /// Create a builder for `filename`
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            ..Self::default()
        }
    }

    /// Source file
    pub fn filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Output directory (default: the source's directory)
    pub fn output(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output = Some(dir.into());
        self
    }

    /// Wrap as a CommonJS module (default: false)
    pub fn compile_as_module(mut self, yes: bool) -> Self {
        self.compile_as_module = yes;
        self
    }

    /// Use the isolated Electron compiler (default: false)
    pub fn electron(mut self, yes: bool) -> Self {
        self.electron = yes;
        self
    }

    /// Explicit Electron executable
    pub fn electron_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.electron_path = Some(path.into());
        self
    }

    /// Emit a loader script (default: false)
    pub fn create_loader(mut self, yes: bool) -> Self {
        self.create_loader = yes;
        self
    }

    /// Loader script name (default: `loader.js`)
    pub fn loader_filename(mut self, name: impl Into<String>) -> Self {
        self.loader_filename = Some(name.into());
        self
    }

    /// Cache extension (default: `.bin`)
    pub fn extname(mut self, ext: impl Into<String>) -> Self {
        self.extname = Some(ext.into());
        self
    }

    /// Fill in defaults and validate
    pub fn build(self) -> CompileResult<CompileOptions> {
        if self.filename.file_name().is_none() {
            return Err(CompileError::options(format!(
                "filename must name a file, got {:?}",
                self.filename
            )));
        }

        let output = match self.output {
            Some(dir) => dir,
            None => match self.filename.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        };

        let extname = normalize_extname(self.extname.as_deref().unwrap_or(DEFAULT_EXTNAME))?;

        let loader_filename = self
            .loader_filename
            .unwrap_or_else(|| DEFAULT_LOADER_FILENAME.to_string());
        if loader_filename.is_empty() || loader_filename.contains(['/', '\\']) {
            return Err(CompileError::options(format!(
                "loader filename must be a plain file name, got {:?}",
                loader_filename
            )));
        }

        Ok(CompileOptions {
            filename: self.filename,
            output,
            compile_as_module: self.compile_as_module,
            electron: self.electron,
            electron_path: self.electron_path,
            create_loader: self.create_loader,
            loader_filename,
            extname,
        })
    }
}

/// `jsc` → `.jsc`; rejects empty extensions and path separators
pub fn normalize_extname(ext: &str) -> CompileResult<String> {
    let bare = ext.strip_prefix('.').unwrap_or(ext);
    if bare.is_empty() || bare.contains(['/', '\\']) {
        return Err(CompileError::options(format!("invalid extname {:?}", ext)));
    }
    Ok(format!(".{}", bare))
}

/// One compile target as written in `kiln.toml`.
///
/// Keys are snake_case; the camelCase names used by bundler plugin configs
/// are accepted as aliases.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetConfig {
    /// Source file (required)
    pub filename: PathBuf,

    /// Output directory
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Wrap as a CommonJS module
    #[serde(default, alias = "compileAsModule")]
    pub compile_as_module: bool,

    /// Use the isolated Electron compiler
    #[serde(default)]
    pub electron: bool,

    /// Explicit Electron executable
    #[serde(default, alias = "electronPath")]
    pub electron_path: Option<PathBuf>,

    /// Emit a loader script
    #[serde(default, alias = "createLoader")]
    pub create_loader: bool,

    /// Loader script name
    #[serde(default, alias = "loaderFilename")]
    pub loader_filename: Option<String>,

    /// Cache extension
    #[serde(default)]
    pub extname: Option<String>,
}

impl TargetConfig {
    /// Builder with this target's settings; `base` supplies the loader and
    /// extension defaults the target leaves out
    pub fn to_builder(&self, base: CompileOptionsBuilder) -> CompileOptionsBuilder {
        let mut builder = base
            .filename(&self.filename)
            .compile_as_module(self.compile_as_module)
            .electron(self.electron)
            .create_loader(self.create_loader);

        if let Some(output) = &self.output {
            builder = builder.output(output);
        }
        if let Some(path) = &self.electron_path {
            builder = builder.electron_path(path);
        }
        if let Some(name) = &self.loader_filename {
            builder = builder.loader_filename(name);
        }
        if let Some(ext) = &self.extname {
            builder = builder.extname(ext);
        }
        builder
    }
}
