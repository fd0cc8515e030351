//! Index and application configuration
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed with `FTSGATE` (nested keys separated by
//! `__`, e.g. `FTSGATE__INDEX__WRITER_MEMORY=50000000`).

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{SearchError, SearchResult};
use crate::schema::SchemaDefinition;

/// Prefix of environment variables overriding file settings
pub const ENV_PREFIX: &str = "FTSGATE";

/// Default writer memory budget in bytes
pub const DEFAULT_WRITER_MEMORY: usize = 15_000_000;

/// Smallest budget the engine accepts for a single indexing thread
pub const MIN_WRITER_MEMORY: usize = 15_000_000;

/// Default number of results returned by a search
pub const DEFAULT_LIMIT: usize = 10;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Settings of one index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Index directory; `None` keeps the index in memory
    pub path: Option<PathBuf>,

    /// Writer memory budget in bytes (default: 15MB)
    pub writer_memory: usize,

    /// Hold the writer for the index's whole lifetime
    pub exclusive_writer: bool,

    /// Results returned when no limit is given
    pub default_limit: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: None,
            writer_memory: DEFAULT_WRITER_MEMORY,
            exclusive_writer: false,
            default_limit: DEFAULT_LIMIT,
        }
    }
}

impl IndexConfig {
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::new()
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn persisted(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Load from an optional TOML file with environment overrides
    pub fn load(file: Option<&Path>) -> SearchResult<Self> {
        let config: Self = layered(None, file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SearchResult<()> {
        if self.writer_memory < MIN_WRITER_MEMORY {
            return Err(SearchError::Configuration(format!(
                "writer_memory must be at least {MIN_WRITER_MEMORY} bytes, got {}",
                self.writer_memory
            )));
        }
        Ok(())
    }
}

/// Builder for IndexConfig
pub struct IndexConfigBuilder {
    config: IndexConfig,
}

impl IndexConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: IndexConfig::default(),
        }
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = Some(path.into());
        self
    }

    pub fn writer_memory(mut self, bytes: usize) -> Self {
        self.config.writer_memory = bytes;
        self
    }

    pub fn exclusive_writer(mut self, exclusive: bool) -> Self {
        self.config.exclusive_writer = exclusive;
        self
    }

    pub fn default_limit(mut self, limit: usize) -> Self {
        self.config.default_limit = limit;
        self
    }

    pub fn build(self) -> IndexConfig {
        self.config
    }
}

impl Default for IndexConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Logging settings for the command line tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_logs: bool,
}

fn default_log_level() -> String {
    "ftsgate=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// Full configuration: index settings, schema and logging
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub schema: SchemaDefinition,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load built-in defaults, then `file`, then `FTSGATE__*` variables
    pub fn load(file: Option<&Path>) -> SearchResult<Self> {
        let config: Self = layered(Some(DEFAULT_CONFIG), file)?;
        config.index.validate()?;
        Ok(config)
    }
}

fn layered<T: DeserializeOwned>(defaults: Option<&str>, file: Option<&Path>) -> SearchResult<T> {
    let mut builder = config::Config::builder();

    if let Some(defaults) = defaults {
        builder = builder.add_source(config::File::from_str(defaults, config::FileFormat::Toml));
    }
    if let Some(file) = file {
        builder = builder.add_source(config::File::from(file).format(config::FileFormat::Toml));
    }

    let config = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}
