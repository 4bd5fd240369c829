//! Layered application configuration.
//!
//! Values are merged with `figment` in increasing priority:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config PATH`, or `config.toml` in the platform config dir)
//! 3. `SNAPSWEEP_*` environment variables
//! 4. Command-line flags
//!
//! ```toml
//! io_threads = 8
//! thumbnail_size = 24
//! large_threshold = 10485760
//! burst_window_ms = 1000
//! cache_dir = "/var/cache/snapsweep"
//! ```

use anyhow::{Context, Result};
use chrono::Duration;
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cache::CacheDir;
use crate::classify::{ClassifierConfig, DEFAULT_BURST_WINDOW_MS};
use crate::cli::{ClassifyArgs, LibraryArgs};
use crate::pipeline::{PipelineConfig, DEFAULT_IO_THREADS, DEFAULT_THUMBNAIL_SIZE};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "SNAPSWEEP_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fingerprint worker threads
    pub io_threads: usize,
    /// Thumbnail edge length in pixels
    pub thumbnail_size: u32,
    /// Large-file threshold in bytes
    pub large_threshold: u64,
    /// Burst window in milliseconds
    pub burst_window_ms: u64,
    /// Cache directory; the platform cache dir when unset
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            io_threads: DEFAULT_IO_THREADS,
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            large_threshold: 5 * 1024 * 1024,
            burst_window_ms: DEFAULT_BURST_WINDOW_MS as u64,
            cache_dir: None,
        }
    }
}

impl Config {
    /// Load from the default config file (if any) and the environment.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Ok(path) => Self::load_from_path(&path),
            Err(e) => {
                log::debug!("No config directory ({}), using defaults and env", e);
                Self::figment(None).extract().context("Invalid configuration")
            }
        }
    }

    /// Load from a specific TOML file and the environment.
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config: Self = Self::figment(Some(path))
            .extract()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        log::debug!("Configuration loaded: {:?}", config);
        Ok(config)
    }

    fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Platform default path of `config.toml`.
    pub fn config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "snapsweep", "snapsweep")
            .ok_or_else(|| anyhow::anyhow!("Failed to determine project directories"))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Apply library flags from the command line.
    pub fn merge_library_args(&mut self, args: &LibraryArgs) {
        if let Some(n) = args.io_threads {
            self.io_threads = n;
        }
        if let Some(px) = args.thumbnail_size {
            self.thumbnail_size = px;
        }
        if let Some(ref dir) = args.cache_dir {
            self.cache_dir = Some(dir.clone());
        }
    }

    /// Apply classification flags from the command line.
    pub fn merge_classify_args(&mut self, args: &ClassifyArgs) {
        if let Some(bytes) = args.large_threshold {
            self.large_threshold = bytes;
        }
        if let Some(ms) = args.burst_window_ms {
            self.burst_window_ms = ms;
        }
    }

    /// Resolve the cache directory.
    pub fn cache_dir(&self) -> Result<CacheDir> {
        match self.cache_dir {
            Some(ref dir) => Ok(CacheDir::new(dir)),
            None => CacheDir::platform_default(),
        }
    }

    /// Pipeline settings, without shutdown flag or progress callback.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::default()
            .with_io_threads(self.io_threads)
            .with_thumbnail_size(self.thumbnail_size)
    }

    /// Classifier settings for the local calendar.
    #[must_use]
    pub fn classifier_config(&self) -> ClassifierConfig {
        let window = i64::try_from(self.burst_window_ms).unwrap_or(i64::MAX);
        ClassifierConfig::default()
            .with_large_threshold(self.large_threshold as f64)
            .with_burst_window(Duration::milliseconds(window))
    }
}
