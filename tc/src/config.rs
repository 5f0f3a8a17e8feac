//! Tilecast configuration types and loading

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{RegistryError, WorkerRegistry, WorkerSpec};
use crate::scheduler::SchedulerConfig;

/// Main tilecast configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Worker endpoints, in dispatch order
    pub workers: Vec<WorkerSpec>,

    /// Render defaults
    pub render: RenderConfig,

    /// Dispatch tuning
    pub scheduler: SchedulerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            workers: vec![WorkerSpec::new("localhost", "http://127.0.0.1:8000")],
            render: RenderConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.workers.is_empty() {
            return Err(eyre!("No workers configured. Add at least one entry under `workers`."));
        }
        if self.render.block_size == 0 {
            return Err(eyre!("render.block-size must be greater than zero"));
        }
        Ok(())
    }

    /// Build the worker registry, checking every endpoint
    pub fn registry(&self) -> Result<WorkerRegistry, RegistryError> {
        WorkerRegistry::new(self.workers.clone())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .tilecast.yml
        let local_config = PathBuf::from(".tilecast.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/tilecast/tilecast.yml
        if let Some(user_config) = Self::user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level, before logging is set up
    ///
    /// Errors are swallowed; the full load reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => std::iter::once(PathBuf::from(".tilecast.yml"))
                .chain(Self::user_config_path())
                .collect(),
        };
        candidates
            .iter()
            .find(|p| p.exists())
            .and_then(|p| Self::load_from_file(p).ok())
            .and_then(|c| c.log_level)
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tilecast").join("tilecast.yml"))
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Render defaults, overridable from the command line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Width and height of the square canvas in pixels
    pub size: u32,

    /// Rows per tile when the canvas is larger than one block per worker
    #[serde(rename = "block-size")]
    pub block_size: u32,

    /// Escape-time iteration limit
    #[serde(rename = "max-iter")]
    pub max_iter: u32,

    /// Output PNG path
    pub output: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            size: 1000,
            block_size: 500,
            max_iter: 100,
            output: PathBuf::from("fractal.png"),
        }
    }
}
