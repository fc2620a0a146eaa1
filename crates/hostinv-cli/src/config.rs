//! Configuration loading and types

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use eyre::WrapErr;
use hostinv_inventory::{EngineConfig, ProbeOverride};
use serde::{Deserialize, Serialize};

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "HOSTINV_CONFIG";

/// Top-level configuration for hostinv
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Engine tunables
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Per-probe overrides keyed by probe name
    #[serde(default)]
    pub probes: HashMap<String, ProbeOverride>,
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of text
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .wrap_err_with(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Load the first existing file in `candidates`
    ///
    /// Returns the defaults and `None` when none exists.
    ///
    /// # Errors
    /// Returns error if the file found cannot be read or parsed
    pub fn load_first(candidates: &[PathBuf]) -> eyre::Result<(Self, Option<PathBuf>)> {
        for path in candidates {
            if path.is_file() {
                return Ok((Self::load(path)?, Some(path.clone())));
            }
        }
        Ok((Config::default(), None))
    }

    /// Resolve the config file: explicit path, `HOSTINV_CONFIG`,
    /// `./hostinv.toml`, then the user config directory
    ///
    /// # Errors
    /// An explicitly named file (flag or environment) must exist and parse.
    pub fn resolve(explicit: Option<&Path>) -> eyre::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            return Ok((Self::load(&path)?, Some(path)));
        }

        let mut candidates = vec![PathBuf::from("hostinv.toml")];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("hostinv").join("hostinv.toml"));
        }
        Self::load_first(&candidates)
    }
}
