//! Engine tunables and per-probe overrides

use serde::{Deserialize, Serialize};

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_concurrency() -> usize {
    1
}

fn default_true() -> bool {
    true
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Timeout for probes without their own, in seconds
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    /// Independent probes allowed in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Run enrichment lookups (process names for ports)
    #[serde(default = "default_true")]
    pub enrich: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            max_concurrency: default_max_concurrency(),
            enrich: true,
        }
    }
}

/// Override for a single named probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOverride {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ProbeOverride {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: None,
        }
    }
}
