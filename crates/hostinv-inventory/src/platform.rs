//! Host platforms and inventory domains

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InventoryError;

/// Operating system family a probe targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    #[serde(rename = "macos")]
    MacOs,
    Windows,
}

impl Platform {
    /// Platform of the running host, if it is one we have probes for
    #[must_use]
    pub fn current() -> Option<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value
    #[must_use]
    pub fn from_os(os: &str) -> Option<Self> {
        match os {
            "linux" => Some(Platform::Linux),
            "macos" => Some(Platform::MacOs),
            "windows" => Some(Platform::Windows),
            _ => None,
        }
    }

    /// Platform of the running host
    ///
    /// # Errors
    /// Returns `InventoryError::UnsupportedPlatform` on anything else.
    pub fn detect() -> Result<Self, InventoryError> {
        Self::current().ok_or_else(|| InventoryError::UnsupportedPlatform {
            platform: std::env::consts::OS.to_string(),
        })
    }

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of host facts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Installed software and packages
    Software,
    /// Listening and connected network ports
    Ports,
    /// BIOS, board and device firmware
    Firmware,
    /// Operating system, kernel and host identity
    System,
}

impl Domain {
    /// All domains, in reporting order
    pub const ALL: [Domain; 4] = [
        Domain::System,
        Domain::Software,
        Domain::Ports,
        Domain::Firmware,
    ];

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Software => "software",
            Domain::Ports => "ports",
            Domain::Firmware => "firmware",
            Domain::System => "system",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = InventoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "software" | "packages" => Ok(Domain::Software),
            "ports" | "network" => Ok(Domain::Ports),
            "firmware" => Ok(Domain::Firmware),
            "system" | "os" => Ok(Domain::System),
            other => Err(InventoryError::Config(format!("unknown domain `{other}`"))),
        }
    }
}
