//! Error types for hostinv-inventory

use thiserror::Error;

/// Fatal conditions of the engine
///
/// Probe failures are never reported here; they end up as diagnostics on the
/// `InventoryResult`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// No probe chains are registered for this operating system
    #[error("unsupported platform: {platform}")]
    UnsupportedPlatform {
        /// Platform identifier as reported by the host
        platform: String,
    },

    /// The platform is known but has no chain for the domain
    #[error("no {domain} probes registered for {platform}")]
    UnsupportedDomain {
        /// Platform name
        platform: String,
        /// Domain name
        domain: String,
    },

    /// Configuration names a probe that does not exist
    #[error("unknown probe in configuration: {0}")]
    UnknownProbe(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}
