//! Error types for hostinv-exec

use thiserror::Error;

/// Reasons an invocation is refused before anything is spawned
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    /// No program name was given
    #[error("invocation has an empty program name")]
    EmptyProgram,

    /// An argument cannot be passed to a child process verbatim
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
