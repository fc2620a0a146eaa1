//! Result types for probe execution

use std::borrow::Cow;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Raw result of a finished child process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit status code (-1 when terminated by a signal)
    pub status: i32,
    /// stdout bytes, undecoded
    pub stdout: Vec<u8>,
    /// stderr output
    pub stderr: String,
    /// Time taken to execute
    pub duration: Duration,
}

/// Captured stdout of a successful probe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawOutput {
    bytes: Vec<u8>,
}

impl RawOutput {
    /// Wrap captured bytes
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Captured bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Decode as UTF-8
    ///
    /// Invalid sequences are replaced; the flag is `true` when that happened.
    #[must_use]
    pub fn decode(&self) -> (Cow<'_, str>, bool) {
        match std::str::from_utf8(&self.bytes) {
            Ok(text) => (Cow::Borrowed(text), false),
            Err(_) => (String::from_utf8_lossy(&self.bytes), true),
        }
    }

    /// Number of captured bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing was captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<&str> for RawOutput {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes())
    }
}

/// What happened when a probe was run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// The tool ran and exited with an accepted status
    Success(RawOutput),
    /// The executable is not installed (or not on `PATH`)
    ToolAbsent,
    /// The tool did not finish within its bound and was killed
    TimedOut {
        /// Bound that was exceeded
        timeout: Duration,
    },
    /// The tool ran but reported failure
    NonZeroExit {
        /// Exit code (-1 when killed by a signal)
        code: i32,
        /// Captured stderr, trimmed
        stderr: String,
    },
    /// The OS refused to start the tool for a reason other than absence
    LaunchFailed {
        /// OS error text
        reason: String,
    },
}

impl ProbeOutcome {
    /// Whether the probe produced output worth parsing
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success(_))
    }

    /// Short stable label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Success(_) => "success",
            ProbeOutcome::ToolAbsent => "tool_absent",
            ProbeOutcome::TimedOut { .. } => "timed_out",
            ProbeOutcome::NonZeroExit { .. } => "non_zero_exit",
            ProbeOutcome::LaunchFailed { .. } => "launch_failed",
        }
    }
}
