//! Probe runner trait

use std::time::Duration;

use async_trait::async_trait;

use crate::invocation::Invocation;
use crate::result::ProbeOutcome;

/// Executes one probe invocation
///
/// Implementations spawn at most one child per call, never retry, and always
/// return within `timeout` (plus scheduling slack). Every failure mode is a
/// [`ProbeOutcome`] variant.
#[async_trait]
pub trait ProbeRunner: Send + Sync {
    /// Run `invocation`, labelled `name` for logs and observers
    async fn run(&self, name: &str, invocation: &Invocation, timeout: Duration) -> ProbeOutcome;

    /// Runner type identifier
    fn runner_type(&self) -> &'static str;
}
