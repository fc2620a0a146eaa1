//! Progress callbacks

use std::time::Duration;

use crate::invocation::Invocation;
use crate::result::ProbeOutcome;

/// Receives probe lifecycle events from a runner
///
/// Both methods default to doing nothing. Observers must not block; they are
/// called inline on the task driving the probe.
pub trait ProbeObserver: Send + Sync {
    /// A probe is about to be spawned
    fn probe_started(&self, _name: &str, _invocation: &Invocation) {}

    /// A probe finished, successfully or not
    fn probe_finished(&self, _name: &str, _outcome: &ProbeOutcome, _elapsed: Duration) {}
}
