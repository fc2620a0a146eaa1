//! `--progress` output

use std::time::Duration;

use hostinv_exec::{ProbeObserver, ProbeOutcome};

/// Prints one line per finished probe to stderr
#[derive(Debug, Default)]
pub struct StderrProgress;

impl ProbeObserver for StderrProgress {
    fn probe_finished(&self, name: &str, outcome: &ProbeOutcome, elapsed: Duration) {
        eprintln!("  {name:<24} {:<14} {:>6.2}s", outcome.label(), elapsed.as_secs_f64());
    }
}
