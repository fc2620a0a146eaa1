//! Local probe execution using `tokio::process`

use std::io;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::invocation::Invocation;
use crate::observer::ProbeObserver;
use crate::result::{CommandResult, ProbeOutcome, RawOutput};
use crate::traits::ProbeRunner;

/// Maximum stderr kept on a failed probe
const STDERR_LIMIT: usize = 2048;

/// Local probe runner
///
/// Spawns the program directly (no shell) with stdin closed. Children are
/// created with `kill_on_drop`, so a timeout or a cancelled caller tears the
/// process down instead of leaving it running.
#[derive(Clone, Default)]
pub struct LocalRunner {
    observer: Option<Arc<dyn ProbeObserver>>,
}

impl std::fmt::Debug for LocalRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalRunner")
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl LocalRunner {
    /// Create a new local runner
    #[must_use]
    pub fn new() -> Self {
        Self { observer: None }
    }

    /// Report probe progress to `observer`
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProbeObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Spawn and wait for the child
    async fn execute(&self, invocation: &Invocation) -> io::Result<CommandResult> {
        let start = Instant::now();

        let child = Command::new(invocation.program())
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = child.wait_with_output().await?;

        Ok(CommandResult {
            status: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration: start.elapsed(),
        })
    }
}

/// Map a finished command onto an outcome
fn classify(invocation: &Invocation, result: CommandResult) -> ProbeOutcome {
    if invocation.accepts(result.status) {
        ProbeOutcome::Success(RawOutput::new(result.stdout))
    } else {
        let mut stderr = result.stderr.trim().to_string();
        if stderr.len() > STDERR_LIMIT {
            let mut cut = STDERR_LIMIT;
            while !stderr.is_char_boundary(cut) {
                cut -= 1;
            }
            stderr.truncate(cut);
        }
        ProbeOutcome::NonZeroExit {
            code: result.status,
            stderr,
        }
    }
}

#[async_trait]
impl ProbeRunner for LocalRunner {
    #[instrument(skip(self, invocation), fields(command = %invocation), level = "debug")]
    async fn run(&self, name: &str, invocation: &Invocation, timeout_duration: Duration) -> ProbeOutcome {
        if let Err(e) = invocation.validate() {
            warn!(probe = name, error = %e, "refusing invalid invocation");
            return ProbeOutcome::LaunchFailed {
                reason: e.to_string(),
            };
        }

        if let Some(observer) = &self.observer {
            observer.probe_started(name, invocation);
        }

        let start = Instant::now();
        debug!(probe = name, timeout = ?timeout_duration, "executing probe");

        let outcome = match timeout(timeout_duration, self.execute(invocation)).await {
            Ok(Ok(result)) => {
                debug!(
                    probe = name,
                    status = result.status,
                    bytes = result.stdout.len(),
                    duration = ?result.duration,
                    "probe completed"
                );
                classify(invocation, result)
            }
            Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => {
                debug!(probe = name, "tool not installed");
                ProbeOutcome::ToolAbsent
            }
            Ok(Err(e)) => {
                warn!(probe = name, error = %e, "failed to launch probe");
                ProbeOutcome::LaunchFailed {
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                warn!(
                    probe = name,
                    timeout = ?timeout_duration,
                    elapsed = ?start.elapsed(),
                    "probe timed out"
                );
                ProbeOutcome::TimedOut {
                    timeout: timeout_duration,
                }
            }
        };

        if let Some(observer) = &self.observer {
            observer.probe_finished(name, &outcome, start.elapsed());
        }

        outcome
    }

    fn runner_type(&self) -> &'static str {
        "local"
    }
}
