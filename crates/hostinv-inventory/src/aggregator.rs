//! Probe chain execution and merging

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use hostinv_exec::{ProbeOutcome, ProbeRunner};
use tracing::{debug, info, instrument, warn};

use crate::record::InventoryRecord;
use crate::result::{InventoryResult, OutcomeKind, ProbeDiagnostic};
use crate::spec::{ProbeChain, ProbeSpec};

/// Timeout applied to probes that do not set their own
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Diagnostic plus whatever records one probe attempt produced
#[derive(Debug)]
pub(crate) struct ProbeReport {
    pub diagnostic: ProbeDiagnostic,
    pub records: Vec<InventoryRecord>,
}

impl ProbeReport {
    fn skipped(probe: &ProbeSpec, winner: &str) -> Self {
        Self {
            diagnostic: ProbeDiagnostic::new(
                probe.name,
                probe.platform,
                OutcomeKind::Skipped,
                format!("not run, {winner} already produced records"),
            ),
            records: Vec::new(),
        }
    }
}

/// Runs probe chains and merges their records
///
/// A chain never fails as a whole. Every probe ends up as exactly one
/// diagnostic on the result, in declaration order, and records are merged in
/// that same order regardless of which probe finished first.
#[derive(Clone)]
pub struct Aggregator {
    runner: Arc<dyn ProbeRunner>,
    default_timeout: Duration,
    max_concurrency: usize,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("runner", &self.runner.runner_type())
            .field("default_timeout", &self.default_timeout)
            .field("max_concurrency", &self.max_concurrency)
            .finish()
    }
}

impl Aggregator {
    /// Create an aggregator that runs one probe at a time
    pub fn new(runner: Arc<dyn ProbeRunner>) -> Self {
        Self {
            runner,
            default_timeout: DEFAULT_PROBE_TIMEOUT,
            max_concurrency: 1,
        }
    }

    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Allow up to `limit` independent probes in flight (minimum 1)
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit.max(1);
        self
    }

    pub(crate) fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub(crate) fn timeout_for(&self, probe_timeout: Option<Duration>) -> Duration {
        probe_timeout.unwrap_or(self.default_timeout)
    }

    /// Run every probe of `chain` and merge the results
    #[instrument(skip_all, fields(domain = %chain.domain(), platform = %chain.platform()))]
    pub async fn aggregate(&self, chain: &ProbeChain) -> InventoryResult {
        let start = Instant::now();
        let mut result = InventoryResult::new(chain.domain(), chain.platform());

        let mut slots: Vec<Option<ProbeReport>> = chain.probes().iter().map(|_| None).collect();
        let finished: Vec<Vec<(usize, ProbeReport)>> = stream::iter(chain.units())
            .map(|unit| self.run_unit(chain, unit))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        for (index, report) in finished.into_iter().flatten() {
            slots[index] = Some(report);
        }

        for report in slots.into_iter().flatten() {
            result.push_diagnostic(report.diagnostic);
            result.merge_all(report.records);
        }

        let failed = result.failures().count();
        if result.all_failed() {
            warn!(probes = chain.probes().len(), "every probe failed");
        }
        info!(
            records = result.len(),
            failed,
            elapsed = ?start.elapsed(),
            "aggregation complete"
        );

        result
    }

    /// Run a unit's probes in order until one yields records
    async fn run_unit(&self, chain: &ProbeChain, unit: Vec<usize>) -> Vec<(usize, ProbeReport)> {
        let mut reports = Vec::with_capacity(unit.len());
        let mut winner: Option<&'static str> = None;

        for index in unit {
            let probe = &chain.probes()[index];
            let report = match winner {
                Some(name) => ProbeReport::skipped(probe, name),
                None => self.run_probe(probe).await,
            };
            if winner.is_none() && !report.records.is_empty() {
                winner = Some(probe.name);
            }
            reports.push((index, report));
        }

        reports
    }

    /// Run one probe and classify its outcome
    pub(crate) async fn run_probe(&self, probe: &ProbeSpec) -> ProbeReport {
        let timeout = self.timeout_for(probe.timeout);
        let start = Instant::now();
        let outcome = self.runner.run(probe.name, &probe.invocation, timeout).await;
        let mut report = evaluate(probe, &outcome);
        report.diagnostic.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        report
    }
}

/// Turn a raw outcome into a diagnostic and parsed records
pub(crate) fn evaluate(probe: &ProbeSpec, outcome: &ProbeOutcome) -> ProbeReport {
    let kind = OutcomeKind::from(outcome);
    let program = probe.invocation.program();

    let raw = match outcome {
        ProbeOutcome::Success(raw) => raw,
        ProbeOutcome::ToolAbsent => {
            debug!(probe = probe.name, "tool absent");
            return failed(probe, kind, format!("`{program}` is not installed"));
        }
        ProbeOutcome::TimedOut { timeout } => {
            return failed(probe, kind, format!("no result within {}s", timeout.as_secs_f32()));
        }
        ProbeOutcome::NonZeroExit { code, stderr } => {
            let first = stderr.lines().next().unwrap_or("").trim();
            let detail = if first.is_empty() {
                format!("exit code {code}")
            } else {
                format!("exit code {code}: {first}")
            };
            return failed(probe, kind, detail);
        }
        ProbeOutcome::LaunchFailed { reason } => {
            return failed(probe, kind, format!("could not start `{program}`: {reason}"));
        }
    };

    let (text, lossy) = raw.decode();
    let mut warnings = Vec::new();
    if lossy {
        warnings.push("output was not valid UTF-8; invalid bytes replaced".to_string());
    }

    match probe.parse(&text) {
        Ok(output) => {
            warnings.extend(output.warnings);
            if output.records.is_empty() && !warnings.is_empty() {
                warn!(probe = probe.name, warnings = warnings.len(), "output not understood");
                let mut report = failed(
                    probe,
                    OutcomeKind::ParseFailure,
                    format!("no records parsed, {} lines rejected", warnings.len()),
                );
                report.diagnostic.warnings = warnings;
                return report;
            }

            let records: Vec<InventoryRecord> = output
                .records
                .into_iter()
                .map(|r| r.with_source(probe.name))
                .collect();
            debug!(probe = probe.name, records = records.len(), "probe parsed");

            let mut diagnostic = ProbeDiagnostic::new(
                probe.name,
                probe.platform,
                OutcomeKind::Success,
                format!("{} records", records.len()),
            );
            diagnostic.records = records.len();
            diagnostic.warnings = warnings;
            ProbeReport { diagnostic, records }
        }
        Err(e) => {
            warn!(probe = probe.name, error = %e, "parse failure");
            let mut report = failed(probe, OutcomeKind::ParseFailure, e.to_string());
            report.diagnostic.warnings = warnings;
            report
        }
    }
}

fn failed(probe: &ProbeSpec, kind: OutcomeKind, detail: String) -> ProbeReport {
    ProbeReport {
        diagnostic: ProbeDiagnostic::new(probe.name, probe.platform, kind, detail),
        records: Vec::new(),
    }
}
