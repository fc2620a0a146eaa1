//! Aggregated results and per-probe diagnostics

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use hostinv_exec::ProbeOutcome;
use serde::{Deserialize, Serialize};

use crate::platform::{Domain, Platform};
use crate::record::InventoryRecord;

/// Classification of a single probe attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    ToolAbsent,
    TimedOut,
    NonZeroExit,
    LaunchFailed,
    /// The tool ran but its output could not be understood
    ParseFailure,
    /// Not run because an alternative already produced records
    Skipped,
}

impl OutcomeKind {
    /// Whether the attempt counts against the run
    #[must_use]
    pub fn is_failure(self) -> bool {
        !matches!(self, OutcomeKind::Success | OutcomeKind::Skipped)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::ToolAbsent => "tool_absent",
            OutcomeKind::TimedOut => "timed_out",
            OutcomeKind::NonZeroExit => "non_zero_exit",
            OutcomeKind::LaunchFailed => "launch_failed",
            OutcomeKind::ParseFailure => "parse_failure",
            OutcomeKind::Skipped => "skipped",
        }
    }
}

impl From<&ProbeOutcome> for OutcomeKind {
    fn from(outcome: &ProbeOutcome) -> Self {
        match outcome {
            ProbeOutcome::Success(_) => OutcomeKind::Success,
            ProbeOutcome::ToolAbsent => OutcomeKind::ToolAbsent,
            ProbeOutcome::TimedOut { .. } => OutcomeKind::TimedOut,
            ProbeOutcome::NonZeroExit { .. } => OutcomeKind::NonZeroExit,
            ProbeOutcome::LaunchFailed { .. } => OutcomeKind::LaunchFailed,
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one probe during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeDiagnostic {
    pub probe_name: String,
    pub platform: Platform,
    pub outcome_kind: OutcomeKind,
    /// Human-readable explanation
    pub detail: String,
    /// Records the probe contributed before merging
    pub records: usize,
    /// Parser warnings, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

impl ProbeDiagnostic {
    pub fn new(
        probe_name: impl Into<String>,
        platform: Platform,
        outcome_kind: OutcomeKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            probe_name: probe_name.into(),
            platform,
            outcome_kind,
            detail: detail.into(),
            records: 0,
            warnings: Vec::new(),
            duration_ms: 0,
        }
    }
}

/// How a record was folded into the result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeEffect {
    /// First record for this identity
    Inserted,
    /// Identity already present; this many unset fields were filled
    Backfilled(usize),
}

/// Records for one domain plus a diagnostic for every probe attempted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryResult {
    pub domain: Domain,
    pub platform: Platform,
    pub collected_at: DateTime<Utc>,
    records: BTreeMap<String, InventoryRecord>,
    diagnostics: Vec<ProbeDiagnostic>,
}

impl InventoryResult {
    #[must_use]
    pub fn new(domain: Domain, platform: Platform) -> Self {
        Self {
            domain,
            platform,
            collected_at: Utc::now(),
            records: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Merge a record by identity
    ///
    /// The first record for an identity wins. Later records only fill fields
    /// the existing one lacks or holds as unset.
    pub fn merge_record(&mut self, record: InventoryRecord) -> MergeEffect {
        match self.records.get_mut(record.identity()) {
            Some(existing) => {
                let identity = record.identity().to_string();
                let source = record.source().to_string();
                let absorbed = existing.absorb(record);
                if absorbed.conflicts > 0 {
                    tracing::debug!(
                        identity = %identity,
                        kept = existing.source(),
                        dropped = %source,
                        conflicts = absorbed.conflicts,
                        "conflicting values, keeping first source"
                    );
                }
                MergeEffect::Backfilled(absorbed.backfilled)
            }
            None => {
                self.records.insert(record.identity().to_string(), record);
                MergeEffect::Inserted
            }
        }
    }

    /// Merge records in iteration order
    pub fn merge_all(&mut self, records: impl IntoIterator<Item = InventoryRecord>) {
        for record in records {
            self.merge_record(record);
        }
    }

    pub fn push_diagnostic(&mut self, diagnostic: ProbeDiagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Records ordered by identity
    pub fn records(&self) -> impl Iterator<Item = &InventoryRecord> {
        self.records.values()
    }

    #[must_use]
    pub fn get(&self, identity: &str) -> Option<&InventoryRecord> {
        self.records.get(identity)
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = &mut InventoryRecord> {
        self.records.values_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Diagnostics in probe declaration order
    #[must_use]
    pub fn diagnostics(&self) -> &[ProbeDiagnostic] {
        &self.diagnostics
    }

    /// Whether no probe succeeded (also true when nothing ran)
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self
            .diagnostics
            .iter()
            .any(|d| d.outcome_kind == OutcomeKind::Success)
    }

    /// Diagnostics whose probe failed
    pub fn failures(&self) -> impl Iterator<Item = &ProbeDiagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.outcome_kind.is_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(kind: OutcomeKind) -> ProbeDiagnostic {
        ProbeDiagnostic::new("p", Platform::Linux, kind, "")
    }

    #[test]
    fn test_first_writer_wins() {
        let mut result = InventoryResult::new(Domain::Software, Platform::Linux);
        let first = result.merge_record(
            InventoryRecord::new("curl", "dpkg").with_field("version", "7.81.0"),
        );
        let second = result.merge_record(
            InventoryRecord::new("curl", "snap")
                .with_field("version", "8.1.0")
                .with_field("publisher", "canonical"),
        );

        assert_eq!(first, MergeEffect::Inserted);
        assert_eq!(second, MergeEffect::Backfilled(1));
        let curl = result.get("curl").expect("merged record");
        assert_eq!(curl.field("version"), Some("7.81.0"));
        assert_eq!(curl.field("publisher"), Some("canonical"));
        assert_eq!(curl.source(), "dpkg");
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_all_failed() {
        let mut result = InventoryResult::new(Domain::Ports, Platform::Linux);
        assert!(result.all_failed());

        result.push_diagnostic(diag(OutcomeKind::ToolAbsent));
        result.push_diagnostic(diag(OutcomeKind::Skipped));
        assert!(result.all_failed());

        result.push_diagnostic(diag(OutcomeKind::Success));
        assert!(!result.all_failed());
        assert_eq!(result.failures().count(), 1);
    }

    #[test]
    fn test_outcome_kind_from_probe_outcome() {
        let outcome = ProbeOutcome::NonZeroExit {
            code: 2,
            stderr: String::new(),
        };
        assert_eq!(OutcomeKind::from(&outcome), OutcomeKind::NonZeroExit);
        assert!(OutcomeKind::ParseFailure.is_failure());
        assert!(!OutcomeKind::Skipped.is_failure());
    }
}
