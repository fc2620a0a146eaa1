//! Secondary lookups that fill a field on already-merged records

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use hostinv_exec::Invocation;
use tracing::{debug, instrument};

use crate::aggregator::Aggregator;
use crate::platform::Platform;
use crate::record::UNKNOWN;
use crate::result::{InventoryResult, OutcomeKind, ProbeDiagnostic};
use crate::spec::{Parser, ProbeSpec};

/// How the lookup tool is asked
#[derive(Debug, Clone)]
pub enum LookupMode {
    /// One invocation per distinct key; the key is appended as
    /// `arg_prefix` followed by the number. The parser's first record
    /// carries the answer.
    PerKey {
        invocation: Invocation,
        arg_prefix: &'static str,
    },
    /// One invocation listing everything; parsed records are keyed by
    /// identity.
    Bulk { invocation: Invocation },
}

/// Describes how to resolve `target_field` from `key_field`
#[derive(Debug, Clone)]
pub struct EnrichmentSpec {
    pub name: &'static str,
    /// Field on the primary records holding the lookup key (a PID)
    pub key_field: &'static str,
    /// Field to fill, both on the primary record and in lookup records
    pub target_field: &'static str,
    pub mode: LookupMode,
    pub parser: Parser,
    pub timeout: Option<Duration>,
}

impl EnrichmentSpec {
    fn probe_for(&self, invocation: Invocation, platform: Platform) -> ProbeSpec {
        let mut probe = ProbeSpec::new(self.name, platform, invocation, self.parser);
        probe.timeout = self.timeout;
        probe
    }
}

/// Runs an enrichment lookup against a result
#[derive(Debug, Clone)]
pub struct Enricher {
    aggregator: Aggregator,
}

impl Enricher {
    /// Share the runner, timeout and concurrency of `aggregator`
    #[must_use]
    pub fn new(aggregator: Aggregator) -> Self {
        Self { aggregator }
    }

    /// Fill `target_field` on every record that lacks it
    ///
    /// Records whose key is missing, non-numeric or unresolvable end up with
    /// the target set to `Unknown`. Lookups never remove or overwrite data,
    /// and each lookup attempt adds a diagnostic.
    #[instrument(skip_all, fields(enrichment = spec.name, domain = %primary.domain))]
    pub async fn enrich(&self, mut primary: InventoryResult, spec: &EnrichmentSpec) -> InventoryResult {
        let pending: Vec<String> = primary
            .records()
            .filter(|r| !r.has_value(spec.target_field) && r.has_value(spec.key_field))
            .map(|r| r.field_or_unknown(spec.key_field).to_string())
            .collect();

        let resolved = if pending.is_empty() {
            HashMap::new()
        } else {
            match &spec.mode {
                LookupMode::Bulk { invocation } => self.bulk(&mut primary, spec, invocation).await,
                LookupMode::PerKey {
                    invocation,
                    arg_prefix,
                } => {
                    self.per_key(&mut primary, spec, invocation, arg_prefix, pending)
                        .await
                }
            }
        };

        let mut filled = 0usize;
        for record in primary.records_mut() {
            if record.has_value(spec.target_field) {
                continue;
            }
            let value = record
                .field(spec.key_field)
                .and_then(|key| resolved.get(key.trim()))
                .map_or(UNKNOWN, String::as_str);
            if record.backfill_field(spec.target_field, value) && value != UNKNOWN {
                filled += 1;
            }
        }
        debug!(filled, "enrichment applied");

        primary
    }

    async fn bulk(
        &self,
        primary: &mut InventoryResult,
        spec: &EnrichmentSpec,
        invocation: &Invocation,
    ) -> HashMap<String, String> {
        let probe = spec.probe_for(invocation.clone(), primary.platform);
        let report = self.aggregator.run_probe(&probe).await;
        primary.push_diagnostic(report.diagnostic);

        report
            .records
            .into_iter()
            .filter(|r| r.has_value(spec.target_field))
            .map(|r| {
                let value = r.field_or_unknown(spec.target_field).to_string();
                (r.identity().trim().to_string(), value)
            })
            .collect()
    }

    async fn per_key(
        &self,
        primary: &mut InventoryResult,
        spec: &EnrichmentSpec,
        invocation: &Invocation,
        arg_prefix: &str,
        pending: Vec<String>,
    ) -> HashMap<String, String> {
        let mut keys: BTreeMap<u64, String> = BTreeMap::new();
        for raw in pending {
            match raw.trim().parse::<u64>() {
                Ok(key) => {
                    keys.insert(key, raw.trim().to_string());
                }
                Err(_) => {
                    debug!(key = %raw, "non-numeric lookup key ignored");
                    primary.push_diagnostic(ProbeDiagnostic::new(
                        format!("{}[{raw}]", spec.name),
                        primary.platform,
                        OutcomeKind::Skipped,
                        "lookup key is not numeric",
                    ));
                }
            }
        }

        let platform = primary.platform;
        let lookups: Vec<(String, Option<String>, ProbeDiagnostic)> = stream::iter(keys)
            .map(|(key, text)| {
                let invocation = invocation.clone().with_formatted_numeric_arg(arg_prefix, key);
                let probe = spec.probe_for(invocation, platform);
                async move {
                    let report = self.aggregator.run_probe(&probe).await;
                    let value = report
                        .records
                        .first()
                        .filter(|r| r.has_value(spec.target_field))
                        .map(|r| r.field_or_unknown(spec.target_field).to_string());
                    let mut diagnostic = report.diagnostic;
                    diagnostic.probe_name = format!("{}[{text}]", spec.name);
                    (text, value, diagnostic)
                }
            })
            .buffered(self.aggregator.max_concurrency())
            .collect()
            .await;

        let mut resolved = HashMap::new();
        for (key, value, diagnostic) in lookups {
            primary.push_diagnostic(diagnostic);
            if let Some(value) = value {
                resolved.insert(key, value);
            }
        }
        resolved
    }
}
