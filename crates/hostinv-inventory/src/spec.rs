//! Probe descriptions and chains

use std::time::Duration;

use hostinv_exec::Invocation;
use thiserror::Error;

use crate::platform::{Domain, Platform};
use crate::record::InventoryRecord;

/// Records and non-fatal complaints produced by a parser
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutput {
    pub records: Vec<InventoryRecord>,
    /// Lines or entries that were skipped, with the reason
    pub warnings: Vec<String>,
}

impl ParseOutput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: InventoryRecord) {
        self.records.push(record);
    }

    /// Note a skipped line or entry
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Whether parsing produced nothing but warnings
    #[must_use]
    pub fn is_unusable(&self) -> bool {
        self.records.is_empty() && !self.warnings.is_empty()
    }
}

/// The output was not in the shape the parser expects
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ParseFailure(pub String);

impl ParseFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Pure function from decoded tool output to records
pub type Parser = fn(&str) -> Result<ParseOutput, ParseFailure>;

/// One way of asking the OS for facts
#[derive(Debug, Clone)]
pub struct ProbeSpec {
    /// Unique name, also the default record source
    pub name: &'static str,
    pub platform: Platform,
    pub invocation: Invocation,
    /// Overrides the aggregator default when set
    pub timeout: Option<Duration>,
    pub parser: Parser,
    /// Summary bucket for records from this probe
    pub category: &'static str,
    /// Probes sharing a group are alternatives: the first one that yields
    /// records wins and the rest are skipped
    pub alternative_group: Option<&'static str>,
}

impl ProbeSpec {
    /// Create a probe whose category is its own name
    pub fn new(name: &'static str, platform: Platform, invocation: Invocation, parser: Parser) -> Self {
        Self {
            name,
            platform,
            invocation,
            timeout: None,
            parser,
            category: name,
            alternative_group: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: &'static str) -> Self {
        self.category = category;
        self
    }

    #[must_use]
    pub fn in_group(mut self, group: &'static str) -> Self {
        self.alternative_group = Some(group);
        self
    }

    /// Run the parser over decoded output
    ///
    /// # Errors
    /// Whatever the parser rejects.
    pub fn parse(&self, raw: &str) -> Result<ParseOutput, ParseFailure> {
        (self.parser)(raw)
    }
}

/// How a chain treats its probes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainPolicy {
    /// Every probe runs and results are merged
    #[default]
    RunAll,
    /// Probes are tried in order until one yields at least one record
    FirstSuccess,
}

/// Ordered probes for one domain on one platform
#[derive(Debug, Clone)]
pub struct ProbeChain {
    domain: Domain,
    platform: Platform,
    policy: ChainPolicy,
    probes: Vec<ProbeSpec>,
}

impl ProbeChain {
    pub fn new(domain: Domain, platform: Platform, policy: ChainPolicy) -> Self {
        Self {
            domain,
            platform,
            policy,
            probes: Vec::new(),
        }
    }

    /// Append a probe; declaration order is merge priority
    #[must_use]
    pub fn with_probe(mut self, probe: ProbeSpec) -> Self {
        self.probes.push(probe);
        self
    }

    #[must_use]
    pub fn domain(&self) -> Domain {
        self.domain
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    #[must_use]
    pub fn policy(&self) -> ChainPolicy {
        self.policy
    }

    #[must_use]
    pub fn probes(&self) -> &[ProbeSpec] {
        &self.probes
    }

    pub(crate) fn probes_mut(&mut self) -> &mut Vec<ProbeSpec> {
        &mut self.probes
    }

    /// Find a probe by name
    #[must_use]
    pub fn probe(&self, name: &str) -> Option<&ProbeSpec> {
        self.probes.iter().find(|p| p.name == name)
    }

    /// Split the chain into units that may run concurrently
    ///
    /// Each unit lists probe indexes that must run one after another with
    /// first-success semantics. Units appear in the order of their first
    /// member. This only shapes execution: reports are merged by declared
    /// probe index, so a group declared around an ungrouped probe still
    /// merges in chain order.
    #[must_use]
    pub fn units(&self) -> Vec<Vec<usize>> {
        if self.policy == ChainPolicy::FirstSuccess {
            return vec![(0..self.probes.len()).collect()];
        }

        let mut units: Vec<Vec<usize>> = Vec::new();
        let mut groups: Vec<(&'static str, usize)> = Vec::new();
        for (index, probe) in self.probes.iter().enumerate() {
            match probe.alternative_group {
                Some(group) => {
                    if let Some((_, unit)) = groups.iter().find(|(g, _)| *g == group) {
                        units[*unit].push(index);
                    } else {
                        groups.push((group, units.len()));
                        units.push(vec![index]);
                    }
                }
                None => units.push(vec![index]),
            }
        }
        units
    }
}
