//! High-level inventory collection API

use std::sync::Arc;
use std::time::Duration;

use hostinv_exec::ProbeRunner;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::aggregator::Aggregator;
use crate::config::EngineConfig;
use crate::enricher::Enricher;
use crate::error::InventoryError;
use crate::platform::{Domain, Platform};
use crate::registry::Registry;
use crate::result::InventoryResult;
use crate::summary::{Summary, SummaryBuilder};

/// Merged result of one domain plus its summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub result: InventoryResult,
    pub summary: Summary,
}

/// Inventory collector
///
/// Ties a registry to a runner: looks up the plan for a domain, aggregates
/// it, runs enrichment and summarises.
#[derive(Debug, Clone)]
pub struct Collector {
    registry: Arc<Registry>,
    platform: Platform,
    aggregator: Aggregator,
    enrich: bool,
}

impl Collector {
    /// Create a collector with default engine settings
    pub fn new(registry: Arc<Registry>, runner: Arc<dyn ProbeRunner>, platform: Platform) -> Self {
        Self {
            registry,
            platform,
            aggregator: Aggregator::new(runner),
            enrich: true,
        }
    }

    /// Apply engine settings
    #[must_use]
    pub fn with_engine_config(mut self, config: &EngineConfig) -> Self {
        self.aggregator = self
            .aggregator
            .with_default_timeout(Duration::from_secs(config.default_timeout_secs.max(1)))
            .with_max_concurrency(config.max_concurrency);
        self.enrich = config.enrich;
        self
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Collect one domain
    ///
    /// # Errors
    /// Returns an error only when no plan exists for the platform and domain.
    /// Probe failures are reported as diagnostics on the result.
    #[instrument(skip(self), fields(platform = %self.platform))]
    pub async fn collect(&self, domain: Domain) -> Result<Report, InventoryError> {
        let plan = self.registry.plan(self.platform, domain)?;
        info!(probes = plan.chain.probes().len(), "collecting");

        let mut result = self.aggregator.aggregate(&plan.chain).await;

        if self.enrich
            && let Some(enrichment) = &plan.enrichment
        {
            result = Enricher::new(self.aggregator.clone())
                .enrich(result, enrichment)
                .await;
        }

        let summary = SummaryBuilder::new(plan.categorizer.clone()).summarize(&result);
        info!(total = summary.total, "collection completed");

        Ok(Report { result, summary })
    }

    /// Collect several domains in order
    ///
    /// # Errors
    /// Fails if any domain has no plan; checked before anything runs.
    #[instrument(skip(self))]
    pub async fn collect_all(&self, domains: &[Domain]) -> Result<Vec<Report>, InventoryError> {
        for domain in domains {
            self.registry.plan(self.platform, *domain)?;
        }

        let mut reports = Vec::with_capacity(domains.len());
        for domain in domains {
            let report = self.collect(*domain).await?;
            if report.result.all_failed() {
                warn!(domain = %domain, "no probe succeeded");
            }
            reports.push(report);
        }
        Ok(reports)
    }
}
