//! Lookup of probe plans by platform and domain

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::ProbeOverride;
use crate::enricher::EnrichmentSpec;
use crate::error::InventoryError;
use crate::platform::{Domain, Platform};
use crate::spec::ProbeChain;
use crate::summary::Categorizer;

/// Everything needed to inventory one domain on one platform
#[derive(Debug, Clone)]
pub struct DomainPlan {
    pub chain: ProbeChain,
    pub enrichment: Option<EnrichmentSpec>,
    pub categorizer: Categorizer,
}

impl DomainPlan {
    /// Plan summarised by each probe's declared category
    #[must_use]
    pub fn new(chain: ProbeChain) -> Self {
        let categorizer = Categorizer::from_chain(&chain);
        Self {
            chain,
            enrichment: None,
            categorizer,
        }
    }

    #[must_use]
    pub fn with_enrichment(mut self, enrichment: EnrichmentSpec) -> Self {
        self.enrichment = Some(enrichment);
        self
    }

    #[must_use]
    pub fn with_categorizer(mut self, categorizer: Categorizer) -> Self {
        self.categorizer = categorizer;
        self
    }
}

/// Static table of probe plans, read-only once built
#[derive(Debug, Clone, Default)]
pub struct Registry {
    plans: HashMap<(Platform, Domain), DomainPlan>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the plan for the chain's platform and domain
    pub fn register(&mut self, plan: DomainPlan) {
        let key = (plan.chain.platform(), plan.chain.domain());
        self.plans.insert(key, plan);
    }

    /// Whether any plan exists for `platform`
    #[must_use]
    pub fn supports(&self, platform: Platform) -> bool {
        self.plans.keys().any(|(p, _)| *p == platform)
    }

    /// Plan for a platform and domain
    ///
    /// # Errors
    /// `UnsupportedPlatform` if nothing is registered for the platform,
    /// `UnsupportedDomain` if only the domain is missing.
    pub fn plan(&self, platform: Platform, domain: Domain) -> Result<&DomainPlan, InventoryError> {
        if !self.supports(platform) {
            return Err(InventoryError::UnsupportedPlatform {
                platform: platform.to_string(),
            });
        }
        self.plans
            .get(&(platform, domain))
            .ok_or_else(|| InventoryError::UnsupportedDomain {
                platform: platform.to_string(),
                domain: domain.to_string(),
            })
    }

    /// Whether a probe with this name exists anywhere
    #[must_use]
    pub fn contains_probe(&self, name: &str) -> bool {
        self.plans.values().any(|plan| {
            plan.chain.probe(name).is_some()
                || plan.enrichment.as_ref().is_some_and(|e| e.name == name)
        })
    }

    /// Apply per-probe overrides
    ///
    /// Disabled probes are removed from their chains; a timeout override
    /// replaces the probe's own. Categories are kept as declared.
    ///
    /// # Errors
    /// `UnknownProbe` if an override names a probe that does not exist, or
    /// `Config` for a zero timeout.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, ProbeOverride>) -> Result<(), InventoryError> {
        for (name, probe) in overrides {
            if !self.contains_probe(name) {
                return Err(InventoryError::UnknownProbe(name.clone()));
            }
            if probe.timeout_secs == Some(0) {
                return Err(InventoryError::Config(format!(
                    "probe `{name}`: timeout_secs must be greater than zero"
                )));
            }
        }

        for plan in self.plans.values_mut() {
            plan.chain.probes_mut().retain(|p| {
                let keep = overrides.get(p.name).is_none_or(|o| o.enabled);
                if !keep {
                    info!(probe = p.name, "probe disabled by configuration");
                }
                keep
            });
            for probe in plan.chain.probes_mut() {
                if let Some(secs) = overrides.get(probe.name).and_then(|o| o.timeout_secs) {
                    debug!(probe = probe.name, secs, "timeout override");
                    probe.timeout = Some(Duration::from_secs(secs));
                }
            }

            let enrichment_override = plan
                .enrichment
                .as_ref()
                .and_then(|e| overrides.get(e.name));
            if let Some(o) = enrichment_override {
                if !o.enabled {
                    info!("enrichment disabled by configuration");
                    plan.enrichment = None;
                } else if let (Some(secs), Some(enrichment)) = (o.timeout_secs, plan.enrichment.as_mut()) {
                    enrichment.timeout = Some(Duration::from_secs(secs));
                }
            }
        }

        Ok(())
    }
}
