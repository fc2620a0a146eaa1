//! hostinv-inventory: probe aggregation engine
//!
//! Runs ordered chains of OS-native probes, folds every outcome into a
//! diagnostic, merges parsed records by identity and summarises the result.
//! Tool grammars and the built-in chains live in `hostinv-probes`; this crate
//! only knows the shapes they plug into.

pub mod aggregator;
pub mod collector;
pub mod config;
pub mod enricher;
pub mod error;
pub mod platform;
pub mod record;
pub mod registry;
pub mod result;
pub mod spec;
pub mod summary;

pub use aggregator::Aggregator;
pub use collector::{Collector, Report};
pub use config::{EngineConfig, ProbeOverride};
pub use enricher::{EnrichmentSpec, Enricher, LookupMode};
pub use error::InventoryError;
pub use platform::{Domain, Platform};
pub use record::{InventoryRecord, UNKNOWN, is_unset};
pub use registry::{DomainPlan, Registry};
pub use result::{InventoryResult, MergeEffect, OutcomeKind, ProbeDiagnostic};
pub use spec::{ChainPolicy, ParseFailure, ParseOutput, Parser, ProbeChain, ProbeSpec};
pub use summary::{Categorizer, Summary, SummaryBuilder};
