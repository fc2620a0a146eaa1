//! Per-category counts

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::record::InventoryRecord;
use crate::result::InventoryResult;
use crate::spec::ProbeChain;

/// Record totals for a result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
}

/// Decides which bucket a record is counted in
#[derive(Debug, Clone)]
pub enum Categorizer {
    /// Look the record source up in a table, falling back to the source itself
    BySource(HashMap<String, String>),
    /// Use the identity up to the first `sep` (the protocol of `TCP:22`)
    ByIdentityPrefix(char),
}

impl Default for Categorizer {
    fn default() -> Self {
        Categorizer::BySource(HashMap::new())
    }
}

impl Categorizer {
    /// Map each probe of `chain` to its declared category
    #[must_use]
    pub fn from_chain(chain: &ProbeChain) -> Self {
        Categorizer::BySource(
            chain
                .probes()
                .iter()
                .map(|p| (p.name.to_string(), p.category.to_string()))
                .collect(),
        )
    }

    #[must_use]
    pub fn category_of(&self, record: &InventoryRecord) -> String {
        match self {
            Categorizer::BySource(table) => table
                .get(record.source())
                .cloned()
                .unwrap_or_else(|| record.source().to_string()),
            Categorizer::ByIdentityPrefix(sep) => record
                .identity()
                .split_once(*sep)
                .map_or(record.identity(), |(prefix, _)| prefix)
                .to_string(),
        }
    }
}

/// Builds a [`Summary`] from a merged result
#[derive(Debug, Clone, Default)]
pub struct SummaryBuilder {
    categorizer: Categorizer,
}

impl SummaryBuilder {
    #[must_use]
    pub fn new(categorizer: Categorizer) -> Self {
        Self { categorizer }
    }

    /// Count records per category
    ///
    /// Category counts always add up to `total`.
    #[must_use]
    pub fn summarize(&self, result: &InventoryResult) -> Summary {
        let mut summary = Summary::default();
        for record in result.records() {
            *summary
                .by_category
                .entry(self.categorizer.category_of(record))
                .or_insert(0) += 1;
            summary.total += 1;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Domain, Platform};

    fn result_with(records: &[(&str, &str)]) -> InventoryResult {
        let mut result = InventoryResult::new(Domain::Software, Platform::Linux);
        for (identity, source) in records {
            result.merge_record(InventoryRecord::new(*identity, *source));
        }
        result
    }

    #[test]
    fn test_summary_by_source() {
        let mut records: Vec<(String, &str)> = (0..6).map(|i| (format!("deb{i}"), "dpkg")).collect();
        records.extend((0..4).map(|i| (format!("snap{i}"), "snap")));
        let borrowed: Vec<(&str, &str)> = records.iter().map(|(i, s)| (i.as_str(), *s)).collect();

        let summary = SummaryBuilder::default().summarize(&result_with(&borrowed));

        assert_eq!(summary.total, 10);
        assert_eq!(summary.by_category.get("dpkg"), Some(&6));
        assert_eq!(summary.by_category.get("snap"), Some(&4));
    }

    #[test]
    fn test_summary_category_table() {
        let table = HashMap::from([
            ("dpkg".to_string(), "system-package".to_string()),
            ("rpm".to_string(), "system-package".to_string()),
        ]);
        let result = result_with(&[("a", "dpkg"), ("b", "rpm"), ("c", "pip")]);

        let summary = SummaryBuilder::new(Categorizer::BySource(table)).summarize(&result);

        assert_eq!(summary.by_category.get("system-package"), Some(&2));
        assert_eq!(summary.by_category.get("pip"), Some(&1));
        assert_eq!(summary.by_category.values().sum::<usize>(), summary.total);
    }

    #[test]
    fn test_summary_by_identity_prefix() {
        let result = result_with(&[("TCP:22", "ss"), ("TCP:80", "ss"), ("UDP:53", "ss")]);
        let summary = SummaryBuilder::new(Categorizer::ByIdentityPrefix(':')).summarize(&result);

        assert_eq!(summary.by_category.get("TCP"), Some(&2));
        assert_eq!(summary.by_category.get("UDP"), Some(&1));
    }
}
