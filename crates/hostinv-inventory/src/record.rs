//! Inventory records

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Placeholder for a field no source could fill
pub const UNKNOWN: &str = "Unknown";

/// Whether a field value carries no information
///
/// Empty strings, `Unknown`, `N/A` and a lone `-` all count as unset, so a
/// later probe may fill them in.
#[must_use]
pub fn is_unset(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || value == "-"
        || value.eq_ignore_ascii_case(UNKNOWN)
        || value.eq_ignore_ascii_case("n/a")
}

/// One fact about the host, keyed by a domain-specific identity
///
/// Field order is the order the parser produced them in. Unset values are
/// normalised to [`UNKNOWN`] on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    identity: String,
    fields: IndexMap<String, String>,
    source: String,
}

/// What happened to a record folded into an existing one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Absorbed {
    /// Fields copied because the existing value was missing or unset
    pub backfilled: usize,
    /// Fields where both sides had a real value and the existing one was kept
    pub conflicts: usize,
}

impl InventoryRecord {
    /// Create a record with no fields
    pub fn new(identity: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            fields: IndexMap::new(),
            source: source.into(),
        }
    }

    /// Add or replace a field
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.insert(name.into(), value.as_ref());
        self
    }

    /// Add a field only when a value is present
    #[must_use]
    pub fn with_optional_field(self, name: impl Into<String>, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.with_field(name, value),
            None => self,
        }
    }

    /// Replace the source tag
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Identity key
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Probe or tool the record came from
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// All fields in insertion order
    #[must_use]
    pub fn fields(&self) -> &IndexMap<String, String> {
        &self.fields
    }

    /// Field value, if present
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Field value, or [`UNKNOWN`] when absent
    #[must_use]
    pub fn field_or_unknown(&self, name: &str) -> &str {
        self.field(name).unwrap_or(UNKNOWN)
    }

    /// Whether `name` holds a real value
    #[must_use]
    pub fn has_value(&self, name: &str) -> bool {
        self.field(name).is_some_and(|v| !is_unset(v))
    }

    fn insert(&mut self, name: String, value: &str) {
        let value = if is_unset(value) {
            UNKNOWN.to_string()
        } else {
            value.trim().to_string()
        };
        self.fields.insert(name, value);
    }

    /// Fill `name` only if it is missing or unset
    pub(crate) fn backfill_field(&mut self, name: &str, value: &str) -> bool {
        if self.has_value(name) {
            return false;
        }
        if is_unset(value) && self.fields.contains_key(name) {
            return false;
        }
        self.insert(name.to_string(), value);
        true
    }

    /// Fold a later record for the same identity into this one
    ///
    /// Existing real values always stay; missing or unset ones are taken
    /// from `other`.
    pub(crate) fn absorb(&mut self, other: InventoryRecord) -> Absorbed {
        let mut absorbed = Absorbed::default();
        for (name, value) in other.fields {
            match self.fields.get(&name) {
                Some(existing) if !is_unset(existing) => {
                    if !is_unset(&value) && *existing != value {
                        absorbed.conflicts += 1;
                    }
                }
                Some(_) if is_unset(&value) => {}
                _ => {
                    if !is_unset(&value) {
                        absorbed.backfilled += 1;
                    }
                    self.insert(name, &value);
                }
            }
        }
        absorbed
    }
}
