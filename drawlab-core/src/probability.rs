//! Per-item probability tables: output of the engine and the validator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::ItemName;

/// Mapping from item name to a probability or frequency, in table order.
///
/// An empty table means "nothing to draw": the source set had zero total
/// effective weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityTable {
    entries: Vec<(ItemName, f64)>,
}

impl ProbabilityTable {
    pub fn new(entries: Vec<(ItemName, f64)>) -> Self {
        Self { entries }
    }

    /// Pair names with values; both must be in the same order.
    pub fn from_parts<'a>(names: impl IntoIterator<Item = &'a str>, values: &[f64]) -> Self {
        names
            .into_iter()
            .zip(values.iter().copied())
            .map(|(n, v)| (n.to_string(), v))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|&(_, v)| v)
    }

    /// Sum of all values. Equals `k` for exact inclusion probabilities.
    pub fn total(&self) -> f64 {
        self.values().sum()
    }

    /// Copy with every value multiplied by `factor` (e.g. 100 for percent).
    pub fn scaled(&self, factor: f64) -> Self {
        self.iter().map(|(n, v)| (n.to_string(), v * factor)).collect()
    }

    pub fn to_map(&self) -> BTreeMap<ItemName, f64> {
        self.entries.iter().cloned().collect()
    }

    pub fn into_entries(self) -> Vec<(ItemName, f64)> {
        self.entries
    }
}

impl FromIterator<(ItemName, f64)> for ProbabilityTable {
    fn from_iter<I: IntoIterator<Item = (ItemName, f64)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
