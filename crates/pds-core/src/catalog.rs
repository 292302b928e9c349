//! Ordered set of scenario coordinates to process.

use std::collections::HashMap;

use crate::keys::ScenarioKey;

/// Scenario coordinates with their display labels, in source-table order.
///
/// Inserting a key that is already present replaces its label but keeps the
/// position of the first occurrence (last write wins for the label).
#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    entries: Vec<(ScenarioKey, String)>,
    index: HashMap<ScenarioKey, usize>,
}

impl ScenarioCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or relabel a scenario. Returns the label that was replaced.
    pub fn insert(&mut self, key: ScenarioKey, label: impl Into<String>) -> Option<String> {
        let label = label.into();
        match self.index.get(&key) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot].1, label)),
            None => {
                self.entries.push((key, label));
                self.index.insert(key, self.entries.len() - 1);
                None
            }
        }
    }

    pub fn label(&self, key: &ScenarioKey) -> Option<&str> {
        self.index
            .get(key)
            .map(|&slot| self.entries[slot].1.as_str())
    }

    pub fn contains(&self, key: &ScenarioKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ScenarioKey, &str)> {
        self.entries
            .iter()
            .map(|(key, label)| (key, label.as_str()))
    }

    /// Sub-catalog limited to the given stages, order preserved.
    pub fn filter_stages(&self, stages: &[u32]) -> ScenarioCatalog {
        let mut filtered = ScenarioCatalog::new();
        for (key, label) in self.iter() {
            if stages.contains(&key.stage) {
                filtered.insert(*key, label);
            }
        }
        filtered
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
