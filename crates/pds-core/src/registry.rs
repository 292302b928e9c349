//! Plant → target-unit mapping with weight normalization.
//!
//! The registry keeps plants in the order they first appear in the source
//! table and entries in row order. A reverse index from unit name to the
//! first row that binds it is maintained as rows are added, so
//! [`PlantRegistry::find_plant_for_target`] is a hash lookup whose tie-break
//! (earliest row wins) does not depend on map iteration order.

use std::collections::{BTreeSet, HashMap};

use crate::error::{PdsError, PdsResult};
use crate::keys::{MapEntry, PlantCategory, PlantKey};

/// Tolerance used when checking that normalized weights sum to one.
pub const WEIGHT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Default)]
pub struct PlantRegistry {
    plants: Vec<(PlantKey, Vec<MapEntry>)>,
    index: HashMap<PlantKey, usize>,
    targets: HashMap<String, TargetBinding>,
    target_order: Vec<String>,
}

/// Reverse-index record for one unit name.
#[derive(Debug, Clone)]
struct TargetBinding {
    /// plant slot and entry slot of the earliest row binding the unit
    slot: usize,
    position: usize,
    /// distinct plant slots claiming the unit, in row order
    claimants: Vec<usize>,
}

impl PlantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `(plant, entry)` rows in table order.
    pub fn from_rows<I>(rows: I) -> PdsResult<Self>
    where
        I: IntoIterator<Item = (PlantKey, MapEntry)>,
    {
        let mut registry = Self::new();
        for (key, entry) in rows {
            registry.add(key, entry)?;
        }
        Ok(registry)
    }

    /// Append one mapping row.
    pub fn add(&mut self, key: PlantKey, entry: MapEntry) -> PdsResult<()> {
        if !entry.weight.is_finite() || entry.weight < 0.0 {
            return Err(PdsError::Format(format!(
                "weight {} for plant {} -> '{}' must be a finite non-negative number",
                entry.weight, key, entry.target_unit
            )));
        }
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.plants.push((key.clone(), Vec::new()));
                self.index.insert(key, self.plants.len() - 1);
                self.plants.len() - 1
            }
        };
        let entries = &mut self.plants[slot].1;
        entries.push(entry);
        let position = entries.len() - 1;
        let unit = &entries[position].target_unit;
        match self.targets.get_mut(unit) {
            Some(binding) => {
                if !binding.claimants.contains(&slot) {
                    binding.claimants.push(slot);
                }
            }
            None => {
                self.target_order.push(unit.clone());
                self.targets.insert(
                    unit.clone(),
                    TargetBinding {
                        slot,
                        position,
                        claimants: vec![slot],
                    },
                );
            }
        }
        Ok(())
    }

    /// Rescale each plant's weights so they sum to 1.0.
    ///
    /// All totals are checked before any weight is touched, so a failure
    /// leaves the registry unchanged.
    pub fn normalize(&mut self) -> PdsResult<()> {
        let mut totals = Vec::with_capacity(self.plants.len());
        for (key, entries) in &self.plants {
            let total: f64 = entries.iter().map(|entry| entry.weight).sum();
            if total.is_nan() || total <= 0.0 {
                return Err(PdsError::DivideByZero {
                    plant: key.to_string(),
                    total,
                });
            }
            totals.push(total);
        }
        for ((_, entries), total) in self.plants.iter_mut().zip(totals) {
            for entry in entries.iter_mut() {
                entry.weight /= total;
            }
        }
        Ok(())
    }

    pub fn entries_for_plant(&self, key: &PlantKey) -> &[MapEntry] {
        self.index
            .get(key)
            .map(|&slot| self.plants[slot].1.as_slice())
            .unwrap_or(&[])
    }

    /// Plant and weight feeding `unit_name`.
    ///
    /// When several rows bind the same unit, the earliest row in the source
    /// table wins.
    pub fn find_plant_for_target(&self, unit_name: &str) -> Option<(&PlantKey, f64)> {
        self.targets.get(unit_name).map(|binding| {
            let (key, entries) = &self.plants[binding.slot];
            (key, entries[binding.position].weight)
        })
    }

    /// Unit names bound to more than one distinct plant, in first-seen order,
    /// with every plant that claims them (winner first).
    pub fn ambiguous_targets(&self) -> Vec<(String, Vec<PlantKey>)> {
        self.target_order
            .iter()
            .filter_map(|unit| {
                let binding = &self.targets[unit];
                (binding.claimants.len() > 1).then(|| {
                    let plants = binding
                        .claimants
                        .iter()
                        .map(|&slot| self.plants[slot].0.clone())
                        .collect();
                    (unit.clone(), plants)
                })
            })
            .collect()
    }

    /// Categories present in the registry; one generation series is needed
    /// per category.
    pub fn required_categories(&self) -> BTreeSet<PlantCategory> {
        self.plants.iter().map(|(key, _)| key.category()).collect()
    }

    /// Every unit name referenced by a mapping row, in first-seen order.
    pub fn target_unit_names(&self) -> Vec<&str> {
        self.target_order.iter().map(String::as_str).collect()
    }

    pub fn total_weight(&self, key: &PlantKey) -> f64 {
        self.entries_for_plant(key)
            .iter()
            .map(|entry| entry.weight)
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlantKey, &[MapEntry])> {
        self.plants
            .iter()
            .map(|(key, entries)| (key, entries.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.plants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> PlantKey {
        PlantKey::new("sys", PlantCategory::Hydro, name)
    }

    fn registry(rows: &[(&str, &str, f64)]) -> PlantRegistry {
        PlantRegistry::from_rows(
            rows.iter()
                .map(|(plant, unit, weight)| (key(plant), MapEntry::new(*unit, *weight))),
        )
        .unwrap()
    }

    #[test]
    fn normalize_three_to_one() {
        let mut reg = registry(&[("P1", "G1", 3.0), ("P1", "G2", 1.0)]);
        reg.normalize().unwrap();
        let weights: Vec<f64> = reg
            .entries_for_plant(&key("P1"))
            .iter()
            .map(|e| e.weight)
            .collect();
        assert_eq!(weights, vec![0.75, 0.25]);
    }

    #[test]
    fn normalized_weights_sum_to_one() {
        let mut reg = registry(&[
            ("P1", "G1", 0.3),
            ("P1", "G2", 0.3),
            ("P1", "G3", 0.3),
            ("P2", "G4", 7.0),
            ("P3", "G5", 1e-6),
            ("P3", "G6", 2e-6),
        ]);
        reg.normalize().unwrap();
        for (plant, _) in reg.iter() {
            assert!((reg.total_weight(plant) - 1.0).abs() <= WEIGHT_TOLERANCE);
        }
    }

    #[test]
    fn zero_total_is_divide_by_zero() {
        let mut reg = registry(&[("P1", "G1", 1.0), ("P2", "G2", 0.0), ("P2", "G3", 0.0)]);
        let err = reg.normalize().unwrap_err();
        match err {
            PdsError::DivideByZero { plant, total } => {
                assert!(plant.contains("P2"));
                assert_eq!(total, 0.0);
            }
            other => panic!("unexpected error {other:?}"),
        }
        // untouched on failure
        assert_eq!(reg.entries_for_plant(&key("P1"))[0].weight, 1.0);
    }

    #[test]
    fn negative_weight_rejected() {
        let mut reg = PlantRegistry::new();
        let err = reg.add(key("P1"), MapEntry::new("G1", -1.0)).unwrap_err();
        assert!(matches!(err, PdsError::Format(_)));
    }

    #[test]
    fn find_plant_uses_normalized_weight() {
        let mut reg = registry(&[("P1", "G1", 1.0), ("P1", "G2", 1.0)]);
        reg.normalize().unwrap();
        let (plant, weight) = reg.find_plant_for_target("G2").unwrap();
        assert_eq!(plant, &key("P1"));
        assert_eq!(weight, 0.5);
        assert!(reg.find_plant_for_target("G9").is_none());
    }

    #[test]
    fn find_plant_first_row_wins_and_is_deterministic() {
        // P1 is seen first but binds G1 only on the third row.
        let reg = registry(&[("P1", "G2", 1.0), ("P2", "G1", 1.0), ("P1", "G1", 1.0)]);
        for _ in 0..10 {
            let (plant, _) = reg.find_plant_for_target("G1").unwrap();
            assert_eq!(plant, &key("P2"));
        }
    }

    #[test]
    fn ambiguous_targets_lists_all_claimants() {
        let reg = registry(&[
            ("P1", "G1", 1.0),
            ("P2", "G1", 1.0),
            ("P2", "G2", 1.0),
            ("P3", "G1", 2.0),
        ]);
        let ambiguous = reg.ambiguous_targets();
        assert_eq!(ambiguous.len(), 1);
        let (unit, plants) = &ambiguous[0];
        assert_eq!(unit, "G1");
        assert_eq!(plants, &vec![key("P1"), key("P2"), key("P3")]);
    }

    #[test]
    fn same_plant_twice_is_not_ambiguous() {
        let reg = registry(&[("P1", "G1", 1.0), ("P1", "G1", 1.0)]);
        assert!(reg.ambiguous_targets().is_empty());
    }

    #[test]
    fn required_categories_and_targets() {
        let reg = PlantRegistry::from_rows(vec![
            (
                PlantKey::new("s", PlantCategory::Thermal, "T1"),
                MapEntry::new("G1", 1.0),
            ),
            (
                PlantKey::new("s", PlantCategory::Hydro, "H1"),
                MapEntry::new("G2", 1.0),
            ),
            (
                PlantKey::new("s", PlantCategory::Hydro, "H2"),
                MapEntry::new("G1", 1.0),
            ),
        ])
        .unwrap();
        let categories: Vec<_> = reg.required_categories().into_iter().collect();
        assert_eq!(categories, vec![PlantCategory::Hydro, PlantCategory::Thermal]);
        assert_eq!(reg.target_unit_names(), vec!["G1", "G2"]);
        assert_eq!(reg.len(), 3);
    }
}
