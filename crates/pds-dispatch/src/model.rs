//! A self-contained target model.
//!
//! `UnitModel` holds the units of a model (read from a `name, class` table)
//! and one set of attribute values per scenario. Saving a scenario writes it
//! as `<out_dir>/<label>.json`; without an output directory nothing is
//! written, which makes it usable for dry runs.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use pds_core::{PdsError, PdsResult};
use pds_io::{load_unit_table, TextEncoding, UnitRow};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapter::{ScenarioHandle, SimulationAdapter, TargetUnit};

/// Attribute values per unit.
pub type UnitValues = BTreeMap<String, BTreeMap<String, f64>>;

/// A saved scenario as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSnapshot {
    pub label: String,
    pub units: UnitValues,
}

#[derive(Debug, Clone)]
struct ModelScenario {
    label: String,
    values: UnitValues,
    saved: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UnitModel {
    units: Vec<TargetUnit>,
    index: HashMap<String, usize>,
    scenarios: Vec<ModelScenario>,
    active: Option<usize>,
    out_dir: Option<PathBuf>,
}

impl UnitModel {
    pub fn new(units: Vec<TargetUnit>) -> PdsResult<Self> {
        let mut index = HashMap::with_capacity(units.len());
        for (slot, unit) in units.iter().enumerate() {
            if index.insert(unit.name.clone(), slot).is_some() {
                return Err(PdsError::Format(format!(
                    "unit '{}' is listed more than once",
                    unit.name
                )));
            }
        }
        Ok(Self {
            units,
            index,
            ..Self::default()
        })
    }

    pub fn from_rows(rows: Vec<UnitRow>) -> PdsResult<Self> {
        Self::new(
            rows.into_iter()
                .map(|row| TargetUnit::new(row.name, row.class))
                .collect(),
        )
    }

    /// Load the units from a `name, class` table.
    pub fn load(path: &Path, encoding: TextEncoding) -> PdsResult<Self> {
        let model = Self::from_rows(load_unit_table(path, encoding)?)?;
        info!(path = %path.display(), units = model.units.len(), "loaded unit model");
        Ok(model)
    }

    /// Write each saved scenario under `dir`.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(dir.into());
        self
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.out_dir.as_deref()
    }

    pub fn units(&self) -> &[TargetUnit] {
        &self.units
    }

    pub fn contains_unit(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn active_label(&self) -> Option<&str> {
        self.active.map(|slot| self.scenarios[slot].label.as_str())
    }

    /// Labels of saved scenarios, in creation order.
    pub fn saved_labels(&self) -> Vec<&str> {
        self.scenarios
            .iter()
            .filter(|scenario| scenario.saved)
            .map(|scenario| scenario.label.as_str())
            .collect()
    }

    /// Files written for saved scenarios; empty without an output directory.
    pub fn saved_files(&self) -> Vec<PathBuf> {
        let Some(dir) = &self.out_dir else {
            return Vec::new();
        };
        self.scenarios
            .iter()
            .filter(|scenario| scenario.saved)
            .map(|scenario| scenario_path(dir, &scenario.label))
            .collect()
    }

    /// Values of the scenario called `label`.
    pub fn snapshot(&self, label: &str) -> Option<&UnitValues> {
        self.slot_of(label).map(|slot| &self.scenarios[slot].values)
    }

    pub fn value(&self, label: &str, unit: &str, attribute: &str) -> Option<f64> {
        self.snapshot(label)?.get(unit)?.get(attribute).copied()
    }

    fn slot_of(&self, label: &str) -> Option<usize> {
        self.scenarios
            .iter()
            .position(|scenario| scenario.label == label)
    }

    fn check_handle(&self, handle: &ScenarioHandle) -> PdsResult<()> {
        match self.scenarios.get(handle.id()) {
            Some(scenario) if scenario.label == handle.label() => Ok(()),
            _ => Err(PdsError::Adapter(format!(
                "scenario '{}' does not belong to this model",
                handle.label()
            ))),
        }
    }

    fn save(&self, scenario: &ModelScenario) -> anyhow::Result<Option<PathBuf>> {
        let Some(dir) = &self.out_dir else {
            return Ok(None);
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("creating scenario directory '{}'", dir.display()))?;
        let path = scenario_path(dir, &scenario.label);
        let snapshot = ScenarioSnapshot {
            label: scenario.label.clone(),
            units: scenario.values.clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot).context("serializing scenario")?;
        fs::write(&path, json)
            .with_context(|| format!("writing scenario '{}'", path.display()))?;
        Ok(Some(path))
    }
}

impl SimulationAdapter for UnitModel {
    fn list_target_units(&self) -> PdsResult<Vec<TargetUnit>> {
        Ok(self.units.clone())
    }

    /// Creating a label that already exists starts it over from empty
    /// values.
    fn create_scenario(&mut self, label: &str) -> PdsResult<ScenarioHandle> {
        let fresh = ModelScenario {
            label: label.to_string(),
            values: UnitValues::new(),
            saved: false,
        };
        let slot = match self.slot_of(label) {
            Some(slot) => {
                if self.active == Some(slot) {
                    self.active = None;
                }
                self.scenarios[slot] = fresh;
                slot
            }
            None => {
                self.scenarios.push(fresh);
                self.scenarios.len() - 1
            }
        };
        Ok(ScenarioHandle::new(slot, label))
    }

    /// Activating a scenario deactivates the previous one without saving.
    fn activate(&mut self, handle: &ScenarioHandle) -> PdsResult<()> {
        self.check_handle(handle)?;
        if let Some(previous) = self.active.replace(handle.id()) {
            if previous != handle.id() {
                debug!(
                    previous = %self.scenarios[previous].label,
                    "deactivated unsaved scenario"
                );
            }
        }
        Ok(())
    }

    fn write_attribute(&mut self, unit: &str, attribute: &str, value: f64) -> PdsResult<()> {
        let slot = self.active.ok_or_else(|| {
            PdsError::Adapter(format!(
                "write of {}.{} outside an active scenario",
                unit, attribute
            ))
        })?;
        if !self.index.contains_key(unit) {
            return Err(PdsError::Adapter(format!("unit '{}' is not in the model", unit)));
        }
        self.scenarios[slot]
            .values
            .entry(unit.to_string())
            .or_default()
            .insert(attribute.to_string(), value);
        Ok(())
    }

    fn deactivate_and_save(&mut self, handle: &ScenarioHandle) -> PdsResult<()> {
        self.check_handle(handle)?;
        if self.active != Some(handle.id()) {
            return Err(PdsError::Adapter(format!(
                "scenario '{}' is not active",
                handle.label()
            )));
        }
        let scenario = &self.scenarios[handle.id()];
        let written = self
            .save(scenario)
            .map_err(|err| PdsError::Adapter(format!("{err:#}")))?;
        if let Some(path) = written {
            debug!(scenario = handle.label(), path = %path.display(), "wrote scenario");
        }
        self.scenarios[handle.id()].saved = true;
        self.active = None;
        Ok(())
    }
}

fn scenario_path(dir: &Path, label: &str) -> PathBuf {
    dir.join(format!("{}.json", file_stem(label)))
}

/// Labels come from the scenario table; keep them usable as file names.
fn file_stem(label: &str) -> String {
    let stem: String = label
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim();
    if stem.is_empty() || stem == "." || stem == ".." {
        "scenario".to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn model() -> UnitModel {
        UnitModel::new(vec![
            TargetUnit::new("G1", "ElmSym"),
            TargetUnit::new("PV1", "ElmPvsys"),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_duplicate_units() {
        let err = UnitModel::new(vec![
            TargetUnit::new("G1", "ElmSym"),
            TargetUnit::new("G1", "ElmAsm"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("G1"));
    }

    #[test]
    fn write_outside_active_scenario_fails() {
        let mut model = model();
        let err = model.write_attribute("G1", "pgini", 1.0).unwrap_err();
        assert!(matches!(err, PdsError::Adapter(_)));

        let handle = model.create_scenario("s1").unwrap();
        model.activate(&handle).unwrap();
        model.write_attribute("G1", "pgini", 1.0).unwrap();
        model.deactivate_and_save(&handle).unwrap();
        assert!(model.write_attribute("G1", "pgini", 2.0).is_err());
        assert_eq!(model.value("s1", "G1", "pgini"), Some(1.0));
    }

    #[test]
    fn unknown_unit_is_rejected() {
        let mut model = model();
        let handle = model.create_scenario("s1").unwrap();
        model.activate(&handle).unwrap();
        assert!(model.write_attribute("G7", "pgini", 1.0).is_err());
    }

    #[test]
    fn saves_snapshot_as_json() {
        let dir = tempdir().unwrap();
        let mut model = model().with_output_dir(dir.path().join("scenarios"));
        let handle = model.create_scenario("stage 1/run 2").unwrap();
        model.activate(&handle).unwrap();
        model.write_attribute("PV1", "pgini", 0.5).unwrap();
        model.deactivate_and_save(&handle).unwrap();

        let path = dir.path().join("scenarios").join("stage 1_run 2.json");
        let snapshot: ScenarioSnapshot =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(snapshot.label, "stage 1/run 2");
        assert_eq!(snapshot.units["PV1"]["pgini"], 0.5);
        assert_eq!(model.saved_labels(), vec!["stage 1/run 2"]);
        assert_eq!(
            model.saved_files(),
            vec![dir.path().join("scenarios").join("stage 1_run 2.json")]
        );
        assert_eq!(model.active_label(), None);
    }

    #[test]
    fn recreating_a_scenario_starts_empty() {
        let mut model = model();
        let first = model.create_scenario("s1").unwrap();
        model.activate(&first).unwrap();
        model.write_attribute("G1", "pgini", 3.0).unwrap();
        model.deactivate_and_save(&first).unwrap();

        let second = model.create_scenario("s1").unwrap();
        assert_eq!(second.id(), first.id());
        assert!(model.snapshot("s1").unwrap().is_empty());
    }

    #[test]
    fn deactivating_inactive_scenario_fails() {
        let mut model = model();
        let handle = model.create_scenario("s1").unwrap();
        assert!(model.deactivate_and_save(&handle).is_err());
        let foreign = ScenarioHandle::new(5, "other");
        assert!(model.activate(&foreign).is_err());
    }

    #[test]
    fn file_stem_is_sanitized() {
        assert_eq!(file_stem("a/b:c"), "a_b_c");
        assert_eq!(file_stem(".."), "scenario");
        assert_eq!(file_stem("  "), "scenario");
    }
}
