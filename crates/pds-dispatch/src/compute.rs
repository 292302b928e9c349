//! Turning one scenario's results into unit setpoints.
//!
//! For a scenario key `k` the computer reads the interval length, converts
//! each mapped plant's energy into average power over that interval, and
//! scales it by the unit's share of the plant and by the unit's class factor:
//!
//! ```text
//! setpoint = raw * (1000 / duration_h) * weight * class_factor
//! ```
//!
//! A plan is computed completely before anything is written, so a hard error
//! leaves the target model untouched for that scenario.

use std::collections::BTreeSet;

use pds_core::diagnostics::CATEGORY_UNMAPPED;
use pds_core::{
    ClassTable, Diagnostics, GigawattHours, Hours, PdsError, PdsResult, PlantCategory,
    PlantRegistry, ScenarioKey, SeriesNames,
};
use pds_ts::SeriesSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::adapter::TargetUnit;

/// One attribute write for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setpoint {
    pub unit: String,
    pub attribute: String,
    pub value: f64,
}

impl Setpoint {
    pub fn new(unit: impl Into<String>, attribute: impl Into<String>, value: f64) -> Self {
        Self {
            unit: unit.into(),
            attribute: attribute.into(),
            value,
        }
    }
}

/// Everything to write for one scenario, plus the units that were skipped.
#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    pub key: ScenarioKey,
    pub duration: Hours,
    pub setpoints: Vec<Setpoint>,
    pub diagnostics: Diagnostics,
}

impl ScenarioPlan {
    pub fn skipped_units(&self) -> Vec<&str> {
        self.diagnostics.entities_in(CATEGORY_UNMAPPED).collect()
    }
}

pub struct DispatchComputer<'a> {
    registry: &'a PlantRegistry,
    classes: ClassTable,
    series_names: SeriesNames,
}

impl<'a> DispatchComputer<'a> {
    /// `registry` must already be normalized.
    pub fn new(registry: &'a PlantRegistry, classes: ClassTable, series_names: SeriesNames) -> Self {
        Self {
            registry,
            classes,
            series_names,
        }
    }

    pub fn registry(&self) -> &PlantRegistry {
        self.registry
    }

    pub fn classes(&self) -> &ClassTable {
        &self.classes
    }

    pub fn series_names(&self) -> &SeriesNames {
        &self.series_names
    }

    /// Categories whose generation series must be opened.
    pub fn required_categories(&self) -> BTreeSet<PlantCategory> {
        self.registry.required_categories()
    }

    /// Compute the setpoints of every unit in `units` for scenario `key`.
    ///
    /// Units are visited in name order. A unit no plant maps to is skipped
    /// with an [`CATEGORY_UNMAPPED`] warning; every other failure is returned
    /// as an error and no partial plan is produced.
    pub fn plan_scenario(
        &self,
        key: ScenarioKey,
        units: &[TargetUnit],
        series: &mut SeriesSet,
    ) -> PdsResult<ScenarioPlan> {
        let duration = series.duration(&key)?;
        if !duration.is_valid_interval() {
            return Err(PdsError::InvalidDuration {
                key,
                hours: duration.value(),
            });
        }

        let mut ordered: Vec<&TargetUnit> = units.iter().collect();
        ordered.sort_by(|a, b| a.name.cmp(&b.name));

        let mut setpoints = Vec::with_capacity(ordered.len());
        let mut diagnostics = Diagnostics::new();
        for unit in ordered {
            let conversion = self.classes.conversion_for(&unit.name, &unit.class)?;
            let Some((plant, weight)) = self.registry.find_plant_for_target(&unit.name) else {
                warn!(unit = %unit.name, scenario = %key, "no plant maps to unit; skipped");
                diagnostics.add_warning_with_entity(
                    CATEGORY_UNMAPPED,
                    "no plant maps to this unit",
                    &unit.name,
                );
                continue;
            };
            let raw = series.generation(plant.category(), &key, plant.name())?;
            let power = GigawattHours(raw).average_power(duration);
            let value = power.value() * weight * conversion.factor;
            debug!(
                unit = %unit.name,
                plant = %plant,
                raw,
                power = %power,
                weight,
                value,
                "setpoint"
            );
            setpoints.push(Setpoint::new(&unit.name, &conversion.attribute, value));
        }

        Ok(ScenarioPlan {
            key,
            duration,
            setpoints,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pds_core::{ClassConversion, MapEntry, PlantKey};
    use pds_ts::{ResolverOptions, TimeSeriesResolver};
    use std::fs;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    fn case(duration: &str) -> TempDir {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("duraci.csv"),
            format!("stage,scenario,block,duration\n1,1,1,{duration}\n"),
        )
        .unwrap();
        fs::write(
            dir.path().join("gerhid.csv"),
            "stage,scenario,block,Furnas,Itaipu\n1,1,1,50,8\n",
        )
        .unwrap();
        dir
    }

    fn registry() -> PlantRegistry {
        let furnas = PlantKey::new("SE", PlantCategory::Hydro, "Furnas");
        let itaipu = PlantKey::new("SE", PlantCategory::Hydro, "Itaipu");
        let mut registry = PlantRegistry::from_rows([
            (furnas.clone(), MapEntry::new("G1", 1.0)),
            (furnas, MapEntry::new("G2", 1.0)),
            (itaipu, MapEntry::new("PV1", 4.0)),
        ])
        .unwrap();
        registry.normalize().unwrap();
        registry
    }

    fn open(dir: &Path, computer: &DispatchComputer) -> SeriesSet {
        let resolver = TimeSeriesResolver::new(dir, ResolverOptions::default());
        SeriesSet::open(
            &resolver,
            computer.series_names(),
            &computer.required_categories(),
        )
        .unwrap()
    }

    #[test]
    fn setpoint_formula() {
        // raw=50 GWh over 2 h, half the plant, factor 1 → 12500 MW.
        let dir = case("2");
        let registry = registry();
        let computer = DispatchComputer::new(&registry, ClassTable::default(), SeriesNames::default());
        let mut series = open(dir.path(), &computer);
        let units = vec![TargetUnit::new("G1", "ElmSym")];
        let plan = computer
            .plan_scenario(ScenarioKey::new(1, 1, 1), &units, &mut series)
            .unwrap();
        assert_eq!(plan.setpoints, vec![Setpoint::new("G1", "pgini", 12500.0)]);
        assert_eq!(plan.duration, Hours(2.0));
    }

    #[test]
    fn class_factor_scales_pv() {
        let dir = case("2");
        let registry = registry();
        let computer = DispatchComputer::new(&registry, ClassTable::default(), SeriesNames::default());
        let mut series = open(dir.path(), &computer);
        let units = vec![TargetUnit::new("PV1", "ElmPvsys")];
        let plan = computer
            .plan_scenario(ScenarioKey::new(1, 1, 1), &units, &mut series)
            .unwrap();
        // 8 GWh / 2 h = 4000 MW, whole plant, factor 0.001.
        assert!((plan.setpoints[0].value - 4.0).abs() < 1e-9);
    }

    #[test]
    fn unmapped_unit_is_skipped_with_warning() {
        let dir = case("2");
        let registry = registry();
        let computer = DispatchComputer::new(&registry, ClassTable::default(), SeriesNames::default());
        let mut series = open(dir.path(), &computer);
        let units = vec![
            TargetUnit::new("G9", "ElmSym"),
            TargetUnit::new("G2", "ElmSym"),
        ];
        let plan = computer
            .plan_scenario(ScenarioKey::new(1, 1, 1), &units, &mut series)
            .unwrap();
        assert_eq!(plan.setpoints.len(), 1);
        assert_eq!(plan.setpoints[0].unit, "G2");
        assert_eq!(plan.skipped_units(), vec!["G9"]);
        assert_eq!(plan.diagnostics.warning_count(), 1);
    }

    #[test]
    fn zero_duration_is_invalid() {
        let dir = case("0");
        let registry = registry();
        let computer = DispatchComputer::new(&registry, ClassTable::default(), SeriesNames::default());
        let mut series = open(dir.path(), &computer);
        let units = vec![TargetUnit::new("G1", "ElmSym")];
        let err = computer
            .plan_scenario(ScenarioKey::new(1, 1, 1), &units, &mut series)
            .unwrap_err();
        assert!(matches!(err, PdsError::InvalidDuration { hours, .. } if hours == 0.0));
    }

    #[test]
    fn unknown_class_is_a_hard_error() {
        let dir = case("2");
        let registry = registry();
        let computer = DispatchComputer::new(&registry, ClassTable::default(), SeriesNames::default());
        let mut series = open(dir.path(), &computer);
        let units = vec![TargetUnit::new("G1", "ElmLod")];
        let err = computer
            .plan_scenario(ScenarioKey::new(1, 1, 1), &units, &mut series)
            .unwrap_err();
        assert!(matches!(err, PdsError::UnknownClass { .. }));
    }

    #[test]
    fn custom_class_table_is_used() {
        let dir = case("2");
        let registry = registry();
        let classes = ClassTable::empty().with_class("ElmSym", ClassConversion::new("p_set", 2.0));
        let computer = DispatchComputer::new(&registry, classes, SeriesNames::default());
        let mut series = open(dir.path(), &computer);
        let units = vec![TargetUnit::new("G2", "ElmSym")];
        let plan = computer
            .plan_scenario(ScenarioKey::new(1, 1, 1), &units, &mut series)
            .unwrap();
        assert_eq!(plan.setpoints, vec![Setpoint::new("G2", "p_set", 25000.0)]);
    }

    #[test]
    fn missing_value_aborts_plan() {
        let dir = case("2");
        let registry = registry();
        let computer = DispatchComputer::new(&registry, ClassTable::default(), SeriesNames::default());
        let mut series = open(dir.path(), &computer);
        let units = vec![TargetUnit::new("G1", "ElmSym")];
        let err = computer
            .plan_scenario(ScenarioKey::new(1, 2, 1), &units, &mut series)
            .unwrap_err();
        assert!(matches!(err, PdsError::ValueNotFound { .. }));
    }
}
