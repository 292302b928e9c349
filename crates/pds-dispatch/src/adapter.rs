//! The boundary to the target power-flow model.

use pds_core::{PdsError, PdsResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::compute::Setpoint;

/// A unit of the target model, as enumerated by the adapter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetUnit {
    pub name: String,
    /// Element class (e.g. `ElmSym`), used to pick the attribute and scale.
    pub class: String,
}

impl TargetUnit {
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
        }
    }
}

/// Opaque reference to a scenario object owned by the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioHandle {
    id: usize,
    label: String,
}

impl ScenarioHandle {
    pub fn new(id: usize, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Operations the pipeline needs from a target model.
///
/// Only one scenario is active at a time. Callers go through
/// [`apply_scenario`], which issues create, activate, the writes, and
/// deactivate-with-save in that order.
pub trait SimulationAdapter {
    /// Every unit that may receive a setpoint, with its element class.
    fn list_target_units(&self) -> PdsResult<Vec<TargetUnit>>;

    fn create_scenario(&mut self, label: &str) -> PdsResult<ScenarioHandle>;

    fn activate(&mut self, handle: &ScenarioHandle) -> PdsResult<()>;

    /// Set `attribute` of `unit` in the active scenario. Implementations
    /// must reject writes when no scenario is active.
    fn write_attribute(&mut self, unit: &str, attribute: &str, value: f64) -> PdsResult<()>;

    fn deactivate_and_save(&mut self, handle: &ScenarioHandle) -> PdsResult<()>;
}

/// A scenario that failed inside [`apply_scenario`], with the number of
/// writes the adapter accepted before the failure.
#[derive(Debug, Error)]
#[error("scenario failed after {writes} writes")]
pub struct ApplyError {
    pub writes: usize,
    pub source: PdsError,
}

impl From<PdsError> for ApplyError {
    fn from(source: PdsError) -> Self {
        Self { writes: 0, source }
    }
}

/// Push one scenario's setpoints into the model. Returns the number of
/// writes issued.
///
/// When a write or the save fails, the scenario is left active and unsaved
/// with whatever values were already written. The next `activate` replaces
/// it, so those values never reach a saved scenario.
pub fn apply_scenario<A>(
    adapter: &mut A,
    label: &str,
    setpoints: &[Setpoint],
) -> Result<usize, ApplyError>
where
    A: SimulationAdapter + ?Sized,
{
    let handle = adapter.create_scenario(label)?;
    adapter.activate(&handle)?;
    for (writes, setpoint) in setpoints.iter().enumerate() {
        if let Err(source) =
            adapter.write_attribute(&setpoint.unit, &setpoint.attribute, setpoint.value)
        {
            warn!(
                scenario = label,
                writes,
                unit = %setpoint.unit,
                "write failed; scenario left unsaved"
            );
            return Err(ApplyError { writes, source });
        }
    }
    adapter
        .deactivate_and_save(&handle)
        .map_err(|source| ApplyError {
            writes: setpoints.len(),
            source,
        })?;
    debug!(scenario = label, writes = setpoints.len(), "scenario saved");
    Ok(setpoints.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pds_core::PdsError;

    /// Records every call so the sequence can be checked.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        active: bool,
        reject_unit: Option<&'static str>,
    }

    impl SimulationAdapter for Recorder {
        fn list_target_units(&self) -> PdsResult<Vec<TargetUnit>> {
            Ok(vec![TargetUnit::new("G1", "ElmSym")])
        }

        fn create_scenario(&mut self, label: &str) -> PdsResult<ScenarioHandle> {
            self.calls.push(format!("create {label}"));
            Ok(ScenarioHandle::new(0, label))
        }

        fn activate(&mut self, handle: &ScenarioHandle) -> PdsResult<()> {
            self.calls.push(format!("activate {}", handle.label()));
            self.active = true;
            Ok(())
        }

        fn write_attribute(&mut self, unit: &str, attribute: &str, value: f64) -> PdsResult<()> {
            if !self.active {
                return Err(PdsError::Adapter("inactive".into()));
            }
            if self.reject_unit == Some(unit) {
                return Err(PdsError::Adapter(format!("{unit} is locked")));
            }
            self.calls.push(format!("write {unit}.{attribute}={value}"));
            Ok(())
        }

        fn deactivate_and_save(&mut self, handle: &ScenarioHandle) -> PdsResult<()> {
            self.calls.push(format!("save {}", handle.label()));
            self.active = false;
            Ok(())
        }
    }

    #[test]
    fn lifecycle_runs_in_order() {
        let mut recorder = Recorder::default();
        let setpoints = vec![
            Setpoint::new("G1", "pgini", 10.0),
            Setpoint::new("G2", "pgini", 5.0),
        ];
        let writes = apply_scenario(&mut recorder, "s1", &setpoints).unwrap();
        assert_eq!(writes, 2);
        assert_eq!(
            recorder.calls,
            vec![
                "create s1",
                "activate s1",
                "write G1.pgini=10",
                "write G2.pgini=5",
                "save s1",
            ]
        );
        assert!(!recorder.active);
    }

    #[test]
    fn empty_scenario_is_still_saved() {
        let mut recorder = Recorder::default();
        assert_eq!(apply_scenario(&mut recorder, "s2", &[]).unwrap(), 0);
        assert_eq!(recorder.calls.last().map(String::as_str), Some("save s2"));
    }

    #[test]
    fn failed_write_reports_partial_count_and_skips_save() {
        let mut recorder = Recorder {
            reject_unit: Some("G3"),
            ..Recorder::default()
        };
        let setpoints = vec![
            Setpoint::new("G1", "pgini", 10.0),
            Setpoint::new("G2", "pgini", 5.0),
            Setpoint::new("G3", "pgini", 1.0),
            Setpoint::new("G4", "pgini", 2.0),
        ];
        let err = apply_scenario(&mut recorder, "s3", &setpoints).unwrap_err();
        assert_eq!(err.writes, 2);
        assert!(err.source.to_string().contains("G3 is locked"));
        assert_eq!(recorder.calls.last().map(String::as_str), Some("write G2.pgini=5"));
        assert!(recorder.active);
    }
}
