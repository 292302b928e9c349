//! # pds-dispatch: scenario setpoints into a target model
//!
//! [`DispatchComputer`] turns one scenario's results into [`Setpoint`]s;
//! [`run_dispatch`] drives every scenario of a catalog through a
//! [`SimulationAdapter`] and returns a [`RunReport`].
//!
//! [`UnitModel`] is the bundled adapter: its units come from a
//! `name, class` table and each saved scenario is written as JSON.

pub mod adapter;
pub mod compute;
pub mod model;
pub mod report;
pub mod runner;

pub use adapter::{apply_scenario, ApplyError, ScenarioHandle, SimulationAdapter, TargetUnit};
pub use compute::{DispatchComputer, ScenarioPlan, Setpoint};
pub use model::{ScenarioSnapshot, UnitModel, UnitValues};
pub use report::{
    load_run_report, write_run_report, RunReport, ScenarioRecord, ScenarioStatus, REPORT_FILE,
};
pub use runner::{check_ambiguity, check_bindings, run_dispatch, RunInputs, RunOptions};
