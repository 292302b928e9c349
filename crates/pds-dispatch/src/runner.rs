use std::collections::HashSet;
use std::path::PathBuf;

use pds_core::diagnostics::{CATEGORY_AMBIGUOUS, CATEGORY_MISSING_UNIT};
use pds_core::{
    ClassTable, Diagnostics, PdsError, PdsResult, PlantRegistry, ScenarioCatalog, ScenarioKey,
    SeriesNames,
};
use pds_ts::{SeriesSet, TimeSeriesResolver};
use tracing::{error, info, warn};

use crate::adapter::{apply_scenario, ApplyError, SimulationAdapter, TargetUnit};
use crate::compute::{DispatchComputer, ScenarioPlan};
use crate::report::{write_run_report, RunReport, ScenarioRecord, ScenarioStatus, REPORT_FILE};

/// Loaded tables and the series location for one run.
#[derive(Debug, Clone)]
pub struct RunInputs {
    /// Must already be normalized.
    pub registry: PlantRegistry,
    pub catalog: ScenarioCatalog,
    pub resolver: TimeSeriesResolver,
    pub classes: ClassTable,
    pub series_names: SeriesNames,
}

impl RunInputs {
    pub fn new(
        registry: PlantRegistry,
        catalog: ScenarioCatalog,
        resolver: TimeSeriesResolver,
    ) -> Self {
        Self {
            registry,
            catalog,
            resolver,
            classes: ClassTable::default(),
            series_names: SeriesNames::default(),
        }
    }

    pub fn with_classes(mut self, classes: ClassTable) -> Self {
        self.classes = classes;
        self
    }

    pub fn with_series_names(mut self, series_names: SeriesNames) -> Self {
        self.series_names = series_names;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Record a failed scenario and move on instead of stopping the run.
    pub continue_on_error: bool,
    /// Compute setpoints without touching the model.
    pub dry_run: bool,
    /// Where to write `dispatch_report.json`; no report file when `None`.
    pub report_dir: Option<PathBuf>,
}

/// Apply every scenario of the catalog, in catalog order, through `adapter`.
///
/// Series and table problems that concern the whole run (a missing series
/// file, for instance) fail before any scenario is touched. A scenario that
/// fails stops the run unless `continue_on_error` is set. A plan is computed
/// in full before any write, so a planning failure leaves the model
/// untouched; an adapter failure part-way through is recorded with the
/// number of writes already issued, and that scenario is never saved.
pub fn run_dispatch<A>(
    inputs: &RunInputs,
    adapter: &mut A,
    options: &RunOptions,
) -> PdsResult<RunReport>
where
    A: SimulationAdapter + ?Sized,
{
    let units = adapter.list_target_units()?;
    let mut report = RunReport::new(options.dry_run);
    report.diagnostics = check_bindings(&inputs.registry, &units);

    let computer = DispatchComputer::new(
        &inputs.registry,
        inputs.classes.clone(),
        inputs.series_names.clone(),
    );
    let mut series = SeriesSet::open(
        &inputs.resolver,
        computer.series_names(),
        &computer.required_categories(),
    )?;

    info!(
        scenarios = inputs.catalog.len(),
        units = units.len(),
        plants = inputs.registry.len(),
        dry_run = options.dry_run,
        "dispatch started"
    );

    for (key, label) in inputs.catalog.iter() {
        let outcome = computer
            .plan_scenario(*key, &units, &mut series)
            .map_err(ApplyError::from)
            .and_then(|plan| {
                let writes = if options.dry_run {
                    0
                } else {
                    apply_scenario(adapter, label, &plan.setpoints)?
                };
                Ok((plan, writes))
            });
        match outcome {
            Ok((plan, writes)) => {
                let status = if options.dry_run {
                    ScenarioStatus::Planned
                } else {
                    ScenarioStatus::Applied
                };
                report.push(success_record(label, plan, status, writes));
            }
            Err(ApplyError { writes, source }) => {
                error!(scenario = %key, label, writes, "scenario failed: {source}");
                report.push(failure_record(*key, label, writes, source.to_string()));
                if !options.continue_on_error {
                    finish(&report, options)?;
                    return Err(source);
                }
            }
        }
    }

    finish(&report, options)?;
    info!(
        success = report.success,
        failure = report.failure,
        writes = report.total_writes,
        skipped = report.skipped_count(),
        "dispatch finished"
    );
    Ok(report)
}

/// Load-time warnings: units claimed by several plants, and mapped units the
/// model does not have.
pub fn check_bindings(registry: &PlantRegistry, units: &[TargetUnit]) -> Diagnostics {
    let mut diagnostics = check_ambiguity(registry);
    let known: HashSet<&str> = units.iter().map(|unit| unit.name.as_str()).collect();
    for name in registry.target_unit_names() {
        if !known.contains(name) {
            warn!(unit = name, "mapped unit is not in the target model");
            diagnostics.add_warning_with_entity(
                CATEGORY_MISSING_UNIT,
                "mapped unit is not in the target model",
                name,
            );
        }
    }
    diagnostics
}

/// One warning per unit that more than one plant claims. The first plant in
/// table order is the one used.
pub fn check_ambiguity(registry: &PlantRegistry) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    for (unit, plants) in registry.ambiguous_targets() {
        let names: Vec<String> = plants.iter().map(|plant| plant.to_string()).collect();
        let message = format!(
            "claimed by {} plants ({}); using {}",
            names.len(),
            names.join(", "),
            names[0]
        );
        diagnostics.add_warning_with_entity(CATEGORY_AMBIGUOUS, &message, &unit);
    }
    diagnostics
}

fn finish(report: &RunReport, options: &RunOptions) -> PdsResult<()> {
    if let Some(dir) = &options.report_dir {
        let path = dir.join(REPORT_FILE);
        write_run_report(&path, report)
            .map_err(|err| PdsError::Io(std::io::Error::other(format!("{err:#}"))))?;
        info!(path = %path.display(), "wrote dispatch report");
    }
    Ok(())
}

fn success_record(
    label: &str,
    plan: ScenarioPlan,
    status: ScenarioStatus,
    writes: usize,
) -> ScenarioRecord {
    let skipped_units = plan
        .skipped_units()
        .into_iter()
        .map(str::to_string)
        .collect();
    ScenarioRecord {
        stage: plan.key.stage,
        run: plan.key.run,
        interval: plan.key.interval,
        label: label.to_string(),
        status,
        writes,
        duration_h: Some(plan.duration.value()),
        skipped_units,
        setpoints: plan.setpoints,
        error: None,
    }
}

fn failure_record(
    key: ScenarioKey,
    label: &str,
    writes: usize,
    message: String,
) -> ScenarioRecord {
    ScenarioRecord {
        stage: key.stage,
        run: key.run,
        interval: key.interval,
        label: label.to_string(),
        status: ScenarioStatus::Failed,
        writes,
        duration_h: None,
        skipped_units: Vec::new(),
        setpoints: Vec::new(),
        error: Some(message),
    }
}
