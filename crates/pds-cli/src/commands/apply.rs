use std::io::{stdout, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use pds_cli::cli::ApplyArgs;
use pds_cli::common::{write_rows, OutputFormat, TableRow};
use pds_cli::config::PdsConfig;
use pds_dispatch::{
    run_dispatch, RunInputs, RunOptions, RunReport, ScenarioRecord, UnitModel, REPORT_FILE,
};
use pds_ts::{BackendKind, ResolverOptions, TimeSeriesResolver};
use serde::Serialize;
use tracing::{info, warn};

use super::telemetry::record_run_timed;
use super::{encoding, load_catalog, load_registry, require_path};

#[derive(Serialize)]
struct ScenarioRow<'a> {
    stage: u32,
    run: u32,
    interval: u32,
    label: &'a str,
    status: &'static str,
    writes: usize,
    skipped: usize,
    error: &'a str,
}

impl<'a> From<&'a ScenarioRecord> for ScenarioRow<'a> {
    fn from(record: &'a ScenarioRecord) -> Self {
        Self {
            stage: record.stage,
            run: record.run,
            interval: record.interval,
            label: &record.label,
            status: record.status.as_str(),
            writes: record.writes,
            skipped: record.skipped_units.len(),
            error: record.error.as_deref().unwrap_or(""),
        }
    }
}

impl TableRow for ScenarioRow<'_> {
    fn header() -> &'static [&'static str] {
        &[
            "STAGE", "RUN", "INTERVAL", "LABEL", "STATUS", "WRITES", "SKIPPED", "ERROR",
        ]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.stage.to_string(),
            self.run.to_string(),
            self.interval.to_string(),
            self.label.to_string(),
            self.status.to_string(),
            self.writes.to_string(),
            self.skipped.to_string(),
            self.error.to_string(),
        ]
    }
}

#[derive(Serialize)]
struct SetpointRow<'a> {
    label: &'a str,
    unit: &'a str,
    attribute: &'a str,
    value: f64,
}

impl TableRow for SetpointRow<'_> {
    fn header() -> &'static [&'static str] {
        &["LABEL", "UNIT", "ATTRIBUTE", "VALUE"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.label.to_string(),
            self.unit.to_string(),
            self.attribute.to_string(),
            format!("{:.4}", self.value),
        ]
    }
}

pub fn handle(args: &ApplyArgs, config: &PdsConfig) -> Result<()> {
    let start = Instant::now();
    let configured = &config.inputs;
    let plant_map = require_path(&args.inputs.plant_map, &configured.plant_map, "plant-map")?;
    let scenarios = require_path(&args.inputs.scenarios, &configured.scenarios, "scenarios")?;
    let units = require_path(&args.units, &configured.units, "units")?;
    let case_path = require_path(&args.case_path, &configured.case_path, "case-path")?;
    let out_dir = args.out_dir.clone().or_else(|| configured.out_dir.clone());
    let encoding = encoding(&args.inputs, config)?;
    let backend = args
        .backend
        .map(BackendKind::from)
        .unwrap_or(configured.backend);

    let registry = load_registry(&plant_map, encoding, false)?;
    let catalog = load_catalog(&scenarios, encoding, &args.stages)?;
    let mut model = UnitModel::load(&units, encoding)
        .with_context(|| format!("loading units {}", units.display()))?;
    if let (Some(dir), false) = (&out_dir, args.dry_run) {
        model = model.with_output_dir(dir);
    }

    let resolver = TimeSeriesResolver::new(&case_path, ResolverOptions { backend, encoding });
    let inputs = RunInputs::new(registry, catalog, resolver)
        .with_classes(config.class_table())
        .with_series_names(config.series_names()?);
    let options = RunOptions {
        continue_on_error: args.continue_on_error,
        dry_run: args.dry_run,
        report_dir: out_dir.clone(),
    };

    let outcome = run_dispatch(&inputs, &mut model, &options);
    let result: Result<()> = match &outcome {
        Ok(report) => print_report(report, args.format).and_then(|_| check_failures(report)),
        Err(err) => Err(anyhow::anyhow!("{err}")),
    };

    if let Some(dir) = &out_dir {
        let mut outputs: Vec<PathBuf> = vec![dir.join(REPORT_FILE)];
        outputs.extend(model.saved_files());
        let stage_list = args
            .stages
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(",");
        record_run_timed(
            dir,
            "apply",
            &[plant_map.as_path(), scenarios.as_path(), units.as_path()],
            &outputs,
            &[
                ("case_path", &case_path.display().to_string()),
                ("backend", backend.as_str()),
                ("encoding", encoding.as_str()),
                ("stages", &stage_list),
                ("continue_on_error", &args.continue_on_error.to_string()),
                ("dry_run", &args.dry_run.to_string()),
            ],
            start,
            &result,
        );
    }

    outcome?;
    result
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    let mut out = stdout();
    if report.dry_run {
        let rows: Vec<SetpointRow> = report
            .scenarios
            .iter()
            .flat_map(|record| {
                record.setpoints.iter().map(move |setpoint| SetpointRow {
                    label: &record.label,
                    unit: &setpoint.unit,
                    attribute: &setpoint.attribute,
                    value: setpoint.value,
                })
            })
            .collect();
        write_rows(&rows, format, &mut out)?;
    } else {
        let rows: Vec<ScenarioRow> = report.scenarios.iter().map(ScenarioRow::from).collect();
        write_rows(&rows, format, &mut out)?;
    }
    if !format.is_machine_readable() {
        writeln!(
            out,
            "\n{} scenarios: {} ok, {} failed, {} writes, {} units skipped",
            report.num_scenarios,
            report.success,
            report.failure,
            report.total_writes,
            report.skipped_count()
        )?;
    }
    for issue in &report.diagnostics.issues {
        warn!("{issue}");
    }
    info!(
        scenarios = report.num_scenarios,
        success = report.success,
        failure = report.failure,
        writes = report.total_writes,
        skipped = report.skipped_count(),
        "apply summary"
    );
    Ok(())
}

fn check_failures(report: &RunReport) -> Result<()> {
    if report.failure > 0 {
        bail!(
            "{} of {} scenarios failed",
            report.failure,
            report.num_scenarios
        );
    }
    Ok(())
}
