use std::io::{stdout, Write};

use anyhow::{bail, Result};
use pds_cli::cli::ValidateArgs;
use pds_cli::common::{write_rows, TableRow};
use pds_cli::config::PdsConfig;
use pds_core::diagnostics::CATEGORY_UNMAPPED;
use pds_core::{
    ClassTable, DiagnosticIssue, Diagnostics, PlantRegistry, ScenarioCatalog, SeriesNames,
    Severity,
};
use pds_dispatch::{check_ambiguity, check_bindings, UnitModel};
use pds_ts::{ResolverOptions, SeriesSet, TimeSeriesResolver};
use serde::Serialize;
use tracing::info;

use super::{encoding, load_catalog, load_registry, require_path};

const CATEGORY_CLASS: &str = "unknown-class";
const CATEGORY_SERIES: &str = "series";
const CATEGORY_DURATION: &str = "duration";

#[derive(Serialize)]
struct IssueRow<'a> {
    severity: &'static str,
    category: &'a str,
    entity: &'a str,
    message: &'a str,
}

impl<'a> From<&'a DiagnosticIssue> for IssueRow<'a> {
    fn from(issue: &'a DiagnosticIssue) -> Self {
        Self {
            severity: match issue.severity {
                Severity::Warning => "warning",
                Severity::Error => "error",
            },
            category: &issue.category,
            entity: issue.entity.as_deref().unwrap_or(""),
            message: &issue.message,
        }
    }
}

impl TableRow for IssueRow<'_> {
    fn header() -> &'static [&'static str] {
        &["SEVERITY", "CATEGORY", "ENTITY", "MESSAGE"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.severity.to_string(),
            self.category.to_string(),
            self.entity.to_string(),
            self.message.to_string(),
        ]
    }
}

/// Load every input the way `apply` would and report what it would trip
/// over, without touching a model.
pub fn handle(args: &ValidateArgs, config: &PdsConfig) -> Result<()> {
    let configured = &config.inputs;
    let plant_map = require_path(&args.inputs.plant_map, &configured.plant_map, "plant-map")?;
    let scenarios = require_path(&args.inputs.scenarios, &configured.scenarios, "scenarios")?;
    let units = args.units.clone().or_else(|| configured.units.clone());
    let case_path = args.case_path.clone().or_else(|| configured.case_path.clone());
    let encoding = encoding(&args.inputs, config)?;

    let registry = load_registry(&plant_map, encoding, false)?;
    let catalog = load_catalog(&scenarios, encoding, &[])?;

    let mut diagnostics = match &units {
        Some(path) => {
            let model = UnitModel::load(path, encoding)?;
            check_units(&registry, &config.class_table(), &model)
        }
        None => check_ambiguity(&registry),
    };

    if let Some(case_path) = &case_path {
        let resolver = TimeSeriesResolver::new(
            case_path,
            ResolverOptions {
                backend: configured.backend,
                encoding,
            },
        );
        diagnostics.merge(check_series(
            &registry,
            &catalog,
            &resolver,
            &config.series_names()?,
        ));
    }

    let rows: Vec<IssueRow> = diagnostics.issues.iter().map(IssueRow::from).collect();
    let mut out = stdout();
    write_rows(&rows, args.format, &mut out)?;
    if !args.format.is_machine_readable() {
        writeln!(out, "\n{}", diagnostics.summary())?;
    }
    info!(
        plants = registry.len(),
        scenarios = catalog.len(),
        "validation: {}",
        diagnostics.summary()
    );
    if diagnostics.has_errors() {
        bail!("validation failed: {}", diagnostics.summary());
    }
    Ok(())
}

fn check_units(registry: &PlantRegistry, classes: &ClassTable, model: &UnitModel) -> Diagnostics {
    let mut diagnostics = check_bindings(registry, model.units());
    for unit in model.units() {
        if registry.find_plant_for_target(&unit.name).is_none() {
            diagnostics.add_warning_with_entity(
                CATEGORY_UNMAPPED,
                "no plant maps to this unit",
                &unit.name,
            );
        }
        if classes.get(&unit.class).is_none() {
            diagnostics.add_error_with_entity(
                CATEGORY_CLASS,
                &format!("class '{}' has no power attribute", unit.class),
                &unit.name,
            );
        }
    }
    diagnostics
}

/// Resolve the duration of every scenario and the generation of every mapped
/// plant, collecting each failure instead of stopping at the first.
fn check_series(
    registry: &PlantRegistry,
    catalog: &ScenarioCatalog,
    resolver: &TimeSeriesResolver,
    names: &SeriesNames,
) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    let mut series = match SeriesSet::open(resolver, names, &registry.required_categories()) {
        Ok(series) => series,
        Err(err) => {
            diagnostics.add_error_with_entity(
                CATEGORY_SERIES,
                &err.to_string(),
                &resolver.base().display().to_string(),
            );
            return diagnostics;
        }
    };

    for (key, label) in catalog.iter() {
        match series.duration(key) {
            Ok(hours) if hours.is_valid_interval() => {}
            Ok(hours) => diagnostics.add_error_with_entity(
                CATEGORY_DURATION,
                &format!("duration {} of {} is not a usable interval", hours, key),
                label,
            ),
            Err(err) => {
                diagnostics.add_error_with_entity(CATEGORY_DURATION, &err.to_string(), label)
            }
        }
        for (plant, _) in registry.iter() {
            if let Err(err) = series.generation(plant.category(), key, plant.name()) {
                diagnostics.add_error_with_entity(CATEGORY_SERIES, &err.to_string(), label);
            }
        }
    }
    diagnostics
}
