use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use pds_cli::cli::{Commands, InputArgs, PlantsCommands, ScenariosCommands};
use pds_cli::config::PdsConfig;
use pds_core::{PlantRegistry, ScenarioCatalog};
use pds_io::{load_plant_map, load_scenario_catalog, TextEncoding};
use tracing::info;

pub mod apply;
pub mod plants;
pub mod scenarios;
pub mod telemetry;
pub mod validate;

pub fn handle(command: &Commands, config: &PdsConfig) -> Result<()> {
    match command {
        Commands::Apply(args) => apply::handle(args, config),
        Commands::Plants {
            command:
                PlantsCommands::List {
                    inputs,
                    raw,
                    format,
                },
        } => plants::list(inputs, *raw, *format, config),
        Commands::Scenarios {
            command:
                ScenariosCommands::List {
                    inputs,
                    stages,
                    format,
                },
        } => scenarios::list(inputs, stages, *format, config),
        Commands::Validate(args) => validate::handle(args, config),
    }
}

/// Flag value, else the config value, else an error naming both.
pub fn require_path(
    flag: &Option<PathBuf>,
    configured: &Option<PathBuf>,
    flag_name: &str,
) -> Result<PathBuf> {
    flag.clone().or_else(|| configured.clone()).ok_or_else(|| {
        anyhow!(
            "missing --{} (or `{}` under [inputs] in the config)",
            flag_name,
            flag_name.replace('-', "_")
        )
    })
}

pub fn encoding(inputs: &InputArgs, config: &PdsConfig) -> Result<TextEncoding> {
    match &inputs.encoding {
        Some(name) => Ok(name.parse()?),
        None => config.encoding(),
    }
}

/// Load the plant map, normalized unless `raw`.
pub fn load_registry(path: &Path, encoding: TextEncoding, raw: bool) -> Result<PlantRegistry> {
    let mut registry = load_plant_map(path, encoding)
        .with_context(|| format!("loading plant map {}", path.display()))?;
    if !raw {
        registry
            .normalize()
            .with_context(|| format!("normalizing weights of {}", path.display()))?;
    }
    info!(path = %path.display(), plants = registry.len(), "loaded plant map");
    Ok(registry)
}

/// Load the scenario table, keeping only `stages` when any are given.
pub fn load_catalog(path: &Path, encoding: TextEncoding, stages: &[u32]) -> Result<ScenarioCatalog> {
    let catalog = load_scenario_catalog(path, encoding)
        .with_context(|| format!("loading scenarios {}", path.display()))?;
    let catalog = if stages.is_empty() {
        catalog
    } else {
        catalog.filter_stages(stages)
    };
    info!(path = %path.display(), scenarios = catalog.len(), "loaded scenarios");
    Ok(catalog)
}
