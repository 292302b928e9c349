use std::io::stdout;

use anyhow::Result;
use pds_cli::cli::InputArgs;
use pds_cli::common::{write_rows, OutputFormat, TableRow};
use pds_cli::config::PdsConfig;
use serde::Serialize;

use super::{encoding, load_registry, require_path};

#[derive(Serialize)]
struct PlantRow<'a> {
    system: &'a str,
    category: &'static str,
    plant: &'a str,
    unit: &'a str,
    weight: f64,
}

impl TableRow for PlantRow<'_> {
    fn header() -> &'static [&'static str] {
        &["SYSTEM", "CATEGORY", "PLANT", "UNIT", "WEIGHT"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.system.to_string(),
            self.category.to_string(),
            self.plant.to_string(),
            self.unit.to_string(),
            format!("{:.6}", self.weight),
        ]
    }
}

pub fn list(inputs: &InputArgs, raw: bool, format: OutputFormat, config: &PdsConfig) -> Result<()> {
    let path = require_path(&inputs.plant_map, &config.inputs.plant_map, "plant-map")?;
    let registry = load_registry(&path, encoding(inputs, config)?, raw)?;
    let rows: Vec<PlantRow> = registry
        .iter()
        .flat_map(|(key, entries)| {
            entries.iter().map(move |entry| PlantRow {
                system: key.system(),
                category: key.category().as_str(),
                plant: key.name(),
                unit: &entry.target_unit,
                weight: entry.weight,
            })
        })
        .collect();
    write_rows(&rows, format, &mut stdout())?;
    Ok(())
}
