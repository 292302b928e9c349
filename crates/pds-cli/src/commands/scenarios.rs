use std::io::stdout;

use anyhow::Result;
use pds_cli::cli::InputArgs;
use pds_cli::common::{write_rows, OutputFormat, TableRow};
use pds_cli::config::PdsConfig;
use serde::Serialize;

use super::{encoding, load_catalog, require_path};

#[derive(Serialize)]
struct ScenarioRow<'a> {
    stage: u32,
    run: u32,
    interval: u32,
    label: &'a str,
}

impl TableRow for ScenarioRow<'_> {
    fn header() -> &'static [&'static str] {
        &["STAGE", "RUN", "INTERVAL", "LABEL"]
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.stage.to_string(),
            self.run.to_string(),
            self.interval.to_string(),
            self.label.to_string(),
        ]
    }
}

pub fn list(
    inputs: &InputArgs,
    stages: &[u32],
    format: OutputFormat,
    config: &PdsConfig,
) -> Result<()> {
    let path = require_path(&inputs.scenarios, &config.inputs.scenarios, "scenarios")?;
    let catalog = load_catalog(&path, encoding(inputs, config)?, stages)?;
    let rows: Vec<ScenarioRow> = catalog
        .iter()
        .map(|(key, label)| ScenarioRow {
            stage: key.stage,
            run: key.run,
            interval: key.interval,
            label,
        })
        .collect();
    write_rows(&rows, format, &mut stdout())?;
    Ok(())
}
