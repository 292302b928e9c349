//! `pds.toml`: default inputs, series names and class conversions.
//!
//! ```toml
//! [inputs]
//! plant_map = "plant_elm_map.csv"
//! scenarios = "scenarios.csv"
//! units = "units.csv"
//! case_path = "case/results"
//! encoding = "latin1"
//! backend = "stream"
//!
//! [series]
//! hydro = "gerhid"
//! duration = "duraci"
//!
//! [classes.ElmGenstat]
//! attribute = "pgini"
//! factor = 1.0
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Command-line flags win over values from the file.

use anyhow::{anyhow, Context, Result};
use pds_core::{ClassConversion, ClassTable, PlantCategory, SeriesNames};
use pds_io::TextEncoding;
use pds_ts::BackendKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "pds.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PdsConfig {
    #[serde(default)]
    pub inputs: InputsConfig,
    /// Series name overrides keyed by plant category, plus `duration`
    #[serde(default)]
    pub series: BTreeMap<String, String>,
    /// Element class overrides, merged over the built-in classes
    #[serde(default)]
    pub classes: BTreeMap<String, ClassConversion>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputsConfig {
    #[serde(default)]
    pub plant_map: Option<PathBuf>,
    #[serde(default)]
    pub scenarios: Option<PathBuf>,
    #[serde(default)]
    pub units: Option<PathBuf>,
    #[serde(default)]
    pub case_path: Option<PathBuf>,
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default)]
    pub backend: BackendKind,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            plant_map: None,
            scenarios: None,
            units: None,
            case_path: None,
            out_dir: None,
            encoding: default_encoding(),
            backend: BackendKind::default(),
        }
    }
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl PdsConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: PdsConfig = toml::from_str(text)?;
        Ok(config)
    }

    /// Series names with the `[series]` overrides applied.
    pub fn series_names(&self) -> Result<SeriesNames> {
        let mut names = SeriesNames::default();
        for (key, series) in &self.series {
            if key == "duration" {
                names = names.with_duration(series.clone());
            } else {
                let category: PlantCategory = key
                    .parse()
                    .with_context(|| format!("[series] key '{}'", key))?;
                names = names.with_category(category, series.clone());
            }
        }
        Ok(names)
    }

    /// Built-in classes with the `[classes.*]` overrides applied.
    pub fn class_table(&self) -> ClassTable {
        self.classes
            .iter()
            .fold(ClassTable::default(), |table, (class, conversion)| {
                table.with_class(class.clone(), conversion.clone())
            })
    }

    pub fn log_level(&self) -> Result<tracing::Level> {
        self.logging
            .level
            .parse()
            .map_err(|_| anyhow!("[logging] level '{}' is not a log level", self.logging.level))
    }

    pub fn encoding(&self) -> Result<TextEncoding> {
        Ok(self.inputs.encoding.parse()?)
    }
}

/// Load `explicit`, or `./pds.toml` when it exists, or the defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<PdsConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !fallback.is_file() {
                return Ok(PdsConfig::default());
            }
            fallback
        }
    };
    let contents =
        fs::read_to_string(&path).with_context(|| format!("reading config {}", path.display()))?;
    PdsConfig::from_toml(&contents).with_context(|| format!("parsing config {}", path.display()))
}
