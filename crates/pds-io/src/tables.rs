//! Loaders for the plant map, scenario list and target-unit tables.
//!
//! All three are CSV files with one header row. Columns are read by
//! position; the header is skipped, not interpreted. Fields are trimmed.
//! Any row that cannot be parsed aborts the load with a
//! [`PdsError::Format`] naming the line.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use pds_core::{
    MapEntry, PdsError, PdsResult, PlantCategory, PlantKey, PlantRegistry, ScenarioCatalog,
    ScenarioKey,
};
use tracing::{debug, warn};

use crate::encoding::TextEncoding;

/// Columns: `system, category, plant_name, weight, target_unit_name`.
pub const PLANT_MAP_COLUMNS: usize = 5;
/// Columns: `stage, run, interval, label`.
pub const SCENARIO_COLUMNS: usize = 4;
/// Columns: `name, class`.
pub const UNIT_COLUMNS: usize = 2;

/// A target unit as listed in a units table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRow {
    pub name: String,
    pub class: String,
}

/// Load a plant map file. Weights are returned as written; call
/// [`PlantRegistry::normalize`] before dispatching.
pub fn load_plant_map(path: &Path, encoding: TextEncoding) -> PdsResult<PlantRegistry> {
    let bytes = encoding.read_to_utf8(path)?;
    let registry = read_plant_map(bytes.as_slice()).map_err(|err| with_path(err, path))?;
    debug!(
        path = %path.display(),
        plants = registry.len(),
        "loaded plant map"
    );
    for (unit, plants) in registry.ambiguous_targets() {
        warn!(
            unit = %unit,
            claimants = plants.len(),
            winner = %plants[0],
            "target unit is mapped from several plants; the first row wins"
        );
    }
    Ok(registry)
}

pub fn read_plant_map<R: Read>(reader: R) -> PdsResult<PlantRegistry> {
    let mut registry = PlantRegistry::new();
    for (line, record) in records(reader)? {
        let record = record?;
        let fields = expect_columns(&record, PLANT_MAP_COLUMNS, line)?;
        let category: PlantCategory = fields[1]
            .parse()
            .map_err(|err: PdsError| PdsError::format_at_line(line, strip_prefix(&err)))?;
        let key = PlantKey::new(fields[0], category, fields[2]);
        let weight = parse_number::<f64>(fields[3], "weight", line)?;
        let unit = fields[4];
        if unit.is_empty() {
            return Err(PdsError::format_at_line(line, "target unit name is empty"));
        }
        registry
            .add(key, MapEntry::new(unit, weight))
            .map_err(|err| PdsError::format_at_line(line, strip_prefix(&err)))?;
    }
    Ok(registry)
}

/// Load a scenario list. A coordinate listed twice keeps its first position
/// and takes the later label.
pub fn load_scenario_catalog(path: &Path, encoding: TextEncoding) -> PdsResult<ScenarioCatalog> {
    let bytes = encoding.read_to_utf8(path)?;
    let catalog = read_scenario_catalog(bytes.as_slice()).map_err(|err| with_path(err, path))?;
    debug!(
        path = %path.display(),
        scenarios = catalog.len(),
        "loaded scenario catalog"
    );
    Ok(catalog)
}

pub fn read_scenario_catalog<R: Read>(reader: R) -> PdsResult<ScenarioCatalog> {
    let mut catalog = ScenarioCatalog::new();
    for (line, record) in records(reader)? {
        let record = record?;
        let fields = expect_columns(&record, SCENARIO_COLUMNS, line)?;
        let key = ScenarioKey::new(
            parse_number::<u32>(fields[0], "stage", line)?,
            parse_number::<u32>(fields[1], "run", line)?,
            parse_number::<u32>(fields[2], "interval", line)?,
        );
        if let Some(previous) = catalog.insert(key, fields[3]) {
            warn!(
                scenario = %key,
                previous = %previous,
                label = %fields[3],
                line,
                "duplicate scenario coordinate; keeping the later label"
            );
        }
    }
    Ok(catalog)
}

/// Load a target-unit table (`name, class`).
pub fn load_unit_table(path: &Path, encoding: TextEncoding) -> PdsResult<Vec<UnitRow>> {
    let bytes = encoding.read_to_utf8(path)?;
    read_unit_table(bytes.as_slice()).map_err(|err| with_path(err, path))
}

pub fn read_unit_table<R: Read>(reader: R) -> PdsResult<Vec<UnitRow>> {
    let mut units = Vec::new();
    for (line, record) in records(reader)? {
        let record = record?;
        let fields = expect_columns(&record, UNIT_COLUMNS, line)?;
        if fields[0].is_empty() || fields[1].is_empty() {
            return Err(PdsError::format_at_line(line, "unit name and class are required"));
        }
        units.push(UnitRow {
            name: fields[0].to_string(),
            class: fields[1].to_string(),
        });
    }
    Ok(units)
}

type NumberedRecord = (usize, PdsResult<StringRecord>);

fn records<R: Read>(reader: R) -> PdsResult<impl Iterator<Item = NumberedRecord>> {
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    Ok(reader.into_records().enumerate().map(|(idx, result)| {
        // header is line 1
        let fallback_line = idx + 2;
        match result {
            Ok(record) => {
                let line = record
                    .position()
                    .map(|pos| pos.line() as usize)
                    .unwrap_or(fallback_line);
                (line, Ok(record))
            }
            Err(err) => (fallback_line, Err(csv_error(err, fallback_line))),
        }
    }))
}

fn expect_columns(record: &StringRecord, expected: usize, line: usize) -> PdsResult<Vec<&str>> {
    if record.len() < expected {
        return Err(PdsError::format_at_line(
            line,
            format!("expected {} columns, found {}", expected, record.len()),
        ));
    }
    Ok(record.iter().take(expected).collect())
}

fn parse_number<T: std::str::FromStr>(field: &str, column: &str, line: usize) -> PdsResult<T> {
    field.parse::<T>().map_err(|_| {
        PdsError::format_at_line(line, format!("{} '{}' is not a valid number", column, field))
    })
}

fn csv_error(err: csv::Error, line: usize) -> PdsError {
    let line = err
        .position()
        .map(|pos| pos.line() as usize)
        .unwrap_or(line);
    PdsError::format_at_line(line, err.to_string())
}

/// Message of a format error without its "Format error: " display prefix.
fn strip_prefix(err: &PdsError) -> String {
    match err {
        PdsError::Format(message) => message.clone(),
        other => other.to_string(),
    }
}

fn with_path(err: PdsError, path: &Path) -> PdsError {
    match err {
        PdsError::Format(message) => PdsError::Format(format!("{}: {}", path.display(), message)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const PLANT_MAP: &str = "\
system,category,plant_name,weight,target_unit_name
SYS1,Hydro,Furnas,3.0,G_FUR_1
sys1,hydro,Furnas,1.0,G_FUR_2
sys1,thermal,Angra 1,1,G_ANG
";

    #[test]
    fn reads_plant_map_grouped_by_plant() {
        let registry = read_plant_map(PLANT_MAP.as_bytes()).unwrap();
        assert_eq!(registry.len(), 2);
        let furnas = PlantKey::new("sys1", PlantCategory::Hydro, "Furnas");
        let entries = registry.entries_for_plant(&furnas);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].target_unit, "G_FUR_1");
        assert_eq!(entries[0].weight, 3.0);
    }

    #[test]
    fn non_numeric_weight_is_format_error() {
        let text = "system,category,plant_name,weight,target\ns,hydro,P,abc,G1\n";
        let err = read_plant_map(text.as_bytes()).unwrap_err();
        assert!(matches!(err, PdsError::Format(_)));
        assert!(err.to_string().contains("line 2"));
        assert!(err.to_string().contains("weight 'abc'"));
    }

    #[test]
    fn missing_column_is_format_error() {
        let text = "system,category,plant_name,weight,target\ns,hydro,P,1.0\n";
        let err = read_plant_map(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("expected 5 columns, found 4"));
    }

    #[test]
    fn unknown_category_is_format_error() {
        let text = "system,category,plant_name,weight,target\ns,nuclear,P,1.0,G1\n";
        let err = read_plant_map(text.as_bytes()).unwrap_err();
        assert!(matches!(err, PdsError::Format(_)));
        assert!(err.to_string().contains("nuclear"));
    }

    #[test]
    fn reads_scenarios_in_order_with_last_label_winning() {
        let text = "stage,run,interval,label\n1,1,1,first\n2,1,1,second\n1,1,1,renamed\n";
        let catalog = read_scenario_catalog(text.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 2);
        let labels: Vec<_> = catalog.iter().map(|(_, label)| label).collect();
        assert_eq!(labels, vec!["renamed", "second"]);
    }

    #[test]
    fn negative_stage_is_format_error() {
        let text = "stage,run,interval,label\n-1,1,1,bad\n";
        let err = read_scenario_catalog(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("stage '-1'"));
    }

    #[test]
    fn reads_unit_table() {
        let text = "name,class\nG1,ElmSym\n PV1 , ElmPvsys \n";
        let units = read_unit_table(text.as_bytes()).unwrap();
        assert_eq!(
            units,
            vec![
                UnitRow {
                    name: "G1".into(),
                    class: "ElmSym".into()
                },
                UnitRow {
                    name: "PV1".into(),
                    class: "ElmPvsys".into()
                },
            ]
        );
    }

    #[test]
    fn load_from_latin1_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plant_map.csv");
        let mut bytes = b"system,category,plant_name,weight,target\n".to_vec();
        bytes.extend_from_slice(b"s,hydro,S\xe3o Sim\xe3o,1,G1\n");
        fs::write(&path, bytes).unwrap();

        let registry = load_plant_map(&path, TextEncoding::Latin1).unwrap();
        let key = PlantKey::new("s", PlantCategory::Hydro, "São Simão");
        assert_eq!(registry.entries_for_plant(&key).len(), 1);

        let err = load_plant_map(&path, TextEncoding::Utf8).unwrap_err();
        assert!(err.to_string().contains("plant_map.csv"));
    }
}
