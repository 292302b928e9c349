//! Fully materialized series backend.
//!
//! The whole file is read once into a polars `DataFrame`, then re-indexed
//! row-wise by coordinate so each lookup is a hash probe.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use pds_core::{PdsError, PdsResult, ScenarioKey};
use pds_io::{SeriesFile, SeriesFormat, TextEncoding};
use polars::prelude::*;
use tracing::debug;

use crate::cells::{self, COORDINATE_COLUMNS};
use crate::handle::{RowSelector, SeriesBackend};

/// In-memory series indexed by coordinate.
#[derive(Debug, Clone, Default)]
pub struct FrameSeries {
    entities: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
    exact: HashMap<ScenarioKey, usize>,
    any_run: HashMap<(u32, u32), usize>,
}

impl FrameSeries {
    pub fn new(entities: Vec<String>) -> Self {
        Self {
            entities,
            ..Self::default()
        }
    }

    /// Append a row. When a coordinate repeats, lookups keep returning the
    /// earlier row.
    pub fn push_row(&mut self, key: ScenarioKey, values: Vec<Option<f64>>) -> PdsResult<()> {
        if values.len() != self.entities.len() {
            return Err(PdsError::Format(format!(
                "row {} has {} values for {} entities",
                key,
                values.len(),
                self.entities.len()
            )));
        }
        let slot = self.rows.len();
        self.rows.push(values);
        self.exact.entry(key).or_insert(slot);
        self.any_run.entry(key.stage_interval()).or_insert(slot);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Build the table from a data frame whose first three columns are the
    /// coordinate and whose remaining columns are entities. Errors name
    /// `row + 2`, the file line when the frame came from a CSV with a header
    /// and no blank rows.
    pub fn from_frame(df: &DataFrame) -> PdsResult<Self> {
        let columns = df.get_columns();
        let entities =
            cells::entities(columns.iter().map(|series| series.name())).map_err(PdsError::Format)?;

        let mut coordinates: Vec<Vec<Option<f64>>> = Vec::with_capacity(COORDINATE_COLUMNS);
        for series in &columns[..COORDINATE_COLUMNS] {
            coordinates.push(float_column(series)?);
        }
        let mut values: Vec<Vec<Option<f64>>> = Vec::with_capacity(entities.len());
        for series in &columns[COORDINATE_COLUMNS..] {
            values.push(float_column(series)?);
        }

        let mut table = FrameSeries::new(entities);
        for row in 0..df.height() {
            let line = row + 2;
            let coordinate = |column: usize| {
                cells::numeric_coordinate(coordinates[column][row], column, line)
                    .map_err(PdsError::Format)
            };
            let key = ScenarioKey::new(coordinate(0)?, coordinate(1)?, coordinate(2)?);
            table.push_row(key, values.iter().map(|column| column[row]).collect())?;
        }
        Ok(table)
    }

    /// Read a series file into memory.
    pub fn load(file: &SeriesFile, encoding: TextEncoding) -> PdsResult<Self> {
        let df = read_frame(file, encoding)?;
        let table = Self::from_frame(&df).map_err(|err| match err {
            PdsError::Format(message) => {
                PdsError::Format(format!("{}: {}", file.path.display(), message))
            }
            other => other,
        })?;
        debug!(
            series = %file.name,
            rows = table.len(),
            entities = table.entities.len(),
            "materialized series"
        );
        Ok(table)
    }
}

impl SeriesBackend for FrameSeries {
    fn entities(&self) -> &[String] {
        &self.entities
    }

    fn row(&mut self, selector: RowSelector) -> PdsResult<Option<&[Option<f64>]>> {
        let slot = match selector {
            RowSelector::Exact(key) => self.exact.get(&key),
            RowSelector::AnyRun { stage, interval } => self.any_run.get(&(stage, interval)),
        };
        Ok(slot.map(|&slot| self.rows[slot].as_slice()))
    }
}

fn float_column(series: &Series) -> PdsResult<Vec<Option<f64>>> {
    let cast = series.strict_cast(&DataType::Float64).map_err(polars_error)?;
    Ok(cast.f64().map_err(polars_error)?.into_iter().collect())
}

fn read_frame(file: &SeriesFile, encoding: TextEncoding) -> PdsResult<DataFrame> {
    let reading = |err: String| PdsError::Format(format!("{}: {}", file.path.display(), err));
    match file.format {
        SeriesFormat::Csv => {
            let bytes = encoding.read_to_utf8(&file.path)?;
            let (normalized, columns) = normalize_csv(&bytes).map_err(reading)?;
            let schema: Schema = columns
                .iter()
                .map(|name| Field::new(name, DataType::Float64))
                .collect();
            CsvReader::new(Cursor::new(normalized))
                .has_header(true)
                .with_dtypes(Some(Arc::new(schema)))
                .finish()
                .map_err(|err| reading(err.to_string()))
        }
        #[cfg(feature = "parquet")]
        SeriesFormat::Parquet => {
            let mut handle = std::fs::File::open(&file.path)?;
            ParquetReader::new(&mut handle)
                .finish()
                .map_err(|err| reading(err.to_string()))
        }
        #[cfg(not(feature = "parquet"))]
        SeriesFormat::Parquet => Err(reading(
            "parquet support is disabled; rebuild with the 'parquet' feature".to_string(),
        )),
    }
}

/// Check every row against the shared cell rules and re-emit the file with
/// trimmed fields, blank rows dropped and coordinates written as integers,
/// so polars reads every column as a float. Returns the header names too.
fn normalize_csv(bytes: &[u8]) -> Result<(Vec<u8>, Vec<String>), String> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(bytes);
    let header = reader.headers().map_err(|err| err.to_string())?.clone();
    let entities = cells::entities(header.iter())?;
    let width = header.len();

    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(&header).map_err(|err| err.to_string())?;
    let mut record = StringRecord::new();
    let mut out = Vec::with_capacity(width);
    while reader.read_record(&mut record).map_err(|err| err.to_string())? {
        if cells::is_blank(&record) {
            continue;
        }
        let line = record.position().map(|pos| pos.line() as usize).unwrap_or(0);
        cells::check_width(&record, width, line)?;
        out.clear();
        for (column, raw) in record.iter().enumerate().take(COORDINATE_COLUMNS) {
            out.push(cells::coordinate(raw, column, line)?.to_string());
        }
        for (entity, raw) in entities.iter().zip(record.iter().skip(COORDINATE_COLUMNS)) {
            cells::value(raw, entity, line)?;
            out.push(raw.to_string());
        }
        writer.write_record(&out).map_err(|err| err.to_string())?;
    }
    let names = header.iter().map(str::to_string).collect();
    let bytes = writer.into_inner().map_err(|err| err.to_string())?;
    Ok((bytes, names))
}

fn polars_error(err: PolarsError) -> PdsError {
    PdsError::Format(err.to_string())
}
