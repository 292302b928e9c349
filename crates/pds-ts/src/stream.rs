//! Streaming series backend.
//!
//! Only the header is kept in memory. Opening the file makes one validating
//! pass over every row; each lookup then scans from the top until the first
//! matching row, and the last row found is cached, so repeated lookups for
//! one scenario cost a single scan.

use std::io::Read;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use pds_core::{PdsError, PdsResult, ScenarioKey};
use pds_io::TextEncoding;
use tracing::{debug, trace};

use crate::cells::{self, COORDINATE_COLUMNS};
use crate::handle::{RowSelector, SeriesBackend};

type Reader = csv::Reader<Box<dyn Read + Send>>;

pub struct StreamSeries {
    path: PathBuf,
    encoding: TextEncoding,
    entities: Vec<String>,
    cached: Option<(RowSelector, Vec<Option<f64>>)>,
}

impl StreamSeries {
    /// Open `path`, read its header and check every row.
    pub fn open(path: &Path, encoding: TextEncoding) -> PdsResult<Self> {
        let mut reader = reader_for(path, encoding)?;
        let header = reader
            .headers()
            .map_err(|err| csv_error(path, err))?
            .clone();
        let entities = cells::entities(header.iter()).map_err(|err| format_error(path, err))?;
        let series = Self {
            path: path.to_path_buf(),
            encoding,
            entities,
            cached: None,
        };

        let mut record = StringRecord::new();
        let mut rows = 0usize;
        while let Some(line) = series.next_row(&mut reader, &mut record)? {
            series.key_of(&record, line)?;
            series.values_of(&record, line)?;
            rows += 1;
        }
        debug!(
            path = %path.display(),
            rows,
            entities = series.entities.len(),
            "checked series"
        );
        Ok(series)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Next non-blank row of the right width, with its line number.
    fn next_row(
        &self,
        reader: &mut Reader,
        record: &mut StringRecord,
    ) -> PdsResult<Option<usize>> {
        loop {
            let more = reader
                .read_record(record)
                .map_err(|err| csv_error(&self.path, err))?;
            if !more {
                return Ok(None);
            }
            if cells::is_blank(record) {
                continue;
            }
            let line = record.position().map(|pos| pos.line() as usize).unwrap_or(0);
            cells::check_width(record, COORDINATE_COLUMNS + self.entities.len(), line)
                .map_err(|err| format_error(&self.path, err))?;
            return Ok(Some(line));
        }
    }

    fn scan(&self, selector: RowSelector) -> PdsResult<Option<Vec<Option<f64>>>> {
        let mut reader = reader_for(&self.path, self.encoding)?;
        let mut record = StringRecord::new();
        while let Some(line) = self.next_row(&mut reader, &mut record)? {
            let key = self.key_of(&record, line)?;
            if selector.matches(key.stage, key.run, key.interval) {
                trace!(path = %self.path.display(), line, "matched series row");
                return self.values_of(&record, line).map(Some);
            }
        }
        Ok(None)
    }

    fn key_of(&self, record: &StringRecord, line: usize) -> PdsResult<ScenarioKey> {
        let field = |column: usize| {
            cells::coordinate(&record[column], column, line)
                .map_err(|err| format_error(&self.path, err))
        };
        Ok(ScenarioKey::new(field(0)?, field(1)?, field(2)?))
    }

    fn values_of(&self, record: &StringRecord, line: usize) -> PdsResult<Vec<Option<f64>>> {
        self.entities
            .iter()
            .zip(record.iter().skip(COORDINATE_COLUMNS))
            .map(|(entity, raw)| {
                cells::value(raw, entity, line).map_err(|err| format_error(&self.path, err))
            })
            .collect()
    }
}

impl SeriesBackend for StreamSeries {
    fn entities(&self) -> &[String] {
        &self.entities
    }

    fn row(&mut self, selector: RowSelector) -> PdsResult<Option<&[Option<f64>]>> {
        let hit = matches!(&self.cached, Some((cached, _)) if *cached == selector);
        if !hit {
            match self.scan(selector)? {
                Some(values) => self.cached = Some((selector, values)),
                None => return Ok(None),
            }
        }
        Ok(self.cached.as_ref().map(|(_, values)| values.as_slice()))
    }
}

impl std::fmt::Debug for StreamSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSeries")
            .field("path", &self.path)
            .field("encoding", &self.encoding)
            .field("entities", &self.entities.len())
            .finish()
    }
}

fn reader_for(path: &Path, encoding: TextEncoding) -> PdsResult<Reader> {
    let source = encoding.open_utf8(path)?;
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(source))
}

fn format_error(path: &Path, message: String) -> PdsError {
    PdsError::Format(format!("{}: {}", path.display(), message))
}

fn csv_error(path: &Path, err: csv::Error) -> PdsError {
    match err.kind() {
        csv::ErrorKind::Io(_) => PdsError::Format(format!("{}: {}", path.display(), err)),
        _ => {
            let line = err.position().map(|pos| pos.line()).unwrap_or(0);
            PdsError::Format(format!("{}: line {}: {}", path.display(), line, err))
        }
    }
}
