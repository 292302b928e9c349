//! Locating result-series files inside a case directory.
//!
//! A series named `gerhid` lives next to its siblings as `gerhid.csv` (or
//! `gerhid.parquet` when that feature is enabled). Extensions are tried in a
//! fixed order and the first existing file wins.

use std::path::{Path, PathBuf};

use pds_core::{PdsError, PdsResult};

/// On-disk form of a result series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesFormat {
    Csv,
    Parquet,
}

impl SeriesFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SeriesFormat::Csv => "csv",
            SeriesFormat::Parquet => "parquet",
        }
    }

    /// Formats this build can read, in lookup order.
    pub fn supported() -> &'static [SeriesFormat] {
        if cfg!(feature = "parquet") {
            &[SeriesFormat::Csv, SeriesFormat::Parquet]
        } else {
            &[SeriesFormat::Csv]
        }
    }
}

/// Binary result formats that may sit next to the text exports.
const BINARY_EXTENSIONS: &[&str] = &["hdr", "dat", "bin"];

/// A series file found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesFile {
    pub name: String,
    pub path: PathBuf,
    pub format: SeriesFormat,
}

/// Find the file backing `series_name` under `base`.
///
/// Returns [`PdsError::SeriesNotFound`] when no supported file exists. If
/// only a binary export is present the error says so, since converting it is
/// the usual fix.
pub fn locate_series(base: &Path, series_name: &str) -> PdsResult<SeriesFile> {
    for format in SeriesFormat::supported() {
        let candidate = base.join(format!("{}.{}", series_name, format.extension()));
        if candidate.is_file() {
            return Ok(SeriesFile {
                name: series_name.to_string(),
                path: candidate,
                format: *format,
            });
        }
    }

    let binary: Vec<String> = BINARY_EXTENSIONS
        .iter()
        .map(|ext| base.join(format!("{}.{}", series_name, ext)))
        .filter(|path| path.is_file())
        .map(|path| path.display().to_string())
        .collect();
    let base_display = if binary.is_empty() {
        base.display().to_string()
    } else {
        format!(
            "{} (only binary exports found: {}; export the series as CSV)",
            base.display(),
            binary.join(", ")
        )
    };
    Err(PdsError::SeriesNotFound {
        series: series_name.to_string(),
        base: base_display,
    })
}
