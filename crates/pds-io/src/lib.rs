//! # pds-io: input tables and series discovery
//!
//! Reads the tabular inputs of a dispatch run and finds result-series files
//! on disk.
//!
//! | Table      | Columns                                                  |
//! |------------|----------------------------------------------------------|
//! | plant map  | `system, category, plant_name, weight, target_unit_name` |
//! | scenarios  | `stage, run, interval, label`                            |
//! | units      | `name, class`                                            |
//!
//! ```rust,no_run
//! use std::path::Path;
//! use pds_io::{load_plant_map, TextEncoding};
//!
//! fn main() -> pds_core::PdsResult<()> {
//!     let mut registry = load_plant_map(Path::new("plant_elm_map.csv"), TextEncoding::Utf8)?;
//!     registry.normalize()?;
//!     println!("{} plants", registry.len());
//!     Ok(())
//! }
//! ```

pub mod encoding;
pub mod series_files;
pub mod tables;

pub use encoding::{Latin1Reader, TextEncoding};
pub use series_files::{locate_series, SeriesFile, SeriesFormat};
pub use tables::{
    load_plant_map, load_scenario_catalog, load_unit_table, read_plant_map,
    read_scenario_catalog, read_unit_table, UnitRow,
};
