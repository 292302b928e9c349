//! # pds-ts: scenario-indexed result series
//!
//! Result series are addressed by `(stage, run, interval)` and, for
//! generation series, by plant name. A series file has a header row; its
//! first three columns are the coordinate and each further column is one
//! entity.
//!
//! Two backends sit behind [`SeriesBackend`]:
//!
//! - [`FrameSeries`] reads the file once into a polars `DataFrame` and
//!   indexes it by coordinate.
//! - [`StreamSeries`] keeps only the header and scans the file with the
//!   `csv` crate on each lookup, caching the last row.
//!
//! Both apply the same row rules (see `cells`): blank rows are skipped, every
//! other row is checked when the series is opened, and the first row in file
//! order wins when coordinates repeat. The choice only trades memory for
//! speed.
//!
//! ```rust,no_run
//! use pds_core::ScenarioKey;
//! use pds_ts::{ResolverOptions, TimeSeriesResolver};
//!
//! fn main() -> pds_core::PdsResult<()> {
//!     let resolver = TimeSeriesResolver::new("case/results", ResolverOptions::default());
//!     let mut thermal = resolver.open("gerter")?;
//!     let energy = thermal.resolve(&ScenarioKey::new(1, 1, 1), Some("Angra 1"))?;
//!     println!("{energy} GWh");
//!     Ok(())
//! }
//! ```

mod cells;
pub mod frame;
pub mod handle;
pub mod resolver;
pub mod stream;

pub use cells::COORDINATE_COLUMNS;
pub use frame::FrameSeries;
pub use handle::{RowSelector, SeriesBackend, SeriesHandle};
pub use resolver::{BackendKind, ResolverOptions, SeriesSet, TimeSeriesResolver};
pub use stream::StreamSeries;
