//! The backend seam and the handle callers resolve values through.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use pds_core::{Hours, PdsError, PdsResult, ScenarioKey};

/// Which row of a series a lookup addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSelector {
    /// The row at exactly this (stage, run, interval).
    Exact(ScenarioKey),
    /// The first row, in storage order, at this (stage, interval), whatever
    /// its run.
    AnyRun { stage: u32, interval: u32 },
}

impl RowSelector {
    pub fn matches(&self, stage: u32, run: u32, interval: u32) -> bool {
        match *self {
            RowSelector::Exact(key) => {
                key.stage == stage && key.run == run && key.interval == interval
            }
            RowSelector::AnyRun {
                stage: s,
                interval: i,
            } => s == stage && i == interval,
        }
    }

    fn describe(&self) -> String {
        match self {
            RowSelector::Exact(key) => key.to_string(),
            RowSelector::AnyRun { stage, interval } => {
                format!("(stage {}, any run, interval {})", stage, interval)
            }
        }
    }
}

/// Storage behind a series. Implementations must agree on every lookup for
/// the same file: the caller cannot tell which one it is talking to.
pub trait SeriesBackend: Send {
    /// Entity (agent) names, in column order.
    fn entities(&self) -> &[String];

    /// All entity values of the selected row, or `None` if no row matches.
    /// A `None` cell is an empty field in the source.
    fn row(&mut self, selector: RowSelector) -> PdsResult<Option<&[Option<f64>]>>;
}

/// An opened series.
pub struct SeriesHandle {
    name: String,
    path: PathBuf,
    entity_index: HashMap<String, usize>,
    backend: Box<dyn SeriesBackend>,
}

impl SeriesHandle {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        backend: Box<dyn SeriesBackend>,
    ) -> Self {
        let mut entity_index = HashMap::new();
        for (idx, entity) in backend.entities().iter().enumerate() {
            entity_index.entry(entity.clone()).or_insert(idx);
        }
        Self {
            name: name.into(),
            path: path.into(),
            entity_index,
            backend,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entities(&self) -> &[String] {
        self.backend.entities()
    }

    /// Value at `key` for `entity`, or for the first value column when
    /// `entity` is `None`.
    pub fn resolve(&mut self, key: &ScenarioKey, entity: Option<&str>) -> PdsResult<f64> {
        self.lookup(RowSelector::Exact(*key), entity)
    }

    /// Interval length for `key`.
    ///
    /// Durations depend only on stage and interval, so the run component of
    /// `key` is ignored: the first row with a matching stage and interval is
    /// used regardless of its run.
    pub fn resolve_duration(&mut self, key: &ScenarioKey) -> PdsResult<Hours> {
        let (stage, interval) = key.stage_interval();
        self.lookup(RowSelector::AnyRun { stage, interval }, None)
            .map(Hours)
    }

    fn lookup(&mut self, selector: RowSelector, entity: Option<&str>) -> PdsResult<f64> {
        let column = match entity {
            Some(name) => *self.entity_index.get(name).ok_or_else(|| {
                PdsError::ValueNotFound {
                    series: self.name.clone(),
                    coordinate: format!("entity '{}' (no such column)", name),
                }
            })?,
            None => 0,
        };
        let name = &self.name;
        let not_found = || PdsError::ValueNotFound {
            series: name.clone(),
            coordinate: match entity {
                Some(entity) => format!("{} entity '{}'", selector.describe(), entity),
                None => selector.describe(),
            },
        };
        let row = self.backend.row(selector)?.ok_or_else(not_found)?;
        row.get(column).copied().flatten().ok_or_else(not_found)
    }
}

impl std::fmt::Debug for SeriesHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesHandle")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("entities", &self.backend.entities().len())
            .finish()
    }
}
