use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use pds_core::{Hours, PdsError, PdsResult, PlantCategory, ScenarioKey, SeriesNames};
use pds_io::{locate_series, SeriesFormat, TextEncoding};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::frame::FrameSeries;
use crate::handle::{SeriesBackend, SeriesHandle};
use crate::stream::StreamSeries;

/// How series files are held while resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Read each file once into memory.
    #[default]
    Frame,
    /// Keep only the header and scan on demand.
    Stream,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Frame => "frame",
            BackendKind::Stream => "stream",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = PdsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "frame" | "table" | "memory" => Ok(BackendKind::Frame),
            "stream" | "streaming" => Ok(BackendKind::Stream),
            other => Err(PdsError::Format(format!(
                "unknown series backend '{}'; use frame or stream",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverOptions {
    pub backend: BackendKind,
    pub encoding: TextEncoding,
}

/// Opens result series that live under one case directory.
#[derive(Debug, Clone)]
pub struct TimeSeriesResolver {
    base: PathBuf,
    options: ResolverOptions,
}

impl TimeSeriesResolver {
    pub fn new(base: impl Into<PathBuf>, options: ResolverOptions) -> Self {
        Self {
            base: base.into(),
            options,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn options(&self) -> ResolverOptions {
        self.options
    }

    /// Open the series `series_name`, trying each supported extension in
    /// turn. Parquet files are always materialized.
    pub fn open(&self, series_name: &str) -> PdsResult<SeriesHandle> {
        let file = locate_series(&self.base, series_name)?;
        let backend: Box<dyn SeriesBackend> = match (self.options.backend, file.format) {
            (BackendKind::Stream, SeriesFormat::Csv) => {
                Box::new(StreamSeries::open(&file.path, self.options.encoding)?)
            }
            _ => Box::new(FrameSeries::load(&file, self.options.encoding)?),
        };
        debug!(
            series = series_name,
            path = %file.path.display(),
            backend = %self.options.backend,
            "opened series"
        );
        Ok(SeriesHandle::new(&file.name, &file.path, backend))
    }
}

/// The duration series plus one generation series per plant category in use.
#[derive(Debug)]
pub struct SeriesSet {
    duration: SeriesHandle,
    generation: BTreeMap<PlantCategory, SeriesHandle>,
}

impl SeriesSet {
    /// Open the duration series and the generation series of `categories`.
    /// Categories outside this set are never touched, so their files may be
    /// absent.
    pub fn open(
        resolver: &TimeSeriesResolver,
        names: &SeriesNames,
        categories: &BTreeSet<PlantCategory>,
    ) -> PdsResult<Self> {
        let duration = resolver.open(names.duration())?;
        let mut generation = BTreeMap::new();
        for &category in categories {
            let handle = resolver.open(names.series_for(category))?;
            generation.insert(category, handle);
        }
        info!(
            base = %resolver.base().display(),
            categories = generation.len(),
            "series opened"
        );
        Ok(Self {
            duration,
            generation,
        })
    }

    pub fn duration_series(&self) -> &SeriesHandle {
        &self.duration
    }

    pub fn generation_series(&self, category: PlantCategory) -> Option<&SeriesHandle> {
        self.generation.get(&category)
    }

    pub fn duration(&mut self, key: &ScenarioKey) -> PdsResult<Hours> {
        self.duration.resolve_duration(key)
    }

    /// Energy produced by `plant` in `key`, read from the series of its
    /// category.
    pub fn generation(
        &mut self,
        category: PlantCategory,
        key: &ScenarioKey,
        plant: &str,
    ) -> PdsResult<f64> {
        let handle = self
            .generation
            .get_mut(&category)
            .ok_or_else(|| PdsError::SeriesNotFound {
                series: category.to_string(),
                base: "series set (category not opened)".to_string(),
            })?;
        handle.resolve(key, Some(plant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const DURATION: &str = "stage,scenario,block,duration\n1,1,1,2\n1,2,1,7\n1,1,2,4\n";
    const THERMAL: &str = "stage, scenario, block, Angra 1, Angra 2\n\
                           1, 1, 1,   50.0,   10\n\
                           1, 2, 1,   60.0,     \n\
                           1, 1, 2,   70.5,   30\n";

    fn case() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("duraci.csv"), DURATION).unwrap();
        fs::write(dir.path().join("gerter.csv"), THERMAL).unwrap();
        dir
    }

    fn resolver(dir: &Path, backend: BackendKind) -> TimeSeriesResolver {
        TimeSeriesResolver::new(
            dir,
            ResolverOptions {
                backend,
                encoding: TextEncoding::Utf8,
            },
        )
    }

    #[test]
    fn backends_agree() {
        let dir = case();
        let mut frame = resolver(dir.path(), BackendKind::Frame)
            .open("gerter")
            .unwrap();
        let mut stream = resolver(dir.path(), BackendKind::Stream)
            .open("gerter")
            .unwrap();
        assert_eq!(frame.entities(), stream.entities());
        for key in [
            ScenarioKey::new(1, 1, 1),
            ScenarioKey::new(1, 2, 1),
            ScenarioKey::new(1, 1, 2),
            ScenarioKey::new(3, 1, 1),
        ] {
            for entity in ["Angra 1", "Angra 2", "Angra 3"] {
                let a = frame.resolve(&key, Some(entity)).map_err(|e| e.to_string());
                let b = stream.resolve(&key, Some(entity)).map_err(|e| e.to_string());
                assert_eq!(a, b, "{} {}", key, entity);
            }
        }
        assert_eq!(
            frame.resolve(&ScenarioKey::new(1, 1, 2), Some("Angra 1")).unwrap(),
            70.5
        );
    }

    #[test]
    fn backends_agree_on_malformed_files() {
        let bad = [
            "stage,run,block,A\n1,1,1,5\n1,2,1,abc\n",
            "stage,run,block,A\n1,1,1,5\nx,2,1,6\n",
            "stage,run,block,A\n1,1,1,5\n1,2,1\n",
            "stage,run,block,A,A\n1,1,1,5,6\n",
            "stage,run,block\n1,1,1\n",
        ];
        for body in bad {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join("gerter.csv"), body).unwrap();
            let frame = resolver(dir.path(), BackendKind::Frame).open("gerter");
            let stream = resolver(dir.path(), BackendKind::Stream).open("gerter");
            let frame = frame.map(|_| ()).map_err(|e| e.to_string());
            let stream = stream.map(|_| ()).map_err(|e| e.to_string());
            assert!(frame.is_err(), "{body:?}");
            assert_eq!(frame, stream, "{body:?}");
        }

        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("gerter.csv"),
            "stage,run,block,A\n,,,\n1,1,1,5\n , , , \n1.0,2,1,\n",
        )
        .unwrap();
        for backend in [BackendKind::Frame, BackendKind::Stream] {
            let mut handle = resolver(dir.path(), backend).open("gerter").unwrap();
            assert_eq!(
                handle.resolve(&ScenarioKey::new(1, 1, 1), Some("A")).unwrap(),
                5.0,
                "{backend}"
            );
            assert!(matches!(
                handle.resolve(&ScenarioKey::new(1, 2, 1), Some("A")),
                Err(PdsError::ValueNotFound { .. })
            ));
        }
    }

    #[test]
    fn duration_ignores_run() {
        let dir = case();
        for backend in [BackendKind::Frame, BackendKind::Stream] {
            let mut duration = resolver(dir.path(), backend).open("duraci").unwrap();
            let by_run_1 = duration.resolve_duration(&ScenarioKey::new(1, 1, 1)).unwrap();
            let by_run_2 = duration.resolve_duration(&ScenarioKey::new(1, 2, 1)).unwrap();
            let by_run_9 = duration.resolve_duration(&ScenarioKey::new(1, 9, 1)).unwrap();
            assert_eq!(by_run_1, Hours(2.0));
            assert_eq!(by_run_2, Hours(2.0));
            assert_eq!(by_run_9, Hours(2.0));
            assert_eq!(
                duration.resolve_duration(&ScenarioKey::new(1, 1, 2)).unwrap(),
                Hours(4.0)
            );
        }
    }

    #[test]
    fn missing_value_is_value_not_found() {
        let dir = case();
        let mut handle = resolver(dir.path(), BackendKind::Frame)
            .open("gerter")
            .unwrap();
        let empty_cell = handle
            .resolve(&ScenarioKey::new(1, 2, 1), Some("Angra 2"))
            .unwrap_err();
        assert!(matches!(empty_cell, PdsError::ValueNotFound { .. }));
        let missing_row = handle
            .resolve(&ScenarioKey::new(2, 1, 1), Some("Angra 1"))
            .unwrap_err();
        assert!(matches!(missing_row, PdsError::ValueNotFound { .. }));
        let missing_entity = handle
            .resolve(&ScenarioKey::new(1, 1, 1), Some("Itaipu"))
            .unwrap_err();
        assert!(missing_entity.to_string().contains("Itaipu"));
    }

    #[test]
    fn missing_series_is_series_not_found() {
        let dir = case();
        let err = resolver(dir.path(), BackendKind::Stream)
            .open("gerhid")
            .unwrap_err();
        assert!(matches!(err, PdsError::SeriesNotFound { .. }));
    }

    #[test]
    fn series_set_opens_only_required_categories() {
        let dir = case();
        let resolver = resolver(dir.path(), BackendKind::Frame);
        let categories: BTreeSet<_> = [PlantCategory::Thermal].into_iter().collect();
        let mut set = SeriesSet::open(&resolver, &SeriesNames::default(), &categories).unwrap();
        assert!(set.generation_series(PlantCategory::Hydro).is_none());
        let key = ScenarioKey::new(1, 1, 1);
        assert_eq!(set.duration(&key).unwrap(), Hours(2.0));
        assert_eq!(
            set.generation(PlantCategory::Thermal, &key, "Angra 2").unwrap(),
            10.0
        );
        assert!(set.generation(PlantCategory::Hydro, &key, "Furnas").is_err());

        let with_hydro: BTreeSet<_> = [PlantCategory::Hydro].into_iter().collect();
        assert!(SeriesSet::open(&resolver, &SeriesNames::default(), &with_hydro).is_err());
    }

    #[test]
    fn latin1_series_names_decode() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("duraci.csv"), DURATION).unwrap();
        let mut body = b"stage,scenario,block,S".to_vec();
        body.push(0xe3);
        body.extend_from_slice(b"o Sim");
        body.push(0xe3);
        body.extend_from_slice(b"o\n1,1,1,42\n");
        fs::write(dir.path().join("gerhid.csv"), body).unwrap();
        for backend in [BackendKind::Frame, BackendKind::Stream] {
            let resolver = TimeSeriesResolver::new(
                dir.path(),
                ResolverOptions {
                    backend,
                    encoding: TextEncoding::Latin1,
                },
            );
            let mut handle = resolver.open("gerhid").unwrap();
            assert_eq!(
                handle
                    .resolve(&ScenarioKey::new(1, 1, 1), Some("São Simão"))
                    .unwrap(),
                42.0
            );
        }
    }

    #[test]
    fn backend_kind_parses() {
        assert_eq!("Stream".parse::<BackendKind>().unwrap(), BackendKind::Stream);
        assert_eq!("frame".parse::<BackendKind>().unwrap(), BackendKind::Frame);
        assert!("mmap".parse::<BackendKind>().is_err());
    }
}
