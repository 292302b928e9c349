use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pds_core::{Diagnostics, ScenarioKey};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::compute::Setpoint;

/// File name of the report inside the report directory.
pub const REPORT_FILE: &str = "dispatch_report.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    /// Setpoints were written and the scenario saved.
    Applied,
    /// Setpoints were computed but not written (dry run).
    Planned,
    Failed,
}

impl ScenarioStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioStatus::Applied => "applied",
            ScenarioStatus::Planned => "planned",
            ScenarioStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub stage: u32,
    pub run: u32,
    pub interval: u32,
    pub label: String,
    pub status: ScenarioStatus,
    pub writes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_h: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_units: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub setpoints: Vec<Setpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScenarioRecord {
    pub fn key(&self) -> ScenarioKey {
        ScenarioKey::new(self.stage, self.run, self.interval)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub created_at: DateTime<Utc>,
    pub dry_run: bool,
    pub num_scenarios: usize,
    pub success: usize,
    pub failure: usize,
    pub total_writes: usize,
    /// Load-time findings (ambiguous or missing units).
    #[serde(default)]
    pub diagnostics: Diagnostics,
    pub scenarios: Vec<ScenarioRecord>,
}

impl RunReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            created_at: Utc::now(),
            dry_run,
            num_scenarios: 0,
            success: 0,
            failure: 0,
            total_writes: 0,
            diagnostics: Diagnostics::new(),
            scenarios: Vec::new(),
        }
    }

    pub fn push(&mut self, record: ScenarioRecord) {
        self.num_scenarios += 1;
        match record.status {
            ScenarioStatus::Failed => self.failure += 1,
            ScenarioStatus::Applied | ScenarioStatus::Planned => self.success += 1,
        }
        self.total_writes += record.writes;
        self.scenarios.push(record);
    }

    /// Number of unmapped-unit skips across all scenarios.
    pub fn skipped_count(&self) -> usize {
        self.scenarios
            .iter()
            .map(|record| record.skipped_units.len())
            .sum()
    }

    pub fn record(&self, key: &ScenarioKey) -> Option<&ScenarioRecord> {
        self.scenarios.iter().find(|record| record.key() == *key)
    }
}

pub fn write_run_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating report directory '{}'", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report).context("serializing dispatch report")?;
    fs::write(path, json).with_context(|| format!("writing dispatch report '{}'", path.display()))?;
    Ok(())
}

pub fn load_run_report(path: &Path) -> Result<RunReport> {
    let file = fs::File::open(path)
        .with_context(|| format!("opening dispatch report '{}'", path.display()))?;
    serde_json::from_reader(file)
        .with_context(|| format!("parsing dispatch report '{}'", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn record(status: ScenarioStatus, writes: usize) -> ScenarioRecord {
        ScenarioRecord {
            stage: 1,
            run: 2,
            interval: 3,
            label: "s".into(),
            status,
            writes,
            duration_h: Some(2.0),
            skipped_units: vec!["G9".into()],
            setpoints: vec![Setpoint::new("G1", "pgini", 1.5)],
            error: None,
        }
    }

    #[test]
    fn counts_follow_records() {
        let mut report = RunReport::new(false);
        report.push(record(ScenarioStatus::Applied, 4));
        report.push(record(ScenarioStatus::Failed, 0));
        assert_eq!(report.num_scenarios, 2);
        assert_eq!(report.success, 1);
        assert_eq!(report.failure, 1);
        assert_eq!(report.total_writes, 4);
        assert_eq!(report.skipped_count(), 2);
        assert!(report.record(&ScenarioKey::new(1, 2, 3)).is_some());
    }

    #[test]
    fn report_writes_and_reads_back() {
        let mut report = RunReport::new(true);
        report.push(record(ScenarioStatus::Planned, 0));
        let tmp = NamedTempFile::new().unwrap();
        write_run_report(tmp.path(), &report).unwrap();
        let text = fs::read_to_string(tmp.path()).unwrap();
        assert!(text.contains("\"status\": \"planned\""));
        let parsed = load_run_report(tmp.path()).unwrap();
        assert!(parsed.dry_run);
        assert_eq!(parsed.scenarios, report.scenarios);
    }
}
