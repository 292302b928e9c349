use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub run_id: String,
    pub command: String,
    pub version: String,
    pub timestamp: String,
    #[serde(default)]
    pub inputs: Vec<ManifestInput>,
    pub outputs: Vec<String>,
    pub params: Vec<Param>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<ManifestTelemetry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestInput {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestTelemetry {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<Param>,
}

/// Write `run-<uuid>.json` into `dir` and return its path.
pub fn record_manifest(
    dir: &Path,
    command: &str,
    inputs: &[&Path],
    outputs: &[PathBuf],
    params: &[(&str, &str)],
    telemetry: Option<ManifestTelemetry>,
) -> Result<PathBuf> {
    let run_id = Uuid::new_v4().to_string();
    fs::create_dir_all(dir)?;
    let manifest = ManifestEntry {
        run_id: run_id.clone(),
        command: command.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        inputs: inputs
            .iter()
            .map(|path| ManifestInput {
                path: path.display().to_string(),
                hash: compute_sha256(path).ok(),
            })
            .collect(),
        outputs: outputs
            .iter()
            .map(|path| path.display().to_string())
            .collect(),
        params: params
            .iter()
            .map(|(k, v)| Param {
                name: k.to_string(),
                value: v.to_string(),
            })
            .collect(),
        telemetry,
    };
    let json = serde_json::to_string_pretty(&manifest)?;
    let path = dir.join(format!("run-{}.json", run_id));
    fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

pub fn read_manifest(path: &Path) -> Result<ManifestEntry> {
    let json = fs::read_to_string(path)?;
    let manifest = serde_json::from_str(&json)?;
    Ok(manifest)
}

/// Hex SHA-256 of a file's contents.
pub fn compute_sha256(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)
        .with_context(|| format!("opening {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192];
    loop {
        let n = file
            .read(&mut buffer)
            .with_context(|| format!("reading {} for hashing", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn manifest_round_trips_with_hashes() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("map.csv");
        fs::write(&input, "abc").unwrap();
        let path = record_manifest(
            dir.path(),
            "apply",
            &[input.as_path(), Path::new("/nonexistent/units.csv")],
            &[dir.path().join("dispatch_report.json")],
            &[("backend", "frame")],
            None,
        )
        .unwrap();
        let manifest = read_manifest(&path).unwrap();
        assert_eq!(manifest.command, "apply");
        assert_eq!(
            manifest.inputs[0].hash.as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
        assert!(manifest.inputs[1].hash.is_none());
        assert_eq!(manifest.params[0].name, "backend");
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("run-"));
    }
}
