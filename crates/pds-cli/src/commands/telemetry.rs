use pds_cli::manifest::{record_manifest, ManifestTelemetry, Param};
use std::{
    env,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{info, warn};

const TELEMETRY_ENV_KEYS: &[&str] = &[
    "PDS_ENV",
    "PDS_CORRELATION_ID",
    "GITHUB_RUN_ID",
    "GITHUB_WORKFLOW",
    "GITHUB_SHA",
];

fn collect_telemetry_env() -> Vec<Param> {
    TELEMETRY_ENV_KEYS
        .iter()
        .filter_map(|key| {
            env::var(key).ok().map(|value| Param {
                name: key.to_string(),
                value,
            })
        })
        .collect()
}

/// Record a run manifest in `dir` with the outcome and wall time of the run.
/// A manifest that cannot be written is logged, never fatal.
pub fn record_run_timed(
    dir: &Path,
    command: &str,
    inputs: &[&Path],
    outputs: &[PathBuf],
    params: &[(&str, &str)],
    start: Instant,
    result: &anyhow::Result<()>,
) {
    let telemetry = ManifestTelemetry {
        status: if result.is_ok() { "success" } else { "failure" }.to_string(),
        duration_ms: Some(start.elapsed().as_millis()),
        env: collect_telemetry_env(),
    };
    match record_manifest(dir, command, inputs, outputs, params, Some(telemetry)) {
        Ok(path) => info!(path = %path.display(), "recorded run manifest"),
        Err(err) => warn!("failed to record run manifest: {err:#}"),
    }
}
