use crate::manifest::record_manifest;
use std::{path::Path, time::Instant};
use tracing::info;

fn record_run_with_status(
    outputs: &[&Path],
    command: &str,
    params: &[(&str, String)],
    status: &str,
    duration_ms: Option<u128>,
) {
    match record_manifest(outputs, command, params, status, duration_ms) {
        Ok(path) => info!("Recorded run manifest {}", path.display()),
        Err(err) => eprintln!("Failed to record run manifest: {err}"),
    }
}

pub fn record_run_timed(
    outputs: &[&Path],
    command: &str,
    params: &[(&str, String)],
    start: Instant,
    result: &anyhow::Result<()>,
) {
    let duration_ms = start.elapsed().as_millis();
    let status = if result.is_ok() { "success" } else { "failure" };
    record_run_with_status(outputs, command, params, status, Some(duration_ms));
}
