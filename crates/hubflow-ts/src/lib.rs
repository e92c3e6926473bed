//! Loading of the six dispatch input profiles.
//!
//! Profiles arrive either as one JSON array per series in a directory or as
//! a single CSV file with one column per series. Raw samples are multiplied
//! by their unit scale exactly once here (`pv_unit_scale` for PV,
//! `unit_scale` for the demands), and can optionally be refined with
//! [`spread`] before they reach the model.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use hubflow_core::{InputSeries, InputsConfig, SeriesKind, TimeSeriesInputs};
use polars::prelude::*;

/// Load inputs from whichever source `config` names. A CSV file takes
/// precedence over a directory.
pub fn load_inputs(config: &InputsConfig) -> Result<TimeSeriesInputs> {
    match (&config.csv, &config.dir) {
        (Some(csv), _) => load_series_csv(csv, config),
        (None, Some(dir)) => load_series_dir(dir, config),
        (None, None) => bail!("no input source configured; set inputs.dir or inputs.csv"),
    }
}

/// Read the six JSON arrays under `dir` using the configured file names.
pub fn load_series_dir(dir: &Path, config: &InputsConfig) -> Result<TimeSeriesInputs> {
    if !dir.is_dir() {
        bail!("input directory {} does not exist", dir.display());
    }
    let mut inputs = TimeSeriesInputs::default();
    for kind in SeriesKind::ALL {
        let path: PathBuf = dir.join(config.files.file_for(kind));
        let raw = read_json_series(&path).with_context(|| format!("loading {kind}"))?;
        inputs.insert(finish_series(kind, raw, config)?);
    }
    tracing::info!(
        dir = %dir.display(),
        samples = inputs.max_horizon(),
        "loaded input profiles"
    );
    Ok(inputs)
}

/// Read a CSV file holding one column per series, named after
/// [`SeriesKind::name`]. Extra columns are ignored.
pub fn load_series_csv(path: &Path, config: &InputsConfig) -> Result<TimeSeriesInputs> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let df = CsvReader::new(&mut file)
        .has_header(true)
        .finish()
        .context("reading CSV file")?;

    let mut inputs = TimeSeriesInputs::default();
    for kind in SeriesKind::ALL {
        let column = df
            .column(kind.name())
            .with_context(|| format!("{} has no '{kind}' column", path.display()))?
            .cast(&DataType::Float64)
            .with_context(|| format!("casting column '{kind}' to Float64"))?;
        let raw = column
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value.ok_or_else(|| anyhow!("column '{kind}' is empty at row {row}"))
            })
            .collect::<Result<Vec<f64>>>()?;
        inputs.insert(finish_series(kind, raw, config)?);
    }
    tracing::info!(
        csv = %path.display(),
        rows = df.height(),
        "loaded input profiles"
    );
    Ok(inputs)
}

/// Parse a file holding one JSON array of numbers.
pub fn read_json_series(path: &Path) -> Result<Vec<f64>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let values: Vec<f64> = serde_json::from_reader(std::io::BufReader::new(file))
        .with_context(|| format!("parsing {} as a JSON array of numbers", path.display()))?;
    Ok(values)
}

/// Linear interpolation of a coarse profile into `n` sub-steps per interval.
///
/// Every consecutive pair `(a, b)` contributes `n` evenly spaced points
/// starting at `a` and stopping short of `b`, so the result holds
/// `(len - 1) * n` samples and the last input sample is dropped.
pub fn spread(seq: &[f64], n: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(seq.len().saturating_sub(1) * n);
    for pair in seq.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let step = (end - start) / n as f64;
        out.extend((0..n).map(|k| start + step * k as f64));
    }
    out
}

fn finish_series(kind: SeriesKind, raw: Vec<f64>, config: &InputsConfig) -> Result<InputSeries> {
    let scale = match kind {
        SeriesKind::PvProduction => config.pv_unit_scale,
        _ => config.unit_scale,
    };
    let scaled: Vec<f64> = raw.into_iter().map(|v| v * scale).collect();
    let values = match config.spread {
        Some(0) => bail!("inputs.spread must be at least 1"),
        Some(n) => spread(&scaled, n),
        None => scaled,
    };
    tracing::debug!(series = %kind, samples = values.len(), "series ready");
    Ok(InputSeries::new(kind, values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn unscaled() -> InputsConfig {
        InputsConfig {
            unit_scale: 1.0,
            ..InputsConfig::default()
        }
    }

    #[test]
    fn spread_matches_linspace_without_endpoint() {
        let out = spread(&[0.0, 4.0, 0.0], 4);
        assert_eq!(out, vec![0.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0, 1.0]);
    }

    #[test]
    fn spread_length_and_degenerate_inputs() {
        assert_eq!(spread(&[1.0, 2.0, 3.0, 4.0], 3).len(), 9);
        assert!(spread(&[5.0], 4).is_empty());
        assert!(spread(&[], 4).is_empty());
        assert_eq!(spread(&[2.0, 8.0], 1), vec![2.0]);
    }

    #[test]
    fn read_json_series_rejects_non_numbers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"[1.0, "two"]"#).unwrap();
        let err = read_json_series(&path).unwrap_err();
        assert!(format!("{err:#}").contains("JSON array of numbers"));
    }

    #[test]
    fn unit_scale_is_applied_once() {
        let config = InputsConfig::default();
        let series =
            finish_series(SeriesKind::CoolingDemand, vec![1000.0, 2500.0], &config).unwrap();
        assert!((series.values[0] - 1.0).abs() < 1e-12);
        assert!((series.values[1] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn pv_uses_its_own_scale() {
        let config = InputsConfig {
            pv_unit_scale: 2.0,
            ..InputsConfig::default()
        };
        let series = finish_series(SeriesKind::PvProduction, vec![1000.0], &config).unwrap();
        assert_eq!(series.values, vec![2000.0]);
    }

    #[test]
    fn zero_spread_is_rejected() {
        let config = InputsConfig {
            spread: Some(0),
            ..unscaled()
        };
        assert!(finish_series(SeriesKind::CoolingDemand, vec![1.0, 2.0], &config).is_err());
    }

    #[test]
    fn load_inputs_requires_a_source() {
        let err = load_inputs(&InputsConfig::default()).unwrap_err();
        assert!(err.to_string().contains("no input source"));
    }
}
