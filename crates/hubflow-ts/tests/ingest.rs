use std::fs;
use std::path::Path;

use hubflow_core::{DispatchConfig, InputsConfig, SeriesKind};
use hubflow_ts::{load_inputs, load_series_csv, load_series_dir};
use tempfile::tempdir;

fn write_profiles(dir: &Path, files: &hubflow_core::SeriesFiles, len: usize) {
    for (i, kind) in SeriesKind::ALL.into_iter().enumerate() {
        let values: Vec<f64> = (0..len).map(|t| (1000 * (i + 1) + 100 * t) as f64).collect();
        let json = serde_json::to_string(&values).unwrap();
        fs::write(dir.join(files.file_for(kind)), json).unwrap();
    }
}

#[test]
fn directory_with_historical_names_loads_scaled() {
    let dir = tempdir().unwrap();
    let config = InputsConfig::default();
    write_profiles(dir.path(), &config.files, 5);

    let inputs = load_series_dir(dir.path(), &config).unwrap();
    assert_eq!(inputs.max_horizon(), 5);
    let cooling = inputs.get(SeriesKind::CoolingDemand).unwrap();
    assert!((cooling[0] - 1.0).abs() < 1e-12);
    assert!((cooling[4] - 1.4).abs() < 1e-12);
    let electricity = inputs.get(SeriesKind::ElectricityDemand).unwrap();
    assert!((electricity[0] - 6.0).abs() < 1e-12);
    // PV samples are not divided by 1000
    let pv = inputs.get(SeriesKind::PvProduction).unwrap();
    assert_eq!(pv[0], 5000.0);

    let window = inputs.window(5).unwrap();
    assert_eq!(window.horizon(), 5);
}

#[test]
fn custom_file_names_and_spread() {
    let dir = tempdir().unwrap();
    let mut config = InputsConfig {
        unit_scale: 1.0,
        spread: Some(4),
        ..InputsConfig::default()
    };
    config.files.pv_production = "solar.json".to_string();
    write_profiles(dir.path(), &config.files, 3);
    assert!(dir.path().join("solar.json").exists());

    let inputs = load_series_dir(dir.path(), &config).unwrap();
    assert_eq!(inputs.max_horizon(), 8);
    let pv = inputs.get(SeriesKind::PvProduction).unwrap();
    assert_eq!(&pv[..5], &[5000.0, 5025.0, 5050.0, 5075.0, 5100.0]);
}

#[test]
fn missing_file_names_the_series() {
    let dir = tempdir().unwrap();
    let config = InputsConfig::default();
    write_profiles(dir.path(), &config.files, 2);
    fs::remove_file(dir.path().join(&config.files.gas_heating_demand)).unwrap();

    let err = load_series_dir(dir.path(), &config).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("gas_heating_demand"), "{message}");
    assert!(message.contains("aggregated_heating_needs_gas.json"), "{message}");
}

#[test]
fn missing_directory_is_reported() {
    let dir = tempdir().unwrap();
    let err = load_series_dir(&dir.path().join("nope"), &InputsConfig::default()).unwrap_err();
    assert!(err.to_string().contains("does not exist"));
}

#[test]
fn csv_with_one_column_per_series() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("profiles.csv");
    let header: Vec<&str> = SeriesKind::ALL.iter().map(|kind| kind.name()).collect();
    let mut contents = format!("timestamp,{}\n", header.join(","));
    for t in 0..3 {
        contents.push_str(&format!("{t},10,20,30,40,50,{}\n", 60 + t));
    }
    fs::write(&path, contents).unwrap();

    let config = InputsConfig {
        unit_scale: 1.0,
        csv: Some(path.clone()),
        ..InputsConfig::default()
    };
    let inputs = load_series_csv(&path, &config).unwrap();
    assert_eq!(inputs.max_horizon(), 3);
    assert_eq!(inputs.get(SeriesKind::SubstationHeatingDemand), Some(&[40.0, 40.0, 40.0][..]));
    assert_eq!(inputs.get(SeriesKind::ElectricityDemand), Some(&[60.0, 61.0, 62.0][..]));

    // csv wins over dir when both are set
    let both = InputsConfig {
        dir: Some(dir.path().join("unused")),
        ..config
    };
    assert_eq!(load_inputs(&both).unwrap(), inputs);
}

#[test]
fn csv_missing_column_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("partial.csv");
    fs::write(&path, "cooling_demand,pv_production\n1,2\n").unwrap();
    let err = load_series_csv(&path, &InputsConfig::default()).unwrap_err();
    assert!(format!("{err:#}").contains("gas_heating_demand"));
}

#[test]
fn default_scaling_gives_historical_pv_link() {
    let dir = tempdir().unwrap();
    let config = DispatchConfig::default();
    for kind in SeriesKind::ALL {
        fs::write(
            dir.path().join(config.inputs.files.file_for(kind)),
            "[1000.0, 1000.0]",
        )
        .unwrap();
    }

    let inputs = load_series_dir(dir.path(), &config.inputs).unwrap();
    let window = inputs.window(2).unwrap();
    let pv_link = config.run.pv_scale * window.sample(SeriesKind::PvProduction, 0);
    assert!((pv_link - 100.0).abs() < 1e-9, "{pv_link}");
    assert!((window.sample(SeriesKind::CoolingDemand, 0) - 1.0).abs() < 1e-12);
}
