use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn hubflow() -> Command {
    Command::cargo_bin("hubflow-cli").unwrap()
}

fn manifests_in(dir: &Path) -> Vec<std::path::PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("run-") && name.ends_with(".json"))
        })
        .collect()
}

#[test]
fn hubflow_topology_dot_runs() {
    hubflow()
        .args(["topology", "--format", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph district"))
        .stdout(predicate::str::contains("lt_dhcn_reject"));
}

#[test]
fn hubflow_topology_table_lists_links() {
    hubflow()
        .args(["topology"])
        .assert()
        .success()
        .stdout(predicate::str::contains("KEY"))
        .stdout(predicate::str::contains("gas_storage"));
}

#[test]
fn hubflow_cop_prints_defaults() {
    hubflow()
        .arg("cop")
        .assert()
        .success()
        .stdout(predicate::str::contains("hp_heat_ht"))
        .stdout(predicate::str::contains("2.5684"));
}

#[test]
fn hubflow_config_default_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.toml");

    let output = hubflow().args(["config", "default"]).output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("horizon = 10752"));

    hubflow()
        .args(["config", "default", "--out", path.to_str().unwrap()])
        .assert()
        .success();
    hubflow()
        .args(["config", "check", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn hubflow_config_check_rejects_bad_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[run]\nhorizon = 0\n").unwrap();
    hubflow()
        .args(["config", "check", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("run.horizon"));
}

#[test]
fn hubflow_run_constant_writes_outputs_and_manifest() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("result.json");
    let flows = dir.path().join("flows.csv");

    hubflow()
        .args([
            "run",
            "--constant",
            "1000",
            "--horizon",
            "4",
            "--out",
            out.to_str().unwrap(),
            "--flows",
            flows.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("import_cost"));

    let result: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(result["horizon"], 4);
    assert!(result["totals"]["import_cost"].as_f64().unwrap() > 0.0);

    let csv = fs::read_to_string(&flows).unwrap();
    assert_eq!(csv.lines().count(), 5);
    assert!(csv.starts_with("step,"));

    let manifests = manifests_in(dir.path());
    assert_eq!(manifests.len(), 1);
    let manifest = hubflow_cli::manifest::read_manifest(&manifests[0]).unwrap();
    assert_eq!(manifest.command, "run");
    assert_eq!(manifest.status, "success");
    assert_eq!(manifest.outputs.len(), 2);
}

#[test]
fn hubflow_run_reads_profile_directory() {
    let dir = tempdir().unwrap();
    let profiles = dir.path().join("profiles");
    fs::create_dir(&profiles).unwrap();
    let files = hubflow_core::SeriesFiles::default();
    for kind in hubflow_core::SeriesKind::ALL {
        fs::write(
            profiles.join(files.file_for(kind)),
            "[800000, 900000, 1000000, 950000]",
        )
        .unwrap();
    }

    hubflow()
        .args([
            "run",
            "--inputs",
            profiles.to_str().unwrap(),
            "--horizon",
            "3",
            "--secondary",
            "storage-swing",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("storage_swing"));
}

#[test]
fn hubflow_run_reports_infeasibility() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("hot.toml");
    fs::write(&config, "[temperatures]\ncooling = 40.0\n").unwrap();

    hubflow()
        .args([
            "run",
            "--config",
            config.to_str().unwrap(),
            "--constant",
            "1000",
            "--horizon",
            "4",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("infeasible"));
}

#[test]
fn hubflow_run_missing_inputs_fails() {
    let dir = tempdir().unwrap();
    hubflow()
        .args([
            "run",
            "--inputs",
            dir.path().join("absent").to_str().unwrap(),
            "--horizon",
            "2",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn hubflow_run_keeps_pv_samples_unscaled() {
    let dir = tempdir().unwrap();
    let profiles = dir.path().join("profiles");
    fs::create_dir(&profiles).unwrap();
    let files = hubflow_core::SeriesFiles::default();
    for kind in hubflow_core::SeriesKind::ALL {
        fs::write(profiles.join(files.file_for(kind)), "[1000.0, 1000.0]").unwrap();
    }
    let out = dir.path().join("result.json");

    hubflow()
        .args([
            "run",
            "--inputs",
            profiles.to_str().unwrap(),
            "--horizon",
            "2",
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let result: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    let pv = result["totals"]["pv"].as_f64().unwrap();
    assert!((pv - 200.0).abs() < 1e-3, "pv total {pv}");
}
