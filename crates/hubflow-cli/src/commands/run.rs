use std::io::{self, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use hubflow_algo::{run_dispatch, DispatchResult};
use hubflow_cli::cli::RunArgs;
use hubflow_core::{DispatchConfig, TimeSeriesInputs};
use tabwriter::TabWriter;
use tracing::info;

use crate::commands::telemetry::record_run_timed;

/// Totals echoed after every run, in display order
const SUMMARY_TOTALS: &[&str] = &[
    "import_cost",
    "imported_electricity",
    "imported_gas",
    "renewable",
    "co2_emissions",
    "lt_dhcn_reject",
    "storage_cumulative_final",
];

pub fn handle(args: &RunArgs) -> Result<()> {
    let start = Instant::now();
    let config = resolve_config(args)?;
    info!(
        horizon = config.run.horizon,
        secondary = %config.run.secondary,
        lp_solver = %config.solver.lp_solver,
        "starting dispatch run"
    );

    let res = execute(&config, args);

    let outputs: Vec<&Path> = [args.out.as_deref(), args.flows.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !outputs.is_empty() {
        record_run_timed(&outputs, "run", &run_params(&config, args), start, &res);
    }
    res
}

fn execute(config: &DispatchConfig, args: &RunArgs) -> Result<()> {
    let inputs = match args.constant {
        Some(value) => TimeSeriesInputs::constant(config.run.horizon, value),
        None => hubflow_ts::load_inputs(&config.inputs).context("loading input profiles")?,
    };
    let result = run_dispatch(config, &inputs).context("dispatch failed")?;

    print_summary(&result)?;
    if let Some(path) = &args.out {
        result.to_json(path)?;
        println!("Result written to {}", path.display());
    }
    if let Some(path) = &args.flows {
        result.to_csv(path)?;
        println!("Flows written to {}", path.display());
    }
    Ok(())
}

/// Configuration file (or defaults) with command-line overrides applied.
pub fn resolve_config(args: &RunArgs) -> Result<DispatchConfig> {
    let mut config = match &args.config {
        Some(path) => DispatchConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => DispatchConfig::default(),
    };

    if let Some(horizon) = args.horizon {
        config.run.horizon = horizon;
    }
    if let Some(secondary) = &args.secondary {
        config.run.secondary = secondary.parse()?;
    }
    if let Some(pv_scale) = args.pv_scale {
        config.run.pv_scale = pv_scale;
    }
    if let Some(rel_tol) = args.primary_rel_tol {
        config.run.primary_rel_tol = rel_tol;
    }
    if let Some(lp_solver) = &args.lp_solver {
        config.solver.lp_solver = lp_solver.clone();
    }
    if let Some(gap) = args.gap {
        config.solver.mip_gap = Some(gap);
    }
    if let Some(dir) = &args.inputs {
        config.inputs.dir = Some(dir.clone());
        config.inputs.csv = None;
    }
    if let Some(csv) = &args.csv {
        config.inputs.csv = Some(csv.clone());
    }
    if let Some(spread) = args.spread {
        config.inputs.spread = Some(spread);
    }

    config.validate().context("invalid run configuration")?;
    Ok(config)
}

fn run_params(config: &DispatchConfig, args: &RunArgs) -> Vec<(&'static str, String)> {
    let source = match (args.constant, &config.inputs.csv, &config.inputs.dir) {
        (Some(value), _, _) => format!("constant:{value}"),
        (None, Some(csv), _) => csv.display().to_string(),
        (None, None, Some(dir)) => dir.display().to_string(),
        (None, None, None) => String::new(),
    };
    let mut params = vec![
        ("horizon", config.run.horizon.to_string()),
        ("secondary", config.run.secondary.to_string()),
        ("pv_scale", config.run.pv_scale.to_string()),
        ("primary_rel_tol", config.run.primary_rel_tol.to_string()),
        ("lp_solver", config.solver.lp_solver.clone()),
        ("inputs", source),
    ];
    if let Some(gap) = config.solver.mip_gap {
        params.push(("gap", gap.to_string()));
    }
    if let Some(path) = &args.config {
        params.push(("config", path.display().to_string()));
    }
    params
}

fn print_summary(result: &DispatchResult) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "Status\t{}", result.status)?;
    writeln!(writer, "Horizon\t{}", result.horizon)?;
    writeln!(writer)?;
    writeln!(writer, "OBJECTIVE\tPRIORITY\tVALUE")?;
    for objective in &result.objectives {
        writeln!(
            writer,
            "{}\t{}\t{:.4}",
            objective.name, objective.priority, objective.value
        )?;
    }
    writeln!(writer)?;
    writeln!(writer, "TOTAL\tVALUE")?;
    for key in SUMMARY_TOTALS {
        if let Some(value) = result.total(key) {
            writeln!(writer, "{key}\t{value:.4}")?;
        }
    }
    writer.flush()?;
    Ok(())
}
