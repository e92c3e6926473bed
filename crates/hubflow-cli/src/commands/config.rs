use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use hubflow_cli::cli::ConfigCommands;
use hubflow_core::DispatchConfig;

pub fn handle(command: &ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Default { out } => write_default(out.as_deref()),
        ConfigCommands::Check { path } => check(path),
    }
}

fn write_default(out: Option<&Path>) -> Result<()> {
    let toml = DispatchConfig::default().to_toml_string()?;
    match out {
        Some(path) => {
            fs::write(path, &toml)
                .with_context(|| format!("writing configuration to {}", path.display()))?;
            println!("Default configuration written to {}", path.display());
        }
        None => print!("{toml}"),
    }
    Ok(())
}

fn check(path: &Path) -> Result<()> {
    let config = DispatchConfig::load(path)
        .with_context(|| format!("loading configuration {}", path.display()))?;
    config
        .conversion_model()
        .context("evaluating conversion coefficients")?;
    println!(
        "{} is valid (horizon {}, secondary {}, solver {})",
        path.display(),
        config.run.horizon,
        config.run.secondary,
        config.solver.lp_solver
    );
    Ok(())
}
