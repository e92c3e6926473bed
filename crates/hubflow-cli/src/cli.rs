use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-carrier district energy dispatch", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build and solve the lexicographic dispatch model
    Run(RunArgs),
    /// Inspect the district topology
    Topology {
        #[arg(long, value_enum, default_value = "table")]
        format: TopologyFormat,
        /// Write output to a file instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
    /// Print heat pump COPs and conversion ratios
    Cop {
        /// TOML run configuration (defaults apply when omitted)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,
    },
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// TOML run configuration (defaults apply when omitted)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Directory holding one JSON array per input series
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub inputs: Option<PathBuf>,
    /// CSV file with one column per input series
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "inputs")]
    pub csv: Option<PathBuf>,
    /// Use every series at this constant value instead of reading files
    #[arg(long, conflicts_with_all = ["inputs", "csv"])]
    pub constant: Option<f64>,
    /// Number of time steps to dispatch
    #[arg(long)]
    pub horizon: Option<usize>,
    /// Secondary objective (rejection, storage-swing, backfeed-swing)
    #[arg(long)]
    pub secondary: Option<String>,
    /// Fraction of the PV profile injected into the grid
    #[arg(long)]
    pub pv_scale: Option<f64>,
    /// Relative slack granted to the primary objective in later phases
    #[arg(long)]
    pub primary_rel_tol: Option<f64>,
    /// LP solver (clarabel, highs)
    #[arg(long)]
    pub lp_solver: Option<String>,
    /// Relative optimality gap passed to backends that support one
    #[arg(long)]
    pub gap: Option<f64>,
    /// Interpolate each input interval into this many sub-steps
    #[arg(long)]
    pub spread: Option<usize>,
    /// Write status, totals, and objective values as JSON
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub out: Option<PathBuf>,
    /// Write per-step link flows as CSV
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub flows: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the default configuration as TOML
    Default {
        /// Write to a file instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
    },
    /// Load and validate a configuration file
    Check {
        #[arg(value_hint = ValueHint::FilePath)]
        path: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TopologyFormat {
    /// One row per link
    Table,
    /// Graphviz DOT
    Dot,
    /// Degree and connectivity summary
    Stats,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli_command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "hubflow-cli",
            "run",
            "--constant",
            "1000",
            "--horizon",
            "4",
            "--secondary",
            "storage-swing",
            "--out",
            "result.json",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Run(args)) => {
                assert_eq!(args.constant, Some(1000.0));
                assert_eq!(args.horizon, Some(4));
                assert_eq!(args.secondary.as_deref(), Some("storage-swing"));
                assert_eq!(args.out, Some(PathBuf::from("result.json")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn constant_conflicts_with_inputs() {
        let err = Cli::try_parse_from([
            "hubflow-cli",
            "run",
            "--constant",
            "1",
            "--inputs",
            "profiles",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }
}
