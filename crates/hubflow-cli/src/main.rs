use clap::Parser;
use hubflow_cli::{
    cli::{Cli, Commands},
    manifest,
};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

mod commands;

use crate::commands::{config, cop, run, topology};

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {err}");
    }

    let (label, result) = match &cli.command {
        Some(Commands::Run(args)) => ("Run", run::handle(args)),
        Some(Commands::Topology { format, out }) => {
            ("Topology", topology::handle(*format, out.as_deref()))
        }
        Some(Commands::Cop { config }) => ("Cop", cop::handle(config.as_deref())),
        Some(Commands::Config { command }) => ("Config", config::handle(command)),
        None => {
            info!("No subcommand given; try --help");
            return;
        }
    };

    match result {
        Ok(()) => info!("{label} command successful!"),
        Err(err) => {
            error!("{label} command failed: {err:#}");
            eprintln!("Error: {err:#}");
            std::process::exit(1);
        }
    }
}
