pub mod cli;
pub mod manifest;

pub use cli::{build_cli_command, Cli, Commands, ConfigCommands, RunArgs, TopologyFormat};
