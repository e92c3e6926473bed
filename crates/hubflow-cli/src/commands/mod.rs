pub mod config;
pub mod cop;
pub mod run;
pub mod telemetry;
pub mod topology;
