//! # hubflow-algo: Lexicographic Dispatch Optimization
//!
//! Builds the time-indexed linear model of the district energy system and
//! solves it against a prioritized list of objectives.
//!
//! ## Pipeline
//!
//! | Stage | Type | Module |
//! |-------|------|--------|
//! | Variables | [`FlowIndex`] | [`dispatch::variables`] |
//! | Constraints | [`DispatchModelBuilder`] → [`DispatchModel`] | [`dispatch::constraints`] |
//! | Objectives | [`ObjectiveHierarchy`] | [`dispatch::objectives`] |
//! | Solve | [`solve_lexicographic`] over an [`LpBackend`] | [`dispatch::lexicographic`] |
//! | Results | [`DispatchResult`] | [`dispatch::results`], [`dispatch::export`] |
//!
//! ### Backends
//!
//! - **Clarabel** (default, `solver-clarabel`): pure-Rust interior point
//! - **HiGHS** (`solver-highs`): native, honours the optimality gap
//!
//! ## Example
//!
//! ```ignore
//! use hubflow_algo::run_dispatch;
//! use hubflow_core::{DispatchConfig, TimeSeriesInputs};
//!
//! let config = DispatchConfig::load("run.toml".as_ref())?;
//! let inputs = TimeSeriesInputs::constant(config.run.horizon, 1000.0);
//! let result = run_dispatch(&config, &inputs)?;
//! println!("Import cost: {:.2}", result.total("import_cost").unwrap_or_default());
//! ```

pub mod dispatch;

pub use dispatch::{
    build_model, extract, run_dispatch, solve_lexicographic, DispatchModel, DispatchModelBuilder,
    DispatchResult, FlowIndex, LpBackend, LpSolverKind, ModelSpec, Objective, ObjectiveHierarchy,
    SolveOptions, SolveReport, SolveStatus,
};
