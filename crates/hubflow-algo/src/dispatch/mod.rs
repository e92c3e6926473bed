//! Multi-carrier district dispatch.
//!
//! Pipeline: [`TimeSeriesInputs`] are windowed to the horizon, the
//! [`DispatchModelBuilder`] emits a solver-independent [`ModelSpec`], the
//! [`ObjectiveHierarchy`] is solved phase by phase through an [`LpBackend`],
//! and [`extract`] turns the final solution into a [`DispatchResult`].
//!
//! ```no_run
//! use hubflow_algo::dispatch::run_dispatch;
//! use hubflow_core::{DispatchConfig, TimeSeriesInputs};
//!
//! let mut config = DispatchConfig::default();
//! config.run.horizon = 96;
//! let inputs = TimeSeriesInputs::constant(96, 1000.0);
//! let result = run_dispatch(&config, &inputs)?;
//! println!("import cost: {:?}", result.total("import_cost"));
//! # Ok::<(), hubflow_core::DispatchError>(())
//! ```

pub mod backend;
pub mod constraints;
pub mod export;
pub mod lexicographic;
pub mod model;
pub mod objectives;
pub mod results;
pub mod variables;

pub use backend::{
    BackendFailure, ClarabelBackend, LpBackend, LpSolverKind, PhaseProblem, PhaseSolution,
    SolveOptions,
};
#[cfg(feature = "solver-highs")]
pub use backend::HighsBackend;
pub use constraints::{required_extremals, DispatchModel, DispatchModelBuilder};
pub use lexicographic::{
    solve_lexicographic, ObjectiveValue, PhaseReport, SolveReport, SolveStatus,
};
pub use model::{
    ConstraintFamily, Extremal, LinearConstraint, LinearExpr, ModelSpec, Relation, VarId, VarKind,
};
pub use objectives::{import_cost, secondary_objective, Objective, ObjectiveHierarchy, Sense};
pub use results::{extract, DispatchResult, LinkSeries};
pub use variables::FlowIndex;

use hubflow_core::{DispatchConfig, HubflowResult, TimeSeriesInputs, Topology};

/// Build the model described by `config` over `inputs`.
pub fn build_model(
    config: &DispatchConfig,
    inputs: &TimeSeriesInputs,
) -> HubflowResult<DispatchModel> {
    config.validate()?;
    let topology = Topology::district();
    topology.validate().into_result()?;
    let conversion = config.conversion_model()?;
    let window = inputs.window(config.run.horizon)?;
    Ok(
        DispatchModelBuilder::new(topology, conversion, window, &config.run)
            .prices(config.prices)
            .build(),
    )
}

/// Build, solve, and extract one dispatch run.
pub fn run_dispatch(
    config: &DispatchConfig,
    inputs: &TimeSeriesInputs,
) -> HubflowResult<DispatchResult> {
    let model = build_model(config, inputs)?;
    let backend = config
        .solver
        .lp_solver
        .parse::<LpSolverKind>()?
        .build_backend()?;

    let mut hierarchy = ObjectiveHierarchy::standard(&model, &config.run);
    hierarchy.set_abs_tolerance(config.solver.abs_tolerance);
    let options = SolveOptions {
        mip_gap: config.solver.mip_gap,
    };

    let report = solve_lexicographic(model.spec(), &hierarchy, backend.as_ref(), &options)
        .into_checked(model.spec())?;
    tracing::info!(
        status = %report.status,
        violation = model.spec().max_violation(&report.values),
        "dispatch solved"
    );
    extract(&model, &report)
}
