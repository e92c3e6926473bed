//! LP backends over `good_lp`.
//!
//! A backend solves one phase: minimize a single target over the model's
//! active variables and constraints plus the bounds fixed by earlier phases.
//! It knows nothing about priorities; [`super::lexicographic`] drives it.

use std::str::FromStr;

use good_lp::{
    constraint, variable, variables, Constraint, Expression, ProblemVariables, ResolutionError,
    Variable,
};
use hubflow_core::{DispatchError, HubflowResult};
use thiserror::Error;

use super::model::{LinearConstraint, LinearExpr, ModelSpec, Relation};

/// Options forwarded to every phase
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolveOptions {
    /// Relative optimality gap, honoured by backends that support one
    pub mip_gap: Option<f64>,
}

/// Everything a backend needs to solve one phase.
#[derive(Debug, Clone, Copy)]
pub struct PhaseProblem<'a> {
    pub name: &'a str,
    pub spec: &'a ModelSpec,
    /// Minimization target
    pub target: &'a LinearExpr,
    /// Lexicographic bounds from earlier phases
    pub bounds: &'a [LinearConstraint],
    /// Per-variable flag; inactive variables and the constraints touching
    /// them are left out of this phase
    pub active: &'a [bool],
}

impl PhaseProblem<'_> {
    fn constraint_active(&self, c: &LinearConstraint) -> bool {
        c.expr.vars().all(|v| self.active[v.index()])
    }

    /// Constraints included in this phase.
    pub fn constraints(&self) -> impl Iterator<Item = &LinearConstraint> + '_ {
        self.spec
            .constraints()
            .iter()
            .chain(self.bounds.iter())
            .filter(move |c| self.constraint_active(c))
    }
}

#[derive(Debug, Clone)]
pub struct PhaseSolution {
    /// One value per model variable; NaN for variables inactive in the phase
    pub values: Vec<f64>,
    pub objective: f64,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendFailure {
    #[error("infeasible")]
    Infeasible,
    #[error("unbounded")]
    Unbounded,
    #[error("{0}")]
    Other(String),
}

impl From<ResolutionError> for BackendFailure {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Infeasible => BackendFailure::Infeasible,
            ResolutionError::Unbounded => BackendFailure::Unbounded,
            other => BackendFailure::Other(other.to_string()),
        }
    }
}

/// Pluggable LP engine.
pub trait LpBackend: Send + Sync {
    /// Short identifier ("clarabel", "highs")
    fn id(&self) -> &'static str;

    /// Whether the backend was compiled in
    fn is_available(&self) -> bool {
        true
    }

    fn solve_phase(
        &self,
        problem: &PhaseProblem<'_>,
        options: &SolveOptions,
    ) -> Result<PhaseSolution, BackendFailure>;
}

/// Translated `good_lp` problem
struct Assembled {
    vars: ProblemVariables,
    handles: Vec<Option<Variable>>,
    objective: Expression,
    constraints: Vec<Constraint>,
}

impl Assembled {
    fn new(problem: &PhaseProblem<'_>) -> Self {
        let mut vars = variables!();
        let handles: Vec<Option<Variable>> = problem
            .spec
            .variables()
            .iter()
            .zip(problem.active)
            .map(|(def, &active)| {
                active.then(|| match def.lower {
                    Some(lb) => vars.add(variable().min(lb)),
                    None => vars.add(variable()),
                })
            })
            .collect();

        let objective = to_expression(problem.target, &handles);
        let constraints = problem
            .constraints()
            .map(|c| to_constraint(c, &handles))
            .collect();

        Self {
            vars,
            handles,
            objective,
            constraints,
        }
    }
}

fn to_expression(expr: &LinearExpr, handles: &[Option<Variable>]) -> Expression {
    let mut out = Expression::from(expr.constant);
    for &(id, coef) in &expr.terms {
        if let Some(var) = handles[id.index()] {
            out += coef * var;
        }
    }
    out
}

fn to_constraint(c: &LinearConstraint, handles: &[Option<Variable>]) -> Constraint {
    let lhs = to_expression(&c.expr, handles);
    let rhs = c.rhs;
    match c.relation {
        Relation::Eq => constraint!(lhs == rhs),
        Relation::Le => constraint!(lhs <= rhs),
        Relation::Ge => constraint!(lhs >= rhs),
    }
}

fn finish<S: good_lp::Solution>(
    problem: &PhaseProblem<'_>,
    handles: &[Option<Variable>],
    solution: &S,
) -> PhaseSolution {
    let values: Vec<f64> = handles
        .iter()
        .map(|h| h.map_or(f64::NAN, |var| solution.value(var)))
        .collect();
    let objective = problem.target.evaluate(&values);
    PhaseSolution { values, objective }
}

/// Interior-point backend (Clarabel, pure Rust)
#[derive(Debug, Clone, Copy, Default)]
pub struct ClarabelBackend;

impl LpBackend for ClarabelBackend {
    fn id(&self) -> &'static str {
        "clarabel"
    }

    fn is_available(&self) -> bool {
        cfg!(feature = "solver-clarabel")
    }

    #[cfg(feature = "solver-clarabel")]
    fn solve_phase(
        &self,
        problem: &PhaseProblem<'_>,
        options: &SolveOptions,
    ) -> Result<PhaseSolution, BackendFailure> {
        use good_lp::solvers::clarabel::clarabel;
        use good_lp::SolverModel;

        if let Some(gap) = options.mip_gap {
            tracing::warn!(gap, "clarabel solves the LP exactly; optimality gap ignored");
        }
        let Assembled {
            vars,
            handles,
            objective,
            constraints,
        } = Assembled::new(problem);
        let mut model = vars.minimise(objective).using(clarabel);
        for c in constraints {
            model = model.with(c);
        }
        let solution = model.solve()?;
        Ok(finish(problem, &handles, &solution))
    }

    #[cfg(not(feature = "solver-clarabel"))]
    fn solve_phase(
        &self,
        _problem: &PhaseProblem<'_>,
        _options: &SolveOptions,
    ) -> Result<PhaseSolution, BackendFailure> {
        Err(BackendFailure::Other(
            "clarabel backend not compiled in (enable feature solver-clarabel)".into(),
        ))
    }
}

/// Simplex/IPM backend (HiGHS, native)
#[cfg(feature = "solver-highs")]
#[derive(Debug, Clone, Copy, Default)]
pub struct HighsBackend;

#[cfg(feature = "solver-highs")]
impl LpBackend for HighsBackend {
    fn id(&self) -> &'static str {
        "highs"
    }

    fn solve_phase(
        &self,
        problem: &PhaseProblem<'_>,
        options: &SolveOptions,
    ) -> Result<PhaseSolution, BackendFailure> {
        use good_lp::solvers::highs::highs;
        use good_lp::SolverModel;

        let Assembled {
            vars,
            handles,
            objective,
            constraints,
        } = Assembled::new(problem);
        let mut model = vars.minimise(objective).using(highs);
        if let Some(gap) = options.mip_gap {
            model = model.set_option("mip_rel_gap", gap);
        }
        for c in constraints {
            model = model.with(c);
        }
        let solution = model.solve()?;
        Ok(finish(problem, &handles, &solution))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LpSolverKind {
    #[default]
    Clarabel,
    #[cfg(feature = "solver-highs")]
    Highs,
}

const AVAILABLE_LP_SOLVERS: &[&str] = &[
    "clarabel",
    #[cfg(feature = "solver-highs")]
    "highs",
];

impl LpSolverKind {
    pub fn available() -> &'static [&'static str] {
        AVAILABLE_LP_SOLVERS
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LpSolverKind::Clarabel => "clarabel",
            #[cfg(feature = "solver-highs")]
            LpSolverKind::Highs => "highs",
        }
    }

    pub fn build_backend(&self) -> HubflowResult<Box<dyn LpBackend>> {
        let backend: Box<dyn LpBackend> = match self {
            LpSolverKind::Clarabel => Box::new(ClarabelBackend),
            #[cfg(feature = "solver-highs")]
            LpSolverKind::Highs => Box::new(HighsBackend),
        };
        if !backend.is_available() {
            return Err(DispatchError::Configuration(format!(
                "lp solver '{}' is not compiled in",
                backend.id()
            )));
        }
        Ok(backend)
    }
}

fn unknown_solver_error(label: &str) -> DispatchError {
    DispatchError::Configuration(format!(
        "unknown lp solver '{}'; supported values: {}",
        label,
        LpSolverKind::available().join(", ")
    ))
}

impl FromStr for LpSolverKind {
    type Err = DispatchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.to_ascii_lowercase();
        match normalized.as_str() {
            "clarabel" => Ok(LpSolverKind::Clarabel),
            "highs" => {
                #[cfg(feature = "solver-highs")]
                {
                    Ok(LpSolverKind::Highs)
                }
                #[cfg(not(feature = "solver-highs"))]
                {
                    Err(unknown_solver_error(&normalized))
                }
            }
            other => Err(unknown_solver_error(other)),
        }
    }
}
