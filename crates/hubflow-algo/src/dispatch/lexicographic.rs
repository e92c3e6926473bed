//! Explicit multi-phase lexicographic solve.
//!
//! Phase `k` minimizes its target alone. Before phase `k+1` the bound
//! `target_k ≤ value_k + rel_tol·|value_k| + abs_tol` is added, so later
//! phases may only trade within the tolerance granted by earlier ones.
//! Auxiliary variables enter a phase once an objective up to that phase
//! refers to them.

use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

use hubflow_core::{DispatchError, HubflowResult};
use serde::Serialize;

use super::backend::{BackendFailure, LpBackend, PhaseProblem, SolveOptions};
use super::model::{ConstraintFamily, LinearConstraint, LinearExpr, ModelSpec, Relation, VarId};
use super::objectives::{ObjectiveHierarchy, Phase};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SolveStatus {
    NotSolved,
    /// Every earlier phase ended at its own optimum
    Optimal,
    /// Some earlier phase was relaxed within its tolerance
    WithinTolerance,
    Infeasible { phase: String },
    Unbounded { phase: String },
    Failed { phase: String, message: String },
}

impl SolveStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, SolveStatus::Optimal | SolveStatus::WithinTolerance)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::NotSolved => f.write_str("not solved"),
            SolveStatus::Optimal => f.write_str("optimal"),
            SolveStatus::WithinTolerance => f.write_str("within tolerance"),
            SolveStatus::Infeasible { phase } => write!(f, "infeasible in phase '{phase}'"),
            SolveStatus::Unbounded { phase } => write!(f, "unbounded in phase '{phase}'"),
            SolveStatus::Failed { phase, message } => {
                write!(f, "failed in phase '{phase}': {message}")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub name: String,
    pub priority: u32,
    /// Optimum of the phase target
    pub value: f64,
    /// Upper bound carried into later phases, if any
    pub bound: Option<f64>,
    pub solve_time_ms: u128,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectiveValue {
    pub name: String,
    pub priority: u32,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolveReport {
    pub status: SolveStatus,
    /// Final value of every model variable
    #[serde(skip)]
    pub values: Vec<f64>,
    pub phases: Vec<PhaseReport>,
    /// Achieved value of each objective at the final solution
    pub objective_values: Vec<ObjectiveValue>,
}

impl SolveReport {
    pub fn not_solved() -> Self {
        Self::failed(SolveStatus::NotSolved, Vec::new())
    }

    fn failed(status: SolveStatus, phases: Vec<PhaseReport>) -> Self {
        Self {
            status,
            values: Vec::new(),
            phases,
            objective_values: Vec::new(),
        }
    }

    pub fn objective(&self, name: &str) -> Option<f64> {
        self.objective_values
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.value)
    }

    /// Turn a failed status into the matching error.
    pub fn into_checked(self, spec: &ModelSpec) -> HubflowResult<Self> {
        match &self.status {
            SolveStatus::Optimal | SolveStatus::WithinTolerance => Ok(self),
            SolveStatus::NotSolved => Err(DispatchError::ResultUnavailable(
                self.status.to_string(),
            )),
            SolveStatus::Infeasible { phase } => {
                let mut context = spec.describe();
                if let Some(fixed) = spec.find_fixed_negative() {
                    context.push_str("; ");
                    context.push_str(&fixed.to_string());
                }
                Err(DispatchError::Infeasible {
                    phase: phase.clone(),
                    context,
                })
            }
            SolveStatus::Unbounded { phase } => Err(DispatchError::Unbounded {
                phase: phase.clone(),
            }),
            SolveStatus::Failed { phase, message } => Err(DispatchError::Solver(format!(
                "phase '{phase}': {message}"
            ))),
        }
    }
}

/// Tolerance bound added after a phase.
pub fn phase_bound(phase: &Phase, value: f64) -> f64 {
    value + phase.rel_tol * value.abs() + phase.abs_tol
}

fn bound_constraint(target: &LinearExpr, bound: f64) -> LinearConstraint {
    LinearConstraint::new(
        ConstraintFamily::ObjectiveBound,
        None,
        target.clone(),
        Relation::Le,
        bound,
    )
}

fn failure_status(phase: &str, failure: BackendFailure) -> SolveStatus {
    let phase = phase.to_string();
    match failure {
        BackendFailure::Infeasible => SolveStatus::Infeasible { phase },
        BackendFailure::Unbounded => SolveStatus::Unbounded { phase },
        BackendFailure::Other(message) => SolveStatus::Failed { phase, message },
    }
}

/// Solve `hierarchy` over `spec` phase by phase.
pub fn solve_lexicographic(
    spec: &ModelSpec,
    hierarchy: &ObjectiveHierarchy,
    backend: &dyn LpBackend,
    options: &SolveOptions,
) -> SolveReport {
    let mut phases = hierarchy.phases();
    if phases.is_empty() {
        phases.push(Phase {
            name: "feasibility".into(),
            priority: 0,
            members: Vec::new(),
            target: LinearExpr::new(),
            rel_tol: 0.0,
            abs_tol: 0.0,
        });
    }

    if let Some(fixed) = spec.find_fixed_negative() {
        tracing::warn!(%fixed, "model is trivially infeasible");
        return SolveReport::failed(
            SolveStatus::Infeasible {
                phase: phases[0].name.clone(),
            },
            Vec::new(),
        );
    }

    let mut referenced: HashSet<VarId> = HashSet::new();
    let mut bounds: Vec<LinearConstraint> = Vec::new();
    let mut reports: Vec<PhaseReport> = Vec::with_capacity(phases.len());
    let mut values = Vec::new();
    let last = phases.len() - 1;

    for (k, phase) in phases.iter().enumerate() {
        referenced.extend(phase.target.vars());
        let active: Vec<bool> = spec
            .variables()
            .iter()
            .enumerate()
            .map(|(i, def)| !def.kind.is_auxiliary() || referenced.contains(&VarId(i)))
            .collect();

        tracing::info!(
            phase = %phase,
            backend = backend.id(),
            bounds = bounds.len(),
            "solving phase {}/{}",
            k + 1,
            phases.len()
        );
        let started = Instant::now();
        let problem = PhaseProblem {
            name: &phase.name,
            spec,
            target: &phase.target,
            bounds: &bounds,
            active: &active,
        };
        let solution = match backend.solve_phase(&problem, options) {
            Ok(solution) => solution,
            Err(failure) => {
                tracing::warn!(phase = %phase, %failure, "phase failed");
                return SolveReport::failed(failure_status(&phase.name, failure), reports);
            }
        };
        let elapsed = started.elapsed().as_millis();

        let bound = (k < last).then(|| phase_bound(phase, solution.objective));
        tracing::info!(
            phase = %phase,
            value = solution.objective,
            bound,
            elapsed_ms = elapsed as u64,
            "phase solved"
        );
        if let Some(bound) = bound {
            bounds.push(bound_constraint(&phase.target, bound));
        }
        reports.push(PhaseReport {
            name: phase.name.clone(),
            priority: phase.priority,
            value: solution.objective,
            bound,
            solve_time_ms: elapsed,
        });
        values = solution.values;
    }

    let relaxed = phases[..last].iter().zip(&reports).any(|(phase, report)| {
        let achieved = phase.target.evaluate(&values);
        let slack = phase.abs_tol + 1e-6 * report.value.abs().max(1.0);
        achieved > report.value + slack
    });
    let status = if relaxed {
        SolveStatus::WithinTolerance
    } else {
        SolveStatus::Optimal
    };

    let objective_values = hierarchy
        .objectives()
        .iter()
        .map(|o| ObjectiveValue {
            name: o.name.clone(),
            priority: o.priority,
            value: o.target.evaluate(&values),
        })
        .collect();

    SolveReport {
        status,
        values,
        phases: reports,
        objective_values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::backend::PhaseSolution;
    use crate::dispatch::model::VarKind;
    use crate::dispatch::objectives::Objective;
    use hubflow_core::Link;
    use std::sync::Mutex;

    /// Records every phase it is asked to solve and returns canned values.
    struct ScriptedBackend {
        answers: Mutex<Vec<Result<Vec<f64>, BackendFailure>>>,
        seen_bounds: Mutex<Vec<usize>>,
        seen_active: Mutex<Vec<Vec<bool>>>,
    }

    impl ScriptedBackend {
        fn new(answers: Vec<Result<Vec<f64>, BackendFailure>>) -> Self {
            Self {
                answers: Mutex::new(answers),
                seen_bounds: Mutex::new(Vec::new()),
                seen_active: Mutex::new(Vec::new()),
            }
        }
    }

    impl LpBackend for ScriptedBackend {
        fn id(&self) -> &'static str {
            "scripted"
        }

        fn solve_phase(
            &self,
            problem: &PhaseProblem<'_>,
            _options: &SolveOptions,
        ) -> Result<PhaseSolution, BackendFailure> {
            self.seen_bounds.lock().unwrap().push(problem.bounds.len());
            self.seen_active
                .lock()
                .unwrap()
                .push(problem.active.to_vec());
            let values = self.answers.lock().unwrap().remove(0)?;
            let objective = problem.target.evaluate(&values);
            Ok(PhaseSolution { values, objective })
        }
    }

    fn spec() -> (ModelSpec, VarId, VarId, VarId) {
        let mut spec = ModelSpec::new();
        let x = spec.add_variable(
            VarKind::Flow {
                link: Link::MvToLv,
                step: 0,
            },
            Some(0.0),
        );
        let y = spec.add_variable(
            VarKind::Flow {
                link: Link::LtToReject,
                step: 0,
            },
            Some(0.0),
        );
        let aux = spec.add_variable(
            VarKind::Extremal(crate::dispatch::model::Extremal::StorageMax),
            None,
        );
        (spec, x, y, aux)
    }

    fn hierarchy(x: VarId, y: VarId) -> ObjectiveHierarchy {
        ObjectiveHierarchy::new()
            .with(Objective::minimize("cost", 0, LinearExpr::from(x)).with_rel_tol(0.1))
            .with(Objective::minimize("reject", 1, LinearExpr::from(y)))
    }

    #[test]
    fn second_phase_receives_primary_bound() {
        let (spec, x, y, _) = spec();
        let backend = ScriptedBackend::new(vec![Ok(vec![10.0, 5.0, 0.0]), Ok(vec![10.5, 1.0, 0.0])]);
        let report = solve_lexicographic(&spec, &hierarchy(x, y), &backend, &SolveOptions::default());

        assert_eq!(*backend.seen_bounds.lock().unwrap(), vec![0, 1]);
        assert_eq!(report.phases[0].bound, Some(11.0));
        assert_eq!(report.phases[1].bound, None);
        assert_eq!(report.status, SolveStatus::WithinTolerance);
        assert_eq!(report.objective("cost"), Some(10.5));
        assert_eq!(report.objective("reject"), Some(1.0));
    }

    #[test]
    fn unrelaxed_primary_is_optimal() {
        let (spec, x, y, _) = spec();
        let backend = ScriptedBackend::new(vec![Ok(vec![10.0, 5.0, 0.0]), Ok(vec![10.0, 1.0, 0.0])]);
        let report = solve_lexicographic(&spec, &hierarchy(x, y), &backend, &SolveOptions::default());
        assert_eq!(report.status, SolveStatus::Optimal);
    }

    #[test]
    fn auxiliaries_activate_with_their_objective() {
        let (spec, x, _, aux) = spec();
        let hierarchy = ObjectiveHierarchy::new()
            .with(Objective::minimize("cost", 0, LinearExpr::from(x)))
            .with(Objective::minimize("swing", 1, LinearExpr::from(aux)));
        let backend = ScriptedBackend::new(vec![Ok(vec![1.0, 0.0, f64::NAN]), Ok(vec![1.0, 0.0, 2.0])]);
        let report = solve_lexicographic(&spec, &hierarchy, &backend, &SolveOptions::default());
        assert!(report.status.is_success());
        let active = backend.seen_active.lock().unwrap();
        assert_eq!(active[0], vec![true, true, false]);
        assert_eq!(active[1], vec![true, true, true]);
    }

    #[test]
    fn failure_names_phase() {
        let (spec, x, y, _) = spec();
        let backend = ScriptedBackend::new(vec![
            Ok(vec![10.0, 5.0, 0.0]),
            Err(BackendFailure::Unbounded),
        ]);
        let report = solve_lexicographic(&spec, &hierarchy(x, y), &backend, &SolveOptions::default());
        assert_eq!(
            report.status,
            SolveStatus::Unbounded {
                phase: "reject".into()
            }
        );
        assert_eq!(report.phases.len(), 1);
        let err = report.into_checked(&spec).unwrap_err();
        assert!(matches!(err, DispatchError::Unbounded { .. }));
    }

    #[test]
    fn trivially_infeasible_model_skips_backend() {
        let (mut spec, x, y, _) = spec();
        spec.add_constraint(LinearConstraint::new(
            ConstraintFamily::Cooling,
            Some(0),
            LinearExpr::from(x),
            Relation::Eq,
            -3.0,
        ));
        let backend = ScriptedBackend::new(Vec::new());
        let report = solve_lexicographic(&spec, &hierarchy(x, y), &backend, &SolveOptions::default());
        assert_eq!(
            report.status,
            SolveStatus::Infeasible {
                phase: "cost".into()
            }
        );
        assert!(backend.seen_bounds.lock().unwrap().is_empty());
        let err = report.into_checked(&spec).unwrap_err().to_string();
        assert!(err.contains("cost"));
        assert!(err.contains("Cooling at step 0"));
    }

    #[test]
    fn not_solved_is_unavailable() {
        let (spec, ..) = spec();
        let err = SolveReport::not_solved().into_checked(&spec).unwrap_err();
        assert!(matches!(err, DispatchError::ResultUnavailable(_)));
    }
}
