//! Prioritized objectives.
//!
//! Objectives are solved in ascending priority. Objectives sharing a priority
//! form a single phase and are blended by weight.

use std::fmt;

use hubflow_core::{DispatchParams, ImportPrices, Link, SecondaryObjective};
use serde::Serialize;

use super::constraints::DispatchModel;
use super::model::{Extremal, LinearExpr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sense {
    Minimize,
    Maximize,
}

impl Sense {
    /// Multiplier turning this sense into minimization
    pub fn sign(self) -> f64 {
        match self {
            Sense::Minimize => 1.0,
            Sense::Maximize => -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub name: String,
    /// Lower numbers are optimized first
    pub priority: u32,
    pub weight: f64,
    /// Relative degradation allowed once this objective is fixed
    pub rel_tol: f64,
    pub abs_tol: f64,
    pub sense: Sense,
    pub target: LinearExpr,
}

impl Objective {
    pub fn minimize(name: impl Into<String>, priority: u32, target: LinearExpr) -> Self {
        Self {
            name: name.into(),
            priority,
            weight: 1.0,
            rel_tol: 0.0,
            abs_tol: 0.0,
            sense: Sense::Minimize,
            target,
        }
    }

    pub fn with_rel_tol(mut self, rel_tol: f64) -> Self {
        self.rel_tol = rel_tol;
        self
    }

    pub fn with_abs_tol(mut self, abs_tol: f64) -> Self {
        self.abs_tol = abs_tol;
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn maximize(mut self) -> Self {
        self.sense = Sense::Maximize;
        self
    }
}

/// One solve phase: every objective of a priority level, blended into a
/// single minimization target.
#[derive(Debug, Clone)]
pub struct Phase {
    pub name: String,
    pub priority: u32,
    pub members: Vec<usize>,
    /// Weighted sum of the members, signed for minimization
    pub target: LinearExpr,
    pub rel_tol: f64,
    pub abs_tol: f64,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (priority {})", self.name, self.priority)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectiveHierarchy {
    objectives: Vec<Objective>,
}

impl ObjectiveHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, objective: Objective) {
        self.objectives.push(objective);
    }

    pub fn with(mut self, objective: Objective) -> Self {
        self.push(objective);
        self
    }

    pub fn len(&self) -> usize {
        self.objectives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objectives.is_empty()
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    /// Objectives by ascending priority; insertion order among equals.
    pub fn ordered(&self) -> Vec<&Objective> {
        let mut ordered: Vec<&Objective> = self.objectives.iter().collect();
        ordered.sort_by_key(|o| o.priority);
        ordered
    }

    /// Override the absolute slack of every objective.
    pub fn set_abs_tolerance(&mut self, abs_tol: f64) {
        for objective in &mut self.objectives {
            objective.abs_tol = abs_tol;
        }
    }

    pub fn phases(&self) -> Vec<Phase> {
        let mut order: Vec<usize> = (0..self.objectives.len()).collect();
        order.sort_by_key(|&i| self.objectives[i].priority);

        let mut phases: Vec<Phase> = Vec::new();
        for i in order {
            let objective = &self.objectives[i];
            let contribution = objective
                .target
                .clone()
                .scaled(objective.weight * objective.sense.sign());
            match phases.last_mut() {
                Some(phase) if phase.priority == objective.priority => {
                    phase.name.push('+');
                    phase.name.push_str(&objective.name);
                    phase.members.push(i);
                    phase.target = std::mem::take(&mut phase.target) + contribution;
                    phase.rel_tol = phase.rel_tol.min(objective.rel_tol);
                    phase.abs_tol = phase.abs_tol.min(objective.abs_tol);
                }
                _ => phases.push(Phase {
                    name: objective.name.clone(),
                    priority: objective.priority,
                    members: vec![i],
                    target: contribution,
                    rel_tol: objective.rel_tol,
                    abs_tol: objective.abs_tol,
                }),
            }
        }
        phases
    }

    /// Import cost first, then the configured secondary objective.
    pub fn standard(model: &DispatchModel, params: &DispatchParams) -> Self {
        let primary = import_cost(model, model.prices()).with_rel_tol(params.primary_rel_tol);
        let mut hierarchy = Self::new().with(primary);
        if let Some(secondary) = secondary_objective(model, params.secondary) {
            hierarchy.push(secondary);
        }
        hierarchy
    }
}

/// `price_elec·Σ mv→lv + price_gas·Σ mp→gas`
pub fn import_cost(model: &DispatchModel, prices: &ImportPrices) -> Objective {
    let target = model.link_total(Link::MvToLv).scaled(prices.electricity)
        + model.link_total(Link::MpToGas).scaled(prices.gas);
    Objective::minimize("import_cost", 0, target)
}

/// Secondary target at priority 1. `None` when the model lacks the
/// auxiliaries the objective needs.
pub fn secondary_objective(model: &DispatchModel, kind: SecondaryObjective) -> Option<Objective> {
    let swing = |upper: Extremal, lower: Extremal| -> Option<LinearExpr> {
        let max = model.extremal(upper)?;
        let min = model.extremal(lower)?;
        Some(LinearExpr::from(max) - min)
    };
    let (name, target) = match kind {
        SecondaryObjective::Rejection => ("rejection", model.link_total(Link::LtToReject)),
        SecondaryObjective::StorageSwing => (
            "storage_swing",
            swing(Extremal::StorageMax, Extremal::StorageMin)?,
        ),
        SecondaryObjective::BackfeedSwing => (
            "backfeed_swing",
            swing(Extremal::BackfeedMax, Extremal::BackfeedMin)?,
        ),
    };
    Some(Objective::minimize(name, 1, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::model::VarId;

    fn obj(name: &str, priority: u32, var: usize) -> Objective {
        Objective::minimize(name, priority, LinearExpr::from(VarId(var)))
    }

    #[test]
    fn ordered_is_stable_by_priority() {
        let hierarchy = ObjectiveHierarchy::new()
            .with(obj("b", 1, 0))
            .with(obj("a", 0, 1))
            .with(obj("c", 1, 2));
        let names: Vec<_> = hierarchy.ordered().iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn equal_priorities_blend_into_one_phase() {
        let hierarchy = ObjectiveHierarchy::new()
            .with(obj("cost", 0, 0).with_rel_tol(0.1))
            .with(obj("reject", 1, 1).with_weight(2.0).with_rel_tol(0.05))
            .with(obj("profit", 1, 2).maximize().with_rel_tol(0.2));
        let phases = hierarchy.phases();
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[1].name, "reject+profit");
        assert_eq!(phases[1].members, vec![1, 2]);
        assert_eq!(phases[1].rel_tol, 0.05);
        // 2·x1 − x2
        assert_eq!(phases[1].target.evaluate(&[0.0, 1.0, 1.0]), 1.0);
    }

    #[test]
    fn abs_tolerance_override() {
        let mut hierarchy = ObjectiveHierarchy::new().with(obj("a", 0, 0));
        hierarchy.set_abs_tolerance(1e-3);
        assert_eq!(hierarchy.phases()[0].abs_tol, 1e-3);
    }
}
