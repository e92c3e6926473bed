//! Solver-independent linear model.
//!
//! [`ModelSpec`] is the hand-off point between constraint generation and the
//! LP backends: a flat list of bounded variables and tagged linear
//! constraints. It can be cloned, inspected, and evaluated against a
//! candidate solution without any solver in the loop.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use hubflow_core::Link;
use serde::Serialize;

/// Index of a variable inside a [`ModelSpec`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId(pub usize);

impl VarId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Auxiliary extremum of a time-indexed quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Extremal {
    StorageMax,
    StorageMin,
    BackfeedMax,
    BackfeedMin,
}

impl Extremal {
    pub fn name(self) -> &'static str {
        match self {
            Extremal::StorageMax => "storage_max",
            Extremal::StorageMin => "storage_min",
            Extremal::BackfeedMax => "backfeed_max",
            Extremal::BackfeedMin => "backfeed_min",
        }
    }

    pub fn is_upper(self) -> bool {
        matches!(self, Extremal::StorageMax | Extremal::BackfeedMax)
    }
}

/// What a variable stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VarKind {
    Flow { link: Link, step: usize },
    StorageState { step: usize },
    Extremal(Extremal),
}

impl VarKind {
    /// Auxiliary variables only enter a solve once an objective refers to them.
    pub fn is_auxiliary(self) -> bool {
        matches!(self, VarKind::Extremal(_))
    }
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKind::Flow { link, step } => write!(f, "flow[{}][{}]", link.key(), step),
            VarKind::StorageState { step } => write!(f, "storage_state[{}]", step),
            VarKind::Extremal(e) => f.write_str(e.name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VariableDef {
    pub kind: VarKind,
    /// `None` for a free variable
    pub lower: Option<f64>,
}

/// Affine expression `Σ coef·var + constant`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Builder-style term addition
    pub fn term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) {
        self.terms.push((var, coef));
    }

    /// Unit-coefficient sum of `vars`
    pub fn sum<I: IntoIterator<Item = VarId>>(vars: I) -> Self {
        Self {
            terms: vars.into_iter().map(|v| (v, 1.0)).collect(),
            constant: 0.0,
        }
    }

    pub fn scaled(mut self, factor: f64) -> Self {
        for (_, coef) in &mut self.terms {
            *coef *= factor;
        }
        self.constant *= factor;
        self
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coef)| coef * values[var.index()])
            .sum::<f64>()
            + self.constant
    }

    pub fn vars(&self) -> impl Iterator<Item = VarId> + '_ {
        self.terms.iter().map(|(var, _)| *var)
    }
}

impl From<VarId> for LinearExpr {
    fn from(var: VarId) -> Self {
        LinearExpr::new().term(var, 1.0)
    }
}

impl Mul<VarId> for f64 {
    type Output = LinearExpr;

    fn mul(self, var: VarId) -> LinearExpr {
        LinearExpr::new().term(var, self)
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        self.terms.extend(rhs.terms);
        self.constant += rhs.constant;
        self
    }
}

impl Add<VarId> for LinearExpr {
    type Output = LinearExpr;

    fn add(self, rhs: VarId) -> LinearExpr {
        self.term(rhs, 1.0)
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: LinearExpr) -> LinearExpr {
        self + rhs.neg()
    }
}

impl Sub<VarId> for LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: VarId) -> LinearExpr {
        self.term(rhs, -1.0)
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self.scaled(-1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Relation {
    Eq,
    Le,
    Ge,
}

/// Constraint families, used for tagging and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ConstraintFamily {
    HubConservation,
    Demand,
    PvProduction,
    Cooling,
    LowTempHeating,
    HighTempHeating,
    LakeSource,
    PowerToGas,
    GasBoiler,
    Chp,
    StorageContinuity,
    StorageClosure,
    Extremal,
    /// Lexicographic bound added between solve phases
    ObjectiveBound,
}

impl fmt::Display for ConstraintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// `expr (relation) rhs`, where `expr` carries no constant
#[derive(Debug, Clone, PartialEq)]
pub struct LinearConstraint {
    pub family: ConstraintFamily,
    pub step: Option<usize>,
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl LinearConstraint {
    /// Build `lhs (relation) rhs`, folding the constant of `lhs` into `rhs`.
    pub fn new(
        family: ConstraintFamily,
        step: Option<usize>,
        mut lhs: LinearExpr,
        relation: Relation,
        rhs: f64,
    ) -> Self {
        let rhs = rhs - lhs.constant;
        lhs.constant = 0.0;
        Self {
            family,
            step,
            expr: lhs,
            relation,
            rhs,
        }
    }

    /// Amount by which `values` violates this constraint (0 when satisfied).
    pub fn violation(&self, values: &[f64]) -> f64 {
        let lhs = self.expr.evaluate(values);
        match self.relation {
            Relation::Eq => (lhs - self.rhs).abs(),
            Relation::Le => (lhs - self.rhs).max(0.0),
            Relation::Ge => (self.rhs - lhs).max(0.0),
        }
    }

    fn location(&self) -> String {
        match self.step {
            Some(step) => format!("{} at step {}", self.family, step),
            None => self.family.to_string(),
        }
    }
}

/// Constraint that pins a non-negative variable to a negative value
#[derive(Debug, Clone, PartialEq)]
pub struct FixedNegative {
    pub family: ConstraintFamily,
    pub step: Option<usize>,
    pub variable: VarKind,
    pub value: f64,
}

impl fmt::Display for FixedNegative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = match self.step {
            Some(step) => format!("{} at step {}", self.family, step),
            None => self.family.to_string(),
        };
        write!(
            f,
            "{} fixes non-negative {} to {:.6}",
            location, self.variable, self.value
        )
    }
}

/// Variables and constraints of one dispatch problem
#[derive(Debug, Clone, Default)]
pub struct ModelSpec {
    variables: Vec<VariableDef>,
    constraints: Vec<LinearConstraint>,
}

impl ModelSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, kind: VarKind, lower: Option<f64>) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(VariableDef { kind, lower });
        id
    }

    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    pub fn variables(&self) -> &[VariableDef] {
        &self.variables
    }

    pub fn variable(&self, id: VarId) -> &VariableDef {
        &self.variables[id.index()]
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn family_counts(&self) -> BTreeMap<ConstraintFamily, usize> {
        let mut counts = BTreeMap::new();
        for constraint in &self.constraints {
            *counts.entry(constraint.family).or_insert(0) += 1;
        }
        counts
    }

    /// Largest constraint or bound violation of `values`.
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        let bounds = self
            .variables
            .iter()
            .zip(values)
            .filter_map(|(def, value)| def.lower.map(|lb| (lb - value).max(0.0)));
        self.constraints
            .iter()
            .map(|c| c.violation(values))
            .chain(bounds)
            .fold(0.0, f64::max)
    }

    /// Location of the worst violated constraint, for log messages.
    pub fn worst_constraint(&self, values: &[f64]) -> Option<(String, f64)> {
        self.constraints
            .iter()
            .map(|c| (c, c.violation(values)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(c, v)| (c.location(), v))
    }

    /// First equality of the form `a·x == b` that forces a variable with a
    /// non-negative lower bound below zero. Such a model is infeasible
    /// regardless of the rest of the system.
    pub fn find_fixed_negative(&self) -> Option<FixedNegative> {
        self.constraints.iter().find_map(|c| {
            if c.relation != Relation::Eq || c.expr.terms.len() != 1 {
                return None;
            }
            let (var, coef) = c.expr.terms[0];
            if coef == 0.0 {
                return None;
            }
            let def = self.variable(var);
            let lower = def.lower?;
            let value = c.rhs / coef;
            (value < lower).then(|| FixedNegative {
                family: c.family,
                step: c.step,
                variable: def.kind,
                value,
            })
        })
    }

    /// One-line size summary used in error context.
    pub fn describe(&self) -> String {
        format!(
            "{} variables, {} constraints",
            self.num_variables(),
            self.num_constraints()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_var_spec() -> (ModelSpec, VarId, VarId) {
        let mut spec = ModelSpec::new();
        let x = spec.add_variable(
            VarKind::Flow {
                link: Link::MvToLv,
                step: 0,
            },
            Some(0.0),
        );
        let s = spec.add_variable(VarKind::StorageState { step: 0 }, None);
        (spec, x, s)
    }

    #[test]
    fn expression_arithmetic() {
        let (_, x, s) = two_var_spec();
        let expr = 2.0 * x + LinearExpr::constant(3.0) - s;
        assert_eq!(expr.evaluate(&[1.0, 4.0]), 2.0 + 3.0 - 4.0);
        assert_eq!((-expr).evaluate(&[1.0, 4.0]), -1.0);
        assert_eq!(LinearExpr::sum([x, s]).evaluate(&[1.5, 2.5]), 4.0);
    }

    #[test]
    fn constant_folds_into_rhs() {
        let (_, x, _) = two_var_spec();
        let c = LinearConstraint::new(
            ConstraintFamily::Demand,
            Some(0),
            LinearExpr::from(x) + LinearExpr::constant(2.0),
            Relation::Eq,
            5.0,
        );
        assert_eq!(c.rhs, 3.0);
        assert_eq!(c.expr.constant, 0.0);
        assert_eq!(c.violation(&[3.0, 0.0]), 0.0);
        assert_eq!(c.violation(&[1.0, 0.0]), 2.0);
    }

    #[test]
    fn max_violation_includes_bounds() {
        let (mut spec, x, s) = two_var_spec();
        spec.add_constraint(LinearConstraint::new(
            ConstraintFamily::StorageContinuity,
            Some(0),
            LinearExpr::from(s) - x,
            Relation::Eq,
            0.0,
        ));
        assert_eq!(spec.max_violation(&[1.0, 1.0]), 0.0);
        assert_eq!(spec.max_violation(&[-2.0, -2.0]), 2.0);
        assert_eq!(spec.max_violation(&[1.0, 1.5]), 0.5);
    }

    #[test]
    fn fixed_negative_detected() {
        let (mut spec, x, s) = two_var_spec();
        spec.add_constraint(LinearConstraint::new(
            ConstraintFamily::StorageClosure,
            None,
            LinearExpr::from(s),
            Relation::Eq,
            -1.0,
        ));
        assert!(spec.find_fixed_negative().is_none());

        spec.add_constraint(LinearConstraint::new(
            ConstraintFamily::Cooling,
            Some(3),
            2.0 * x,
            Relation::Eq,
            -4.0,
        ));
        let found = spec.find_fixed_negative().unwrap();
        assert_eq!(found.family, ConstraintFamily::Cooling);
        assert_eq!(found.step, Some(3));
        assert_eq!(found.value, -2.0);
        assert!(found.to_string().contains("flow[mv][0]"));
    }

    #[test]
    fn family_counts_group_constraints() {
        let (mut spec, x, _) = two_var_spec();
        for step in 0..3 {
            spec.add_constraint(LinearConstraint::new(
                ConstraintFamily::Demand,
                Some(step),
                LinearExpr::from(x),
                Relation::Eq,
                1.0,
            ));
        }
        assert_eq!(spec.family_counts()[&ConstraintFamily::Demand], 3);
        assert_eq!(spec.describe(), "2 variables, 3 constraints");
    }
}
