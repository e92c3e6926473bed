//! Time-indexed constraint generation.
//!
//! For every step `t` the builder emits the per-step families (hub
//! conservation, demand matching, PV, and one family per technology). The
//! storage chain and closure couple the steps; extremal auxiliaries are
//! emitted last and only when requested.

use hubflow_core::{
    ConversionModel, DispatchParams, HeatPump, HorizonInputs, ImportPrices, Link, Node,
    SecondaryObjective, SeriesKind, Topology,
};

use super::model::{
    ConstraintFamily, Extremal, LinearConstraint, LinearExpr, ModelSpec, Relation, VarId,
};
use super::variables::FlowIndex;

/// Auxiliaries a secondary objective refers to
pub fn required_extremals(secondary: SecondaryObjective) -> &'static [Extremal] {
    match secondary {
        SecondaryObjective::Rejection => &[],
        SecondaryObjective::StorageSwing => &[Extremal::StorageMax, Extremal::StorageMin],
        SecondaryObjective::BackfeedSwing => &[Extremal::BackfeedMax, Extremal::BackfeedMin],
    }
}

/// Builder for [`DispatchModel`]; consumed by [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct DispatchModelBuilder {
    topology: Topology,
    conversion: ConversionModel,
    inputs: HorizonInputs,
    pv_scale: f64,
    prices: ImportPrices,
    extremals: Vec<Extremal>,
}

impl DispatchModelBuilder {
    pub fn new(
        topology: Topology,
        conversion: ConversionModel,
        inputs: HorizonInputs,
        params: &DispatchParams,
    ) -> Self {
        Self {
            topology,
            conversion,
            inputs,
            pv_scale: params.pv_scale,
            prices: ImportPrices::default(),
            extremals: required_extremals(params.secondary).to_vec(),
        }
    }

    pub fn pv_scale(mut self, pv_scale: f64) -> Self {
        self.pv_scale = pv_scale;
        self
    }

    pub fn prices(mut self, prices: ImportPrices) -> Self {
        self.prices = prices;
        self
    }

    /// Request additional extremal auxiliaries.
    pub fn with_extremals(mut self, extremals: &[Extremal]) -> Self {
        for &e in extremals {
            if !self.extremals.contains(&e) {
                self.extremals.push(e);
            }
        }
        self
    }

    pub fn build(self) -> DispatchModel {
        let horizon = self.inputs.horizon();
        let mut spec = ModelSpec::new();
        let index = FlowIndex::allocate(&mut spec, horizon, &self.extremals);

        let mut emitter = Emitter {
            spec: &mut spec,
            index: &index,
        };
        for t in 0..horizon {
            emitter.hub_conservation(&self.topology, t);
            emitter.demand(&self.inputs, t);
            emitter.pv(&self.inputs, self.pv_scale, t);
            emitter.heat_pumps(&self.conversion, &self.inputs, t);
            emitter.fixed_ratios(&self.conversion, t);
        }
        emitter.storage(horizon);
        emitter.extremals(horizon);

        tracing::info!(
            horizon,
            variables = spec.num_variables(),
            constraints = spec.num_constraints(),
            "dispatch model built"
        );
        for (family, count) in spec.family_counts() {
            tracing::debug!(%family, count, "constraint family");
        }

        DispatchModel {
            spec,
            index,
            topology: self.topology,
            conversion: self.conversion,
            inputs: self.inputs,
            pv_scale: self.pv_scale,
            prices: self.prices,
        }
    }
}

struct Emitter<'a> {
    spec: &'a mut ModelSpec,
    index: &'a FlowIndex,
}

impl Emitter<'_> {
    fn flow(&self, link: Link, t: usize) -> VarId {
        self.index.flow(link, t)
    }

    fn eq(&mut self, family: ConstraintFamily, step: Option<usize>, lhs: LinearExpr, rhs: f64) {
        self.spec
            .add_constraint(LinearConstraint::new(family, step, lhs, Relation::Eq, rhs));
    }

    /// `flow(link, t) == value`
    fn fix(&mut self, family: ConstraintFamily, link: Link, t: usize, value: f64) {
        let lhs = LinearExpr::from(self.flow(link, t));
        self.eq(family, Some(t), lhs, value);
    }

    /// `flow(output, t) == ratio · flow(input, t)`
    fn proportional(
        &mut self,
        family: ConstraintFamily,
        output: Link,
        input: Link,
        ratio: f64,
        t: usize,
    ) {
        let lhs = LinearExpr::from(self.flow(output, t)) - ratio * self.flow(input, t);
        self.eq(family, Some(t), lhs, 0.0);
    }

    fn hub_conservation(&mut self, topology: &Topology, t: usize) {
        for &hub in topology.hubs() {
            let inflow = LinearExpr::sum(self.index.inflows_at(topology, hub, t));
            let outflow = LinearExpr::sum(self.index.outflows_at(topology, hub, t));
            self.eq(ConstraintFamily::HubConservation, Some(t), inflow - outflow, 0.0);
        }
    }

    fn demand(&mut self, inputs: &HorizonInputs, t: usize) {
        let family = ConstraintFamily::Demand;
        self.fix(
            family,
            Link::HtToSubstation,
            t,
            inputs.sample(SeriesKind::SubstationHeatingDemand, t),
        );
        self.fix(
            family,
            Link::GasToDirect,
            t,
            inputs.sample(SeriesKind::GasHeatingDemand, t),
        );
        self.fix(
            family,
            Link::LvToElectricityDirect,
            t,
            inputs.sample(SeriesKind::ElectricityDemand, t),
        );
    }

    fn pv(&mut self, inputs: &HorizonInputs, pv_scale: f64, t: usize) {
        let production = pv_scale * inputs.sample(SeriesKind::PvProduction, t);
        self.fix(ConstraintFamily::PvProduction, Link::PvToLv, t, production);
    }

    fn heat_pumps(&mut self, conversion: &ConversionModel, inputs: &HorizonInputs, t: usize) {
        // Cooling: building heat plus compressor work is rejected into the LT network
        let cop = conversion.cop(HeatPump::CoolingLt);
        let cooling = inputs.sample(SeriesKind::CoolingDemand, t);
        self.fix(
            ConstraintFamily::Cooling,
            Link::HpCoolToLt,
            t,
            (1.0 + 1.0 / cop) * cooling,
        );
        self.fix(ConstraintFamily::Cooling, Link::LvToHpCool, t, cooling / cop);

        let cop = conversion.cop(HeatPump::HeatingLt);
        let heating = inputs.sample(SeriesKind::NetworkHeatingDemand, t);
        self.fix(
            ConstraintFamily::LowTempHeating,
            Link::LtToHpHeatLt,
            t,
            (1.0 - 1.0 / cop) * heating,
        );
        self.fix(
            ConstraintFamily::LowTempHeating,
            Link::LvToHpHeatLt,
            t,
            heating / cop,
        );

        // Both HT equalities are kept; together they fix the ratio of all three flows
        let cop = conversion.cop(HeatPump::HeatingHt);
        self.proportional(
            ConstraintFamily::HighTempHeating,
            Link::HpHeatHtToHt,
            Link::LtToHpHeatHt,
            1.0 + 1.0 / cop,
            t,
        );
        self.proportional(
            ConstraintFamily::HighTempHeating,
            Link::HpHeatHtToHt,
            Link::LvToHpHeatHt,
            cop,
            t,
        );

        let cop = conversion.cop(HeatPump::Lake);
        self.proportional(
            ConstraintFamily::LakeSource,
            Link::HpLakeToLt,
            Link::LvToHpLake,
            cop,
            t,
        );
        let lhs = LinearExpr::from(self.flow(Link::LakeToHpLake, t))
            - self.flow(Link::HpLakeToLt, t)
            + self.flow(Link::LvToHpLake, t);
        self.eq(ConstraintFamily::LakeSource, Some(t), lhs, 0.0);
    }

    fn fixed_ratios(&mut self, conversion: &ConversionModel, t: usize) {
        let ratios = *conversion.ratios();
        self.proportional(
            ConstraintFamily::PowerToGas,
            Link::PowerToGasToGas,
            Link::LvToPowerToGas,
            ratios.power_to_gas,
            t,
        );
        self.proportional(
            ConstraintFamily::GasBoiler,
            Link::GasBoilerToHt,
            Link::GasToBoiler,
            ratios.gas_boiler,
            t,
        );
        self.proportional(
            ConstraintFamily::Chp,
            Link::ChpToHt,
            Link::GasToChp,
            ratios.chp_ht,
            t,
        );
        self.proportional(
            ConstraintFamily::Chp,
            Link::ChpToLv,
            Link::GasToChp,
            ratios.chp_lv,
            t,
        );
    }

    fn storage(&mut self, horizon: usize) {
        let family = ConstraintFamily::StorageContinuity;
        let storage = Link::STORAGE;
        let lhs = LinearExpr::from(self.index.storage_state(0)) - self.flow(storage, 0);
        self.eq(family, Some(0), lhs, 0.0);
        for t in 1..horizon {
            let lhs = LinearExpr::from(self.index.storage_state(t))
                - self.flow(storage, t)
                - self.index.storage_state(t - 1);
            self.eq(family, Some(t), lhs, 0.0);
        }

        let closure = LinearExpr::sum(self.index.link_series(storage).iter().copied());
        self.eq(ConstraintFamily::StorageClosure, None, closure, 0.0);
    }

    fn extremals(&mut self, horizon: usize) {
        let requested: Vec<_> = self.index.extremals().collect();
        for (extremal, aux) in requested {
            for t in 0..horizon {
                let tracked = match extremal {
                    Extremal::StorageMax | Extremal::StorageMin => self.index.storage_state(t),
                    Extremal::BackfeedMax | Extremal::BackfeedMin => {
                        self.flow(Link::LvToMv, t)
                    }
                };
                // upper: aux ≥ x[t]; lower: aux ≤ x[t]
                let lhs = if extremal.is_upper() {
                    LinearExpr::from(aux) - tracked
                } else {
                    LinearExpr::from(tracked) - aux
                };
                self.spec.add_constraint(LinearConstraint::new(
                    ConstraintFamily::Extremal,
                    Some(t),
                    lhs,
                    Relation::Ge,
                    0.0,
                ));
            }
        }
    }
}

/// Immutable dispatch model: variables, constraints, and the data they came from.
#[derive(Debug, Clone)]
pub struct DispatchModel {
    spec: ModelSpec,
    index: FlowIndex,
    topology: Topology,
    conversion: ConversionModel,
    inputs: HorizonInputs,
    pv_scale: f64,
    prices: ImportPrices,
}

impl DispatchModel {
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn index(&self) -> &FlowIndex {
        &self.index
    }

    pub fn horizon(&self) -> usize {
        self.index.horizon()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn conversion(&self) -> &ConversionModel {
        &self.conversion
    }

    pub fn inputs(&self) -> &HorizonInputs {
        &self.inputs
    }

    pub fn pv_scale(&self) -> f64 {
        self.pv_scale
    }

    pub fn prices(&self) -> &ImportPrices {
        &self.prices
    }

    pub fn flow(&self, link: Link, step: usize) -> VarId {
        self.index.flow(link, step)
    }

    pub fn link_series(&self, link: Link) -> &[VarId] {
        self.index.link_series(link)
    }

    pub fn storage_state(&self, step: usize) -> VarId {
        self.index.storage_state(step)
    }

    pub fn extremal(&self, extremal: Extremal) -> Option<VarId> {
        self.index.extremal(extremal)
    }

    pub fn constraints_in(
        &self,
        family: ConstraintFamily,
    ) -> impl Iterator<Item = &LinearConstraint> + '_ {
        self.spec
            .constraints()
            .iter()
            .filter(move |c| c.family == family)
    }

    /// Sum of a link's flow over the whole horizon, as an expression.
    pub fn link_total(&self, link: Link) -> LinearExpr {
        LinearExpr::sum(self.link_series(link).iter().copied())
    }

    /// Sum of the flows entering a hub at step `t` minus those leaving it.
    pub fn hub_balance(&self, hub: Node, step: usize) -> LinearExpr {
        LinearExpr::sum(self.index.inflows_at(&self.topology, hub, step))
            - LinearExpr::sum(self.index.outflows_at(&self.topology, hub, step))
    }
}
