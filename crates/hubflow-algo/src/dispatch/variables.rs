//! Variable allocation for the full horizon.
//!
//! All flow variables are allocated link-major before any constraint is
//! emitted: the flow of link `l` at step `t` is variable `l·H + t`. Storage
//! states (non-negative) follow, then any requested extremal auxiliaries.

use std::collections::BTreeMap;

use hubflow_core::{FlowBound, Link, Node, Topology};

use super::model::{Extremal, ModelSpec, VarId, VarKind};

/// Lookup from `(link, step)` and friends to model variables
#[derive(Debug, Clone)]
pub struct FlowIndex {
    horizon: usize,
    flows: Vec<VarId>,
    storage_states: Vec<VarId>,
    extremals: BTreeMap<Extremal, VarId>,
}

impl FlowIndex {
    pub fn allocate(spec: &mut ModelSpec, horizon: usize, extremals: &[Extremal]) -> Self {
        let mut flows = Vec::with_capacity(Link::COUNT * horizon);
        for link in Link::all() {
            let lower = match link.bound() {
                FlowBound::NonNegative => Some(0.0),
                FlowBound::Free => None,
            };
            for step in 0..horizon {
                flows.push(spec.add_variable(VarKind::Flow { link, step }, lower));
            }
        }

        // Cumulative storage position never drops below the initial level
        let storage_states = (0..horizon)
            .map(|step| spec.add_variable(VarKind::StorageState { step }, Some(0.0)))
            .collect();

        let extremals = extremals
            .iter()
            .map(|&e| (e, spec.add_variable(VarKind::Extremal(e), None)))
            .collect();

        Self {
            horizon,
            flows,
            storage_states,
            extremals,
        }
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    #[inline]
    pub fn flow(&self, link: Link, step: usize) -> VarId {
        self.flows[link.index() * self.horizon + step]
    }

    /// Flow variables of `link` for every step, in step order.
    pub fn link_series(&self, link: Link) -> &[VarId] {
        let start = link.index() * self.horizon;
        &self.flows[start..start + self.horizon]
    }

    pub fn inflows_at<'a>(
        &'a self,
        topology: &'a Topology,
        node: Node,
        step: usize,
    ) -> impl Iterator<Item = VarId> + 'a {
        topology
            .inflows(node)
            .iter()
            .map(move |&link| self.flow(link, step))
    }

    pub fn outflows_at<'a>(
        &'a self,
        topology: &'a Topology,
        node: Node,
        step: usize,
    ) -> impl Iterator<Item = VarId> + 'a {
        topology
            .outflows(node)
            .iter()
            .map(move |&link| self.flow(link, step))
    }

    pub fn storage_state(&self, step: usize) -> VarId {
        self.storage_states[step]
    }

    pub fn storage_states(&self) -> &[VarId] {
        &self.storage_states
    }

    pub fn extremal(&self, extremal: Extremal) -> Option<VarId> {
        self.extremals.get(&extremal).copied()
    }

    pub fn extremals(&self) -> impl Iterator<Item = (Extremal, VarId)> + '_ {
        self.extremals.iter().map(|(e, v)| (*e, *v))
    }
}
