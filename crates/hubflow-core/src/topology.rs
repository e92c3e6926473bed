//! Static flow network of the district energy system.
//!
//! The node set and the link table are closed enumerations fixed at compile
//! time. [`Topology`] turns the table into a `petgraph` directed graph once and
//! precomputes per-node inflow and outflow lists, so constraint generation
//! never has to pattern-match over (source, target) pairs.

use std::collections::HashMap;
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;

/// Energy carrier or conversion technology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Low-voltage electricity grid (hub)
    LowVoltage,
    /// Medium-voltage feeder (external electricity supply)
    MediumVoltage,
    /// Gas distribution network (hub)
    GasNetwork,
    /// Medium-pressure gas supply (external gas supply)
    MediumPressure,
    /// High-temperature district heating network (hub)
    HighTempNetwork,
    /// Low-temperature heating/cooling network (hub)
    LowTempNetwork,
    Lake,
    HpLake,
    HpHeatLt,
    HpCoolLt,
    HpHeatHt,
    Chp,
    GasBoiler,
    PowerToGas,
    Pv,
    GasStorage,
    Substation,
    Reject,
    GasDirect,
    ElectricityDirect,
}

impl Node {
    pub const ALL: [Node; 20] = [
        Node::LowVoltage,
        Node::MediumVoltage,
        Node::GasNetwork,
        Node::MediumPressure,
        Node::HighTempNetwork,
        Node::LowTempNetwork,
        Node::Lake,
        Node::HpLake,
        Node::HpHeatLt,
        Node::HpCoolLt,
        Node::HpHeatHt,
        Node::Chp,
        Node::GasBoiler,
        Node::PowerToGas,
        Node::Pv,
        Node::GasStorage,
        Node::Substation,
        Node::Reject,
        Node::GasDirect,
        Node::ElectricityDirect,
    ];

    /// Hub nodes subject to conservation at every step
    pub const HUBS: [Node; 4] = [
        Node::HighTempNetwork,
        Node::LowTempNetwork,
        Node::LowVoltage,
        Node::GasNetwork,
    ];

    /// Short label used in reports and Graphviz output
    pub fn label(self) -> &'static str {
        match self {
            Node::LowVoltage => "lv",
            Node::MediumVoltage => "mv",
            Node::GasNetwork => "gas",
            Node::MediumPressure => "mp",
            Node::HighTempNetwork => "ht_dhn",
            Node::LowTempNetwork => "lt_dhcn",
            Node::Lake => "lake",
            Node::HpLake => "hp_lake",
            Node::HpHeatLt => "hp_heat_lt",
            Node::HpCoolLt => "hp_cool_lt",
            Node::HpHeatHt => "hp_heat_ht",
            Node::Chp => "chp",
            Node::GasBoiler => "gas_b",
            Node::PowerToGas => "p2g",
            Node::Pv => "pv",
            Node::GasStorage => "gas_storage",
            Node::Substation => "sub",
            Node::Reject => "reject",
            Node::GasDirect => "gas_direct",
            Node::ElectricityDirect => "electricity_direct",
        }
    }

    pub fn is_hub(self) -> bool {
        Node::HUBS.contains(&self)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lower bound policy of a link's flow variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlowBound {
    /// Flow ≥ 0
    NonNegative,
    /// Either sign, unbounded (storage injection/withdrawal)
    Free,
}

/// Directed technology link. Discriminants index [`LINK_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Link {
    // Low-temperature network
    HpLakeToLt,
    LakeToHpLake,
    HpCoolToLt,
    LtToHpHeatLt,
    LtToReject,
    LtToHpHeatHt,
    // High-temperature network
    HpHeatHtToHt,
    HtToSubstation,
    GasBoilerToHt,
    ChpToHt,
    // Gas
    PowerToGasToGas,
    GasToChp,
    GasToDirect,
    GasToBoiler,
    MpToGas,
    // Low-voltage inputs
    PvToLv,
    ChpToLv,
    MvToLv,
    // Low-voltage outputs
    LvToHpHeatHt,
    LvToHpCool,
    LvToHpHeatLt,
    LvToHpLake,
    LvToElectricityDirect,
    LvToPowerToGas,
    LvToMv,
    // Storage
    StorageToGas,
}

/// Static description of one link
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkSpec {
    pub link: Link,
    pub source: Node,
    pub target: Node,
    /// Aggregate key used in result totals and CSV headers
    pub key: &'static str,
    pub bound: FlowBound,
}

const fn spec(link: Link, source: Node, target: Node, key: &'static str) -> LinkSpec {
    LinkSpec {
        link,
        source,
        target,
        key,
        bound: FlowBound::NonNegative,
    }
}

/// The district link table, ordered by [`Link`] discriminant.
pub const LINK_TABLE: [LinkSpec; 26] = [
    spec(Link::HpLakeToLt, Node::HpLake, Node::LowTempNetwork, "hp_lake_lt"),
    spec(Link::LakeToHpLake, Node::Lake, Node::HpLake, "lake"),
    spec(Link::HpCoolToLt, Node::HpCoolLt, Node::LowTempNetwork, "hp_cool_lt"),
    spec(Link::LtToHpHeatLt, Node::LowTempNetwork, Node::HpHeatLt, "lt_dhcn_hp_heat_lt"),
    spec(Link::LtToReject, Node::LowTempNetwork, Node::Reject, "lt_dhcn_reject"),
    spec(Link::LtToHpHeatHt, Node::LowTempNetwork, Node::HpHeatHt, "lt_dhcn_hp_heat_ht"),
    spec(Link::HpHeatHtToHt, Node::HpHeatHt, Node::HighTempNetwork, "hp_heat_ht"),
    spec(Link::HtToSubstation, Node::HighTempNetwork, Node::Substation, "sub"),
    spec(Link::GasBoilerToHt, Node::GasBoiler, Node::HighTempNetwork, "gas_ht"),
    spec(Link::ChpToHt, Node::Chp, Node::HighTempNetwork, "chp_ht"),
    spec(Link::PowerToGasToGas, Node::PowerToGas, Node::GasNetwork, "p2g_gas"),
    spec(Link::GasToChp, Node::GasNetwork, Node::Chp, "gas_chp"),
    spec(Link::GasToDirect, Node::GasNetwork, Node::GasDirect, "gas_gas_direct"),
    spec(Link::GasToBoiler, Node::GasNetwork, Node::GasBoiler, "gas_gas_b"),
    spec(Link::MpToGas, Node::MediumPressure, Node::GasNetwork, "mp"),
    spec(Link::PvToLv, Node::Pv, Node::LowVoltage, "pv"),
    spec(Link::ChpToLv, Node::Chp, Node::LowVoltage, "chp_lv"),
    spec(Link::MvToLv, Node::MediumVoltage, Node::LowVoltage, "mv"),
    spec(Link::LvToHpHeatHt, Node::LowVoltage, Node::HpHeatHt, "lv_hp_heat_ht"),
    spec(Link::LvToHpCool, Node::LowVoltage, Node::HpCoolLt, "lv_hp_cool_lt"),
    spec(Link::LvToHpHeatLt, Node::LowVoltage, Node::HpHeatLt, "lv_hp_heat_lt"),
    spec(Link::LvToHpLake, Node::LowVoltage, Node::HpLake, "lv_hp_lake"),
    spec(
        Link::LvToElectricityDirect,
        Node::LowVoltage,
        Node::ElectricityDirect,
        "lv_electricity_direct",
    ),
    spec(Link::LvToPowerToGas, Node::LowVoltage, Node::PowerToGas, "lv_p2g"),
    spec(Link::LvToMv, Node::LowVoltage, Node::MediumVoltage, "lv_mv"),
    LinkSpec {
        link: Link::StorageToGas,
        source: Node::GasStorage,
        target: Node::GasNetwork,
        key: "gas_storage",
        bound: FlowBound::Free,
    },
];

impl Link {
    pub const COUNT: usize = LINK_TABLE.len();

    /// The single storage link (net injection when positive)
    pub const STORAGE: Link = Link::StorageToGas;

    /// All links in table order
    pub fn all() -> impl Iterator<Item = Link> {
        LINK_TABLE.iter().map(|spec| spec.link)
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn spec(self) -> &'static LinkSpec {
        &LINK_TABLE[self.index()]
    }

    pub fn source(self) -> Node {
        self.spec().source
    }

    pub fn target(self) -> Node {
        self.spec().target
    }

    pub fn key(self) -> &'static str {
        self.spec().key
    }

    pub fn bound(self) -> FlowBound {
        self.spec().bound
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source(), self.target())
    }
}

/// Directed multi-carrier network built once from [`LINK_TABLE`].
#[derive(Debug, Clone)]
pub struct Topology {
    pub graph: DiGraph<Node, Link>,
    node_index: HashMap<Node, NodeIndex>,
    inflows: HashMap<Node, Vec<Link>>,
    outflows: HashMap<Node, Vec<Link>>,
}

impl Topology {
    /// Build the district topology.
    pub fn district() -> Self {
        let mut graph = DiGraph::with_capacity(Node::ALL.len(), LINK_TABLE.len());
        let mut node_index = HashMap::with_capacity(Node::ALL.len());
        for node in Node::ALL {
            node_index.insert(node, graph.add_node(node));
        }

        let mut inflows: HashMap<Node, Vec<Link>> = HashMap::new();
        let mut outflows: HashMap<Node, Vec<Link>> = HashMap::new();
        for spec in &LINK_TABLE {
            graph.add_edge(node_index[&spec.source], node_index[&spec.target], spec.link);
            outflows.entry(spec.source).or_default().push(spec.link);
            inflows.entry(spec.target).or_default().push(spec.link);
        }

        Self {
            graph,
            node_index,
            inflows,
            outflows,
        }
    }

    /// All links in table order.
    pub fn links(&self) -> impl Iterator<Item = Link> + '_ {
        Link::all()
    }

    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.graph.node_indices().map(move |idx| self.graph[idx])
    }

    pub fn hubs(&self) -> &'static [Node] {
        &Node::HUBS
    }

    /// Links entering `node`.
    pub fn inflows(&self, node: Node) -> &[Link] {
        self.inflows.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Links leaving `node`.
    pub fn outflows(&self, node: Node) -> &[Link] {
        self.outflows.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Links matching the given endpoints; `None` matches any node.
    pub fn select(&self, source: Option<Node>, target: Option<Node>) -> Vec<Link> {
        let candidates: Box<dyn Iterator<Item = Link> + '_> = match (source, target) {
            (Some(src), _) => Box::new(self.outflows(src).iter().copied()),
            (None, Some(dst)) => Box::new(self.inflows(dst).iter().copied()),
            (None, None) => Box::new(Link::all()),
        };
        candidates
            .filter(|link| target.map_or(true, |dst| link.target() == dst))
            .collect()
    }

    /// The unique link from `source` to `target`, if any.
    pub fn link_between(&self, source: Node, target: Node) -> Option<Link> {
        self.outflows(source)
            .iter()
            .copied()
            .find(|link| link.target() == target)
    }

    pub fn storage_link(&self) -> Link {
        Link::STORAGE
    }

    pub fn node_index(&self, node: Node) -> Option<NodeIndex> {
        self.node_index.get(&node).copied()
    }

    /// Structural checks: every hub must have inflows and outflows and the
    /// network must form one weakly connected component.
    pub fn validate(&self) -> Diagnostics {
        let mut diag = Diagnostics::new();
        for &hub in self.hubs() {
            if self.inflows(hub).is_empty() {
                diag.add_error_with_entity("topology", "hub has no inflow links", hub.label());
            }
            if self.outflows(hub).is_empty() {
                diag.add_error_with_entity("topology", "hub has no outflow links", hub.label());
            }
        }
        let components = petgraph::algo::connected_components(&self.graph);
        if components != 1 {
            diag.add_error(
                "topology",
                &format!("network splits into {components} disconnected parts"),
            );
        }
        let free_links = Link::all()
            .filter(|link| link.bound() == FlowBound::Free)
            .count();
        if free_links != 1 {
            diag.add_warning(
                "topology",
                &format!("expected exactly one storage link, found {free_links}"),
            );
        }
        diag
    }

    pub fn stats(&self) -> crate::graph_utils::TopologyStats {
        crate::graph_utils::topology_stats(self)
    }

    /// Graphviz rendering of the network.
    pub fn to_dot(&self) -> String {
        crate::graph_utils::render_dot(self)
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::district()
    }
}
