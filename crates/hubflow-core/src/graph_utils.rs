use crate::error::{DispatchError, HubflowResult};
use crate::topology::{Node, Topology};
use petgraph::algo::connected_components;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;

/// Summary statistics printed by `hubflow topology`.
#[derive(Debug, Clone, Serialize)]
pub struct TopologyStats {
    pub node_count: usize,
    pub link_count: usize,
    pub hub_count: usize,
    pub connected_components: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    /// Nodes with no inflow links (external supplies and ambient sources)
    pub sources: Vec<Node>,
    /// Nodes with no outflow links (demands and reject)
    pub sinks: Vec<Node>,
}

/// Degree and connectivity figures for the topology graph (weak components).
pub fn topology_stats(topology: &Topology) -> TopologyStats {
    let graph = &topology.graph;
    let node_count = graph.node_count();
    let degrees: Vec<usize> = graph
        .node_indices()
        .map(|idx| {
            graph.edges_directed(idx, Direction::Incoming).count()
                + graph.edges_directed(idx, Direction::Outgoing).count()
        })
        .collect();
    let min_degree = degrees.iter().copied().min().unwrap_or(0);
    let max_degree = degrees.iter().copied().max().unwrap_or(0);
    let avg_degree = if node_count == 0 {
        0.0
    } else {
        degrees.iter().sum::<usize>() as f64 / node_count as f64
    };
    let sources = topology
        .nodes()
        .filter(|&node| topology.inflows(node).is_empty())
        .collect();
    let sinks = topology
        .nodes()
        .filter(|&node| topology.outflows(node).is_empty())
        .collect();
    TopologyStats {
        node_count,
        link_count: graph.edge_count(),
        hub_count: topology.hubs().len(),
        connected_components: connected_components(graph),
        min_degree,
        avg_degree,
        max_degree,
        sources,
        sinks,
    }
}

/// Export the topology in the requested format ("dot"/"graphviz").
pub fn export_graph(topology: &Topology, format: &str) -> HubflowResult<String> {
    match format.to_ascii_lowercase().as_str() {
        "graphviz" | "dot" => Ok(render_dot(topology)),
        other => Err(DispatchError::Configuration(format!(
            "unsupported graph export format '{other}'"
        ))),
    }
}

pub(crate) fn render_dot(topology: &Topology) -> String {
    let graph = &topology.graph;
    let mut buffer = String::new();
    buffer.push_str("digraph district {\n");
    buffer.push_str("  rankdir=LR;\n");
    for idx in graph.node_indices() {
        let node = graph[idx];
        let shape = if node.is_hub() { "box" } else { "ellipse" };
        buffer.push_str(&format!(
            "  n{} [label=\"{}\", shape={}];\n",
            idx.index(),
            sanitize_label(node.label()),
            shape
        ));
    }
    for edge in graph.edge_references() {
        let link = *edge.weight();
        let style = match link.bound() {
            crate::topology::FlowBound::Free => ", style=dashed",
            crate::topology::FlowBound::NonNegative => "",
        };
        buffer.push_str(&format!(
            "  n{} -> n{} [label=\"{}\"{}];\n",
            edge.source().index(),
            edge.target().index(),
            sanitize_label(link.key()),
            style
        ));
    }
    buffer.push('}');
    buffer
}

fn sanitize_label(label: &str) -> String {
    label.replace('"', "\\\"")
}
