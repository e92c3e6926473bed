use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use hubflow_cli::cli::TopologyFormat;
use hubflow_core::{export_graph, topology_stats, FlowBound, Topology};
use tabwriter::TabWriter;

pub fn handle(format: TopologyFormat, out: Option<&Path>) -> Result<()> {
    let topology = Topology::district();
    let diagnostics = topology.validate();
    if diagnostics.has_issues() {
        tracing::warn!("{}", diagnostics.summary());
    }

    let rendered = render(&topology, format)?;
    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, &rendered)
                .with_context(|| format!("writing topology to {}", path.display()))?;
            println!("Topology written to {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

pub fn render(topology: &Topology, format: TopologyFormat) -> Result<String> {
    match format {
        TopologyFormat::Dot => {
            let mut dot = export_graph(topology, "dot")?;
            if !dot.ends_with('\n') {
                dot.push('\n');
            }
            Ok(dot)
        }
        TopologyFormat::Table => {
            let mut writer = TabWriter::new(Vec::new());
            writeln!(writer, "KEY\tSOURCE\tTARGET\tBOUND")?;
            for link in topology.links() {
                let bound = match link.bound() {
                    FlowBound::NonNegative => ">= 0",
                    FlowBound::Free => "free",
                };
                writeln!(
                    writer,
                    "{}\t{}\t{}\t{}",
                    link.key(),
                    link.source(),
                    link.target(),
                    bound
                )?;
            }
            finish(writer)
        }
        TopologyFormat::Stats => {
            let stats = topology_stats(topology);
            let names = |nodes: &[hubflow_core::Node]| {
                nodes
                    .iter()
                    .map(|node| node.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let mut writer = TabWriter::new(Vec::new());
            writeln!(writer, "Nodes\t{}", stats.node_count)?;
            writeln!(writer, "Links\t{}", stats.link_count)?;
            writeln!(writer, "Hubs\t{}", stats.hub_count)?;
            writeln!(writer, "Components\t{}", stats.connected_components)?;
            writeln!(
                writer,
                "Degree [min/avg/max]\t{}/{:.2}/{}",
                stats.min_degree, stats.avg_degree, stats.max_degree
            )?;
            writeln!(writer, "Sources\t{}", names(stats.sources.as_slice()))?;
            writeln!(writer, "Sinks\t{}", names(stats.sinks.as_slice()))?;
            finish(writer)
        }
    }
}

fn finish(writer: TabWriter<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("flushing table: {err}"))?;
    Ok(String::from_utf8(bytes)?)
}
