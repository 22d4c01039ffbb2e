// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `graph-part partition` command: partition a graph across backends.
//!
//! The configuration file (if any) provides the defaults; `--priority` and
//! `--no-merge` override it. The resulting assignment is checked against
//! the registries before it is printed.

use anyhow::Context;
use backend_registry::global;
use partitioner::{GraphPartitioner, PartitionConfig};
use std::path::PathBuf;

pub fn execute(
    graph_path: PathBuf,
    config_path: Option<PathBuf>,
    priority: Option<String>,
    no_merge: bool,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = match &config_path {
        Some(path) => PartitionConfig::from_file(path)
            .with_context(|| format!("failed to load config from '{}'", path.display()))?,
        None => PartitionConfig::default(),
    };
    if let Some(list) = priority {
        config.backend_priority = split_priority(&list);
    }
    if no_merge {
        config.merge_adjacent = false;
    }
    let priority = config.parse_priority()?;

    let graph = graph_ir::GraphLoader::load(&graph_path)
        .with_context(|| format!("failed to load graph from '{}'", graph_path.display()))?;

    let registries = global::snapshot();
    let assignment = GraphPartitioner::new(&registries)
        .with_options(config.options())
        .partition(&graph, &priority)?;
    assignment
        .verify(&graph, &registries)
        .context("partitioner produced an inconsistent assignment")?;
    let kernels = backend_ft::kernel_plan(&assignment, &graph)?;

    if json {
        let doc = serde_json::json!({
            "assignment": assignment,
            "ft_kernels": kernels,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            graph-part · Graph Partitioner           ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    // ── Partitions ─────────────────────────────────────────────
    println!(
        "  {:<6} {:<10} {:<22} {:<8} Nodes",
        "Id", "Target", "Origin", "Symbol"
    );
    println!("  {}", "-".repeat(70));
    for p in &assignment.partitions {
        if p.is_input() {
            continue;
        }
        let nodes: Vec<String> = p.nodes.iter().map(|n| n.to_string()).collect();
        println!(
            "  {:<6} {:<10} {:<22} {:<8} {}",
            p.id.to_string(),
            p.target.to_string(),
            origin_label(&p.origin),
            p.symbol.as_deref().unwrap_or("-"),
            nodes.join(" "),
        );
    }
    println!();

    // ── FT kernels ─────────────────────────────────────────────
    if !kernels.is_empty() {
        println!("  FT kernels:");
        for partition in &kernels {
            let names: Vec<&str> = partition.calls.iter().map(|c| c.kernel).collect();
            println!("   {:<8} {}", partition.symbol, names.join(" → "));
        }
        println!();
    }

    println!("  {}", assignment.summary());
    Ok(())
}

/// Splits a comma-separated backend list. An empty or blank string means
/// no backends at all.
fn split_priority(list: &str) -> Vec<String> {
    if list.trim().is_empty() {
        return Vec::new();
    }
    list.split(',').map(|s| s.trim().to_string()).collect()
}

fn origin_label(origin: &partitioner::PartitionOrigin) -> String {
    use partitioner::PartitionOrigin;
    match origin {
        PartitionOrigin::Pattern { template } => format!("pattern:{template}"),
        PartitionOrigin::Operator => "operator".to_string(),
        PartitionOrigin::Merged => "merged".to_string(),
        PartitionOrigin::Fallback => "fallback".to_string(),
        PartitionOrigin::Leaf => "leaf".to_string(),
    }
}
