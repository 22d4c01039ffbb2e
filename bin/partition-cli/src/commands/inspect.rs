// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `graph-part inspect` command: display a graph document.
//!
//! Loads and validates the document, then prints its nodes in topological
//! order, an operator histogram, and which registered backends accept each
//! operator call.

use anyhow::Context;
use backend_registry::global;
use std::path::PathBuf;

pub fn execute(graph_path: PathBuf) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║            graph-part · Graph Inspector             ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let graph = graph_ir::GraphLoader::load(&graph_path)
        .with_context(|| format!("failed to load graph from '{}'", graph_path.display()))?;
    let registries = global::snapshot();
    let backends = registries.backends();

    // ── Summary ────────────────────────────────────────────────
    println!("  {}", graph.summary());
    let outputs: Vec<String> = graph.outputs().iter().map(|o| o.to_string()).collect();
    println!("  Outputs: {}", outputs.join(", "));
    println!();

    // ── Nodes ──────────────────────────────────────────────────
    println!("  {:<6} {:<44} {}", "Id", "Node", "Supported by");
    println!("  {}", "-".repeat(70));
    for node in graph.iter_topological() {
        let supported: Vec<&str> = match graph.node_ref(node.id) {
            Some(node_ref) if !node.is_leaf() => backends
                .iter()
                .filter(|b| registries.capabilities.supports_node(b, &node_ref))
                .map(|b| b.as_str())
                .collect(),
            _ => Vec::new(),
        };
        let cell = if node.is_leaf() {
            "-".to_string()
        } else if supported.is_empty() {
            "host only".to_string()
        } else {
            supported.join(", ")
        };
        println!(
            "  {:<6} {:<44} {}",
            node.id.to_string(),
            truncate(&node.summary(), 44),
            cell,
        );
    }
    println!();

    // ── Operators ──────────────────────────────────────────────
    println!("  Operator histogram:");
    for (op, count) in graph.op_histogram() {
        println!("   {:<24} {count}", op.as_str());
    }
    println!();
    Ok(())
}

/// Truncates a string to `max_len` characters with an ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
