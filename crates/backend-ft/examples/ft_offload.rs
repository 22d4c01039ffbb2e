// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: offload a small residual block to FT.
//!
//! Registers FT globally, partitions the same graph with and without the
//! merge pass, and prints the resulting partitions and FT kernel plans.
//!
//! ```bash
//! cargo run -p backend-ft --example ft_offload
//! ```

use graph_ir::{op, ComputeGraph, DType, GraphError, GraphNode, NodeId, TensorType, Validated};
use partitioner::{GraphPartitioner, PartitionOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    backend_ft::register()?;
    let registries = backend_registry::global::snapshot();
    let priority = [backend_ft::backend_id()];

    let graph = build_graph()?;
    println!("Graph: {}\n", graph.summary());

    for merge in [false, true] {
        let assignment = GraphPartitioner::new(&registries)
            .with_options(PartitionOptions {
                merge_adjacent: merge,
            })
            .partition(&graph, &priority)?;
        assignment.verify(&graph, &registries)?;

        println!("merge_adjacent = {merge}");
        println!(
            "{:<6} {:<8} {:<10} {:<8} Nodes",
            "Id", "Target", "Origin", "Symbol"
        );
        println!("{}", "-".repeat(50));
        for p in &assignment.partitions {
            if p.is_input() {
                continue;
            }
            let nodes: Vec<String> = p.nodes.iter().map(|n| n.to_string()).collect();
            println!(
                "{:<6} {:<8} {:<10} {:<8} {}",
                p.id.to_string(),
                p.target.to_string(),
                format!("{:?}", p.origin).to_lowercase(),
                p.symbol.as_deref().unwrap_or("-"),
                nodes.join(" "),
            );
        }

        for kernels in backend_ft::kernel_plan(&assignment, &graph)? {
            let names: Vec<&str> = kernels.calls.iter().map(|c| c.kernel).collect();
            println!("  {} → {}", kernels.symbol, names.join(", "));
        }
        println!();
    }

    Ok(())
}

/// out = relu(conv2d(relu(x + y), w) * x)
fn build_graph() -> Result<ComputeGraph<Validated>, GraphError> {
    let ty = || TensorType::new(vec![1, 16], DType::F32);
    ComputeGraph::new(
        "residual_block".into(),
        vec![
            GraphNode::input(0, "x").with_type(ty()),
            GraphNode::input(1, "y").with_type(ty()),
            GraphNode::constant(2, "w"),
            GraphNode::call(3, "sum", op::ADD, &[0, 1]).with_type(ty()),
            GraphNode::call(4, "act0", op::RELU, &[3]).with_type(ty()),
            GraphNode::call(5, "conv", op::CONV2D, &[4, 2]).with_type(ty()),
            GraphNode::call(6, "scale", op::MULTIPLY, &[5, 0]).with_type(ty()),
            GraphNode::call(7, "out", op::RELU, &[6]).with_type(ty()),
        ],
        vec![NodeId(7)],
    )
    .validate()
}
