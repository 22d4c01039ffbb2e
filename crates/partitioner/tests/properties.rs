// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Property-based tests: coverage, legality, determinism and priority over
//! randomly generated DAGs.

use backend_registry::{BackendId, PatternTemplate, Registries};
use graph_ir::{op, ComputeGraph, GraphNode, NodeId, OpKind, Validated};
use partitioner::{GraphPartitioner, PartitionOptions};
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────────

const OPS: &[(OpKind, usize)] = &[
    (op::ADD, 2),
    (op::MULTIPLY, 2),
    (op::ABS, 1),
    (op::RELU, 1),
    (op::TANH, 1),
    (op::CONV2D, 2),
    (op::SOFTMAX, 1),
];

/// A DAG of 1-4 inputs followed by up to 40 calls over earlier nodes.
fn arb_graph() -> impl Strategy<Value = ComputeGraph<Validated>> {
    let calls = prop::collection::vec((0..OPS.len(), any::<usize>(), any::<usize>()), 0..40);
    (1usize..=4, calls).prop_map(|(num_inputs, calls)| {
        let mut nodes: Vec<GraphNode> = (0..num_inputs)
            .map(|i| GraphNode::input(i, format!("in{i}")))
            .collect();
        for (op_idx, a, b) in calls {
            let id = nodes.len();
            let (kind, arity) = OPS[op_idx];
            let operands = [a % id, b % id];
            nodes.push(GraphNode::call(id, format!("n{id}"), kind, &operands[..arity]));
        }
        ComputeGraph::new("random".into(), nodes, vec![])
            .validate()
            .expect("generated graphs are acyclic")
    })
}

fn b(name: &str) -> BackendId {
    BackendId::new(name)
}

/// `ft` runs elementwise ops and fuses add→relu; `gpu` runs a superset
/// of ft's single ops.
fn registries() -> Registries {
    let mut r = Registries::new();
    for kind in [op::ADD, op::MULTIPLY, op::ABS, op::RELU] {
        r.register_supported(b("ft"), kind);
    }
    let mut t = PatternTemplate::builder("add_relu");
    let lhs = t.wildcard();
    let rhs = t.wildcard();
    let add = t.op(op::ADD, &[lhs, rhs]);
    let relu = t.op(op::RELU, &[add]);
    r.register_patterns(b("ft"), vec![t.build(relu).unwrap()])
        .unwrap();

    for kind in [op::ADD, op::MULTIPLY, op::ABS, op::RELU, op::TANH] {
        r.register_supported(b("gpu"), kind);
    }
    r
}

// ── Property tests ───────────────────────────────────────────────────────────

proptest! {
    /// Every node lands in exactly one partition and every backend
    /// partition is legal for its backend.
    #[test]
    fn coverage_and_legality(graph in arb_graph(), merge in any::<bool>()) {
        let r = registries();
        let a = GraphPartitioner::new(&r)
            .with_options(PartitionOptions { merge_adjacent: merge })
            .partition(&graph, &[b("ft"), b("gpu")])
            .unwrap();

        prop_assert_eq!(a.num_nodes(), graph.num_nodes());
        let total: usize = a.partitions.iter().map(|p| p.len()).sum();
        prop_assert_eq!(total, graph.num_nodes());
        prop_assert!(a.verify(&graph, &r).is_ok());
    }

    /// Partitions depend on each other without cycles, whether or not
    /// the merge pass runs.
    #[test]
    fn partition_graph_acyclic(graph in arb_graph(), merge in any::<bool>()) {
        let r = registries();
        let a = GraphPartitioner::new(&r)
            .with_options(PartitionOptions { merge_adjacent: merge })
            .partition(&graph, &[b("ft"), b("gpu")])
            .unwrap();

        // Repeatedly peel partitions with no remaining producers.
        let deps = a.dependencies(&graph);
        let mut indegree = vec![0usize; a.num_partitions()];
        for (_, to) in &deps {
            indegree[to.0] += 1;
        }
        let mut ready: Vec<usize> = (0..indegree.len()).filter(|&p| indegree[p] == 0).collect();
        let mut released = 0;
        while let Some(p) = ready.pop() {
            released += 1;
            for (from, to) in &deps {
                if from.0 == p {
                    indegree[to.0] -= 1;
                    if indegree[to.0] == 0 {
                        ready.push(to.0);
                    }
                }
            }
        }
        prop_assert_eq!(released, a.num_partitions());
    }

    /// Two runs over the same input agree exactly.
    #[test]
    fn deterministic(graph in arb_graph()) {
        let r = registries();
        let p = GraphPartitioner::new(&r);
        let first = p.partition(&graph, &[b("gpu"), b("ft")]).unwrap();
        let second = p.partition(&graph, &[b("gpu"), b("ft")]).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Without patterns in play, a node both backends support goes to the
    /// first one in the priority list.
    #[test]
    fn priority_respected(graph in arb_graph()) {
        let r = registries();
        let a = GraphPartitioner::new(&r)
            .partition(&graph, &[b("gpu"), b("ft")])
            .unwrap();
        for node in graph.nodes() {
            if matches!(node.op(), Some(k) if k == op::ABS || k == op::MULTIPLY) {
                let p = a.partition_for_node(node.id).unwrap();
                prop_assert_eq!(p.backend(), Some(&b("gpu")));
            }
        }
    }

    /// Leaves are never on the host, and operators never on an input
    /// partition.
    #[test]
    fn leaves_stay_inputs(graph in arb_graph()) {
        let r = registries();
        let a = GraphPartitioner::new(&r).partition(&graph, &[]).unwrap();
        for node in graph.nodes() {
            let p = a.partition_for_node(node.id).unwrap();
            prop_assert_eq!(node.is_leaf(), p.is_input());
        }
        let calls: Vec<NodeId> = graph
            .nodes()
            .iter()
            .filter(|n| !n.is_leaf())
            .map(|n| n.id)
            .collect();
        prop_assert_eq!(a.host_nodes(), calls);
    }
}
