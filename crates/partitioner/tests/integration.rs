// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: registration → graph loading → partitioning →
//! verification, across the graph-ir, backend-registry and partitioner
//! crates.

use backend_registry::{predicate, BackendId, PatternTemplate, RegistryError, Registries};
use graph_ir::{op, ComputeGraph, GraphDocument, GraphLoader, GraphNode, NodeId, OpKind, Validated};
use partitioner::{
    GraphPartitioner, PartitionAssignment, PartitionError, PartitionOptions, PartitionOrigin,
    PartitionTarget,
};

// ── Helpers ────────────────────────────────────────────────────

fn b(name: &str) -> BackendId {
    BackendId::new(name)
}

/// A backend supporting `ops` unconditionally, with an empty pattern table.
fn register_elementwise(r: &mut Registries, backend: &str, ops: &[OpKind]) {
    for &kind in ops {
        r.register_supported(b(backend), kind);
    }
    r.register_patterns(b(backend), vec![]).unwrap();
}

fn ft_registries() -> Registries {
    let mut r = Registries::new();
    register_elementwise(
        &mut r,
        "ft",
        &[op::ADD, op::SUBTRACT, op::MULTIPLY, op::ABS, op::RELU],
    );
    r
}

fn build(name: &str, nodes: Vec<GraphNode>, outputs: &[usize]) -> ComputeGraph<Validated> {
    ComputeGraph::new(
        name.into(),
        nodes,
        outputs.iter().map(|&i| NodeId(i)).collect(),
    )
    .validate()
    .unwrap()
}

/// relu(add(x, y))
fn add_relu() -> ComputeGraph<Validated> {
    build(
        "add_relu",
        vec![
            GraphNode::input(0, "x"),
            GraphNode::input(1, "y"),
            GraphNode::call(2, "sum", op::ADD, &[0, 1]),
            GraphNode::call(3, "act", op::RELU, &[2]),
        ],
        &[3],
    )
}

fn add_relu_template(name: &str) -> PatternTemplate {
    let mut t = PatternTemplate::builder(name);
    let lhs = t.wildcard();
    let rhs = t.wildcard();
    let add = t.op(op::ADD, &[lhs, rhs]);
    let relu = t.op(op::RELU, &[add]);
    t.build(relu).unwrap()
}

fn backend_of(a: &PartitionAssignment, node: usize) -> Option<String> {
    a.partition_for_node(NodeId(node))
        .and_then(|p| p.backend())
        .map(|b| b.to_string())
}

// ── Scenarios ──────────────────────────────────────────────────

#[test]
fn test_elementwise_chain_offloaded_and_merged() {
    let r = ft_registries();
    let g = add_relu();
    let a = GraphPartitioner::new(&r).partition(&g, &[b("ft")]).unwrap();

    assert_eq!(backend_of(&a, 2).as_deref(), Some("ft"));
    assert_eq!(backend_of(&a, 3).as_deref(), Some("ft"));
    assert_eq!(a.partitions_for(&b("ft")).count(), 1);
    assert!(a.host_nodes().is_empty());
    a.verify(&g, &r).unwrap();
}

#[test]
fn test_elementwise_chain_without_merge() {
    let r = ft_registries();
    let g = add_relu();
    let a = GraphPartitioner::new(&r)
        .with_options(PartitionOptions {
            merge_adjacent: false,
        })
        .partition(&g, &[b("ft")])
        .unwrap();

    let ft_backend = b("ft");
    let ft: Vec<_> = a.partitions_for(&ft_backend).collect();
    assert_eq!(ft.len(), 2);
    assert_eq!(ft[0].nodes, vec![NodeId(2)]);
    assert_eq!(ft[1].nodes, vec![NodeId(3)]);
    assert!(a.host_nodes().is_empty());
}

#[test]
fn test_unsupported_conv_goes_to_host() {
    let r = ft_registries();
    let g = build(
        "conv",
        vec![
            GraphNode::input(0, "x"),
            GraphNode::constant(1, "w"),
            GraphNode::call(2, "conv", op::CONV2D, &[0, 1]),
        ],
        &[2],
    );
    let a = GraphPartitioner::new(&r).partition(&g, &[b("ft")]).unwrap();

    assert_eq!(a.host_nodes(), vec![NodeId(2)]);
    let p = a.partition_for_node(NodeId(2)).unwrap();
    assert_eq!(p.target, PartitionTarget::Host);
    assert_eq!(p.origin, PartitionOrigin::Fallback);
    assert!(p.symbol.is_none());
}

#[test]
fn test_empty_priority_routes_everything_to_host() {
    let r = ft_registries();
    let g = add_relu();
    let a = GraphPartitioner::new(&r).partition(&g, &[]).unwrap();

    assert_eq!(a.host_nodes(), vec![NodeId(2), NodeId(3)]);
    assert_eq!(a.backend_partitions().count(), 0);
    // Leaves keep their own input partitions.
    assert_eq!(
        a.partitions.iter().filter(|p| p.is_input()).count(),
        2
    );
}

#[test]
fn test_priority_respected() {
    let mut r = Registries::new();
    register_elementwise(&mut r, "gpu", &[op::ADD, op::RELU]);
    register_elementwise(&mut r, "ft", &[op::ADD, op::RELU]);
    let g = add_relu();

    let a = GraphPartitioner::new(&r)
        .partition(&g, &[b("gpu"), b("ft")])
        .unwrap();
    assert_eq!(a.nodes_on(&b("gpu")), 2);
    assert_eq!(a.nodes_on(&b("ft")), 0);

    let a = GraphPartitioner::new(&r)
        .partition(&g, &[b("ft"), b("gpu")])
        .unwrap();
    assert_eq!(a.nodes_on(&b("ft")), 2);
}

#[test]
fn test_lower_priority_backend_takes_what_the_first_cannot() {
    let mut r = Registries::new();
    register_elementwise(&mut r, "ft", &[op::ADD]);
    register_elementwise(&mut r, "gpu", &[op::RELU]);
    let g = add_relu();
    let a = GraphPartitioner::new(&r)
        .partition(&g, &[b("ft"), b("gpu")])
        .unwrap();

    assert_eq!(backend_of(&a, 2).as_deref(), Some("ft"));
    assert_eq!(backend_of(&a, 3).as_deref(), Some("gpu"));
    let symbols: Vec<_> = a
        .backend_partitions()
        .filter_map(|p| p.symbol.clone())
        .collect();
    assert_eq!(symbols, vec!["ft_0", "gpu_0"]);
    a.verify(&g, &r).unwrap();
}

#[test]
fn test_registration_overwrite() {
    let mut r = ft_registries();
    r.register_capability(b("ft"), op::RELU, predicate::legality(|_| false));
    let g = add_relu();
    let a = GraphPartitioner::new(&r).partition(&g, &[b("ft")]).unwrap();

    assert_eq!(backend_of(&a, 2).as_deref(), Some("ft"));
    assert_eq!(a.host_nodes(), vec![NodeId(3)]);
}

#[test]
fn test_unknown_backend_aborts() {
    let r = ft_registries();
    let result = GraphPartitioner::new(&r).partition(&add_relu(), &[b("tpu")]);
    assert!(matches!(result, Err(PartitionError::UnknownBackend(ref n)) if n == "tpu"));
}

#[test]
fn test_pattern_only_backend_is_known() {
    let mut r = Registries::new();
    r.register_patterns(b("fused"), vec![add_relu_template("add_relu")])
        .unwrap();
    let g = add_relu();
    let a = GraphPartitioner::new(&r).partition(&g, &[b("fused")]).unwrap();
    assert_eq!(a.nodes_on(&b("fused")), 2);
    a.verify(&g, &r).unwrap();
}

#[test]
fn test_pattern_wins_over_operator() {
    let mut r = ft_registries();
    r.register_patterns(b("ft"), vec![add_relu_template("add_relu")])
        .unwrap();
    let g = add_relu();
    let a = GraphPartitioner::new(&r).partition(&g, &[b("ft")]).unwrap();

    let p = a.partition_for_node(NodeId(3)).unwrap();
    assert_eq!(
        p.origin,
        PartitionOrigin::Pattern {
            template: "add_relu".into()
        }
    );
    assert_eq!(p.nodes, vec![NodeId(2), NodeId(3)]);
}

#[test]
fn test_pattern_tier_runs_before_operator_tier() {
    // ft only has operators, gpu has the fusion pattern: the pattern wins
    // even though ft comes first.
    let mut r = ft_registries();
    r.register_patterns(b("gpu"), vec![add_relu_template("add_relu")])
        .unwrap();
    let g = add_relu();
    let a = GraphPartitioner::new(&r)
        .partition(&g, &[b("ft"), b("gpu")])
        .unwrap();
    assert_eq!(a.nodes_on(&b("gpu")), 2);
    assert_eq!(a.nodes_on(&b("ft")), 0);
}

#[test]
fn test_template_order_breaks_ties() {
    let mut r = Registries::new();
    let mut picky = PatternTemplate::builder("first");
    let x = picky.wildcard();
    let root = picky.op(op::ABS, &[x]);
    let first = picky.build(root).unwrap();

    let mut loose = PatternTemplate::builder("second");
    let x = loose.wildcard();
    let root = loose.op(op::ABS, &[x]);
    let second = loose.build(root).unwrap();

    r.register_patterns(b("ft"), vec![first, second]).unwrap();
    let g = build(
        "abs",
        vec![GraphNode::input(0, "x"), GraphNode::call(1, "a", op::ABS, &[0])],
        &[1],
    );
    let a = GraphPartitioner::new(&r).partition(&g, &[b("ft")]).unwrap();
    assert_eq!(
        a.partition_for_node(NodeId(1)).unwrap().origin,
        PartitionOrigin::Pattern {
            template: "first".into()
        }
    );
}

fn add_template(name: &str) -> PatternTemplate {
    let mut t = PatternTemplate::builder(name);
    let lhs = t.wildcard();
    let rhs = t.wildcard();
    let add = t.op(op::ADD, &[lhs, rhs]);
    t.build(add).unwrap()
}

#[test]
fn test_earlier_template_applied_before_later_one() {
    // `add` alone would root at the add before `add_relu` roots at the
    // relu; table order still gives the fused pair to `add_relu`.
    let mut r = Registries::new();
    r.register_patterns(b("ft"), vec![add_relu_template("add_relu"), add_template("add")])
        .unwrap();
    let g = add_relu();
    let a = GraphPartitioner::new(&r).partition(&g, &[b("ft")]).unwrap();

    let p = a.partition_for_node(NodeId(2)).unwrap();
    assert_eq!(
        p.origin,
        PartitionOrigin::Pattern {
            template: "add_relu".into()
        }
    );
    assert_eq!(p.nodes, vec![NodeId(2), NodeId(3)]);
    assert!(a.host_nodes().is_empty());
    a.verify(&g, &r).unwrap();
}

#[test]
fn test_later_template_takes_what_earlier_left() {
    // relu(add(x, y)) feeding a second add: the pair goes to `add_relu`,
    // the trailing add to `add`.
    let mut r = Registries::new();
    r.register_patterns(b("ft"), vec![add_relu_template("add_relu"), add_template("add")])
        .unwrap();
    let g = build(
        "add_relu_add",
        vec![
            GraphNode::input(0, "x"),
            GraphNode::input(1, "y"),
            GraphNode::call(2, "sum", op::ADD, &[0, 1]),
            GraphNode::call(3, "act", op::RELU, &[2]),
            GraphNode::call(4, "out", op::ADD, &[3, 1]),
        ],
        &[4],
    );
    let a = GraphPartitioner::new(&r).partition(&g, &[b("ft")]).unwrap();

    let templates: Vec<(Vec<NodeId>, PartitionOrigin)> = a
        .partitions_for(&b("ft"))
        .map(|p| (p.nodes.clone(), p.origin.clone()))
        .collect();
    assert_eq!(
        templates,
        vec![
            (
                vec![NodeId(2), NodeId(3)],
                PartitionOrigin::Pattern {
                    template: "add_relu".into()
                }
            ),
            (
                vec![NodeId(4)],
                PartitionOrigin::Pattern {
                    template: "add".into()
                }
            ),
        ]
    );
    a.verify(&g, &r).unwrap();
}

#[test]
fn test_rejecting_predicate_falls_through_to_next_template() {
    let mut r = Registries::new();
    let mut picky = PatternTemplate::builder("never");
    let x = picky.wildcard();
    let root = picky.op(op::ABS, &[x]);
    picky.with_predicate(predicate::pattern_legality(|_| false));
    let never = picky.build(root).unwrap();

    let mut plain = PatternTemplate::builder("plain");
    let x = plain.wildcard();
    let root = plain.op(op::ABS, &[x]);
    let plain = plain.build(root).unwrap();

    r.register_patterns(b("ft"), vec![never, plain]).unwrap();
    let g = build(
        "abs",
        vec![GraphNode::input(0, "x"), GraphNode::call(1, "a", op::ABS, &[0])],
        &[1],
    );
    let a = GraphPartitioner::new(&r).partition(&g, &[b("ft")]).unwrap();
    assert_eq!(
        a.partition_for_node(NodeId(1)).unwrap().origin,
        PartitionOrigin::Pattern {
            template: "plain".into()
        }
    );
}

#[test]
fn test_malformed_template_rejected_at_registration() {
    let mut t = PatternTemplate::builder("wild_root");
    let w = t.wildcard();
    let err = t.build(w).unwrap_err();
    assert!(matches!(err, RegistryError::MalformedTemplate { ref pattern, .. } if pattern == "wild_root"));

    let mut r = Registries::new();
    let dupes = vec![add_relu_template("dup"), add_relu_template("dup")];
    assert!(r.register_patterns(b("ft"), dupes).is_err());
    assert!(!r.knows_backend(&b("ft")));
}

#[test]
fn test_merge_respects_convexity() {
    // a (ft) → conv (host) → c (ft), and a → c directly.
    let r = ft_registries();
    let g = build(
        "skip",
        vec![
            GraphNode::input(0, "x"),
            GraphNode::call(1, "a", op::ABS, &[0]),
            GraphNode::call(2, "conv", op::CONV2D, &[1]),
            GraphNode::call(3, "c", op::ADD, &[1, 2]),
        ],
        &[3],
    );
    let a = GraphPartitioner::new(&r).partition(&g, &[b("ft")]).unwrap();
    assert_eq!(a.partitions_for(&b("ft")).count(), 2);
    assert_ne!(a.partition_of(NodeId(1)), a.partition_of(NodeId(3)));
    a.verify(&g, &r).unwrap();
}

#[test]
fn test_merge_keeps_partition_graph_acyclic() {
    // x1, x2 on ft and h1, h2 on the host: merging both pairs would make
    // ft and host partitions feed each other.
    let r = ft_registries();
    let g = build(
        "crossed",
        vec![
            GraphNode::input(0, "x"),
            GraphNode::call(1, "x1", op::ABS, &[0]),
            GraphNode::call(2, "h1", op::CONV2D, &[0, 0]),
            GraphNode::call(3, "x2", op::ADD, &[1, 2]),
            GraphNode::call(4, "h2", op::CONV2D, &[1, 2]),
        ],
        &[3, 4],
    );
    let a = GraphPartitioner::new(&r).partition(&g, &[b("ft")]).unwrap();
    a.verify(&g, &r).unwrap();

    let x = a.partition_of(NodeId(1));
    let h = a.partition_of(NodeId(2));
    assert_eq!(x, a.partition_of(NodeId(3)));
    assert_ne!(h, a.partition_of(NodeId(4)));

    // No two partitions feed each other.
    let deps = a.dependencies(&g);
    for &(from, to) in &deps {
        assert!(!deps.contains(&(to, from)), "{from} <-> {to}");
    }
}

#[test]
fn test_predicate_inspects_types() {
    use graph_ir::{DType, TensorType};

    let mut r = Registries::new();
    r.register_capability(b("ft"), op::ADD, predicate::output_dtype_in(&[DType::F32]));
    let g = build(
        "typed",
        vec![
            GraphNode::input(0, "x"),
            GraphNode::call(1, "f", op::ADD, &[0, 0])
                .with_type(TensorType::new(vec![4], DType::F32)),
            GraphNode::call(2, "i", op::ADD, &[0, 0])
                .with_type(TensorType::new(vec![4], DType::I8)),
        ],
        &[1, 2],
    );
    let a = GraphPartitioner::new(&r).partition(&g, &[b("ft")]).unwrap();
    assert_eq!(backend_of(&a, 1).as_deref(), Some("ft"));
    assert_eq!(a.host_nodes(), vec![NodeId(2)]);
}

#[test]
fn test_deterministic() {
    let r = ft_registries();
    let g = build(
        "wide",
        vec![
            GraphNode::input(0, "x"),
            GraphNode::call(1, "a", op::ABS, &[0]),
            GraphNode::call(2, "b", op::CONV2D, &[0]),
            GraphNode::call(3, "c", op::RELU, &[1]),
            GraphNode::call(4, "d", op::ADD, &[2, 3]),
            GraphNode::call(5, "e", op::SOFTMAX, &[4]),
        ],
        &[5],
    );
    let p = GraphPartitioner::new(&r);
    let first = p.partition(&g, &[b("ft")]).unwrap();
    let second = p.partition(&g, &[b("ft")]).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn test_document_with_custom_op() {
    let json = r#"{
        "name": "custom",
        "custom_ops": ["ft.fused_gelu"],
        "nodes": [
            { "name": "x", "kind": "input", "type": { "shape": [1, 8], "dtype": "f32" } },
            { "name": "g", "op": "ft.fused_gelu", "inputs": ["x"] },
            { "name": "m", "op": "multiply", "inputs": ["g", "x"] }
        ],
        "outputs": ["m"]
    }"#;
    let doc = GraphDocument::from_json(json).unwrap();
    let g = GraphLoader::from_document(&doc).unwrap();

    let mut r = ft_registries();
    r.register_supported(b("ft"), OpKind::intern("ft.fused_gelu"));
    let a = GraphPartitioner::new(&r).partition(&g, &[b("ft")]).unwrap();
    assert_eq!(a.nodes_on(&b("ft")), 2);
    assert_eq!(a.partitions_for(&b("ft")).count(), 1);
}

#[test]
fn test_concurrent_runs_share_registries() {
    let r = ft_registries();
    let g = add_relu();
    let baseline = GraphPartitioner::new(&r).partition(&g, &[b("ft")]).unwrap();

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| s.spawn(|| GraphPartitioner::new(&r).partition(&g, &[b("ft")]).unwrap()))
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), baseline);
        }
    });
}

#[test]
fn test_global_registries() {
    backend_registry::global::reset_global();
    for kind in [op::ADD, op::RELU] {
        backend_registry::register_supported(b("ft"), kind);
    }
    backend_registry::register_patterns(b("ft"), vec![]).unwrap();

    let a = partitioner::partition_global(&add_relu(), &[b("ft")]).unwrap();
    assert_eq!(a.nodes_on(&b("ft")), 2);

    backend_registry::global::reset_global();
    let err = partitioner::partition_global(&add_relu(), &[b("ft")]);
    assert!(matches!(err, Err(PartitionError::UnknownBackend(_))));
}
