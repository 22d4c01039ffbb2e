// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Computation graph: a DAG of [`GraphNode`]s.
//!
//! # Type-State Pattern
//!
//! ```text
//! ComputeGraph<Loaded>     — nodes collected, not yet checked.
//!       │  .validate()
//!       ▼
//! ComputeGraph<Validated>  — references checked, acyclic, topologically
//!                            ordered, ready for partitioning.
//! ```
//!
//! The partitioner only accepts `ComputeGraph<Validated>`, so it never has
//! to deal with dangling references or cycles.

use crate::{GraphError, GraphNode, NodeId, OpKind, TensorType};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::fmt;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: graph has been built but not validated.
#[derive(Debug, Clone)]
pub struct Loaded;

/// Marker: graph has been validated and is ready for partitioning.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for graph states.
pub trait GraphState: fmt::Debug + Clone {}
impl GraphState for Loaded {}
impl GraphState for Validated {}

// ── ComputeGraph ───────────────────────────────────────────────────

/// The host computation graph.
///
/// Nodes are stored by [`NodeId`] (their index). The generic parameter `S`
/// encodes the validation state at compile time.
#[derive(Debug, Clone)]
pub struct ComputeGraph<S: GraphState = Loaded> {
    /// Human-readable graph name (e.g. `"mobilenet_v2.main"`).
    pub name: String,
    nodes: Vec<GraphNode>,
    outputs: Vec<NodeId>,
    /// Topological order, inputs before consumers (validated only).
    topo_order: Vec<NodeId>,
    /// Position of each node in `topo_order` (validated only).
    topo_position: Vec<usize>,
    /// Deduplicated consumers of each node, ascending (validated only).
    consumers: Vec<Vec<NodeId>>,
    _state: std::marker::PhantomData<S>,
}

// ── Loaded state ───────────────────────────────────────────────────

impl ComputeGraph<Loaded> {
    /// Creates a new graph in the `Loaded` state.
    ///
    /// An empty `outputs` list means "every node without consumers".
    pub fn new(name: String, nodes: Vec<GraphNode>, outputs: Vec<NodeId>) -> Self {
        Self {
            name,
            nodes,
            outputs,
            topo_order: Vec::new(),
            topo_position: Vec::new(),
            consumers: Vec::new(),
            _state: std::marker::PhantomData,
        }
    }

    /// Returns the nodes in id order.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Validates the graph and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - The graph is non-empty.
    /// - Node ids are consecutive starting from 0.
    /// - Leaves have no inputs; every input reference exists.
    /// - Output references exist.
    /// - The graph is acyclic.
    pub fn validate(self) -> Result<ComputeGraph<Validated>, GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::InvalidGraph("graph contains no nodes".into()));
        }

        let n = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            if node.id.index() != i {
                return Err(GraphError::InvalidNode {
                    node: node.name.clone(),
                    detail: format!("expected id {i}, got {}", node.id.index()),
                });
            }
            if node.is_leaf() && !node.inputs.is_empty() {
                return Err(GraphError::InvalidNode {
                    node: node.name.clone(),
                    detail: format!("{} node cannot have inputs", node.kind.as_str()),
                });
            }
            if let Some(missing) = node.inputs.iter().find(|input| input.index() >= n) {
                return Err(GraphError::MissingInput {
                    node: node.name.clone(),
                    input: missing.to_string(),
                });
            }
        }

        if let Some(missing) = self.outputs.iter().find(|o| o.index() >= n) {
            return Err(GraphError::InvalidGraph(format!(
                "output {missing} does not exist"
            )));
        }

        let mut consumers: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        for node in &self.nodes {
            for input in &node.inputs {
                consumers[input.index()].push(node.id);
            }
        }
        for list in &mut consumers {
            list.sort_unstable();
            list.dedup();
        }

        let topo_order = topological_order(&self.nodes, &consumers)?;
        let mut topo_position = vec![0; n];
        for (pos, id) in topo_order.iter().enumerate() {
            topo_position[id.index()] = pos;
        }

        let outputs = if self.outputs.is_empty() {
            let sinks: Vec<NodeId> = (0..n)
                .filter(|&i| consumers[i].is_empty())
                .map(NodeId)
                .collect();
            tracing::debug!(
                "graph '{}' declares no outputs; using {} sink node(s)",
                self.name,
                sinks.len(),
            );
            sinks
        } else {
            self.outputs
        };

        Ok(ComputeGraph {
            name: self.name,
            nodes: self.nodes,
            outputs,
            topo_order,
            topo_position,
            consumers,
            _state: std::marker::PhantomData,
        })
    }
}

/// Kahn's algorithm with a min-heap so the order is deterministic: among
/// ready nodes the smallest id is emitted first.
fn topological_order(
    nodes: &[GraphNode],
    consumers: &[Vec<NodeId>],
) -> Result<Vec<NodeId>, GraphError> {
    // Count distinct producers so that `add(x, x)` needs `x` only once.
    let mut pending: Vec<usize> = nodes
        .iter()
        .map(|node| {
            let mut inputs = node.inputs.clone();
            inputs.sort_unstable();
            inputs.dedup();
            inputs.len()
        })
        .collect();

    let mut ready: BinaryHeap<Reverse<NodeId>> = nodes
        .iter()
        .filter(|node| pending[node.id.index()] == 0)
        .map(|node| Reverse(node.id))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    while let Some(Reverse(id)) = ready.pop() {
        order.push(id);
        for &consumer in &consumers[id.index()] {
            pending[consumer.index()] -= 1;
            if pending[consumer.index()] == 0 {
                ready.push(Reverse(consumer));
            }
        }
    }

    if order.len() != nodes.len() {
        let stuck = nodes
            .iter()
            .find(|node| pending[node.id.index()] > 0)
            .map(|node| node.name.clone())
            .unwrap_or_default();
        return Err(GraphError::InvalidGraph(format!(
            "cycle detected involving node '{stuck}'"
        )));
    }
    Ok(order)
}

// ── Validated state ────────────────────────────────────────────────

impl ComputeGraph<Validated> {
    /// Returns the total number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of operator calls (non-leaf nodes).
    pub fn num_calls(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_leaf()).count()
    }

    /// Returns a node by id.
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id.index())
    }

    /// Returns a borrowed view of a node with access to its neighbourhood.
    pub fn node_ref(&self, id: NodeId) -> Option<NodeRef<'_>> {
        self.node(id).map(|node| NodeRef { graph: self, node })
    }

    /// Returns the nodes in id order.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Returns an iterator over the nodes in topological order.
    pub fn iter_topological(&self) -> impl Iterator<Item = &GraphNode> {
        self.topo_order.iter().map(|id| &self.nodes[id.index()])
    }

    /// Node ids in topological order (inputs before consumers).
    pub fn topo_order(&self) -> &[NodeId] {
        &self.topo_order
    }

    /// Position of `id` in [`Self::topo_order`].
    pub fn topo_position(&self, id: NodeId) -> usize {
        self.topo_position[id.index()]
    }

    /// Distinct consumers of `id`, ascending.
    pub fn consumers(&self, id: NodeId) -> &[NodeId] {
        &self.consumers[id.index()]
    }

    /// Graph outputs.
    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    pub fn is_output(&self, id: NodeId) -> bool {
        self.outputs.contains(&id)
    }

    /// Number of calls per operator kind.
    pub fn op_histogram(&self) -> BTreeMap<OpKind, usize> {
        let mut histogram = BTreeMap::new();
        for op in self.nodes.iter().filter_map(GraphNode::op) {
            *histogram.entry(op).or_insert(0) += 1;
        }
        histogram
    }

    /// Returns a summary string describing the graph.
    pub fn summary(&self) -> String {
        format!(
            "Graph '{}': {} nodes ({} calls, {} leaves), {} distinct ops, {} outputs",
            self.name,
            self.num_nodes(),
            self.num_calls(),
            self.num_nodes() - self.num_calls(),
            self.op_histogram().len(),
            self.outputs.len(),
        )
    }
}

// ── NodeRef ────────────────────────────────────────────────────────

/// A node together with the graph it lives in.
///
/// This is what legality predicates inspect: the node's operator and
/// attributes, its own output type, and the types of its inputs.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'g> {
    graph: &'g ComputeGraph<Validated>,
    node: &'g GraphNode,
}

impl<'g> NodeRef<'g> {
    pub fn graph(&self) -> &'g ComputeGraph<Validated> {
        self.graph
    }

    pub fn node(&self) -> &'g GraphNode {
        self.node
    }

    pub fn id(&self) -> NodeId {
        self.node.id
    }

    pub fn op(&self) -> Option<OpKind> {
        self.node.op()
    }

    pub fn output_type(&self) -> Option<&'g TensorType> {
        self.node.ty.as_ref()
    }

    /// Operand nodes, in order.
    pub fn inputs(&self) -> impl Iterator<Item = NodeRef<'g>> + 'g {
        let graph = self.graph;
        let node = self.node;
        node.inputs.iter().map(move |id| NodeRef {
            graph,
            node: &graph.nodes[id.index()],
        })
    }

    /// Operand types, in order (`None` where the producer is untyped).
    pub fn input_types(&self) -> impl Iterator<Item = Option<&'g TensorType>> + 'g {
        self.inputs().map(|input| input.node.ty.as_ref())
    }

    pub fn num_inputs(&self) -> usize {
        self.node.inputs.len()
    }

    pub fn consumers(&self) -> &'g [NodeId] {
        self.graph.consumers(self.node.id)
    }
}

impl std::ops::Deref for NodeRef<'_> {
    type Target = GraphNode;

    fn deref(&self) -> &GraphNode {
        self.node
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: GraphState> fmt::Display for ComputeGraph<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ComputeGraph '{}' ({} nodes):", self.name, self.nodes.len())?;
        for node in &self.nodes {
            writeln!(f, "  {}", node.summary())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{op, DType, GraphNode};

    /// relu(add(x, y))
    fn add_relu() -> Vec<GraphNode> {
        vec![
            GraphNode::input(0, "x").with_type(TensorType::new(vec![1, 8], DType::F32)),
            GraphNode::input(1, "y").with_type(TensorType::new(vec![1, 8], DType::F32)),
            GraphNode::call(2, "sum", op::ADD, &[0, 1]),
            GraphNode::call(3, "act", op::RELU, &[2]),
        ]
    }

    #[test]
    fn test_validate_ok() {
        let graph = ComputeGraph::new("g".into(), add_relu(), vec![NodeId(3)])
            .validate()
            .unwrap();
        assert_eq!(graph.num_nodes(), 4);
        assert_eq!(graph.num_calls(), 2);
        assert_eq!(graph.outputs(), &[NodeId(3)]);
    }

    #[test]
    fn test_validate_empty() {
        assert!(ComputeGraph::new("empty".into(), vec![], vec![])
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_bad_id() {
        let mut nodes = add_relu();
        nodes[1].id = NodeId(7);
        let result = ComputeGraph::new("bad".into(), nodes, vec![]).validate();
        assert!(matches!(result, Err(GraphError::InvalidNode { .. })));
    }

    #[test]
    fn test_validate_missing_input() {
        let mut nodes = add_relu();
        nodes[3].inputs = vec![NodeId(9)];
        let result = ComputeGraph::new("dangling".into(), nodes, vec![]).validate();
        assert!(matches!(result, Err(GraphError::MissingInput { .. })));
    }

    #[test]
    fn test_validate_leaf_with_inputs() {
        let mut nodes = add_relu();
        nodes[0].inputs = vec![NodeId(1)];
        let result = ComputeGraph::new("leafy".into(), nodes, vec![]).validate();
        assert!(matches!(result, Err(GraphError::InvalidNode { .. })));
    }

    #[test]
    fn test_validate_cycle() {
        let nodes = vec![
            GraphNode::input(0, "x"),
            GraphNode::call(1, "a", op::ADD, &[0, 2]),
            GraphNode::call(2, "b", op::ABS, &[1]),
        ];
        let result = ComputeGraph::new("cyclic".into(), nodes, vec![]).validate();
        assert!(matches!(result, Err(GraphError::InvalidGraph(_))));
    }

    #[test]
    fn test_topological_order_out_of_order_ids() {
        // Consumer listed before its producer.
        let nodes = vec![
            GraphNode::call(0, "act", op::RELU, &[2]),
            GraphNode::input(1, "x"),
            GraphNode::call(2, "neg", op::NEGATIVE, &[1]),
        ];
        let graph = ComputeGraph::new("reordered".into(), nodes, vec![])
            .validate()
            .unwrap();
        assert_eq!(graph.topo_order(), &[NodeId(1), NodeId(2), NodeId(0)]);
        assert_eq!(graph.topo_position(NodeId(0)), 2);
    }

    #[test]
    fn test_consumers_deduplicated() {
        let nodes = vec![
            GraphNode::input(0, "x"),
            GraphNode::call(1, "double", op::ADD, &[0, 0]),
        ];
        let graph = ComputeGraph::new("dup".into(), nodes, vec![])
            .validate()
            .unwrap();
        assert_eq!(graph.consumers(NodeId(0)), &[NodeId(1)]);
        assert_eq!(graph.topo_order(), &[NodeId(0), NodeId(1)]);
    }

    #[test]
    fn test_default_outputs_are_sinks() {
        let graph = ComputeGraph::new("g".into(), add_relu(), vec![])
            .validate()
            .unwrap();
        assert_eq!(graph.outputs(), &[NodeId(3)]);
        assert!(graph.is_output(NodeId(3)));
        assert!(!graph.is_output(NodeId(2)));
    }

    #[test]
    fn test_node_ref_input_types() {
        let graph = ComputeGraph::new("g".into(), add_relu(), vec![])
            .validate()
            .unwrap();
        let sum = graph.node_ref(NodeId(2)).unwrap();
        assert_eq!(sum.op(), Some(op::ADD));
        assert_eq!(sum.num_inputs(), 2);
        let dtypes: Vec<_> = sum.input_types().map(|t| t.map(|t| t.dtype)).collect();
        assert_eq!(dtypes, vec![Some(DType::F32), Some(DType::F32)]);
        assert_eq!(sum.consumers(), &[NodeId(3)]);
        assert_eq!(sum.name, "sum");
    }

    #[test]
    fn test_op_histogram_and_summary() {
        let graph = ComputeGraph::new("hist".into(), add_relu(), vec![])
            .validate()
            .unwrap();
        let histogram = graph.op_histogram();
        assert_eq!(histogram.get(&op::ADD), Some(&1));
        assert_eq!(histogram.get(&op::RELU), Some(&1));
        let s = graph.summary();
        assert!(s.contains("hist"));
        assert!(s.contains("4 nodes"));
    }

    #[test]
    fn test_display() {
        let graph = ComputeGraph::new("g".into(), add_relu(), vec![]);
        let display = format!("{graph}");
        assert!(display.contains("sum = add(%0, %1)"));
    }
}
