// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Partition assignment: the output of the partitioner.
//!
//! An assignment is a list of [`Partition`]s covering every graph node
//! exactly once, plus the reverse node → partition map. It is the contract
//! between the partitioner and whatever lowers each partition (a backend
//! code generator or the host).

use crate::merge;
use crate::{PartitionError, PatternMatcher};
use backend_registry::{BackendId, Registries};
use graph_ir::{ComputeGraph, NodeId, Validated};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Dense partition index, in topological order of first node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(transparent)]
pub struct PartitionId(pub usize);

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Where a partition executes.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionTarget {
    /// Offloaded to an accelerator backend.
    Backend(BackendId),
    /// Left to the host's fallback engine.
    Host,
    /// A graph input or constant; nothing to execute.
    Input,
}

impl fmt::Display for PartitionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(b) => write!(f, "{b}"),
            Self::Host => write!(f, "host"),
            Self::Input => write!(f, "input"),
        }
    }
}

/// Why a partition exists.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartitionOrigin {
    /// Exactly the members of one match of a registered template.
    Pattern { template: String },
    /// A single node accepted by the backend's capability predicate.
    Operator,
    /// Adjacent operator partitions of one backend, merged.
    Merged,
    /// Nodes no backend in the priority list could claim.
    Fallback,
    /// A graph input or constant.
    Leaf,
}

/// A set of nodes assigned to one target.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Partition {
    pub id: PartitionId,
    pub target: PartitionTarget,
    pub origin: PartitionOrigin,
    /// Member nodes in topological order.
    pub nodes: Vec<NodeId>,
    /// External function name for backend partitions (e.g. `ft_0`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
}

impl Partition {
    /// The backend this partition is offloaded to, if any.
    pub fn backend(&self) -> Option<&BackendId> {
        match &self.target {
            PartitionTarget::Backend(b) => Some(b),
            _ => None,
        }
    }

    pub fn is_host(&self) -> bool {
        self.target == PartitionTarget::Host
    }

    pub fn is_input(&self) -> bool {
        self.target == PartitionTarget::Input
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The last member in topological order. For pattern partitions this
    /// is the node the template root matched.
    pub fn last_node(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }
}

/// The complete result of one partitioning run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PartitionAssignment {
    /// Name of the partitioned graph.
    pub graph_name: String,
    /// Priority list the run used.
    pub backend_priority: Vec<BackendId>,
    /// Partitions, indexed by [`PartitionId`].
    pub partitions: Vec<Partition>,
    /// `node_partition[i]` is the partition of node `%i`.
    node_partition: Vec<PartitionId>,
}

impl PartitionAssignment {
    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.node_partition.len()
    }

    pub fn partition(&self, id: PartitionId) -> Option<&Partition> {
        self.partitions.get(id.0)
    }

    /// Partition id of `node`.
    pub fn partition_of(&self, node: NodeId) -> Option<PartitionId> {
        self.node_partition.get(node.index()).copied()
    }

    /// The partition containing `node`.
    pub fn partition_for_node(&self, node: NodeId) -> Option<&Partition> {
        self.partition_of(node).and_then(|id| self.partition(id))
    }

    /// Partitions offloaded to `backend`, in id order.
    pub fn partitions_for<'a>(
        &'a self,
        backend: &'a BackendId,
    ) -> impl Iterator<Item = &'a Partition> + 'a {
        self.partitions
            .iter()
            .filter(move |p| p.backend() == Some(backend))
    }

    /// All backend partitions, in id order.
    pub fn backend_partitions(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.iter().filter(|p| p.backend().is_some())
    }

    /// Operator nodes routed to the host, ascending.
    pub fn host_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .partitions
            .iter()
            .filter(|p| p.is_host())
            .flat_map(|p| p.nodes.iter().copied())
            .collect();
        nodes.sort();
        nodes
    }

    /// Number of nodes offloaded to `backend`.
    pub fn nodes_on(&self, backend: &BackendId) -> usize {
        self.partitions_for(backend).map(Partition::len).sum()
    }

    /// Checks structural soundness against `graph`.
    ///
    /// # Checks
    /// - Every node of the graph belongs to exactly one partition, and the
    ///   reverse map agrees.
    /// - Partition ids are dense and match their position.
    /// - No partition is empty.
    /// - Input partitions hold a single leaf; other partitions hold only
    ///   operator calls.
    /// - Backend partitions carry a symbol, others do not.
    pub fn validate(&self, graph: &ComputeGraph<Validated>) -> Result<(), PartitionError> {
        let invalid = |detail: String| Err(PartitionError::InvalidAssignment(detail));

        if self.node_partition.len() != graph.num_nodes() {
            return invalid(format!(
                "assignment covers {} nodes, graph '{}' has {}",
                self.node_partition.len(),
                graph.name,
                graph.num_nodes(),
            ));
        }

        let mut seen = vec![false; graph.num_nodes()];
        for (idx, partition) in self.partitions.iter().enumerate() {
            if partition.id.0 != idx {
                return invalid(format!("partition at {idx} has id {}", partition.id));
            }
            if partition.nodes.is_empty() {
                return invalid(format!("partition {} is empty", partition.id));
            }

            for &node_id in &partition.nodes {
                let Some(node) = graph.node(node_id) else {
                    return invalid(format!("partition {} holds unknown node {node_id}", partition.id));
                };
                if std::mem::replace(&mut seen[node_id.index()], true) {
                    return invalid(format!("node {node_id} is in more than one partition"));
                }
                if self.node_partition[node_id.index()] != partition.id {
                    return invalid(format!(
                        "node {node_id} maps to {} but is listed in {}",
                        self.node_partition[node_id.index()],
                        partition.id,
                    ));
                }
                let leaf_ok = node.is_leaf() == partition.is_input();
                if !leaf_ok {
                    return invalid(format!(
                        "node {node_id} ({}) does not belong in a {} partition",
                        node.kind.as_str(),
                        partition.target,
                    ));
                }
            }

            if partition.is_input() && partition.nodes.len() != 1 {
                return invalid(format!("input partition {} holds several nodes", partition.id));
            }
            if partition.backend().is_some() != partition.symbol.is_some() {
                return invalid(format!("partition {} has a misplaced symbol", partition.id));
            }
        }

        if let Some(missing) = seen.iter().position(|&s| !s) {
            return invalid(format!("node %{missing} is not assigned"));
        }
        Ok(())
    }

    /// Re-checks every backend partition against `registries`.
    ///
    /// - A pattern partition must be exactly one match of the named
    ///   template of its backend, rooted at its last node.
    /// - An operator partition must be one node its backend supports.
    /// - A merged partition must consist of supported nodes and be convex.
    /// - The partitions, ordered by [`dependencies`](Self::dependencies),
    ///   form a DAG.
    ///
    /// Runs [`validate`](Self::validate) first.
    pub fn verify(
        &self,
        graph: &ComputeGraph<Validated>,
        registries: &Registries,
    ) -> Result<(), PartitionError> {
        self.validate(graph)?;
        if let Some(p) = self.cyclic_partition(graph) {
            return Err(PartitionError::InvalidAssignment(format!(
                "partition {p} lies on a dependency cycle between partitions"
            )));
        }
        let matcher = PatternMatcher::new(graph);

        for partition in &self.partitions {
            let Some(backend) = partition.backend() else {
                continue;
            };
            let illegal = |why: &str| {
                Err(PartitionError::InvalidAssignment(format!(
                    "partition {} on '{backend}' {why}",
                    partition.id
                )))
            };

            match &partition.origin {
                PartitionOrigin::Pattern { template } => {
                    let Some(t) = registries.patterns.template(backend, template) else {
                        return illegal(&format!("names unregistered template '{template}'"));
                    };
                    let Some(root) = partition.last_node() else {
                        return illegal("is empty");
                    };
                    let mut expected = match matcher.match_at(t, root, &[]) {
                        Some(m) => m.nodes,
                        None => return illegal(&format!("does not match template '{template}'")),
                    };
                    expected.sort_by_key(|&n| graph.topo_position(n));
                    if expected != partition.nodes {
                        return illegal(&format!("differs from the match of '{template}'"));
                    }
                }
                PartitionOrigin::Operator | PartitionOrigin::Merged => {
                    if partition.origin == PartitionOrigin::Operator && partition.len() != 1 {
                        return illegal("is an operator partition with several nodes");
                    }
                    for &id in &partition.nodes {
                        let supported = graph
                            .node_ref(id)
                            .is_some_and(|n| registries.capabilities.supports_node(backend, &n));
                        if !supported {
                            return illegal(&format!("holds unsupported node {id}"));
                        }
                    }
                    if !merge::is_convex(graph, &partition.nodes) {
                        return illegal("is not convex");
                    }
                }
                PartitionOrigin::Fallback | PartitionOrigin::Leaf => {
                    return illegal("has a host-only origin");
                }
            }
        }
        Ok(())
    }

    /// Producer → consumer edges between distinct partitions, sorted and
    /// deduplicated.
    pub fn dependencies(
        &self,
        graph: &ComputeGraph<Validated>,
    ) -> Vec<(PartitionId, PartitionId)> {
        let mut edges = BTreeSet::new();
        for &producer in graph.topo_order() {
            let Some(from) = self.partition_of(producer) else {
                continue;
            };
            for &consumer in graph.consumers(producer) {
                match self.partition_of(consumer) {
                    Some(to) if to != from => {
                        edges.insert((from, to));
                    }
                    _ => {}
                }
            }
        }
        edges.into_iter().collect()
    }

    /// Some partition on a dependency cycle, if there is one.
    fn cyclic_partition(&self, graph: &ComputeGraph<Validated>) -> Option<PartitionId> {
        let n = self.partitions.len();
        let mut indegree = vec![0usize; n];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (from, to) in self.dependencies(graph) {
            if from.0 < n && to.0 < n {
                successors[from.0].push(to.0);
                indegree[to.0] += 1;
            }
        }

        // Kahn's algorithm: whatever is never released sits on a cycle.
        let mut ready: Vec<usize> = (0..n).filter(|&p| indegree[p] == 0).collect();
        while let Some(p) = ready.pop() {
            for &q in &successors[p] {
                indegree[q] -= 1;
                if indegree[q] == 0 {
                    ready.push(q);
                }
            }
        }
        indegree.iter().position(|&d| d > 0).map(PartitionId)
    }

    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        let mut per_backend: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        let mut inputs = 0;
        let mut host_partitions = 0;
        let mut host_nodes = 0;
        for p in &self.partitions {
            match &p.target {
                PartitionTarget::Backend(b) => {
                    let entry = per_backend.entry(b.as_str()).or_default();
                    entry.0 += 1;
                    entry.1 += p.len();
                }
                PartitionTarget::Host => {
                    host_partitions += 1;
                    host_nodes += p.len();
                }
                PartitionTarget::Input => inputs += 1,
            }
        }

        let backends: Vec<String> = per_backend
            .iter()
            .map(|(b, (parts, nodes))| format!("{b}: {parts} partitions/{nodes} nodes"))
            .collect();
        let priority: Vec<&str> = self.backend_priority.iter().map(BackendId::as_str).collect();

        format!(
            "Assignment '{}': {} partitions over {} nodes, {} inputs, [{}], \
             host: {} partitions/{} nodes, priority {:?}",
            self.graph_name,
            self.num_partitions(),
            self.num_nodes(),
            inputs,
            backends.join(", "),
            host_partitions,
            host_nodes,
            priority,
        )
    }

    /// Serialises the assignment to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ── Builder ────────────────────────────────────────────────────────

/// A partition under construction: members in claim order, no id yet.
#[derive(Debug, Clone)]
pub(crate) struct DraftPartition {
    pub target: PartitionTarget,
    pub origin: PartitionOrigin,
    pub nodes: Vec<NodeId>,
}

/// Accumulates claims during a run and renumbers them at the end.
///
/// Used internally by the partitioner.
pub(crate) struct AssignmentBuilder {
    graph_name: String,
    priority: Vec<BackendId>,
    claimed: Vec<bool>,
    pub(crate) drafts: Vec<DraftPartition>,
}

impl AssignmentBuilder {
    pub fn new(graph: &ComputeGraph<Validated>, priority: &[BackendId]) -> Self {
        Self {
            graph_name: graph.name.clone(),
            priority: priority.to_vec(),
            claimed: vec![false; graph.num_nodes()],
            drafts: Vec::new(),
        }
    }

    /// Claimed flags, indexed by node.
    pub fn claimed(&self) -> &[bool] {
        &self.claimed
    }

    pub fn is_claimed(&self, node: NodeId) -> bool {
        self.claimed[node.index()]
    }

    /// Claims `nodes` as a new partition.
    pub fn claim(&mut self, target: PartitionTarget, origin: PartitionOrigin, nodes: Vec<NodeId>) {
        for n in &nodes {
            self.claimed[n.index()] = true;
        }
        self.drafts.push(DraftPartition {
            target,
            origin,
            nodes,
        });
    }

    /// Orders partitions and their members topologically, assigns dense
    /// ids and per-backend symbols, and checks the result.
    pub fn build(
        mut self,
        graph: &ComputeGraph<Validated>,
    ) -> Result<PartitionAssignment, PartitionError> {
        self.drafts.retain(|d| !d.nodes.is_empty());
        for draft in &mut self.drafts {
            draft.nodes.sort_by_key(|&n| graph.topo_position(n));
        }
        self.drafts
            .sort_by_key(|d| d.nodes.first().map(|&n| graph.topo_position(n)));

        // Keyed by symbol prefix: backends differing only in case share
        // one counter.
        let mut counters: BTreeMap<String, usize> = BTreeMap::new();
        let mut node_partition = vec![PartitionId(usize::MAX); graph.num_nodes()];
        let mut partitions = Vec::with_capacity(self.drafts.len());

        for (idx, draft) in self.drafts.into_iter().enumerate() {
            let id = PartitionId(idx);
            for n in &draft.nodes {
                node_partition[n.index()] = id;
            }
            let symbol = match &draft.target {
                PartitionTarget::Backend(b) => {
                    let prefix = b.as_str().to_lowercase();
                    let k = counters.entry(prefix.clone()).or_default();
                    let symbol = format!("{prefix}_{}", *k);
                    *k += 1;
                    Some(symbol)
                }
                _ => None,
            };
            partitions.push(Partition {
                id,
                target: draft.target,
                origin: draft.origin,
                nodes: draft.nodes,
                symbol,
            });
        }

        let assignment = PartitionAssignment {
            graph_name: self.graph_name,
            backend_priority: self.priority,
            partitions,
            node_partition,
        };
        assignment.validate(graph)?;
        Ok(assignment)
    }
}
