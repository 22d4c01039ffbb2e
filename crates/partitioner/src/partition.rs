// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The greedy graph partitioner.
//!
//! # Tiers
//!
//! Nodes are claimed in tiers, each walking the graph in topological
//! order:
//!
//! 1. **Leaves**: inputs and constants become their own input partitions.
//! 2. **Patterns**: backends in priority order, each applying its
//!    templates in registration order. A template is tried at every
//!    unclaimed call before the next template gets a turn, so an earlier
//!    (typically larger) template is never pre-empted by a later one
//!    rooted further up the graph.
//! 3. **Operators**: each remaining call goes to the first backend in
//!    priority order whose capability predicate accepts it.
//! 4. **Fallback**: whatever is left runs on the host.
//!
//! Then adjacent operator-tier partitions of one backend (and adjacent host
//! nodes) are merged where the union stays convex, and partitions are
//! numbered in topological order.
//!
//! The run is deterministic: the same graph, registries and priority list
//! always give the same assignment.

use crate::assignment::{AssignmentBuilder, PartitionAssignment, PartitionOrigin, PartitionTarget};
use crate::merge;
use crate::{PartitionError, PatternMatcher};
use backend_registry::{BackendId, PatternTemplate, Registries};
use graph_ir::{ComputeGraph, Validated};
use std::sync::Arc;
use tracing::{debug, info};

/// Tunables for a partitioning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionOptions {
    /// Merge adjacent same-backend operator partitions and host nodes.
    pub merge_adjacent: bool,
}

impl Default for PartitionOptions {
    fn default() -> Self {
        Self {
            merge_adjacent: true,
        }
    }
}

/// Assigns every node of a graph to a backend or the host.
///
/// Borrows the registries read-only, so several partitioners can run over
/// different graphs at once.
#[derive(Debug, Clone)]
pub struct GraphPartitioner<'r> {
    registries: &'r Registries,
    options: PartitionOptions,
}

impl<'r> GraphPartitioner<'r> {
    pub fn new(registries: &'r Registries) -> Self {
        Self {
            registries,
            options: PartitionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PartitionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> PartitionOptions {
        self.options
    }

    /// Partitions `graph` across `priority`, earliest backend preferred.
    ///
    /// # Errors
    /// [`PartitionError::UnknownBackend`] if a backend in `priority` is
    /// known to neither registry.
    pub fn partition(
        &self,
        graph: &ComputeGraph<Validated>,
        priority: &[BackendId],
    ) -> Result<PartitionAssignment, PartitionError> {
        if let Some(unknown) = priority.iter().find(|b| !self.registries.knows_backend(b)) {
            return Err(PartitionError::UnknownBackend(unknown.to_string()));
        }

        // A backend with capabilities but no pattern table offloads
        // single operators only.
        let tables: Vec<(&BackendId, &[Arc<PatternTemplate>])> = priority
            .iter()
            .map(|b| (b, self.registries.get_table(b).unwrap_or(&[])))
            .collect();

        let matcher = PatternMatcher::new(graph);
        let mut builder = AssignmentBuilder::new(graph, priority);

        // ── Leaves ──
        for node in graph.iter_topological().filter(|n| n.is_leaf()) {
            builder.claim(PartitionTarget::Input, PartitionOrigin::Leaf, vec![node.id]);
        }

        // ── Patterns ──
        for (backend, table) in &tables {
            for template in table.iter() {
                let root_kind = template.root_kind();
                for &id in graph.topo_order() {
                    if builder.is_claimed(id) || graph.node(id).and_then(|n| n.op()) != Some(root_kind)
                    {
                        continue;
                    }
                    let Some(m) = matcher.match_at(template, id, builder.claimed()) else {
                        continue;
                    };
                    debug!(
                        backend = %backend,
                        template = %m.template,
                        root = %id,
                        nodes = m.nodes.len(),
                        "Pattern claimed nodes"
                    );
                    builder.claim(
                        PartitionTarget::Backend((*backend).clone()),
                        PartitionOrigin::Pattern {
                            template: m.template,
                        },
                        m.nodes,
                    );
                }
            }
        }

        // ── Operators, then host ──
        for &id in graph.topo_order() {
            if builder.is_claimed(id) {
                continue;
            }
            let Some(node) = graph.node_ref(id) else {
                continue;
            };
            let Some(op) = node.op() else {
                continue;
            };
            let claimant = priority
                .iter()
                .find(|b| self.registries.is_supported(b, op, &node));
            match claimant {
                Some(backend) => {
                    debug!(backend = %backend, node = %id, op = %op, "Operator claimed node");
                    builder.claim(
                        PartitionTarget::Backend(backend.clone()),
                        PartitionOrigin::Operator,
                        vec![id],
                    );
                }
                None => {
                    debug!(node = %id, op = %op, "No backend claimed node, falling back to host");
                    builder.claim(PartitionTarget::Host, PartitionOrigin::Fallback, vec![id]);
                }
            }
        }

        if self.options.merge_adjacent {
            let merges = merge::merge_adjacent(graph, &mut builder.drafts);
            debug!(merges, "Merge pass finished");
        }

        let assignment = builder.build(graph)?;
        info!("{}", assignment.summary());
        Ok(assignment)
    }
}

/// Partitions `graph` with a snapshot of the process-wide registries.
pub fn partition_global(
    graph: &ComputeGraph<Validated>,
    priority: &[BackendId],
) -> Result<PartitionAssignment, PartitionError> {
    let registries = backend_registry::global::snapshot();
    GraphPartitioner::new(&registries).partition(graph, priority)
}
