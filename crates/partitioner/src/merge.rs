// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Merging adjacent partitions of the same target.
//!
//! Two partitions merge when a producer → consumer edge connects them,
//! both are mergeable and share a target, and their union is convex.
//! Mergeable means operator-tier backend partitions (`Operator`, `Merged`)
//! and host partitions. Pattern and input partitions keep their shape.
//!
//! Convexity: no path may leave the union and come back into it. Such a
//! path would force the merged partition to both produce and consume a
//! value computed elsewhere.
//!
//! ```text
//!   a ──► b ──► c        {a, c} is not convex when b is outside:
//!   └───────────┘        a → b → c leaves and re-enters.
//! ```
//!
//! The merge pass applies the same rule to the graph of partitions: a
//! path leaving the union may not re-enter it through any other partition,
//! even when every node set on the way is convex by itself.
//!
//! ```text
//!   x1 ──► x2            {x1, x2} on ft and {h1, h2} on host are each
//!     ╲   ╱              convex, but together ft → host (x1 → h2) and
//!      ╳                 host → ft (h1 → x2) would depend on each other.
//!     ╱   ╲              Only the first of the two merges is taken.
//!   h1 ──► h2
//! ```

use crate::assignment::{DraftPartition, PartitionOrigin, PartitionTarget};
use graph_ir::{ComputeGraph, NodeId, Validated};
use tracing::debug;

/// Whether no path leaves `members` and re-enters it.
pub fn is_convex(graph: &ComputeGraph<Validated>, members: &[NodeId]) -> bool {
    let mut inside = vec![false; graph.num_nodes()];
    let mut last = 0;
    for &m in members {
        inside[m.index()] = true;
        last = last.max(graph.topo_position(m));
    }

    // Nodes past the last member in topological order cannot reach back.
    let mut visited = vec![false; graph.num_nodes()];
    let mut stack: Vec<NodeId> = Vec::new();
    for &m in members {
        for &c in graph.consumers(m) {
            if !inside[c.index()] && graph.topo_position(c) < last && !visited[c.index()] {
                visited[c.index()] = true;
                stack.push(c);
            }
        }
    }
    while let Some(n) = stack.pop() {
        for &c in graph.consumers(n) {
            if inside[c.index()] {
                return false;
            }
            if graph.topo_position(c) < last && !visited[c.index()] {
                visited[c.index()] = true;
                stack.push(c);
            }
        }
    }
    true
}

/// Partitions consuming a value produced by `draft`.
fn successors<'a>(
    graph: &'a ComputeGraph<Validated>,
    draft: &'a DraftPartition,
    owner: &'a [usize],
) -> impl Iterator<Item = usize> + 'a {
    draft
        .nodes
        .iter()
        .flat_map(move |&n| graph.consumers(n).iter().map(move |c| owner[c.index()]))
}

/// Whether some path leaves drafts `a` and `b` through another partition
/// and comes back into one of them. Merging such a pair would put the
/// merged partition on a dependency cycle.
fn reenters(
    graph: &ComputeGraph<Validated>,
    drafts: &[DraftPartition],
    owner: &[usize],
    a: usize,
    b: usize,
) -> bool {
    let last = drafts[a]
        .nodes
        .iter()
        .chain(&drafts[b].nodes)
        .map(|&n| graph.topo_position(n))
        .max()
        .unwrap_or(0);
    // A partition whose nodes all come after the union cannot reach back.
    let may_return = |p: usize| {
        drafts[p]
            .nodes
            .iter()
            .any(|&n| graph.topo_position(n) < last)
    };

    let mut visited = vec![false; drafts.len()];
    let mut stack: Vec<usize> = Vec::new();
    for start in [a, b] {
        for q in successors(graph, &drafts[start], owner) {
            if q != a && q != b && !visited[q] {
                visited[q] = true;
                if may_return(q) {
                    stack.push(q);
                }
            }
        }
    }
    while let Some(p) = stack.pop() {
        for q in successors(graph, &drafts[p], owner) {
            if q == a || q == b {
                return true;
            }
            if !visited[q] {
                visited[q] = true;
                if may_return(q) {
                    stack.push(q);
                }
            }
        }
    }
    false
}

fn mergeable(a: &DraftPartition, b: &DraftPartition) -> bool {
    let kind_ok = |d: &DraftPartition| match d.target {
        PartitionTarget::Backend(_) => {
            matches!(d.origin, PartitionOrigin::Operator | PartitionOrigin::Merged)
        }
        PartitionTarget::Host => true,
        PartitionTarget::Input => false,
    };
    kind_ok(a) && kind_ok(b) && a.target == b.target
}

/// Merges adjacent partitions in place until nothing changes.
///
/// Emptied drafts are removed. Returns the number of merges performed.
pub(crate) fn merge_adjacent(
    graph: &ComputeGraph<Validated>,
    drafts: &mut Vec<DraftPartition>,
) -> usize {
    let mut owner = vec![usize::MAX; graph.num_nodes()];
    for (idx, draft) in drafts.iter().enumerate() {
        for n in &draft.nodes {
            owner[n.index()] = idx;
        }
    }

    let mut merges = 0;
    let mut changed = true;
    while changed {
        changed = false;
        for &producer in graph.topo_order() {
            for &consumer in graph.consumers(producer) {
                let (keep, absorb) = (owner[producer.index()], owner[consumer.index()]);
                if keep == absorb || !mergeable(&drafts[keep], &drafts[absorb]) {
                    continue;
                }

                if reenters(graph, drafts, &owner, keep, absorb) {
                    continue;
                }
                let mut union = drafts[keep].nodes.clone();
                union.extend_from_slice(&drafts[absorb].nodes);

                let moved = std::mem::take(&mut drafts[absorb].nodes);
                for n in &moved {
                    owner[n.index()] = keep;
                }
                debug!(
                    target_name = %drafts[keep].target,
                    into = keep,
                    from = absorb,
                    nodes = union.len(),
                    "Merged adjacent partitions"
                );
                let draft = &mut drafts[keep];
                draft.nodes = union;
                if draft.origin == PartitionOrigin::Operator {
                    draft.origin = PartitionOrigin::Merged;
                }
                merges += 1;
                changed = true;
            }
        }
    }

    drafts.retain(|d| !d.nodes.is_empty());
    merges
}
