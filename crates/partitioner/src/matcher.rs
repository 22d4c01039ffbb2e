// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Structural pattern matching.
//!
//! The matcher walks a template and the graph in lockstep, starting at the
//! template root and a candidate graph node, following operands
//! positionally:
//!
//! ```text
//!   template            graph
//!   nn.relu   ───────►  %3 nn.relu
//!     add     ───────►  %2 add
//!    *   *    ───────►  %0 x   %1 y      (boundary inputs)
//! ```
//!
//! Operator template nodes become partition members; wildcard-bound nodes
//! are the partition's inputs and stay where they are.
//!
//! A candidate is rejected when
//! - an operator or arity differs,
//! - a member would be a node already claimed by an earlier partition,
//! - a shared template node would bind two different graph nodes,
//! - two operator template nodes would bind the same graph node,
//! - a wildcard binds a node that is also a member,
//! - a non-root member feeds a node outside the match or is a graph
//!   output (the fused region must have a single exit),
//! - the template's predicate rejects the members.
//!
//! Matching is read-only and can be retried at any root.

use backend_registry::{PatternTemplate, TemplateNode, TemplateNodeId};
use graph_ir::{ComputeGraph, NodeId, NodeRef, Validated};
use std::collections::HashMap;

/// A successful match of one template at one root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Name of the matched template.
    pub template: String,
    /// Graph node bound to the template root.
    pub root: NodeId,
    /// Member nodes, in template order.
    pub nodes: Vec<NodeId>,
    /// Wildcard-bound inputs, in template order, deduplicated.
    pub boundary: Vec<NodeId>,
}

/// Matches pattern templates against a validated graph.
#[derive(Debug, Clone, Copy)]
pub struct PatternMatcher<'g> {
    graph: &'g ComputeGraph<Validated>,
}

/// Bindings accumulated during one attempt.
struct Attempt {
    bindings: Vec<Option<NodeId>>,
    members: HashMap<NodeId, TemplateNodeId>,
}

impl<'g> PatternMatcher<'g> {
    pub fn new(graph: &'g ComputeGraph<Validated>) -> Self {
        Self { graph }
    }

    /// Tries `template` rooted at `root`.
    ///
    /// `claimed[i]` marks node `%i` as owned by an earlier partition. Nodes
    /// beyond the end of `claimed` count as unclaimed.
    pub fn match_at(
        &self,
        template: &PatternTemplate,
        root: NodeId,
        claimed: &[bool],
    ) -> Option<PatternMatch> {
        self.graph.node(root)?;

        let mut attempt = Attempt {
            bindings: vec![None; template.nodes().len()],
            members: HashMap::new(),
        };
        if !self.bind(template, template.root(), root, claimed, &mut attempt) {
            return None;
        }

        let mut nodes = Vec::with_capacity(attempt.members.len());
        let mut boundary = Vec::new();
        for (i, tnode) in template.nodes().iter().enumerate() {
            let bound = attempt.bindings[i]?;
            match tnode {
                TemplateNode::Op { .. } => nodes.push(bound),
                TemplateNode::Wildcard => {
                    if attempt.members.contains_key(&bound) {
                        return None;
                    }
                    if !boundary.contains(&bound) {
                        boundary.push(bound);
                    }
                }
            }
        }

        // Only the root may have consumers outside the match.
        for &member in &nodes {
            if member == root {
                continue;
            }
            if self.graph.is_output(member) {
                return None;
            }
            let escapes = self
                .graph
                .consumers(member)
                .iter()
                .any(|c| !attempt.members.contains_key(c));
            if escapes {
                return None;
            }
        }

        let refs: Vec<NodeRef<'g>> = nodes
            .iter()
            .filter_map(|&id| self.graph.node_ref(id))
            .collect();
        if !template.accepts(&refs) {
            return None;
        }

        Some(PatternMatch {
            template: template.name().to_string(),
            root,
            nodes,
            boundary,
        })
    }

    fn bind(
        &self,
        template: &PatternTemplate,
        tid: TemplateNodeId,
        nid: NodeId,
        claimed: &[bool],
        attempt: &mut Attempt,
    ) -> bool {
        if let Some(previous) = attempt.bindings[tid.index()] {
            return previous == nid;
        }

        match template.node(tid) {
            TemplateNode::Wildcard => {
                attempt.bindings[tid.index()] = Some(nid);
                true
            }
            TemplateNode::Op { kind, inputs } => {
                let Some(node) = self.graph.node(nid) else {
                    return false;
                };
                if node.op() != Some(*kind) || node.inputs.len() != inputs.len() {
                    return false;
                }
                if claimed.get(nid.index()).copied().unwrap_or(false) {
                    return false;
                }
                if attempt.members.contains_key(&nid) {
                    return false;
                }
                attempt.bindings[tid.index()] = Some(nid);
                attempt.members.insert(nid, tid);

                inputs
                    .iter()
                    .zip(&node.inputs)
                    .all(|(&t, &n)| self.bind(template, t, n, claimed, attempt))
            }
        }
    }
}
