// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fusion pattern templates.
//!
//! A [`PatternTemplate`] is a small DAG of operator nodes and wildcards with
//! a designated root. Operator nodes must meet a graph node of the same
//! kind and arity; wildcards accept any single node and mark the boundary
//! of the fused region.
//!
//! ```text
//!   nn.relu(add(*, *))       root = nn.relu
//!
//!        relu   ◄── root
//!         │
//!        add
//!       /   \
//!      *     *               wildcards: partition inputs
//! ```
//!
//! Templates are validated when they are built, so a malformed template
//! is rejected at registration time and never reaches the matcher.

use crate::predicate::PatternPredicate;
use crate::RegistryError;
use graph_ir::{NodeRef, OpKind};
use std::fmt;

/// Index of a node inside a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateNodeId(pub u32);

impl TemplateNodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One node of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateNode {
    /// Matches a call of `kind` whose operands match `inputs` positionally.
    Op {
        kind: OpKind,
        inputs: Vec<TemplateNodeId>,
    },
    /// Matches any single node, which becomes an input of the partition.
    Wildcard,
}

/// An immutable, validated fusion pattern.
#[derive(Clone)]
pub struct PatternTemplate {
    name: String,
    nodes: Vec<TemplateNode>,
    root: TemplateNodeId,
    predicate: Option<PatternPredicate>,
}

impl PatternTemplate {
    /// Starts building a template called `name`.
    pub fn builder(name: impl Into<String>) -> PatternTemplateBuilder {
        PatternTemplateBuilder {
            name: name.into(),
            nodes: Vec::new(),
            predicate: None,
        }
    }

    /// Creates a template from raw parts, validating it.
    ///
    /// # Checks
    /// - The template is non-empty and the root exists.
    /// - The root is an operator node.
    /// - Every input reference exists.
    /// - The template is acyclic.
    /// - Every node is reachable from the root.
    pub fn from_parts(
        name: impl Into<String>,
        nodes: Vec<TemplateNode>,
        root: TemplateNodeId,
        predicate: Option<PatternPredicate>,
    ) -> Result<Self, RegistryError> {
        let template = Self {
            name: name.into(),
            nodes,
            root,
            predicate,
        };
        template.validate()?;
        Ok(template)
    }

    fn malformed(&self, detail: impl Into<String>) -> RegistryError {
        RegistryError::MalformedTemplate {
            pattern: self.name.clone(),
            detail: detail.into(),
        }
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.nodes.is_empty() {
            return Err(self.malformed("template has no nodes"));
        }
        match self.nodes.get(self.root.index()) {
            None => {
                return Err(self.malformed(format!(
                    "root {} is out of range ({} nodes)",
                    self.root.0,
                    self.nodes.len()
                )))
            }
            Some(TemplateNode::Wildcard) => {
                return Err(self.malformed("root must be an operator node"));
            }
            Some(TemplateNode::Op { .. }) => {}
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if let TemplateNode::Op { inputs, .. } = node {
                if let Some(bad) = inputs.iter().find(|t| t.index() >= self.nodes.len()) {
                    return Err(self.malformed(format!(
                        "node {i} references missing node {}",
                        bad.0
                    )));
                }
            }
        }

        // Iterative DFS from the root with three colours: a grey node met
        // again is a back edge, i.e. a cycle.
        const WHITE: u8 = 0;
        const GREY: u8 = 1;
        const BLACK: u8 = 2;
        let mut colour = vec![WHITE; self.nodes.len()];
        let mut stack = vec![(self.root, 0usize)];
        colour[self.root.index()] = GREY;
        while let Some((id, next)) = stack.pop() {
            let inputs = self.inputs_of(id);
            if next < inputs.len() {
                stack.push((id, next + 1));
                let child = inputs[next];
                match colour[child.index()] {
                    WHITE => {
                        colour[child.index()] = GREY;
                        stack.push((child, 0));
                    }
                    GREY => {
                        return Err(self.malformed(format!(
                            "cycle through node {}",
                            child.0
                        )))
                    }
                    _ => {}
                }
            } else {
                colour[id.index()] = BLACK;
            }
        }

        if let Some(orphan) = colour.iter().position(|&c| c != BLACK) {
            return Err(self.malformed(format!(
                "node {orphan} is not reachable from the root"
            )));
        }
        Ok(())
    }

    fn inputs_of(&self, id: TemplateNodeId) -> &[TemplateNodeId] {
        match &self.nodes[id.index()] {
            TemplateNode::Op { inputs, .. } => inputs,
            TemplateNode::Wildcard => &[],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> TemplateNodeId {
        self.root
    }

    pub fn nodes(&self) -> &[TemplateNode] {
        &self.nodes
    }

    pub fn node(&self, id: TemplateNodeId) -> &TemplateNode {
        &self.nodes[id.index()]
    }

    /// Operator kind of the root node.
    pub fn root_kind(&self) -> OpKind {
        match &self.nodes[self.root.index()] {
            TemplateNode::Op { kind, .. } => *kind,
            TemplateNode::Wildcard => unreachable!("validated templates have an operator root"),
        }
    }

    /// Number of operator nodes (the size of a matched partition).
    pub fn num_op_nodes(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TemplateNode::Op { .. }))
            .count()
    }

    pub fn num_wildcards(&self) -> usize {
        self.nodes.len() - self.num_op_nodes()
    }

    /// Runs the whole-match predicate; templates without one accept.
    pub fn accepts(&self, matched: &[NodeRef<'_>]) -> bool {
        self.predicate.as_ref().map_or(true, |p| p(matched))
    }

    pub fn has_predicate(&self) -> bool {
        self.predicate.is_some()
    }

    fn fmt_node(&self, id: TemplateNodeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.nodes[id.index()] {
            TemplateNode::Wildcard => write!(f, "*"),
            TemplateNode::Op { kind, inputs } => {
                write!(f, "{kind}(")?;
                for (i, input) in inputs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    self.fmt_node(*input, f)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Renders the template as an expression rooted at its root, e.g.
/// `nn.relu(add(*, *))`.
impl fmt::Display for PatternTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_node(self.root, f)
    }
}

impl fmt::Debug for PatternTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternTemplate")
            .field("name", &self.name)
            .field("expr", &self.to_string())
            .field("has_predicate", &self.predicate.is_some())
            .finish()
    }
}

/// Incremental template construction.
///
/// Nodes can only reference nodes created before them, so builder-made
/// templates are acyclic by construction; `build` still runs the full
/// validation (root kind, reachability).
pub struct PatternTemplateBuilder {
    name: String,
    nodes: Vec<TemplateNode>,
    predicate: Option<PatternPredicate>,
}

impl PatternTemplateBuilder {
    /// Adds a wildcard.
    pub fn wildcard(&mut self) -> TemplateNodeId {
        self.push(TemplateNode::Wildcard)
    }

    /// Adds an operator node over previously created nodes.
    pub fn op(&mut self, kind: OpKind, inputs: &[TemplateNodeId]) -> TemplateNodeId {
        self.push(TemplateNode::Op {
            kind,
            inputs: inputs.to_vec(),
        })
    }

    /// Attaches a whole-match legality predicate.
    pub fn with_predicate(&mut self, predicate: PatternPredicate) -> &mut Self {
        self.predicate = Some(predicate);
        self
    }

    fn push(&mut self, node: TemplateNode) -> TemplateNodeId {
        let id = TemplateNodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Finishes the template with `root` as its designated root.
    pub fn build(self, root: TemplateNodeId) -> Result<PatternTemplate, RegistryError> {
        PatternTemplate::from_parts(self.name, self.nodes, root, self.predicate)
    }
}
