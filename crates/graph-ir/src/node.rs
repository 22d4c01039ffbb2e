// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Graph nodes.
//!
//! A [`GraphNode`] is either a leaf (graph input or constant) or a call of a
//! primitive operator on an ordered list of inputs. Nodes are owned by the
//! [`crate::ComputeGraph`]; consumers only ever borrow them.

use crate::{OpKind, TensorType};
use std::collections::BTreeMap;
use std::fmt;

/// Index of a node inside its graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// What a node computes.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// A graph input (free variable).
    Input,
    /// A constant (e.g. a bound weight).
    Constant,
    /// A call of a primitive operator.
    Call { op: OpKind },
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Input => "input",
            NodeKind::Constant => "constant",
            NodeKind::Call { op } => op.as_str(),
        }
    }
}

/// A node attribute value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Ints(Vec<i64>),
}

impl AttrValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            AttrValue::Ints(v) => Some(v),
            _ => None,
        }
    }
}

/// A single node of the host computation graph.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GraphNode {
    /// Position of this node in [`crate::ComputeGraph::nodes`].
    pub id: NodeId,
    /// Unique, human-readable name (e.g. `"conv1.relu"`).
    pub name: String,
    /// Leaf kind or called operator.
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Ordered operand references.
    pub inputs: Vec<NodeId>,
    /// Operator attributes (strides, axis, ...).
    pub attrs: BTreeMap<String, AttrValue>,
    /// Type of the value this node produces, when known.
    #[serde(rename = "type")]
    pub ty: Option<TensorType>,
}

impl GraphNode {
    /// Creates a graph input.
    pub fn input(id: usize, name: impl Into<String>) -> Self {
        Self::leaf(id, name, NodeKind::Input)
    }

    /// Creates a constant.
    pub fn constant(id: usize, name: impl Into<String>) -> Self {
        Self::leaf(id, name, NodeKind::Constant)
    }

    /// Creates a call of `op` on `inputs`.
    pub fn call(id: usize, name: impl Into<String>, op: OpKind, inputs: &[usize]) -> Self {
        Self {
            id: NodeId(id),
            name: name.into(),
            kind: NodeKind::Call { op },
            inputs: inputs.iter().copied().map(NodeId).collect(),
            attrs: BTreeMap::new(),
            ty: None,
        }
    }

    fn leaf(id: usize, name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId(id),
            name: name.into(),
            kind,
            inputs: Vec::new(),
            attrs: BTreeMap::new(),
            ty: None,
        }
    }

    /// Sets the output type.
    pub fn with_type(mut self, ty: TensorType) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Adds an attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    /// Returns the called operator, or `None` for leaves.
    pub fn op(&self) -> Option<OpKind> {
        match self.kind {
            NodeKind::Call { op } => Some(op),
            _ => None,
        }
    }

    /// Returns `true` for graph inputs and constants.
    pub fn is_leaf(&self) -> bool {
        !matches!(self.kind, NodeKind::Call { .. })
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.get(key)
    }

    /// Returns a concise summary string for display.
    pub fn summary(&self) -> String {
        let inputs: Vec<String> = self.inputs.iter().map(|i| i.to_string()).collect();
        let ty = self
            .ty
            .as_ref()
            .map(|t| format!(" : {t}"))
            .unwrap_or_default();
        format!(
            "{} {} = {}({}){}",
            self.id,
            self.name,
            self.kind.as_str(),
            inputs.join(", "),
            ty,
        )
    }
}
