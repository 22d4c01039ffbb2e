// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON graph documents.
//!
//! A graph document is how a host hands a computation graph to the
//! partitioner from the outside (e.g. the CLI). Nodes refer to each other
//! by name.
//!
//! # Format
//! ```json
//! {
//!   "name": "add_relu",
//!   "custom_ops": ["my.fused_gelu"],
//!   "nodes": [
//!     { "name": "x", "kind": "input", "type": { "shape": [1, 8], "dtype": "f32" } },
//!     { "name": "y", "kind": "input", "type": { "shape": [1, 8], "dtype": "f32" } },
//!     { "name": "sum", "op": "add", "inputs": ["x", "y"] },
//!     { "name": "act", "op": "nn.relu", "inputs": ["sum"] }
//!   ],
//!   "outputs": ["act"]
//! }
//! ```

use crate::{AttrValue, GraphError, OpKind, TensorType};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Top-level graph document, deserialised from JSON.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GraphDocument {
    /// Graph name.
    pub name: String,
    /// Operator names outside the built-in catalog used by this graph.
    #[serde(default)]
    pub custom_ops: Vec<String>,
    /// Node definitions (any order; references are by name).
    pub nodes: Vec<DocumentNode>,
    /// Names of the output nodes. Empty means "all sinks".
    #[serde(default)]
    pub outputs: Vec<String>,
}

/// Leaf kind or call, as spelled in a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentNodeKind {
    Input,
    Constant,
    #[default]
    Call,
}

/// A single node entry in the document.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DocumentNode {
    pub name: String,
    #[serde(default)]
    pub kind: DocumentNodeKind,
    /// Operator name (calls only).
    #[serde(default)]
    pub op: Option<String>,
    /// Operand node names (calls only).
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, AttrValue>,
    #[serde(default, rename = "type")]
    pub ty: Option<TensorType>,
}

impl GraphDocument {
    /// Loads a document from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, GraphError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses a document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let document: Self = serde_json::from_str(json)?;
        Ok(document)
    }

    /// Serialises the document to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Declares the document's custom operators.
    ///
    /// Must run before [`Self::validate`] so that custom operator names
    /// resolve.
    pub fn declare_custom_ops(&self) {
        let mut seen = HashSet::new();
        for name in &self.custom_ops {
            if !seen.insert(name.as_str()) {
                tracing::warn!("custom operator '{name}' declared twice in '{}'", self.name);
                continue;
            }
            OpKind::intern(name);
        }
    }

    /// Validates that the document is internally consistent.
    ///
    /// Checks:
    /// - At least one node is defined.
    /// - No duplicate node names.
    /// - Calls name a declared operator; leaves name none and take no inputs.
    /// - Every input and output name refers to a node.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::InvalidGraph(format!(
                "document '{}' contains no nodes",
                self.name
            )));
        }

        let mut names = HashSet::new();
        for node in &self.nodes {
            if !names.insert(node.name.as_str()) {
                return Err(GraphError::InvalidNode {
                    node: node.name.clone(),
                    detail: "duplicate node name".into(),
                });
            }
        }

        for node in &self.nodes {
            match node.kind {
                DocumentNodeKind::Call => {
                    let op = node.op.as_deref().ok_or_else(|| GraphError::InvalidNode {
                        node: node.name.clone(),
                        detail: "call node has no 'op'".into(),
                    })?;
                    if OpKind::lookup(op).is_none() {
                        return Err(GraphError::UnknownOperator {
                            node: node.name.clone(),
                            op: op.to_string(),
                        });
                    }
                }
                DocumentNodeKind::Input | DocumentNodeKind::Constant => {
                    if node.op.is_some() || !node.inputs.is_empty() {
                        return Err(GraphError::InvalidNode {
                            node: node.name.clone(),
                            detail: "leaf node cannot have an operator or inputs".into(),
                        });
                    }
                }
            }

            if let Some(missing) = node.inputs.iter().find(|i| !names.contains(i.as_str())) {
                return Err(GraphError::MissingInput {
                    node: node.name.clone(),
                    input: missing.clone(),
                });
            }
        }

        if let Some(missing) = self.outputs.iter().find(|o| !names.contains(o.as_str())) {
            return Err(GraphError::InvalidGraph(format!(
                "output '{missing}' does not name a node"
            )));
        }

        Ok(())
    }
}
