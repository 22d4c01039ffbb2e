// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Building validated graphs from [`GraphDocument`]s.

use crate::document::DocumentNodeKind;
use crate::{graph, ComputeGraph, GraphDocument, GraphError, GraphNode, NodeId, NodeKind, OpKind};
use std::collections::HashMap;
use std::path::Path;

/// Loads graph documents into validated [`ComputeGraph`]s.
///
/// # Example
/// ```no_run
/// use graph_ir::GraphLoader;
/// use std::path::Path;
///
/// let graph = GraphLoader::load(Path::new("./graphs/add_relu.json")).unwrap();
/// println!("{}", graph.summary());
/// ```
pub struct GraphLoader;

impl GraphLoader {
    /// Loads and validates a graph from a JSON document on disk.
    pub fn load(path: &Path) -> Result<ComputeGraph<graph::Validated>, GraphError> {
        let document = GraphDocument::from_file(path)?;
        Self::from_document(&document)
    }

    /// Builds a validated graph from an in-memory document.
    ///
    /// Steps:
    /// 1. Declare the document's custom operators.
    /// 2. Validate the document.
    /// 3. Resolve node names into [`NodeId`]s (document order).
    /// 4. Construct and validate the [`ComputeGraph`].
    pub fn from_document(
        document: &GraphDocument,
    ) -> Result<ComputeGraph<graph::Validated>, GraphError> {
        document.declare_custom_ops();
        document.validate()?;

        let ids: HashMap<&str, NodeId> = document
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.name.as_str(), NodeId(i)))
            .collect();

        let resolve = |owner: &str, name: &str| {
            ids.get(name).copied().ok_or_else(|| GraphError::MissingInput {
                node: owner.to_string(),
                input: name.to_string(),
            })
        };

        let mut nodes = Vec::with_capacity(document.nodes.len());
        for (i, entry) in document.nodes.iter().enumerate() {
            let kind = match entry.kind {
                DocumentNodeKind::Input => NodeKind::Input,
                DocumentNodeKind::Constant => NodeKind::Constant,
                DocumentNodeKind::Call => {
                    let name = entry.op.as_deref().unwrap_or_default();
                    let op = OpKind::lookup(name).ok_or_else(|| GraphError::UnknownOperator {
                        node: entry.name.clone(),
                        op: name.to_string(),
                    })?;
                    NodeKind::Call { op }
                }
            };
            let inputs = entry
                .inputs
                .iter()
                .map(|input| resolve(&entry.name, input))
                .collect::<Result<Vec<_>, _>>()?;
            nodes.push(GraphNode {
                id: NodeId(i),
                name: entry.name.clone(),
                kind,
                inputs,
                attrs: entry.attrs.clone(),
                ty: entry.ty.clone(),
            });
        }

        let outputs = document
            .outputs
            .iter()
            .map(|name| resolve(&document.name, name))
            .collect::<Result<Vec<_>, _>>()?;

        let graph = ComputeGraph::new(document.name.clone(), nodes, outputs).validate()?;
        tracing::debug!("loaded {}", graph.summary());
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op;
    use std::io::Write;

    const DOC: &str = r#"{
        "name": "conv_block",
        "nodes": [
            { "name": "act", "op": "nn.relu", "inputs": ["conv"] },
            { "name": "data", "kind": "input", "type": { "shape": [1, 3, 32, 32], "dtype": "f32" } },
            { "name": "weight", "kind": "constant" },
            { "name": "conv", "op": "nn.conv2d", "inputs": ["data", "weight"],
              "attrs": { "strides": [1, 1], "data_layout": "NCHW" } }
        ]
    }"#;

    #[test]
    fn test_from_document() {
        let document = GraphDocument::from_json(DOC).unwrap();
        let graph = GraphLoader::from_document(&document).unwrap();

        assert_eq!(graph.name, "conv_block");
        assert_eq!(graph.num_nodes(), 4);
        let conv = graph.node(NodeId(3)).unwrap();
        assert_eq!(conv.op(), Some(op::CONV2D));
        assert_eq!(conv.inputs, vec![NodeId(1), NodeId(2)]);
        assert_eq!(
            conv.attr("strides").and_then(|a| a.as_ints()),
            Some(&[1, 1][..])
        );
        // Declared out of order; the topological order still puts conv first.
        assert!(graph.topo_position(NodeId(3)) < graph.topo_position(NodeId(0)));
        assert_eq!(graph.outputs(), &[NodeId(0)]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOC.as_bytes()).unwrap();
        let graph = GraphLoader::load(file.path()).unwrap();
        assert_eq!(graph.num_calls(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let result = GraphLoader::load(Path::new("/nonexistent/graph.json"));
        assert!(matches!(result, Err(GraphError::DocumentReadError(_))));
    }

    #[test]
    fn test_cycle_rejected() {
        let doc = r#"{
            "name": "loop",
            "nodes": [
                { "name": "a", "op": "abs", "inputs": ["b"] },
                { "name": "b", "op": "abs", "inputs": ["a"] }
            ]
        }"#;
        let document = GraphDocument::from_json(doc).unwrap();
        assert!(matches!(
            GraphLoader::from_document(&document),
            Err(GraphError::InvalidGraph(_))
        ));
    }
}
