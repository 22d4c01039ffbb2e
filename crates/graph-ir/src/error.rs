// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for graph construction and loading.

/// Errors that can occur when building or loading a computation graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The graph document could not be read.
    #[error("failed to read graph document: {0}")]
    DocumentReadError(#[from] std::io::Error),

    /// The graph document JSON is malformed.
    #[error("failed to parse graph document: {0}")]
    DocumentParseError(#[from] serde_json::Error),

    /// A node uses an operator kind that was never declared.
    #[error("node '{node}' uses unknown operator '{op}'")]
    UnknownOperator { node: String, op: String },

    /// A node references an input that does not exist.
    #[error("node '{node}' references missing input '{input}'")]
    MissingInput { node: String, input: String },

    /// A node definition is invalid (e.g., a leaf with inputs).
    #[error("invalid node '{node}': {detail}")]
    InvalidNode { node: String, detail: String },

    /// The graph contains a cycle or is otherwise malformed.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),
}
