// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the FT integration.

use graph_ir::NodeId;

/// Errors raised while mapping FT partitions onto FT kernels.
#[derive(Debug, thiserror::Error)]
pub enum FtError {
    /// An FT partition holds an operator with no FT kernel.
    #[error("no FT kernel for node {node} ({op})")]
    UnmappedOperator { node: NodeId, op: String },

    /// The assignment refers to a node the graph does not have.
    #[error("node {0} is not in the graph")]
    MissingNode(NodeId),
}
