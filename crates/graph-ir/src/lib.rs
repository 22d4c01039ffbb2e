// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # graph-ir
//!
//! The host-side computation graph handed to the backend partitioner.
//!
//! - [`OpKind`] — interned operator identifiers with a built-in catalog ([`op`]).
//! - [`GraphNode`] — an input, a constant, or an operator call with ordered
//!   inputs, attributes and an optional [`TensorType`].
//! - [`ComputeGraph`] — the DAG, with a **type-state pattern**
//!   (`Loaded` → `Validated`). Validation computes a deterministic
//!   topological order and consumer lists.
//! - [`NodeRef`] — a node plus its graph; what legality predicates inspect.
//! - [`GraphDocument`] / [`GraphLoader`] — JSON graph documents.
//!
//! # Example
//! ```
//! use graph_ir::{op, ComputeGraph, GraphNode, NodeId};
//!
//! let graph = ComputeGraph::new(
//!     "add_relu".into(),
//!     vec![
//!         GraphNode::input(0, "x"),
//!         GraphNode::input(1, "y"),
//!         GraphNode::call(2, "sum", op::ADD, &[0, 1]),
//!         GraphNode::call(3, "act", op::RELU, &[2]),
//!     ],
//!     vec![NodeId(3)],
//! )
//! .validate()
//! .unwrap();
//! assert_eq!(graph.num_calls(), 2);
//! ```

mod document;
mod dtype;
mod error;
pub mod graph;
mod loader;
mod node;
pub mod op;
mod shape;

pub use document::{DocumentNode, DocumentNodeKind, GraphDocument};
pub use dtype::DType;
pub use error::GraphError;
pub use graph::{ComputeGraph, Loaded, NodeRef, Validated};
pub use loader::GraphLoader;
pub use node::{AttrValue, GraphNode, NodeId, NodeKind};
pub use op::OpKind;
pub use shape::{Shape, TensorType};
