// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # partitioner
//!
//! Splits a validated `ComputeGraph` into regions assigned to the
//! accelerator backends that can run them, falling back to the host for
//! everything else.
//!
//! # Tiers
//!
//! | Tier | Claims | Partition origin |
//! |---|---|---|
//! | Leaves | inputs and constants | `Leaf` |
//! | Patterns | template matches, backend priority then template order | `Pattern` |
//! | Operators | single nodes with a passing capability predicate | `Operator` / `Merged` |
//! | Fallback | everything else | `Fallback` (host) |
//!
//! Partitioning only reads the registries, so independent runs over
//! different graphs may proceed concurrently.
//!
//! # Example
//! ```
//! use backend_registry::{BackendId, Registries};
//! use graph_ir::{op, ComputeGraph, GraphNode, NodeId};
//! use partitioner::GraphPartitioner;
//!
//! let ft = BackendId::new("ft");
//! let mut registries = Registries::new();
//! registries.register_supported(ft.clone(), op::ADD);
//! registries.register_supported(ft.clone(), op::RELU);
//! registries.register_patterns(ft.clone(), vec![]).unwrap();
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
//!
//! let assignment = GraphPartitioner::new(&registries)
//!     .partition(&graph, &[ft.clone()])
//!     .unwrap();
//! assert_eq!(assignment.nodes_on(&ft), 2);
//! assert!(assignment.host_nodes().is_empty());
//! ```

mod assignment;
mod config;
mod error;
mod matcher;
pub mod merge;
mod partition;

pub use assignment::{Partition, PartitionAssignment, PartitionId, PartitionOrigin, PartitionTarget};
pub use config::PartitionConfig;
pub use error::PartitionError;
pub use matcher::{PatternMatch, PatternMatcher};
pub use partition::{partition_global, GraphPartitioner, PartitionOptions};
