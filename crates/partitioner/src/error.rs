// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the partitioner.

use backend_registry::RegistryError;

/// Errors that can occur while partitioning a graph.
///
/// A node that no backend can run is not an error: it goes to the host.
#[derive(Debug, thiserror::Error)]
pub enum PartitionError {
    /// The priority list names a backend that registered nothing.
    #[error("unknown backend '{0}' in priority list")]
    UnknownBackend(String),

    /// An assignment breaks coverage or legality.
    #[error("invalid assignment: {0}")]
    InvalidAssignment(String),

    /// A registry lookup failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The partitioner configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}
