// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Partitioner configuration loaded from TOML files or constructed
//! programmatically.
//!
//! # TOML Format
//! ```toml
//! backend_priority = ["ft"]
//! merge_adjacent = true
//! ```

use crate::{PartitionError, PartitionOptions};
use backend_registry::BackendId;
use std::path::Path;

/// Configuration for a partitioning run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PartitionConfig {
    /// Backends to offload to, most preferred first.
    #[serde(default = "default_priority")]
    pub backend_priority: Vec<String>,
    /// Whether to merge adjacent same-backend operator partitions.
    #[serde(default = "default_true")]
    pub merge_adjacent: bool,
}

fn default_priority() -> Vec<String> {
    vec!["ft".to_string()]
}

fn default_true() -> bool {
    true
}

impl PartitionConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, PartitionError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PartitionError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, PartitionError> {
        toml::from_str(toml_str)
            .map_err(|e| PartitionError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, PartitionError> {
        toml::to_string_pretty(self)
            .map_err(|e| PartitionError::Config(format!("TOML serialise error: {e}")))
    }

    /// Converts the priority names into backend ids.
    ///
    /// Names are trimmed; empty names are rejected. Whether a backend is
    /// actually registered is checked when partitioning.
    pub fn parse_priority(&self) -> Result<Vec<BackendId>, PartitionError> {
        self.backend_priority
            .iter()
            .map(|name| {
                let name = name.trim();
                if name.is_empty() {
                    Err(PartitionError::Config(
                        "empty backend name in backend_priority".to_string(),
                    ))
                } else {
                    Ok(BackendId::new(name))
                }
            })
            .collect()
    }

    /// The partitioner options this config selects.
    pub fn options(&self) -> PartitionOptions {
        PartitionOptions {
            merge_adjacent: self.merge_adjacent,
        }
    }
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            backend_priority: default_priority(),
            merge_adjacent: true,
        }
    }
}
