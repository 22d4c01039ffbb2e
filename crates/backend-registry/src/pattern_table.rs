// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-backend ordered fusion pattern tables.

use crate::backend::BackendId;
use crate::pattern::PatternTemplate;
use crate::RegistryError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Maps each backend to its ordered list of pattern templates.
///
/// Earlier templates are tried first. A backend that registered an empty
/// table is known and supports operator-level offload only; a backend that
/// never registered is unknown.
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    tables: HashMap<BackendId, Vec<Arc<PatternTemplate>>>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `templates` as the pattern table of `backend`, replacing any
    /// previous table.
    ///
    /// Template names must be unique within one table.
    pub fn register_patterns(
        &mut self,
        backend: BackendId,
        templates: Vec<PatternTemplate>,
    ) -> Result<(), RegistryError> {
        {
            let mut seen = HashSet::new();
            for t in &templates {
                if !seen.insert(t.name()) {
                    return Err(RegistryError::MalformedTemplate {
                        pattern: t.name().to_string(),
                        detail: format!("duplicate template name in the '{backend}' table"),
                    });
                }
            }
        }

        debug!(
            backend = %backend,
            templates = templates.len(),
            "Registered pattern table"
        );
        let table = templates.into_iter().map(Arc::new).collect();
        self.tables.insert(backend, table);
        Ok(())
    }

    /// The ordered table of `backend`.
    pub fn get_table(&self, backend: &BackendId) -> Result<&[Arc<PatternTemplate>], RegistryError> {
        self.tables
            .get(backend)
            .map(Vec::as_slice)
            .ok_or_else(|| RegistryError::UnknownBackend(backend.to_string()))
    }

    /// Looks up a template of `backend` by name.
    pub fn template(&self, backend: &BackendId, name: &str) -> Option<&Arc<PatternTemplate>> {
        self.tables
            .get(backend)?
            .iter()
            .find(|t| t.name() == name)
    }

    pub fn has_backend(&self, backend: &BackendId) -> bool {
        self.tables.contains_key(backend)
    }

    /// Backends with a registered table, sorted by name.
    pub fn backends(&self) -> Vec<BackendId> {
        let mut backends: Vec<BackendId> = self.tables.keys().cloned().collect();
        backends.sort();
        backends
    }
}
