// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The capability and pattern registries bundled together.

use crate::backend::BackendId;
use crate::capability::OperatorCapabilityRegistry;
use crate::pattern::PatternTemplate;
use crate::pattern_table::PatternRegistry;
use crate::predicate::LegalityPredicate;
use crate::RegistryError;
use graph_ir::{NodeRef, OpKind};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Everything a partitioning run consults.
///
/// Cloning is cheap: predicates and templates are shared.
#[derive(Debug, Clone, Default)]
pub struct Registries {
    pub capabilities: OperatorCapabilityRegistry,
    pub patterns: PatternRegistry,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_capability(
        &mut self,
        backend: BackendId,
        op: OpKind,
        predicate: LegalityPredicate,
    ) {
        self.capabilities.register(backend, op, predicate);
    }

    pub fn register_supported(&mut self, backend: BackendId, op: OpKind) {
        self.capabilities.register_supported(backend, op);
    }

    pub fn register_patterns(
        &mut self,
        backend: BackendId,
        templates: Vec<PatternTemplate>,
    ) -> Result<(), RegistryError> {
        self.patterns.register_patterns(backend, templates)
    }

    pub fn is_supported(&self, backend: &BackendId, op: OpKind, node: &NodeRef<'_>) -> bool {
        self.capabilities.is_supported(backend, op, node)
    }

    pub fn get_table(&self, backend: &BackendId) -> Result<&[Arc<PatternTemplate>], RegistryError> {
        self.patterns.get_table(backend)
    }

    /// Whether either registry has heard of `backend`.
    pub fn knows_backend(&self, backend: &BackendId) -> bool {
        self.capabilities.has_backend(backend) || self.patterns.has_backend(backend)
    }

    /// Every backend known to either registry, sorted by name.
    pub fn backends(&self) -> Vec<BackendId> {
        let all: BTreeSet<BackendId> = self
            .capabilities
            .backends()
            .into_iter()
            .chain(self.patterns.backends())
            .collect();
        all.into_iter().collect()
    }
}
