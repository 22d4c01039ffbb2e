// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-backend operator capability table.

use crate::backend::BackendId;
use crate::predicate::{self, LegalityPredicate};
use graph_ir::{NodeRef, OpKind};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

/// Maps `(backend, operator)` to a legality predicate.
///
/// At most one predicate exists per pair; registering again replaces the
/// earlier one. A pair that was never registered is simply unsupported.
#[derive(Clone, Default)]
pub struct OperatorCapabilityRegistry {
    entries: HashMap<BackendId, BTreeMap<OpKind, LegalityPredicate>>,
}

impl OperatorCapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares that `backend` can compile `op` when `predicate` accepts
    /// the node. Replaces any previous predicate for the pair.
    pub fn register(&mut self, backend: BackendId, op: OpKind, predicate: LegalityPredicate) {
        let table = self.entries.entry(backend.clone()).or_default();
        if table.insert(op, predicate).is_some() {
            debug!(backend = %backend, op = %op, "Replaced operator capability");
        } else {
            debug!(backend = %backend, op = %op, "Registered operator capability");
        }
    }

    /// Declares `op` unconditionally supported on `backend`.
    pub fn register_supported(&mut self, backend: BackendId, op: OpKind) {
        self.register(backend, op, predicate::always());
    }

    /// Whether `node`, an `op` call, may be offloaded to `backend` as a
    /// single operator.
    ///
    /// Unknown backends and unregistered operators answer `false`.
    pub fn is_supported(&self, backend: &BackendId, op: OpKind, node: &NodeRef<'_>) -> bool {
        self.entries
            .get(backend)
            .and_then(|table| table.get(&op))
            .is_some_and(|pred| pred(node))
    }

    /// [`is_supported`](Self::is_supported) keyed by the node's own
    /// operator. Leaves answer `false`.
    pub fn supports_node(&self, backend: &BackendId, node: &NodeRef<'_>) -> bool {
        node.op()
            .is_some_and(|op| self.is_supported(backend, op, node))
    }

    /// Whether any operator was registered for `backend`.
    pub fn has_backend(&self, backend: &BackendId) -> bool {
        self.entries.contains_key(backend)
    }

    /// Backends with at least one registration, sorted by name.
    pub fn backends(&self) -> Vec<BackendId> {
        let mut backends: Vec<BackendId> = self.entries.keys().cloned().collect();
        backends.sort();
        backends
    }

    /// Operators registered for `backend`, sorted by name.
    pub fn ops_for(&self, backend: &BackendId) -> Vec<OpKind> {
        self.entries
            .get(backend)
            .map(|table| table.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Total number of `(backend, operator)` pairs.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for OperatorCapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for backend in self.backends() {
            let ops: Vec<&str> = self.ops_for(&backend).iter().map(|o| o.as_str()).collect();
            map.entry(&backend.as_str(), &ops);
        }
        map.finish()
    }
}
