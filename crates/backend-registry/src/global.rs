// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Process-wide registries.
//!
//! Backend integration modules register here during initialization; the
//! partitioner reads a [`snapshot`]. Writes serialize on an `RwLock`.
//! Tests that need isolation should build their own [`Registries`] value
//! instead, or call [`reset_global`] between cases.

use crate::backend::BackendId;
use crate::pattern::PatternTemplate;
use crate::predicate::LegalityPredicate;
use crate::registries::Registries;
use crate::RegistryError;
use graph_ir::OpKind;
use std::sync::{OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

static GLOBAL_REGISTRIES: OnceLock<RwLock<Registries>> = OnceLock::new();

fn global() -> &'static RwLock<Registries> {
    GLOBAL_REGISTRIES.get_or_init(|| RwLock::new(Registries::new()))
}

// A poisoned lock still holds a consistent table.
fn read() -> RwLockReadGuard<'static, Registries> {
    global().read().unwrap_or_else(PoisonError::into_inner)
}

fn write() -> RwLockWriteGuard<'static, Registries> {
    global().write().unwrap_or_else(PoisonError::into_inner)
}

/// Registers `op` on `backend` in the global registries.
pub fn register_capability(backend: BackendId, op: OpKind, predicate: LegalityPredicate) {
    write().register_capability(backend, op, predicate);
}

/// Registers `op` as unconditionally supported on `backend` globally.
pub fn register_supported(backend: BackendId, op: OpKind) {
    write().register_supported(backend, op);
}

/// Registers the pattern table of `backend` globally.
pub fn register_patterns(
    backend: BackendId,
    templates: Vec<PatternTemplate>,
) -> Result<(), RegistryError> {
    write().register_patterns(backend, templates)
}

/// A copy of the current global registries.
pub fn snapshot() -> Registries {
    read().clone()
}

/// Runs `f` against the global registries under the read lock.
pub fn with_global<R>(f: impl FnOnce(&Registries) -> R) -> R {
    f(&read())
}

/// Runs `f` against the global registries under the write lock.
///
/// Lets a backend that fills an explicit [`Registries`] reuse the same
/// code for the global one.
pub fn with_global_mut<R>(f: impl FnOnce(&mut Registries) -> R) -> R {
    f(&mut write())
}

/// Clears every global registration.
pub fn reset_global() {
    *write() = Registries::new();
}
