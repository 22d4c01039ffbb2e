// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Interned operator kinds.
//!
//! An [`OpKind`] names a primitive operation (`"add"`, `"nn.relu"`). Kinds
//! are interned into a process-wide table so that a kind is a `Copy` handle
//! and so that lookups of names nobody ever declared fail early instead of
//! silently never matching a capability.
//!
//! The table is seeded with the built-in catalog below. Frontends that emit
//! custom operators must declare them with [`OpKind::intern`] first.

use std::collections::HashSet;
use std::fmt;
use std::sync::{OnceLock, PoisonError, RwLock};

/// Identifier of a primitive operation.
///
/// Equality, ordering and hashing are by name, so a kind created through
/// the built-in constants compares equal to the same name interned later.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpKind(&'static str);

pub const ADD: OpKind = OpKind("add");
pub const SUBTRACT: OpKind = OpKind("subtract");
pub const MULTIPLY: OpKind = OpKind("multiply");
pub const DIVIDE: OpKind = OpKind("divide");
pub const ABS: OpKind = OpKind("abs");
pub const NEGATIVE: OpKind = OpKind("negative");
pub const EXP: OpKind = OpKind("exp");
pub const SIGMOID: OpKind = OpKind("sigmoid");
pub const TANH: OpKind = OpKind("tanh");
pub const RELU: OpKind = OpKind("nn.relu");
pub const CONV2D: OpKind = OpKind("nn.conv2d");
pub const DENSE: OpKind = OpKind("nn.dense");
pub const BIAS_ADD: OpKind = OpKind("nn.bias_add");
pub const BATCH_NORM: OpKind = OpKind("nn.batch_norm");
pub const SOFTMAX: OpKind = OpKind("nn.softmax");
pub const RESHAPE: OpKind = OpKind("reshape");
pub const TRANSPOSE: OpKind = OpKind("transpose");
pub const CONCATENATE: OpKind = OpKind("concatenate");

/// Built-in operator catalog known without explicit interning.
pub const BUILTIN_OPS: &[OpKind] = &[
    ADD,
    SUBTRACT,
    MULTIPLY,
    DIVIDE,
    ABS,
    NEGATIVE,
    EXP,
    SIGMOID,
    TANH,
    RELU,
    CONV2D,
    DENSE,
    BIAS_ADD,
    BATCH_NORM,
    SOFTMAX,
    RESHAPE,
    TRANSPOSE,
    CONCATENATE,
];

static INTERNED: OnceLock<RwLock<HashSet<&'static str>>> = OnceLock::new();

fn interned() -> &'static RwLock<HashSet<&'static str>> {
    INTERNED.get_or_init(|| RwLock::new(BUILTIN_OPS.iter().map(|k| k.0).collect()))
}

impl OpKind {
    /// Interns `name`, declaring it as a known operator kind.
    ///
    /// Interning the same name twice returns equal kinds; each distinct
    /// name is allocated once for the lifetime of the process.
    pub fn intern(name: &str) -> Self {
        if let Some(kind) = Self::lookup(name) {
            return kind;
        }
        let mut table = interned().write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = table.get(name) {
            return OpKind(*existing);
        }
        let leaked: &'static str = Box::leak(name.to_owned().into_boxed_str());
        table.insert(leaked);
        tracing::debug!("interned operator kind '{leaked}'");
        OpKind(leaked)
    }

    /// Looks up a previously declared operator kind.
    ///
    /// Returns `None` for names that are neither built in nor interned.
    pub fn lookup(name: &str) -> Option<Self> {
        let table = interned().read().unwrap_or_else(PoisonError::into_inner);
        table.get(name).map(|s| OpKind(*s))
    }

    /// Returns the operator name.
    pub fn as_str(self) -> &'static str {
        self.0
    }

    /// Returns `true` if this kind belongs to the built-in catalog.
    pub fn is_builtin(self) -> bool {
        BUILTIN_OPS.contains(&self)
    }
}

impl fmt::Debug for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpKind({})", self.0)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl serde::Serialize for OpKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(OpKind::lookup("add"), Some(ADD));
        assert_eq!(OpKind::lookup("nn.relu"), Some(RELU));
        assert!(RELU.is_builtin());
    }

    #[test]
    fn test_unknown_lookup_fails() {
        assert_eq!(OpKind::lookup("test.op.never_declared"), None);
    }

    #[test]
    fn test_intern_is_idempotent() {
        let a = OpKind::intern("test.op.custom_gelu");
        let b = OpKind::intern("test.op.custom_gelu");
        assert_eq!(a, b);
        assert_eq!(OpKind::lookup("test.op.custom_gelu"), Some(a));
        assert!(!a.is_builtin());
    }

    #[test]
    fn test_intern_builtin_returns_constant() {
        assert_eq!(OpKind::intern("multiply"), MULTIPLY);
    }

    #[test]
    fn test_display_and_serialize() {
        assert_eq!(format!("{CONV2D}"), "nn.conv2d");
        assert_eq!(serde_json::to_string(&ABS).unwrap(), "\"abs\"");
    }
}
