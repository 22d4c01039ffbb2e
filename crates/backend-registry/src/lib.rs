// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # backend-registry
//!
//! Where hardware backends declare what they can run.
//!
//! - [`OperatorCapabilityRegistry`] — `(backend, operator)` → legality
//!   predicate. Last registration wins.
//! - [`PatternTemplate`] — a validated fusion pattern (operator nodes,
//!   wildcards, a root, an optional whole-match predicate).
//! - [`PatternRegistry`] — per-backend ordered pattern tables.
//! - [`Registries`] — both, as one cheaply clonable value.
//! - [`global`] — process-wide registries with explicit reset.
//!
//! Registration is a two-step affair: build the predicate as a plain
//! value, then register it.
//!
//! # Example
//! ```
//! use backend_registry::{predicate, BackendId, Registries};
//! use graph_ir::op;
//!
//! let mut registries = Registries::new();
//! let ft = BackendId::new("ft");
//! registries.register_capability(ft.clone(), op::ADD, predicate::always());
//! registries.register_patterns(ft.clone(), vec![]).unwrap();
//! assert!(registries.knows_backend(&ft));
//! ```

mod backend;
mod capability;
mod error;
pub mod global;
mod pattern;
mod pattern_table;
pub mod predicate;
mod registries;

pub use backend::BackendId;
pub use capability::OperatorCapabilityRegistry;
pub use error::RegistryError;
pub use global::{register_capability, register_patterns, register_supported};
pub use pattern::{PatternTemplate, PatternTemplateBuilder, TemplateNode, TemplateNodeId};
pub use pattern_table::PatternRegistry;
pub use predicate::{LegalityPredicate, PatternPredicate};
pub use registries::Registries;
