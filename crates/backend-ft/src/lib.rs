// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # backend-ft
//!
//! Integration module for the FT accelerator.
//!
//! FT runs five elementwise operators natively, with no restriction on
//! shape or dtype, and has no fused patterns yet:
//!
//! | Operator | Kernel |
//! |---|---|
//! | `subtract` | `ft_binary_op_subtract` |
//! | `add` | `ft_binary_op_add` |
//! | `multiply` | `ft_binary_op_multiply` |
//! | `abs` | `ft_unary_op_abs` |
//! | `nn.relu` | `ft_unary_op_relu` |
//!
//! Call [`register`] once during start-up (or [`register_into`] for an
//! explicit [`Registries`] value) before partitioning with `"ft"` in the
//! priority list.

mod error;
mod kernels;

pub use error::FtError;
pub use kernels::{kernel_plan, kernel_symbol, KernelCall, PartitionKernels};

use backend_registry::{BackendId, PatternTemplate, RegistryError, Registries};
use graph_ir::{op, OpKind};
use tracing::info;

/// Registry name of the FT backend.
pub const BACKEND_NAME: &str = "ft";

/// Operators FT offloads, in registration order.
pub const SUPPORTED_OPS: &[OpKind] = &[op::SUBTRACT, op::ADD, op::MULTIPLY, op::ABS, op::RELU];

pub fn backend_id() -> BackendId {
    BackendId::new(BACKEND_NAME)
}

/// FT's fusion patterns, most preferred first. Currently none.
pub fn pattern_table() -> Vec<PatternTemplate> {
    Vec::new()
}

/// Registers FT's capabilities and pattern table into `registries`.
pub fn register_into(registries: &mut Registries) -> Result<(), RegistryError> {
    let ft = backend_id();
    for &kind in SUPPORTED_OPS {
        registries.register_supported(ft.clone(), kind);
    }
    registries.register_patterns(ft, pattern_table())?;
    Ok(())
}

/// Registers FT into the process-wide registries.
pub fn register() -> Result<(), RegistryError> {
    backend_registry::global::with_global_mut(register_into)?;
    info!(ops = SUPPORTED_OPS.len(), "Registered FT backend");
    Ok(())
}
