// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! FT kernel symbols and per-partition kernel plans.
//!
//! Each FT partition becomes one external function (`ft_0`, `ft_1`, ...)
//! whose body is a sequence of calls into the FT kernel library, one per
//! member node, in topological order. This module only lists those calls;
//! it emits no code.

use crate::{backend_id, FtError};
use graph_ir::{op, ComputeGraph, NodeId, OpKind, Validated};
use partitioner::{PartitionAssignment, PartitionId};

/// Operator → FT kernel library symbol.
const KERNEL_SYMBOLS: &[(OpKind, &str)] = &[
    (op::ADD, "ft_binary_op_add"),
    (op::SUBTRACT, "ft_binary_op_subtract"),
    (op::MULTIPLY, "ft_binary_op_multiply"),
    (op::ABS, "ft_unary_op_abs"),
    (op::RELU, "ft_unary_op_relu"),
    (op::SIGMOID, "ft_unary_op_sigmoid"),
    (op::TANH, "ft_unary_op_tanh"),
    (op::CONV2D, "ft_conv2d"),
];

/// The FT kernel implementing `op`, if the library has one.
///
/// The library has more kernels than the backend registers as supported;
/// `sigmoid`, `tanh` and `nn.conv2d` exist but are not offloaded.
pub fn kernel_symbol(op: OpKind) -> Option<&'static str> {
    KERNEL_SYMBOLS
        .iter()
        .find(|(kind, _)| *kind == op)
        .map(|&(_, symbol)| symbol)
}

/// One kernel invocation inside an FT external function.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct KernelCall {
    pub node: NodeId,
    pub op: OpKind,
    pub kernel: &'static str,
    /// Operands, in call order.
    pub operands: Vec<NodeId>,
    /// Element count of the output buffer, when the node is typed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_elements: Option<usize>,
    /// Size of the output buffer in bytes, when the node is typed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_bytes: Option<usize>,
}

/// The kernel calls of one FT partition.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PartitionKernels {
    pub partition: PartitionId,
    /// External function name, e.g. `ft_0`.
    pub symbol: String,
    pub calls: Vec<KernelCall>,
}

/// Lists, for every FT partition of `assignment`, the kernels its nodes
/// map to.
///
/// # Errors
/// [`FtError::UnmappedOperator`] if a member has no FT kernel,
/// [`FtError::MissingNode`] if the assignment does not fit `graph`.
pub fn kernel_plan(
    assignment: &PartitionAssignment,
    graph: &ComputeGraph<Validated>,
) -> Result<Vec<PartitionKernels>, FtError> {
    let ft = backend_id();
    assignment
        .partitions_for(&ft)
        .map(|partition| {
            let calls = partition
                .nodes
                .iter()
                .map(|&id| {
                    let node = graph.node(id).ok_or(FtError::MissingNode(id))?;
                    let unmapped = || FtError::UnmappedOperator {
                        node: id,
                        op: node.kind.as_str().to_string(),
                    };
                    let op = node.op().ok_or_else(unmapped)?;
                    let kernel = kernel_symbol(op).ok_or_else(|| FtError::UnmappedOperator {
                        node: id,
                        op: op.to_string(),
                    })?;
                    Ok(KernelCall {
                        node: id,
                        op,
                        kernel,
                        operands: node.inputs.clone(),
                        output_elements: node.ty.as_ref().map(|t| t.shape.num_elements()),
                        output_bytes: node.ty.as_ref().map(|t| t.size_bytes()),
                    })
                })
                .collect::<Result<Vec<_>, FtError>>()?;

            Ok(PartitionKernels {
                partition: partition.id,
                symbol: partition
                    .symbol
                    .clone()
                    .unwrap_or_else(|| format!("ft_{}", partition.id.0)),
                calls,
            })
        })
        .collect()
}
