// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Legality predicates.
//!
//! A predicate is a plain shared function value. Backends build one, then
//! register it; nothing is hidden behind annotations.
//!
//! Predicates must be pure and deterministic: partitioning the same graph
//! twice has to give the same answer.

use graph_ir::{DType, NodeRef, Shape};
use std::sync::Arc;

/// Decides whether a single node may run on a backend.
pub type LegalityPredicate = Arc<dyn Fn(&NodeRef<'_>) -> bool + Send + Sync>;

/// Decides whether a whole matched subgraph may run on a backend.
///
/// Receives the matched operator nodes in template order.
pub type PatternPredicate = Arc<dyn Fn(&[NodeRef<'_>]) -> bool + Send + Sync>;

/// Wraps a closure as a [`LegalityPredicate`].
pub fn legality<F>(f: F) -> LegalityPredicate
where
    F: Fn(&NodeRef<'_>) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a closure as a [`PatternPredicate`].
pub fn pattern_legality<F>(f: F) -> PatternPredicate
where
    F: Fn(&[NodeRef<'_>]) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A predicate that accepts every node.
pub fn always() -> LegalityPredicate {
    legality(|_| true)
}

/// Accepts nodes whose output type is known and has one of `dtypes`.
pub fn output_dtype_in(dtypes: &[DType]) -> LegalityPredicate {
    let dtypes = dtypes.to_vec();
    legality(move |node| {
        node.output_type()
            .is_some_and(|ty| dtypes.contains(&ty.dtype))
    })
}

/// Accepts nodes whose typed inputs all have rank at most `max_rank`.
///
/// Untyped inputs are accepted.
pub fn max_input_rank(max_rank: usize) -> LegalityPredicate {
    legality(move |node| {
        node.input_types()
            .flatten()
            .all(|ty| ty.shape.rank() <= max_rank)
    })
}

/// Accepts nodes whose typed inputs are pairwise broadcast-compatible.
///
/// Untyped inputs are accepted.
pub fn broadcastable_inputs() -> LegalityPredicate {
    legality(|node| {
        let shapes: Vec<&Shape> = node.input_types().flatten().map(|ty| &ty.shape).collect();
        shapes
            .iter()
            .enumerate()
            .all(|(i, a)| shapes[i + 1..].iter().all(|b| a.is_broadcast_compatible(b)))
    })
}

/// Accepts a node only if every predicate accepts it.
pub fn all_of(predicates: Vec<LegalityPredicate>) -> LegalityPredicate {
    legality(move |node| predicates.iter().all(|p| p(node)))
}
