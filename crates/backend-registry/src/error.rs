// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for backend registration.

/// Errors raised by the capability and pattern registries.
///
/// "Operator not supported" and "pattern did not match" are not errors;
/// they are ordinary negative answers.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A backend was looked up that never registered anything.
    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    /// A pattern template is structurally invalid.
    #[error("malformed pattern template '{pattern}': {detail}")]
    MalformedTemplate { pattern: String, detail: String },
}
