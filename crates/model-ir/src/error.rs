// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for program construction and scope access.

/// Errors that can occur when working with programs and scopes.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// An operator references something the program cannot provide.
    #[error("invalid program at operator {index} ({op_type}): {detail}")]
    InvalidProgram {
        index: usize,
        op_type: String,
        detail: String,
    },

    /// Two variable declarations share a name.
    #[error("variable '{0}' is declared more than once")]
    DuplicateVariable(String),

    /// A lookup through the scope chain found nothing.
    #[error("variable '{0}' not found in scope")]
    VariableNotFound(String),

    /// A variable holds a different kind of value than the caller expected.
    #[error("variable '{name}' holds a {actual}, expected a {expected}")]
    VariableKind {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
}
