// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the executor and predictor.

use kernels::KernelError;
use model_io::ModelIoError;

/// Errors that can occur while loading, preparing or running a model.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Reading the model failed.
    #[error("model loading failed: {0}")]
    Load(#[from] ModelIoError),

    /// No kernel could be placed or created for an operator.
    #[error("cannot prepare operator {index} ({op_type}): {source}")]
    Prepare {
        index: usize,
        op_type: String,
        #[source]
        source: KernelError,
    },

    /// An operator failed during a run. Earlier outputs stay in the scope.
    #[error("operator {index} ({op_type}) failed: {source}")]
    OperatorFailed {
        index: usize,
        op_type: String,
        #[source]
        source: KernelError,
    },

    /// Kernel registration failed.
    #[error("kernel registry: {0}")]
    Registry(#[source] KernelError),

    /// Writing the model failed.
    #[error("model saving failed: {0}")]
    Save(#[source] ModelIoError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Program or scope access failed.
    #[error(transparent)]
    Model(#[from] model_ir::ModelError),

    /// A feed or fetch column that does not exist.
    #[error("no {kind} at index {index} ({available} available)")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        available: usize,
    },
}
