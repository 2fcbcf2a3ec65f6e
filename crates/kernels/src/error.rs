// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for kernel selection and execution.

use tensor_core::{Place, Target};

/// Errors that can occur while selecting, creating or running a kernel.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// No registered kernel for the operator can serve the requested place.
    #[error("no kernel for '{op_type}' is compatible with place {place}")]
    NoCompatibleKernel { op_type: String, place: Place },

    /// A kernel is already registered for this exact operator and place.
    #[error("kernel for '{op_type}' at {place} is already registered")]
    DuplicateRegistration { op_type: String, place: Place },

    /// Input shapes do not fit together.
    #[error("shape mismatch in {op}: {detail}")]
    ShapeMismatch { op: String, detail: String },

    /// A required input slot is unbound or empty.
    #[error("{op}: missing input '{slot}'")]
    MissingInput { op: String, slot: String },

    /// A required output slot is unbound.
    #[error("{op}: missing output '{slot}'")]
    MissingOutput { op: String, slot: String },

    /// A required attribute is absent.
    #[error("{op}: missing attribute '{name}'")]
    MissingAttribute { op: String, name: String },

    /// An attribute is present but unusable.
    #[error("{op}: invalid attribute '{name}': {detail}")]
    InvalidAttribute {
        op: String,
        name: String,
        detail: String,
    },

    /// A device kernel was handed an input that was never transferred.
    #[error("{op}: input '{slot}' is not resident on {target}")]
    NotOnDevice {
        op: String,
        slot: String,
        target: Target,
    },

    /// `dispatch` ran without a matching `init`.
    #[error("{op}: kernel was not initialised for the current input")]
    NotInitialised { op: String },

    /// A numeric operation failed.
    #[error(transparent)]
    Tensor(#[from] tensor_core::TensorError),

    /// A variable had the wrong kind.
    #[error(transparent)]
    Model(#[from] model_ir::ModelError),
}
