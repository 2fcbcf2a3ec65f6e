// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor operations.

use crate::{DType, Shape};

/// Errors that can occur during tensor operations.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer size does not match the expected size for the given shape and dtype.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Two tensors have incompatible shapes for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// A nested-length descriptor disagrees with the tensor it annotates.
    #[error("invalid lod: {0}")]
    InvalidLod(String),

    /// The requested data type is not supported for this operation.
    #[error("unsupported dtype {dtype} for operation {op}")]
    UnsupportedDType { op: &'static str, dtype: DType },

    /// Typed access asked for a different element type than the tensor holds.
    #[error("dtype mismatch: tensor holds {actual}, requested {expected}")]
    DTypeMismatch { expected: DType, actual: DType },

    /// An axis argument is out of range for the tensor rank.
    #[error("axis {axis} out of range for rank-{rank} tensor in {op}")]
    InvalidAxis {
        op: &'static str,
        axis: usize,
        rank: usize,
    },

    /// An operation received a malformed argument (sections, strides, ...).
    #[error("invalid argument for {op}: {detail}")]
    InvalidArgument { op: &'static str, detail: String },

    /// A place or place-axis string could not be parsed.
    #[error("cannot parse place '{0}'; expected target/precision[/layout]")]
    ParsePlace(String),
}
