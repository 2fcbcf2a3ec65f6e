// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise activations.

use crate::{DType, Tensor, TensorError, TensorView};

/// `output = max(input, 0)`. `output` must already have `input`'s shape.
pub fn relu(input: &TensorView<'_>, output: &mut Tensor) -> Result<(), TensorError> {
    if input.dtype() != DType::F32 {
        return Err(TensorError::UnsupportedDType {
            op: "relu",
            dtype: input.dtype(),
        });
    }
    if output.shape() != input.shape() {
        return Err(TensorError::ShapeMismatch {
            op: "relu",
            lhs: input.shape().clone(),
            rhs: output.shape().clone(),
        });
    }
    let src = input.data::<f32>()?;
    output
        .data_mut::<f32>()?
        .iter_mut()
        .zip(src)
        .for_each(|(o, x)| *o = x.max(0.0));
    Ok(())
}
