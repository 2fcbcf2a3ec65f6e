// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fully-connected (linear) layer: `out = flatten(input) @ weight + bias`.

use super::matmul_op::{matmul_f32, MatmulAlgo};
use crate::{DType, Shape, Tensor, TensorError, TensorView};

/// Computes the output shape of a fully-connected layer.
///
/// The input is flattened at `in_num_col_dims`: the leading dims are kept
/// and the trailing ones are contracted against `weight`'s `K` rows.
pub fn fc_output_shape(
    input: &Shape,
    weight: &Shape,
    in_num_col_dims: usize,
) -> Result<Shape, TensorError> {
    if weight.rank() != 2 || in_num_col_dims == 0 || in_num_col_dims >= input.rank().max(1) {
        return Err(TensorError::InvalidArgument {
            op: "fc",
            detail: format!(
                "in_num_col_dims={in_num_col_dims} invalid for input {input} and weight {weight}"
            ),
        });
    }
    let (_, k) = input.flatten_to_2d(in_num_col_dims);
    if k != weight.dims()[0] {
        return Err(TensorError::ShapeMismatch {
            op: "fc",
            lhs: input.clone(),
            rhs: weight.clone(),
        });
    }
    let mut dims = input.dims()[..in_num_col_dims].to_vec();
    dims.push(weight.dims()[1]);
    Ok(Shape::new(dims))
}

/// Runs the layer into a pre-shaped `output`.
///
/// # Errors
/// - [`TensorError::UnsupportedDType`] unless everything is `F32`.
/// - [`TensorError::ShapeMismatch`] if `output` or `bias` have the wrong shape.
pub fn fc(
    input: &TensorView<'_>,
    weight: &TensorView<'_>,
    bias: Option<&TensorView<'_>>,
    in_num_col_dims: usize,
    output: &mut Tensor,
    algo: MatmulAlgo,
) -> Result<(), TensorError> {
    for dtype in [input.dtype(), weight.dtype(), output.dtype()] {
        if dtype != DType::F32 {
            return Err(TensorError::UnsupportedDType { op: "fc", dtype });
        }
    }

    let expected = fc_output_shape(input.shape(), weight.shape(), in_num_col_dims)?;
    if output.shape() != &expected {
        return Err(TensorError::ShapeMismatch {
            op: "fc (output)",
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }

    let (m, k) = input.shape().flatten_to_2d(in_num_col_dims);
    let n = weight.shape().dims()[1];

    let bias = match bias {
        Some(b) => {
            if b.shape().num_elements() != n {
                return Err(TensorError::ShapeMismatch {
                    op: "fc (bias)",
                    lhs: Shape::vector(n),
                    rhs: b.shape().clone(),
                });
            }
            Some(b.data::<f32>()?)
        }
        None => None,
    };

    let x = input.data::<f32>()?;
    let w = weight.data::<f32>()?;
    let out = output.data_mut::<f32>()?;
    matmul_f32(x, w, out, m, k, n, algo);

    if let Some(b) = bias {
        for row in out.chunks_exact_mut(n) {
            row.iter_mut().zip(b).for_each(|(o, bv)| *o += bv);
        }
    }
    Ok(())
}
