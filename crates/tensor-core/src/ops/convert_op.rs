// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Precision casts and layout transposes used when a kernel needs its
//! input in a different form than the producer left it in.

use crate::{DType, DataLayout, Shape, Tensor, TensorError, TensorView};
use half::f16;

/// Casts between floating-point element types.
///
/// Same-type casts copy. Integer types are rejected: silently rounding
/// indices or quantised weights would corrupt them.
pub fn cast(input: &TensorView<'_>, to: DType) -> Result<Tensor, TensorError> {
    let from = input.dtype();
    if from == to {
        return Ok(input.to_tensor());
    }
    let mut out = Tensor::zeros(input.shape().clone(), to);
    out.set_layout(input.layout());
    match (from, to) {
        (DType::F32, DType::F16) => {
            let src = input.data::<f32>()?;
            out.data_mut::<f16>()?
                .iter_mut()
                .zip(src)
                .for_each(|(d, s)| *d = f16::from_f32(*s));
        }
        (DType::F16, DType::F32) => {
            let src = input.data::<f16>()?;
            out.data_mut::<f32>()?
                .iter_mut()
                .zip(src)
                .for_each(|(d, s)| *d = s.to_f32());
        }
        _ => {
            return Err(TensorError::UnsupportedDType {
                op: "cast",
                dtype: if from.is_float() { to } else { from },
            })
        }
    }
    Ok(out)
}

/// Reorders a 4-D tensor between channel-major and channel-minor layouts.
///
/// The logical shape is kept in NCHW order for `Nchw` tensors and in NHWC
/// order for `Nhwc` tensors, so the output shape is permuted as well.
pub fn transpose_layout(input: &TensorView<'_>, to: DataLayout) -> Result<Tensor, TensorError> {
    let from = input.layout();
    if from == to || to == DataLayout::Any || from == DataLayout::Any {
        return Ok(input.to_tensor());
    }
    let d = input.shape().dims();
    if d.len() != 4 {
        return Err(TensorError::InvalidArgument {
            op: "transpose_layout",
            detail: format!("layout change needs a 4-D tensor, got {}", input.shape()),
        });
    }
    let esize = input.dtype().size_bytes();
    let src = input.as_bytes();

    // Interpret dims in the source layout.
    let (n, c, h, w) = match from {
        DataLayout::Nchw => (d[0], d[1], d[2], d[3]),
        _ => (d[0], d[3], d[1], d[2]),
    };
    let out_shape = match to {
        DataLayout::Nchw => Shape::new(vec![n, c, h, w]),
        _ => Shape::new(vec![n, h, w, c]),
    };
    let mut out = Tensor::zeros(out_shape, input.dtype());
    out.set_layout(to);
    let dst = out.as_bytes_mut();

    for ni in 0..n {
        for ci in 0..c {
            for hi in 0..h {
                for wi in 0..w {
                    let nchw = ((ni * c + ci) * h + hi) * w + wi;
                    let nhwc = ((ni * h + hi) * w + wi) * c + ci;
                    let (s, t) = match from {
                        DataLayout::Nchw => (nchw, nhwc),
                        _ => (nhwc, nchw),
                    };
                    dst[t * esize..(t + 1) * esize].copy_from_slice(&src[s * esize..(s + 1) * esize]);
                }
            }
        }
    }
    Ok(out)
}
