// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Depthwise 2-D convolution over NCHW tensors.
//!
//! Every channel is convolved with its own `kh × kw` filter, so channels
//! are fully independent. That independence is what lets a hardware kernel
//! process channel groups separately and concatenate the results.

use crate::{DType, Shape, Tensor, TensorError, TensorView};
use half::f16;

/// Stride and zero-padding of a 2-D convolution, as `[h, w]` pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conv2dParams {
    pub strides: [usize; 2],
    pub paddings: [usize; 2],
}

impl Default for Conv2dParams {
    fn default() -> Self {
        Self {
            strides: [1, 1],
            paddings: [0, 0],
        }
    }
}

/// Output shape for `input` `[N, C, H, W]` and `filter` `[C, 1, KH, KW]`.
pub fn depthwise_output_shape(
    input: &Shape,
    filter: &Shape,
    params: &Conv2dParams,
) -> Result<Shape, TensorError> {
    let (i, f) = (input.dims(), filter.dims());
    if i.len() != 4 || f.len() != 4 || f[1] != 1 || f[0] != i[1] {
        return Err(TensorError::ShapeMismatch {
            op: "depthwise_conv2d",
            lhs: input.clone(),
            rhs: filter.clone(),
        });
    }
    if params.strides.contains(&0) {
        return Err(TensorError::InvalidArgument {
            op: "depthwise_conv2d",
            detail: "stride must be positive".into(),
        });
    }
    let padded_h = i[2] + 2 * params.paddings[0];
    let padded_w = i[3] + 2 * params.paddings[1];
    if padded_h < f[2] || padded_w < f[3] {
        return Err(TensorError::InvalidArgument {
            op: "depthwise_conv2d",
            detail: format!("kernel {}x{} larger than padded input", f[2], f[3]),
        });
    }
    let oh = (padded_h - f[2]) / params.strides[0] + 1;
    let ow = (padded_w - f[3]) / params.strides[1] + 1;
    Ok(Shape::new(vec![i[0], i[1], oh, ow]))
}

/// Runs the convolution into a pre-shaped `output`.
///
/// `input` and `output` must share an element type, either `F32` or `F16`.
/// `filter` and `bias` may be either float type; arithmetic is done in
/// `f32` and rounded once on store, so results do not depend on how the
/// channels are grouped.
pub fn depthwise_conv2d(
    input: &TensorView<'_>,
    filter: &TensorView<'_>,
    bias: Option<&TensorView<'_>>,
    params: &Conv2dParams,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let expected = depthwise_output_shape(input.shape(), filter.shape(), params)?;
    if output.shape() != &expected || output.dtype() != input.dtype() {
        return Err(TensorError::ShapeMismatch {
            op: "depthwise_conv2d (output)",
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }
    let channels = expected.dims()[1];
    if let Some(b) = bias {
        if b.shape().num_elements() != channels {
            return Err(TensorError::ShapeMismatch {
                op: "depthwise_conv2d (bias)",
                lhs: Shape::vector(channels),
                rhs: b.shape().clone(),
            });
        }
    }

    let x = to_f32_vec(input)?;
    let w = to_f32_vec(filter)?;
    let b = bias.map(to_f32_vec).transpose()?;
    let mut y = vec![0.0f32; expected.num_elements()];
    dwconv_f32(
        &x,
        &w,
        b.as_deref(),
        input.shape().dims(),
        filter.shape().dims(),
        expected.dims(),
        params,
        &mut y,
    );

    match output.dtype() {
        DType::F32 => output.data_mut::<f32>()?.copy_from_slice(&y),
        DType::F16 => output
            .data_mut::<f16>()?
            .iter_mut()
            .zip(&y)
            .for_each(|(o, v)| *o = f16::from_f32(*v)),
        dtype => {
            return Err(TensorError::UnsupportedDType {
                op: "depthwise_conv2d",
                dtype,
            })
        }
    }
    Ok(())
}

fn to_f32_vec(view: &TensorView<'_>) -> Result<Vec<f32>, TensorError> {
    match view.dtype() {
        DType::F32 => Ok(view.data::<f32>()?.to_vec()),
        DType::F16 => Ok(view.data::<f16>()?.iter().map(|v| v.to_f32()).collect()),
        dtype => Err(TensorError::UnsupportedDType {
            op: "depthwise_conv2d",
            dtype,
        }),
    }
}

#[allow(clippy::too_many_arguments)]
fn dwconv_f32(
    x: &[f32],
    w: &[f32],
    b: Option<&[f32]>,
    in_dims: &[usize],
    f_dims: &[usize],
    out_dims: &[usize],
    params: &Conv2dParams,
    y: &mut [f32],
) {
    let (n, c, h, wd) = (in_dims[0], in_dims[1], in_dims[2], in_dims[3]);
    let (kh, kw) = (f_dims[2], f_dims[3]);
    let (oh, ow) = (out_dims[2], out_dims[3]);
    let [sh, sw] = params.strides;
    let [ph, pw] = params.paddings;

    for ni in 0..n {
        for ci in 0..c {
            let plane = &x[(ni * c + ci) * h * wd..][..h * wd];
            let kernel = &w[ci * kh * kw..][..kh * kw];
            let out = &mut y[(ni * c + ci) * oh * ow..][..oh * ow];
            let bias = b.map_or(0.0, |b| b[ci]);
            for oy in 0..oh {
                for ox in 0..ow {
                    let mut acc = 0.0f32;
                    for ky in 0..kh {
                        let iy = (oy * sh + ky) as isize - ph as isize;
                        if iy < 0 || iy >= h as isize {
                            continue;
                        }
                        for kx in 0..kw {
                            let ix = (ox * sw + kx) as isize - pw as isize;
                            if ix < 0 || ix >= wd as isize {
                                continue;
                            }
                            acc += plane[iy as usize * wd + ix as usize] * kernel[ky * kw + kx];
                        }
                    }
                    out[oy * ow + ox] = acc + bias;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_shape() {
        let s = depthwise_output_shape(
            &Shape::new(vec![1, 8, 5, 5]),
            &Shape::new(vec![8, 1, 3, 3]),
            &Conv2dParams {
                strides: [2, 2],
                paddings: [1, 1],
            },
        )
        .unwrap();
        assert_eq!(s, Shape::new(vec![1, 8, 3, 3]));
    }

    #[test]
    fn test_filter_channel_mismatch() {
        let r = depthwise_output_shape(
            &Shape::new(vec![1, 8, 5, 5]),
            &Shape::new(vec![4, 1, 3, 3]),
            &Conv2dParams::default(),
        );
        assert!(matches!(r, Err(TensorError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_identity_kernel_with_bias() {
        // 1x1 kernel of weight 2 plus per-channel bias.
        let x = Tensor::from_f32(Shape::new(vec![1, 2, 1, 2]), &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let f = Tensor::from_f32(Shape::new(vec![2, 1, 1, 1]), &[2.0, 2.0]).unwrap();
        let b = Tensor::from_f32(Shape::vector(2), &[0.5, -0.5]).unwrap();
        let mut y = Tensor::zeros(Shape::new(vec![1, 2, 1, 2]), DType::F32);
        depthwise_conv2d(&x.view(), &f.view(), Some(&b.view()), &Conv2dParams::default(), &mut y)
            .unwrap();
        assert_eq!(y.as_f32_slice(), &[2.5, 4.5, 5.5, 7.5]);
    }

    #[test]
    fn test_padding_sums_neighbourhood() {
        // 3x3 ones kernel with padding 1 over a 2x2 plane of ones: each output
        // sees all four inputs.
        let x = Tensor::from_f32(Shape::new(vec![1, 1, 2, 2]), &[1.0; 4]).unwrap();
        let f = Tensor::from_f32(Shape::new(vec![1, 1, 3, 3]), &[1.0; 9]).unwrap();
        let params = Conv2dParams {
            strides: [1, 1],
            paddings: [1, 1],
        };
        let mut y = Tensor::zeros(Shape::new(vec![1, 1, 2, 2]), DType::F32);
        depthwise_conv2d(&x.view(), &f.view(), None, &params, &mut y).unwrap();
        assert_eq!(y.as_f32_slice(), &[4.0; 4]);
    }

    #[test]
    fn test_f16_output() {
        let xs: Vec<f16> = [1.0f32, 2.0].iter().map(|v| f16::from_f32(*v)).collect();
        let x = Tensor::from_slice(Shape::new(vec![1, 2, 1, 1]), &xs).unwrap();
        let f = Tensor::from_f32(Shape::new(vec![2, 1, 1, 1]), &[0.5, 3.0]).unwrap();
        let mut y = Tensor::zeros(Shape::new(vec![1, 2, 1, 1]), DType::F16);
        depthwise_conv2d(&x.view(), &f.view(), None, &Conv2dParams::default(), &mut y).unwrap();
        let out: Vec<f32> = y.data::<f16>().unwrap().iter().map(|v| v.to_f32()).collect();
        assert_eq!(out, vec![0.5, 6.0]);
    }
}
