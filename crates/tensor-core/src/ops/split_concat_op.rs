// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Splitting a tensor along an axis and concatenating tensors back.
//!
//! Both operations are element-type agnostic: they move whole elements as
//! bytes. Along any axis a tensor is `outer × axis × inner` elements, and
//! each section is a run of `section × inner` elements repeated `outer`
//! times.

use crate::{Shape, Tensor, TensorError, TensorView};

fn check_axis(op: &'static str, shape: &Shape, axis: usize) -> Result<(), TensorError> {
    if axis >= shape.rank() {
        return Err(TensorError::InvalidAxis {
            op,
            axis,
            rank: shape.rank(),
        });
    }
    Ok(())
}

fn check_sections(shape: &Shape, axis: usize, sections: &[usize]) -> Result<(), TensorError> {
    check_axis("split", shape, axis)?;
    let total: usize = sections.iter().sum();
    if sections.is_empty() || total != shape.dims()[axis] {
        return Err(TensorError::InvalidArgument {
            op: "split",
            detail: format!(
                "sections {sections:?} do not cover axis {axis} of {shape}"
            ),
        });
    }
    Ok(())
}

/// Returns zero-copy views for each section when the sections are
/// contiguous in memory, i.e. when every dimension before `axis` is 1.
///
/// Returns `Ok(None)` when the layout requires copying; use [`split`].
pub fn split_views<'a>(
    input: &TensorView<'a>,
    axis: usize,
    sections: &[usize],
) -> Result<Option<Vec<TensorView<'a>>>, TensorError> {
    let shape = input.shape();
    check_sections(shape, axis, sections)?;
    if shape.outer_count(axis) != 1 {
        return Ok(None);
    }
    let row_bytes = shape.inner_count(axis) * input.dtype().size_bytes();
    let bytes = input.as_bytes();
    let mut offset = 0;
    let mut views = Vec::with_capacity(sections.len());
    for &sec in sections {
        let len = sec * row_bytes;
        let view = TensorView::from_parts(
            shape.with_dim(axis, sec),
            input.dtype(),
            &bytes[offset..offset + len],
        )?
        .with_layout(input.layout());
        views.push(view);
        offset += len;
    }
    Ok(Some(views))
}

/// Splits `input` into owned tensors, one per entry of `sections`.
pub fn split(
    input: &TensorView<'_>,
    axis: usize,
    sections: &[usize],
) -> Result<Vec<Tensor>, TensorError> {
    let shape = input.shape();
    check_sections(shape, axis, sections)?;

    let outer = shape.outer_count(axis);
    let row_bytes = shape.inner_count(axis) * input.dtype().size_bytes();
    let axis_bytes = shape.dims()[axis] * row_bytes;
    let src = input.as_bytes();

    let mut outputs = Vec::with_capacity(sections.len());
    let mut start = 0;
    for &sec in sections {
        let mut t = Tensor::zeros(shape.with_dim(axis, sec), input.dtype());
        t.set_layout(input.layout());
        let chunk = sec * row_bytes;
        let dst = t.as_bytes_mut();
        for o in 0..outer {
            let from = o * axis_bytes + start * row_bytes;
            dst[o * chunk..(o + 1) * chunk].copy_from_slice(&src[from..from + chunk]);
        }
        outputs.push(t);
        start += sec;
    }
    Ok(outputs)
}

/// Shape of concatenating `inputs` along `axis`.
pub fn concat_output_shape(inputs: &[TensorView<'_>], axis: usize) -> Result<Shape, TensorError> {
    let first = inputs.first().ok_or_else(|| TensorError::InvalidArgument {
        op: "concat",
        detail: "no inputs".into(),
    })?;
    check_axis("concat", first.shape(), axis)?;
    let mut total = 0;
    for v in inputs {
        let same_rest = v.shape().rank() == first.shape().rank()
            && v
                .shape()
                .dims()
                .iter()
                .zip(first.shape().dims())
                .enumerate()
                .all(|(i, (a, b))| i == axis || a == b);
        if !same_rest || v.dtype() != first.dtype() {
            return Err(TensorError::ShapeMismatch {
                op: "concat",
                lhs: first.shape().clone(),
                rhs: v.shape().clone(),
            });
        }
        total += v.shape().dims()[axis];
    }
    Ok(first.shape().with_dim(axis, total))
}

/// Concatenates `inputs` along `axis` into a pre-shaped `output`.
pub fn concat(
    inputs: &[TensorView<'_>],
    axis: usize,
    output: &mut Tensor,
) -> Result<(), TensorError> {
    let expected = concat_output_shape(inputs, axis)?;
    if output.shape() != &expected || output.dtype() != inputs[0].dtype() {
        return Err(TensorError::ShapeMismatch {
            op: "concat (output)",
            lhs: expected,
            rhs: output.shape().clone(),
        });
    }

    let outer = expected.outer_count(axis);
    let row_bytes = expected.inner_count(axis) * output.dtype().size_bytes();
    let out_axis_bytes = expected.dims()[axis] * row_bytes;
    let dst = output.as_bytes_mut();

    let mut start = 0;
    for v in inputs {
        let sec = v.shape().dims()[axis];
        let chunk = sec * row_bytes;
        let src = v.as_bytes();
        for o in 0..outer {
            let to = o * out_axis_bytes + start * row_bytes;
            dst[to..to + chunk].copy_from_slice(&src[o * chunk..(o + 1) * chunk]);
        }
        start += sec;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DType;

    fn arange(shape: Shape) -> Tensor {
        let n = shape.num_elements();
        let vals: Vec<f32> = (0..n).map(|i| i as f32).collect();
        Tensor::from_f32(shape, &vals).unwrap()
    }

    #[test]
    fn test_split_middle_axis_copies() {
        let t = arange(Shape::new(vec![2, 3, 2]));
        let parts = split(&t.view(), 1, &[1, 2]).unwrap();
        assert_eq!(parts[0].shape(), &Shape::new(vec![2, 1, 2]));
        assert_eq!(parts[0].as_f32_slice(), &[0.0, 1.0, 6.0, 7.0]);
        assert_eq!(
            parts[1].as_f32_slice(),
            &[2.0, 3.0, 4.0, 5.0, 8.0, 9.0, 10.0, 11.0]
        );
    }

    #[test]
    fn test_split_views_only_when_contiguous() {
        let t = arange(Shape::new(vec![1, 4, 2]));
        let view = t.view();
        let views = split_views(&view, 1, &[3, 1]).unwrap().unwrap();
        assert_eq!(views[1].as_f32_slice(), &[6.0, 7.0]);

        let t2 = arange(Shape::new(vec![2, 4, 2]));
        assert!(split_views(&t2.view(), 1, &[3, 1]).unwrap().is_none());
    }

    #[test]
    fn test_split_rejects_bad_sections() {
        let t = arange(Shape::matrix(2, 4));
        assert!(split(&t.view(), 1, &[3, 2]).is_err());
        assert!(split(&t.view(), 2, &[4]).is_err());
    }

    #[test]
    fn test_concat_inverts_split() {
        let t = arange(Shape::new(vec![2, 5, 3]));
        let parts = split(&t.view(), 1, &[2, 2, 1]).unwrap();
        let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
        let shape = concat_output_shape(&views, 1).unwrap();
        let mut out = Tensor::zeros(shape, DType::F32);
        concat(&views, 1, &mut out).unwrap();
        assert_eq!(out, t);
    }

    #[test]
    fn test_concat_rejects_mismatched_rest() {
        let a = arange(Shape::matrix(2, 3));
        let b = arange(Shape::matrix(3, 3));
        assert!(concat_output_shape(&[a.view(), b.view()], 1).is_err());
        assert!(concat_output_shape(&[a.view(), b.view()], 0).is_ok());
    }
}
