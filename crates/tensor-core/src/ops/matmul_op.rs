// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Matrix multiplication operation.

use crate::{DType, Shape, Tensor, TensorError, TensorView};

/// Inner-loop strategy for f32 matrix multiplication.
///
/// Both strategies accumulate in the same order per output element, so
/// they produce bit-identical results; they differ only in how the inner
/// row update is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatmulAlgo {
    /// Plain ikj loop.
    #[default]
    Generic,
    /// ikj loop with the row update unrolled four lanes wide, matching the
    /// register width of 128-bit mobile SIMD units.
    Unrolled4,
}

/// Performs matrix multiplication: `output = lhs @ rhs`.
///
/// Both inputs must be 2-D tensors with compatible inner dimensions:
/// `lhs` is `[M, K]`, `rhs` is `[K, N]`, and `output` must be `[M, N]`.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if dimensions are incompatible.
/// Returns [`TensorError::UnsupportedDType`] if the dtype is not `F32`.
pub fn matmul(
    lhs: &TensorView<'_>,
    rhs: &TensorView<'_>,
    output: &mut Tensor,
    algo: MatmulAlgo,
) -> Result<(), TensorError> {
    // Validate dtype: currently only F32 is supported.
    if lhs.dtype() != DType::F32 || rhs.dtype() != DType::F32 {
        return Err(TensorError::UnsupportedDType {
            op: "matmul",
            dtype: if lhs.dtype() != DType::F32 {
                lhs.dtype()
            } else {
                rhs.dtype()
            },
        });
    }

    // Validate shapes.
    if !lhs.shape().is_matmul_compatible(rhs.shape()) {
        return Err(TensorError::ShapeMismatch {
            op: "matmul",
            lhs: lhs.shape().clone(),
            rhs: rhs.shape().clone(),
        });
    }

    let lhs_dims = lhs.shape().dims();
    let rhs_dims = rhs.shape().dims();
    let m = lhs_dims[lhs_dims.len() - 2];
    let k = lhs_dims[lhs_dims.len() - 1];
    let n = rhs_dims[rhs_dims.len() - 1];

    let expected_shape = Shape::matrix(m, n);
    if output.shape() != &expected_shape || output.dtype() != DType::F32 {
        return Err(TensorError::ShapeMismatch {
            op: "matmul (output)",
            lhs: expected_shape,
            rhs: output.shape().clone(),
        });
    }

    let a = lhs.data::<f32>()?;
    let b = rhs.data::<f32>()?;
    let c = output.data_mut::<f32>()?;

    matmul_f32(a, b, c, m, k, n, algo);

    Ok(())
}

/// Dispatches to the selected f32 loop. `c` is overwritten.
pub(crate) fn matmul_f32(
    a: &[f32],
    b: &[f32],
    c: &mut [f32],
    m: usize,
    k: usize,
    n: usize,
    algo: MatmulAlgo,
) {
    match algo {
        MatmulAlgo::Generic => matmul_f32_generic(a, b, c, m, k, n),
        MatmulAlgo::Unrolled4 => matmul_f32_unrolled4(a, b, c, m, k, n),
    }
}

/// Generic (portable) f32 matrix multiplication.
///
/// Uses a simple ikj loop order for better cache locality on the `b` matrix.
fn matmul_f32_generic(a: &[f32], b: &[f32], c: &mut [f32], m: usize, k: usize, n: usize) {
    c.iter_mut().for_each(|x| *x = 0.0);

    // ikj loop order: the inner loop is a saxpy on a row of C, which is
    // sequential in memory.
    for i in 0..m {
        for p in 0..k {
            let a_ip = a[i * k + p];
            let c_row = &mut c[i * n..(i + 1) * n];
            let b_row = &b[p * n..(p + 1) * n];
            for j in 0..n {
                c_row[j] += a_ip * b_row[j];
            }
        }
    }
}

/// Same arithmetic as [`matmul_f32_generic`], row update in 4-wide chunks.
fn matmul_f32_unrolled4(a: &[f32], b: &[f32], c: &mut [f32], m: usize, k: usize, n: usize) {
    c.iter_mut().for_each(|x| *x = 0.0);

    for i in 0..m {
        let c_row = &mut c[i * n..(i + 1) * n];
        for p in 0..k {
            let a_ip = a[i * k + p];
            let b_row = &b[p * n..(p + 1) * n];
            let mut c_chunks = c_row.chunks_exact_mut(4);
            let mut b_chunks = b_row.chunks_exact(4);
            for (cc, bc) in (&mut c_chunks).zip(&mut b_chunks) {
                cc[0] += a_ip * bc[0];
                cc[1] += a_ip * bc[1];
                cc[2] += a_ip * bc[2];
                cc[3] += a_ip * bc[3];
            }
            for (cv, bv) in c_chunks
                .into_remainder()
                .iter_mut()
                .zip(b_chunks.remainder())
            {
                *cv += a_ip * bv;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shape;

    #[test]
    fn test_matmul_2x3_times_3x2() {
        // A = [[1, 2, 3], [4, 5, 6]]
        // B = [[7, 8], [9, 10], [11, 12]]
        // C = [[58, 64], [139, 154]]
        let a = Tensor::from_f32(Shape::matrix(2, 3), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let b =
            Tensor::from_f32(Shape::matrix(3, 2), &[7.0, 8.0, 9.0, 10.0, 11.0, 12.0]).unwrap();
        let mut c = Tensor::zeros(Shape::matrix(2, 2), DType::F32);

        matmul(&a.view(), &b.view(), &mut c, MatmulAlgo::Generic).unwrap();

        let result = c.as_f32_slice();
        assert!((result[0] - 58.0).abs() < 1e-5);
        assert!((result[1] - 64.0).abs() < 1e-5);
        assert!((result[2] - 139.0).abs() < 1e-5);
        assert!((result[3] - 154.0).abs() < 1e-5);
    }

    #[test]
    fn test_unrolled_matches_generic_bitwise() {
        // N = 7 exercises both the 4-wide body and the remainder.
        let (m, k, n) = (3, 5, 7);
        let a: Vec<f32> = (0..m * k).map(|i| (i as f32 * 0.37).sin()).collect();
        let b: Vec<f32> = (0..k * n).map(|i| (i as f32 * 0.11).cos()).collect();
        let mut c1 = vec![0.0; m * n];
        let mut c2 = vec![0.0; m * n];
        matmul_f32(&a, &b, &mut c1, m, k, n, MatmulAlgo::Generic);
        matmul_f32(&a, &b, &mut c2, m, k, n, MatmulAlgo::Unrolled4);
        assert_eq!(c1, c2);
    }

    #[test]
    fn test_matmul_identity() {
        // A * I = A
        let a = Tensor::from_f32(Shape::matrix(2, 2), &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let eye = Tensor::from_f32(Shape::matrix(2, 2), &[1.0, 0.0, 0.0, 1.0]).unwrap();
        let mut c = Tensor::zeros(Shape::matrix(2, 2), DType::F32);

        matmul(&a.view(), &eye.view(), &mut c, MatmulAlgo::Unrolled4).unwrap();

        assert_eq!(c.as_f32_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_matmul_shape_mismatch() {
        let a = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
        let b = Tensor::zeros(Shape::matrix(4, 2), DType::F32); // 4 != 3
        let mut c = Tensor::zeros(Shape::matrix(2, 2), DType::F32);

        let result = matmul(&a.view(), &b.view(), &mut c, MatmulAlgo::Generic);
        assert!(result.is_err());
    }
}
