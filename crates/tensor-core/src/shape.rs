// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Dimension lists and the extent arithmetic kernels slice with.

use std::fmt;

use crate::DType;

/// Dimensions of a [`crate::Tensor`], outermost first.
///
/// The leading dimension is the one a [`crate::Lod`] partitions. An empty
/// dimension list is a scalar holding one element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Wraps a dimension list.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![2, 3, 4]);
    /// assert_eq!(s.rank(), 3);
    /// assert_eq!(s.num_elements(), 24);
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    /// `[len]`
    pub fn vector(len: usize) -> Self {
        Self::new(vec![len])
    }

    /// `[rows, cols]`
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self::new(vec![rows, cols])
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Extent of dimension `index`, `None` past the rank.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    /// Leading dimension, the one a [`crate::Lod`] describes.
    pub fn leading_dim(&self) -> Option<usize> {
        self.dims.first().copied()
    }

    /// Element count, or `None` when the product does not fit in `usize`.
    ///
    /// Shapes read from a model file are untrusted; decoders size their
    /// reads through this rather than [`Shape::num_elements`].
    pub fn checked_num_elements(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Byte footprint for `dtype`, or `None` on overflow.
    pub fn checked_size_bytes(&self, dtype: DType) -> Option<usize> {
        self.checked_num_elements()?.checked_mul(dtype.size_bytes())
    }

    /// Element count. A scalar holds one element.
    ///
    /// Wraps on overflow in release builds; use
    /// [`Shape::checked_num_elements`] for shapes that did not come from
    /// this process.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Byte footprint for `dtype`.
    pub fn size_bytes(&self, dtype: DType) -> usize {
        self.num_elements() * dtype.size_bytes()
    }

    /// Product of the dimensions before `axis`.
    pub fn outer_count(&self, axis: usize) -> usize {
        self.dims[..axis.min(self.rank())].iter().product()
    }

    /// Product of the dimensions after `axis`.
    pub fn inner_count(&self, axis: usize) -> usize {
        self.dims.get(axis + 1..).map_or(1, |d| d.iter().product())
    }

    /// Splits the dimensions at `col` and multiplies each side out.
    ///
    /// Fully-connected layers view any-rank input as a `rows x cols`
    /// matrix this way.
    pub fn flatten_to_2d(&self, col: usize) -> (usize, usize) {
        let (head, tail) = self.dims.split_at(col.min(self.rank()));
        (head.iter().product(), tail.iter().product())
    }

    /// Copy with `dims[axis] = value`. Out-of-range axes leave it unchanged.
    pub fn with_dim(&self, axis: usize, value: usize) -> Shape {
        let mut out = self.clone();
        if let Some(slot) = out.dims.get_mut(axis) {
            *slot = value;
        }
        out
    }

    /// `true` when `self` is `[.., M, K]` and `rhs` is `[.., K, N]`.
    pub fn is_matmul_compatible(&self, rhs: &Shape) -> bool {
        match (self.dims.as_slice(), rhs.dims.as_slice()) {
            ([.., k_lhs], [.., k_rhs, _]) if self.rank() >= 2 => k_lhs == k_rhs,
            _ => false,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        let mut first = true;
        for d in &self.dims {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{d}")?;
        }
        f.write_str("]")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self::new(dims)
    }
}

/// Lets call sites write `t.resize([5, 10])`.
impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self::new(dims.into())
    }
}
