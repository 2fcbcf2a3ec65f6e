// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Core tensor type and view abstractions.

use crate::{Buffer, DType, DataLayout, Element, Lod, Place, Shape, Target, TensorError};

/// Where a tensor's bytes currently reside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataLocation {
    #[default]
    Host,
    Device,
}

/// An owned, n-dimensional tensor stored in contiguous memory.
///
/// `Tensor` is the primary data carrier in the inference pipeline. Besides
/// shape and element type it records the [`Target`] and [`DataLayout`] it
/// was produced for, an optional [`Lod`], and whether its bytes have been
/// transferred to device memory.
///
/// # Memory Layout
/// Data is stored in row-major order in an 8-byte aligned [`Buffer`].
/// Typed access is provided via [`data`](Tensor::data) and friends.
#[derive(Debug, Clone)]
pub struct Tensor {
    shape: Shape,
    dtype: DType,
    lod: Lod,
    target: Target,
    layout: DataLayout,
    location: DataLocation,
    aligned: bool,
    buffer: Buffer,
}

impl Tensor {
    /// An empty `f32` host tensor of shape `[0]`, the state a freshly
    /// created variable starts in.
    pub fn empty() -> Self {
        Self::zeros(Shape::vector(0), DType::F32)
    }

    /// Creates a new tensor filled with zeros.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape, DType};
    /// let t = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
    /// assert_eq!(t.size_bytes(), 24); // 2 * 3 * 4 bytes
    /// ```
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        let size = shape.size_bytes(dtype);
        Self {
            shape,
            dtype,
            lod: Lod::default(),
            target: Target::Host,
            layout: DataLayout::Nchw,
            location: DataLocation::Host,
            aligned: false,
            buffer: Buffer::zeroed(size),
        }
    }

    /// Creates a tensor from raw bytes.
    ///
    /// Returns an error if the buffer size does not match `shape.size_bytes(dtype)`.
    pub fn from_bytes(shape: Shape, dtype: DType, data: &[u8]) -> Result<Self, TensorError> {
        let expected = shape
            .checked_size_bytes(dtype)
            .ok_or_else(|| TensorError::InvalidArgument {
                op: "from_bytes",
                detail: format!("size of {shape} x {dtype} overflows"),
            })?;
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        let mut t = Self::zeros(shape, dtype);
        t.buffer = Buffer::from_bytes(data);
        Ok(t)
    }

    /// Creates a tensor from a slice of typed values.
    pub fn from_slice<T: Element>(shape: Shape, values: &[T]) -> Result<Self, TensorError> {
        Self::from_bytes(shape, T::DTYPE, bytemuck::cast_slice(values))
    }

    /// Creates a tensor from a slice of `f32` values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Tensor, Shape};
    /// let t = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(t.as_f32_slice(), &[1.0, 2.0, 3.0]);
    /// ```
    pub fn from_f32(shape: Shape, values: &[f32]) -> Result<Self, TensorError> {
        Self::from_slice(shape, values)
    }

    // ── Metadata ───────────────────────────────────────────────

    /// Returns the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the tensor's data type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Number of elements.
    pub fn numel(&self) -> usize {
        self.shape.num_elements()
    }

    pub fn lod(&self) -> &Lod {
        &self.lod
    }

    /// Attaches a nested-length descriptor after checking it against the
    /// leading dimension.
    pub fn set_lod(&mut self, lod: Lod) -> Result<(), TensorError> {
        if !lod.is_empty() {
            let leading = self.shape.leading_dim().ok_or_else(|| {
                TensorError::InvalidLod("a rank-0 tensor cannot carry a lod".into())
            })?;
            lod.validate(leading)?;
        }
        self.lod = lod;
        Ok(())
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    pub fn layout(&self) -> DataLayout {
        self.layout
    }

    pub fn set_layout(&mut self, layout: DataLayout) {
        self.layout = layout;
    }

    pub fn location(&self) -> DataLocation {
        self.location
    }

    pub fn set_location(&mut self, location: DataLocation) {
        self.location = location;
    }

    /// Whether the buffer has been laid out for the device's alignment rules.
    pub fn is_aligned(&self) -> bool {
        self.aligned
    }

    pub fn set_aligned(&mut self, aligned: bool) {
        self.aligned = aligned;
    }

    /// The place this tensor's contents currently satisfy.
    pub fn place(&self) -> Place {
        Place::with_layout(self.target, self.dtype.precision(), self.layout)
    }

    /// Copies target, layout, location and alignment from `other`.
    pub fn copy_placement_from(&mut self, other: &Tensor) {
        self.target = other.target;
        self.layout = other.layout;
        self.location = other.location;
        self.aligned = other.aligned;
    }

    // ── Storage ────────────────────────────────────────────────

    /// Changes the shape, keeping the element type.
    ///
    /// The allocation is reused when it is large enough, so calling this
    /// repeatedly with the same shape is free. A lod that no longer agrees
    /// with the new leading dimension is dropped.
    pub fn resize(&mut self, shape: impl Into<Shape>) {
        self.shape = shape.into();
        self.buffer.resize(self.shape.size_bytes(self.dtype));
        let keep_lod = match self.shape.leading_dim() {
            Some(leading) => self.lod.validate(leading).is_ok(),
            None => self.lod.is_empty(),
        };
        if !keep_lod {
            self.lod = Lod::default();
        }
    }

    /// Changes the element type and resizes the buffer to match.
    pub fn set_dtype(&mut self, dtype: DType) {
        self.dtype = dtype;
        self.buffer.resize(self.shape.size_bytes(dtype));
    }

    /// Switches the tensor to element type `T` and returns its storage.
    pub fn mutable_data<T: Element>(&mut self) -> &mut [T] {
        if self.dtype != T::DTYPE {
            self.set_dtype(T::DTYPE);
        }
        self.buffer.typed_mut::<T>()
    }

    /// Typed read access.
    pub fn data<T: Element>(&self) -> Result<&[T], TensorError> {
        self.check_dtype(T::DTYPE)?;
        Ok(self.buffer.typed::<T>())
    }

    /// Typed write access without changing the element type.
    pub fn data_mut<T: Element>(&mut self) -> Result<&mut [T], TensorError> {
        self.check_dtype(T::DTYPE)?;
        Ok(self.buffer.typed_mut::<T>())
    }

    /// Returns an immutable view over this tensor's data.
    pub fn view(&self) -> TensorView<'_> {
        TensorView {
            shape: self.shape.clone(),
            dtype: self.dtype,
            layout: self.layout,
            data: self.buffer.as_bytes(),
        }
    }

    /// Returns the raw byte slice backing this tensor.
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// Returns a mutable reference to the raw byte buffer.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.buffer.as_bytes_mut()
    }

    /// Returns the memory footprint of this tensor in bytes.
    pub fn size_bytes(&self) -> usize {
        self.buffer.len()
    }

    /// Allocated bytes; at least [`size_bytes`](Tensor::size_bytes).
    pub fn capacity_bytes(&self) -> usize {
        self.buffer.capacity()
    }

    /// Interprets the buffer as a slice of `f32`.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::F32`.
    pub fn as_f32_slice(&self) -> &[f32] {
        assert_eq!(
            self.dtype,
            DType::F32,
            "as_f32_slice called on {:?} tensor",
            self.dtype
        );
        self.buffer.typed::<f32>()
    }

    /// Interprets the buffer as a mutable slice of `f32`.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::F32`.
    pub fn as_f32_slice_mut(&mut self) -> &mut [f32] {
        assert_eq!(
            self.dtype,
            DType::F32,
            "as_f32_slice_mut called on {:?} tensor",
            self.dtype
        );
        self.buffer.typed_mut::<f32>()
    }

    /// Fills the tensor with a constant `f32` value.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::F32`.
    pub fn fill_f32(&mut self, value: f32) {
        self.as_f32_slice_mut().fill(value);
    }

    // ── Device residency ──────────────────────────────────────

    /// Makes the contents resident in device memory for `target`.
    ///
    /// Device memory is simulated by the host buffer; what matters is that
    /// the transition is an explicit, completed step a device kernel can
    /// check before it dispatches.
    pub fn sync_to_device(&mut self, target: Target) {
        self.target = target;
        self.location = DataLocation::Device;
        self.aligned = true;
    }

    /// Brings device-resident contents back to host memory.
    pub fn sync_to_host(&mut self) {
        self.target = Target::Host;
        self.location = DataLocation::Host;
    }

    fn check_dtype(&self, expected: DType) -> Result<(), TensorError> {
        if self.dtype != expected {
            return Err(TensorError::DTypeMismatch {
                expected,
                actual: self.dtype,
            });
        }
        Ok(())
    }
}

impl Default for Tensor {
    fn default() -> Self {
        Self::empty()
    }
}

/// Logical equality: element type, shape, lod and bit-exact contents.
/// Placement metadata (target, location) is not compared.
impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.dtype == other.dtype
            && self.shape == other.shape
            && self.lod == other.lod
            && self.buffer == other.buffer
    }
}

/// A borrowed, read-only view over tensor data.
///
/// Views are zero-copy and tied to the lifetime of the source buffer,
/// enforced by the borrow checker. A view may cover a contiguous slice of
/// a larger tensor, in which case its shape differs from the source's.
#[derive(Debug, Clone)]
pub struct TensorView<'a> {
    shape: Shape,
    dtype: DType,
    layout: DataLayout,
    data: &'a [u8],
}

impl<'a> TensorView<'a> {
    /// Creates a view from raw parts.
    ///
    /// Returns an error if `data` does not hold exactly `shape × dtype` bytes.
    pub fn from_parts(shape: Shape, dtype: DType, data: &'a [u8]) -> Result<Self, TensorError> {
        let expected = shape.size_bytes(dtype);
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            shape,
            dtype,
            layout: DataLayout::Nchw,
            data,
        })
    }

    /// Returns the shape of the viewed tensor.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the data type of the viewed tensor.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn layout(&self) -> DataLayout {
        self.layout
    }

    /// Tags the view with a layout.
    pub fn with_layout(mut self, layout: DataLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Returns the raw byte slice.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Typed read access.
    pub fn data<T: Element>(&self) -> Result<&'a [T], TensorError> {
        if self.dtype != T::DTYPE {
            return Err(TensorError::DTypeMismatch {
                expected: T::DTYPE,
                actual: self.dtype,
            });
        }
        Ok(bytemuck::cast_slice(self.data))
    }

    /// Interprets the view as a slice of `f32`.
    ///
    /// # Panics
    /// Panics if `self.dtype() != DType::F32`.
    pub fn as_f32_slice(&self) -> &'a [f32] {
        assert_eq!(
            self.dtype,
            DType::F32,
            "as_f32_slice called on {:?} view",
            self.dtype
        );
        bytemuck::cast_slice(self.data)
    }

    /// Copies the viewed bytes into an owned host tensor.
    pub fn to_tensor(&self) -> Tensor {
        let mut t = Tensor::zeros(self.shape.clone(), self.dtype);
        t.as_bytes_mut().copy_from_slice(self.data);
        t.layout = self.layout;
        t
    }
}
