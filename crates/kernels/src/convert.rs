// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Implicit input conversions.
//!
//! When a bound input does not satisfy the place a kernel declares for its
//! slot, the input is replaced by a converted temporary before dispatch:
//!
//! | mismatch | conversion |
//! |----------|------------|
//! | target (into or out of device memory) | `io_copy` |
//! | float precision (`float` / `fp16`) | `calib` |
//! | layout of a 4-D tensor | `layout` |
//!
//! The scope's tensor is never modified.

use crate::{Kernel, KernelArgs, KernelError};
use std::fmt;
use tensor_core::{ops, DType, DataLayout, DataLocation, Place, Precision, Target, Tensor, TensorError};

/// A single conversion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    IoCopy,
    Calib,
    Layout,
}

impl ConversionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IoCopy => "io_copy",
            Self::Calib => "calib",
            Self::Layout => "layout",
        }
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A conversion applied to one bound input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub slot: String,
    pub index: usize,
    pub kinds: Vec<ConversionKind>,
    pub from: Place,
    pub to: Place,
}

/// Moves `tensor` to `target`'s memory.
///
/// Device memory is simulated, so only the residency metadata changes.
pub fn io_copy(tensor: &Tensor, target: Target) -> Tensor {
    let mut out = tensor.clone();
    if target.is_host_memory() || target == Target::Any {
        out.sync_to_host();
    } else {
        out.sync_to_device(target);
    }
    out
}

/// Casts a float tensor to `precision`, keeping its lod.
pub fn calib(tensor: &Tensor, precision: Precision) -> Result<Tensor, KernelError> {
    let to = DType::from_precision(precision).ok_or_else(|| TensorError::InvalidArgument {
        op: "calib",
        detail: format!("no element type for precision {precision}"),
    })?;
    let mut out = ops::cast(&tensor.view(), to)?;
    out.set_lod(tensor.lod().clone())?;
    Ok(out)
}

/// Transposes a 4-D tensor to `layout`, keeping its lod.
pub fn layout(tensor: &Tensor, layout: DataLayout) -> Result<Tensor, KernelError> {
    let mut out = ops::transpose_layout(&tensor.view(), layout)?;
    out.set_lod(tensor.lod().clone())?;
    Ok(out)
}

/// Steps needed for `tensor` to satisfy `required`, in application order.
///
/// Device data is copied back before any host-side conversion, and data
/// bound for a device is copied there last.
pub fn plan(tensor: &Tensor, required: &Place) -> Vec<ConversionKind> {
    let mut steps = Vec::new();
    let is_float_precision = |p: Precision| matches!(p, Precision::Float | Precision::Fp16);
    let wants_device = required.target != Target::Any && !required.target.is_host_memory();
    let on_device = tensor.location() == DataLocation::Device;

    if on_device && !(wants_device && tensor.target() == required.target) {
        steps.push(ConversionKind::IoCopy);
    }

    if required.layout != DataLayout::Any
        && tensor.layout() != DataLayout::Any
        && tensor.layout() != required.layout
        && tensor.shape().rank() == 4
    {
        steps.push(ConversionKind::Layout);
    }

    let have = tensor.dtype().precision();
    if is_float_precision(required.precision) && is_float_precision(have) && have != required.precision {
        steps.push(ConversionKind::Calib);
    }

    // Every host-side step above leaves a host tensor behind.
    let resident = on_device && steps.is_empty();
    if wants_device && !resident {
        steps.push(ConversionKind::IoCopy);
    }
    steps
}

/// Converts `tensor` for `required`, or returns `None` if it already fits.
pub fn convert_input(
    tensor: &Tensor,
    required: &Place,
) -> Result<Option<(Tensor, Vec<ConversionKind>)>, KernelError> {
    let steps = plan(tensor, required);
    if steps.is_empty() {
        return Ok(None);
    }
    let mut current = tensor.clone();
    for step in &steps {
        current = match step {
            ConversionKind::Layout => layout(&current, required.layout)?,
            ConversionKind::Calib => calib(&current, required.precision)?,
            ConversionKind::IoCopy if current.location() == DataLocation::Device => {
                io_copy(&current, Target::Host)
            }
            ConversionKind::IoCopy => io_copy(&current, required.target),
        };
    }
    Ok(Some((current, steps)))
}

/// Rewrites every bound input of `args` that does not satisfy
/// `kernel.input_place(slot)`.
pub fn apply_implicit_conversions(
    kernel: &dyn Kernel,
    args: &mut KernelArgs<'_>,
) -> Result<Vec<Conversion>, KernelError> {
    if !kernel.converts_inputs() {
        return Ok(Vec::new());
    }
    let mut pending = Vec::new();
    for (slot, index, tensor) in args.input_tensors() {
        let required = kernel.input_place(slot);
        if let Some((converted, kinds)) = convert_input(tensor, &required)? {
            let conversion = Conversion {
                slot: slot.to_string(),
                index,
                kinds,
                from: tensor.place(),
                to: converted.place(),
            };
            pending.push((conversion, converted));
        }
    }

    let mut applied = Vec::with_capacity(pending.len());
    for (conversion, converted) in pending {
        tracing::debug!(
            op = args.op(),
            slot = %conversion.slot,
            from = %conversion.from,
            to = %conversion.to,
            steps = ?conversion.kinds,
            "implicit conversion"
        );
        args.replace_input(&conversion.slot, conversion.index, converted)?;
        applied.push(conversion);
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Shape;

    const FPGA_FP16: Place = Place::new(Target::Fpga, Precision::Fp16);
    const X86_F: Place = Place::new(Target::X86, Precision::Float);

    fn nchw(vals: usize) -> Tensor {
        let data: Vec<f32> = (0..vals).map(|i| i as f32).collect();
        Tensor::from_f32(Shape::new(vec![1, vals, 1, 1]), &data).unwrap()
    }

    #[test]
    fn test_host_tensor_fits_x86() {
        assert!(plan(&nchw(4), &X86_F).is_empty());
        assert!(plan(&nchw(4), &Place::any()).is_empty());
    }

    #[test]
    fn test_device_kernel_needs_calib_then_io_copy() {
        let t = nchw(4);
        let (converted, steps) = convert_input(&t, &FPGA_FP16).unwrap().unwrap();
        assert_eq!(steps, vec![ConversionKind::Calib, ConversionKind::IoCopy]);
        assert_eq!(converted.dtype(), DType::F16);
        assert_eq!(converted.location(), DataLocation::Device);
        assert_eq!(converted.target(), Target::Fpga);
        // Source untouched.
        assert_eq!(t.location(), DataLocation::Host);
    }

    #[test]
    fn test_device_tensor_returns_to_host() {
        let mut t = nchw(4);
        t.sync_to_device(Target::Fpga);
        assert_eq!(plan(&t, &X86_F), vec![ConversionKind::IoCopy]);
        assert_eq!(plan(&t, &Place::any()), vec![ConversionKind::IoCopy]);
        let mut ok = nchw(4);
        ok.sync_to_device(Target::Fpga);
        assert!(plan(&ok, &Place::new(Target::Fpga, Precision::Float)).is_empty());
    }

    #[test]
    fn test_device_fp16_to_x86_copies_back_then_casts() {
        let mut t = calib(&nchw(4), Precision::Fp16).unwrap();
        t.sync_to_device(Target::Fpga);
        let (converted, steps) = convert_input(&t, &X86_F).unwrap().unwrap();
        assert_eq!(steps, vec![ConversionKind::IoCopy, ConversionKind::Calib]);
        assert_eq!(converted.location(), DataLocation::Host);
        assert_eq!(converted.as_f32_slice(), &[0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_layout_only_for_4d() {
        let nhwc = Place::with_layout(Target::X86, Precision::Float, DataLayout::Nhwc);
        assert_eq!(plan(&nchw(4), &nhwc), vec![ConversionKind::Layout]);
        let flat = Tensor::from_f32(Shape::vector(3), &[1.0, 2.0, 3.0]).unwrap();
        assert!(plan(&flat, &nhwc).is_empty());
    }

    #[test]
    fn test_integer_inputs_are_not_cast() {
        let ids = Tensor::from_slice(Shape::vector(2), &[1i64, 2]).unwrap();
        assert!(plan(&ids, &X86_F).is_empty());
    }
}
