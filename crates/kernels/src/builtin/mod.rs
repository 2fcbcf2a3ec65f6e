// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Built-in kernels and their registration.

mod activation;
mod convert;
mod depthwise;
mod fc;
mod fill;
mod io;
mod split_concat;

pub use activation::ReluKernel;
pub use convert::{CalibKernel, IoCopyKernel, LayoutKernel};
pub use depthwise::{DepthwiseConvKernel, FpgaDepthwiseConvKernel};
pub use fc::FcKernel;
pub use fill::FillKernel;
pub use io::{FeedKernel, FetchKernel};
pub use split_concat::{ConcatKernel, SplitKernel, SplitParts};

use crate::{KernelError, KernelRegistry};
use tensor_core::{DType, DataLayout, Place, Precision, Shape, Target, Tensor};

pub(crate) const ANY: Place = Place::any();
pub(crate) const HOST_ANY: Place = Place::with_layout(Target::Host, Precision::Any, DataLayout::Any);
pub(crate) const ANY_FLOAT: Place = Place::with_layout(Target::Any, Precision::Float, DataLayout::Any);
pub(crate) const X86_FLOAT: Place = Place::new(Target::X86, Precision::Float);
pub(crate) const ARM_FLOAT: Place = Place::new(Target::Arm, Precision::Float);
pub(crate) const FPGA_FP16: Place = Place::new(Target::Fpga, Precision::Fp16);

/// Registers every built-in kernel.
///
/// Order matters: among equally good candidates the earlier one wins.
pub fn register_builtin_kernels(registry: &mut KernelRegistry) -> Result<(), KernelError> {
    registry.register("feed", HOST_ANY, "feed_host", io::create_feed)?;
    registry.register("fetch", HOST_ANY, "fetch_host", io::create_fetch)?;
    registry.register("fill", ANY_FLOAT, "fill_any", fill::create)?;
    registry.register("fc", X86_FLOAT, "fc_x86", fc::create_x86)?;
    registry.register("fc", ARM_FLOAT, "fc_arm", fc::create_arm)?;
    registry.register("relu", ANY_FLOAT, "relu_any", activation::create_relu)?;
    registry.register("split", ANY, "split_any", split_concat::create_split)?;
    registry.register("concat", ANY, "concat_any", split_concat::create_concat)?;
    registry.register("depthwise_conv2d", X86_FLOAT, "dwconv_x86", depthwise::create_x86)?;
    registry.register("depthwise_conv2d", FPGA_FP16, "dwconv_fpga_pe", depthwise::create_fpga)?;
    registry.register("io_copy", ANY, "io_copy_any", convert::create_io_copy)?;
    registry.register("calib", ANY, "calib_any", convert::create_calib)?;
    registry.register("layout", ANY, "layout_any", convert::create_layout)?;
    tracing::debug!(kernels = registry.len(), "registered built-in kernels");
    Ok(())
}

/// Reshapes `out` to `shape` and `dtype`, reusing its allocation.
pub(crate) fn prepare_output(out: &mut Tensor, shape: Shape, dtype: DType) {
    if out.dtype() != dtype {
        out.set_dtype(dtype);
    }
    out.resize(shape);
}

/// Stamps an output with the concrete axes of the kernel's place.
pub(crate) fn mark_output(out: &mut Tensor, place: Place) {
    if place.target != Target::Any {
        out.set_target(place.target);
    }
    if place.layout != DataLayout::Any {
        out.set_layout(place.layout);
    }
}
