// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Depthwise convolution kernels: a direct x86 implementation and the
//! FPGA implementation built on PE decomposition.

use super::{mark_output, prepare_output, ANY, FPGA_FP16, X86_FLOAT};
use crate::kernel::attr_usizes;
use crate::pe::{DepthwiseConvSplitPe, PeConfig};
use crate::{Kernel, KernelArgs, KernelError, KernelOptions};
use model_ir::OpDesc;
use tensor_core::ops::{self, Conv2dParams};
use tensor_core::{DType, DataLocation, Place, Shape, Target};

/// Reads `strides` and `paddings`; a single value applies to both axes.
fn conv_params(op: &OpDesc) -> Result<Conv2dParams, KernelError> {
    let pair = |name: &str, default: [usize; 2]| -> Result<[usize; 2], KernelError> {
        match attr_usizes(op, name)?.as_deref() {
            None => Ok(default),
            Some([v]) => Ok([*v, *v]),
            Some([h, w]) => Ok([*h, *w]),
            Some(other) => Err(KernelError::InvalidAttribute {
                op: op.op_type.clone(),
                name: name.to_string(),
                detail: format!("expected 1 or 2 values, got {}", other.len()),
            }),
        }
    };
    Ok(Conv2dParams {
        strides: pair("strides", [1, 1])?,
        paddings: pair("paddings", [0, 0])?,
    })
}

// ── x86 ────────────────────────────────────────────────────────────

/// Direct `f32` depthwise convolution.
#[derive(Debug)]
pub struct DepthwiseConvKernel {
    params: Conv2dParams,
}

pub(crate) fn create_x86(op: &OpDesc, _: &KernelOptions) -> Result<Box<dyn Kernel>, KernelError> {
    Ok(Box::new(DepthwiseConvKernel {
        params: conv_params(op)?,
    }))
}

impl Kernel for DepthwiseConvKernel {
    fn name(&self) -> &str {
        "dwconv_x86"
    }

    fn place(&self) -> Place {
        X86_FLOAT
    }

    fn dispatch(&mut self, args: &mut KernelArgs<'_>) -> Result<(), KernelError> {
        let (ins, outs) = args.split_mut();
        let input = ins.input("Input")?;
        let filter = ins.input("Filter")?;
        let bias = ins.input_opt("Bias")?.map(|b| b.view());

        let shape = ops::depthwise_output_shape(input.shape(), filter.shape(), &self.params)?;
        let out = outs.output_mut("Output")?;
        prepare_output(out, shape, DType::F32);
        ops::depthwise_conv2d(&input.view(), &filter.view(), bias.as_ref(), &self.params, out)?;
        mark_output(out, X86_FLOAT);
        Ok(())
    }
}

// ── FPGA ───────────────────────────────────────────────────────────

/// `fp16` depthwise convolution on the FPGA, split over processing
/// elements when the channel count exceeds one element's capacity.
///
/// `Input` must already be resident on the device. `Filter` and `Bias`
/// are read once in `init`, sliced per element and converted to `fp16`.
#[derive(Debug)]
pub struct FpgaDepthwiseConvKernel {
    params: Conv2dParams,
    pe: PeConfig,
    /// Decomposition prepared for this input shape.
    prepared: Option<(Shape, DepthwiseConvSplitPe)>,
}

pub(crate) fn create_fpga(op: &OpDesc, options: &KernelOptions) -> Result<Box<dyn Kernel>, KernelError> {
    Ok(Box::new(FpgaDepthwiseConvKernel {
        params: conv_params(op)?,
        pe: options.pe,
        prepared: None,
    }))
}

impl FpgaDepthwiseConvKernel {
    /// Number of processing elements the last `init` planned.
    pub fn num_groups(&self) -> Option<usize> {
        self.prepared.as_ref().map(|(_, pe)| pe.num_groups())
    }
}

impl Kernel for FpgaDepthwiseConvKernel {
    fn name(&self) -> &str {
        "dwconv_fpga_pe"
    }

    fn place(&self) -> Place {
        FPGA_FP16
    }

    fn input_place(&self, slot: &str) -> Place {
        match slot {
            "Input" => FPGA_FP16,
            _ => ANY,
        }
    }

    fn init(&mut self, args: &KernelArgs<'_>) -> Result<(), KernelError> {
        let shape = args.input("Input")?.shape().clone();
        if matches!(&self.prepared, Some((s, _)) if *s == shape) {
            return Ok(());
        }
        let ins = args.inputs();
        let pe = DepthwiseConvSplitPe::new(
            ins.input("Filter")?,
            ins.input_opt("Bias")?,
            self.params,
            &self.pe,
            DType::F16,
        )?;
        tracing::debug!(
            input = %shape,
            groups = pe.num_groups(),
            capacity = pe.partition().capacity(),
            "partitioned depthwise_conv2d over processing elements"
        );
        self.prepared = Some((shape, pe));
        Ok(())
    }

    fn dispatch(&mut self, args: &mut KernelArgs<'_>) -> Result<(), KernelError> {
        let (ins, outs) = args.split_mut();
        let input = ins.input("Input")?;
        if input.location() != DataLocation::Device || input.target() != Target::Fpga {
            return Err(KernelError::NotOnDevice {
                op: "depthwise_conv2d".into(),
                slot: "Input".into(),
                target: Target::Fpga,
            });
        }
        let pe = match &self.prepared {
            Some((shape, pe)) if shape == input.shape() => pe,
            _ => {
                return Err(KernelError::NotInitialised {
                    op: "depthwise_conv2d".into(),
                })
            }
        };

        let out = outs.output_mut("Output")?;
        pe.run(&input.view(), out)?;
        out.set_layout(FPGA_FP16.layout);
        out.sync_to_device(Target::Fpga);
        Ok(())
    }
}
