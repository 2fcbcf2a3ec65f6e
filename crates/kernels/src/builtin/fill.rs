// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `fill`: writes an arithmetic ramp `start + i * step` into a new tensor.

use super::{prepare_output, ANY_FLOAT};
use crate::kernel::{attr_f32, attr_usizes};
use crate::{Kernel, KernelArgs, KernelError, KernelOptions};
use model_ir::OpDesc;
use tensor_core::{DType, Place, Shape};

#[derive(Debug)]
pub struct FillKernel {
    shape: Shape,
    start: f32,
    step: f32,
}

pub(crate) fn create(op: &OpDesc, _: &KernelOptions) -> Result<Box<dyn Kernel>, KernelError> {
    let dims = attr_usizes(op, "shape")?.ok_or_else(|| KernelError::MissingAttribute {
        op: op.op_type.clone(),
        name: "shape".into(),
    })?;
    Ok(Box::new(FillKernel {
        shape: Shape::new(dims),
        start: attr_f32(op, "start", 0.0)?,
        step: attr_f32(op, "step", 1.0)?,
    }))
}

impl Kernel for FillKernel {
    fn name(&self) -> &str {
        "fill_any"
    }

    fn place(&self) -> Place {
        ANY_FLOAT
    }

    fn dispatch(&mut self, args: &mut KernelArgs<'_>) -> Result<(), KernelError> {
        let out = args.output_mut("Out")?;
        prepare_output(out, self.shape.clone(), DType::F32);
        for (i, v) in out.data_mut::<f32>()?.iter_mut().enumerate() {
            *v = self.start + i as f32 * self.step;
        }
        Ok(())
    }
}
