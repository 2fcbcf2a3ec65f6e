// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use super::{prepare_output, ANY_FLOAT};
use crate::{Kernel, KernelArgs, KernelError, KernelOptions};
use model_ir::OpDesc;
use tensor_core::{ops, Place};

/// Rectified linear unit over `f32` tensors.
#[derive(Debug)]
pub struct ReluKernel;

pub(crate) fn create_relu(_: &OpDesc, _: &KernelOptions) -> Result<Box<dyn Kernel>, KernelError> {
    Ok(Box::new(ReluKernel))
}

impl Kernel for ReluKernel {
    fn name(&self) -> &str {
        "relu_any"
    }

    fn place(&self) -> Place {
        ANY_FLOAT
    }

    fn dispatch(&mut self, args: &mut KernelArgs<'_>) -> Result<(), KernelError> {
        let (ins, outs) = args.split_mut();
        let x = ins.input("X")?;
        let out = outs.output_mut("Out")?;
        prepare_output(out, x.shape().clone(), x.dtype());
        ops::relu(&x.view(), out)?;
        out.set_lod(x.lod().clone())?;
        out.set_layout(x.layout());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::Variable;
    use tensor_core::{Shape, Tensor};

    #[test]
    fn test_relu_clamps_negatives() {
        let x = Variable::Tensor(Tensor::from_f32(Shape::vector(3), &[-1.0, 0.0, 2.0]).unwrap());
        let mut args = KernelArgs::new("relu");
        args.bind_input("X", &x);
        args.bind_output("Out", Variable::default());
        ReluKernel.dispatch(&mut args).unwrap();
        let outs = args.into_outputs();
        assert_eq!(outs["Out"][0].as_tensor().unwrap().as_f32_slice(), &[0.0, 0.0, 2.0]);
    }
}
