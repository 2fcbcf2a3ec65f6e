// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Fully-connected kernels for the CPU targets.
//!
//! Both compute the same result; the ARM kernel uses the 4-wide unrolled
//! inner loop that maps onto 128-bit vector registers.

use super::{mark_output, prepare_output, ARM_FLOAT, X86_FLOAT};
use crate::kernel::attr_usize;
use crate::{Kernel, KernelArgs, KernelError, KernelOptions};
use model_ir::OpDesc;
use tensor_core::ops::{self, MatmulAlgo};
use tensor_core::{DType, Place};

/// `Out = flatten(Input) @ W + Bias`.
#[derive(Debug)]
pub struct FcKernel {
    name: &'static str,
    place: Place,
    algo: MatmulAlgo,
    in_num_col_dims: usize,
}

impl FcKernel {
    fn from_op(op: &OpDesc, name: &'static str, place: Place, algo: MatmulAlgo) -> Result<Self, KernelError> {
        Ok(Self {
            name,
            place,
            algo,
            in_num_col_dims: attr_usize(op, "in_num_col_dims", Some(1))?,
        })
    }
}

pub(crate) fn create_x86(op: &OpDesc, _: &KernelOptions) -> Result<Box<dyn Kernel>, KernelError> {
    Ok(Box::new(FcKernel::from_op(op, "fc_x86", X86_FLOAT, MatmulAlgo::Generic)?))
}

pub(crate) fn create_arm(op: &OpDesc, _: &KernelOptions) -> Result<Box<dyn Kernel>, KernelError> {
    Ok(Box::new(FcKernel::from_op(op, "fc_arm", ARM_FLOAT, MatmulAlgo::Unrolled4)?))
}

impl Kernel for FcKernel {
    fn name(&self) -> &str {
        self.name
    }

    fn place(&self) -> Place {
        self.place
    }

    fn dispatch(&mut self, args: &mut KernelArgs<'_>) -> Result<(), KernelError> {
        let (ins, outs) = args.split_mut();
        let input = ins.input("Input")?;
        let weight = ins.input("W")?;
        let bias = ins.input_opt("Bias")?.map(|b| b.view());

        let shape = ops::fc_output_shape(input.shape(), weight.shape(), self.in_num_col_dims)?;
        let out = outs.output_mut("Out")?;
        prepare_output(out, shape, DType::F32);
        ops::fc(
            &input.view(),
            &weight.view(),
            bias.as_ref(),
            self.in_num_col_dims,
            out,
            self.algo,
        )?;
        mark_output(out, self.place);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::{Attribute, Variable};
    use tensor_core::{Shape, Target, Tensor};

    fn run(create: crate::KernelFactory) -> Tensor {
        let x = Variable::Tensor(Tensor::from_f32(Shape::matrix(2, 3), &[1., 2., 3., 4., 5., 6.]).unwrap());
        let w = Variable::Tensor(
            Tensor::from_f32(Shape::matrix(3, 2), &[1., 0., 0., 1., 1., 1.]).unwrap(),
        );
        let b = Variable::Tensor(Tensor::from_f32(Shape::vector(2), &[0.5, -0.5]).unwrap());
        let op = OpDesc::new("fc").with_attr("in_num_col_dims", Attribute::Int(1));
        let mut k = create(&op, &KernelOptions::default()).unwrap();

        let mut args = KernelArgs::new("fc");
        args.bind_input("Input", &x);
        args.bind_input("W", &w);
        args.bind_input("Bias", &b);
        args.bind_output("Out", Variable::default());
        k.init(&args).unwrap();
        k.dispatch(&mut args).unwrap();
        let mut outs = args.into_outputs();
        match outs.remove("Out").unwrap().remove(0) {
            Variable::Tensor(t) => t,
            other => panic!("unexpected {}", other.kind()),
        }
    }

    #[test]
    fn test_fc_x86() {
        let out = run(create_x86);
        assert_eq!(out.shape(), &Shape::matrix(2, 2));
        // [1+3, 2+3] and [4+6, 5+6], plus bias.
        assert_eq!(out.as_f32_slice(), &[4.5, 4.5, 10.5, 10.5]);
        assert_eq!(out.target(), Target::X86);
    }

    #[test]
    fn test_fc_arm_matches_x86() {
        let arm = run(create_arm);
        assert_eq!(arm, run(create_x86));
        assert_eq!(arm.target(), Target::Arm);
    }

    #[test]
    fn test_fc_shape_mismatch() {
        let x = Variable::Tensor(Tensor::zeros(Shape::matrix(2, 4), DType::F32));
        let w = Variable::Tensor(Tensor::zeros(Shape::matrix(3, 2), DType::F32));
        let mut k = create_x86(&OpDesc::new("fc"), &KernelOptions::default()).unwrap();
        let mut args = KernelArgs::new("fc");
        args.bind_input("Input", &x);
        args.bind_input("W", &w);
        args.bind_output("Out", Variable::default());
        assert!(matches!(k.dispatch(&mut args), Err(KernelError::Tensor(_))));
    }
}
