// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Explicit conversion operators: `io_copy`, `calib` and `layout`.
//!
//! These are the same transformations the executor applies implicitly,
//! exposed as operators so an optimized program can carry them.

use super::ANY;
use crate::convert;
use crate::{Kernel, KernelArgs, KernelError, KernelOptions};
use model_ir::OpDesc;
use std::str::FromStr;
use tensor_core::{DataLayout, Place, Precision, Target};

fn parse_attr<T: FromStr>(op: &OpDesc, name: &str) -> Result<T, KernelError> {
    let value = op
        .attr(name)
        .ok_or_else(|| KernelError::MissingAttribute {
            op: op.op_type.clone(),
            name: name.to_string(),
        })?;
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| KernelError::InvalidAttribute {
            op: op.op_type.clone(),
            name: name.to_string(),
            detail: format!("cannot parse {value:?}"),
        })
}

macro_rules! conversion_kernel {
    ($(#[$doc:meta])* $kernel:ident, $name:literal, $field:ident: $ty:ty, |$t:ident, $v:ident| $body:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy)]
        pub struct $kernel {
            $field: $ty,
        }

        impl $kernel {
            pub fn new($field: $ty) -> Self {
                Self { $field }
            }
        }

        impl Kernel for $kernel {
            fn name(&self) -> &str {
                $name
            }

            fn place(&self) -> Place {
                ANY
            }

            fn converts_inputs(&self) -> bool {
                false
            }

            fn dispatch(&mut self, args: &mut KernelArgs<'_>) -> Result<(), KernelError> {
                let (ins, outs) = args.split_mut();
                let $t = ins.input("X")?;
                let $v = self.$field;
                let converted = $body;
                *outs.output_mut("Out")? = converted;
                Ok(())
            }
        }
    };
}

conversion_kernel!(
    /// Moves `X` into the memory of `target`.
    IoCopyKernel, "io_copy_any", target: Target,
    |x, target| convert::io_copy(x, target)
);

conversion_kernel!(
    /// Casts `X` to a float `precision`.
    CalibKernel, "calib_any", precision: Precision,
    |x, precision| convert::calib(x, precision)?
);

conversion_kernel!(
    /// Transposes a 4-D `X` to `layout`.
    LayoutKernel, "layout_any", layout: DataLayout,
    |x, layout| convert::layout(x, layout)?
);

pub(crate) fn create_io_copy(op: &OpDesc, _: &KernelOptions) -> Result<Box<dyn Kernel>, KernelError> {
    Ok(Box::new(IoCopyKernel::new(parse_attr(op, "target")?)))
}

pub(crate) fn create_calib(op: &OpDesc, _: &KernelOptions) -> Result<Box<dyn Kernel>, KernelError> {
    Ok(Box::new(CalibKernel::new(parse_attr(op, "precision")?)))
}

pub(crate) fn create_layout(op: &OpDesc, _: &KernelOptions) -> Result<Box<dyn Kernel>, KernelError> {
    Ok(Box::new(LayoutKernel::new(parse_attr(op, "layout")?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::{Attribute, Variable};
    use tensor_core::{DType, DataLocation, Shape, Tensor};

    fn run(kernel: &mut dyn Kernel, x: &Variable) -> Tensor {
        let mut args = KernelArgs::new("convert");
        args.bind_input("X", x);
        args.bind_output("Out", Variable::default());
        assert!(convert::apply_implicit_conversions(kernel, &mut args).unwrap().is_empty());
        kernel.dispatch(&mut args).unwrap();
        let mut outs = args.into_outputs();
        outs.remove("Out").unwrap().remove(0).as_tensor().unwrap().clone()
    }

    fn nchw() -> Variable {
        let v: Vec<f32> = (0..8).map(|i| i as f32).collect();
        Variable::Tensor(Tensor::from_f32(Shape::new(vec![1, 2, 2, 2]), &v).unwrap())
    }

    #[test]
    fn test_io_copy_round_trip() {
        let op = OpDesc::new("io_copy").with_attr("target", Attribute::String("fpga".into()));
        let mut to_dev = create_io_copy(&op, &KernelOptions::default()).unwrap();
        let dev = Variable::Tensor(run(to_dev.as_mut(), &nchw()));
        assert_eq!(dev.as_tensor().unwrap().location(), DataLocation::Device);

        let mut to_host = IoCopyKernel::new(Target::Host);
        let back = run(&mut to_host, &dev);
        assert_eq!(back.location(), DataLocation::Host);
        assert_eq!(&back, nchw().as_tensor().unwrap());
    }

    #[test]
    fn test_calib_and_layout() {
        let mut calib = CalibKernel::new(Precision::Fp16);
        assert_eq!(run(&mut calib, &nchw()).dtype(), DType::F16);

        let mut layout = LayoutKernel::new(DataLayout::Nhwc);
        let t = run(&mut layout, &nchw());
        assert_eq!(t.layout(), DataLayout::Nhwc);
        assert_eq!(t.as_f32_slice(), &[0.0, 4.0, 1.0, 5.0, 2.0, 6.0, 3.0, 7.0]);
    }

    #[test]
    fn test_bad_attributes() {
        let missing = OpDesc::new("calib");
        assert!(matches!(
            create_calib(&missing, &KernelOptions::default()),
            Err(KernelError::MissingAttribute { .. })
        ));
        let bad = OpDesc::new("layout").with_attr("layout", Attribute::String("ncwh".into()));
        assert!(matches!(
            create_layout(&bad, &KernelOptions::default()),
            Err(KernelError::InvalidAttribute { .. })
        ));
    }
}
