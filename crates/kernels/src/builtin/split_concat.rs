// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `split` and `concat` kernels.
//!
//! Besides serving the graph operators, instances of both are the first
//! and last stage of every PE-decomposed kernel.

use super::{prepare_output, ANY};
use crate::kernel::{attr_usize, attr_usizes};
use crate::{Kernel, KernelArgs, KernelError, KernelOptions};
use model_ir::OpDesc;
use tensor_core::{ops, Place, Tensor, TensorView};

/// The pieces a split produced.
#[derive(Debug)]
pub enum SplitParts<'a> {
    /// Contiguous sections borrowed from the input.
    Views(Vec<TensorView<'a>>),
    /// Sections that had to be gathered into new tensors.
    Owned(Vec<Tensor>),
}

impl SplitParts<'_> {
    pub fn len(&self) -> usize {
        match self {
            Self::Views(v) => v.len(),
            Self::Owned(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_borrowed(&self) -> bool {
        matches!(self, Self::Views(_))
    }

    /// Views over every part, whichever way it is stored.
    pub fn views(&self) -> Vec<TensorView<'_>> {
        match self {
            Self::Views(v) => v.clone(),
            Self::Owned(v) => v.iter().map(Tensor::view).collect(),
        }
    }
}

/// Splits `X` along `axis` into one output per entry of `sections`.
///
/// With no `sections` attribute, `num` equal sections are produced.
#[derive(Debug, Clone)]
pub struct SplitKernel {
    axis: usize,
    sections: Vec<usize>,
    num: usize,
}

impl SplitKernel {
    pub fn new(axis: usize, sections: Vec<usize>) -> Self {
        Self {
            axis,
            num: sections.len(),
            sections,
        }
    }

    pub fn axis(&self) -> usize {
        self.axis
    }

    pub fn sections(&self) -> &[usize] {
        &self.sections
    }

    /// Splits `input`, borrowing when the sections are contiguous.
    pub fn split<'a>(&self, input: &TensorView<'a>) -> Result<SplitParts<'a>, KernelError> {
        if let Some(views) = ops::split_views(input, self.axis, &self.sections)? {
            return Ok(SplitParts::Views(views));
        }
        Ok(SplitParts::Owned(ops::split(input, self.axis, &self.sections)?))
    }

    fn resolve_sections(&mut self, dim: usize) -> Result<(), KernelError> {
        if !self.sections.is_empty() {
            return Ok(());
        }
        if self.num == 0 || dim % self.num != 0 {
            return Err(KernelError::ShapeMismatch {
                op: "split".into(),
                detail: format!("axis of size {dim} cannot be split into {} parts", self.num),
            });
        }
        self.sections = vec![dim / self.num; self.num];
        Ok(())
    }
}

/// Concatenates every tensor bound to `X` along `axis`.
#[derive(Debug, Clone)]
pub struct ConcatKernel {
    axis: usize,
}

impl ConcatKernel {
    pub fn new(axis: usize) -> Self {
        Self { axis }
    }

    pub fn axis(&self) -> usize {
        self.axis
    }

    /// Reshapes `out` and fills it with the concatenation of `inputs`.
    pub fn concat_into(&self, inputs: &[TensorView<'_>], out: &mut Tensor) -> Result<(), KernelError> {
        let shape = ops::concat_output_shape(inputs, self.axis)?;
        prepare_output(out, shape, inputs[0].dtype());
        ops::concat(inputs, self.axis, out)?;
        out.set_layout(inputs[0].layout());
        Ok(())
    }
}

pub(crate) fn create_split(op: &OpDesc, _: &KernelOptions) -> Result<Box<dyn Kernel>, KernelError> {
    let axis = attr_usize(op, "axis", Some(0))?;
    let kernel = match attr_usizes(op, "sections")? {
        Some(sections) if !sections.is_empty() => SplitKernel::new(axis, sections),
        _ => SplitKernel {
            axis,
            sections: Vec::new(),
            num: attr_usize(op, "num", Some(op.output("Out").len()))?,
        },
    };
    Ok(Box::new(kernel))
}

pub(crate) fn create_concat(op: &OpDesc, _: &KernelOptions) -> Result<Box<dyn Kernel>, KernelError> {
    Ok(Box::new(ConcatKernel::new(attr_usize(op, "axis", Some(0))?)))
}

impl Kernel for SplitKernel {
    fn name(&self) -> &str {
        "split_any"
    }

    fn place(&self) -> Place {
        ANY
    }

    fn init(&mut self, args: &KernelArgs<'_>) -> Result<(), KernelError> {
        let x = args.input("X")?;
        let dim = x.shape().dim(self.axis).ok_or_else(|| KernelError::ShapeMismatch {
            op: "split".into(),
            detail: format!("axis {} out of range for {}", self.axis, x.shape()),
        })?;
        self.resolve_sections(dim)
    }

    fn dispatch(&mut self, args: &mut KernelArgs<'_>) -> Result<(), KernelError> {
        let (ins, outs) = args.split_mut();
        let x = ins.input("X")?;
        let parts = ops::split(&x.view(), self.axis, &self.sections)?;
        let targets = outs.output_all_mut("Out")?;
        if targets.len() != parts.len() {
            return Err(KernelError::ShapeMismatch {
                op: "split".into(),
                detail: format!("{} sections for {} outputs", parts.len(), targets.len()),
            });
        }
        for (out, mut part) in targets.into_iter().zip(parts) {
            part.copy_placement_from(x);
            *out = part;
        }
        Ok(())
    }
}

impl Kernel for ConcatKernel {
    fn name(&self) -> &str {
        "concat_any"
    }

    fn place(&self) -> Place {
        ANY
    }

    fn dispatch(&mut self, args: &mut KernelArgs<'_>) -> Result<(), KernelError> {
        let (ins, outs) = args.split_mut();
        let xs = ins.input_all("X")?;
        let views: Vec<TensorView<'_>> = xs.iter().map(|t| t.view()).collect();
        let out = outs.output_mut("Out")?;
        self.concat_into(&views, out)?;
        out.set_target(xs[0].target());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::{Attribute, Variable};
    use tensor_core::Shape;

    fn arange(shape: Shape) -> Tensor {
        let n = shape.num_elements();
        let v: Vec<f32> = (0..n).map(|i| i as f32).collect();
        Tensor::from_f32(shape, &v).unwrap()
    }

    #[test]
    fn test_split_borrows_when_contiguous() {
        let t = arange(Shape::new(vec![1, 6, 2]));
        let view = t.view();
        let parts = SplitKernel::new(1, vec![4, 2]).split(&view).unwrap();
        assert!(parts.is_borrowed());
        assert_eq!(parts.views()[1].as_f32_slice(), &[8.0, 9.0, 10.0, 11.0]);

        let t2 = arange(Shape::new(vec![2, 6, 2]));
        let parts = SplitKernel::new(1, vec![4, 2]).split(&t2.view()).unwrap();
        assert!(!parts.is_borrowed());
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_split_then_concat_kernels() {
        let x = Variable::Tensor(arange(Shape::new(vec![2, 5])));
        let op = OpDesc::new("split")
            .with_output("Out", ["a", "b"])
            .with_attr("axis", Attribute::Int(1))
            .with_attr("sections", Attribute::Ints(vec![2, 3]));
        let mut split = create_split(&op, &KernelOptions::default()).unwrap();
        let mut args = KernelArgs::new("split");
        args.bind_input("X", &x);
        args.bind_output("Out", Variable::default());
        args.bind_output("Out", Variable::default());
        split.init(&args).unwrap();
        split.dispatch(&mut args).unwrap();
        let parts = args.into_outputs().remove("Out").unwrap();
        assert_eq!(parts[0].as_tensor().unwrap().as_f32_slice(), &[0.0, 1.0, 5.0, 6.0]);

        let mut concat = ConcatKernel::new(1);
        let mut args = KernelArgs::new("concat");
        for p in &parts {
            args.bind_input("X", p);
        }
        args.bind_output("Out", Variable::default());
        concat.dispatch(&mut args).unwrap();
        let out = args.into_outputs().remove("Out").unwrap().remove(0);
        assert_eq!(&out, &x);
    }

    #[test]
    fn test_split_equal_parts_from_num() {
        let x = Variable::Tensor(arange(Shape::vector(6)));
        let op = OpDesc::new("split")
            .with_output("Out", ["a", "b", "c"])
            .with_attr("num", Attribute::Int(3));
        let mut split = create_split(&op, &KernelOptions::default()).unwrap();
        let mut args = KernelArgs::new("split");
        args.bind_input("X", &x);
        for _ in 0..3 {
            args.bind_output("Out", Variable::default());
        }
        split.init(&args).unwrap();
        split.dispatch(&mut args).unwrap();
        let parts = args.into_outputs().remove("Out").unwrap();
        assert_eq!(parts[2].as_tensor().unwrap().as_f32_slice(), &[4.0, 5.0]);
    }

    #[test]
    fn test_split_num_must_divide() {
        let x = Variable::Tensor(arange(Shape::vector(5)));
        let op = OpDesc::new("split").with_attr("num", Attribute::Int(2));
        let mut split = create_split(&op, &KernelOptions::default()).unwrap();
        let mut args = KernelArgs::new("split");
        args.bind_input("X", &x);
        assert!(matches!(split.init(&args), Err(KernelError::ShapeMismatch { .. })));
    }
}
