// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use super::CHANNEL_AXIS;
use crate::builtin::ConcatKernel;
use crate::KernelError;
use tensor_core::{Tensor, TensorView};

/// Last stage: joins per-group outputs back along the channel axis.
#[derive(Debug, Clone)]
pub struct ConcatPe {
    kernel: ConcatKernel,
}

impl Default for ConcatPe {
    fn default() -> Self {
        Self {
            kernel: ConcatKernel::new(CHANNEL_AXIS),
        }
    }
}

impl ConcatPe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(&self, parts: &[Tensor], out: &mut Tensor) -> Result<(), KernelError> {
        let views: Vec<TensorView<'_>> = parts.iter().map(Tensor::view).collect();
        self.kernel.concat_into(&views, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Shape;

    #[test]
    fn test_joins_along_channels() {
        let a = Tensor::from_f32(Shape::new(vec![1, 2, 1, 1]), &[1.0, 2.0]).unwrap();
        let b = Tensor::from_f32(Shape::new(vec![1, 1, 1, 1]), &[3.0]).unwrap();
        let mut out = Tensor::empty();
        ConcatPe::new().run(&[a, b], &mut out).unwrap();
        assert_eq!(out.shape(), &Shape::new(vec![1, 3, 1, 1]));
        assert_eq!(out.as_f32_slice(), &[1.0, 2.0, 3.0]);
    }
}
