// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use super::{ChannelPartition, CHANNEL_AXIS};
use crate::builtin::{SplitKernel, SplitParts};
use crate::KernelError;
use tensor_core::TensorView;

/// First stage: cuts the input's channels into the partition's groups.
#[derive(Debug, Clone)]
pub struct SplitPe {
    kernel: SplitKernel,
}

impl SplitPe {
    pub fn new(partition: &ChannelPartition) -> Self {
        Self {
            kernel: SplitKernel::new(CHANNEL_AXIS, partition.sections().to_vec()),
        }
    }

    /// Splits `input`; groups are borrowed when the batch is 1.
    pub fn run<'a>(&self, input: &TensorView<'a>) -> Result<SplitParts<'a>, KernelError> {
        self.kernel.split(input)
    }

    pub fn sections(&self) -> &[usize] {
        self.kernel.sections()
    }
}
