// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Predictor I/O: `feed` copies a caller-provided tensor into the graph,
//! `fetch` copies a result out. Both address a tensor list by `col`.

use super::HOST_ANY;
use crate::kernel::attr_usize;
use crate::{Kernel, KernelArgs, KernelError, KernelOptions};
use model_ir::OpDesc;
use tensor_core::{Place, Tensor};

/// `Out = X[col]` where `X` is the feed list.
#[derive(Debug)]
pub struct FeedKernel {
    col: usize,
}

/// `Out[col] = X` where `Out` is the fetch list.
#[derive(Debug)]
pub struct FetchKernel {
    col: usize,
}

pub(crate) fn create_feed(op: &OpDesc, _: &KernelOptions) -> Result<Box<dyn Kernel>, KernelError> {
    Ok(Box::new(FeedKernel {
        col: attr_usize(op, "col", Some(0))?,
    }))
}

pub(crate) fn create_fetch(op: &OpDesc, _: &KernelOptions) -> Result<Box<dyn Kernel>, KernelError> {
    Ok(Box::new(FetchKernel {
        col: attr_usize(op, "col", Some(0))?,
    }))
}

impl Kernel for FeedKernel {
    fn name(&self) -> &str {
        "feed_host"
    }

    fn place(&self) -> Place {
        HOST_ANY
    }

    fn dispatch(&mut self, args: &mut KernelArgs<'_>) -> Result<(), KernelError> {
        let (ins, outs) = args.split_mut();
        let src = ins
            .input_list("X")?
            .get(self.col)
            .ok_or_else(|| KernelError::MissingInput {
                op: "feed".into(),
                slot: format!("X[{}]", self.col),
            })?;
        *outs.output_mut("Out")? = src.clone();
        Ok(())
    }
}

impl Kernel for FetchKernel {
    fn name(&self) -> &str {
        "fetch_host"
    }

    fn place(&self) -> Place {
        HOST_ANY
    }

    fn dispatch(&mut self, args: &mut KernelArgs<'_>) -> Result<(), KernelError> {
        let (ins, outs) = args.split_mut();
        let value = ins.input("X")?;
        let list = outs.output_list_mut("Out")?;
        if list.len() <= self.col {
            list.resize_with(self.col + 1, Tensor::empty);
        }
        list[self.col] = value.clone();
        Ok(())
    }
}
