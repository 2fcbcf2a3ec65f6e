// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor arithmetic operations.
//!
//! Each operation writes into a pre-shaped output so kernels can size
//! their outputs once in `init` and reuse them across runs. Shape helpers
//! (`*_output_shape`) compute what that pre-shaping should be.

mod activation_op;
mod convert_op;
mod depthwise_op;
mod fc_op;
mod matmul_op;
mod split_concat_op;

pub use activation_op::relu;
pub use convert_op::{cast, transpose_layout};
pub use depthwise_op::{depthwise_conv2d, depthwise_output_shape, Conv2dParams};
pub use fc_op::{fc, fc_output_shape};
pub use matmul_op::{matmul, MatmulAlgo};
pub use split_concat_op::{concat, concat_output_shape, split, split_views};
