// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Tensor types, places and numeric operations for the lite-rt inference core.
//!
//! This crate provides:
//! - [`Tensor`]: an n-dimensional tensor over an aligned [`Buffer`], tagged
//!   with its target, layout, optional [`Lod`] and device residency.
//! - [`Place`]: the (target, precision, layout) triple kernels are keyed by,
//!   with wildcard compatibility and match scoring.
//! - [`Shape`] and [`DType`]: dimension and element-type descriptors.
//! - [`ops`]: fully-connected, split/concat, depthwise convolution,
//!   precision casts and layout transposes.
//!
//! # Design Goals
//! - Zero-copy views wherever the layout allows.
//! - Sound typed access: buffers are word-aligned and cast with `bytemuck`.
//! - Clean error types via `thiserror`.

mod buffer;
mod dtype;
mod error;
mod lod;
pub mod ops;
mod place;
mod shape;
mod tensor;

pub use buffer::Buffer;
pub use dtype::{DType, Element};
pub use error::TensorError;
pub use lod::Lod;
pub use place::{DataLayout, Place, Precision, Target};
pub use shape::Shape;
pub use tensor::{DataLocation, Tensor, TensorView};

pub use half::f16;
