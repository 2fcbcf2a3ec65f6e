// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # kernels
//!
//! Place-keyed kernel selection for the lite-rt inference core.
//!
//! This crate provides:
//! - [`KernelRegistry`]: maps an operator type and a requested
//!   [`Place`](tensor_core::Place) to the best registered implementation.
//! - [`Kernel`] and [`KernelArgs`]: the trait every implementation
//!   satisfies and the input/output binding it runs against.
//! - [`convert`]: implicit `io_copy`, `calib` and `layout` conversions
//!   applied when a producer's output does not suit a consumer.
//! - [`pe`]: processing-element decomposition of wide device operators.
//! - [`builtin`]: the kernels registered by [`register_builtin_kernels`].
//!
//! # Example
//!
//! ```
//! use kernels::KernelRegistry;
//! use tensor_core::{Place, Precision, Target};
//!
//! let registry = KernelRegistry::with_builtins().unwrap();
//! let entry = registry.select("fc", &Place::new(Target::X86, Precision::Float)).unwrap();
//! assert_eq!(entry.name, "fc_x86");
//! ```

pub mod builtin;
pub mod convert;
mod error;
mod kernel;
pub mod pe;
mod registry;

pub use builtin::register_builtin_kernels;
pub use error::KernelError;
pub use kernel::{Kernel, KernelArgs, KernelFactory, KernelInputs, KernelOptions, KernelOutputs};
pub use registry::{KernelEntry, KernelRegistry};
