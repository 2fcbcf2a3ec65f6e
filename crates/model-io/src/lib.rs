// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-io
//!
//! Loading and saving lite-rt programs together with their weights.
//!
//! Two on-disk formats are supported:
//! - [`structured`]: a JSON program plus binary parameter records, either
//!   one file per weight or all weights in a single combined file.
//! - [`naive`]: a compact pair of little-endian streams that can be read
//!   from files or from memory.
//!
//! Both formats write only persistable variables, write them in ascending
//! name order, and produce byte-identical output for identical input.
//!
//! # Example
//!
//! ```
//! use model_io::{load_naive, naive, NaiveSource};
//! use model_ir::{OpDesc, Program, Scope, VarDesc};
//! use tensor_core::{DType, Shape, Tensor};
//!
//! let program = Program::new(
//!     vec![VarDesc::persistable("w", DType::F32), VarDesc::new("y", DType::F32)],
//!     vec![OpDesc::new("relu").with_input("X", ["w"]).with_output("Out", ["y"])],
//! )
//! .validate()
//! .unwrap();
//! let mut scope = Scope::new();
//! scope.insert("w", Tensor::from_f32(Shape::vector(2), &[1.0, -1.0]).unwrap());
//!
//! let buffers = naive::encode(&program, &scope).unwrap();
//! let (loaded, params) = load_naive(&NaiveSource::from(buffers)).unwrap();
//! assert_eq!(loaded, program);
//! assert_eq!(params.find_tensor("w").unwrap().as_f32_slice(), &[1.0, -1.0]);
//! ```

pub mod byte_source;
mod codec;
mod error;
pub mod naive;
mod params;
pub mod structured;

pub use byte_source::{ByteSource, MemorySource, MmapSource};
pub use error::ModelIoError;
pub use naive::{load_naive, load_param_naive, save_naive, save_param_naive, NaiveBuffers, NaiveSource};
pub use structured::{load_param, load_program, load_structured, save_structured, StructuredSource};
