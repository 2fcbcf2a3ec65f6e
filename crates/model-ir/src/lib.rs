// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! The program representation and runtime variable storage for lite-rt.
//!
//! - [`Program`]: operators in execution order plus their variable
//!   declarations, with a **type-state pattern** (`Unchecked` → `Validated`).
//! - [`OpDesc`] / [`VarDesc`]: operator and variable records.
//! - [`Attribute`]: the typed operator attribute values.
//! - [`Scope`] / [`Variable`]: owned, hierarchical variable maps that the
//!   executor reads from and writes to.
//!
//! # Example
//! ```
//! use model_ir::{OpDesc, Program, VarDesc};
//! use tensor_core::DType;
//!
//! let program = Program::new(
//!     vec![VarDesc::new("x", DType::F32), VarDesc::new("y", DType::F32)],
//!     vec![OpDesc::new("relu").with_input("X", ["x"]).with_output("Out", ["y"])],
//! )
//! .validate()
//! .unwrap();
//! println!("{}", program.summary());
//! ```

mod attribute;
mod error;
mod op_desc;
pub mod program;
mod scope;

pub use attribute::Attribute;
pub use error::ModelError;
pub use op_desc::{OpDesc, VarDesc};
pub use program::{Program, ProgramState, Unchecked, Validated};
pub use scope::{Scope, Variable};
