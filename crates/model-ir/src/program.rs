// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Program: the immutable operator sequence plus its variable declarations.
//!
//! # Type-State Pattern
//!
//! ```text
//! Program<Unchecked>   ops and vars as parsed or built.
//!       │  .validate()
//!       ▼
//! Program<Validated>   every reference resolved, ready for execution.
//! ```
//!
//! Executors and savers only accept `Program<Validated>`, so a program with
//! a dangling reference never reaches a kernel.

use crate::{ModelError, OpDesc, VarDesc};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tensor_core::Place;

// ── Type-state markers ─────────────────────────────────────────────

/// Marker: program has been built or parsed but not checked.
#[derive(Debug, Clone)]
pub struct Unchecked;

/// Marker: program references are consistent.
#[derive(Debug, Clone)]
pub struct Validated;

/// Sealed trait for program states.
pub trait ProgramState: fmt::Debug + Clone {}
impl ProgramState for Unchecked {}
impl ProgramState for Validated {}

// ── Program ────────────────────────────────────────────────────────

/// An ordered operator list and the variables it uses.
#[derive(Debug, Clone)]
pub struct Program<S: ProgramState = Unchecked> {
    vars: Vec<VarDesc>,
    ops: Vec<OpDesc>,
    _state: std::marker::PhantomData<S>,
}

impl<S: ProgramState> Program<S> {
    /// Operators in execution order.
    pub fn ops(&self) -> &[OpDesc] {
        &self.ops
    }

    /// Variable declarations in declaration order.
    pub fn vars(&self) -> &[VarDesc] {
        &self.vars
    }

    pub fn var(&self, name: &str) -> Option<&VarDesc> {
        self.vars.iter().find(|v| v.name == name)
    }

    /// Persistable declarations sorted by name, the order params are saved in.
    pub fn persistable_vars(&self) -> Vec<&VarDesc> {
        let mut out: Vec<&VarDesc> = self.vars.iter().filter(|v| v.persistable).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    /// Returns a one-line description of the program.
    pub fn summary(&self) -> String {
        let persistable = self.vars.iter().filter(|v| v.persistable).count();
        let placed = self.ops.iter().filter(|o| o.place.is_some()).count();
        format!(
            "Program: {} ops ({} placed), {} vars ({} persistable)",
            self.ops.len(),
            placed,
            self.vars.len(),
            persistable,
        )
    }

    /// Drops the validation marker, e.g. to edit ops before re-checking.
    pub fn into_parts(self) -> (Vec<VarDesc>, Vec<OpDesc>) {
        (self.vars, self.ops)
    }
}

// ── Unchecked state ────────────────────────────────────────────────

impl Program<Unchecked> {
    pub fn new(vars: Vec<VarDesc>, ops: Vec<OpDesc>) -> Self {
        Self {
            vars,
            ops,
            _state: std::marker::PhantomData,
        }
    }

    /// Checks references and transitions to the `Validated` state.
    ///
    /// # Checks
    /// - Variable names are unique.
    /// - Every input is declared or produced by an earlier operator. A
    ///   transient variable first produced by a later operator is a forward
    ///   reference.
    /// - No operator writes one of its own inputs.
    pub fn validate(self) -> Result<Program<Validated>, ModelError> {
        let mut declared: HashMap<&str, &VarDesc> = HashMap::with_capacity(self.vars.len());
        for v in &self.vars {
            if declared.insert(v.name.as_str(), v).is_some() {
                return Err(ModelError::DuplicateVariable(v.name.clone()));
            }
        }

        // First operator index writing each name.
        let mut first_writer: HashMap<&str, usize> = HashMap::new();
        for (i, op) in self.ops.iter().enumerate() {
            for name in op.output_names() {
                first_writer.entry(name).or_insert(i);
            }
        }

        let mut produced: HashSet<&str> = HashSet::new();
        for (i, op) in self.ops.iter().enumerate() {
            let invalid = |detail: String| ModelError::InvalidProgram {
                index: i,
                op_type: op.op_type.clone(),
                detail,
            };

            for name in op.input_names() {
                if produced.contains(name) {
                    continue;
                }
                match declared.get(name) {
                    None => {
                        return Err(invalid(format!("input '{name}' is not declared")));
                    }
                    Some(v) if !v.persistable && first_writer.get(name).is_some_and(|&w| w >= i) => {
                        return Err(invalid(format!(
                            "input '{name}' is only produced by a later operator"
                        )));
                    }
                    Some(_) => {}
                }
            }

            for name in op.output_names() {
                if op.input_names().any(|n| n == name) {
                    return Err(invalid(format!("operator writes its own input '{name}'")));
                }
                if !declared.contains_key(name) {
                    tracing::warn!(op = i, op_type = %op.op_type, "output '{name}' is not declared");
                }
                produced.insert(name);
            }
        }

        Ok(Program {
            vars: self.vars,
            ops: self.ops,
            _state: std::marker::PhantomData,
        })
    }
}

// ── Validated state ────────────────────────────────────────────────

impl Program<Validated> {
    /// Records the place chosen for operator `index`.
    ///
    /// Places do not affect references, so the program stays validated.
    pub fn assign_place(&mut self, index: usize, place: Place) -> Result<(), ModelError> {
        let count = self.ops.len();
        let op = self.ops.get_mut(index).ok_or_else(|| ModelError::InvalidProgram {
            index,
            op_type: String::new(),
            detail: format!("no operator at index {index} (program has {count})"),
        })?;
        op.place = Some(place);
        Ok(())
    }

    pub fn op(&self, index: usize) -> Option<&OpDesc> {
        self.ops.get(index)
    }
}

// ── Shared implementations ─────────────────────────────────────────

impl<S: ProgramState> fmt::Display for Program<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for (i, op) in self.ops.iter().enumerate() {
            let place = op.place.map_or_else(|| "-".to_string(), |p| p.to_string());
            writeln!(f, "  [{i}] {} @ {place}", op.op_type)?;
        }
        Ok(())
    }
}

impl<A: ProgramState, B: ProgramState> PartialEq<Program<B>> for Program<A> {
    fn eq(&self, other: &Program<B>) -> bool {
        self.vars == other.vars && self.ops == other.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Attribute;
    use tensor_core::{DType, Precision, Target};

    fn fc_program() -> Program {
        Program::new(
            vec![
                VarDesc::new("x", DType::F32),
                VarDesc::persistable("w", DType::F32),
                VarDesc::new("y", DType::F32),
                VarDesc::new("z", DType::F32),
            ],
            vec![
                OpDesc::new("fc")
                    .with_input("Input", ["x"])
                    .with_input("W", ["w"])
                    .with_output("Out", ["y"])
                    .with_attr("in_num_col_dims", Attribute::Int(1)),
                OpDesc::new("relu")
                    .with_input("X", ["y"])
                    .with_output("Out", ["z"]),
            ],
        )
    }

    #[test]
    fn test_validate_ok() {
        let p = fc_program().validate().unwrap();
        assert_eq!(p.num_ops(), 2);
        assert_eq!(p.persistable_vars().len(), 1);
    }

    #[test]
    fn test_validate_duplicate_var() {
        let (mut vars, ops) = fc_program().into_parts();
        vars.push(VarDesc::new("x", DType::F32));
        let err = Program::new(vars, ops).validate().unwrap_err();
        assert!(matches!(err, ModelError::DuplicateVariable(n) if n == "x"));
    }

    #[test]
    fn test_validate_undeclared_input() {
        let (vars, mut ops) = fc_program().into_parts();
        ops[1] = OpDesc::new("relu")
            .with_input("X", ["ghost"])
            .with_output("Out", ["z"]);
        let err = Program::new(vars, ops).validate().unwrap_err();
        assert!(matches!(
            err,
            ModelError::InvalidProgram { index: 1, ref op_type, .. } if op_type == "relu"
        ));
    }

    #[test]
    fn test_validate_forward_reference() {
        let (vars, mut ops) = fc_program().into_parts();
        ops.swap(0, 1);
        let err = Program::new(vars, ops).validate().unwrap_err();
        assert!(matches!(err, ModelError::InvalidProgram { index: 0, .. }));
    }

    #[test]
    fn test_validate_in_place_write() {
        let vars = vec![VarDesc::new("a", DType::F32)];
        let ops = vec![OpDesc::new("relu")
            .with_input("X", ["a"])
            .with_output("Out", ["a"])];
        assert!(Program::new(vars, ops).validate().is_err());
    }

    #[test]
    fn test_persistable_vars_sorted() {
        let vars = vec![
            VarDesc::persistable("b", DType::F32),
            VarDesc::new("t", DType::F32),
            VarDesc::persistable("a", DType::I64),
        ];
        let p = Program::new(vars, vec![]).validate().unwrap();
        let names: Vec<_> = p.persistable_vars().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_assign_place_and_display() {
        let mut p = fc_program().validate().unwrap();
        p.assign_place(0, Place::new(Target::X86, Precision::Float)).unwrap();
        assert!(p.assign_place(9, Place::any()).is_err());
        let shown = p.to_string();
        assert!(shown.contains("[0] fc @ x86/float/nchw"));
        assert!(shown.contains("[1] relu @ -"));
        assert!(p.summary().contains("1 placed"));
    }

    #[test]
    fn test_equality_ignores_state() {
        let unchecked = fc_program();
        let validated = fc_program().validate().unwrap();
        assert!(unchecked == validated);
    }
}
