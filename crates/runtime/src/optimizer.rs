// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Place assignment.
//!
//! Every operator is given the first place, in preference order, that some
//! registered kernel can serve:
//!
//! 1. the preferred place,
//! 2. each valid place in the order given,
//! 3. `host/any/any`, which the I/O operators are registered at.

use crate::RuntimeError;
use kernels::{KernelError, KernelRegistry};
use model_ir::{Program, Validated};
use tensor_core::{DataLayout, Place, Precision, Target};

/// Last-resort candidate for operators that only run on the host.
pub const HOST_FALLBACK: Place = Place::with_layout(Target::Host, Precision::Any, DataLayout::Any);

/// Assigns a place to every operator of a program.
#[derive(Debug, Clone)]
pub struct Optimizer {
    candidates: Vec<Place>,
    keep_assigned: bool,
}

impl Optimizer {
    pub fn new(preferred: Place, valid: &[Place]) -> Self {
        let mut candidates = vec![preferred];
        for place in valid.iter().chain(std::iter::once(&HOST_FALLBACK)) {
            if !candidates.contains(place) {
                candidates.push(*place);
            }
        }
        Self {
            candidates,
            keep_assigned: false,
        }
    }

    /// Leaves operators that already carry a servable place untouched.
    pub fn keep_assigned(mut self, keep: bool) -> Self {
        self.keep_assigned = keep;
        self
    }

    /// Candidate places in the order they are tried.
    pub fn candidates(&self) -> &[Place] {
        &self.candidates
    }

    /// Places every operator of `program`.
    ///
    /// # Errors
    /// [`RuntimeError::Prepare`] naming the first operator no candidate
    /// can serve.
    pub fn run(&self, program: &mut Program<Validated>, registry: &KernelRegistry) -> Result<(), RuntimeError> {
        let mut kept = 0;
        for index in 0..program.num_ops() {
            let Some(op) = program.op(index) else { break };
            if self.keep_assigned {
                if let Some(place) = op.place.filter(|p| registry.has_kernel(&op.op_type, p)) {
                    tracing::debug!(index, op = %op.op_type, %place, "keeping recorded place");
                    kept += 1;
                    continue;
                }
            }
            let place = self
                .candidates
                .iter()
                .find(|p| registry.has_kernel(&op.op_type, p))
                .copied()
                .ok_or_else(|| RuntimeError::Prepare {
                    index,
                    op_type: op.op_type.clone(),
                    source: KernelError::NoCompatibleKernel {
                        op_type: op.op_type.clone(),
                        place: self.candidates[0],
                    },
                })?;
            tracing::debug!(index, op = %op.op_type, %place, "assigned place");
            program.assign_place(index, place)?;
        }
        tracing::info!(
            ops = program.num_ops(),
            kept,
            candidates = self.candidates.len(),
            "place assignment complete"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::{OpDesc, VarDesc};
    use tensor_core::DType;

    const X86: Place = Place::new(Target::X86, Precision::Float);
    const ARM: Place = Place::new(Target::Arm, Precision::Float);
    const FPGA: Place = Place::new(Target::Fpga, Precision::Fp16);

    fn program() -> Program<Validated> {
        let vars = vec![
            VarDesc::new("feed", DType::F32),
            VarDesc::new("x", DType::F32),
            VarDesc::persistable("f", DType::F32),
            VarDesc::new("y", DType::F32),
            VarDesc::new("z", DType::F32),
        ];
        let ops = vec![
            OpDesc::new("feed").with_input("X", ["feed"]).with_output("Out", ["x"]),
            OpDesc::new("depthwise_conv2d")
                .with_input("Input", ["x"])
                .with_input("Filter", ["f"])
                .with_output("Output", ["y"]),
            OpDesc::new("relu").with_input("X", ["y"]).with_output("Out", ["z"]),
        ];
        Program::new(vars, ops).validate().unwrap()
    }

    fn places(p: &Program<Validated>) -> Vec<Option<Place>> {
        p.ops().iter().map(|o| o.place).collect()
    }

    #[test]
    fn test_preferred_then_valid_then_host() {
        let registry = KernelRegistry::with_builtins().unwrap();
        let mut p = program();
        Optimizer::new(FPGA, &[X86]).run(&mut p, &registry).unwrap();
        assert_eq!(places(&p), vec![Some(HOST_FALLBACK), Some(FPGA), Some(X86)]);
    }

    #[test]
    fn test_unservable_op() {
        let registry = KernelRegistry::with_builtins().unwrap();
        let mut p = program();
        let err = Optimizer::new(ARM, &[]).run(&mut p, &registry).unwrap_err();
        assert!(matches!(err, RuntimeError::Prepare { index: 1, .. }), "{err}");
    }

    #[test]
    fn test_keep_assigned() {
        let registry = KernelRegistry::with_builtins().unwrap();
        let mut p = program();
        p.assign_place(1, X86).unwrap();
        Optimizer::new(FPGA, &[ARM]).keep_assigned(true).run(&mut p, &registry).unwrap();
        assert_eq!(places(&p), vec![Some(HOST_FALLBACK), Some(X86), Some(ARM)]);

        let mut fresh = program();
        fresh.assign_place(1, X86).unwrap();
        Optimizer::new(FPGA, &[ARM]).run(&mut fresh, &registry).unwrap();
        assert_eq!(fresh.ops()[1].place, Some(FPGA));
    }

    #[test]
    fn test_candidates_deduplicated() {
        let o = Optimizer::new(X86, &[X86, ARM, HOST_FALLBACK]);
        assert_eq!(o.candidates(), &[X86, ARM, HOST_FALLBACK]);
    }
}
