// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Sequential program execution against a scope.
//!
//! ```text
//! for each op, in program order:
//!   take outputs out of the scope ─┐
//!   borrow inputs through parents ─┼─► KernelArgs
//!   convert mismatched inputs     ─┘
//!   kernel.init → kernel.dispatch
//!   move outputs back into the scope
//! ```

use crate::{OpMetrics, RunMetrics, RuntimeError};
use kernels::convert::apply_implicit_conversions;
use kernels::{Kernel, KernelArgs, KernelError, KernelOptions, KernelRegistry};
use model_ir::{ModelError, OpDesc, Program, Scope, Validated};
use std::time::{Duration, Instant};
use tensor_core::{Place, Precision, Target};

/// Options fixed when an executor is prepared.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorOptions {
    /// Place requested for operators the program leaves unplaced.
    pub default_place: Place,
    /// Passed to every kernel factory.
    pub kernel: KernelOptions,
    /// Keep per-operator metrics.
    pub profile: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            default_place: Place::new(Target::X86, Precision::Float),
            kernel: KernelOptions::default(),
            profile: true,
        }
    }
}

/// An operator together with the kernel instance resolved for it.
struct PreparedOp {
    op: OpDesc,
    kernel: Box<dyn Kernel>,
}

/// Runs a prepared program.
///
/// Kernels are resolved once in [`Executor::prepare`] and reused by every
/// [`Executor::run`], so shape-dependent kernel state survives between runs.
pub struct Executor {
    ops: Vec<PreparedOp>,
    options: ExecutorOptions,
}

impl Executor {
    /// Resolves and instantiates one kernel per operator.
    pub fn prepare(
        program: &Program<Validated>,
        registry: &KernelRegistry,
        options: ExecutorOptions,
    ) -> Result<Self, RuntimeError> {
        let mut ops = Vec::with_capacity(program.num_ops());
        for (index, op) in program.ops().iter().enumerate() {
            let place = op.place.unwrap_or(options.default_place);
            let (kernel, entry) =
                registry
                    .create(op, &place, &options.kernel)
                    .map_err(|source| RuntimeError::Prepare {
                        index,
                        op_type: op.op_type.clone(),
                        source,
                    })?;
            tracing::debug!(index, op = %op.op_type, %place, kernel = entry.name, "prepared operator");
            ops.push(PreparedOp {
                op: op.clone(),
                kernel,
            });
        }
        tracing::info!(ops = ops.len(), "executor prepared");
        Ok(Self { ops, options })
    }

    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    /// `(op_type, kernel name, kernel place)` per operator.
    pub fn kernels(&self) -> impl Iterator<Item = (&str, &str, Place)> {
        self.ops
            .iter()
            .map(|p| (p.op.op_type.as_str(), p.kernel.name(), p.kernel.place()))
    }

    /// Executes every operator in program order.
    ///
    /// # Errors
    /// [`RuntimeError::OperatorFailed`] for the first failing operator.
    /// Outputs of operators that ran before it stay in `scope`.
    pub fn run(&mut self, scope: &mut Scope) -> Result<RunMetrics, RuntimeError> {
        let start = Instant::now();
        let mut metrics = RunMetrics::new();
        for (index, prepared) in self.ops.iter_mut().enumerate() {
            let op_metrics = run_op(index, prepared, scope).map_err(|source| RuntimeError::OperatorFailed {
                index,
                op_type: prepared.op.op_type.clone(),
                source,
            })?;
            metrics.record_op(op_metrics, self.options.profile);
        }
        metrics.finalise(start.elapsed());
        tracing::debug!("{}", metrics.summary());
        Ok(metrics)
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("kernels", &self.kernels().map(|(_, k, _)| k).collect::<Vec<_>>())
            .field("options", &self.options)
            .finish()
    }
}

/// Binds, converts, initialises and dispatches one operator.
fn run_op(index: usize, prepared: &mut PreparedOp, scope: &mut Scope) -> Result<OpMetrics, KernelError> {
    let PreparedOp { op, kernel } = prepared;

    let outputs: Vec<(&str, &str)> = op
        .outputs
        .iter()
        .flat_map(|(slot, names)| names.iter().map(move |n| (slot.as_str(), n.as_str())))
        .collect();
    let taken: Vec<_> = outputs
        .iter()
        .map(|(_, name)| scope.take(name).unwrap_or_default())
        .collect();

    let (result, returned) = {
        let scope: &Scope = scope;
        let mut args = KernelArgs::new(op.op_type.as_str());
        for ((slot, _), var) in outputs.iter().zip(taken) {
            args.bind_output(slot, var);
        }
        let result = bind_and_dispatch(op, kernel.as_mut(), scope, &mut args);
        (result, args.into_outputs())
    };

    for (slot, vars) in returned {
        for (name, var) in op.output(&slot).iter().zip(vars) {
            scope.insert(name.clone(), var);
        }
    }

    let (conversions, init, dispatch) = result?;
    tracing::debug!(
        index,
        op = %op.op_type,
        kernel = kernel.name(),
        conversions,
        dispatch_us = dispatch.as_micros() as u64,
        "operator done"
    );
    Ok(OpMetrics {
        index,
        op_type: op.op_type.clone(),
        kernel: kernel.name().to_string(),
        init_duration: init,
        dispatch_duration: dispatch,
        conversions,
    })
}

fn bind_and_dispatch<'s>(
    op: &OpDesc,
    kernel: &mut dyn Kernel,
    scope: &'s Scope,
    args: &mut KernelArgs<'s>,
) -> Result<(usize, Duration, Duration), KernelError> {
    for (slot, names) in &op.inputs {
        for name in names {
            let var = scope
                .find_var(name)
                .ok_or_else(|| ModelError::VariableNotFound(name.clone()))?;
            args.bind_input(slot, var);
        }
    }

    let conversions = apply_implicit_conversions(&*kernel, args)?;
    let steps = conversions.iter().map(|c| c.kinds.len()).sum();

    let t0 = Instant::now();
    kernel.init(args)?;
    let t1 = Instant::now();
    kernel.dispatch(args)?;
    Ok((steps, t1 - t0, t1.elapsed()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_ir::{Attribute, VarDesc};
    use std::sync::Arc;
    use tensor_core::{DType, Shape, Tensor};

    fn fill(out: &str, shape: &[i64], start: f32) -> OpDesc {
        OpDesc::new("fill")
            .with_output("Out", [out])
            .with_attr("shape", Attribute::Longs(shape.to_vec()))
            .with_attr("start", Attribute::Float(start))
    }

    fn relu(x: &str, out: &str) -> OpDesc {
        OpDesc::new("relu").with_input("X", [x]).with_output("Out", [out])
    }

    fn prepare(vars: Vec<VarDesc>, ops: Vec<OpDesc>) -> Executor {
        let program = Program::new(vars, ops).validate().unwrap();
        let registry = KernelRegistry::with_builtins().unwrap();
        Executor::prepare(&program, &registry, ExecutorOptions::default()).unwrap()
    }

    fn values(scope: &Scope, name: &str) -> Vec<f32> {
        scope.find_tensor(name).unwrap().as_f32_slice().to_vec()
    }

    #[test]
    fn test_reader_sees_latest_producer() {
        let vars = vec![VarDesc::new("a", DType::F32), VarDesc::new("b", DType::F32)];
        let mut exec = prepare(
            vars,
            vec![fill("a", &[2], -5.0), relu("a", "b"), fill("a", &[2], 1.0), relu("a", "b")],
        );
        let mut scope = Scope::new();
        let metrics = exec.run(&mut scope).unwrap();
        assert_eq!(metrics.num_ops, 4);
        assert_eq!(values(&scope, "b"), vec![1.0, 2.0]);
    }

    #[test]
    fn test_inputs_resolve_through_parent() {
        let mut parent = Scope::new();
        parent.insert("w", Tensor::from_f32(Shape::vector(3), &[-1.0, 0.5, 2.0]).unwrap());
        let parent = Arc::new(parent);
        let mut child = parent.new_child();

        let vars = vec![VarDesc::persistable("w", DType::F32), VarDesc::new("y", DType::F32)];
        let mut exec = prepare(vars, vec![relu("w", "y")]);
        exec.run(&mut child).unwrap();

        assert_eq!(values(&child, "y"), vec![0.0, 0.5, 2.0]);
        assert!(child.find_local("w").is_none());
        assert!(parent.find_local("y").is_none());
    }

    #[test]
    fn test_failure_names_operator_and_keeps_earlier_outputs() {
        let vars = vec![
            VarDesc::new("a", DType::F32),
            VarDesc::new("w", DType::F32),
            VarDesc::new("y", DType::F32),
        ];
        let fc = OpDesc::new("fc")
            .with_input("Input", ["a"])
            .with_input("W", ["w"])
            .with_output("Out", ["y"]);
        let mut exec = prepare(vars, vec![fill("a", &[2, 3], 0.0), fill("w", &[4, 1], 0.0), fc]);
        let mut scope = Scope::new();
        let err = exec.run(&mut scope).unwrap_err();
        assert!(matches!(err, RuntimeError::OperatorFailed { index: 2, ref op_type, .. } if op_type == "fc"), "{err}");
        assert_eq!(scope.find_tensor("a").unwrap().shape(), &Shape::matrix(2, 3));
        assert!(scope.contains("y"));
    }

    #[test]
    fn test_missing_input_variable() {
        let vars = vec![VarDesc::new("x", DType::F32), VarDesc::new("y", DType::F32)];
        let mut exec = prepare(vars, vec![relu("x", "y")]);
        let err = exec.run(&mut Scope::new()).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::OperatorFailed {
                source: KernelError::Model(ModelError::VariableNotFound(_)),
                ..
            }
        ));
    }

    #[test]
    fn test_prepare_reports_unplaceable_operator() {
        let vars = vec![VarDesc::new("y", DType::F32)];
        let program = Program::new(vars, vec![OpDesc::new("softmax").with_output("Out", ["y"])])
            .validate()
            .unwrap();
        let registry = KernelRegistry::with_builtins().unwrap();
        let err = Executor::prepare(&program, &registry, ExecutorOptions::default()).unwrap_err();
        assert!(matches!(err, RuntimeError::Prepare { index: 0, .. }));
    }

    #[test]
    fn test_fpga_operator_gets_implicit_conversions() {
        let vars = vec![
            VarDesc::new("x", DType::F32),
            VarDesc::persistable("f", DType::F32),
            VarDesc::new("y", DType::F16),
            VarDesc::new("z", DType::F32),
        ];
        let dw = OpDesc::new("depthwise_conv2d")
            .with_input("Input", ["x"])
            .with_input("Filter", ["f"])
            .with_output("Output", ["y"])
            .with_place(Place::new(Target::Fpga, Precision::Fp16));
        let mut exec = prepare(vars, vec![fill("x", &[1, 2, 2, 2], 0.0), dw, relu("y", "z")]);

        let mut scope = Scope::new();
        scope.insert("f", Tensor::from_f32(Shape::new(vec![2, 1, 1, 1]), &[2.0, -1.0]).unwrap());
        let metrics = exec.run(&mut scope).unwrap();

        // calib + io_copy before the device op, io_copy + calib after it.
        assert_eq!(metrics.total_conversions, 4);
        assert_eq!(metrics.op_metrics[1].kernel, "dwconv_fpga_pe");
        assert_eq!(values(&scope, "z"), vec![0.0, 2.0, 4.0, 6.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(scope.find_tensor("y").unwrap().target(), Target::Fpga);
    }
}
