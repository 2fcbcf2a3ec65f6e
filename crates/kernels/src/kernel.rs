// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`Kernel`] trait and the argument binding kernels run against.

use crate::pe::PeConfig;
use crate::KernelError;
use model_ir::{Attribute, OpDesc, Variable};
use std::borrow::Cow;
use std::collections::BTreeMap;
use tensor_core::{Place, Tensor};

/// Options shared by every kernel a factory creates.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct KernelOptions {
    /// Processing-element limits for decomposed device kernels.
    #[serde(default)]
    pub pe: PeConfig,
}

/// Creates a kernel for one operator instance.
pub type KernelFactory = fn(&OpDesc, &KernelOptions) -> Result<Box<dyn Kernel>, KernelError>;

/// One hardware-specific implementation of an operator.
///
/// A kernel instance belongs to a single operator of a single program.
/// `init` is called before every `dispatch` and must be cheap when the
/// input shapes have not changed since the previous call.
pub trait Kernel: Send + Sync {
    /// Implementation name, for logs and metrics.
    fn name(&self) -> &str;

    /// The place this kernel was registered at.
    fn place(&self) -> Place;

    /// The place an input bound to `slot` must satisfy before dispatch.
    ///
    /// Axes left as `Any` accept whatever the producer left behind.
    fn input_place(&self, _slot: &str) -> Place {
        self.place()
    }

    /// Whether the executor should convert mismatched inputs before
    /// dispatch. Explicit conversion kernels handle their input as is.
    fn converts_inputs(&self) -> bool {
        true
    }

    /// Prepares shape-dependent state.
    fn init(&mut self, _args: &KernelArgs<'_>) -> Result<(), KernelError> {
        Ok(())
    }

    /// Computes the outputs.
    fn dispatch(&mut self, args: &mut KernelArgs<'_>) -> Result<(), KernelError>;
}

// ── KernelArgs ─────────────────────────────────────────────────────

/// Variables bound to a kernel's slots for one dispatch.
///
/// Inputs are borrowed from the scope chain unless an implicit conversion
/// replaced them with an owned temporary. Outputs are owned: the executor
/// moves them out of the scope before dispatch and back afterwards.
#[derive(Debug)]
pub struct KernelArgs<'a> {
    inputs: KernelInputs<'a>,
    outputs: KernelOutputs,
}

/// The input half of a [`KernelArgs`].
#[derive(Debug)]
pub struct KernelInputs<'a> {
    op: String,
    slots: BTreeMap<String, Vec<Cow<'a, Variable>>>,
}

/// The output half of a [`KernelArgs`].
#[derive(Debug)]
pub struct KernelOutputs {
    op: String,
    slots: BTreeMap<String, Vec<Variable>>,
}

impl<'a> KernelArgs<'a> {
    /// Empty binding; `op` names the operator in errors.
    pub fn new(op: impl Into<String>) -> Self {
        let op = op.into();
        Self {
            inputs: KernelInputs {
                op: op.clone(),
                slots: BTreeMap::new(),
            },
            outputs: KernelOutputs {
                op,
                slots: BTreeMap::new(),
            },
        }
    }

    pub fn op(&self) -> &str {
        &self.inputs.op
    }

    /// Appends a borrowed input to `slot`.
    pub fn bind_input(&mut self, slot: &str, var: &'a Variable) {
        self.inputs
            .slots
            .entry(slot.to_string())
            .or_default()
            .push(Cow::Borrowed(var));
    }

    /// Appends an owned input to `slot`.
    pub fn bind_owned_input(&mut self, slot: &str, var: Variable) {
        self.inputs
            .slots
            .entry(slot.to_string())
            .or_default()
            .push(Cow::Owned(var));
    }

    /// Appends an output to `slot`.
    pub fn bind_output(&mut self, slot: &str, var: Variable) {
        self.outputs.slots.entry(slot.to_string()).or_default().push(var);
    }

    /// Replaces input `index` of `slot` with a converted tensor.
    pub fn replace_input(&mut self, slot: &str, index: usize, tensor: Tensor) -> Result<(), KernelError> {
        let entry = self
            .inputs
            .slots
            .get_mut(slot)
            .and_then(|v| v.get_mut(index))
            .ok_or_else(|| KernelError::MissingInput {
                op: self.inputs.op.clone(),
                slot: slot.to_string(),
            })?;
        *entry = Cow::Owned(Variable::Tensor(tensor));
        Ok(())
    }

    /// Bound input tensors as `(slot, index, tensor)`, skipping lists.
    pub fn input_tensors(&self) -> impl Iterator<Item = (&str, usize, &Tensor)> {
        self.inputs.slots.iter().flat_map(|(slot, vars)| {
            vars.iter()
                .enumerate()
                .filter_map(move |(i, v)| v.as_tensor().map(|t| (slot.as_str(), i, t)))
        })
    }

    /// Borrows inputs and outputs at the same time.
    pub fn split_mut(&mut self) -> (&KernelInputs<'a>, &mut KernelOutputs) {
        (&self.inputs, &mut self.outputs)
    }

    pub fn inputs(&self) -> &KernelInputs<'a> {
        &self.inputs
    }

    pub fn outputs_mut(&mut self) -> &mut KernelOutputs {
        &mut self.outputs
    }

    /// Shorthand for [`KernelInputs::input`].
    pub fn input(&self, slot: &str) -> Result<&Tensor, KernelError> {
        self.inputs.input(slot)
    }

    /// Shorthand for [`KernelOutputs::output_mut`].
    pub fn output_mut(&mut self, slot: &str) -> Result<&mut Tensor, KernelError> {
        self.outputs.output_mut(slot)
    }

    /// Releases the outputs so they can be moved back into the scope.
    pub fn into_outputs(self) -> BTreeMap<String, Vec<Variable>> {
        self.outputs.slots
    }
}

fn kind_error(slot: &str, expected: &'static str, actual: &'static str) -> KernelError {
    model_ir::ModelError::VariableKind {
        name: slot.to_string(),
        expected,
        actual,
    }
    .into()
}

impl KernelInputs<'_> {
    /// The first tensor bound to `slot`.
    pub fn input(&self, slot: &str) -> Result<&Tensor, KernelError> {
        self.input_opt(slot)?.ok_or_else(|| self.missing(slot))
    }

    /// The first tensor bound to `slot`, or `None` if the slot is unbound.
    pub fn input_opt(&self, slot: &str) -> Result<Option<&Tensor>, KernelError> {
        match self.slots.get(slot).and_then(|v| v.first()) {
            None => Ok(None),
            Some(var) => var
                .as_tensor()
                .map(Some)
                .ok_or_else(|| kind_error(slot, "tensor", var.kind())),
        }
    }

    /// Every tensor bound to `slot`, for variadic inputs.
    pub fn input_all(&self, slot: &str) -> Result<Vec<&Tensor>, KernelError> {
        let vars = self
            .slots
            .get(slot)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| self.missing(slot))?;
        vars.iter()
            .map(|v| v.as_tensor().ok_or_else(|| kind_error(slot, "tensor", v.kind())))
            .collect()
    }

    /// The tensor list bound to `slot`.
    pub fn input_list(&self, slot: &str) -> Result<&[Tensor], KernelError> {
        let var = self
            .slots
            .get(slot)
            .and_then(|v| v.first())
            .ok_or_else(|| self.missing(slot))?;
        var.as_tensor_list()
            .ok_or_else(|| kind_error(slot, "tensor list", var.kind()))
    }

    fn missing(&self, slot: &str) -> KernelError {
        KernelError::MissingInput {
            op: self.op.clone(),
            slot: slot.to_string(),
        }
    }
}

impl KernelOutputs {
    /// The first tensor bound to output `slot`.
    pub fn output_mut(&mut self, slot: &str) -> Result<&mut Tensor, KernelError> {
        let var = self.first_mut(slot)?;
        let actual = var.kind();
        var.as_tensor_mut()
            .ok_or_else(|| kind_error(slot, "tensor", actual))
    }

    /// Every tensor bound to `slot`, for variadic outputs.
    pub fn output_all_mut(&mut self, slot: &str) -> Result<Vec<&mut Tensor>, KernelError> {
        let op = &self.op;
        let vars = self
            .slots
            .get_mut(slot)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| KernelError::MissingOutput {
                op: op.clone(),
                slot: slot.to_string(),
            })?;
        vars.iter_mut()
            .map(|v| {
                let actual = v.kind();
                v.as_tensor_mut()
                    .ok_or_else(|| kind_error(slot, "tensor", actual))
            })
            .collect()
    }

    /// The tensor list bound to output `slot`.
    ///
    /// A freshly created variable is still an empty tensor; it becomes a
    /// list on first access here.
    pub fn output_list_mut(&mut self, slot: &str) -> Result<&mut Vec<Tensor>, KernelError> {
        let var = self.first_mut(slot)?;
        if matches!(var, Variable::Tensor(t) if t.numel() == 0) {
            *var = Variable::TensorList(Vec::new());
        }
        let actual = var.kind();
        var.as_tensor_list_mut()
            .ok_or_else(|| kind_error(slot, "tensor list", actual))
    }

    fn first_mut(&mut self, slot: &str) -> Result<&mut Variable, KernelError> {
        let op = &self.op;
        self.slots
            .get_mut(slot)
            .and_then(|v| v.first_mut())
            .ok_or_else(|| KernelError::MissingOutput {
                op: op.clone(),
                slot: slot.to_string(),
            })
    }
}

// ── Attribute helpers ──────────────────────────────────────────────

/// Reads an integer attribute, falling back to `default` when absent.
pub(crate) fn attr_usize(op: &OpDesc, name: &str, default: Option<usize>) -> Result<usize, KernelError> {
    match op.attr(name) {
        None => default.ok_or_else(|| KernelError::MissingAttribute {
            op: op.op_type.clone(),
            name: name.to_string(),
        }),
        Some(a) => a
            .as_long()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| invalid_attr(op, name, a)),
    }
}

/// Reads a list of non-negative integers.
pub(crate) fn attr_usizes(op: &OpDesc, name: &str) -> Result<Option<Vec<usize>>, KernelError> {
    let Some(a) = op.attr(name) else {
        return Ok(None);
    };
    a.as_longs()
        .and_then(|v| v.into_iter().map(|x| usize::try_from(x).ok()).collect())
        .map(Some)
        .ok_or_else(|| invalid_attr(op, name, a))
}

pub(crate) fn attr_f32(op: &OpDesc, name: &str, default: f32) -> Result<f32, KernelError> {
    match op.attr(name) {
        None => Ok(default),
        Some(a) => a.as_float().ok_or_else(|| invalid_attr(op, name, a)),
    }
}

fn invalid_attr(op: &OpDesc, name: &str, a: &Attribute) -> KernelError {
    KernelError::InvalidAttribute {
        op: op.op_type.clone(),
        name: name.to_string(),
        detail: format!("unexpected {} value", a.kind()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Shape;

    fn t(v: f32) -> Variable {
        Variable::Tensor(Tensor::from_f32(Shape::vector(1), &[v]).unwrap())
    }

    #[test]
    fn test_input_access() {
        let x = t(1.0);
        let list = Variable::TensorList(vec![Tensor::empty()]);
        let mut args = KernelArgs::new("test");
        args.bind_input("X", &x);
        args.bind_input("L", &list);

        let ins = args.inputs();
        assert_eq!(ins.input("X").unwrap().as_f32_slice(), &[1.0]);
        assert!(ins.input_opt("Bias").unwrap().is_none());
        assert!(matches!(ins.input("Y"), Err(KernelError::MissingInput { .. })));
        assert!(matches!(ins.input("L"), Err(KernelError::Model(_))));
        assert_eq!(ins.input_list("L").unwrap().len(), 1);
        assert_eq!(ins.input_all("X").unwrap().len(), 1);
        assert_eq!(args.input_tensors().count(), 1);
    }

    #[test]
    fn test_replace_input_does_not_touch_source() {
        let x = t(1.0);
        let mut args = KernelArgs::new("test");
        args.bind_input("X", &x);
        args.replace_input("X", 0, Tensor::from_f32(Shape::vector(1), &[9.0]).unwrap())
            .unwrap();
        assert_eq!(args.input("X").unwrap().as_f32_slice(), &[9.0]);
        assert!(args.replace_input("X", 1, Tensor::empty()).is_err());
        drop(args);
        assert_eq!(x.as_tensor().unwrap().as_f32_slice(), &[1.0]);
    }

    #[test]
    fn test_output_list_created_on_first_access() {
        let mut args = KernelArgs::new("fetch");
        args.bind_output("Out", Variable::default());
        args.outputs_mut().output_list_mut("Out").unwrap().push(Tensor::empty());
        let outs = args.into_outputs();
        assert_eq!(outs["Out"][0].as_tensor_list().unwrap().len(), 1);
    }

    #[test]
    fn test_output_kind_mismatch() {
        let mut args = KernelArgs::new("fc");
        args.bind_output("Out", t(1.0));
        assert!(args.outputs_mut().output_list_mut("Out").is_err());
        assert!(args.output_mut("Out").is_ok());
        assert!(matches!(args.output_mut("Nope"), Err(KernelError::MissingOutput { .. })));
    }

    #[test]
    fn test_split_mut_reads_while_writing() {
        let x = t(3.0);
        let mut args = KernelArgs::new("copy");
        args.bind_input("X", &x);
        args.bind_output("Out", Variable::default());
        let (ins, outs) = args.split_mut();
        *outs.output_mut("Out").unwrap() = ins.input("X").unwrap().clone();
        let outs = args.into_outputs();
        assert_eq!(outs["Out"][0].as_tensor().unwrap().as_f32_slice(), &[3.0]);
    }

    #[test]
    fn test_attr_helpers() {
        let op = OpDesc::new("split")
            .with_attr("axis", Attribute::Int(1))
            .with_attr("sections", Attribute::Ints(vec![2, 3]))
            .with_attr("bad", Attribute::Ints(vec![-1]))
            .with_attr("start", Attribute::Float(0.5));
        assert_eq!(attr_usize(&op, "axis", None).unwrap(), 1);
        assert_eq!(attr_usize(&op, "missing", Some(7)).unwrap(), 7);
        assert!(attr_usize(&op, "missing", None).is_err());
        assert_eq!(attr_usizes(&op, "sections").unwrap(), Some(vec![2, 3]));
        assert!(attr_usizes(&op, "bad").is_err());
        assert_eq!(attr_f32(&op, "start", 0.0).unwrap(), 0.5);
        assert_eq!(attr_f32(&op, "step", 1.0).unwrap(), 1.0);
    }
}
