// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator and variable descriptors.
//!
//! An [`OpDesc`] names its inputs and outputs through argument slots
//! (`"Input"`, `"W"`, `"Out"`, ...), each holding a list of variable
//! names. Slots, attributes and names are kept in ordered maps so a
//! descriptor always serializes the same way.

use crate::Attribute;
use std::collections::BTreeMap;
use tensor_core::{DType, Place};

/// One operator record in a [`crate::Program`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OpDesc {
    /// Operator type, e.g. `"fc"`; the kernel registry key.
    #[serde(rename = "type")]
    pub op_type: String,
    /// Input slot → variable names.
    #[serde(default)]
    pub inputs: BTreeMap<String, Vec<String>>,
    /// Output slot → variable names.
    #[serde(default)]
    pub outputs: BTreeMap<String, Vec<String>>,
    /// Named attributes.
    #[serde(default)]
    pub attrs: BTreeMap<String, Attribute>,
    /// Place chosen for this operator, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<Place>,
}

impl OpDesc {
    pub fn new(op_type: impl Into<String>) -> Self {
        Self {
            op_type: op_type.into(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            attrs: BTreeMap::new(),
            place: None,
        }
    }

    /// Builder: binds `names` to input `slot`.
    pub fn with_input<S: Into<String>>(mut self, slot: &str, names: impl IntoIterator<Item = S>) -> Self {
        self.inputs
            .insert(slot.to_string(), names.into_iter().map(Into::into).collect());
        self
    }

    /// Builder: binds `names` to output `slot`.
    pub fn with_output<S: Into<String>>(mut self, slot: &str, names: impl IntoIterator<Item = S>) -> Self {
        self.outputs
            .insert(slot.to_string(), names.into_iter().map(Into::into).collect());
        self
    }

    /// Builder: sets an attribute.
    pub fn with_attr(mut self, name: &str, value: Attribute) -> Self {
        self.attrs.insert(name.to_string(), value);
        self
    }

    /// Builder: pins the operator to a place.
    pub fn with_place(mut self, place: Place) -> Self {
        self.place = Some(place);
        self
    }

    /// Names bound to an input slot; empty if the slot is absent.
    pub fn input(&self, slot: &str) -> &[String] {
        self.inputs.get(slot).map_or(&[], Vec::as_slice)
    }

    /// Names bound to an output slot; empty if the slot is absent.
    pub fn output(&self, slot: &str) -> &[String] {
        self.outputs.get(slot).map_or(&[], Vec::as_slice)
    }

    /// Every input variable name, in slot order.
    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.inputs.values().flatten().map(String::as_str)
    }

    /// Every output variable name, in slot order.
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.values().flatten().map(String::as_str)
    }

    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attrs.get(name)
    }
}

/// A variable declaration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VarDesc {
    pub name: String,
    /// Element type of the tensor the variable holds.
    pub dtype: DType,
    /// Weights are persistable; activations are not.
    #[serde(default)]
    pub persistable: bool,
}

impl VarDesc {
    /// A transient (activation) variable.
    pub fn new(name: impl Into<String>, dtype: DType) -> Self {
        Self {
            name: name.into(),
            dtype,
            persistable: false,
        }
    }

    /// A persistable (weight) variable.
    pub fn persistable(name: impl Into<String>, dtype: DType) -> Self {
        Self {
            persistable: true,
            ..Self::new(name, dtype)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::{Precision, Target};

    fn fc_op() -> OpDesc {
        OpDesc::new("fc")
            .with_input("Input", ["x"])
            .with_input("W", ["fc_0.w_0"])
            .with_input("Bias", ["fc_0.b_0"])
            .with_output("Out", ["fc_0.tmp_1"])
            .with_attr("in_num_col_dims", Attribute::Int(1))
    }

    #[test]
    fn test_slot_access() {
        let op = fc_op();
        assert_eq!(op.input("W"), &["fc_0.w_0".to_string()]);
        assert!(op.input("Missing").is_empty());
        // Slots iterate in sorted order: Bias, Input, W.
        let names: Vec<&str> = op.input_names().collect();
        assert_eq!(names, vec!["fc_0.b_0", "x", "fc_0.w_0"]);
        assert_eq!(op.output_names().collect::<Vec<_>>(), vec!["fc_0.tmp_1"]);
    }

    #[test]
    fn test_json_omits_unset_place() {
        let json = serde_json::to_string(&fc_op()).unwrap();
        assert!(json.contains(r#""type":"fc""#));
        assert!(!json.contains("place"));

        let placed = fc_op().with_place(Place::new(Target::X86, Precision::Float));
        let json = serde_json::to_string(&placed).unwrap();
        let back: OpDesc = serde_json::from_str(&json).unwrap();
        assert_eq!(back, placed);
    }

    #[test]
    fn test_var_desc_constructors() {
        assert!(!VarDesc::new("a", DType::F32).persistable);
        assert!(VarDesc::persistable("w", DType::F32).persistable);
    }
}
