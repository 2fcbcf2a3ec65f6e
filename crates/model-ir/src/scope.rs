// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Hierarchical variable storage.
//!
//! A [`Scope`] owns its variables. A child scope holds an `Arc` to its
//! parent: lookups walk up the chain, writes never leave the local map.
//! Sibling scopes can therefore share weights stored in a common parent
//! without any of them being able to change those weights.

use crate::ModelError;
use std::collections::BTreeMap;
use std::sync::Arc;
use tensor_core::Tensor;

/// A named runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    Tensor(Tensor),
    /// Used for the predictor's `feed` and `fetch` lists.
    TensorList(Vec<Tensor>),
}

impl Variable {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tensor(_) => "tensor",
            Self::TensorList(_) => "tensor list",
        }
    }

    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Self::Tensor(t) => Some(t),
            Self::TensorList(_) => None,
        }
    }

    pub fn as_tensor_mut(&mut self) -> Option<&mut Tensor> {
        match self {
            Self::Tensor(t) => Some(t),
            Self::TensorList(_) => None,
        }
    }

    pub fn as_tensor_list(&self) -> Option<&[Tensor]> {
        match self {
            Self::TensorList(l) => Some(l),
            Self::Tensor(_) => None,
        }
    }

    pub fn as_tensor_list_mut(&mut self) -> Option<&mut Vec<Tensor>> {
        match self {
            Self::TensorList(l) => Some(l),
            Self::Tensor(_) => None,
        }
    }
}

impl Default for Variable {
    fn default() -> Self {
        Self::Tensor(Tensor::empty())
    }
}

impl From<Tensor> for Variable {
    fn from(t: Tensor) -> Self {
        Self::Tensor(t)
    }
}

/// A map of variables with an optional read-only parent.
#[derive(Debug, Default)]
pub struct Scope {
    vars: BTreeMap<String, Variable>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty scope whose lookups fall back to `self`.
    pub fn new_child(self: &Arc<Self>) -> Scope {
        Scope {
            vars: BTreeMap::new(),
            parent: Some(Arc::clone(self)),
        }
    }

    pub fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }

    /// Returns the local variable `name`, creating an empty tensor if absent.
    pub fn var_mut(&mut self, name: &str) -> &mut Variable {
        self.vars.entry(name.to_string()).or_default()
    }

    /// Looks `name` up here, then in each ancestor.
    pub fn find_var(&self, name: &str) -> Option<&Variable> {
        let mut scope = self;
        loop {
            if let Some(v) = scope.vars.get(name) {
                return Some(v);
            }
            scope = scope.parent.as_deref()?;
        }
    }

    pub fn find_local(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    pub fn find_local_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.vars.get_mut(name)
    }

    /// Stores `value` locally, returning the previous local value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Variable>) -> Option<Variable> {
        self.vars.insert(name.into(), value.into())
    }

    /// Moves a local variable out. Ancestors are never touched.
    pub fn take(&mut self, name: &str) -> Option<Variable> {
        self.vars.remove(name)
    }

    /// Whether `name` resolves anywhere in the chain.
    pub fn contains(&self, name: &str) -> bool {
        self.find_var(name).is_some()
    }

    /// Local names in sorted order.
    pub fn local_var_names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    /// Number of local variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Resolves `name` through the chain and expects a tensor.
    pub fn find_tensor(&self, name: &str) -> Result<&Tensor, ModelError> {
        let var = self
            .find_var(name)
            .ok_or_else(|| ModelError::VariableNotFound(name.to_string()))?;
        var.as_tensor().ok_or_else(|| ModelError::VariableKind {
            name: name.to_string(),
            expected: "tensor",
            actual: var.kind(),
        })
    }

    /// The local tensor `name`, created empty if absent.
    pub fn tensor_mut(&mut self, name: &str) -> Result<&mut Tensor, ModelError> {
        let var = self.var_mut(name);
        let actual = var.kind();
        var.as_tensor_mut().ok_or_else(|| ModelError::VariableKind {
            name: name.to_string(),
            expected: "tensor",
            actual,
        })
    }

    /// The local tensor list `name`, created empty if absent.
    pub fn tensor_list_mut(&mut self, name: &str) -> Result<&mut Vec<Tensor>, ModelError> {
        let var = self
            .vars
            .entry(name.to_string())
            .or_insert_with(|| Variable::TensorList(Vec::new()));
        let actual = var.kind();
        var.as_tensor_list_mut().ok_or_else(|| ModelError::VariableKind {
            name: name.to_string(),
            expected: "tensor list",
            actual,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Shape;

    fn tensor(v: f32) -> Tensor {
        Tensor::from_f32(Shape::vector(1), &[v]).unwrap()
    }

    #[test]
    fn test_var_mut_creates_empty_tensor() {
        let mut s = Scope::new();
        assert!(s.is_empty());
        let t = s.var_mut("a").as_tensor().unwrap();
        assert_eq!(t.numel(), 0);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_child_reads_parent() {
        let mut root = Scope::new();
        root.insert("w", tensor(2.0));
        let root = Arc::new(root);
        let child = root.new_child();
        assert_eq!(child.find_tensor("w").unwrap().as_f32_slice(), &[2.0]);
        assert!(child.find_local("w").is_none());
        assert!(child.contains("w"));
    }

    #[test]
    fn test_child_writes_stay_local() {
        let mut root = Scope::new();
        root.insert("w", tensor(1.0));
        let root = Arc::new(root);
        let mut child = root.new_child();
        *child.tensor_mut("w").unwrap() = tensor(5.0);

        assert_eq!(child.find_tensor("w").unwrap().as_f32_slice(), &[5.0]);
        assert_eq!(root.find_tensor("w").unwrap().as_f32_slice(), &[1.0]);
        assert!(child.take("w").is_some());
        // Shadow removed, the parent value is visible again.
        assert_eq!(child.find_tensor("w").unwrap().as_f32_slice(), &[1.0]);
    }

    #[test]
    fn test_siblings_are_isolated() {
        let root = Arc::new(Scope::new());
        let mut a = root.new_child();
        let b = root.new_child();
        a.insert("x", tensor(3.0));
        assert!(b.find_var("x").is_none());
    }

    #[test]
    fn test_kind_errors() {
        let mut s = Scope::new();
        s.tensor_list_mut("feed").unwrap().push(tensor(1.0));
        assert!(matches!(
            s.find_tensor("feed"),
            Err(ModelError::VariableKind { .. })
        ));
        assert!(matches!(
            s.find_tensor("nope"),
            Err(ModelError::VariableNotFound(_))
        ));
        assert!(s.tensor_list_mut("feed").unwrap().len() == 1);
        s.insert("t", tensor(0.0));
        assert!(s.tensor_list_mut("t").is_err());
    }

    #[test]
    fn test_local_names_sorted() {
        let mut s = Scope::new();
        s.insert("b", tensor(0.0));
        s.insert("a", tensor(0.0));
        assert_eq!(s.local_var_names().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
