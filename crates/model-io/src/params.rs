// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Matching parameter records against a program's persistable variables.

use crate::ModelIoError;
use model_ir::{Program, ProgramState, Scope};
use tensor_core::Tensor;

/// The persistable tensors of `program`, in ascending name order.
pub(crate) fn persistable_tensors<'s, S: ProgramState>(
    program: &Program<S>,
    scope: &'s Scope,
) -> Result<Vec<(String, &'s Tensor)>, ModelIoError> {
    program
        .persistable_vars()
        .into_iter()
        .map(|v| Ok((v.name.clone(), scope.find_tensor(&v.name)?)))
        .collect()
}

/// Builds a root scope from loaded records.
///
/// Every persistable variable needs exactly one record and every record
/// must name a persistable variable.
pub(crate) fn bind_params<S: ProgramState>(
    program: &Program<S>,
    records: Vec<(String, Tensor)>,
    stream: &str,
) -> Result<Scope, ModelIoError> {
    let expected = program.persistable_vars();
    if records.len() != expected.len() {
        return Err(ModelIoError::corrupt(
            stream,
            format!(
                "{} parameter records for {} persistable variables",
                records.len(),
                expected.len()
            ),
        ));
    }

    let mut scope = Scope::new();
    for (name, tensor) in records {
        let Some(var) = program.var(&name).filter(|v| v.persistable) else {
            return Err(ModelIoError::corrupt(
                stream,
                format!("record '{name}' names no persistable variable"),
            ));
        };
        if var.dtype != tensor.dtype() {
            tracing::warn!(
                var = %name,
                declared = %var.dtype,
                stored = %tensor.dtype(),
                "parameter dtype differs from its declaration"
            );
        }
        if scope.insert(name.clone(), tensor).is_some() {
            return Err(ModelIoError::corrupt(stream, format!("duplicate record '{name}'")));
        }
    }
    Ok(scope)
}
