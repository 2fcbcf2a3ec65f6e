// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for model persistence.

use std::path::{Path, PathBuf};

/// Errors that can occur while loading or saving a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelIoError {
    /// A stream is malformed: bad header, truncated, inconsistent, or
    /// describing a program that fails validation.
    #[error("corrupt model stream '{stream}': {detail}")]
    Corrupt { stream: String, detail: String },

    /// Opening, reading, writing or mapping a file failed.
    #[error("I/O failure on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persistable variable name cannot be used as a file name inside a
    /// non-combined model directory.
    #[error("parameter '{name}' cannot be stored as its own file: {reason}")]
    InvalidParamName { name: String, reason: &'static str },

    /// The program or scope rejected the loaded content.
    #[error(transparent)]
    Model(#[from] model_ir::ModelError),

    #[error(transparent)]
    Tensor(#[from] tensor_core::TensorError),
}

impl ModelIoError {
    pub(crate) fn corrupt(stream: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Corrupt {
            stream: stream.into(),
            detail: detail.into(),
        }
    }

    /// Adapter for `map_err` on `std::io` results.
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns `true` for every failure that means "the bytes are wrong"
    /// rather than "the file system is unhappy".
    pub fn is_corrupt(&self) -> bool {
        use model_ir::ModelError;
        matches!(
            self,
            Self::Corrupt { .. }
                | Self::Model(ModelError::InvalidProgram { .. } | ModelError::DuplicateVariable(_))
        )
    }
}
