// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Read-only byte sources that model readers run over.
//!
//! Files are memory-mapped so parameter bytes are copied once, straight
//! into tensor buffers. In-memory buffers are owned by the source.

use crate::ModelIoError;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A contiguous, immutable run of bytes with a name for error messages.
pub trait ByteSource {
    fn bytes(&self) -> &[u8];

    fn name(&self) -> &str;
}

/// A memory-mapped file.
pub struct MmapSource {
    path: PathBuf,
    name: String,
    /// `None` for an empty file, which cannot be mapped on every platform.
    mmap: Option<memmap2::Mmap>,
}

impl MmapSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ModelIoError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(ModelIoError::io(path))?;
        let len = file.metadata().map_err(ModelIoError::io(path))?.len();
        let mmap = if len == 0 {
            None
        } else {
            // SAFETY: the mapping is read-only and model files are not
            // modified while a load is in progress.
            Some(unsafe { memmap2::Mmap::map(&file) }.map_err(ModelIoError::io(path))?)
        };
        tracing::debug!(path = %path.display(), bytes = len, "mapped model file");
        Ok(Self {
            path: path.to_path_buf(),
            name: path.display().to_string(),
            mmap,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for MmapSource {
    fn bytes(&self) -> &[u8] {
        self.mmap.as_deref().unwrap_or(&[])
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for MmapSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapSource")
            .field("path", &self.path)
            .field("len", &self.bytes().len())
            .finish()
    }
}

/// An owned in-memory buffer.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl ByteSource for MemorySource {
    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn name(&self) -> &str {
        &self.name
    }
}
