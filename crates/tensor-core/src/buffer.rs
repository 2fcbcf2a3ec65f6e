// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Word-aligned byte storage backing every [`crate::Tensor`].
//!
//! The buffer is a `Vec<u64>` viewed as bytes, so its start is always
//! 8-byte aligned and any element slice at an element-sized offset can be
//! reinterpreted with `bytemuck` without a runtime alignment failure.

use crate::Element;

const WORD: usize = std::mem::size_of::<u64>();

/// Growable, 8-byte aligned byte buffer.
#[derive(Clone, Default)]
pub struct Buffer {
    words: Vec<u64>,
    len: usize,
}

impl Buffer {
    /// Allocates `len` zeroed bytes.
    pub fn zeroed(len: usize) -> Self {
        Self {
            words: vec![0u64; words_for(len)],
            len,
        }
    }

    /// Copies `bytes` into a fresh aligned allocation.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut buf = Self::zeroed(bytes.len());
        buf.as_bytes_mut().copy_from_slice(bytes);
        buf
    }

    /// Logical length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated capacity in bytes; always `>= len()`.
    pub fn capacity(&self) -> usize {
        self.words.len() * WORD
    }

    /// Sets the logical length, growing the allocation only when the
    /// current capacity is insufficient. Existing bytes are preserved and
    /// new bytes are zero.
    pub fn resize(&mut self, len: usize) {
        let needed = words_for(len);
        if needed > self.words.len() {
            self.words.resize(needed, 0);
        } else if len < self.len {
            // Zero the tail so a later grow does not resurrect stale bytes.
            let tail_start = len;
            let tail_end = self.len;
            bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[tail_start..tail_end].fill(0);
        }
        self.len = len;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.len]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..self.len]
    }

    /// Reinterprets the bytes as elements of `T`.
    ///
    /// Callers must keep `len()` a multiple of `size_of::<T>()`; tensors
    /// guarantee this by sizing the buffer from `numel × element size`.
    pub fn typed<T: Element>(&self) -> &[T] {
        bytemuck::cast_slice(self.as_bytes())
    }

    /// Mutable counterpart of [`Buffer::typed`].
    pub fn typed_mut<T: Element>(&mut self) -> &mut [T] {
        bytemuck::cast_slice_mut(self.as_bytes_mut())
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .finish()
    }
}

fn words_for(len: usize) -> usize {
    (len + WORD - 1) / WORD
}
