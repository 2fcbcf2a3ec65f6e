// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Little-endian primitives shared by both formats.

use crate::ModelIoError;
use tensor_core::{DType, Lod};

/// Bounds-checked cursor over a byte stream.
pub(crate) struct Reader<'a> {
    stream: &'a str,
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(stream: &'a str, buf: &'a [u8]) -> Self {
        Self { stream, buf, pos: 0 }
    }

    pub(crate) fn stream(&self) -> &'a str {
        self.stream
    }

    pub(crate) fn corrupt(&self, detail: impl Into<String>) -> ModelIoError {
        ModelIoError::corrupt(self.stream, detail)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], ModelIoError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                self.corrupt(format!(
                    "truncated at byte {}: need {n} more, {} left",
                    self.pos,
                    self.buf.len() - self.pos
                ))
            })?;
        let buf = self.buf;
        let out = &buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], ModelIoError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, ModelIoError> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, ModelIoError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub(crate) fn u32(&mut self) -> Result<u32, ModelIoError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub(crate) fn u64(&mut self) -> Result<u64, ModelIoError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    pub(crate) fn i32(&mut self) -> Result<i32, ModelIoError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub(crate) fn i64(&mut self) -> Result<i64, ModelIoError> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    pub(crate) fn f32(&mut self) -> Result<f32, ModelIoError> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    /// A `u64` length or count that must fit the remaining stream when
    /// multiplied by `unit` bytes.
    pub(crate) fn len(&mut self, unit: usize) -> Result<usize, ModelIoError> {
        let n = self.u64()?;
        let remaining = (self.buf.len() - self.pos) as u64;
        if n.saturating_mul(unit.max(1) as u64) > remaining {
            return Err(self.corrupt(format!(
                "length {n} at byte {} exceeds the {remaining} bytes left",
                self.pos - 8
            )));
        }
        Ok(n as usize)
    }

    pub(crate) fn string(&mut self) -> Result<String, ModelIoError> {
        let n = self.len(1)?;
        let bytes = self.take(n)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| self.corrupt(format!("invalid UTF-8 string: {e}")))
    }

    pub(crate) fn u64s(&mut self, n: usize) -> Result<Vec<u64>, ModelIoError> {
        (0..n).map(|_| self.u64()).collect()
    }

    pub(crate) fn dtype(&mut self) -> Result<DType, ModelIoError> {
        let tag = self.u8()?;
        DType::from_tag(tag).ok_or_else(|| self.corrupt(format!("unknown dtype tag {tag}")))
    }

    pub(crate) fn magic(&mut self, expected: &[u8; 4], version: u16) -> Result<(), ModelIoError> {
        let magic = self.take(4)?;
        if magic != expected {
            return Err(self.corrupt(format!(
                "bad magic {magic:?}, expected {:?}",
                String::from_utf8_lossy(expected)
            )));
        }
        let found = self.u16()?;
        if found != version {
            return Err(self.corrupt(format!("unsupported version {found}, expected {version}")));
        }
        Ok(())
    }

    pub(crate) fn finish(&self) -> Result<(), ModelIoError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.corrupt(format!("{} trailing bytes", self.buf.len() - self.pos)))
        }
    }
}

/// Append-only little-endian encoder.
#[derive(Default)]
pub(crate) struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub(crate) fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    pub(crate) fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub(crate) fn u16(&mut self, v: u16) {
        self.bytes(&v.to_le_bytes());
    }

    pub(crate) fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    pub(crate) fn u64(&mut self, v: u64) {
        self.bytes(&v.to_le_bytes());
    }

    pub(crate) fn len(&mut self, n: usize) {
        self.u64(n as u64);
    }

    pub(crate) fn i32(&mut self, v: i32) {
        self.bytes(&v.to_le_bytes());
    }

    pub(crate) fn i64(&mut self, v: i64) {
        self.bytes(&v.to_le_bytes());
    }

    pub(crate) fn f32(&mut self, v: f32) {
        self.bytes(&v.to_le_bytes());
    }

    pub(crate) fn string(&mut self, s: &str) {
        self.len(s.len());
        self.bytes(s.as_bytes());
    }

    pub(crate) fn magic(&mut self, magic: &[u8; 4], version: u16) {
        self.bytes(magic);
        self.u16(version);
    }

    /// `u64` level count, then per level a `u64` count and the offsets.
    pub(crate) fn lod(&mut self, lod: &Lod) {
        self.len(lod.num_levels());
        for level in lod.levels() {
            self.len(level.len());
            for &offset in level {
                self.u64(offset);
            }
        }
    }
}
