// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported tensor element data types.

use crate::Precision;
use half::f16;

/// Enumerates the numeric types a [`crate::Tensor`] can hold.
///
/// Each variant has a stable one-byte tag used by the compact binary
/// model format, so the discriminants must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 32-bit IEEE 754 floating point.
    F32,
    /// 16-bit IEEE 754 floating point.
    F16,
    /// 8-bit signed integer (for quantised weights).
    I8,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer (indices, shapes).
    I64,
}

impl DType {
    /// All supported types, in tag order.
    pub const ALL: [DType; 5] = [DType::F32, DType::F16, DType::I8, DType::I32, DType::I64];

    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F16 => 2,
            DType::I8 => 1,
            DType::I32 => 4,
            DType::I64 => 8,
        }
    }

    /// Returns a human-readable label for this data type.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::F32 => "f32",
            DType::F16 => "f16",
            DType::I8 => "i8",
            DType::I32 => "i32",
            DType::I64 => "i64",
        }
    }

    /// Stable on-disk tag.
    pub fn tag(self) -> u8 {
        match self {
            DType::F32 => 0,
            DType::F16 => 1,
            DType::I8 => 2,
            DType::I32 => 3,
            DType::I64 => 4,
        }
    }

    /// Inverse of [`DType::tag`].
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.tag() == tag)
    }

    /// Parses loose spellings such as `"float32"` or `"F16"`.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "f32" | "float32" | "float" => Some(DType::F32),
            "f16" | "float16" | "half" => Some(DType::F16),
            "i8" | "int8" => Some(DType::I8),
            "i32" | "int32" => Some(DType::I32),
            "i64" | "int64" => Some(DType::I64),
            _ => None,
        }
    }

    /// The [`Precision`] axis value that describes this element type.
    pub fn precision(self) -> Precision {
        match self {
            DType::F32 => Precision::Float,
            DType::F16 => Precision::Fp16,
            DType::I8 => Precision::Int8,
            DType::I32 => Precision::Int32,
            DType::I64 => Precision::Int64,
        }
    }

    /// The element type a concrete precision stores, if any.
    pub fn from_precision(precision: Precision) -> Option<Self> {
        match precision {
            Precision::Float => Some(DType::F32),
            Precision::Fp16 => Some(DType::F16),
            Precision::Int8 => Some(DType::I8),
            Precision::Int32 => Some(DType::I32),
            Precision::Int64 => Some(DType::I64),
            Precision::Any => None,
        }
    }

    /// Returns `true` for floating-point element types.
    pub fn is_float(self) -> bool {
        matches!(self, DType::F32 | DType::F16)
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Rust scalar type that can back a tensor buffer.
pub trait Element: bytemuck::Pod {
    /// The tensor element type this Rust type maps to.
    const DTYPE: DType;
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;
}

impl Element for f16 {
    const DTYPE: DType = DType::F16;
}

impl Element for i8 {
    const DTYPE: DType = DType::I8;
}

impl Element for i32 {
    const DTYPE: DType = DType::I32;
}

impl Element for i64 {
    const DTYPE: DType = DType::I64;
}
