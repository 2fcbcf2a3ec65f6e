// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operator attribute values.

/// A typed operator attribute.
///
/// Serialized as `{"type": "ints", "value": [1, 2]}` in the structured
/// format; [`Attribute::tag`] gives the one-byte tag used by the compact
/// binary format.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Attribute {
    Int(i32),
    Float(f32),
    String(String),
    Ints(Vec<i32>),
    Floats(Vec<f32>),
    Strings(Vec<String>),
    Bool(bool),
    Long(i64),
    Longs(Vec<i64>),
}

impl Attribute {
    /// Stable on-disk tag. Never reorder.
    pub fn tag(&self) -> u8 {
        match self {
            Attribute::Int(_) => 0,
            Attribute::Float(_) => 1,
            Attribute::String(_) => 2,
            Attribute::Ints(_) => 3,
            Attribute::Floats(_) => 4,
            Attribute::Strings(_) => 5,
            Attribute::Bool(_) => 6,
            Attribute::Long(_) => 7,
            Attribute::Longs(_) => 8,
        }
    }

    /// Short type label for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Attribute::Int(_) => "int",
            Attribute::Float(_) => "float",
            Attribute::String(_) => "string",
            Attribute::Ints(_) => "ints",
            Attribute::Floats(_) => "floats",
            Attribute::Strings(_) => "strings",
            Attribute::Bool(_) => "bool",
            Attribute::Long(_) => "long",
            Attribute::Longs(_) => "longs",
        }
    }

    /// Integer value; accepts `Long` when it fits.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Attribute::Int(v) => Some(*v),
            Attribute::Long(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }

    /// 64-bit integer value; accepts `Int`.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Attribute::Long(v) => Some(*v),
            Attribute::Int(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Attribute::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Attribute::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::String(v) => Some(v),
            _ => None,
        }
    }

    /// Integer list as `i64`; accepts `Ints` and `Longs`.
    pub fn as_longs(&self) -> Option<Vec<i64>> {
        match self {
            Attribute::Longs(v) => Some(v.clone()),
            Attribute::Ints(v) => Some(v.iter().map(|&x| i64::from(x)).collect()),
            _ => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            Attribute::Floats(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Attribute::Strings(v) => Some(v),
            _ => None,
        }
    }
}
