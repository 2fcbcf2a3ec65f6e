// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Places: the (target, precision, layout) triple that says where and how a
//! tensor lives or a kernel runs.
//!
//! Every axis has an `Any` wildcard. A kernel registered at a wildcard
//! axis accepts any requested value on that axis, but scores lower than a
//! kernel that matches it exactly:
//!
//! ```text
//! requested      x86/float/nchw
//! candidate A    x86/float/nchw   → score 3
//! candidate B    any/float/any    → score 1
//! candidate C    arm/float/nchw   → incompatible
//! ```

use crate::TensorError;
use std::fmt;
use std::str::FromStr;

// ── Axes ───────────────────────────────────────────────────────────

/// The physical backend a kernel executes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Plain host memory, no particular compute unit.
    Host,
    /// Generic desktop/server CPU.
    X86,
    /// Mobile CPU.
    Arm,
    /// Programmable logic accelerator with its own device memory.
    Fpga,
    /// Wildcard.
    Any,
}

/// The numeric kind a kernel computes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Float,
    Fp16,
    Int8,
    Int32,
    Int64,
    /// Wildcard.
    Any,
}

/// Memory ordering of 4-D activations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataLayout {
    /// Channel-major.
    Nchw,
    /// Channel-minor.
    Nhwc,
    /// Wildcard.
    Any,
}

/// Shared behaviour of the three place axes.
trait Axis: Copy + Eq + 'static {
    const ALL: &'static [Self];
    const ANY: Self;
    fn as_str(self) -> &'static str;
}

impl Axis for Target {
    const ALL: &'static [Self] = &[Target::Host, Target::X86, Target::Arm, Target::Fpga, Target::Any];
    const ANY: Self = Target::Any;
    fn as_str(self) -> &'static str {
        match self {
            Target::Host => "host",
            Target::X86 => "x86",
            Target::Arm => "arm",
            Target::Fpga => "fpga",
            Target::Any => "any",
        }
    }
}

impl Axis for Precision {
    const ALL: &'static [Self] = &[
        Precision::Float,
        Precision::Fp16,
        Precision::Int8,
        Precision::Int32,
        Precision::Int64,
        Precision::Any,
    ];
    const ANY: Self = Precision::Any;
    fn as_str(self) -> &'static str {
        match self {
            Precision::Float => "float",
            Precision::Fp16 => "fp16",
            Precision::Int8 => "int8",
            Precision::Int32 => "int32",
            Precision::Int64 => "int64",
            Precision::Any => "any",
        }
    }
}

impl Axis for DataLayout {
    const ALL: &'static [Self] = &[DataLayout::Nchw, DataLayout::Nhwc, DataLayout::Any];
    const ANY: Self = DataLayout::Any;
    fn as_str(self) -> &'static str {
        match self {
            DataLayout::Nchw => "nchw",
            DataLayout::Nhwc => "nhwc",
            DataLayout::Any => "any",
        }
    }
}

fn axis_tag<A: Axis>(value: A) -> u8 {
    // ALL is small and fixed; position is the tag.
    A::ALL.iter().position(|v| *v == value).unwrap_or(0) as u8
}

fn axis_from_tag<A: Axis>(tag: u8) -> Option<A> {
    A::ALL.get(tag as usize).copied()
}

fn axis_parse<A: Axis>(s: &str) -> Option<A> {
    let s = s.trim().to_lowercase();
    A::ALL.iter().copied().find(|v| v.as_str() == s)
}

/// Scores one axis: `Some(1)` on exact match, `Some(0)` when the candidate
/// is the wildcard, `None` when they disagree.
fn axis_score<A: Axis>(candidate: A, requested: A) -> Option<u8> {
    if candidate == requested {
        Some(1)
    } else if candidate == A::ANY {
        Some(0)
    } else {
        None
    }
}

macro_rules! impl_axis_common {
    ($ty:ty) => {
        impl $ty {
            /// Lower-case label used in logs and kernel names.
            pub fn as_str(self) -> &'static str {
                <Self as Axis>::as_str(self)
            }

            /// Stable one-byte tag for the compact binary format.
            pub fn tag(self) -> u8 {
                axis_tag(self)
            }

            /// Inverse of `tag`.
            pub fn from_tag(tag: u8) -> Option<Self> {
                axis_from_tag(tag)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = TensorError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                axis_parse(s).ok_or_else(|| TensorError::ParsePlace(s.to_string()))
            }
        }
    };
}

impl_axis_common!(Target);
impl_axis_common!(Precision);
impl_axis_common!(DataLayout);

impl Target {
    /// Returns `true` for targets whose tensors live in ordinary host
    /// memory and can be read without a transfer.
    pub fn is_host_memory(self) -> bool {
        matches!(self, Target::Host | Target::X86 | Target::Arm)
    }
}

// ── Place ──────────────────────────────────────────────────────────

/// An immutable (target, precision, layout) triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Place {
    pub target: Target,
    pub precision: Precision,
    pub layout: DataLayout,
}

impl Place {
    /// Creates a place with the default channel-major layout.
    pub const fn new(target: Target, precision: Precision) -> Self {
        Self {
            target,
            precision,
            layout: DataLayout::Nchw,
        }
    }

    /// Creates a place with every axis given explicitly.
    pub const fn with_layout(target: Target, precision: Precision, layout: DataLayout) -> Self {
        Self {
            target,
            precision,
            layout,
        }
    }

    /// The fully wildcarded place.
    pub const fn any() -> Self {
        Self::with_layout(Target::Any, Precision::Any, DataLayout::Any)
    }

    /// Returns `true` when `self`, as a kernel's place, can serve
    /// `requested`: every axis equal or wildcarded on `self`'s side.
    pub fn is_compatible_with(&self, requested: &Place) -> bool {
        self.match_score(requested).is_some()
    }

    /// Counts exactly matching axes (0–3), or `None` if incompatible.
    pub fn match_score(&self, requested: &Place) -> Option<u8> {
        Some(
            axis_score(self.target, requested.target)?
                + axis_score(self.precision, requested.precision)?
                + axis_score(self.layout, requested.layout)?,
        )
    }

    /// Returns `true` if no axis is a wildcard.
    pub fn is_concrete(&self) -> bool {
        self.target != Target::Any && self.precision != Precision::Any && self.layout != DataLayout::Any
    }
}

impl Default for Place {
    fn default() -> Self {
        Place::new(Target::Host, Precision::Float)
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.target, self.precision, self.layout)
    }
}

/// Parses `target/precision[/layout]`, e.g. `x86/float/nchw` or `arm/fp16`.
impl FromStr for Place {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        let bad = || TensorError::ParsePlace(s.to_string());
        match parts.as_slice() {
            [t, p] => Ok(Place::new(t.parse().map_err(|_| bad())?, p.parse().map_err(|_| bad())?)),
            [t, p, l] => Ok(Place::with_layout(
                t.parse().map_err(|_| bad())?,
                p.parse().map_err(|_| bad())?,
                l.parse().map_err(|_| bad())?,
            )),
            _ => Err(bad()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X86_F: Place = Place::new(Target::X86, Precision::Float);

    #[test]
    fn test_exact_match_scores_three() {
        assert_eq!(X86_F.match_score(&X86_F), Some(3));
    }

    #[test]
    fn test_wildcard_scores_lower() {
        let any_target = Place::with_layout(Target::Any, Precision::Float, DataLayout::Nchw);
        assert_eq!(any_target.match_score(&X86_F), Some(2));
        assert_eq!(Place::any().match_score(&X86_F), Some(0));
    }

    #[test]
    fn test_incompatible() {
        let arm = Place::new(Target::Arm, Precision::Float);
        assert!(!arm.is_compatible_with(&X86_F));
        let fp16 = Place::new(Target::X86, Precision::Fp16);
        assert_eq!(fp16.match_score(&X86_F), None);
    }

    #[test]
    fn test_wildcard_is_one_directional() {
        // A concrete kernel cannot serve a wildcard request axis.
        assert!(!X86_F.is_compatible_with(&Place::any()));
        assert!(Place::any().is_compatible_with(&X86_F));
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(X86_F.to_string(), "x86/float/nchw");
        assert_eq!("x86/float/nchw".parse::<Place>().unwrap(), X86_F);
        assert_eq!("X86/Float".parse::<Place>().unwrap(), X86_F);
        let fpga: Place = "fpga/fp16/nhwc".parse().unwrap();
        assert_eq!(fpga.layout, DataLayout::Nhwc);
        assert!("x86".parse::<Place>().is_err());
        assert!("gpu/float".parse::<Place>().is_err());
    }

    #[test]
    fn test_tags_roundtrip() {
        for t in Target::ALL {
            assert_eq!(Target::from_tag(t.tag()), Some(*t));
        }
        for p in Precision::ALL {
            assert_eq!(Precision::from_tag(p.tag()), Some(*p));
        }
        for l in DataLayout::ALL {
            assert_eq!(DataLayout::from_tag(l.tag()), Some(*l));
        }
        assert_eq!(Target::from_tag(99), None);
    }

    #[test]
    fn test_host_memory_targets() {
        assert!(Target::X86.is_host_memory());
        assert!(Target::Arm.is_host_memory());
        assert!(!Target::Fpga.is_host_memory());
    }
}
