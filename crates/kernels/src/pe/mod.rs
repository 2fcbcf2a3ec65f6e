// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Processing-element (PE) decomposition.
//!
//! A device operator wider than one processing element is realised as a
//! pipeline of ordinary kernel instances:
//!
//! ```text
//!            ┌─ DepthwiseConvPe[0] ─┐
//! SplitPe ───┼─ DepthwiseConvPe[1] ─┼─── ConcatPe
//!            └─ DepthwiseConvPe[N] ─┘
//! ```
//!
//! The channel axis is cut by a [`ChannelPartition`]; the sub-kernels run
//! concurrently on the rayon pool and write disjoint owned outputs.

mod concat;
mod dwconv;
mod partition;
mod split;

pub use concat::ConcatPe;
pub use dwconv::{DepthwiseConvPe, DepthwiseConvSplitPe};
pub use partition::{ChannelPartition, PeConfig};
pub use split::SplitPe;

/// The channel axis of NCHW tensors.
pub(crate) const CHANNEL_AXIS: usize = 1;
