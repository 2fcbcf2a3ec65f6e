// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! Executes programs on heterogeneous kernels.
//!
//! The runtime takes:
//! - A validated `Program` and its parameter `Scope` from `model-io`.
//! - A `KernelRegistry` from `kernels`.
//!
//! The [`Optimizer`] assigns a place to every operator, the [`Executor`]
//! instantiates one kernel per operator and runs them in program order, and
//! the [`Predictor`] ties loading, placement, execution and saving together.
//!
//! # Type-State Pipeline
//! ```text
//! Predictor<Idle> → Predictor<Planned> → Predictor<Ready>
//! ```
//! Transitions are compile-time checked.
//!
//! # Threads
//! The executor itself is sequential. Decomposed kernels fan out on rayon,
//! inside a dedicated pool when `num_threads` is configured.

mod config;
mod error;
mod executor;
mod metrics;
mod optimizer;
mod predictor;

pub use config::{ModelConfig, PredictorConfig};
pub use error::RuntimeError;
pub use executor::{Executor, ExecutorOptions};
pub use metrics::{OpMetrics, RunMetrics};
pub use optimizer::{Optimizer, HOST_FALLBACK};
pub use predictor::{
    create_predictor, Idle, ModelFormat, Planned, Predictor, PredictorState, Ready, FEED_VAR, FETCH_VAR,
};
