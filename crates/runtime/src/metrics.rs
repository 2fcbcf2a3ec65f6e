// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Run profiling metrics.
//!
//! [`RunMetrics`] records how long each operator spent in `init` and in
//! `dispatch`, and how many implicit conversions it needed.

use std::time::Duration;

/// Metrics for a single operator.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OpMetrics {
    /// Position in the program.
    pub index: usize,
    pub op_type: String,
    /// Implementation that ran, e.g. `"fc_x86"`.
    pub kernel: String,
    pub init_duration: Duration,
    pub dispatch_duration: Duration,
    /// Implicit `io_copy` / `calib` / `layout` steps applied to inputs.
    pub conversions: usize,
}

/// Aggregate metrics for one run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RunMetrics {
    /// Wall-clock time for the whole run.
    pub total_duration: Duration,
    pub total_init_duration: Duration,
    pub total_dispatch_duration: Duration,
    pub total_conversions: usize,
    /// Per-operator metrics; empty when profiling is disabled.
    pub op_metrics: Vec<OpMetrics>,
    /// Operators executed.
    pub num_ops: usize,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one operator's timings. The per-op entry is kept only when
    /// `detailed` is set.
    pub fn record_op(&mut self, op: OpMetrics, detailed: bool) {
        self.num_ops += 1;
        self.total_init_duration += op.init_duration;
        self.total_dispatch_duration += op.dispatch_duration;
        self.total_conversions += op.conversions;
        if detailed {
            self.op_metrics.push(op);
        }
    }

    pub fn finalise(&mut self, total: Duration) {
        self.total_duration = total;
    }

    /// The `n` slowest operators by dispatch time.
    pub fn slowest(&self, n: usize) -> Vec<&OpMetrics> {
        let mut ops: Vec<&OpMetrics> = self.op_metrics.iter().collect();
        ops.sort_by(|a, b| b.dispatch_duration.cmp(&a.dispatch_duration));
        ops.truncate(n);
        ops
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "Run: {:.3}ms total, {} ops, {:.3}ms init, {:.3}ms dispatch, {} conversions",
            self.total_duration.as_secs_f64() * 1000.0,
            self.num_ops,
            self.total_init_duration.as_secs_f64() * 1000.0,
            self.total_dispatch_duration.as_secs_f64() * 1000.0,
            self.total_conversions,
        )
    }
}
