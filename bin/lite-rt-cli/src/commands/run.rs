// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `lite-rt run`: execute one pass with ramp-filled inputs.
//!
//! Demonstrates the full type-state pipeline:
//! ```text
//! Predictor<Idle> → load → <Planned> → prepare → <Ready> → run
//! ```

use super::{truncate, ModelArgs};
use anyhow::Context;
use runtime::Predictor;
use std::path::Path;
use tensor_core::{ops, DType, Shape, Tensor};

pub fn execute(
    args: &ModelArgs,
    config_file: Option<&Path>,
    inputs: &[String],
    threads: Option<usize>,
    show: usize,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              lite-rt · Inference Runner             ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let mut config = args.to_config(config_file)?;
    if threads.is_some() {
        config.num_threads = threads;
    }
    let shapes = inputs
        .iter()
        .map(|s| parse_shape(s))
        .collect::<anyhow::Result<Vec<_>>>()?;

    // Step 1: Idle → Planned (load model + assign places).
    println!("  [1/3] Loading model and assigning places...");
    let planned = Predictor::new(config)?.load()?;
    println!("        {}", planned.program().summary());
    println!();

    // Step 2: Planned → Ready (create kernels).
    println!("  [2/3] Creating kernels...");
    let mut ready = planned.prepare()?;
    for (op, kernel, place) in ready.kernels() {
        println!("        {op:<18} → {kernel:<16} @ {place}");
    }
    println!();

    // Step 3: Ready → Run.
    println!("  [3/3] Running...");
    for (i, shape) in shapes.into_iter().enumerate() {
        let values: Vec<f32> = (0..shape.num_elements()).map(|v| v as f32).collect();
        *ready.get_input(i)? = Tensor::from_f32(shape, &values)?;
    }
    let metrics = ready.run()?;
    println!();

    // ── Outputs ────────────────────────────────────────────────
    for i in 0..ready.num_outputs() {
        let out = ready.get_output(i)?;
        let as_f32 = if out.dtype() == DType::F32 {
            out.clone()
        } else {
            ops::cast(&out.view(), DType::F32)
                .with_context(|| format!("output {i} has element type {}", out.dtype()))?
        };
        let head: Vec<String> = as_f32
            .as_f32_slice()
            .iter()
            .take(show)
            .map(|v| format!("{v:.4}"))
            .collect();
        println!("  Output {i} {}: [{}]", out.shape(), head.join(", "));
    }
    println!();

    // ── Metrics ────────────────────────────────────────────────
    println!("  {}", metrics.summary());
    if !metrics.op_metrics.is_empty() {
        println!();
        println!("  {:<4} {:<18} {:<16} {:>10} {:>12} {:>5}", "Idx", "Op", "Kernel", "Init", "Dispatch", "Conv");
        println!("  {}", "-".repeat(72));
        for op in metrics.slowest(10) {
            println!(
                "  {:<4} {:<18} {:<16} {:>8.3}ms {:>10.3}ms {:>5}",
                op.index,
                truncate(&op.op_type, 18),
                truncate(&op.kernel, 16),
                op.init_duration.as_secs_f64() * 1000.0,
                op.dispatch_duration.as_secs_f64() * 1000.0,
                op.conversions,
            );
        }
    }
    println!();
    Ok(())
}

/// Parses `"1,3,224,224"` into a shape.
fn parse_shape(s: &str) -> anyhow::Result<Shape> {
    let dims = s
        .split(',')
        .map(|d| {
            d.trim()
                .parse::<usize>()
                .with_context(|| format!("invalid dimension '{d}' in shape '{s}'"))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Shape::new(dims))
}
