// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `lite-rt inspect`: print operators, variables and assigned places.
//!
//! Loads the model and runs place assignment without creating kernels, so
//! the listing shows what a predictor would dispatch.

use super::{truncate, ModelArgs};
use runtime::Predictor;
use std::path::Path;

pub fn execute(args: &ModelArgs, config_file: Option<&Path>) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              lite-rt · Model Inspector              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let config = args.to_config(config_file)?;
    let planned = Predictor::new(config)?.load()?;
    let program = planned.program();
    let scope = planned.scope();

    println!("  {}", program.summary());
    println!();

    // ── Operators ──────────────────────────────────────────────
    println!(
        "  {:<4} {:<18} {:<24} {:<24} {:<18} {:<16}",
        "Idx", "Op", "Inputs", "Outputs", "Place", "Kernel",
    );
    println!("  {}", "-".repeat(108));
    for (i, op) in program.ops().iter().enumerate() {
        let inputs: Vec<&str> = op.input_names().collect();
        let outputs: Vec<&str> = op.output_names().collect();
        let place = op.place.map_or_else(|| "-".to_string(), |p| p.to_string());
        let kernel = op
            .place
            .and_then(|p| planned.registry().select(&op.op_type, &p).ok())
            .map_or("-", |e| e.name);
        println!(
            "  {:<4} {:<18} {:<24} {:<24} {:<18} {:<16}",
            i,
            truncate(&op.op_type, 18),
            truncate(&inputs.join(","), 24),
            truncate(&outputs.join(","), 24),
            place,
            kernel,
        );
    }
    println!();

    // ── Variables ──────────────────────────────────────────────
    println!("  {:<30} {:<6} {:<12} {:<20}", "Var", "DType", "Persistable", "Shape");
    println!("  {}", "-".repeat(72));
    for var in program.vars() {
        let shape = scope
            .find_tensor(&var.name)
            .map_or_else(|_| "-".to_string(), |t| t.shape().to_string());
        println!(
            "  {:<30} {:<6} {:<12} {:<20}",
            truncate(&var.name, 30),
            var.dtype.to_string(),
            if var.persistable { "yes" } else { "no" },
            shape,
        );
    }
    println!();
    Ok(())
}
