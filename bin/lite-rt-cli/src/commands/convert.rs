// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `lite-rt convert`: save a placed model in another format.

use super::{ModelArgs, ModelKind};
use anyhow::Context;
use runtime::{create_predictor, ModelFormat};
use std::path::{Path, PathBuf};

pub fn execute(
    args: &ModelArgs,
    config_file: Option<&Path>,
    to: ModelKind,
    out_combined: bool,
    output: PathBuf,
) -> anyhow::Result<()> {
    let config = args.to_config(config_file)?;
    let predictor = create_predictor(config)?;

    let format = match to {
        ModelKind::Structured => ModelFormat::Structured {
            combined: out_combined,
        },
        ModelKind::Naive => ModelFormat::NaiveBuffer,
    };
    predictor
        .save_optimized_model(&output, format)
        .with_context(|| format!("writing '{}'", output.display()))?;

    println!("  {}", predictor.program().summary());
    println!("  Saved {format:?} model to {}", output.display());
    Ok(())
}
