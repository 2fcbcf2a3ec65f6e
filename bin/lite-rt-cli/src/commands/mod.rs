// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

pub mod convert;
pub mod inspect;
pub mod run;

use anyhow::Context;
use runtime::{ModelConfig, PredictorConfig};
use std::path::{Path, PathBuf};
use tensor_core::Place;
use tracing_subscriber::EnvFilter;

/// Installs a formatted subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// On-disk model formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModelKind {
    Structured,
    Naive,
}

/// Arguments naming a model and how to place it.
#[derive(Debug, Clone, clap::Args)]
pub struct ModelArgs {
    /// Model directory.
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// Format of the model directory.
    #[arg(short, long, value_enum, default_value_t = ModelKind::Structured)]
    pub format: ModelKind,

    /// Structured parameters live in a single file.
    #[arg(long)]
    pub combined: bool,

    /// Preferred place, e.g. "arm/float" or "fpga/fp16/nchw".
    #[arg(short, long, default_value = "x86/float")]
    pub place: Place,

    /// Fallback places, comma-separated, tried in order.
    #[arg(long = "valid", value_delimiter = ',')]
    pub valid_places: Vec<Place>,
}

impl ModelArgs {
    /// Builds the predictor configuration, preferring `config_file`.
    pub fn to_config(&self, config_file: Option<&Path>) -> anyhow::Result<PredictorConfig> {
        if let Some(path) = config_file {
            return PredictorConfig::from_file(path)
                .with_context(|| format!("loading config '{}'", path.display()));
        }
        let dir = self
            .model
            .clone()
            .context("either --model or --config is required")?;
        let config = match self.format {
            ModelKind::Naive => PredictorConfig::compact(dir),
            ModelKind::Structured => {
                let mut config = PredictorConfig::full(&dir, self.place);
                config.model = ModelConfig::Full {
                    model_dir: dir,
                    model_file: None,
                    param_file: None,
                    combined: self.combined,
                    preferred_place: self.place,
                    valid_places: self.valid_places.clone(),
                };
                config
            }
        };
        config.validate()?;
        Ok(config)
    }
}

/// Shortens `s` to `max_len` characters with an ellipsis.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
