// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # lite-rt
//!
//! Command-line interface for the lite-rt inference core.
//!
//! ## Usage
//! ```bash
//! # Show operators, variables and the places chosen for them
//! lite-rt inspect --model ./models/mlp --place arm/float
//!
//! # Optimize a structured model into a naive buffer
//! lite-rt convert --model ./models/mlp --to naive --output ./models/mlp_opt
//!
//! # Run with a 1×100 input filled with 0..100
//! lite-rt run --model ./models/mlp_opt --format naive --input 1,100
//! ```

mod commands;

use clap::{Parser, Subcommand};
use commands::{ModelArgs, ModelKind};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "lite-rt",
    about = "Place-based inference runtime for heterogeneous targets",
    version,
    author
)]
struct Cli {
    /// Path to a TOML predictor configuration (overrides model arguments).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the program's operators, variables and assigned places.
    Inspect {
        #[command(flatten)]
        model: ModelArgs,
    },

    /// Load a model, assign places and save it in another format.
    Convert {
        #[command(flatten)]
        model: ModelArgs,

        /// Output format.
        #[arg(long, value_enum)]
        to: ModelKind,

        /// Write structured parameters to a single file.
        #[arg(long)]
        out_combined: bool,

        /// Output directory.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run the model once with ramp-filled inputs.
    Run {
        #[command(flatten)]
        model: ModelArgs,

        /// Input shape, e.g. "1,3,224,224". Repeat for further feed columns.
        #[arg(short, long = "input", value_delimiter = ';')]
        inputs: Vec<String>,

        /// Threads for the dedicated pool.
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Leading values printed per output.
        #[arg(long, default_value_t = 8)]
        show: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    match cli.command {
        Commands::Inspect { model } => commands::inspect::execute(&model, config),
        Commands::Convert {
            model,
            to,
            out_combined,
            output,
        } => commands::convert::execute(&model, config, to, out_combined, output),
        Commands::Run {
            model,
            inputs,
            threads,
            show,
        } => commands::run::execute(&model, config, &inputs, threads, show),
    }
}
