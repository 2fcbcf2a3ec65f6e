// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Predictor configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! num_threads = 4
//! enable_profiling = true
//!
//! [model]
//! kind = "full"
//! model_dir = "./models/mobilenet"
//! combined = false
//! preferred_place = { target = "arm", precision = "float", layout = "nchw" }
//! valid_places = [{ target = "x86", precision = "float", layout = "nchw" }]
//!
//! [pe]
//! max_channels_per_pe = 256
//! ```

use crate::RuntimeError;
use kernels::pe::PeConfig;
use model_io::{NaiveBuffers, NaiveSource, StructuredSource};
use std::path::{Path, PathBuf};
use tensor_core::{Place, Precision, Target};

fn default_place() -> Place {
    Place::new(Target::X86, Precision::Float)
}

/// Where the model comes from and how its operators are placed.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelConfig {
    /// A structured model; every operator is placed from the preferences.
    Full {
        model_dir: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model_file: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        param_file: Option<PathBuf>,
        /// Parameters live in a single file.
        #[serde(default)]
        combined: bool,
        #[serde(default = "default_place")]
        preferred_place: Place,
        /// Places tried, in order, when the preferred one has no kernel.
        #[serde(default)]
        valid_places: Vec<Place>,
    },
    /// An optimized naive buffer model whose operators carry their places.
    Compact {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        model_dir: Option<PathBuf>,
        /// In-memory streams; take precedence over `model_dir`.
        #[serde(skip)]
        buffers: Option<NaiveBuffers>,
    },
}

/// Configuration for a predictor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PredictorConfig {
    /// Threads for intra-operator parallelism. Defaults to the global pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_threads: Option<usize>,
    /// Whether to keep per-operator metrics.
    #[serde(default = "default_true")]
    pub enable_profiling: bool,
    pub model: ModelConfig,
    /// Processing-element limits for decomposed device kernels.
    #[serde(default)]
    pub pe: PeConfig,
}

fn default_true() -> bool {
    true
}

impl PredictorConfig {
    /// A structured, non-combined model placed at `preferred_place`.
    pub fn full(model_dir: impl Into<PathBuf>, preferred_place: Place) -> Self {
        Self::with_model(ModelConfig::Full {
            model_dir: model_dir.into(),
            model_file: None,
            param_file: None,
            combined: false,
            preferred_place,
            valid_places: Vec::new(),
        })
    }

    /// A naive buffer model directory.
    pub fn compact(model_dir: impl Into<PathBuf>) -> Self {
        Self::with_model(ModelConfig::Compact {
            model_dir: Some(model_dir.into()),
            buffers: None,
        })
    }

    /// A naive buffer model held in memory.
    pub fn compact_from_buffers(buffers: NaiveBuffers) -> Self {
        Self::with_model(ModelConfig::Compact {
            model_dir: None,
            buffers: Some(buffers),
        })
    }

    fn with_model(model: ModelConfig) -> Self {
        Self {
            num_threads: None,
            enable_profiling: true,
            model,
            pe: PeConfig::default(),
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| RuntimeError::Config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML. In-memory buffers are not written.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::Config(format!("TOML serialise error: {e}")))
    }

    /// Checks that the configuration can describe a loadable model.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.num_threads == Some(0) {
            return Err(RuntimeError::Config("num_threads must be at least 1".into()));
        }
        match &self.model {
            ModelConfig::Full {
                model_file,
                param_file,
                combined,
                ..
            } => {
                if !combined && (model_file.is_some() || param_file.is_some()) {
                    return Err(RuntimeError::Config(
                        "model_file and param_file require combined = true".into(),
                    ));
                }
            }
            ModelConfig::Compact {
                model_dir: None,
                buffers: None,
            } => {
                return Err(RuntimeError::Config(
                    "a compact model needs model_dir or in-memory buffers".into(),
                ))
            }
            ModelConfig::Compact { .. } => {}
        }
        Ok(())
    }

    /// The structured source of a `Full` configuration.
    pub fn structured_source(&self) -> Option<StructuredSource> {
        let ModelConfig::Full {
            model_dir,
            model_file,
            param_file,
            combined,
            ..
        } = &self.model
        else {
            return None;
        };
        let mut source = if *combined {
            StructuredSource::combined(model_dir)
        } else {
            StructuredSource::new(model_dir)
        };
        source.model_file = model_file.clone();
        source.param_file = param_file.clone();
        Some(source)
    }

    /// The naive source of a `Compact` configuration.
    pub fn naive_source(&self) -> Option<NaiveSource> {
        match &self.model {
            ModelConfig::Compact {
                buffers: Some(b), ..
            } => Some(NaiveSource::from(b.clone())),
            ModelConfig::Compact {
                model_dir: Some(dir),
                ..
            } => Some(NaiveSource::dir(dir)),
            _ => None,
        }
    }
}
