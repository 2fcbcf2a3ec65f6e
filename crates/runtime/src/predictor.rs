// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The predictor pipeline with type-state enforced ordering.
//!
//! ```text
//! Predictor<Idle>
//!     │  .load()      read the model, assign places
//!     ▼
//! Predictor<Planned>
//!     │  .prepare()   create kernels, build the thread pool
//!     ▼
//! Predictor<Ready>
//!     │  .get_input(i) / .run() / .get_output(i)
//!     ▼
//!   RunMetrics
//! ```
//!
//! Each transition consumes the old value, so state data only exists in the
//! states that own it.

use crate::{Executor, ExecutorOptions, ModelConfig, Optimizer, PredictorConfig, RunMetrics, RuntimeError};
use kernels::{KernelOptions, KernelRegistry};
use model_io::{load_naive, load_structured, save_naive, save_structured};
use model_ir::{Program, Scope, Validated, Variable};
use std::path::Path;
use tensor_core::{Place, Precision, Target, Tensor};

/// Tensor list the `feed` operators read from.
pub const FEED_VAR: &str = "feed";
/// Tensor list the `fetch` operators write into.
pub const FETCH_VAR: &str = "fetch";

// ── Type-state markers ─────────────────────────────────────────

/// Created, nothing loaded.
#[derive(Debug)]
pub struct Idle;

/// Program loaded and placed; parameters in the scope.
#[derive(Debug)]
pub struct Planned {
    program: Program<Validated>,
    scope: Scope,
}

/// Kernels instantiated; ready to run.
pub struct Ready {
    program: Program<Validated>,
    scope: Scope,
    executor: Executor,
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for Ready {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ready")
            .field("program", &self.program.summary())
            .field("executor", &self.executor)
            .field("threads", &self.pool.as_ref().map(rayon::ThreadPool::current_num_threads))
            .finish()
    }
}

/// Sealed trait for predictor states.
pub trait PredictorState: std::fmt::Debug + private::Sealed {}
impl PredictorState for Idle {}
impl PredictorState for Planned {}
impl PredictorState for Ready {}

mod private {
    pub trait Sealed {}
    impl Sealed for super::Idle {}
    impl Sealed for super::Planned {}
    impl Sealed for super::Ready {}
}

/// Output format for [`Predictor::save_optimized_model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Structured { combined: bool },
    NaiveBuffer,
}

/// Loads, prepares and runs one model.
///
/// # Example
/// ```no_run
/// use runtime::{create_predictor, PredictorConfig};
///
/// # fn example() -> Result<(), runtime::RuntimeError> {
/// let mut predictor = create_predictor(PredictorConfig::compact("./model_opt"))?;
/// predictor.get_input(0)?.resize(tensor_core::Shape::matrix(1, 100));
/// let metrics = predictor.run()?;
/// println!("{}", metrics.summary());
/// println!("{:?}", predictor.get_output(0)?.as_f32_slice());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Predictor<S: PredictorState = Idle> {
    config: PredictorConfig,
    registry: KernelRegistry,
    state: S,
}

/// Builds a ready predictor from `config` with the built-in kernels.
pub fn create_predictor(config: PredictorConfig) -> Result<Predictor<Ready>, RuntimeError> {
    Predictor::new(config)?.load()?.prepare()
}

impl<S: PredictorState> Predictor<S> {
    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn registry(&self) -> &KernelRegistry {
        &self.registry
    }
}

// ── Idle → Planned ─────────────────────────────────────────────

impl Predictor<Idle> {
    /// Validates `config` and registers the built-in kernels.
    pub fn new(config: PredictorConfig) -> Result<Self, RuntimeError> {
        let registry = KernelRegistry::with_builtins().map_err(RuntimeError::Registry)?;
        Self::with_registry(config, registry)
    }

    /// Uses a caller-built registry instead of the built-ins.
    pub fn with_registry(config: PredictorConfig, registry: KernelRegistry) -> Result<Self, RuntimeError> {
        config.validate()?;
        Ok(Self {
            config,
            registry,
            state: Idle,
        })
    }

    /// Reads the configured model and assigns a place to every operator.
    pub fn load(self) -> Result<Predictor<Planned>, RuntimeError> {
        let (program, scope) = match (self.config.structured_source(), self.config.naive_source()) {
            (Some(source), _) => load_structured(&source)?,
            (None, Some(source)) => load_naive(&source)?,
            (None, None) => {
                return Err(RuntimeError::Config("configuration names no model source".into()))
            }
        };
        self.with_program(program, scope)
    }

    /// Plans an already loaded program.
    pub fn with_program(self, mut program: Program<Validated>, mut scope: Scope) -> Result<Predictor<Planned>, RuntimeError> {
        optimizer_for(&self.config).run(&mut program, &self.registry)?;
        for list in [FEED_VAR, FETCH_VAR] {
            if !scope.contains(list) {
                scope.insert(list, Variable::TensorList(Vec::new()));
            }
        }
        tracing::info!("{}", program.summary());
        Ok(Predictor {
            config: self.config,
            registry: self.registry,
            state: Planned { program, scope },
        })
    }
}

fn preferred_place(config: &PredictorConfig) -> Place {
    match &config.model {
        ModelConfig::Full { preferred_place, .. } => *preferred_place,
        ModelConfig::Compact { .. } => Place::new(Target::X86, Precision::Float),
    }
}

fn optimizer_for(config: &PredictorConfig) -> Optimizer {
    match &config.model {
        ModelConfig::Full {
            preferred_place,
            valid_places,
            ..
        } => Optimizer::new(*preferred_place, valid_places),
        ModelConfig::Compact { .. } => Optimizer::new(preferred_place(config), &[]).keep_assigned(true),
    }
}

// ── Planned → Ready ────────────────────────────────────────────

impl Predictor<Planned> {
    pub fn program(&self) -> &Program<Validated> {
        &self.state.program
    }

    pub fn scope(&self) -> &Scope {
        &self.state.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.state.scope
    }

    /// Instantiates kernels and the optional thread pool.
    pub fn prepare(self) -> Result<Predictor<Ready>, RuntimeError> {
        let pool = match self.config.num_threads {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| RuntimeError::Config(format!("cannot build thread pool: {e}")))?,
            ),
            None => None,
        };
        let options = ExecutorOptions {
            default_place: preferred_place(&self.config),
            kernel: KernelOptions { pe: self.config.pe },
            profile: self.config.enable_profiling,
        };
        let executor = Executor::prepare(&self.state.program, &self.registry, options)?;
        tracing::info!(
            threads = pool.as_ref().map_or(0, rayon::ThreadPool::current_num_threads),
            "predictor ready"
        );

        let Planned { program, scope } = self.state;
        Ok(Predictor {
            config: self.config,
            registry: self.registry,
            state: Ready {
                program,
                scope,
                executor,
                pool,
            },
        })
    }
}

// ── Ready ──────────────────────────────────────────────────────

impl Predictor<Ready> {
    pub fn program(&self) -> &Program<Validated> {
        &self.state.program
    }

    pub fn scope(&self) -> &Scope {
        &self.state.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.state.scope
    }

    /// `(op_type, kernel, place)` for every operator.
    pub fn kernels(&self) -> impl Iterator<Item = (&str, &str, Place)> {
        self.state.executor.kernels()
    }

    /// Input slot `i` of the feed list, created empty if missing.
    pub fn get_input(&mut self, i: usize) -> Result<&mut Tensor, RuntimeError> {
        let list = self.state.scope.tensor_list_mut(FEED_VAR)?;
        if list.len() <= i {
            list.resize_with(i + 1, Tensor::empty);
        }
        Ok(&mut list[i])
    }

    /// Output slot `i` of the fetch list.
    pub fn get_output(&self, i: usize) -> Result<&Tensor, RuntimeError> {
        let list = self
            .state
            .scope
            .find_var(FETCH_VAR)
            .and_then(Variable::as_tensor_list)
            .unwrap_or(&[]);
        list.get(i).ok_or(RuntimeError::IndexOutOfRange {
            kind: "output",
            index: i,
            available: list.len(),
        })
    }

    pub fn num_outputs(&self) -> usize {
        self.state
            .scope
            .find_var(FETCH_VAR)
            .and_then(Variable::as_tensor_list)
            .map_or(0, <[Tensor]>::len)
    }

    /// Runs the program once over the current scope.
    pub fn run(&mut self) -> Result<RunMetrics, RuntimeError> {
        let Ready {
            scope,
            executor,
            pool,
            ..
        } = &mut self.state;
        match pool {
            Some(pool) => pool.install(|| executor.run(scope)),
            None => executor.run(scope),
        }
    }

    /// Saves the placed program and its parameters.
    ///
    /// The chosen place of every operator is recorded, so a compact load of
    /// the result skips place assignment.
    pub fn save_optimized_model(&self, dir: impl AsRef<Path>, format: ModelFormat) -> Result<(), RuntimeError> {
        let dir = dir.as_ref();
        let result = match format {
            ModelFormat::Structured { combined } => {
                save_structured(dir, &self.state.program, &self.state.scope, combined)
            }
            ModelFormat::NaiveBuffer => save_naive(dir, &self.state.program, &self.state.scope),
        };
        result.map_err(RuntimeError::Save)?;
        tracing::info!(dir = %dir.display(), ?format, "saved optimized model");
        Ok(())
    }
}
