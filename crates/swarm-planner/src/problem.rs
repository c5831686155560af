//! Hand-off to the solver generator
//!
//! An [`OptimizerProblem`] bundles the cost model with the solver and build
//! settings. Code generation, compilation and the optimizer runtime live
//! behind the [`SolverGenerator`] trait; [`JsonExporter`] writes a
//! self-describing problem file for an external generator.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;
use tracing::info;

use swarm_core::Tape;

use crate::config::{BuildConfig, OptimizerMeta, PlannerConfig, SolverConfig};
use crate::error::{ExportError, ModelError};
use crate::layout::ProblemLayout;
use crate::model::{BoxBounds, CostModel, CostModelBuilder};

/// Everything a solver generator needs
#[derive(Debug, Clone)]
pub struct OptimizerProblem {
    model: CostModel,
    solver: SolverConfig,
    build: BuildConfig,
    meta: OptimizerMeta,
}

impl OptimizerProblem {
    /// Wrap a model with default solver/build settings
    pub fn new(model: CostModel) -> Self {
        Self {
            model,
            solver: SolverConfig::default(),
            build: BuildConfig::default(),
            meta: OptimizerMeta::default(),
        }
    }

    /// Build the model and take solver/build settings from `config`
    pub fn from_config(config: &PlannerConfig) -> Result<Self, ModelError> {
        let model = CostModelBuilder::new(config.clone()).build()?;
        Ok(Self::new(model)
            .with_solver_config(config.solver.clone())
            .with_build_config(config.build.clone())
            .with_meta(config.meta.clone()))
    }

    pub fn with_solver_config(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_build_config(mut self, build: BuildConfig) -> Self {
        self.build = build;
        self
    }

    pub fn with_meta(mut self, meta: OptimizerMeta) -> Self {
        self.meta = meta;
        self
    }

    pub fn model(&self) -> &CostModel {
        &self.model
    }

    pub fn solver_config(&self) -> &SolverConfig {
        &self.solver
    }

    pub fn build_config(&self) -> &BuildConfig {
        &self.build
    }

    pub fn meta(&self) -> &OptimizerMeta {
        &self.meta
    }

    /// Directory the generated optimizer goes to
    pub fn output_directory(&self) -> PathBuf {
        self.build.build_directory.join(&self.meta.optimizer_name)
    }

    /// Serializable description with the cost compiled to a tape
    pub fn describe(&self) -> Result<ProblemDescription, ModelError> {
        Ok(ProblemDescription {
            meta: self.meta.clone(),
            layout: *self.model.layout(),
            decision_name: self.model.decision().name().to_string(),
            parameter_name: self.model.parameters().name().to_string(),
            bounds: self.model.bounds().clone(),
            cost: self.model.compile()?,
            solver: self.solver.clone(),
            build: self.build.clone(),
        })
    }
}

/// Problem file contents
#[derive(Debug, Clone, Serialize)]
pub struct ProblemDescription {
    pub meta: OptimizerMeta,
    pub layout: ProblemLayout,
    pub decision_name: String,
    pub parameter_name: String,
    pub bounds: BoxBounds,
    pub cost: Tape,
    pub solver: SolverConfig,
    pub build: BuildConfig,
}

/// Turns an [`OptimizerProblem`] into a solver artifact
pub trait SolverGenerator {
    type Artifact;

    fn generate(&self, problem: &OptimizerProblem) -> Result<Self::Artifact, ExportError>;
}

/// Writes `<build_directory>/<optimizer_name>/problem.json`
#[derive(Debug, Clone)]
pub struct JsonExporter {
    pub pretty: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonExporter {
    pub const FILE_NAME: &'static str = "problem.json";
}

impl SolverGenerator for JsonExporter {
    type Artifact = PathBuf;

    fn generate(&self, problem: &OptimizerProblem) -> Result<PathBuf, ExportError> {
        let description = problem.describe()?;
        let directory = problem.output_directory();
        fs::create_dir_all(&directory)?;

        let path = directory.join(Self::FILE_NAME);
        let text = if self.pretty {
            serde_json::to_string_pretty(&description)?
        } else {
            serde_json::to_string(&description)?
        };
        fs::write(&path, text)?;

        info!(
            path = %path.display(),
            optimizer = %problem.meta().optimizer_name,
            tape_len = description.cost.len(),
            "exported optimizer problem"
        );
        Ok(path)
    }
}
