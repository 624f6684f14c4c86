//! Pipeline stages and their sequencing.
//!
//! Stages always run in the order of [`Stage::ALL`]. Each one resolves its
//! config from the [`ConfigurationManager`], reads its inputs from disk and
//! writes its outputs back. The first failing stage aborts the pipeline.

use anyhow::Result;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::config::ConfigurationManager;

pub mod evaluation;
pub mod ingestion;
pub mod trainer;
pub mod transformation;
pub mod validation;

pub use evaluation::{EvaluationOutcome, ModelEvaluation};
pub use ingestion::{DataIngestion, DataSource, IngestionOutcome};
pub use trainer::ModelTrainer;
pub use transformation::{DataTransformation, SplitShapes};
pub use validation::{read_validation_status, write_validation_status, DataValidation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    DataIngestion,
    DataValidation,
    DataTransformation,
    ModelTrainer,
    ModelEvaluation,
}

impl Stage {
    /// Every stage, in execution order
    pub const ALL: &'static [Stage] = &[
        Stage::DataIngestion,
        Stage::DataValidation,
        Stage::DataTransformation,
        Stage::ModelTrainer,
        Stage::ModelEvaluation,
    ];

    /// Name used in log lines
    pub fn name(self) -> &'static str {
        match self {
            Self::DataIngestion => "Data Ingestion Stage",
            Self::DataValidation => "Data Validation Stage",
            Self::DataTransformation => "Data Transformation Stage",
            Self::ModelTrainer => "Model Trainer Stage",
            Self::ModelEvaluation => "Model Evaluation Stage",
        }
    }

    /// Short name accepted on the command line
    pub fn key(self) -> &'static str {
        match self {
            Self::DataIngestion => "ingest",
            Self::DataValidation => "validate",
            Self::DataTransformation => "transform",
            Self::ModelTrainer => "train",
            Self::ModelEvaluation => "evaluate",
        }
    }

    fn position(self) -> usize {
        Self::ALL
            .iter()
            .position(|stage| *stage == self)
            .unwrap_or_default()
    }

    /// Contiguous run of stages from `from` through `to`, inclusive.
    pub fn range(from: Stage, to: Stage) -> Result<&'static [Stage]> {
        if from > to {
            anyhow::bail!(
                "Stage '{}' comes after '{}'; nothing to run",
                from.key(),
                to.key()
            );
        }
        Ok(&Self::ALL[from.position()..=to.position()])
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "ingest" | "ingestion" | "data_ingestion" => Ok(Self::DataIngestion),
            "validate" | "validation" | "data_validation" => Ok(Self::DataValidation),
            "transform" | "transformation" | "data_transformation" => {
                Ok(Self::DataTransformation)
            }
            "train" | "trainer" | "model_trainer" => Ok(Self::ModelTrainer),
            "evaluate" | "evaluation" | "model_evaluation" => Ok(Self::ModelEvaluation),
            other => Err(format!(
                "unknown stage '{}' (expected one of: ingest, validate, transform, train, evaluate)",
                other
            )),
        }
    }
}

/// Result of one completed stage
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: Stage,
    pub elapsed: Duration,
    pub summary: String,
}

/// Resolve the stage config and run the stage. Returns a one-line summary.
pub fn run_stage(manager: &ConfigurationManager, stage: Stage) -> Result<String> {
    let summary = match stage {
        Stage::DataIngestion => {
            let config = manager.get_data_ingestion_config()?;
            DataIngestion::new(config).run()?.to_string()
        }
        Stage::DataValidation => {
            let config = manager.get_data_validation_config()?;
            let report = DataValidation::new(config).run()?;
            if report.is_valid() {
                "schema matches".to_string()
            } else {
                format!("schema mismatch: {}", report.issues().join("; "))
            }
        }
        Stage::DataTransformation => {
            let config = manager.get_data_transformation_config()?;
            DataTransformation::new(config).run()?.to_string()
        }
        Stage::ModelTrainer => {
            let config = manager.get_model_trainer_config()?;
            let path = config.model_path();
            let model = ModelTrainer::new(config).run()?;
            format!(
                "{} coefficients, {} iterations, saved to {}",
                model.coefficients.len(),
                model.n_iter,
                path.display()
            )
        }
        Stage::ModelEvaluation => {
            let config = manager.get_model_evaluation_config()?;
            ModelEvaluation::new(config).run()?.to_string()
        }
    };
    Ok(summary)
}

/// Run `stages` in order, stopping at the first failure.
pub fn run_pipeline(manager: &ConfigurationManager, stages: &[Stage]) -> Result<Vec<StageReport>> {
    let mut reports = Vec::with_capacity(stages.len());

    for &stage in stages {
        tracing::info!("{} has started", stage.name());
        let started = Instant::now();

        match run_stage(manager, stage) {
            Ok(summary) => {
                tracing::info!("{} has completed", stage.name());
                reports.push(StageReport {
                    stage,
                    elapsed: started.elapsed(),
                    summary,
                });
            }
            Err(e) => {
                tracing::error!("{} failed: {:#}", stage.name(), e);
                return Err(e.context(format!("{} failed", stage.name())));
            }
        }
    }

    Ok(reports)
}
