//! Configuration management for the training pipeline.
//!
//! Three YAML documents drive every run:
//! - `config/config.yaml`: artifact locations, one section per stage
//! - `params.yaml`: model and split hyperparameters
//! - `schema.yaml`: expected dataset columns and the target column
//!
//! [`ConfigurationManager`] loads and validates them once, then hands out one
//! immutable config value per stage, creating the stage directory on the way.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::common::{create_directories, ensure_gitkeep, read_yaml};
use crate::paths::{CONFIG_FILE_PATH, PARAMS_FILE_PATH, SCHEMA_FILE_PATH};

pub mod defaults;
pub mod entity;
pub mod validation;

pub use defaults::*;
pub use entity::*;

/// Contents of `config/config.yaml`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArtifactsConfig {
    pub artifacts_root: PathBuf,
    pub data_ingestion: DataIngestionSection,
    pub data_validation: DataValidationSection,
    pub data_transformation: DataTransformationSection,
    pub model_trainer: ModelTrainerSection,
    pub model_evaluation: ModelEvaluationSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DataIngestionSection {
    pub root_dir: PathBuf,
    pub source_url: String,
    pub local_data_file: PathBuf,
    pub unzip_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DataValidationSection {
    pub root_dir: PathBuf,
    pub unzip_data_path: PathBuf,
    pub status_file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DataTransformationSection {
    pub root_dir: PathBuf,
    pub unzip_data_path: PathBuf,
    pub status_file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelTrainerSection {
    pub root_dir: PathBuf,
    pub train_data_path: PathBuf,
    pub test_data_path: PathBuf,
    pub model_name: String,
}

/// Contents of `schema.yaml`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DataSchema {
    /// Column name to dtype name (`float64`, `int64`, `object`, ...)
    pub columns: BTreeMap<String, String>,
    pub target: TargetColumn,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TargetColumn {
    pub name: String,
}

/// Resolves the YAML documents into per-stage configs.
#[derive(Debug, Clone)]
pub struct ConfigurationManager {
    config: ArtifactsConfig,
    params: Params,
    schema: DataSchema,
    tracking_uri: Option<String>,
}

impl ConfigurationManager {
    /// Load the documents from their default locations in the working directory.
    pub fn load() -> Result<Self> {
        Self::new(
            Path::new(CONFIG_FILE_PATH),
            Path::new(PARAMS_FILE_PATH),
            Path::new(SCHEMA_FILE_PATH),
        )
    }

    /// Load the documents from explicit paths.
    ///
    /// The tracking URI comes from `MLFLOW_TRACKING_URI`; callers that load a
    /// `.env` file must do so before calling this.
    pub fn new(config_path: &Path, params_path: &Path, schema_path: &Path) -> Result<Self> {
        let config: ArtifactsConfig = read_yaml(config_path)?;
        let params: Params = read_yaml(params_path)?;
        let schema: DataSchema = read_yaml(schema_path)?;

        Self::from_parts(config, params, schema, tracking_uri_from_env())
    }

    /// Build a manager from already-parsed documents.
    pub fn from_parts(
        config: ArtifactsConfig,
        params: Params,
        schema: DataSchema,
        tracking_uri: Option<String>,
    ) -> Result<Self> {
        config.validate()?;
        params.validate()?;
        schema.validate()?;

        create_directories(&[&config.artifacts_root])?;

        Ok(Self {
            config,
            params,
            schema,
            tracking_uri,
        })
    }

    /// Override the tracking URI resolved from the environment.
    pub fn with_tracking_uri(mut self, tracking_uri: Option<String>) -> Self {
        self.tracking_uri = tracking_uri;
        self
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn schema(&self) -> &DataSchema {
        &self.schema
    }

    pub fn tracking_uri(&self) -> Option<&str> {
        self.tracking_uri.as_deref()
    }

    pub fn get_data_ingestion_config(&self) -> Result<DataIngestionConfig> {
        let section = &self.config.data_ingestion;
        prepare_stage_dir(&section.root_dir)?;

        Ok(DataIngestionConfig {
            root_dir: section.root_dir.clone(),
            source_url: section.source_url.clone(),
            local_data_file: section.local_data_file.clone(),
            unzip_dir: section.unzip_dir.clone(),
        })
    }

    pub fn get_data_validation_config(&self) -> Result<DataValidationConfig> {
        let section = &self.config.data_validation;
        prepare_stage_dir(&section.root_dir)?;

        Ok(DataValidationConfig {
            root_dir: section.root_dir.clone(),
            unzip_data_path: section.unzip_data_path.clone(),
            status_file_path: section.status_file_path.clone(),
            data_schema: self.schema.columns.clone(),
        })
    }

    pub fn get_data_transformation_config(&self) -> Result<DataTransformationConfig> {
        let section = &self.config.data_transformation;
        prepare_stage_dir(&section.root_dir)?;

        Ok(DataTransformationConfig {
            root_dir: section.root_dir.clone(),
            unzip_data_path: section.unzip_data_path.clone(),
            status_file_path: section.status_file_path.clone(),
            test_size: self.params.test_size,
            random_state: self.params.random_state,
        })
    }

    pub fn get_model_trainer_config(&self) -> Result<ModelTrainerConfig> {
        let section = &self.config.model_trainer;
        prepare_stage_dir(&section.root_dir)?;

        Ok(ModelTrainerConfig {
            root_dir: section.root_dir.clone(),
            train_data_path: section.train_data_path.clone(),
            test_data_path: section.test_data_path.clone(),
            model_name: section.model_name.clone(),
            alpha: self.params.alpha,
            l1_ratio: self.params.l1_ratio,
            random_state: self.params.random_state,
            max_iter: self.params.max_iter,
            tol: self.params.tol,
            target_column: self.schema.target.name.clone(),
        })
    }

    pub fn get_model_evaluation_config(&self) -> Result<ModelEvaluationConfig> {
        let section = &self.config.model_evaluation;
        prepare_stage_dir(&section.root_dir)?;

        Ok(ModelEvaluationConfig {
            root_dir: section.root_dir.clone(),
            test_data_path: section.test_data_path.clone(),
            model_path: section.model_path.clone(),
            metrics_file_path: section.metrics_file_path.clone(),
            alpha: self.params.alpha,
            l1_ratio: self.params.l1_ratio,
            random_state: self.params.random_state,
            target_column: self.schema.target.name.clone(),
            mlflow_uri: self.tracking_uri.clone(),
            experiment_name: section.experiment_name.clone(),
            registered_model_name: section.registered_model_name.clone(),
        })
    }
}

fn prepare_stage_dir(root_dir: &Path) -> Result<()> {
    create_directories(&[root_dir])?;
    ensure_gitkeep(root_dir)
}

/// Tracking URI from the environment; blank values count as unset.
pub fn tracking_uri_from_env() -> Option<String> {
    std::env::var(TRACKING_URI_ENV)
        .ok()
        .map(|uri| uri.trim().to_string())
        .filter(|uri| !uri.is_empty())
}
