//! Config command: print the per-stage configuration the pipeline would use

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;

use mlpipe::config::{
    ConfigurationManager, DataIngestionConfig, DataTransformationConfig, DataValidationConfig,
    ModelEvaluationConfig, ModelTrainerConfig,
};
use mlpipe::tracking::TrackingStore;
use mlpipe::ui::{self, colors};

use crate::GlobalArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Every stage config, as resolved from the YAML documents and environment
#[derive(Debug, Serialize)]
pub struct ResolvedConfig {
    pub tracking_store: String,
    pub data_ingestion: DataIngestionConfig,
    pub data_validation: DataValidationConfig,
    pub data_transformation: DataTransformationConfig,
    pub model_trainer: ModelTrainerConfig,
    pub model_evaluation: ModelEvaluationConfig,
}

impl ResolvedConfig {
    pub fn resolve(manager: &ConfigurationManager) -> Result<Self> {
        let store = TrackingStore::from_uri(manager.tracking_uri())?;
        Ok(Self {
            tracking_store: store.to_string(),
            data_ingestion: manager.get_data_ingestion_config()?,
            data_validation: manager.get_data_validation_config()?,
            data_transformation: manager.get_data_transformation_config()?,
            model_trainer: manager.get_model_trainer_config()?,
            model_evaluation: manager.get_model_evaluation_config()?,
        })
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Yaml => {
                serde_yaml::to_string(self).context("Failed to render config as YAML")
            }
            OutputFormat::Json => {
                serde_json::to_string_pretty(self).context("Failed to render config as JSON")
            }
        }
    }
}

pub fn cmd_config(global: &GlobalArgs, format: OutputFormat) -> Result<()> {
    let manager = super::load_manager(global, false)?;
    let resolved = ResolvedConfig::resolve(&manager)?;

    if manager.tracking_uri().is_none() && !ui::is_quiet() {
        eprintln!(
            "{}",
            colors::warning("MLFLOW_TRACKING_URI is not set; runs go to the local file store")
        );
    }

    println!("{}", resolved.render(format)?.trim_end());
    Ok(())
}
