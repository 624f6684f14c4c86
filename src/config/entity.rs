//! Resolved, per-stage configuration values.
//!
//! Each struct is produced by [`super::ConfigurationManager`] after the
//! stage's root directory has been created. Stages receive them by value and
//! never look at the raw YAML documents.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataIngestionConfig {
    pub root_dir: PathBuf,
    pub source_url: String,
    pub local_data_file: PathBuf,
    pub unzip_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataValidationConfig {
    pub root_dir: PathBuf,
    pub unzip_data_path: PathBuf,
    pub status_file_path: PathBuf,
    /// Expected column name to dtype name
    pub data_schema: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataTransformationConfig {
    pub root_dir: PathBuf,
    pub unzip_data_path: PathBuf,
    pub status_file_path: PathBuf,
    pub test_size: f64,
    pub random_state: u64,
}

impl DataTransformationConfig {
    pub fn train_path(&self) -> PathBuf {
        self.root_dir.join("train.csv")
    }

    pub fn test_path(&self) -> PathBuf {
        self.root_dir.join("test.csv")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelTrainerConfig {
    pub root_dir: PathBuf,
    pub train_data_path: PathBuf,
    pub test_data_path: PathBuf,
    pub model_name: String,
    pub alpha: f64,
    pub l1_ratio: f64,
    pub random_state: u64,
    pub max_iter: usize,
    pub tol: f64,
    pub target_column: String,
}

impl ModelTrainerConfig {
    /// Where the fitted model is written
    pub fn model_path(&self) -> PathBuf {
        self.root_dir.join(&self.model_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelEvaluationConfig {
    pub root_dir: PathBuf,
    pub test_data_path: PathBuf,
    pub model_path: PathBuf,
    pub metrics_file_path: PathBuf,
    pub alpha: f64,
    pub l1_ratio: f64,
    pub random_state: u64,
    pub target_column: String,
    /// Tracking server or file store URI; `None` means the local `mlruns` store
    pub mlflow_uri: Option<String>,
    pub experiment_name: String,
    pub registered_model_name: String,
}

impl ModelEvaluationConfig {
    /// Parameters logged with the evaluation run, in logging order
    pub fn all_params(&self) -> Vec<(String, String)> {
        vec![
            ("alpha".to_string(), self.alpha.to_string()),
            ("l1_ratio".to_string(), self.l1_ratio.to_string()),
            ("random_state".to_string(), self.random_state.to_string()),
        ]
    }
}
