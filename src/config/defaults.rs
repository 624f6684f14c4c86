//! Default values and the config structs that rely on them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Macro to generate default functions for serde attributes
macro_rules! default_fn {
    ($name:ident, $type:ty, $value:expr) => {
        pub(crate) fn $name() -> $type {
            $value
        }
    };
}

// =========================================================================
// DEFAULT VALUE FUNCTIONS
// =========================================================================

default_fn!(default_test_size, f64, 0.25);
default_fn!(default_max_iter, usize, 1000);
default_fn!(default_tol, f64, 1e-4);
default_fn!(default_experiment_name, String, "Default".to_string());
default_fn!(
    default_registered_model_name,
    String,
    "ElasticnetModel".to_string()
);

/// Environment variable holding the tracking server URI
pub const TRACKING_URI_ENV: &str = "MLFLOW_TRACKING_URI";
/// Environment variable holding the tracking server user (basic auth)
pub const TRACKING_USERNAME_ENV: &str = "MLFLOW_TRACKING_USERNAME";
/// Environment variable holding the tracking server password (basic auth)
pub const TRACKING_PASSWORD_ENV: &str = "MLFLOW_TRACKING_PASSWORD";
/// Environment variable holding a bearer token for the tracking server
pub const TRACKING_TOKEN_ENV: &str = "MLFLOW_TRACKING_TOKEN";

// =========================================================================
// CONFIG STRUCTS WITH DEFAULTS
// =========================================================================

/// Model and split hyperparameters (`params.yaml`)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Params {
    /// Overall regularization strength
    #[serde(rename = "ALPHA")]
    pub alpha: f64,
    /// Mix between L1 (1.0) and L2 (0.0) penalties
    #[serde(rename = "L1_RATIO")]
    pub l1_ratio: f64,
    /// Seed for the train/test shuffle and random coordinate selection
    #[serde(rename = "RANDOM_STATE")]
    pub random_state: u64,
    /// Fraction of rows held out for evaluation (default: 0.25)
    #[serde(rename = "TEST_SIZE", default = "default_test_size")]
    pub test_size: f64,
    /// Coordinate descent epochs before giving up (default: 1000)
    #[serde(rename = "MAX_ITER", default = "default_max_iter")]
    pub max_iter: usize,
    /// Duality gap tolerance (default: 1e-4)
    #[serde(rename = "TOL", default = "default_tol")]
    pub tol: f64,
}

/// `model_evaluation` section of `config/config.yaml`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelEvaluationSection {
    pub root_dir: PathBuf,
    pub test_data_path: PathBuf,
    pub model_path: PathBuf,
    pub metrics_file_path: PathBuf,
    /// Experiment receiving the evaluation run (default: "Default")
    #[serde(default = "default_experiment_name")]
    pub experiment_name: String,
    /// Registry name used when the tracking store is a server
    #[serde(default = "default_registered_model_name")]
    pub registered_model_name: String,
}
