//! Experiment tracking abstraction.
//!
//! Runs are recorded either on an MLflow tracking server (REST API 2.0) or
//! in a local `mlruns` directory using the MLflow file-store layout, so
//! `mlflow ui` can browse both.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::paths::MLRUNS_DIR;

pub mod file_store;
pub mod rest;

pub use file_store::FileStoreTracker;
pub use rest::{RestError, RestTracker};

/// Identifies a started run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfo {
    pub experiment_id: String,
    pub run_id: String,
    pub artifact_uri: String,
}

/// Terminal state reported when a run ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Finished,
    Failed,
}

impl RunStatus {
    /// Numeric status used by the file store's `meta.yaml`
    pub fn code(self) -> u8 {
        match self {
            Self::Finished => 3,
            Self::Failed => 4,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => write!(f, "FINISHED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Trait for experiment tracking backends
pub trait ExperimentTracker {
    /// Start a run in `experiment_name`, creating the experiment if needed.
    fn start_run(&mut self, experiment_name: &str, run_name: &str) -> Result<RunInfo>;

    fn log_params(&mut self, run: &RunInfo, params: &[(String, String)]) -> Result<()>;

    fn log_metrics(&mut self, run: &RunInfo, metrics: &[(&str, f64)]) -> Result<()>;

    /// Store the model file under the run's `model` artifact directory and,
    /// when `registered_model_name` is given, register it as a new version.
    fn log_model(
        &mut self,
        run: &RunInfo,
        model_path: &Path,
        registered_model_name: Option<&str>,
    ) -> Result<()>;

    fn end_run(&mut self, run: &RunInfo, status: RunStatus) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Where runs are recorded, derived from the tracking URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingStore {
    File(PathBuf),
    Rest(Url),
}

impl TrackingStore {
    /// `http(s)://` selects a tracking server; `file://`, a plain path or no
    /// URI at all selects a local file store.
    pub fn from_uri(uri: Option<&str>) -> Result<Self> {
        let Some(uri) = uri.map(str::trim).filter(|u| !u.is_empty()) else {
            return Ok(Self::File(PathBuf::from(MLRUNS_DIR)));
        };

        match Url::parse(uri) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Self::Rest(url)),
                "file" => {
                    let path = url
                        .to_file_path()
                        .map_err(|_| anyhow::anyhow!("Invalid file tracking URI: {}", uri))?;
                    Ok(Self::File(path))
                }
                // Drive letters such as `C:\mlruns` parse as one-letter schemes.
                scheme if scheme.len() == 1 => Ok(Self::File(PathBuf::from(uri))),
                scheme => anyhow::bail!(
                    "Unsupported tracking URI scheme '{}' in {} (expected http, https or file)",
                    scheme,
                    uri
                ),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => Ok(Self::File(PathBuf::from(uri))),
            Err(e) => Err(e).with_context(|| format!("Invalid tracking URI: {}", uri)),
        }
    }

    /// Whether runs land in a local directory (no model registry available)
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    pub fn tracker(&self) -> Box<dyn ExperimentTracker> {
        match self {
            Self::File(root) => Box::new(FileStoreTracker::new(root.clone())),
            Self::Rest(url) => Box::new(RestTracker::from_env(url.clone())),
        }
    }
}

impl fmt::Display for TrackingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "file store at {}", path.display()),
            Self::Rest(url) => write!(f, "tracking server at {}", url),
        }
    }
}

/// `MLmodel` descriptor stored next to the logged model file.
#[derive(Debug, Serialize)]
struct ModelDescriptor<'a> {
    artifact_path: &'a str,
    flavors: BTreeMap<&'a str, ModelFlavor<'a>>,
    run_id: &'a str,
    utc_time_created: String,
}

#[derive(Debug, Serialize)]
struct ModelFlavor<'a> {
    model_file: &'a str,
    loader: &'a str,
    version: &'a str,
}

/// Artifact directory holding the logged model
pub const MODEL_ARTIFACT_PATH: &str = "model";

pub(crate) fn model_descriptor(run_id: &str, model_file: &str) -> Result<String> {
    let descriptor = ModelDescriptor {
        artifact_path: MODEL_ARTIFACT_PATH,
        flavors: BTreeMap::from([(
            "mlpipe_elastic_net",
            ModelFlavor {
                model_file,
                loader: "mlpipe::model::ElasticNetModel::load",
                version: env!("CARGO_PKG_VERSION"),
            },
        )]),
        run_id,
        utc_time_created: crate::utc_now_iso(),
    };
    serde_yaml::to_string(&descriptor).context("Failed to serialize MLmodel descriptor")
}

pub(crate) fn model_file_name(model_path: &Path) -> Result<&str> {
    model_path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Model path has no file name: {}", model_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_uri_unset_uses_local_mlruns() {
        assert_eq!(
            TrackingStore::from_uri(None).unwrap(),
            TrackingStore::File(PathBuf::from("mlruns"))
        );
        assert_eq!(
            TrackingStore::from_uri(Some("  ")).unwrap(),
            TrackingStore::File(PathBuf::from("mlruns"))
        );
    }

    #[test]
    fn test_from_uri_http_is_rest() {
        let store = TrackingStore::from_uri(Some("https://dagshub.com/u/repo.mlflow")).unwrap();
        assert!(!store.is_file());
        assert!(matches!(store, TrackingStore::Rest(url) if url.host_str() == Some("dagshub.com")));
    }

    #[test]
    #[cfg(unix)]
    fn test_from_uri_file_scheme() {
        let store = TrackingStore::from_uri(Some("file:///tmp/mlruns")).unwrap();
        assert_eq!(store, TrackingStore::File(PathBuf::from("/tmp/mlruns")));
    }

    #[test]
    fn test_from_uri_relative_path() {
        let store = TrackingStore::from_uri(Some("./tracking")).unwrap();
        assert_eq!(store, TrackingStore::File(PathBuf::from("./tracking")));
        assert!(store.is_file());
    }

    #[test]
    fn test_from_uri_unknown_scheme_rejected() {
        let err = TrackingStore::from_uri(Some("databricks://profile")).unwrap_err();
        assert!(err.to_string().contains("databricks"));
    }

    #[test]
    fn test_model_descriptor_mentions_file_and_run() {
        let yaml = model_descriptor("abc123", "model.json").unwrap();
        assert!(yaml.contains("artifact_path: model"));
        assert!(yaml.contains("model_file: model.json"));
        assert!(yaml.contains("run_id: abc123"));
    }

    #[test]
    fn test_run_status_codes() {
        assert_eq!(RunStatus::Finished.code(), 3);
        assert_eq!(RunStatus::Failed.to_string(), "FAILED");
    }
}
