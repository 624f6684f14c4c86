//! Local tracking store using the MLflow file-store layout:
//!
//! ```text
//! mlruns/<experiment_id>/meta.yaml
//! mlruns/<experiment_id>/<run_id>/meta.yaml
//! mlruns/<experiment_id>/<run_id>/params/<key>
//! mlruns/<experiment_id>/<run_id>/metrics/<key>
//! mlruns/<experiment_id>/<run_id>/artifacts/model/...
//! ```

use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use url::Url;

use super::{
    model_descriptor, model_file_name, ExperimentTracker, RunInfo, RunStatus,
    MODEL_ARTIFACT_PATH,
};
use crate::now_millis;

const DEFAULT_EXPERIMENT_ID: &str = "0";
const DEFAULT_EXPERIMENT_NAME: &str = "Default";
const RUNNING_STATUS: u8 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ExperimentMeta {
    experiment_id: String,
    name: String,
    artifact_location: String,
    lifecycle_stage: String,
    creation_time: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RunMeta {
    run_id: String,
    run_uuid: String,
    run_name: String,
    experiment_id: String,
    status: u8,
    start_time: i64,
    end_time: Option<i64>,
    artifact_uri: String,
    lifecycle_stage: String,
    user_id: String,
}

/// File store backend rooted at `root` (usually `mlruns`).
pub struct FileStoreTracker {
    root: PathBuf,
}

impl FileStoreTracker {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_dir(&self, run: &RunInfo) -> PathBuf {
        self.root.join(&run.experiment_id).join(&run.run_id)
    }

    fn experiment_id(&self, experiment_name: &str) -> Result<String> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create {}", self.root.display()))?;

        let mut max_id: u64 = 0;
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read {}", self.root.display()))?
        {
            let entry = entry?;
            let meta_path = entry.path().join("meta.yaml");
            if !meta_path.is_file() {
                continue;
            }
            let content = fs::read_to_string(&meta_path)
                .with_context(|| format!("Failed to read {}", meta_path.display()))?;
            let Ok(meta) = serde_yaml::from_str::<ExperimentMeta>(&content) else {
                tracing::warn!("Skipping malformed experiment metadata {}", meta_path.display());
                continue;
            };
            if meta.name == experiment_name {
                return Ok(meta.experiment_id);
            }
            if let Ok(id) = meta.experiment_id.parse::<u64>() {
                max_id = max_id.max(id);
            }
        }

        let experiment_id = if experiment_name == DEFAULT_EXPERIMENT_NAME {
            DEFAULT_EXPERIMENT_ID.to_string()
        } else {
            (max_id + 1).to_string()
        };
        self.create_experiment(&experiment_id, experiment_name)?;
        Ok(experiment_id)
    }

    fn create_experiment(&self, experiment_id: &str, name: &str) -> Result<()> {
        let dir = self.root.join(experiment_id);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let meta = ExperimentMeta {
            experiment_id: experiment_id.to_string(),
            name: name.to_string(),
            artifact_location: file_uri(&dir)?,
            lifecycle_stage: "active".to_string(),
            creation_time: now_millis(),
        };
        write_yaml(&dir.join("meta.yaml"), &meta)?;
        tracing::info!("Created experiment '{}' with id {}", name, experiment_id);
        Ok(())
    }

    fn update_run_meta(&self, run: &RunInfo, update: impl FnOnce(&mut RunMeta)) -> Result<()> {
        let path = self.run_dir(run).join("meta.yaml");
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut meta: RunMeta = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        update(&mut meta);
        write_yaml(&path, &meta)
    }
}

impl ExperimentTracker for FileStoreTracker {
    fn start_run(&mut self, experiment_name: &str, run_name: &str) -> Result<RunInfo> {
        let experiment_id = self.experiment_id(experiment_name)?;
        let run_id = new_run_id();
        let run_dir = self.root.join(&experiment_id).join(&run_id);

        for sub in ["params", "metrics", "tags", "artifacts"] {
            fs::create_dir_all(run_dir.join(sub))
                .with_context(|| format!("Failed to create run directory {}", run_dir.display()))?;
        }

        let artifact_uri = file_uri(&run_dir.join("artifacts"))?;
        let meta = RunMeta {
            run_id: run_id.clone(),
            run_uuid: run_id.clone(),
            run_name: run_name.to_string(),
            experiment_id: experiment_id.clone(),
            status: RUNNING_STATUS,
            start_time: now_millis(),
            end_time: None,
            artifact_uri: artifact_uri.clone(),
            lifecycle_stage: "active".to_string(),
            user_id: std::env::var("USER").unwrap_or_else(|_| "unknown".to_string()),
        };
        write_yaml(&run_dir.join("meta.yaml"), &meta)?;
        fs::write(run_dir.join("tags").join("mlflow.runName"), run_name)
            .context("Failed to write run name tag")?;

        Ok(RunInfo {
            experiment_id,
            run_id,
            artifact_uri,
        })
    }

    fn log_params(&mut self, run: &RunInfo, params: &[(String, String)]) -> Result<()> {
        let dir = self.run_dir(run).join("params");
        for (key, value) in params {
            check_key(key)?;
            fs::write(dir.join(key), value)
                .with_context(|| format!("Failed to log param '{}'", key))?;
        }
        Ok(())
    }

    fn log_metrics(&mut self, run: &RunInfo, metrics: &[(&str, f64)]) -> Result<()> {
        let dir = self.run_dir(run).join("metrics");
        let timestamp = now_millis();
        for (key, value) in metrics {
            check_key(key)?;
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(key))
                .with_context(|| format!("Failed to open metric file for '{}'", key))?;
            writeln!(file, "{} {} 0", timestamp, value)
                .with_context(|| format!("Failed to log metric '{}'", key))?;
        }
        Ok(())
    }

    fn log_model(
        &mut self,
        run: &RunInfo,
        model_path: &Path,
        registered_model_name: Option<&str>,
    ) -> Result<()> {
        let file_name = model_file_name(model_path)?;
        let dir = self
            .run_dir(run)
            .join("artifacts")
            .join(MODEL_ARTIFACT_PATH);
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        fs::copy(model_path, dir.join(file_name)).with_context(|| {
            format!("Failed to copy model {} into the run", model_path.display())
        })?;
        fs::write(dir.join("MLmodel"), model_descriptor(&run.run_id, file_name)?)
            .context("Failed to write MLmodel descriptor")?;

        if let Some(name) = registered_model_name {
            tracing::warn!(
                "Model registry is not available for the file store; skipping registration of '{}'",
                name
            );
        }
        Ok(())
    }

    fn end_run(&mut self, run: &RunInfo, status: RunStatus) -> Result<()> {
        self.update_run_meta(run, |meta| {
            meta.status = status.code();
            meta.end_time = Some(now_millis());
        })
    }

    fn name(&self) -> &'static str {
        "file-store"
    }
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let yaml = serde_yaml::to_string(value).context("Failed to serialize metadata")?;
    fs::write(path, yaml).with_context(|| format!("Failed to write {}", path.display()))
}

/// `file://` URI of an existing directory, as MLflow records artifact roots.
fn file_uri(path: &Path) -> Result<String> {
    let absolute = fs::canonicalize(path)
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    Url::from_file_path(&absolute)
        .map(|url| url.to_string())
        .map_err(|_| anyhow::anyhow!("Cannot express {} as a file URI", absolute.display()))
}

/// 32 lowercase hex characters, like MLflow run ids
fn new_run_id() -> String {
    let mut rng = rand::thread_rng();
    (0..16).map(|_| format!("{:02x}", rng.gen::<u8>())).collect()
}

/// Keys become file names, so path separators are rejected.
fn check_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains('/') || key.contains('\\') || key == "." || key == ".." {
        anyhow::bail!("Invalid tracking key '{}'", key);
    }
    Ok(())
}
