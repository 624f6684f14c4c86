//! MLflow tracking server client (REST API 2.0).

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine};
use serde_json::{json, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;
use ureq::Agent;
use url::Url;

use super::{
    model_descriptor, model_file_name, ExperimentTracker, RunInfo, RunStatus,
    MODEL_ARTIFACT_PATH,
};
use crate::config::{TRACKING_PASSWORD_ENV, TRACKING_TOKEN_ENV, TRACKING_USERNAME_ENV};
use crate::now_millis;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Failure talking to the tracking server.
#[derive(Debug)]
pub enum RestError {
    /// The server answered with a non-success status
    Api {
        status: u16,
        error_code: String,
        message: String,
    },
    /// The request never produced a response
    Transport(String),
}

impl RestError {
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Api { error_code, .. } => Some(error_code),
            Self::Transport(_) => None,
        }
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api {
                status,
                error_code,
                message,
            } => write!(
                f,
                "tracking server returned {} ({}): {}",
                status, error_code, message
            ),
            Self::Transport(msg) => write!(f, "could not reach tracking server: {}", msg),
        }
    }
}

impl std::error::Error for RestError {}

impl From<ureq::Error> for RestError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let body = response.into_string().unwrap_or_default();
                let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
                let error_code = parsed["error_code"]
                    .as_str()
                    .unwrap_or("UNKNOWN")
                    .to_string();
                let message = parsed["message"]
                    .as_str()
                    .map(String::from)
                    .unwrap_or(body);
                Self::Api {
                    status,
                    error_code,
                    message,
                }
            }
            ureq::Error::Transport(transport) => Self::Transport(transport.to_string()),
        }
    }
}

/// Tracking server backend.
pub struct RestTracker {
    base: String,
    agent: Agent,
    authorization: Option<String>,
}

impl RestTracker {
    pub fn new(base: Url, authorization: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            base: base.as_str().trim_end_matches('/').to_string(),
            agent,
            authorization,
        }
    }

    /// Credentials come from `MLFLOW_TRACKING_TOKEN`, or from
    /// `MLFLOW_TRACKING_USERNAME` / `MLFLOW_TRACKING_PASSWORD`.
    pub fn from_env(base: Url) -> Self {
        let token = std::env::var(TRACKING_TOKEN_ENV).ok();
        let username = std::env::var(TRACKING_USERNAME_ENV).ok();
        let password = std::env::var(TRACKING_PASSWORD_ENV).ok();
        Self::new(
            base,
            authorization_header(token.as_deref(), username.as_deref(), password.as_deref()),
        )
    }

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}/api/2.0/mlflow/{}", self.base, endpoint)
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        match &self.authorization {
            Some(value) => request.set("Authorization", value),
            None => request,
        }
    }

    fn post(&self, endpoint: &str, body: Value) -> Result<Value, RestError> {
        let request = self.authorize(self.agent.post(&self.api_url(endpoint)));
        let response = request.send_json(body)?;
        read_json(response)
    }

    fn get(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Value, RestError> {
        let mut request = self.authorize(self.agent.get(&self.api_url(endpoint)));
        for (key, value) in query {
            request = request.query(key, value);
        }
        let response = request.call()?;
        read_json(response)
    }

    fn experiment_id(&self, experiment_name: &str) -> Result<String> {
        match self.get(
            "experiments/get-by-name",
            &[("experiment_name", experiment_name)],
        ) {
            Ok(body) => json_str(&body["experiment"]["experiment_id"], "experiment_id"),
            Err(e) if e.error_code() == Some("RESOURCE_DOES_NOT_EXIST") => {
                tracing::info!("Creating experiment '{}'", experiment_name);
                let body = self
                    .post("experiments/create", json!({ "name": experiment_name }))
                    .with_context(|| format!("Failed to create experiment '{}'", experiment_name))?;
                json_str(&body["experiment_id"], "experiment_id")
            }
            Err(e) => Err(e)
                .with_context(|| format!("Failed to look up experiment '{}'", experiment_name)),
        }
    }

    /// Upload one file through the server's artifact proxy.
    fn upload_artifact(&self, run: &RunInfo, relative_path: &str, bytes: &[u8]) -> Result<()> {
        let Some(artifact_root) = run.artifact_uri.strip_prefix("mlflow-artifacts:/") else {
            anyhow::bail!(
                "Artifact store {} is not proxied by the tracking server",
                run.artifact_uri
            );
        };
        let url = format!(
            "{}/api/2.0/mlflow-artifacts/artifacts/{}/{}",
            self.base,
            artifact_root.trim_matches('/'),
            relative_path
        );

        let request = self
            .authorize(self.agent.put(&url))
            .set("Content-Type", "application/octet-stream");
        request
            .send_bytes(bytes)
            .map_err(RestError::from)
            .with_context(|| format!("Failed to upload artifact {}", relative_path))?;
        Ok(())
    }

    fn register_model(&self, run: &RunInfo, name: &str) -> Result<()> {
        match self.post("registered-models/create", json!({ "name": name })) {
            Ok(_) => tracing::info!("Registered model '{}'", name),
            Err(e) if e.error_code() == Some("RESOURCE_ALREADY_EXISTS") => {
                tracing::debug!("Registered model '{}' already exists", name)
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to register model '{}'", name))
            }
        }

        let body = self
            .post(
                "model-versions/create",
                json!({
                    "name": name,
                    "source": format!("{}/{}", run.artifact_uri, MODEL_ARTIFACT_PATH),
                    "run_id": run.run_id,
                }),
            )
            .with_context(|| format!("Failed to create a version of model '{}'", name))?;

        let version = body["model_version"]["version"]
            .as_str()
            .unwrap_or("unknown");
        tracing::info!("Created version {} of model '{}'", version, name);
        Ok(())
    }
}

impl ExperimentTracker for RestTracker {
    fn start_run(&mut self, experiment_name: &str, run_name: &str) -> Result<RunInfo> {
        let experiment_id = self.experiment_id(experiment_name)?;

        let body = self
            .post(
                "runs/create",
                json!({
                    "experiment_id": experiment_id,
                    "start_time": now_millis(),
                    "run_name": run_name,
                    "tags": [
                        { "key": "mlflow.runName", "value": run_name },
                        { "key": "mlflow.source.name", "value": "mlpipe" },
                    ],
                }),
            )
            .context("Failed to create run")?;

        let info = &body["run"]["info"];
        Ok(RunInfo {
            experiment_id,
            run_id: json_str(&info["run_id"], "run_id")?,
            artifact_uri: json_str(&info["artifact_uri"], "artifact_uri")?,
        })
    }

    fn log_params(&mut self, run: &RunInfo, params: &[(String, String)]) -> Result<()> {
        let params: Vec<Value> = params
            .iter()
            .map(|(key, value)| json!({ "key": key, "value": value }))
            .collect();

        self.post(
            "runs/log-batch",
            json!({ "run_id": run.run_id, "params": params }),
        )
        .context("Failed to log params")?;
        Ok(())
    }

    fn log_metrics(&mut self, run: &RunInfo, metrics: &[(&str, f64)]) -> Result<()> {
        let timestamp = now_millis();
        let metrics: Vec<Value> = metrics
            .iter()
            .map(|(key, value)| {
                json!({ "key": key, "value": value, "timestamp": timestamp, "step": 0 })
            })
            .collect();

        self.post(
            "runs/log-batch",
            json!({ "run_id": run.run_id, "metrics": metrics }),
        )
        .context("Failed to log metrics")?;
        Ok(())
    }

    fn log_model(
        &mut self,
        run: &RunInfo,
        model_path: &Path,
        registered_model_name: Option<&str>,
    ) -> Result<()> {
        let file_name = model_file_name(model_path)?;
        let bytes = fs::read(model_path)
            .with_context(|| format!("Failed to read model {}", model_path.display()))?;

        self.upload_artifact(
            run,
            &format!("{}/{}", MODEL_ARTIFACT_PATH, file_name),
            &bytes,
        )?;
        let descriptor = model_descriptor(&run.run_id, file_name)?;
        self.upload_artifact(
            run,
            &format!("{}/MLmodel", MODEL_ARTIFACT_PATH),
            descriptor.as_bytes(),
        )?;

        if let Some(name) = registered_model_name {
            self.register_model(run, name)?;
        }
        Ok(())
    }

    fn end_run(&mut self, run: &RunInfo, status: RunStatus) -> Result<()> {
        self.post(
            "runs/update",
            json!({
                "run_id": run.run_id,
                "status": status.to_string(),
                "end_time": now_millis(),
            }),
        )
        .context("Failed to end run")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mlflow-rest"
    }
}

/// Bearer token wins over basic credentials; basic auth needs both parts.
pub fn authorization_header(
    token: Option<&str>,
    username: Option<&str>,
    password: Option<&str>,
) -> Option<String> {
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        return Some(format!("Bearer {}", token));
    }

    match (username, password) {
        (Some(user), Some(pass)) if !user.is_empty() => Some(format!(
            "Basic {}",
            BASE64_STANDARD.encode(format!("{}:{}", user, pass))
        )),
        _ => None,
    }
}

fn read_json(response: ureq::Response) -> Result<Value, RestError> {
    let body = response
        .into_string()
        .map_err(|e| RestError::Transport(e.to_string()))?;
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| RestError::Transport(format!("invalid JSON: {}", e)))
}

fn json_str(value: &Value, field: &str) -> Result<String> {
    value
        .as_str()
        .map(String::from)
        .with_context(|| format!("Tracking server response is missing '{}'", field))
}
