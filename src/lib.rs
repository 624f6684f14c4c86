//! # mlpipe - stage-based model training
//!
//! mlpipe runs a fixed, linear training workflow: ingest a dataset from a
//! remote source, validate it against a schema, split it, fit an elastic net
//! regression model and evaluate it while logging parameters and metrics to
//! an MLflow-compatible experiment tracker.
//!
//! ## Overview
//!
//! Every stage is driven by three YAML documents: `config/config.yaml`
//! (artifact locations), `params.yaml` (model hyperparameters) and
//! `schema.yaml` (expected columns and target). The
//! [`config::ConfigurationManager`] resolves them into one immutable config
//! value per stage, and [`stages::run_pipeline`] executes the stages in order.
//!
//! ## Modules
//!
//! - [`config`] - YAML loading and per-stage config resolution
//! - [`stages`] - The five pipeline stages and their sequencing
//! - [`data`] - CSV I/O, dtype inspection and train/test splitting
//! - [`model`] - Elastic net regression and regression metrics
//! - [`tracking`] - Experiment tracking (MLflow REST server or local file store)
//! - [`common`] - Filesystem helpers shared by the stages
//! - [`logging`] - tracing subscriber setup
//! - [`ui`] - Colors and formatting for terminal summaries
//!
//! ## Example
//!
//! ```no_run
//! use mlpipe::config::ConfigurationManager;
//! use mlpipe::stages::{run_pipeline, Stage};
//!
//! let manager = ConfigurationManager::load().expect("Failed to load config");
//! run_pipeline(&manager, Stage::ALL).expect("Pipeline failed");
//! ```

pub mod common;
pub mod config;
pub mod data;
pub mod logging;
pub mod model;
pub mod stages;
pub mod tracking;
pub mod ui;

#[cfg(test)]
pub(crate) mod http_stub;

/// Default path constants for the project layout.
pub mod paths {
    /// Artifact locations for every stage: `config/config.yaml`
    pub const CONFIG_FILE_PATH: &str = "config/config.yaml";
    /// Model hyperparameters: `params.yaml`
    pub const PARAMS_FILE_PATH: &str = "params.yaml";
    /// Expected dataset columns and target: `schema.yaml`
    pub const SCHEMA_FILE_PATH: &str = "schema.yaml";
    /// Directory receiving `running_logs.log`: `logs`
    pub const LOGS_DIR: &str = "logs";
    /// Local tracking store used when no tracking server is configured: `mlruns`
    pub const MLRUNS_DIR: &str = "mlruns";
}

/// Generate a UTC timestamp in ISO 8601 format: `YYYY-MM-DDTHH:MM:SSZ`
pub fn utc_now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Milliseconds since the Unix epoch, as used by tracking timestamps.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
