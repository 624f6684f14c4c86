//! Validation logic for the loaded configuration documents.

use anyhow::Result;

use super::defaults::Params;
use super::{ArtifactsConfig, DataSchema};

impl Params {
    /// Validate hyperparameter ranges
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            anyhow::bail!("ALPHA must be a finite value >= 0, got {}", self.alpha);
        }

        if !(0.0..=1.0).contains(&self.l1_ratio) {
            anyhow::bail!("L1_RATIO must be within [0, 1], got {}", self.l1_ratio);
        }

        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            anyhow::bail!("TEST_SIZE must be within (0, 1), got {}", self.test_size);
        }

        if self.max_iter == 0 {
            anyhow::bail!("MAX_ITER must be greater than 0");
        }

        if self.tol.is_nan() || self.tol <= 0.0 {
            anyhow::bail!("TOL must be greater than 0, got {}", self.tol);
        }

        Ok(())
    }
}

impl DataSchema {
    /// Validate that the schema describes at least the target column
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            anyhow::bail!("schema.columns must list at least one column");
        }

        if !self.columns.contains_key(&self.target.name) {
            anyhow::bail!(
                "schema target '{}' is not one of the schema columns",
                self.target.name
            );
        }

        if self.columns.len() < 2 {
            anyhow::bail!("schema.columns must list at least one feature besides the target");
        }

        Ok(())
    }
}

impl ArtifactsConfig {
    /// Validate values that cannot be checked by deserialization alone
    pub fn validate(&self) -> Result<()> {
        if self.data_ingestion.source_url.trim().is_empty() {
            anyhow::bail!("data_ingestion.source_url must not be empty");
        }

        let model_name = &self.model_trainer.model_name;
        if model_name.trim().is_empty() {
            anyhow::bail!("model_trainer.model_name must not be empty");
        }
        if model_name.contains('/') || model_name.contains('\\') {
            anyhow::bail!(
                "model_trainer.model_name must be a file name, got '{}'",
                model_name
            );
        }

        if self.model_evaluation.experiment_name.trim().is_empty() {
            anyhow::bail!("model_evaluation.experiment_name must not be empty");
        }

        Ok(())
    }
}
