//! Data validation: check the raw dataset against the schema and record the
//! verdict in a status file read by the transformation stage.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::config::DataValidationConfig;
use crate::data::{self, SchemaReport};

const STATUS_PREFIX: &str = "Validation status:";

pub struct DataValidation {
    config: DataValidationConfig,
}

impl DataValidation {
    pub fn new(config: DataValidationConfig) -> Self {
        Self { config }
    }

    /// Compare columns and dtypes, then write the status file.
    ///
    /// A failed validation is reported through the status file and the
    /// returned report, not as an error.
    pub fn run(&self) -> Result<SchemaReport> {
        let df = data::read_csv(&self.config.unzip_data_path)?;
        let report = SchemaReport::compare(&data::column_dtypes(&df), &self.config.data_schema);

        for issue in report.issues() {
            tracing::warn!("Schema check: {}", issue);
        }

        write_validation_status(&self.config.status_file_path, report.is_valid())?;
        tracing::info!(
            "Validated {} columns of {}: status {}",
            df.width(),
            self.config.unzip_data_path.display(),
            report.is_valid()
        );
        Ok(report)
    }
}

pub fn write_validation_status(path: &Path, status: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, format!("{} {}", STATUS_PREFIX, status))
        .with_context(|| format!("Failed to write validation status to {}", path.display()))
}

/// Parse a status file written by [`write_validation_status`].
pub fn read_validation_status(path: &Path) -> Result<bool> {
    let content = fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read validation status from {} (has the validation stage run?)",
            path.display()
        )
    })?;

    let value = content
        .trim()
        .strip_prefix(STATUS_PREFIX)
        .with_context(|| format!("Malformed validation status file {}", path.display()))?
        .trim();

    match value.to_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => anyhow::bail!(
            "Malformed validation status '{}' in {}",
            other,
            path.display()
        ),
    }
}
