//! Predict command: score a CSV file with a trained model

use anyhow::Result;
use std::io;
use std::path::{Path, PathBuf};

use mlpipe::config::ConfigurationManager;
use mlpipe::data::{self, column_as_f64};
use mlpipe::model::{ElasticNetModel, RegressionMetrics};

use crate::GlobalArgs;

/// Name of the column appended to the input rows
pub const PREDICTION_COLUMN: &str = "prediction";

pub fn cmd_predict(
    global: &GlobalArgs,
    input: &Path,
    model: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    // CSV on stdout must not be mixed with log lines.
    let manager = super::load_manager(global, output.is_some())?;
    let model_path = resolve_model_path(&manager, model)?;

    let model = ElasticNetModel::load(&model_path)?;
    let mut df = data::read_csv(input)?;
    let predictions = model.predict(&df)?;
    tracing::info!(
        "Predicted {} rows of {} with {}",
        predictions.len(),
        input.display(),
        model_path.display()
    );

    // Score against the target when the input still carries it.
    let target = &manager.schema().target.name;
    if df.get_column_names().contains(&target.as_str()) {
        let actual = column_as_f64(&df, target)?;
        let metrics = RegressionMetrics::compute(&actual, &predictions)?;
        tracing::info!(
            "Against '{}': rmse={} mae={} r2={}",
            target,
            metrics.rmse,
            metrics.mae,
            metrics.r2
        );
    }

    data::set_f64_column(&mut df, PREDICTION_COLUMN, predictions)?;
    match output {
        Some(path) => {
            data::write_csv(&mut df, path)?;
            tracing::info!("Predictions written to {}", path.display());
        }
        None => data::write_csv_to(&mut df, io::stdout().lock())?,
    }
    Ok(())
}

/// An explicit `--model` wins over the trainer's output path.
fn resolve_model_path(manager: &ConfigurationManager, model: Option<&Path>) -> Result<PathBuf> {
    match model {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(manager.get_model_trainer_config()?.model_path()),
    }
}
