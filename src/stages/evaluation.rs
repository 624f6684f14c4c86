//! Model evaluation: score the model on the test split, save the metrics and
//! record the run with the experiment tracker.

use anyhow::Result;
use std::fmt;

use crate::common::save_json;
use crate::config::ModelEvaluationConfig;
use crate::data::{self, column_as_f64};
use crate::model::{ElasticNetModel, RegressionMetrics};
use crate::tracking::{ExperimentTracker, RunInfo, RunStatus, TrackingStore};

const RUN_NAME: &str = "model_evaluation";

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutcome {
    pub metrics: RegressionMetrics,
    pub run: RunInfo,
    pub tracker: &'static str,
}

impl fmt::Display for EvaluationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rmse={:.4} mae={:.4} r2={:.4} (run {} via {})",
            self.metrics.rmse, self.metrics.mae, self.metrics.r2, self.run.run_id, self.tracker
        )
    }
}

pub struct ModelEvaluation {
    config: ModelEvaluationConfig,
}

impl ModelEvaluation {
    pub fn new(config: ModelEvaluationConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<EvaluationOutcome> {
        let metrics = self.evaluate()?;

        let store = TrackingStore::from_uri(self.config.mlflow_uri.as_deref())?;
        tracing::info!("Logging evaluation to {}", store);
        let mut tracker = store.tracker();
        let run = self.track(tracker.as_mut(), !store.is_file(), &metrics)?;

        Ok(EvaluationOutcome {
            metrics,
            run,
            tracker: tracker.name(),
        })
    }

    /// Predict on the test split, compute metrics and write them to disk.
    pub fn evaluate(&self) -> Result<RegressionMetrics> {
        let test = data::read_csv(&self.config.test_data_path)?;
        let model = ElasticNetModel::load(&self.config.model_path)?;

        let actual = column_as_f64(&test, &self.config.target_column)?;
        let predicted = model.predict(&test)?;
        let metrics = RegressionMetrics::compute(&actual, &predicted)?;

        save_json(&self.config.metrics_file_path, &metrics)?;
        tracing::info!(
            "Evaluation on {} rows: rmse={} mae={} r2={}",
            actual.len(),
            metrics.rmse,
            metrics.mae,
            metrics.r2
        );
        Ok(metrics)
    }

    /// Record params, metrics and the model in one run.
    ///
    /// The run is always closed, as FAILED if any logging step failed.
    pub fn track(
        &self,
        tracker: &mut dyn ExperimentTracker,
        use_registry: bool,
        metrics: &RegressionMetrics,
    ) -> Result<RunInfo> {
        let run = tracker.start_run(&self.config.experiment_name, RUN_NAME)?;
        let logged = self.log_run(tracker, &run, use_registry, metrics);

        let status = if logged.is_ok() {
            RunStatus::Finished
        } else {
            RunStatus::Failed
        };
        let ended = tracker.end_run(&run, status);

        logged?;
        ended?;
        tracing::info!("Recorded run {} ({})", run.run_id, status);
        Ok(run)
    }

    fn log_run(
        &self,
        tracker: &mut dyn ExperimentTracker,
        run: &RunInfo,
        use_registry: bool,
        metrics: &RegressionMetrics,
    ) -> Result<()> {
        tracker.log_params(run, &self.config.all_params())?;
        tracker.log_metrics(run, &metrics.as_pairs())?;

        // Only a tracking server has a model registry.
        let registered_name = use_registry.then_some(self.config.registered_model_name.as_str());
        tracker.log_model(run, &self.config.model_path, registered_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureMatrix;
    use crate::model::ElasticNetParams;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn setup(tmp: &TempDir, mlflow_uri: Option<String>) -> ModelEvaluationConfig {
        let test_path = tmp.path().join("test.csv");
        fs::write(&test_path, "x,y\n1,3\n2,5\n3,7\n4,9\n").unwrap();

        let x = FeatureMatrix {
            names: vec!["x".to_string()],
            columns: vec![vec![1.0, 2.0, 3.0, 4.0]],
            n_rows: 4,
        };
        let model = ElasticNetParams {
            alpha: 1e-6,
            tol: 1e-10,
            ..Default::default()
        }
        .fit(&x, &[3.0, 5.0, 7.0, 9.0])
        .unwrap();
        let model_path = tmp.path().join("model.json");
        model.save(&model_path).unwrap();

        ModelEvaluationConfig {
            root_dir: tmp.path().to_path_buf(),
            test_data_path: test_path,
            model_path,
            metrics_file_path: tmp.path().join("metrics.json"),
            alpha: 1e-6,
            l1_ratio: 0.5,
            random_state: 0,
            target_column: "y".to_string(),
            mlflow_uri,
            experiment_name: "Default".to_string(),
            registered_model_name: "ElasticnetModel".to_string(),
        }
    }

    /// Records calls instead of talking to a store.
    #[derive(Default)]
    struct RecordingTracker {
        calls: Vec<String>,
        fail_metrics: bool,
    }

    impl ExperimentTracker for RecordingTracker {
        fn start_run(&mut self, experiment_name: &str, run_name: &str) -> Result<RunInfo> {
            self.calls.push(format!("start {} {}", experiment_name, run_name));
            Ok(RunInfo {
                experiment_id: "0".to_string(),
                run_id: "run-1".to_string(),
                artifact_uri: "memory".to_string(),
            })
        }

        fn log_params(&mut self, _run: &RunInfo, params: &[(String, String)]) -> Result<()> {
            let keys: Vec<&str> = params.iter().map(|(k, _)| k.as_str()).collect();
            self.calls.push(format!("params {}", keys.join(",")));
            Ok(())
        }

        fn log_metrics(&mut self, _run: &RunInfo, metrics: &[(&str, f64)]) -> Result<()> {
            if self.fail_metrics {
                anyhow::bail!("metrics rejected");
            }
            let keys: Vec<&str> = metrics.iter().map(|(k, _)| *k).collect();
            self.calls.push(format!("metrics {}", keys.join(",")));
            Ok(())
        }

        fn log_model(
            &mut self,
            _run: &RunInfo,
            model_path: &Path,
            registered_model_name: Option<&str>,
        ) -> Result<()> {
            self.calls.push(format!(
                "model {} {:?}",
                model_path.file_name().unwrap().to_string_lossy(),
                registered_model_name
            ));
            Ok(())
        }

        fn end_run(&mut self, _run: &RunInfo, status: RunStatus) -> Result<()> {
            self.calls.push(format!("end {}", status));
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    #[test]
    fn test_evaluate_writes_metrics_file() {
        let tmp = TempDir::new().unwrap();
        let config = setup(&tmp, None);

        let metrics = ModelEvaluation::new(config.clone()).evaluate().unwrap();
        assert!(metrics.rmse < 1e-3);
        assert!(metrics.r2 > 0.999);

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&config.metrics_file_path).unwrap()).unwrap();
        assert!(saved["rmse"].is_number());
        assert!(saved["mae"].is_number());
        assert!(saved["r2"].is_number());
    }

    #[test]
    fn test_track_logs_everything_and_registers_when_remote() {
        let tmp = TempDir::new().unwrap();
        let evaluation = ModelEvaluation::new(setup(&tmp, None));
        let metrics = evaluation.evaluate().unwrap();

        let mut tracker = RecordingTracker::default();
        evaluation.track(&mut tracker, true, &metrics).unwrap();

        assert_eq!(
            tracker.calls,
            vec![
                "start Default model_evaluation",
                "params alpha,l1_ratio,random_state",
                "metrics rmse,mae,r2",
                "model model.json Some(\"ElasticnetModel\")",
                "end FINISHED",
            ]
        );
    }

    #[test]
    fn test_track_skips_registry_for_file_store() {
        let tmp = TempDir::new().unwrap();
        let evaluation = ModelEvaluation::new(setup(&tmp, None));
        let metrics = evaluation.evaluate().unwrap();

        let mut tracker = RecordingTracker::default();
        evaluation.track(&mut tracker, false, &metrics).unwrap();
        assert!(tracker.calls.contains(&"model model.json None".to_string()));
    }

    #[test]
    fn test_track_marks_run_failed_on_logging_error() {
        let tmp = TempDir::new().unwrap();
        let evaluation = ModelEvaluation::new(setup(&tmp, None));
        let metrics = evaluation.evaluate().unwrap();

        let mut tracker = RecordingTracker {
            fail_metrics: true,
            ..Default::default()
        };
        let err = evaluation.track(&mut tracker, false, &metrics).unwrap_err();
        assert!(err.to_string().contains("metrics rejected"));
        assert_eq!(tracker.calls.last().unwrap(), "end FAILED");
    }

    #[test]
    fn test_run_with_local_file_store() {
        let tmp = TempDir::new().unwrap();
        let mlruns = tmp.path().join("mlruns");
        let config = setup(&tmp, Some(mlruns.display().to_string()));

        let outcome = ModelEvaluation::new(config).run().unwrap();
        assert_eq!(outcome.tracker, "file-store");

        let run_dir = mlruns.join("0").join(&outcome.run.run_id);
        assert!(run_dir.join("params/alpha").is_file());
        assert!(run_dir.join("metrics/r2").is_file());
        assert!(run_dir.join("artifacts/model/model.json").is_file());
    }
}
