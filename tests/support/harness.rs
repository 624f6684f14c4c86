use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;
use zip::write::FileOptions;

/// Default project layout, relative to the project directory.
pub const CONFIG_YAML: &str = r#"artifacts_root: artifacts

data_ingestion:
  root_dir: artifacts/data_ingestion
  source_url: source/wine-data.zip
  local_data_file: artifacts/data_ingestion/data.zip
  unzip_dir: artifacts/data_ingestion

data_validation:
  root_dir: artifacts/data_validation
  unzip_data_path: artifacts/data_ingestion/wine.csv
  status_file_path: artifacts/data_validation/status.txt

data_transformation:
  root_dir: artifacts/data_transformation
  unzip_data_path: artifacts/data_ingestion/wine.csv
  status_file_path: artifacts/data_validation/status.txt

model_trainer:
  root_dir: artifacts/model_trainer
  train_data_path: artifacts/data_transformation/train.csv
  test_data_path: artifacts/data_transformation/test.csv
  model_name: model.json

model_evaluation:
  root_dir: artifacts/model_evaluation
  test_data_path: artifacts/data_transformation/test.csv
  model_path: artifacts/model_trainer/model.json
  metrics_file_path: artifacts/model_evaluation/metrics.json
  experiment_name: wine-quality
"#;

pub const PARAMS_YAML: &str = "ALPHA: 0.01\nL1_RATIO: 0.5\nRANDOM_STATE: 42\n";

pub const SCHEMA_YAML: &str = r#"columns:
  alcohol: float64
  sulphates: float64
  quality: int64

target:
  name: quality
"#;

/// Variables that would leak the developer's environment into a test run.
const ISOLATED_ENV: &[&str] = &[
    "MLFLOW_TRACKING_URI",
    "MLFLOW_TRACKING_USERNAME",
    "MLFLOW_TRACKING_PASSWORD",
    "MLFLOW_TRACKING_TOKEN",
    "RUST_LOG",
    "MLPIPE_QUIET",
];

/// TestProject provides an isolated project directory with the three YAML
/// documents and a zipped source dataset, and runs the mlpipe binary in it.
pub struct TestProject {
    pub dir: TempDir,
    pub binary: PathBuf,
}

impl TestProject {
    /// Creates a project with the default config, params and schema and a
    /// 40-row dataset at `source/wine-data.zip`.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let project = TestProject {
            dir,
            binary: PathBuf::from(env!("CARGO_BIN_EXE_mlpipe")),
        };

        project.write("config/config.yaml", CONFIG_YAML);
        project.write("params.yaml", PARAMS_YAML);
        project.write("schema.yaml", SCHEMA_YAML);
        project.write_source_zip(&wine_csv(40));
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes `content` at `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, content).expect("Failed to write project file");
    }

    /// Replaces the source archive with one holding `wine.csv` = `csv`.
    pub fn write_source_zip(&self, csv: &str) {
        let path = self.path().join("source/wine-data.zip");
        fs::create_dir_all(path.parent().unwrap()).expect("Failed to create source dir");

        let file = File::create(&path).expect("Failed to create zip");
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("wine.csv", FileOptions::default())
            .expect("Failed to start zip entry");
        zip.write_all(csv.as_bytes()).expect("Failed to write zip entry");
        zip.finish().expect("Failed to finish zip");
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path().join(relative))
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", relative, e))
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path().join(relative).exists()
    }

    /// Executes the mlpipe binary with the given arguments in the project directory.
    pub fn run(&self, args: &[&str]) -> Output {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> Output {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .current_dir(self.path())
            .env("NO_COLOR", "1");
        for key in ISOLATED_ENV {
            command.env_remove(key);
        }
        for (key, value) in env {
            command.env(key, value);
        }
        command.output().expect("Failed to run mlpipe")
    }

    /// Run directories recorded under `mlruns/<experiment_id>/`.
    pub fn run_dirs(&self, experiment_id: &str) -> Vec<PathBuf> {
        let experiment_dir = self.path().join("mlruns").join(experiment_id);
        let Ok(entries) = fs::read_dir(&experiment_dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect()
    }
}

/// Deterministic dataset with two float features and an integer target.
pub fn wine_csv(rows: usize) -> String {
    let mut csv = String::from("alcohol,sulphates,quality\n");
    for i in 0..rows {
        let alcohol = 9.0 + (i % 8) as f64 * 0.5;
        let sulphates = 0.45 + (i % 5) as f64 * 0.05;
        let quality = 5 + (i % 8) / 3;
        csv.push_str(&format!("{:.2},{:.2},{}\n", alcohol, sulphates, quality));
    }
    csv
}

/// Panics with both output streams when the command failed.
pub fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "mlpipe failed ({:?})\nstdout:\n{}\nstderr:\n{}",
        output.status.code(),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}
