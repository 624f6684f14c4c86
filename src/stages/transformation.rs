//! Data transformation: split the validated dataset into train and test sets.

use anyhow::Result;
use std::fmt;

use super::validation::read_validation_status;
use crate::config::DataTransformationConfig;
use crate::data;

/// Row/column counts of the written splits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitShapes {
    pub train: (usize, usize),
    pub test: (usize, usize),
}

impl fmt::Display for SplitShapes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "train {}x{}, test {}x{}",
            self.train.0, self.train.1, self.test.0, self.test.1
        )
    }
}

pub struct DataTransformation {
    config: DataTransformationConfig,
}

impl DataTransformation {
    pub fn new(config: DataTransformationConfig) -> Self {
        Self { config }
    }

    /// Split only when validation passed; otherwise fail the stage.
    pub fn run(&self) -> Result<SplitShapes> {
        if !read_validation_status(&self.config.status_file_path)? {
            anyhow::bail!(
                "Data schema is not valid (see {}); refusing to transform",
                self.config.status_file_path.display()
            );
        }

        self.train_test_split()
    }

    pub fn train_test_split(&self) -> Result<SplitShapes> {
        let df = data::read_csv(&self.config.unzip_data_path)?;
        let (mut train, mut test) =
            data::train_test_split(&df, self.config.test_size, self.config.random_state)?;

        data::write_csv(&mut train, &self.config.train_path())?;
        data::write_csv(&mut test, &self.config.test_path())?;

        let shapes = SplitShapes {
            train: train.shape(),
            test: test.shape(),
        };
        tracing::info!("Split data into training and test sets");
        tracing::info!("Train shape: {:?}", shapes.train);
        tracing::info!("Test shape: {:?}", shapes.test);
        Ok(shapes)
    }
}
