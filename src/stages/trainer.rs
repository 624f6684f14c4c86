//! Model training: fit the elastic net on the train split and save it.

use anyhow::Result;

use crate::config::ModelTrainerConfig;
use crate::data::{self, FeatureMatrix};
use crate::model::{ElasticNetModel, ElasticNetParams, Selection};

pub struct ModelTrainer {
    config: ModelTrainerConfig,
}

impl ModelTrainer {
    pub fn new(config: ModelTrainerConfig) -> Self {
        Self { config }
    }

    pub fn params(&self) -> ElasticNetParams {
        ElasticNetParams {
            alpha: self.config.alpha,
            l1_ratio: self.config.l1_ratio,
            max_iter: self.config.max_iter,
            tol: self.config.tol,
            selection: Selection::Cyclic,
            random_state: self.config.random_state,
        }
    }

    pub fn run(&self) -> Result<ElasticNetModel> {
        let train = data::read_csv(&self.config.train_data_path)?;
        let (x, y) = FeatureMatrix::features_and_target(&train, &self.config.target_column)?;

        tracing::info!(
            "Fitting elastic net (alpha={}, l1_ratio={}) on {} rows x {} features",
            self.config.alpha,
            self.config.l1_ratio,
            x.n_rows,
            x.n_features()
        );
        let model = self.params().fit(&x, &y)?;

        let model_path = self.config.model_path();
        model.save(&model_path)?;
        tracing::info!(
            "Model saved to {} after {} iterations",
            model_path.display(),
            model.n_iter
        );
        Ok(model)
    }
}
