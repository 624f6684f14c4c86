//! Regression metrics reported by the evaluation stage.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Root mean squared error, mean absolute error and coefficient of determination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl RegressionMetrics {
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        if actual.len() != predicted.len() {
            anyhow::bail!(
                "Cannot score {} predictions against {} actual values",
                predicted.len(),
                actual.len()
            );
        }
        if actual.is_empty() {
            anyhow::bail!("Cannot score an empty prediction set");
        }

        let n = actual.len() as f64;
        let mut squared = 0.0;
        let mut absolute = 0.0;
        for (a, p) in actual.iter().zip(predicted) {
            let err = a - p;
            squared += err * err;
            absolute += err.abs();
        }

        let mean = actual.iter().sum::<f64>() / n;
        let total: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

        // Constant targets: perfect predictions score 1, anything else 0.
        let r2 = if total == 0.0 {
            if squared == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - squared / total
        };

        Ok(Self {
            rmse: (squared / n).sqrt(),
            mae: absolute / n,
            r2,
        })
    }

    /// Metric name/value pairs in logging order
    pub fn as_pairs(&self) -> [(&'static str, f64); 3] {
        [("rmse", self.rmse), ("mae", self.mae), ("r2", self.r2)]
    }
}
