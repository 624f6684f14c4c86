//! Elastic net linear regression fit by coordinate descent.
//!
//! Minimizes
//!
//! ```text
//! 1 / (2 * n) * ||y - Xw - b||^2
//!     + alpha * l1_ratio * ||w||_1
//!     + 0.5 * alpha * (1 - l1_ratio) * ||w||^2
//! ```
//!
//! The intercept is recovered from the column means after fitting on centered
//! data. Iteration stops once the duality gap drops below `tol * ||y||^2`.

use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::common::{load_json, save_json};
use crate::data::FeatureMatrix;

/// Order in which coordinates are updated during an epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    #[default]
    Cyclic,
    Random,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticNetParams {
    pub alpha: f64,
    pub l1_ratio: f64,
    pub max_iter: usize,
    pub tol: f64,
    #[serde(default)]
    pub selection: Selection,
    pub random_state: u64,
}

impl Default for ElasticNetParams {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            l1_ratio: 0.5,
            max_iter: 1000,
            tol: 1e-4,
            selection: Selection::Cyclic,
            random_state: 0,
        }
    }
}

/// A fitted model, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElasticNetModel {
    pub params: ElasticNetParams,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub n_iter: usize,
    pub dual_gap: f64,
    pub converged: bool,
}

impl ElasticNetParams {
    pub fn fit(&self, x: &FeatureMatrix, y: &[f64]) -> Result<ElasticNetModel> {
        let n_rows = x.n_rows;
        if n_rows == 0 {
            anyhow::bail!("Cannot fit on an empty dataset");
        }
        if y.len() != n_rows {
            anyhow::bail!(
                "Target has {} values but features have {} rows",
                y.len(),
                n_rows
            );
        }
        if x.columns.iter().any(|column| column.len() != n_rows) {
            anyhow::bail!("Feature columns have inconsistent lengths");
        }

        // Center features and target so the intercept drops out of the solve.
        let x_means: Vec<f64> = x.columns.iter().map(|column| mean(column)).collect();
        let y_mean = mean(y);
        let columns: Vec<Vec<f64>> = x
            .columns
            .iter()
            .zip(&x_means)
            .map(|(column, m)| column.iter().map(|v| v - m).collect())
            .collect();
        let y_centered: Vec<f64> = y.iter().map(|v| v - y_mean).collect();

        let n = n_rows as f64;
        let l1_reg = self.alpha * self.l1_ratio * n;
        let l2_reg = self.alpha * (1.0 - self.l1_ratio) * n;

        let solution = coordinate_descent(&columns, &y_centered, l1_reg, l2_reg, self);

        if !solution.converged {
            tracing::warn!(
                "Coordinate descent did not converge after {} iterations (duality gap {:.3e}); consider raising MAX_ITER",
                solution.n_iter,
                solution.dual_gap
            );
        }

        let intercept = y_mean
            - solution
                .coefficients
                .iter()
                .zip(&x_means)
                .map(|(w, m)| w * m)
                .sum::<f64>();

        Ok(ElasticNetModel {
            params: self.clone(),
            feature_names: x.names.clone(),
            coefficients: solution.coefficients,
            intercept,
            n_iter: solution.n_iter,
            dual_gap: solution.dual_gap,
            converged: solution.converged,
        })
    }
}

struct Solution {
    coefficients: Vec<f64>,
    n_iter: usize,
    dual_gap: f64,
    converged: bool,
}

fn coordinate_descent(
    columns: &[Vec<f64>],
    y: &[f64],
    l1_reg: f64,
    l2_reg: f64,
    params: &ElasticNetParams,
) -> Solution {
    let n_features = columns.len();
    let mut w = vec![0.0; n_features];
    let norm_cols: Vec<f64> = columns.iter().map(|column| dot(column, column)).collect();
    let mut residual = y.to_vec();
    let tol = params.tol * dot(y, y);
    let mut rng = StdRng::seed_from_u64(params.random_state);

    let mut dual_gap = f64::INFINITY;
    let mut n_iter = 0;

    for iteration in 0..params.max_iter {
        n_iter = iteration + 1;
        let mut w_max: f64 = 0.0;
        let mut d_w_max: f64 = 0.0;

        for step in 0..n_features {
            let j = match params.selection {
                Selection::Cyclic => step,
                Selection::Random => rng.gen_range(0..n_features),
            };
            if norm_cols[j] == 0.0 {
                continue;
            }

            let w_old = w[j];
            let column = &columns[j];
            if w_old != 0.0 {
                axpy(w_old, column, &mut residual);
            }

            let rho = dot(column, &residual);
            w[j] = soft_threshold(rho, l1_reg) / (norm_cols[j] + l2_reg);

            if w[j] != 0.0 {
                axpy(-w[j], column, &mut residual);
            }

            d_w_max = d_w_max.max((w[j] - w_old).abs());
            w_max = w_max.max(w[j].abs());
        }

        let last = iteration + 1 == params.max_iter;
        if w_max == 0.0 || d_w_max / w_max < params.tol || last {
            dual_gap = duality_gap(columns, y, &residual, &w, l1_reg, l2_reg);
            if dual_gap < tol {
                return Solution {
                    coefficients: w,
                    n_iter,
                    dual_gap,
                    converged: true,
                };
            }
        }
    }

    Solution {
        coefficients: w,
        n_iter,
        dual_gap,
        converged: false,
    }
}

fn duality_gap(
    columns: &[Vec<f64>],
    y: &[f64],
    residual: &[f64],
    w: &[f64],
    l1_reg: f64,
    l2_reg: f64,
) -> f64 {
    let dual_norm = columns
        .iter()
        .zip(w)
        .map(|(column, wj)| (dot(column, residual) - l2_reg * wj).abs())
        .fold(0.0, f64::max);

    let r_norm2 = dot(residual, residual);
    let w_norm2 = dot(w, w);

    // Without an L1 term the residual itself is the dual point.
    let (scale, mut gap) = if l1_reg > 0.0 && dual_norm > l1_reg {
        let scale = l1_reg / dual_norm;
        (scale, 0.5 * (r_norm2 + r_norm2 * scale * scale))
    } else {
        (1.0, r_norm2)
    };

    let l1_norm: f64 = w.iter().map(|v| v.abs()).sum();
    gap += l1_reg * l1_norm - scale * dot(residual, y)
        + 0.5 * l2_reg * (1.0 + scale * scale) * w_norm2;
    gap
}

impl ElasticNetModel {
    /// Predict from a matrix whose columns follow `feature_names`.
    pub fn predict_matrix(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        if x.names != self.feature_names {
            anyhow::bail!(
                "Feature mismatch: model expects {:?}, got {:?}",
                self.feature_names,
                x.names
            );
        }

        let mut predictions = vec![self.intercept; x.n_rows];
        for (column, w) in x.columns.iter().zip(&self.coefficients) {
            axpy(*w, column, &mut predictions);
        }
        Ok(predictions)
    }

    /// Predict for every row of `df`, selecting the model's features by name.
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let x = FeatureMatrix::from_frame(df, &self.feature_names)
            .context("Input data does not contain the model's features")?;
        self.predict_matrix(&x)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(path, self).context("Failed to save model")
    }

    pub fn load(path: &Path) -> Result<Self> {
        load_json(path).context("Failed to load model")
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    value.signum() * (value.abs() - threshold).max(0.0)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// `y += a * x`
fn axpy(a: f64, x: &[f64], y: &mut [f64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += a * xi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn matrix(names: &[&str], columns: Vec<Vec<f64>>) -> FeatureMatrix {
        let n_rows = columns.first().map(Vec::len).unwrap_or(0);
        FeatureMatrix {
            names: names.iter().map(|n| n.to_string()).collect(),
            columns,
            n_rows,
        }
    }

    fn linear_data() -> (FeatureMatrix, Vec<f64>) {
        let x1 = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let x2 = vec![0.5, -1.0, 2.0, 0.0, 1.5, -0.5, 3.0, 1.0];
        let y = x1
            .iter()
            .zip(&x2)
            .map(|(a, b)| 3.0 * a - 2.0 * b + 1.0)
            .collect();
        (matrix(&["x1", "x2"], vec![x1, x2]), y)
    }

    #[test]
    fn test_tiny_alpha_recovers_ordinary_least_squares() {
        let (x, y) = linear_data();
        let params = ElasticNetParams {
            alpha: 1e-8,
            l1_ratio: 0.5,
            max_iter: 10_000,
            tol: 1e-10,
            ..Default::default()
        };

        let model = params.fit(&x, &y).unwrap();
        assert!(model.converged);
        assert!((model.coefficients[0] - 3.0).abs() < 1e-3);
        assert!((model.coefficients[1] + 2.0).abs() < 1e-3);
        assert!((model.intercept - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_large_alpha_zeroes_coefficients() {
        let (x, y) = linear_data();
        let params = ElasticNetParams {
            alpha: 1e6,
            l1_ratio: 1.0,
            ..Default::default()
        };

        let model = params.fit(&x, &y).unwrap();
        assert!(model.coefficients.iter().all(|w| *w == 0.0));
        // With every weight at zero the intercept is the target mean.
        let y_mean = y.iter().sum::<f64>() / y.len() as f64;
        assert!((model.intercept - y_mean).abs() < 1e-12);
    }

    #[test]
    fn test_ridge_shrinks_but_keeps_coefficients() {
        let (x, y) = linear_data();
        let params = ElasticNetParams {
            alpha: 0.5,
            l1_ratio: 0.0,
            ..Default::default()
        };

        let model = params.fit(&x, &y).unwrap();
        assert!(model.coefficients[0] > 0.0 && model.coefficients[0] < 3.0);
        assert!(model.coefficients[1] < 0.0 && model.coefficients[1] > -2.0);
    }

    #[test]
    fn test_random_selection_matches_cyclic_solution() {
        let (x, y) = linear_data();
        let cyclic = ElasticNetParams {
            alpha: 0.1,
            l1_ratio: 0.5,
            tol: 1e-10,
            max_iter: 20_000,
            ..Default::default()
        };
        let random = ElasticNetParams {
            selection: Selection::Random,
            random_state: 42,
            ..cyclic.clone()
        };

        let a = cyclic.fit(&x, &y).unwrap();
        let b = random.fit(&x, &y).unwrap();
        for (wa, wb) in a.coefficients.iter().zip(&b.coefficients) {
            assert!((wa - wb).abs() < 1e-4);
        }
    }

    #[test]
    fn test_constant_feature_gets_zero_weight() {
        let x = matrix(
            &["x", "constant"],
            vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 5.0, 5.0, 5.0]],
        );
        let y = vec![2.0, 4.0, 6.0, 8.0];

        let model = ElasticNetParams {
            alpha: 0.01,
            ..Default::default()
        }
        .fit(&x, &y)
        .unwrap();
        assert_eq!(model.coefficients[1], 0.0);
    }

    #[test]
    fn test_fit_rejects_length_mismatch() {
        let (x, _) = linear_data();
        let err = ElasticNetParams::default().fit(&x, &[1.0, 2.0]).unwrap_err();
        assert!(err.to_string().contains("rows"));
    }

    #[test]
    fn test_predict_matrix_requires_same_features() {
        let (x, y) = linear_data();
        let model = ElasticNetParams::default().fit(&x, &y).unwrap();

        let other = matrix(&["x2", "x1"], x.columns.clone());
        assert!(model.predict_matrix(&other).is_err());
    }

    #[test]
    fn test_predict_applies_coefficients() {
        let model = ElasticNetModel {
            params: ElasticNetParams::default(),
            feature_names: vec!["a".to_string(), "b".to_string()],
            coefficients: vec![2.0, -1.0],
            intercept: 0.5,
            n_iter: 1,
            dual_gap: 0.0,
            converged: true,
        };
        let x = matrix(&["a", "b"], vec![vec![1.0, 0.0], vec![1.0, 4.0]]);

        assert_eq!(model.predict_matrix(&x).unwrap(), vec![1.5, -3.5]);
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("model.json");
        let (x, y) = linear_data();
        let model = ElasticNetParams::default().fit(&x, &y).unwrap();

        model.save(&path).unwrap();
        assert_eq!(ElasticNetModel::load(&path).unwrap(), model);
    }

    #[test]
    fn test_load_rejects_malformed_model() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("model.json");
        fs::write(&path, "{\"coefficients\": [1.0]").unwrap();

        let err = ElasticNetModel::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse json file"));
    }
}
