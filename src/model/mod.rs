//! Regression model and evaluation metrics.

pub mod elastic_net;
pub mod metrics;

pub use elastic_net::{ElasticNetModel, ElasticNetParams, Selection};
pub use metrics::RegressionMetrics;
