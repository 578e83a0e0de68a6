//! L2-regularized logistic regression backed by `linfa-logistic`.
//!
//! Columns are standardized before fitting; the means and scales are kept with the
//! fitted model so scoring applies the same transform.

use super::{Estimator, ensure_fitted, fit_error, records, targets};
use crate::data::features::FeatureMatrix;
use booking_core::{PipelineError, Result};
use linfa::Dataset;
use linfa::traits::{Fit, Predict};
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogisticRegressionClassifier {
    /// Inverse regularization strength.
    #[serde(default = "default_c", alias = "C")]
    pub c: f64,
    #[serde(default = "default_max_iter")]
    pub max_iter: u64,
    /// Gradient norm at which the solver stops.
    #[serde(default = "default_tol")]
    pub tol: f64,
    #[serde(default = "default_fit_intercept")]
    pub fit_intercept: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitted: Option<FittedLogistic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedLogistic {
    pub model: FittedLogisticRegression<f64, usize>,
    /// Whether the solver's positive class is label `1`.
    pub positive_is_one: bool,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl FittedLogistic {
    fn standardize(&self, x: &Array2<f64>) -> Array2<f64> {
        standardized(x, &self.means, &self.scales)
    }
}

fn default_c() -> f64 {
    1.0
}

fn default_max_iter() -> u64 {
    500
}

fn default_tol() -> f64 {
    1e-4
}

fn default_fit_intercept() -> bool {
    true
}

impl Default for LogisticRegressionClassifier {
    fn default() -> Self {
        Self {
            c: default_c(),
            max_iter: default_max_iter(),
            tol: default_tol(),
            fit_intercept: default_fit_intercept(),
            fitted: None,
        }
    }
}

fn standardized(x: &Array2<f64>, means: &[f64], scales: &[f64]) -> Array2<f64> {
    let mut z = x.clone();
    for (mut column, (m, s)) in z.axis_iter_mut(Axis(1)).zip(means.iter().zip(scales)) {
        column.mapv_inplace(|v| (v - m) / s);
    }
    z
}

fn column_moments(x: &Array2<f64>) -> (Vec<f64>, Vec<f64>) {
    x.axis_iter(Axis(1))
        .map(|column| {
            let mean = column.mean().unwrap_or(0.0);
            let std = column.std(0.0);
            (mean, if std > 1e-12 { std } else { 1.0 })
        })
        .unzip()
}

impl Estimator for LogisticRegressionClassifier {
    fn fit(&mut self, x: &FeatureMatrix, y: &[u8]) -> Result<()> {
        if !(self.c > 0.0) {
            return Err(PipelineError::training("c must be positive"));
        }
        let raw = records(x)?;
        let (means, scales) = column_moments(&raw);
        let z = standardized(&raw, &means, &scales);
        let dataset = Dataset::new(z, targets(y));

        let model = LogisticRegression::default()
            .alpha(1.0 / self.c)
            .max_iterations(self.max_iter)
            .gradient_tolerance(self.tol)
            .with_intercept(self.fit_intercept)
            .fit(&dataset)
            .map_err(|e| fit_error("logistic_regression", e))?;

        // the solver picks its own positive label; read it back from the most
        // confident training row
        let probabilities = model.predict_probabilities(dataset.records());
        let labels: Array1<usize> = model.predict(dataset.records());
        let positive_is_one = probabilities
            .iter()
            .zip(labels.iter())
            .max_by(|a, b| (a.0 - 0.5).abs().total_cmp(&(b.0 - 0.5).abs()))
            .is_none_or(|(&p, &label)| (p >= 0.5) == (label == 1));
        tracing::debug!(positive_is_one, "fitted logistic regression");

        self.fitted = Some(FittedLogistic {
            model,
            positive_is_one,
            means,
            scales,
        });
        Ok(())
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        let fitted = ensure_fitted(self.fitted.as_ref(), "logistic_regression")?;
        let probabilities = fitted
            .model
            .predict_probabilities(&fitted.standardize(&records(x)?));
        Ok(probabilities
            .iter()
            .map(|&p| if fitted.positive_is_one { p } else { 1.0 - p })
            .collect())
    }
}
