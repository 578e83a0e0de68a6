//! Binary classifiers for the cancellation target.
//!
//! Every family implements [`Estimator`] on top of `linfa` models. [`ClassicalAlgorithm`]
//! is the tagged, serializable union of the families: it is built from a parameter map
//! taken from `model.yaml` or `params.json`, fitted in place, and persisted with its
//! fitted state inside `model.json`.

pub mod forest;
pub mod logistic;
pub mod tree;

pub use forest::RandomForestClassifier;
pub use logistic::LogisticRegressionClassifier;
pub use tree::DecisionTreeClassifier;

use crate::data::features::FeatureMatrix;
use booking_core::{PipelineError, Result};
use linfa::Dataset;
use ndarray::{Array1, Array2, Ix1};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Probability threshold for the positive class.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// A binary classifier.
pub trait Estimator {
    /// Fit on `x` with 0/1 labels `y`.
    fn fit(&mut self, x: &FeatureMatrix, y: &[u8]) -> Result<()>;

    /// Probability of the positive class for every row.
    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>>;

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<u8>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| u8::from(p >= DECISION_THRESHOLD))
            .collect())
    }
}

/// Classifier families and their parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ClassicalAlgorithm {
    DecisionTree(DecisionTreeClassifier),
    RandomForest(RandomForestClassifier),
    LogisticRegression(LogisticRegressionClassifier),
}

impl ClassicalAlgorithm {
    /// Build an unfitted estimator of `family` from a parameter map.
    ///
    /// Keys that are not parameters of the family are rejected.
    pub fn from_params(family: &str, params: &Map<String, Value>) -> Result<Self> {
        let mut tagged = params.clone();
        tagged.insert("family".to_string(), Value::String(family.to_string()));
        serde_json::from_value(Value::Object(tagged)).map_err(|e| {
            PipelineError::training(format!("invalid parameters for family '{family}': {e}"))
        })
    }

    pub fn family(&self) -> &'static str {
        match self {
            Self::DecisionTree(_) => "decision_tree",
            Self::RandomForest(_) => "random_forest",
            Self::LogisticRegression(_) => "logistic_regression",
        }
    }

    fn inner(&self) -> &dyn Estimator {
        match self {
            Self::DecisionTree(m) => m,
            Self::RandomForest(m) => m,
            Self::LogisticRegression(m) => m,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Estimator {
        match self {
            Self::DecisionTree(m) => m,
            Self::RandomForest(m) => m,
            Self::LogisticRegression(m) => m,
        }
    }
}

impl Estimator for ClassicalAlgorithm {
    fn fit(&mut self, x: &FeatureMatrix, y: &[u8]) -> Result<()> {
        if x.n_rows() != y.len() {
            return Err(PipelineError::training(format!(
                "{} feature rows but {} labels",
                x.n_rows(),
                y.len()
            )));
        }
        if x.n_rows() == 0 {
            return Err(PipelineError::training("cannot fit on an empty training set"));
        }
        self.inner_mut().fit(x, y)
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        self.inner().predict_proba(x)
    }
}

/// How samples are weighted by class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassWeight {
    Mode(ClassWeightMode),
    /// Explicit weights keyed by class label (`"0"`, `"1"`).
    Explicit(BTreeMap<String, f64>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassWeightMode {
    /// `n_samples / (n_classes * class_count)`.
    Balanced,
}

/// Per-sample weights for `y` under `class_weight` (all ones when unset).
pub fn class_sample_weights(y: &[u8], class_weight: Option<&ClassWeight>) -> Vec<f64> {
    let per_class: [f64; 2] = match class_weight {
        None => [1.0, 1.0],
        Some(ClassWeight::Mode(ClassWeightMode::Balanced)) => {
            let n = y.len() as f64;
            let positives = y.iter().filter(|&&v| v == 1).count() as f64;
            let weight = |count: f64| if count > 0.0 { n / (2.0 * count) } else { 1.0 };
            [weight(n - positives), weight(positives)]
        }
        Some(ClassWeight::Explicit(map)) => [
            map.get("0").copied().unwrap_or(1.0),
            map.get("1").copied().unwrap_or(1.0),
        ],
    };
    y.iter().map(|&v| per_class[usize::from(v.min(1))]).collect()
}

pub(crate) fn ensure_fitted<'a, T>(state: Option<&'a T>, family: &str) -> Result<&'a T> {
    state.ok_or_else(|| PipelineError::model(format!("{family} estimator is not fitted")))
}

/// Row-major copy of `x` as a linfa record matrix.
pub(crate) fn records(x: &FeatureMatrix) -> Result<Array2<f64>> {
    let flat: Vec<f64> = x.rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((x.n_rows(), x.n_features()), flat)
        .map_err(|e| PipelineError::model(format!("ragged feature matrix: {e}")))
}

pub(crate) fn targets(y: &[u8]) -> Array1<usize> {
    y.iter().map(|&v| usize::from(v)).collect()
}

/// Training set with per-sample weights from `class_weight`.
pub(crate) fn weighted_dataset(
    x: &FeatureMatrix,
    y: &[u8],
    class_weight: Option<&ClassWeight>,
) -> Result<Dataset<f64, usize, Ix1>> {
    let weights: Array1<f32> = class_sample_weights(y, class_weight)
        .into_iter()
        .map(|w| w as f32)
        .collect();
    Ok(Dataset::new(records(x)?, targets(y)).with_weights(weights))
}

pub(crate) fn fit_error(family: &str, err: impl std::fmt::Display) -> PipelineError {
    PipelineError::training(format!("{family} fit failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_params() {
        let algo = ClassicalAlgorithm::from_params(
            "random_forest",
            &params(json!({"n_estimators": 10, "max_depth": 4, "class_weight": "balanced"})),
        )
        .unwrap();
        match &algo {
            ClassicalAlgorithm::RandomForest(rf) => {
                assert_eq!(rf.n_estimators, 10);
                assert_eq!(rf.max_depth, Some(4));
                assert_eq!(
                    rf.class_weight,
                    Some(ClassWeight::Mode(ClassWeightMode::Balanced))
                );
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(algo.family(), "random_forest");
    }

    #[test]
    fn test_misspelled_parameter_is_rejected() {
        let err = ClassicalAlgorithm::from_params("decision_tree", &params(json!({"max_dpeth": 3})))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
        assert!(err.to_string().contains("max_dpeth"), "{err}");

        for family in ["random_forest", "logistic_regression"] {
            let typo = params(json!({"n_estimator": 10}));
            assert!(ClassicalAlgorithm::from_params(family, &typo).is_err(), "{family}");
        }
        // the upper-case alias stays accepted
        assert!(
            ClassicalAlgorithm::from_params("logistic_regression", &params(json!({"C": 0.5})))
                .is_ok()
        );
    }

    #[test]
    fn test_unknown_family() {
        let err = ClassicalAlgorithm::from_params("svm", &Map::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
    }

    #[test]
    fn test_explicit_class_weight() {
        let algo = ClassicalAlgorithm::from_params(
            "decision_tree",
            &params(json!({"class_weight": {"0": 1.0, "1": 3.0}})),
        )
        .unwrap();
        let ClassicalAlgorithm::DecisionTree(dt) = algo else {
            panic!("expected decision tree");
        };
        assert_eq!(
            class_sample_weights(&[0, 1], dt.class_weight.as_ref()),
            vec![1.0, 3.0]
        );
    }

    #[test]
    fn test_balanced_weights() {
        let weights = class_sample_weights(
            &[0, 0, 0, 1],
            Some(&ClassWeight::Mode(ClassWeightMode::Balanced)),
        );
        assert_eq!(weights, vec![4.0 / 6.0, 4.0 / 6.0, 4.0 / 6.0, 2.0]);
    }

    #[test]
    fn test_fitted_model_roundtrips_through_json() {
        let x = FeatureMatrix {
            feature_names: vec!["a".into()],
            rows: (0..10).map(|i| vec![i as f64]).collect(),
        };
        let y: Vec<u8> = (0..10).map(|i| u8::from(i > 4)).collect();
        let mut algo =
            ClassicalAlgorithm::from_params("decision_tree", &params(json!({"max_depth": 2})))
                .unwrap();
        algo.fit(&x, &y).unwrap();

        let text = serde_json::to_string(&algo).unwrap();
        let restored: ClassicalAlgorithm = serde_json::from_str(&text).unwrap();
        assert_eq!(serde_json::to_string(&restored).unwrap(), text);
        assert_eq!(restored.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_ragged_matrix_is_a_model_error() {
        let x = FeatureMatrix {
            feature_names: vec!["a".into(), "b".into()],
            rows: vec![vec![1.0, 2.0], vec![3.0]],
        };
        assert!(matches!(records(&x).unwrap_err(), PipelineError::Model(_)));
    }

    #[test]
    fn test_weighted_dataset_carries_class_weights() {
        let x = FeatureMatrix {
            feature_names: vec!["a".into()],
            rows: vec![vec![0.0], vec![1.0], vec![2.0]],
        };
        let balanced = ClassWeight::Mode(ClassWeightMode::Balanced);
        let dataset = weighted_dataset(&x, &[0, 0, 1], Some(&balanced)).unwrap();
        assert_eq!(dataset.records().dim(), (3, 1));
        assert_eq!(dataset.weights().unwrap().to_vec(), vec![0.75, 0.75, 1.5]);
    }
}
