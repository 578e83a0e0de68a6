//! Single CART decision tree backed by `linfa-trees`.
//!
//! Sample weights carry `class_weight`, so `min_samples_*` are enforced as total
//! sample weight the way linfa counts them.

use super::{ClassWeight, Estimator, ensure_fitted, fit_error, records, weighted_dataset};
use crate::data::features::FeatureMatrix;
use booking_core::Result;
use linfa::traits::{Fit, Predict};
use linfa_trees::{DecisionTree, DecisionTreeParams, SplitQuality};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Split quality measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Gini,
    Entropy,
}

impl From<Criterion> for SplitQuality {
    fn from(criterion: Criterion) -> Self {
        match criterion {
            Criterion::Gini => SplitQuality::Gini,
            Criterion::Entropy => SplitQuality::Entropy,
        }
    }
}

/// Growth limits shared by single trees and forest members.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TreeLimits {
    pub criterion: Criterion,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl TreeLimits {
    pub(crate) fn params(&self) -> DecisionTreeParams<f64, usize> {
        DecisionTree::params()
            .split_quality(self.criterion.into())
            .max_depth(self.max_depth)
            .min_weight_split(self.min_samples_split as f32)
            .min_weight_leaf(self.min_samples_leaf as f32)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecisionTreeClassifier {
    #[serde(default = "default_criterion")]
    pub criterion: Criterion,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    #[serde(default)]
    pub class_weight: Option<ClassWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<DecisionTree<f64, usize>>,
}

pub(crate) fn default_criterion() -> Criterion {
    Criterion::Gini
}

pub(crate) fn default_min_samples_split() -> usize {
    2
}

pub(crate) fn default_min_samples_leaf() -> usize {
    1
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self {
            criterion: default_criterion(),
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            class_weight: None,
            tree: None,
        }
    }
}

impl DecisionTreeClassifier {
    fn limits(&self) -> TreeLimits {
        TreeLimits {
            criterion: self.criterion,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

impl Estimator for DecisionTreeClassifier {
    fn fit(&mut self, x: &FeatureMatrix, y: &[u8]) -> Result<()> {
        let dataset = weighted_dataset(x, y, self.class_weight.as_ref())?;
        let tree = self
            .limits()
            .params()
            .fit(&dataset)
            .map_err(|e| fit_error("decision_tree", e))?;
        tracing::debug!(rows = y.len(), "fitted decision tree");
        self.tree = Some(tree);
        Ok(())
    }

    /// Hard 0/1 votes: the leaf's majority class.
    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        let tree = ensure_fitted(self.tree.as_ref(), "decision_tree")?;
        let labels: Array1<usize> = tree.predict(&records(x)?);
        Ok(labels.iter().map(|&l| if l == 1 { 1.0 } else { 0.0 }).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_core::PipelineError;
    use pretty_assertions::assert_eq;

    fn matrix(rows: Vec<Vec<f64>>) -> FeatureMatrix {
        let n = rows.first().map_or(0, Vec::len);
        FeatureMatrix {
            feature_names: (0..n).map(|i| format!("f{i}")).collect(),
            rows,
        }
    }

    #[test]
    fn test_learns_threshold() {
        let x = matrix((0..20).map(|i| vec![i as f64, 1.0]).collect());
        let y: Vec<u8> = (0..20).map(|i| u8::from(i >= 12)).collect();
        let mut clf = DecisionTreeClassifier::default();
        clf.fit(&x, &y).unwrap();

        assert_eq!(clf.predict(&x).unwrap(), y);
        let unseen = matrix(vec![vec![3.5, 1.0], vec![40.0, 1.0]]);
        assert_eq!(clf.predict(&unseen).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        // xor needs depth 2
        let x = matrix(vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ]);
        let y = vec![0, 1, 1, 0];
        let mut stump = DecisionTreeClassifier {
            max_depth: Some(1),
            criterion: Criterion::Entropy,
            ..DecisionTreeClassifier::default()
        };
        stump.fit(&x, &y).unwrap();
        assert_ne!(stump.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_min_samples_leaf() {
        let x = matrix((0..10).map(|i| vec![i as f64]).collect());
        let y: Vec<u8> = (0..10).map(|i| u8::from(i == 9)).collect();
        let mut clf = DecisionTreeClassifier {
            min_samples_leaf: 3,
            ..DecisionTreeClassifier::default()
        };
        clf.fit(&x, &y).unwrap();
        // the lone positive cannot be isolated in a leaf of its own
        assert_eq!(clf.predict(&x).unwrap()[9], 0);
    }

    #[test]
    fn test_class_weight_shifts_the_majority() {
        let x = matrix((0..6).map(|_| vec![1.0]).collect());
        let y = vec![0, 0, 0, 0, 1, 1];
        let mut plain = DecisionTreeClassifier::default();
        plain.fit(&x, &y).unwrap();
        assert_eq!(plain.predict(&x).unwrap(), vec![0; 6]);

        let mut weighted = DecisionTreeClassifier {
            class_weight: Some(ClassWeight::Explicit(
                [("1".to_string(), 5.0)].into_iter().collect(),
            )),
            ..DecisionTreeClassifier::default()
        };
        weighted.fit(&x, &y).unwrap();
        assert_eq!(weighted.predict(&x).unwrap(), vec![1; 6]);
    }

    #[test]
    fn test_unfitted_tree_errors() {
        let clf = DecisionTreeClassifier::default();
        let x = matrix(vec![vec![1.0]]);
        assert!(matches!(
            clf.predict_proba(&x).unwrap_err(),
            PipelineError::Model(_)
        ));
    }
}
