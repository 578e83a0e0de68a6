//! Bootstrap-aggregated `linfa-trees` members.
//!
//! Each member is fitted on a bootstrap sample of the rows and a random subset of
//! the feature columns. The positive-class probability is the share of member votes.

use super::tree::{
    Criterion, TreeLimits, default_criterion, default_min_samples_leaf,
    default_min_samples_split,
};
use super::{
    ClassWeight, Estimator, class_sample_weights, ensure_fitted, fit_error, records, targets,
};
use crate::data::features::FeatureMatrix;
use booking_core::{PipelineError, Result};
use linfa::Dataset;
use linfa::traits::{Fit, Predict};
use linfa_trees::DecisionTree;
use ndarray::{Array1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Number of feature columns drawn for each member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    All,
    Sqrt,
    Log2,
}

impl MaxFeatures {
    pub fn count(&self, n_features: usize) -> usize {
        let k = match self {
            Self::All => n_features,
            Self::Sqrt => (n_features as f64).sqrt() as usize,
            Self::Log2 => (n_features as f64).log2() as usize,
        };
        k.clamp(1, n_features.max(1))
    }
}

/// One fitted tree and the feature columns it was trained on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestMember {
    pub features: Vec<usize>,
    pub tree: DecisionTree<f64, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RandomForestClassifier {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_criterion")]
    pub criterion: Criterion,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    #[serde(default = "default_max_features")]
    pub max_features: MaxFeatures,
    #[serde(default = "default_bootstrap")]
    pub bootstrap: bool,
    #[serde(default)]
    pub class_weight: Option<ClassWeight>,
    #[serde(default)]
    pub random_state: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<ForestMember>,
}

fn default_n_estimators() -> usize {
    100
}

fn default_max_features() -> MaxFeatures {
    MaxFeatures::Sqrt
}

fn default_bootstrap() -> bool {
    true
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            criterion: default_criterion(),
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            max_features: default_max_features(),
            bootstrap: default_bootstrap(),
            class_weight: None,
            random_state: 0,
            members: Vec::new(),
        }
    }
}

impl Estimator for RandomForestClassifier {
    fn fit(&mut self, x: &FeatureMatrix, y: &[u8]) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(PipelineError::training("n_estimators must be at least 1"));
        }
        let limits = TreeLimits {
            criterion: self.criterion,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        };
        let all_records = records(x)?;
        let all_targets = targets(y);
        let all_weights: Array1<f32> = class_sample_weights(y, self.class_weight.as_ref())
            .into_iter()
            .map(|w| w as f32)
            .collect();
        let (n, d) = all_records.dim();
        let k = self.max_features.count(d);
        let mut rng = StdRng::seed_from_u64(self.random_state);

        let mut members = Vec::with_capacity(self.n_estimators);
        for _ in 0..self.n_estimators {
            let rows: Vec<usize> = if self.bootstrap {
                (0..n).map(|_| rng.gen_range(0..n)).collect()
            } else {
                (0..n).collect()
            };
            let mut features: Vec<usize> = (0..d).collect();
            features.shuffle(&mut rng);
            features.truncate(k);
            features.sort_unstable();

            let sample = Dataset::new(
                all_records.select(Axis(0), &rows).select(Axis(1), &features),
                all_targets.select(Axis(0), &rows),
            )
            .with_weights(all_weights.select(Axis(0), &rows));
            let tree = limits
                .params()
                .fit(&sample)
                .map_err(|e| fit_error("random_forest", e))?;
            members.push(ForestMember { features, tree });
        }
        tracing::debug!(trees = members.len(), features_per_tree = k, "fitted random forest");
        self.members = members;
        Ok(())
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        let members = ensure_fitted(
            (!self.members.is_empty()).then_some(&self.members),
            "random_forest",
        )?;
        let all_records = records(x)?;
        let mut votes = vec![0.0; all_records.nrows()];
        for member in members {
            let labels: Array1<usize> =
                member.tree.predict(&all_records.select(Axis(1), &member.features));
            for (vote, &label) in votes.iter_mut().zip(labels.iter()) {
                if label == 1 {
                    *vote += 1.0;
                }
            }
        }
        let n_trees = members.len() as f64;
        Ok(votes.into_iter().map(|v| v / n_trees).collect())
    }
}
