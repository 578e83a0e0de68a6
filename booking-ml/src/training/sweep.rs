//! Exhaustive grid search with stratified k-fold cross-validation.

use crate::algorithms::{ClassicalAlgorithm, Estimator};
use crate::data::features::FeatureMatrix;
use crate::training::metrics::Scoring;
use crate::training::model_config::ModelCandidate;
use booking_core::{PipelineError, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Every combination of the grid values, in key order with the last key varying fastest.
pub fn generate_trials(grid: &BTreeMap<String, Vec<Value>>) -> Vec<Map<String, Value>> {
    let mut configs = vec![Map::new()];
    for (key, values) in grid {
        let mut new_configs = Vec::new();
        for config in &configs {
            for value in values {
                let mut c = config.clone();
                c.insert(key.clone(), value.clone());
                new_configs.push(c);
            }
        }
        configs = new_configs;
    }
    configs
}

/// Test-fold indices for stratified k-fold: each class is shuffled and dealt round-robin.
pub fn stratified_folds(y: &[u8], k: usize, seed: u64) -> Result<Vec<Vec<usize>>> {
    if k < 2 || y.len() < k {
        return Err(PipelineError::training(format!(
            "cannot make {k} folds from {} samples",
            y.len()
        )));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds = vec![Vec::new(); k];
    let mut next = 0;
    for class in [0u8, 1] {
        let mut members: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
        members.shuffle(&mut rng);
        for i in members {
            folds[next % k].push(i);
            next += 1;
        }
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    Ok(folds)
}

/// Scores of one parameter combination across folds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationResult {
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
}

impl CrossValidationResult {
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n = scores.len().max(1) as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Self {
            fold_scores: scores,
            mean_score: mean,
            std_score: variance.sqrt(),
        }
    }
}

/// One evaluated grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepTrial {
    pub trial_number: usize,
    pub params: Map<String, Value>,
    pub result: CrossValidationResult,
}

/// Outcome of searching one candidate's grid.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Grid values of the winning combination (without the candidate's base params).
    pub best_params: Map<String, Value>,
    pub best_score: f64,
    /// Winning combination refit on all of the search data.
    pub best_estimator: ClassicalAlgorithm,
    pub trials: Vec<SweepTrial>,
}

/// Grid search over one candidate at a time.
#[derive(Debug, Clone)]
pub struct GridSearch {
    pub cv: usize,
    pub scoring: Scoring,
    pub seed: u64,
}

impl GridSearch {
    pub fn new(cv: usize, scoring: Scoring, seed: u64) -> Self {
        Self { cv, scoring, seed }
    }

    pub fn cross_validate(
        &self,
        estimator: &ClassicalAlgorithm,
        x: &FeatureMatrix,
        y: &[u8],
        folds: &[Vec<usize>],
    ) -> Result<CrossValidationResult> {
        let mut scores = Vec::with_capacity(folds.len());
        for (f, test_idx) in folds.iter().enumerate() {
            let train_idx: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(g, _)| *g != f)
                .flat_map(|(_, idx)| idx.iter().copied())
                .collect();
            let y_train: Vec<u8> = train_idx.iter().map(|&i| y[i]).collect();
            let y_test: Vec<u8> = test_idx.iter().map(|&i| y[i]).collect();

            let mut model = estimator.clone();
            model.fit(&x.select(&train_idx), &y_train)?;
            let pred = model.predict(&x.select(test_idx))?;
            scores.push(self.scoring.score(&y_test, &pred));
        }
        Ok(CrossValidationResult::from_scores(scores))
    }

    /// Evaluate every grid combination and refit the best one on `x`.
    ///
    /// The first combination with the highest mean score wins.
    pub fn search(
        &self,
        candidate: &ModelCandidate,
        x: &FeatureMatrix,
        y: &[u8],
    ) -> Result<SearchOutcome> {
        let folds = stratified_folds(y, self.cv, self.seed)?;
        let combinations = generate_trials(&candidate.search_param_grid);
        if combinations.is_empty() {
            return Err(PipelineError::training(format!(
                "search grid for '{}' has a parameter with no values",
                candidate.name
            )));
        }

        let mut trials: Vec<SweepTrial> = Vec::with_capacity(combinations.len());
        let mut best: Option<usize> = None;
        for (trial_number, params) in combinations.into_iter().enumerate() {
            let estimator = ClassicalAlgorithm::from_params(
                &candidate.family,
                &candidate.merged_params(&params),
            )?;
            let result = self.cross_validate(&estimator, x, y, &folds)?;
            tracing::debug!(
                model = %candidate.name,
                trial_number,
                score = result.mean_score,
                ?params,
                "grid trial"
            );
            let improves = best.is_none_or(|b| result.mean_score > trials[b].result.mean_score);
            trials.push(SweepTrial {
                trial_number,
                params,
                result,
            });
            if improves {
                best = Some(trial_number);
            }
        }

        let best_trial = best
            .map(|b| &trials[b])
            .ok_or_else(|| PipelineError::training("grid search produced no trials"))?;
        let best_params = best_trial.params.clone();
        let best_score = best_trial.result.mean_score;

        let mut best_estimator = ClassicalAlgorithm::from_params(
            &candidate.family,
            &candidate.merged_params(&best_params),
        )?;
        best_estimator.fit(x, y)?;

        let chosen = Value::Object(best_params.clone());
        tracing::info!(
            model = %candidate.name,
            score = best_score,
            params = %chosen,
            "best parameters found"
        );
        Ok(SearchOutcome {
            best_params,
            best_score,
            best_estimator,
            trials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_generate_trials_cartesian_order() {
        let mut grid = BTreeMap::new();
        grid.insert("max_depth".to_string(), vec![json!(2), json!(4)]);
        grid.insert("criterion".to_string(), vec![json!("gini"), json!("entropy")]);
        let trials = generate_trials(&grid);
        assert_eq!(trials.len(), 4);
        assert_eq!(trials[0]["criterion"], json!("gini"));
        assert_eq!(trials[0]["max_depth"], json!(2));
        assert_eq!(trials[1]["max_depth"], json!(4));
        assert_eq!(trials[2]["criterion"], json!("entropy"));
    }

    #[test]
    fn test_empty_grid_is_single_trial() {
        assert_eq!(generate_trials(&BTreeMap::new()), vec![Map::new()]);
    }

    #[test]
    fn test_stratified_folds_balance_classes() {
        let y: Vec<u8> = (0..30).map(|i| u8::from(i % 3 == 0)).collect();
        let folds = stratified_folds(&y, 3, 42).unwrap();
        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..30).collect::<Vec<_>>());
        for fold in &folds {
            assert_eq!(fold.len(), 10);
            let positives = fold.iter().filter(|&&i| y[i] == 1).count();
            assert!((3..=4).contains(&positives));
        }
    }

    #[test]
    fn test_too_many_folds() {
        assert!(stratified_folds(&[0, 1], 3, 0).is_err());
    }

    #[test]
    fn test_search_picks_first_perfect_depth() {
        // positive only when both features are at least 2, which a stump cannot fit
        let rows: Vec<Vec<f64>> = (0..48)
            .map(|i| vec![(i % 4) as f64, ((i / 4) % 4) as f64])
            .collect();
        let y: Vec<u8> = rows
            .iter()
            .map(|r| u8::from(r[0] >= 2.0 && r[1] >= 2.0))
            .collect();
        let x = FeatureMatrix {
            feature_names: vec!["a".into(), "b".into()],
            rows,
        };
        let mut grid = BTreeMap::new();
        grid.insert("max_depth".to_string(), vec![json!(1), json!(2), json!(3)]);
        let candidate = ModelCandidate {
            name: "dtc".into(),
            family: "decision_tree".into(),
            params: Map::new(),
            search_param_grid: grid,
        };

        let outcome = GridSearch::new(3, Scoring::Accuracy, 42)
            .search(&candidate, &x, &y)
            .unwrap();
        assert_eq!(outcome.trials.len(), 3);
        assert!(outcome.trials[0].result.mean_score < 1.0);
        // depth 2 and 3 both fit perfectly; the first one wins
        assert_eq!(outcome.best_params["max_depth"], json!(2));
        assert_eq!(outcome.best_score, 1.0);
        assert_eq!(outcome.best_estimator.predict(&x).unwrap(), y);
    }
}
