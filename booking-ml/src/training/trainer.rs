//! Model trainer stage: reuse cached best parameters or grid-search every candidate.

use crate::algorithms::{ClassicalAlgorithm, Estimator};
use crate::data::batch::DataBatch;
use crate::data::features::{FeatureMatrix, separate_features_and_target};
use crate::data::split::shuffled_indices;
use crate::training::metrics::ClassificationMetrics;
use crate::training::model::BookingModel;
use crate::training::model_config::ModelConfig;
use crate::training::sweep::GridSearch;
use booking_core::config::TrainingConfig;
use booking_core::layout::TrainerPaths;
use booking_core::persistence::{atomic_write_json, load_json};
use booking_core::{DataSplitArtifact, ModelTrainerArtifact, PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Contents of `params.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestParams {
    /// Candidate name in `model.yaml`.
    pub name: String,
    pub params: Map<String, Value>,
}

/// Contents of `metrics.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedMetrics {
    pub name: String,
    pub metrics: ClassificationMetrics,
}

/// A fitted candidate with its test-split metrics.
#[derive(Debug, Clone)]
pub struct ScoredCandidate<T> {
    pub name: String,
    pub metrics: ClassificationMetrics,
    pub model: T,
}

/// A tuned estimator and the full parameter set it was built from.
#[derive(Debug, Clone)]
pub struct TunedModel {
    pub params: Map<String, Value>,
    pub estimator: ClassicalAlgorithm,
}

/// Keep the candidate with the highest positive-class recall.
///
/// The incumbent starts at recall 0 and is only replaced by a strictly greater
/// recall, so the earliest candidate wins ties.
pub fn select_best<T>(
    candidates: impl IntoIterator<Item = ScoredCandidate<T>>,
) -> Result<ScoredCandidate<T>> {
    let mut best: Option<ScoredCandidate<T>> = None;
    let mut best_recall = 0.0;
    for candidate in candidates {
        if candidate.metrics.recall > best_recall {
            best_recall = candidate.metrics.recall;
            best = Some(candidate);
        }
    }
    best.ok_or_else(|| PipelineError::training("no suitable model found"))
}

pub struct ModelTrainer<'a> {
    model_config: &'a ModelConfig,
    config: TrainingConfig,
    target_column: String,
    paths: TrainerPaths,
}

impl<'a> ModelTrainer<'a> {
    pub fn new(
        model_config: &'a ModelConfig,
        config: TrainingConfig,
        target_column: impl Into<String>,
        paths: TrainerPaths,
    ) -> Self {
        Self {
            model_config,
            config,
            target_column: target_column.into(),
            paths,
        }
    }

    /// Positive-class metrics of a fitted estimator on `x`.
    pub fn metrics_calculator(
        estimator: &ClassicalAlgorithm,
        x: &FeatureMatrix,
        y: &[u8],
    ) -> Result<ClassificationMetrics> {
        let proba = estimator.predict_proba(x)?;
        let pred: Vec<u8> = estimator.predict(x)?;
        Ok(ClassificationMetrics::compute(y, &pred, &proba))
    }

    /// Seeded sample of the training rows used for the grid search.
    pub fn tuning_subset(&self, x: &FeatureMatrix, y: &[u8]) -> (FeatureMatrix, Vec<u8>) {
        let n = x.n_rows();
        let wanted = (n as f64 * self.config.tuning_fraction).ceil() as usize;
        let size = wanted.max(self.model_config.grid_search.cv).min(n);
        let indices: Vec<usize> = shuffled_indices(n, self.config.seed)
            .into_iter()
            .take(size)
            .collect();
        let labels = indices.iter().map(|&i| y[i]).collect();
        (x.select(&indices), labels)
    }

    /// Grid-search every candidate on the tuning subset and keep the best by test recall.
    pub fn tune_hyperparameters(
        &self,
        x_train: &FeatureMatrix,
        y_train: &[u8],
        x_test: &FeatureMatrix,
        y_test: &[u8],
    ) -> Result<ScoredCandidate<TunedModel>> {
        let (x_tune, y_tune) = self.tuning_subset(x_train, y_train);
        let search = GridSearch::new(
            self.model_config.grid_search.cv,
            self.model_config.grid_search.scoring,
            self.config.seed,
        );
        tracing::info!(
            candidates = self.model_config.model_selection.len(),
            tuning_rows = x_tune.n_rows(),
            cv = search.cv,
            scoring = ?search.scoring,
            "starting hyperparameter search"
        );

        let mut scored = Vec::with_capacity(self.model_config.model_selection.len());
        for candidate in &self.model_config.model_selection {
            let outcome = search.search(candidate, &x_tune, &y_tune)?;
            let metrics = Self::metrics_calculator(&outcome.best_estimator, x_test, y_test)?;
            tracing::info!(
                model = %candidate.name,
                accuracy = metrics.accuracy,
                precision = metrics.precision,
                recall = metrics.recall,
                f1_score = metrics.f1_score,
                "tuned candidate scored on test split"
            );
            scored.push(ScoredCandidate {
                name: candidate.name.clone(),
                metrics,
                model: TunedModel {
                    params: candidate.merged_params(&outcome.best_params),
                    estimator: outcome.best_estimator,
                },
            });
        }
        select_best(scored)
    }

    /// Refit the cached candidate on the full training split.
    fn train_from_cached(
        &self,
        cached: &BestParams,
        x_train: &FeatureMatrix,
        y_train: &[u8],
    ) -> Result<TunedModel> {
        let candidate = self.model_config.candidate(&cached.name).ok_or_else(|| {
            PipelineError::training(format!(
                "cached model '{}' is not a configured candidate",
                cached.name
            ))
        })?;
        let params = candidate.merged_params(&cached.params);
        let mut estimator = ClassicalAlgorithm::from_params(&candidate.family, &params)?;
        estimator.fit(x_train, y_train)?;
        Ok(TunedModel { params, estimator })
    }

    pub fn initiate_model_trainer(
        &self,
        split: &DataSplitArtifact,
    ) -> Result<ModelTrainerArtifact> {
        let train = DataBatch::read_csv(&split.train_file_path)?;
        let test = DataBatch::read_csv(&split.test_file_path)?;
        let (x_train, y_train) = separate_features_and_target(&train, &self.target_column)?;
        let (_, y_test) = separate_features_and_target(&test, &self.target_column)?;
        // score the test split in training column order
        let x_test = FeatureMatrix::from_batch(&test, &x_train.feature_names)?;

        let cached: Option<BestParams> = load_json(&self.paths.best_params_file)?;
        let (name, tuned, metrics) = match cached {
            Some(cached) => {
                tracing::info!(
                    model = %cached.name,
                    path = %self.paths.best_params_file.display(),
                    "using cached best parameters"
                );
                let tuned = self.train_from_cached(&cached, &x_train, &y_train)?;
                let metrics = Self::metrics_calculator(&tuned.estimator, &x_test, &y_test)?;
                (cached.name, tuned, metrics)
            }
            None => {
                let best = self.tune_hyperparameters(&x_train, &y_train, &x_test, &y_test)?;
                atomic_write_json(
                    &self.paths.best_params_file,
                    &BestParams {
                        name: best.name.clone(),
                        params: best.model.params.clone(),
                    },
                )?;
                (best.name, best.model, best.metrics)
            }
        };

        atomic_write_json(
            &self.paths.metrics_file,
            &TrainedMetrics {
                name: name.clone(),
                metrics: metrics.clone(),
            },
        )?;
        tracing::info!(
            model = %name,
            accuracy = metrics.accuracy,
            recall = metrics.recall,
            "best model selected"
        );

        let model = BookingModel::new(
            name,
            self.target_column.clone(),
            x_train.feature_names.clone(),
            tuned.params,
            tuned.estimator,
        );
        model.save(&self.paths.model_file)?;

        Ok(ModelTrainerArtifact {
            model_file_path: self.paths.model_file.clone(),
            best_params_file_path: self.paths.best_params_file.clone(),
            metrics_file_path: self.paths.metrics_file.clone(),
        })
    }
}
