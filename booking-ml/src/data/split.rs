//! Seeded train/test/validation split.

use crate::data::batch::DataBatch;
use booking_core::config::SplitConfig;
use booking_core::layout::SplitPaths;
use booking_core::{DataPreprocessingArtifact, DataSplitArtifact, PipelineError, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// `0..n` in a seeded random order.
pub fn shuffled_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices
}

/// `ceil(n * ratio)` without float noise pushing exact products up by one.
fn ceil_share(n: usize, ratio: f64) -> usize {
    (((n as f64) * ratio - 1e-9).ceil().max(0.0) as usize).min(n)
}

/// Sizes of the train, test and validation sets for `n` rows.
pub fn split_sizes(n: usize, test_ratio: f64, validation_ratio: f64) -> (usize, usize, usize) {
    let holdout = ceil_share(n, test_ratio);
    let validation = ceil_share(holdout, validation_ratio);
    (n - holdout, holdout - validation, validation)
}

/// Shuffle `batch` and cut it into train, test and validation sets.
pub fn split_into_train_test_val(
    batch: &DataBatch,
    config: &SplitConfig,
) -> Result<(DataBatch, DataBatch, DataBatch)> {
    let n = batch.row_count();
    let (train, test, validation) = split_sizes(n, config.test_ratio, config.validation_ratio);
    if train == 0 || test == 0 || validation == 0 {
        return Err(PipelineError::split(format!(
            "{n} rows are too few to split into train ({train}), test ({test}) and validation ({validation})"
        )));
    }

    let indices = shuffled_indices(n, config.seed);
    let (train_idx, rest) = indices.split_at(train);
    let (test_idx, validation_idx) = rest.split_at(test);
    Ok((
        batch.select_rows(train_idx),
        batch.select_rows(test_idx),
        batch.select_rows(validation_idx),
    ))
}

pub struct DataSplit {
    config: SplitConfig,
    paths: SplitPaths,
}

impl DataSplit {
    pub fn new(config: SplitConfig, paths: SplitPaths) -> Self {
        Self { config, paths }
    }

    pub fn initiate_data_split(
        &self,
        preprocessing: &DataPreprocessingArtifact,
    ) -> Result<DataSplitArtifact> {
        let data = DataBatch::read_csv(&preprocessing.processed_data_file_path)?;
        let (train, test, validation) = split_into_train_test_val(&data, &self.config)?;
        tracing::info!(
            train = train.row_count(),
            test = test.row_count(),
            validation = validation.row_count(),
            "split dataset"
        );

        train.write_csv(&self.paths.train_file)?;
        test.write_csv(&self.paths.test_file)?;
        validation.write_csv(&self.paths.validation_file)?;

        Ok(DataSplitArtifact {
            train_file_path: self.paths.train_file.clone(),
            test_file_path: self.paths.test_file.clone(),
            validation_file_path: self.paths.validation_file.clone(),
        })
    }
}
