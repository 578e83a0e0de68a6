//! Numeric feature matrix and binary target, ready for the estimators.

use crate::data::batch::{DataBatch, as_f64, cell_key};
use booking_core::{PipelineError, Result};

/// Dense row-major feature matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// A new matrix with the given rows.
    pub fn select(&self, indices: &[usize]) -> FeatureMatrix {
        FeatureMatrix {
            feature_names: self.feature_names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Build a matrix from `batch` using exactly `feature_names`, in that order.
    ///
    /// Extra batch columns are ignored; a missing column is an error.
    pub fn from_batch(batch: &DataBatch, feature_names: &[String]) -> Result<Self> {
        let indices = feature_names
            .iter()
            .map(|name| {
                batch.column_index(name).ok_or_else(|| {
                    PipelineError::invalid_input(format!("missing feature column {name}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let rows = batch
            .rows
            .iter()
            .enumerate()
            .map(|(r, row)| {
                indices
                    .iter()
                    .zip(feature_names)
                    .map(|(&i, name)| {
                        as_f64(&row[i]).ok_or_else(|| {
                            PipelineError::invalid_input(format!(
                                "non-numeric value '{}' in feature {name} at row {r}",
                                cell_key(&row[i])
                            ))
                        })
                    })
                    .collect::<Result<Vec<f64>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            feature_names: feature_names.to_vec(),
            rows,
        })
    }
}

/// Split `batch` into every non-target column and the 0/1 target.
pub fn separate_features_and_target(
    batch: &DataBatch,
    target_column: &str,
) -> Result<(FeatureMatrix, Vec<u8>)> {
    let target_idx = batch.column_index(target_column).ok_or_else(|| {
        PipelineError::invalid_input(format!("target column {target_column} not found"))
    })?;

    let y = batch
        .rows
        .iter()
        .enumerate()
        .map(|(r, row)| match as_f64(&row[target_idx]) {
            Some(v) if v == 0.0 => Ok(0),
            Some(v) if v == 1.0 => Ok(1),
            _ => Err(PipelineError::invalid_input(format!(
                "target {target_column} at row {r} is '{}', expected 0 or 1",
                cell_key(&row[target_idx])
            ))),
        })
        .collect::<Result<Vec<u8>>>()?;

    let feature_names: Vec<String> = batch
        .columns
        .iter()
        .filter(|c| c.as_str() != target_column)
        .cloned()
        .collect();
    let x = FeatureMatrix::from_batch(batch, &feature_names)?;
    Ok((x, y))
}
