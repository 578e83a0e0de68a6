//! Known noisy values in the booking data and how each is cleaned.

use crate::data::batch::{DataBatch, as_f64, number};
use serde::{Deserialize, Serialize};

/// Condition that marks a cell as noisy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoisePredicate {
    LessThan(f64),
    Equals(f64),
}

impl NoisePredicate {
    pub fn matches(&self, x: f64) -> bool {
        match self {
            Self::LessThan(bound) => x < *bound,
            Self::Equals(target) => x == *target,
        }
    }
}

/// What to do with a noisy cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseAction {
    /// Replace with the median of the column's non-noisy values.
    ReplaceWithMedian,
    /// Remove the whole row.
    DropRow,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseRule {
    pub column: &'static str,
    pub predicate: NoisePredicate,
    pub action: NoiseAction,
}

/// Rules applied when their column is listed in `noisy_values_columns`.
pub const NOISE_RULES: [NoiseRule; 4] = [
    NoiseRule {
        column: "adr",
        predicate: NoisePredicate::LessThan(0.0),
        action: NoiseAction::ReplaceWithMedian,
    },
    NoiseRule {
        column: "adults",
        predicate: NoisePredicate::Equals(0.0),
        action: NoiseAction::DropRow,
    },
    NoiseRule {
        column: "children",
        predicate: NoisePredicate::Equals(10.0),
        action: NoiseAction::DropRow,
    },
    NoiseRule {
        column: "babies",
        predicate: NoisePredicate::Equals(10.0),
        action: NoiseAction::DropRow,
    },
];

/// Counts of what noise handling changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseSummary {
    pub replaced_values: usize,
    pub dropped_rows: usize,
}

/// Clean the noisy values of every listed column that has a rule.
///
/// Listed columns without a rule, and rules whose column is absent from the
/// batch, are ignored. Running this on already-clean data changes nothing.
pub fn handle_noisy_data(batch: &mut DataBatch, noisy_columns: &[String]) -> NoiseSummary {
    let mut summary = NoiseSummary::default();
    for name in noisy_columns {
        if !NOISE_RULES.iter().any(|r| r.column == name) {
            tracing::debug!(column = %name, "no noise rule for column");
        }
    }

    for rule in NOISE_RULES
        .iter()
        .filter(|r| noisy_columns.iter().any(|c| c == r.column))
    {
        let Some(idx) = batch.column_index(rule.column) else {
            tracing::debug!(column = rule.column, "noisy column not present, skipping");
            continue;
        };
        let is_noisy = |row: &[serde_json::Value]| {
            as_f64(&row[idx]).is_some_and(|x| rule.predicate.matches(x))
        };
        let noisy = batch.rows.iter().filter(|row| is_noisy(row)).count();
        if noisy == 0 {
            continue;
        }
        tracing::info!(column = rule.column, noisy, "found noisy values");

        match rule.action {
            NoiseAction::ReplaceWithMedian => {
                let clean: Vec<f64> = batch
                    .rows
                    .iter()
                    .filter(|row| !is_noisy(row))
                    .filter_map(|row| as_f64(&row[idx]))
                    .collect();
                let Some(m) = median(clean) else {
                    tracing::warn!(column = rule.column, "no clean values to take a median from");
                    continue;
                };
                for row in &mut batch.rows {
                    if is_noisy(row) {
                        row[idx] = number(m);
                    }
                }
                summary.replaced_values += noisy;
                tracing::info!(column = rule.column, median = m, "replaced noisy values");
            }
            NoiseAction::DropRow => {
                let removed = batch.retain_rows(|row| !is_noisy(row));
                summary.dropped_rows += removed;
                tracing::info!(column = rule.column, removed, "removed noisy rows");
            }
        }
    }
    summary
}

/// Median with the two middle values averaged for even lengths.
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
