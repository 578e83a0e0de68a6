//! Binary classification metrics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Positive-class metrics for one model on one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Area under the ROC curve; `None` when only one class is present.
    pub auc: Option<f64>,
}

impl ClassificationMetrics {
    pub fn compute(y_true: &[u8], y_pred: &[u8], proba: &[f64]) -> Self {
        let cm = ConfusionMatrix::from_labels(y_true, y_pred);
        Self {
            accuracy: cm.accuracy(),
            precision: cm.precision(1),
            recall: cm.recall(1),
            f1_score: cm.f1(1),
            auc: roc_auc(y_true, proba),
        }
    }
}

/// Score used to rank hyperparameter combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scoring {
    Accuracy,
    Precision,
    Recall,
    #[serde(alias = "f1_score")]
    F1,
}

impl Scoring {
    pub fn score(&self, y_true: &[u8], y_pred: &[u8]) -> f64 {
        let cm = ConfusionMatrix::from_labels(y_true, y_pred);
        match self {
            Self::Accuracy => cm.accuracy(),
            Self::Precision => cm.precision(1),
            Self::Recall => cm.recall(1),
            Self::F1 => cm.f1(1),
        }
    }
}

/// 2x2 confusion matrix with class 1 as positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[u8], y_pred: &[u8]) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t, p) {
                (0, 0) => cm.tn += 1,
                (0, _) => cm.fp += 1,
                (_, 0) => cm.fn_ += 1,
                _ => cm.tp += 1,
            }
        }
        cm
    }

    /// `[[tn, fp], [fn, tp]]`, rows are true labels.
    pub fn to_matrix(&self) -> [[usize; 2]; 2] {
        [[self.tn, self.fp], [self.fn_, self.tp]]
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tn + self.tp, self.total())
    }

    /// Precision for `class`; zero when nothing was predicted as `class`.
    pub fn precision(&self, class: u8) -> f64 {
        if class == 1 {
            ratio(self.tp, self.tp + self.fp)
        } else {
            ratio(self.tn, self.tn + self.fn_)
        }
    }

    /// Recall for `class`; zero when `class` never occurs.
    pub fn recall(&self, class: u8) -> f64 {
        if class == 1 {
            ratio(self.tp, self.tp + self.fn_)
        } else {
            ratio(self.tn, self.tn + self.fp)
        }
    }

    pub fn f1(&self, class: u8) -> f64 {
        let (p, r) = (self.precision(class), self.recall(class));
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }

    pub fn support(&self, class: u8) -> usize {
        if class == 1 {
            self.tp + self.fn_
        } else {
            self.tn + self.fp
        }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// One row of a classification report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Support-weighted average of `metric` over both classes.
pub fn weighted_average(cm: &ConfusionMatrix, metric: impl Fn(&ConfusionMatrix, u8) -> f64) -> f64 {
    let total = cm.total();
    if total == 0 {
        return 0.0;
    }
    [0u8, 1]
        .iter()
        .map(|&c| metric(cm, c) * cm.support(c) as f64)
        .sum::<f64>()
        / total as f64
}

/// Per-class precision/recall/F1/support plus `macro avg` and `weighted avg`.
pub fn classification_report(cm: &ConfusionMatrix) -> BTreeMap<String, ClassReport> {
    let mut report = BTreeMap::new();
    for class in [0u8, 1] {
        report.insert(
            class.to_string(),
            ClassReport {
                precision: cm.precision(class),
                recall: cm.recall(class),
                f1_score: cm.f1(class),
                support: cm.support(class),
            },
        );
    }
    let mean = |f: fn(&ConfusionMatrix, u8) -> f64| (f(cm, 0) + f(cm, 1)) / 2.0;
    report.insert(
        "macro avg".to_string(),
        ClassReport {
            precision: mean(ConfusionMatrix::precision),
            recall: mean(ConfusionMatrix::recall),
            f1_score: mean(ConfusionMatrix::f1),
            support: cm.total(),
        },
    );
    report.insert(
        "weighted avg".to_string(),
        ClassReport {
            precision: weighted_average(cm, ConfusionMatrix::precision),
            recall: weighted_average(cm, ConfusionMatrix::recall),
            f1_score: weighted_average(cm, ConfusionMatrix::f1),
            support: cm.total(),
        },
    );
    report
}

/// Rank-based ROC AUC with tied scores sharing their average rank.
///
/// Returns `None` unless both classes are present.
pub fn roc_auc(y_true: &[u8], scores: &[f64]) -> Option<f64> {
    let n_pos = y_true.iter().filter(|&&y| y == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 || scores.len() != y_true.len() {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut pos_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based
        let avg_rank = (start + end) as f64 / 2.0 + 1.0;
        for &i in &order[start..=end] {
            if y_true[i] == 1 {
                pos_rank_sum += avg_rank;
            }
        }
        start = end + 1;
    }

    let (p, n) = (n_pos as f64, n_neg as f64);
    Some((pos_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}
