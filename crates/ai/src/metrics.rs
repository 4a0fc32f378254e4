//! Metrics engine: pure, stateless scoring functions.
//!
//! Every function guards empty inputs and zero denominators and returns 0
//! instead of NaN. Mismatched lengths are scored over the common prefix.

use serde::{Deserialize, Serialize};

use crate::linalg::{euclidean_distance, mean};

/// Kind of a persisted metric observation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricKind {
    Accuracy,
    Precision,
    Recall,
    F1Score,
    Mse,
    Mae,
    R2Score,
    Loss,
}

/// Performance figures produced by a training run. Absent fields were not
/// computed by the algorithm.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1_score: Option<f64>,
    pub mse: Option<f64>,
    pub mae: Option<f64>,
    pub r2_score: Option<f64>,
    pub loss: Option<f64>,
}

impl TrainingMetrics {
    /// Present metrics in a stable order.
    pub fn observations(&self) -> Vec<(MetricKind, f64)> {
        [
            (MetricKind::Accuracy, self.accuracy),
            (MetricKind::Precision, self.precision),
            (MetricKind::Recall, self.recall),
            (MetricKind::F1Score, self.f1_score),
            (MetricKind::Mse, self.mse),
            (MetricKind::Mae, self.mae),
            (MetricKind::R2Score, self.r2_score),
            (MetricKind::Loss, self.loss),
        ]
        .into_iter()
        .filter_map(|(kind, value)| value.map(|v| (kind, v)))
        .collect()
    }
}

pub fn mean_squared_error(predicted: &[f64], actual: &[f64]) -> f64 {
    let n = predicted.len().min(actual.len());
    if n == 0 {
        return 0.0;
    }
    predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a) * (p - a))
        .sum::<f64>()
        / n as f64
}

pub fn mean_absolute_error(predicted: &[f64], actual: &[f64]) -> f64 {
    let n = predicted.len().min(actual.len());
    if n == 0 {
        return 0.0;
    }
    predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a).abs())
        .sum::<f64>()
        / n as f64
}

/// Coefficient of determination `1 - SSres/SStot`.
///
/// A constant target (SStot = 0) scores 1 when fitted exactly and 0 otherwise.
pub fn r2_score(predicted: &[f64], actual: &[f64]) -> f64 {
    let n = predicted.len().min(actual.len());
    if n == 0 {
        return 0.0;
    }
    let actual = &actual[..n];
    let actual_mean = mean(actual);
    let ss_tot: f64 = actual.iter().map(|a| (a - actual_mean).powi(2)).sum();
    let ss_res: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (a - p).powi(2))
        .sum();

    if ss_tot <= f64::EPSILON {
        return if ss_res <= f64::EPSILON { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Confusion counts of a binary classifier.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionCounts {
    /// Count outcomes; probabilities `> threshold` are predicted positive and
    /// actual values `> 0.5` are positive.
    pub fn from_probabilities(probabilities: &[f64], actual: &[f64], threshold: f64) -> Self {
        let mut counts = Self::default();
        for (p, a) in probabilities.iter().zip(actual) {
            match (*p > threshold, *a > 0.5) {
                (true, true) => counts.true_positives += 1,
                (true, false) => counts.false_positives += 1,
                (false, false) => counts.true_negatives += 1,
                (false, true) => counts.false_negatives += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Silhouette-style separation of a clustering, normalised into \[0, 1\].
///
/// Per point: `a` is the distance to its own centroid, `b` the distance to the
/// closest other centroid, and the point scores `(b - a) / max(a, b)` (0 when
/// both are 0 or there is a single centroid). The mean `m` is reported as
/// `(m + 1) / 2`.
pub fn separation_score(points: &[Vec<f64>], centroids: &[Vec<f64>], assignments: &[usize]) -> f64 {
    let n = points.len().min(assignments.len());
    if n == 0 || centroids.is_empty() {
        return 0.0;
    }

    let per_point: Vec<f64> = points
        .iter()
        .zip(assignments)
        .map(|(point, &own)| {
            let Some(own_centroid) = centroids.get(own) else {
                return 0.0;
            };
            let a = euclidean_distance(point, own_centroid);
            let b = centroids
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != own)
                .map(|(_, c)| euclidean_distance(point, c))
                .fold(f64::INFINITY, f64::min);
            if !b.is_finite() {
                return 0.0;
            }
            let denom = a.max(b);
            if denom == 0.0 { 0.0 } else { (b - a) / denom }
        })
        .collect();

    ((mean(&per_point) + 1.0) / 2.0).clamp(0.0, 1.0)
}
