//! k-means with deterministic farthest-point seeding.

use crate::algorithm::{Algorithm, TrainedModel};
use crate::artifact::{ClusteringArtifact, ModelArtifact, mismatch};
use crate::config::{AlgorithmParams, TrainingConfig};
use crate::data::TrainingData;
use crate::linalg::{nearest, squared_distance};
use crate::metrics::{TrainingMetrics, separation_score};
use crate::model_type::ModelType;
use crate::result::{AiError, AiResult, Inference, PredictionOutput};

/// Fixed confidence of a nearest-centroid assignment.
const ASSIGNMENT_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Default, Copy, Clone)]
pub struct ClusteringAlgorithm;

/// Result of a k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub centroids: Vec<Vec<f64>>,
    pub assignments: Vec<usize>,
    pub iterations: usize,
}

/// Seed with the first row, then repeatedly with the row farthest from every
/// centroid chosen so far.
fn farthest_point_seeds(points: &[Vec<f64>], k: usize) -> Vec<Vec<f64>> {
    let mut centroids = vec![points[0].clone()];
    let mut min_dist: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &points[0]))
        .collect();

    while centroids.len() < k {
        let mut best = 0;
        for (i, d) in min_dist.iter().enumerate() {
            if *d > min_dist[best] {
                best = i;
            }
        }
        let chosen = points[best].clone();
        for (d, p) in min_dist.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &chosen));
        }
        centroids.push(chosen);
    }
    centroids
}

fn assign(points: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    points
        .iter()
        .map(|p| nearest(p, centroids).map(|(i, _)| i).unwrap_or(0))
        .collect()
}

/// Mean of each cluster's members; an empty cluster keeps its centroid.
fn recompute(points: &[Vec<f64>], assignments: &[usize], previous: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let dims = previous.first().map(Vec::len).unwrap_or(0);
    let mut sums = vec![vec![0.0; dims]; previous.len()];
    let mut counts = vec![0usize; previous.len()];
    for (p, &c) in points.iter().zip(assignments) {
        counts[c] += 1;
        for (s, v) in sums[c].iter_mut().zip(p) {
            *s += v;
        }
    }
    sums.into_iter()
        .zip(counts)
        .zip(previous)
        .map(|((sum, count), prev)| {
            if count == 0 {
                prev.clone()
            } else {
                sum.into_iter().map(|s| s / count as f64).collect()
            }
        })
        .collect()
}

/// Lloyd iterations until assignments stop changing or `max_iterations`.
///
/// The returned assignments are always nearest-centroid with respect to the
/// returned centroids.
pub fn k_means(points: &[Vec<f64>], k: usize, max_iterations: usize) -> AiResult<KMeansFit> {
    if points.is_empty() {
        return Err(AiError::validation("cannot cluster an empty feature matrix"));
    }
    if k == 0 || k > points.len() {
        return Err(AiError::validation(format!(
            "k must be in 1..={}, got {k}",
            points.len()
        )));
    }

    let mut centroids = farthest_point_seeds(points, k);
    let mut assignments = assign(points, &centroids);
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;
        let updated = recompute(points, &assignments, &centroids);
        let next = assign(points, &updated);
        centroids = updated;
        if next == assignments {
            break;
        }
        assignments = next;
    }

    Ok(KMeansFit {
        centroids,
        assignments,
        iterations,
    })
}

impl Algorithm for ClusteringAlgorithm {
    fn model_type(&self) -> ModelType {
        ModelType::Clustering
    }

    fn train(&self, data: &TrainingData, config: &TrainingConfig) -> AiResult<TrainedModel> {
        let AlgorithmParams::Clustering { k, max_iterations } = config.params else {
            return Err(AiError::validation("clustering training requires clustering params"));
        };
        data.validate_for(ModelType::Clustering, 0, config)?;

        let fit = k_means(&data.features, k, max_iterations)?;
        let score = separation_score(&data.features, &fit.centroids, &fit.assignments);

        tracing::debug!(k, iterations = fit.iterations, score, "k-means converged");

        Ok(TrainedModel {
            artifact: ModelArtifact::Clustering(ClusteringArtifact {
                k,
                centroids: fit.centroids,
                clusters: fit.assignments,
            }),
            metrics: TrainingMetrics {
                accuracy: Some(score),
                ..Default::default()
            },
        })
    }

    fn predict(
        &self,
        artifact: &ModelArtifact,
        input: &[Vec<f64>],
        _accuracy: Option<f64>,
    ) -> AiResult<Inference> {
        let ModelArtifact::Clustering(artifact) = artifact else {
            return Err(mismatch(ModelType::Clustering, artifact));
        };
        let dims = artifact
            .centroids
            .first()
            .map(Vec::len)
            .ok_or_else(|| AiError::invalid_artifact("clustering artifact has no centroids"))?;

        let mut clusters = Vec::with_capacity(input.len());
        let mut distances = Vec::with_capacity(input.len());
        for (i, row) in input.iter().enumerate() {
            if row.len() != dims {
                return Err(AiError::validation(format!(
                    "input row {i} has {} features, centroids have {dims}",
                    row.len()
                )));
            }
            if let Some((cluster, distance)) = nearest(row, &artifact.centroids) {
                clusters.push(cluster);
                distances.push(distance);
            }
        }

        Ok(Inference::new(
            PredictionOutput::Clusters {
                clusters,
                distances,
            },
            ASSIGNMENT_CONFIDENCE,
        ))
    }
}
