//! Trained model artifacts and their versioned blob encoding.

use serde::{Deserialize, Serialize};

use crate::model_type::ModelType;
use crate::network::Network;
use crate::result::{AiError, AiResult};

/// Schema tag written into every encoded artifact blob.
pub const ARTIFACT_SCHEMA_VERSION: u16 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionArtifact {
    /// `[slope, intercept]`; longer equations carry one coefficient per
    /// feature followed by the intercept.
    pub equation: Vec<f64>,
}

impl RegressionArtifact {
    pub fn coefficients(&self) -> &[f64] {
        match self.equation.split_last() {
            Some((_, coefficients)) => coefficients,
            None => &[],
        }
    }

    pub fn intercept(&self) -> f64 {
        self.equation.last().copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationArtifact {
    pub network: Network,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesArtifact {
    pub window_size: usize,
    pub last_values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringArtifact {
    pub k: usize,
    pub centroids: Vec<Vec<f64>>,
    /// Cluster assignment of each training row.
    pub clusters: Vec<usize>,
}

/// Closed union of trained parameters, one variant per model type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Regression(RegressionArtifact),
    Classification(ClassificationArtifact),
    TimeSeries(TimeSeriesArtifact),
    Clustering(ClusteringArtifact),
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    schema_version: u16,
    artifact: &'a ModelArtifact,
}

#[derive(Deserialize)]
struct RawEnvelope {
    schema_version: u16,
    artifact: serde_json::Value,
}

impl ModelArtifact {
    pub fn model_type(&self) -> ModelType {
        match self {
            ModelArtifact::Regression(_) => ModelType::Regression,
            ModelArtifact::Classification(_) => ModelType::Classification,
            ModelArtifact::TimeSeries(_) => ModelType::TimeSeries,
            ModelArtifact::Clustering(_) => ModelType::Clustering,
        }
    }

    /// Encode as `{"schema_version": N, "artifact": {"kind": ..., ...}}`.
    pub fn encode(&self) -> AiResult<Vec<u8>> {
        serde_json::to_vec(&EnvelopeRef {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            artifact: self,
        })
        .map_err(|e| AiError::invalid_artifact(format!("encode failed: {e}")))
    }

    pub fn decode(bytes: &[u8]) -> AiResult<Self> {
        let raw: RawEnvelope = serde_json::from_slice(bytes)
            .map_err(|e| AiError::invalid_artifact(format!("malformed envelope: {e}")))?;
        if raw.schema_version != ARTIFACT_SCHEMA_VERSION {
            return Err(AiError::invalid_artifact(format!(
                "unsupported artifact schema version {} (expected {ARTIFACT_SCHEMA_VERSION})",
                raw.schema_version
            )));
        }
        let artifact: ModelArtifact = serde_json::from_value(raw.artifact)
            .map_err(|e| AiError::invalid_artifact(format!("malformed artifact: {e}")))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Shape checks that a schema-valid blob may still fail; predictors rely
    /// on them holding.
    pub fn validate(&self) -> AiResult<()> {
        match self {
            ModelArtifact::Regression(a) => {
                if a.equation.is_empty() || a.equation.iter().any(|v| !v.is_finite()) {
                    return Err(AiError::invalid_artifact(
                        "regression equation must be non-empty and finite",
                    ));
                }
                Ok(())
            }
            ModelArtifact::Classification(a) => {
                if !(0.0..=1.0).contains(&a.threshold) {
                    return Err(AiError::invalid_artifact("threshold must be in [0, 1]"));
                }
                a.network.validate()
            }
            ModelArtifact::TimeSeries(a) => {
                if a.window_size == 0 || a.last_values.is_empty() {
                    return Err(AiError::invalid_artifact(
                        "time-series artifact needs a window and history",
                    ));
                }
                Ok(())
            }
            ModelArtifact::Clustering(a) => {
                let width = a.centroids.first().map(Vec::len).unwrap_or(0);
                if a.k == 0 || a.centroids.len() != a.k || width == 0 {
                    return Err(AiError::invalid_artifact(format!(
                        "clustering artifact declares k={} with {} centroids",
                        a.k,
                        a.centroids.len()
                    )));
                }
                if a.centroids.iter().any(|c| c.len() != width) {
                    return Err(AiError::invalid_artifact("centroids have different widths"));
                }
                if a.clusters.iter().any(|c| *c >= a.k) {
                    return Err(AiError::invalid_artifact("cluster assignment out of range"));
                }
                Ok(())
            }
        }
    }
}

/// Error for an artifact handed to the wrong algorithm.
pub(crate) fn mismatch(expected: ModelType, artifact: &ModelArtifact) -> AiError {
    AiError::UnsupportedModelType(format!(
        "{} predictor cannot use a {} artifact",
        expected,
        artifact.model_type()
    ))
}
