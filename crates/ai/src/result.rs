use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result alias used by every algorithm in this crate.
pub type AiResult<T> = Result<T, AiError>;

/// Output of a single inference call.
///
/// This is *not* a stored prediction record; the prediction service wraps it
/// together with the model id, tenant and timestamp before persisting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inference {
    pub output: PredictionOutput,

    /// Confidence in \[0, 1\]. Enforced by [`Inference::new`].
    pub confidence: f64,
}

impl Inference {
    pub fn new(output: PredictionOutput, confidence: f64) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self { output, confidence }
    }
}

/// Type-specific prediction payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionOutput {
    /// One fitted value per input row.
    Regression { values: Vec<f64> },
    /// One label (0/1) and positive-class probability per input row.
    Classification {
        labels: Vec<u8>,
        probabilities: Vec<f64>,
    },
    /// Next-step forecast plus the window it was averaged over.
    Forecast { value: f64, window: Vec<f64> },
    /// Nearest cluster index and centroid distance per input row.
    Clusters {
        clusters: Vec<usize>,
        distances: Vec<f64>,
    },
}

impl PredictionOutput {
    /// First scalar of the output, handy for single-row callers.
    pub fn primary(&self) -> Option<f64> {
        match self {
            PredictionOutput::Regression { values } => values.first().copied(),
            PredictionOutput::Classification { probabilities, .. } => {
                probabilities.first().copied()
            }
            PredictionOutput::Forecast { value, .. } => Some(*value),
            PredictionOutput::Clusters { clusters, .. } => clusters.first().map(|c| *c as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AiError {
    #[error("invalid training data: {0}")]
    Validation(String),

    #[error("unsupported model type: {0}")]
    UnsupportedModelType(String),

    #[error("training failed: {0}")]
    TrainingFailed(String),

    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),
}

impl AiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn training_failed(msg: impl Into<String>) -> Self {
        Self::TrainingFailed(msg.into())
    }

    pub fn invalid_artifact(msg: impl Into<String>) -> Self {
        Self::InvalidArtifact(msg.into())
    }
}
