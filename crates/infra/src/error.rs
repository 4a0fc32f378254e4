//! Caller-facing error model of the pipeline.

use thiserror::Error;

use forgeml_ai::AiError;
use forgeml_core::{DomainError, ModelId, TrainingJobId};

use crate::store::StoreError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("model not found: {0}")]
    ModelNotFound(ModelId),

    #[error("model {0} has no trained artifact")]
    ModelNotTrained(ModelId),

    #[error("unsupported model type: {0}")]
    UnsupportedModelType(String),

    /// A training run ended in failure; the job carries the same message.
    #[error("training job {job_id} failed: {message}")]
    TrainingFailure {
        job_id: TrainingJobId,
        message: String,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("model {model_id} is already training (job {job_id})")]
    TrainingInProgress {
        model_id: ModelId,
        job_id: TrainingJobId,
    },

    #[error("store error: {0}")]
    Store(StoreError),
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TrainingInProgress { model_id, job_id } => {
                PipelineError::TrainingInProgress { model_id, job_id }
            }
            other => PipelineError::Store(other),
        }
    }
}

/// Map a failed model read. Another tenant's model is reported as missing.
pub(crate) fn model_lookup(err: StoreError, model_id: ModelId) -> PipelineError {
    match err {
        StoreError::NotFound { .. } | StoreError::TenantIsolation => {
            PipelineError::ModelNotFound(model_id)
        }
        other => PipelineError::Store(other),
    }
}

impl From<DomainError> for PipelineError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                PipelineError::Validation(msg)
            }
            DomainError::InvalidState(msg) => PipelineError::InvalidState(msg),
            other => PipelineError::InvalidState(other.to_string()),
        }
    }
}

/// Synchronous mapping of numeric errors (validation, dispatch, decoding).
/// Errors raised inside a training run are reported as
/// [`PipelineError::TrainingFailure`] instead.
impl From<AiError> for PipelineError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::Validation(msg) => PipelineError::Validation(msg),
            AiError::UnsupportedModelType(msg) => PipelineError::UnsupportedModelType(msg),
            other => PipelineError::InvalidState(other.to_string()),
        }
    }
}
