//! Prediction service: artifact lookup, inference dispatch and usage
//! accounting.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use forgeml_ai::{ModelArtifact, ModelType, PredictionOutput, algorithm_for};
use forgeml_core::{AggregateRoot, ModelId, PredictionId, TenantId};
use forgeml_models::{Model, Prediction};

use crate::cache::ArtifactCache;
use crate::error::{PipelineError, PipelineResult, model_lookup};
use crate::store::{ModelStore, update_model_with_retry};

/// Input of one prediction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub input: Vec<Vec<f64>>,
    /// Expected model type; a mismatch is rejected. Defaults to the model's.
    #[serde(default)]
    pub prediction_type: Option<ModelType>,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
}

impl PredictionRequest {
    pub fn new(input: Vec<Vec<f64>>) -> Self {
        Self {
            input,
            prediction_type: None,
            context: None,
        }
    }

    pub fn with_prediction_type(mut self, prediction_type: ModelType) -> Self {
        self.prediction_type = Some(prediction_type);
        self
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    fn validate(&self) -> PipelineResult<()> {
        if self.input.is_empty() {
            return Err(PipelineError::validation("prediction input has no rows"));
        }
        for (i, row) in self.input.iter().enumerate() {
            if row.is_empty() {
                return Err(PipelineError::validation(format!("input row {i} is empty")));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(PipelineError::validation(format!(
                    "input row {i} contains a non-finite value"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction_id: PredictionId,
    pub prediction: PredictionOutput,
    /// Within `[0, 1]`.
    pub confidence: f64,
    pub model_used: ModelId,
    pub timestamp: DateTime<Utc>,
}

/// Serves predictions from trained models.
#[derive(Debug, Clone)]
pub struct PredictionService<S> {
    store: S,
    cache: Arc<ArtifactCache>,
    update_retries: u32,
}

impl<S: ModelStore> PredictionService<S> {
    pub fn new(store: S, cache: Arc<ArtifactCache>, update_retries: u32) -> Self {
        Self {
            store,
            cache,
            update_retries,
        }
    }

    pub fn cache(&self) -> &Arc<ArtifactCache> {
        &self.cache
    }

    /// Run inference and record it.
    ///
    /// Failed predictions leave no record and do not count as usage.
    pub fn predict(
        &self,
        tenant_id: TenantId,
        model_id: ModelId,
        request: PredictionRequest,
    ) -> PipelineResult<PredictionResult> {
        let model = self
            .store
            .get_model(tenant_id, model_id)
            .map_err(|e| model_lookup(e, model_id))?;

        if let Some(expected) = request.prediction_type {
            if expected != model.model_type() {
                return Err(PipelineError::validation(format!(
                    "prediction type {expected} does not match {} model {model_id}",
                    model.model_type()
                )));
            }
        }
        if !model.is_servable() {
            return Err(PipelineError::ModelNotTrained(model_id));
        }
        request.validate()?;

        let artifact = self.artifact_for(&model)?;
        let inference = algorithm_for(model.model_type()).predict(
            &artifact,
            &request.input,
            model.accuracy(),
        )?;

        let timestamp = Utc::now();
        update_model_with_retry::<_, PipelineError, _>(
            &self.store,
            tenant_id,
            model_id,
            self.update_retries,
            |m| {
                m.record_usage(timestamp);
                Ok(true)
            },
        )?;

        let prediction = Prediction {
            id: PredictionId::new(),
            tenant_id,
            model_id,
            prediction_type: model.model_type(),
            input_data: request.input,
            output_data: inference.output.clone(),
            confidence: inference.confidence,
            context: request.context,
            timestamp,
        };
        let prediction_id = prediction.id;
        self.store.create_prediction(prediction)?;

        debug!(
            tenant = %tenant_id,
            model_id = %model_id,
            prediction_id = %prediction_id,
            confidence = inference.confidence,
            "prediction served"
        );

        Ok(PredictionResult {
            prediction_id,
            prediction: inference.output,
            confidence: inference.confidence,
            model_used: model_id,
            timestamp,
        })
    }

    fn artifact_for(&self, model: &Model) -> PipelineResult<Arc<ModelArtifact>> {
        let key = (model.tenant_id(), *model.id(), model.artifact_revision());
        if let Some(artifact) = self.cache.get(&key) {
            return Ok(artifact);
        }
        let blob = model
            .artifact()
            .ok_or(PipelineError::ModelNotTrained(key.1))?;
        let artifact = Arc::new(ModelArtifact::decode(blob)?);
        self.cache.insert(key, artifact.clone());
        Ok(artifact)
    }
}
