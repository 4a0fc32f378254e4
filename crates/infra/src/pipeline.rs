//! Caller-facing facade over the model lifecycle.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use forgeml_ai::{TrainingConfig, TrainingData};
use forgeml_core::{AggregateRoot, ModelId, TenantId, TrainingJobId};
use forgeml_models::{Model, ModelMetric, NewModel, Prediction, TrainingJob};

use crate::cache::ArtifactCache;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, model_lookup};
use crate::prediction::{PredictionRequest, PredictionResult, PredictionService};
use crate::store::{InMemoryModelStore, ModelFilter, ModelStore, update_model_with_retry};
use crate::training::{TrainingHandle, TrainingOrchestrator};

/// Model lifecycle operations: create, train, deploy, predict and the
/// read side.
#[derive(Debug, Clone)]
pub struct MlPipeline<S> {
    store: S,
    config: PipelineConfig,
    training: TrainingOrchestrator<S>,
    predictions: PredictionService<S>,
}

impl MlPipeline<Arc<InMemoryModelStore>> {
    /// Pipeline over a fresh in-memory store.
    pub fn in_memory(config: PipelineConfig) -> Self {
        Self::new(InMemoryModelStore::arc(), config)
    }
}

impl<S> MlPipeline<S>
where
    S: ModelStore + Clone + 'static,
{
    /// Pipeline with an artifact cache sized from `config`.
    pub fn new(store: S, config: PipelineConfig) -> Self {
        let cache = Arc::new(ArtifactCache::new(
            config.artifact_cache_capacity,
            config.artifact_cache_ttl,
        ));
        Self::with_cache(store, config, cache)
    }

    pub fn with_cache(store: S, config: PipelineConfig, cache: Arc<ArtifactCache>) -> Self {
        let training = TrainingOrchestrator::new(store.clone(), config.clone()).with_cache(cache.clone());
        let predictions = PredictionService::new(store.clone(), cache, config.update_retries);
        Self {
            store,
            config,
            training,
            predictions,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn artifact_cache(&self) -> &Arc<ArtifactCache> {
        self.predictions.cache()
    }

    pub fn create_model(&self, new: NewModel) -> PipelineResult<Model> {
        let model = Model::create(ModelId::new(), new, Utc::now())?;
        self.store.create_model(model.clone())?;
        info!(
            tenant = %model.tenant_id(),
            model_id = %model.id(),
            model_type = %model.model_type(),
            name = model.name(),
            "model created"
        );
        Ok(model)
    }

    /// Start training in the background; see [`TrainingOrchestrator::train`].
    pub fn train_model(
        &self,
        tenant_id: TenantId,
        model_id: ModelId,
        data: TrainingData,
        config: Option<TrainingConfig>,
    ) -> PipelineResult<TrainingHandle> {
        self.training.train(tenant_id, model_id, data, config)
    }

    /// Promote a `TRAINED` model to production.
    pub fn deploy_model(&self, tenant_id: TenantId, model_id: ModelId) -> PipelineResult<Model> {
        self.get_model(tenant_id, model_id)?;
        let now = Utc::now();
        let model = update_model_with_retry::<_, PipelineError, _>(
            &self.store,
            tenant_id,
            model_id,
            self.config.update_retries,
            |m| {
                m.deploy(now)?;
                Ok(true)
            },
        )?;
        info!(tenant = %tenant_id, model_id = %model_id, "model deployed");
        Ok(model)
    }

    pub fn predict(
        &self,
        tenant_id: TenantId,
        model_id: ModelId,
        request: PredictionRequest,
    ) -> PipelineResult<PredictionResult> {
        self.predictions.predict(tenant_id, model_id, request)
    }

    pub fn get_model(&self, tenant_id: TenantId, model_id: ModelId) -> PipelineResult<Model> {
        self.store
            .get_model(tenant_id, model_id)
            .map_err(|e| model_lookup(e, model_id))
    }

    /// Metric history of a model, oldest first.
    pub fn get_model_metrics(&self, tenant_id: TenantId, model_id: ModelId) -> PipelineResult<Vec<ModelMetric>> {
        self.store
            .list_model_metrics(tenant_id, model_id)
            .map_err(|e| model_lookup(e, model_id))
    }

    pub fn list_models(&self, tenant_id: TenantId, filter: &ModelFilter) -> PipelineResult<Vec<Model>> {
        Ok(self.store.list_models(tenant_id, filter)?)
    }

    pub fn get_training_job(&self, tenant_id: TenantId, job_id: TrainingJobId) -> PipelineResult<TrainingJob> {
        Ok(self.store.get_training_job(tenant_id, job_id)?)
    }

    pub fn list_training_jobs(&self, tenant_id: TenantId, model_id: ModelId) -> PipelineResult<Vec<TrainingJob>> {
        self.store
            .list_training_jobs(tenant_id, model_id)
            .map_err(|e| model_lookup(e, model_id))
    }

    pub fn list_predictions(&self, tenant_id: TenantId, model_id: ModelId) -> PipelineResult<Vec<Prediction>> {
        self.store
            .list_predictions(tenant_id, model_id)
            .map_err(|e| model_lookup(e, model_id))
    }
}
