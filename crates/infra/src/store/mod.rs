//! Persistence contract for models and their records.

mod memory;

use std::sync::Arc;

use forgeml_ai::ModelType;
use forgeml_core::{AggregateRoot, ExpectedVersion, ModelId, TenantId, TrainingJobId};
use forgeml_models::{Model, ModelMetric, ModelStatus, Prediction, TrainingJob};

pub use memory::InMemoryModelStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("tenant isolation violation")]
    TenantIsolation,
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },
    #[error("version conflict on model {model_id} (expected {expected}, actual {actual})")]
    VersionConflict {
        model_id: ModelId,
        expected: u64,
        actual: u64,
    },
    #[error("model {model_id} already has a running training job ({job_id})")]
    TrainingInProgress {
        model_id: ModelId,
        job_id: TrainingJobId,
    },
    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn already_exists(kind: &'static str, id: impl ToString) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.to_string(),
        }
    }
}

/// Criteria for [`ModelStore::list_models`]; empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelFilter {
    pub status: Option<ModelStatus>,
    pub model_type: Option<ModelType>,
    pub is_production: Option<bool>,
}

impl ModelFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: ModelStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_model_type(mut self, model_type: ModelType) -> Self {
        self.model_type = Some(model_type);
        self
    }

    pub fn production_only(mut self) -> Self {
        self.is_production = Some(true);
        self
    }

    pub fn matches(&self, model: &Model) -> bool {
        self.status.is_none_or(|s| model.status() == s)
            && self.model_type.is_none_or(|t| model.model_type() == t)
            && self.is_production.is_none_or(|p| model.is_production() == p)
    }
}

/// Tenant-isolated persistence for the model lifecycle.
///
/// Every read takes the caller's tenant; a record owned by another tenant is
/// reported as [`StoreError::TenantIsolation`].
pub trait ModelStore: Send + Sync {
    fn create_model(&self, model: Model) -> StoreResult<()>;

    fn get_model(&self, tenant_id: TenantId, model_id: ModelId) -> StoreResult<Model>;

    /// Replace a model if the stored version matches `expected`.
    fn update_model(&self, model: &Model, expected: ExpectedVersion) -> StoreResult<()>;

    /// Models of a tenant, oldest first.
    fn list_models(&self, tenant_id: TenantId, filter: &ModelFilter) -> StoreResult<Vec<Model>>;

    /// Insert a job; rejects a second RUNNING job for the same model.
    fn create_training_job(&self, job: TrainingJob) -> StoreResult<()>;

    fn update_training_job(&self, job: &TrainingJob) -> StoreResult<()>;

    fn get_training_job(&self, tenant_id: TenantId, job_id: TrainingJobId) -> StoreResult<TrainingJob>;

    /// Jobs of a model, in start order.
    fn list_training_jobs(&self, tenant_id: TenantId, model_id: ModelId) -> StoreResult<Vec<TrainingJob>>;

    fn create_prediction(&self, prediction: Prediction) -> StoreResult<()>;

    fn list_predictions(&self, tenant_id: TenantId, model_id: ModelId) -> StoreResult<Vec<Prediction>>;

    fn create_model_metric(&self, metric: ModelMetric) -> StoreResult<()>;

    fn list_model_metrics(&self, tenant_id: TenantId, model_id: ModelId) -> StoreResult<Vec<ModelMetric>>;
}

impl<S> ModelStore for Arc<S>
where
    S: ModelStore + ?Sized,
{
    fn create_model(&self, model: Model) -> StoreResult<()> {
        (**self).create_model(model)
    }

    fn get_model(&self, tenant_id: TenantId, model_id: ModelId) -> StoreResult<Model> {
        (**self).get_model(tenant_id, model_id)
    }

    fn update_model(&self, model: &Model, expected: ExpectedVersion) -> StoreResult<()> {
        (**self).update_model(model, expected)
    }

    fn list_models(&self, tenant_id: TenantId, filter: &ModelFilter) -> StoreResult<Vec<Model>> {
        (**self).list_models(tenant_id, filter)
    }

    fn create_training_job(&self, job: TrainingJob) -> StoreResult<()> {
        (**self).create_training_job(job)
    }

    fn update_training_job(&self, job: &TrainingJob) -> StoreResult<()> {
        (**self).update_training_job(job)
    }

    fn get_training_job(&self, tenant_id: TenantId, job_id: TrainingJobId) -> StoreResult<TrainingJob> {
        (**self).get_training_job(tenant_id, job_id)
    }

    fn list_training_jobs(&self, tenant_id: TenantId, model_id: ModelId) -> StoreResult<Vec<TrainingJob>> {
        (**self).list_training_jobs(tenant_id, model_id)
    }

    fn create_prediction(&self, prediction: Prediction) -> StoreResult<()> {
        (**self).create_prediction(prediction)
    }

    fn list_predictions(&self, tenant_id: TenantId, model_id: ModelId) -> StoreResult<Vec<Prediction>> {
        (**self).list_predictions(tenant_id, model_id)
    }

    fn create_model_metric(&self, metric: ModelMetric) -> StoreResult<()> {
        (**self).create_model_metric(metric)
    }

    fn list_model_metrics(&self, tenant_id: TenantId, model_id: ModelId) -> StoreResult<Vec<ModelMetric>> {
        (**self).list_model_metrics(tenant_id, model_id)
    }
}

/// Read-modify-write of a model under optimistic concurrency.
///
/// `mutate` returns whether it changed the model; unchanged models are not
/// written. A version conflict re-reads and re-applies up to `attempts` times.
pub fn update_model_with_retry<S, E, F>(
    store: &S,
    tenant_id: TenantId,
    model_id: ModelId,
    attempts: u32,
    mut mutate: F,
) -> Result<Model, E>
where
    S: ModelStore + ?Sized,
    E: From<StoreError>,
    F: FnMut(&mut Model) -> Result<bool, E>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let mut model = store.get_model(tenant_id, model_id)?;
        let expected = ExpectedVersion::Exact(model.version());
        if !mutate(&mut model)? {
            return Ok(model);
        }
        match store.update_model(&model, expected) {
            Ok(()) => return Ok(model),
            Err(StoreError::VersionConflict { actual, .. }) if attempt < attempts => {
                tracing::debug!(
                    tenant = %tenant_id,
                    model_id = %model_id,
                    attempt,
                    actual,
                    "model changed concurrently; retrying update"
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Run a store write, retrying [`StoreError::Storage`] failures up to
/// `attempts` times. Other errors are returned immediately.
pub fn write_with_retry<T, F>(attempts: u32, what: &'static str, mut write: F) -> StoreResult<T>
where
    F: FnMut() -> StoreResult<T>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match write() {
            Err(StoreError::Storage(reason)) if attempt < attempts => {
                tracing::debug!(attempt, record = what, %reason, "store write failed; retrying");
            }
            result => return result,
        }
    }
}
