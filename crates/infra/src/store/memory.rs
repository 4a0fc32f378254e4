use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use forgeml_core::{AggregateRoot, ExpectedVersion, ModelId, TenantId, TrainingJobId};
use forgeml_models::{Model, ModelMetric, Prediction, TrainingJob, TrainingJobStatus};

use super::{ModelFilter, ModelStore, StoreError, StoreResult};

/// In-memory model store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryModelStore {
    models: RwLock<HashMap<ModelId, Model>>,
    jobs: RwLock<HashMap<TrainingJobId, TrainingJob>>,
    predictions: RwLock<Vec<Prediction>>,
    metrics: RwLock<Vec<ModelMetric>>,
}

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| StoreError::Storage("lock poisoned".into()))
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| StoreError::Storage("lock poisoned".into()))
}

impl InMemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Tenant check for records hanging off a model.
    fn ensure_model(&self, tenant_id: TenantId, model_id: ModelId) -> StoreResult<()> {
        let models = read(&self.models)?;
        match models.get(&model_id) {
            Some(m) if m.tenant_id() == tenant_id => Ok(()),
            Some(_) => Err(StoreError::TenantIsolation),
            None => Err(StoreError::not_found("model", model_id)),
        }
    }
}

impl ModelStore for InMemoryModelStore {
    fn create_model(&self, model: Model) -> StoreResult<()> {
        let mut models = write(&self.models)?;
        let id = *model.id();
        if models.contains_key(&id) {
            return Err(StoreError::already_exists("model", id));
        }
        models.insert(id, model);
        Ok(())
    }

    fn get_model(&self, tenant_id: TenantId, model_id: ModelId) -> StoreResult<Model> {
        let models = read(&self.models)?;
        match models.get(&model_id) {
            Some(m) if m.tenant_id() == tenant_id => Ok(m.clone()),
            Some(_) => Err(StoreError::TenantIsolation),
            None => Err(StoreError::not_found("model", model_id)),
        }
    }

    fn update_model(&self, model: &Model, expected: ExpectedVersion) -> StoreResult<()> {
        let mut models = write(&self.models)?;
        let id = *model.id();
        let stored = models
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("model", id))?;
        if stored.tenant_id() != model.tenant_id() {
            return Err(StoreError::TenantIsolation);
        }
        if !expected.matches(stored.version()) {
            return Err(StoreError::VersionConflict {
                model_id: id,
                expected: match expected {
                    ExpectedVersion::Exact(v) => v,
                    ExpectedVersion::Any => stored.version(),
                },
                actual: stored.version(),
            });
        }
        *stored = model.clone();
        Ok(())
    }

    fn list_models(&self, tenant_id: TenantId, filter: &ModelFilter) -> StoreResult<Vec<Model>> {
        let models = read(&self.models)?;
        let mut result: Vec<Model> = models
            .values()
            .filter(|m| m.tenant_id() == tenant_id && filter.matches(m))
            .cloned()
            .collect();
        result.sort_by_key(|m| (m.created_at(), *m.id()));
        Ok(result)
    }

    fn create_training_job(&self, job: TrainingJob) -> StoreResult<()> {
        self.ensure_model(job.tenant_id, job.model_id)?;
        let mut jobs = write(&self.jobs)?;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::already_exists("training job", job.id));
        }
        if job.status == TrainingJobStatus::Running {
            if let Some(running) = jobs
                .values()
                .find(|j| j.model_id == job.model_id && j.status == TrainingJobStatus::Running)
            {
                return Err(StoreError::TrainingInProgress {
                    model_id: job.model_id,
                    job_id: running.id,
                });
            }
        }
        jobs.insert(job.id, job);
        Ok(())
    }

    fn update_training_job(&self, job: &TrainingJob) -> StoreResult<()> {
        let mut jobs = write(&self.jobs)?;
        let stored = jobs
            .get_mut(&job.id)
            .ok_or_else(|| StoreError::not_found("training job", job.id))?;
        if stored.tenant_id != job.tenant_id {
            return Err(StoreError::TenantIsolation);
        }
        *stored = job.clone();
        Ok(())
    }

    fn get_training_job(&self, tenant_id: TenantId, job_id: TrainingJobId) -> StoreResult<TrainingJob> {
        let jobs = read(&self.jobs)?;
        match jobs.get(&job_id) {
            Some(j) if j.tenant_id == tenant_id => Ok(j.clone()),
            Some(_) => Err(StoreError::TenantIsolation),
            None => Err(StoreError::not_found("training job", job_id)),
        }
    }

    fn list_training_jobs(&self, tenant_id: TenantId, model_id: ModelId) -> StoreResult<Vec<TrainingJob>> {
        self.ensure_model(tenant_id, model_id)?;
        let jobs = read(&self.jobs)?;
        let mut result: Vec<TrainingJob> = jobs
            .values()
            .filter(|j| j.model_id == model_id)
            .cloned()
            .collect();
        result.sort_by_key(|j| (j.start_time, j.id));
        Ok(result)
    }

    fn create_prediction(&self, prediction: Prediction) -> StoreResult<()> {
        self.ensure_model(prediction.tenant_id, prediction.model_id)?;
        write(&self.predictions)?.push(prediction);
        Ok(())
    }

    fn list_predictions(&self, tenant_id: TenantId, model_id: ModelId) -> StoreResult<Vec<Prediction>> {
        self.ensure_model(tenant_id, model_id)?;
        Ok(read(&self.predictions)?
            .iter()
            .filter(|p| p.model_id == model_id)
            .cloned()
            .collect())
    }

    fn create_model_metric(&self, metric: ModelMetric) -> StoreResult<()> {
        self.ensure_model(metric.tenant_id, metric.model_id)?;
        write(&self.metrics)?.push(metric);
        Ok(())
    }

    fn list_model_metrics(&self, tenant_id: TenantId, model_id: ModelId) -> StoreResult<Vec<ModelMetric>> {
        self.ensure_model(tenant_id, model_id)?;
        Ok(read(&self.metrics)?
            .iter()
            .filter(|m| m.model_id == model_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::update_model_with_retry;
    use chrono::Utc;
    use forgeml_ai::{ModelType, TrainingConfig};
    use forgeml_models::{ModelStatus, NewModel};

    fn test_tenant() -> TenantId {
        TenantId::new()
    }

    fn model(tenant: TenantId) -> Model {
        let new = NewModel::new(tenant, "segments", ModelType::Clustering).with_feature_columns(["a"]);
        Model::create(ModelId::new(), new, Utc::now()).unwrap()
    }

    fn running_job(model: &Model) -> TrainingJob {
        TrainingJob::start(
            TrainingJobId::new(),
            model.tenant_id(),
            *model.id(),
            "job",
            TrainingConfig::defaults_for(ModelType::Clustering),
            3,
            Utc::now(),
        )
    }

    #[test]
    fn get_enforces_tenant_isolation() {
        let store = InMemoryModelStore::new();
        let tenant = test_tenant();
        let m = model(tenant);
        let id = *m.id();
        store.create_model(m).unwrap();

        assert!(store.get_model(tenant, id).is_ok());
        assert_eq!(store.get_model(test_tenant(), id), Err(StoreError::TenantIsolation));
        assert!(matches!(
            store.get_model(tenant, ModelId::new()),
            Err(StoreError::NotFound { kind: "model", .. })
        ));
    }

    #[test]
    fn duplicate_model_is_rejected() {
        let store = InMemoryModelStore::new();
        let m = model(test_tenant());
        store.create_model(m.clone()).unwrap();
        assert!(matches!(store.create_model(m), Err(StoreError::AlreadyExists { .. })));
    }

    #[test]
    fn stale_update_is_a_version_conflict() {
        let store = InMemoryModelStore::new();
        let m = model(test_tenant());
        store.create_model(m.clone()).unwrap();

        let mut first = m.clone();
        first.record_usage(Utc::now());
        store.update_model(&first, ExpectedVersion::Exact(1)).unwrap();

        let mut second = m;
        second.record_usage(Utc::now());
        let err = store.update_model(&second, ExpectedVersion::Exact(1)).unwrap_err();
        assert_eq!(
            err,
            StoreError::VersionConflict {
                model_id: *second.id(),
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn second_running_job_is_rejected() {
        let store = InMemoryModelStore::new();
        let m = model(test_tenant());
        store.create_model(m.clone()).unwrap();

        let mut first = running_job(&m);
        store.create_training_job(first.clone()).unwrap();
        let err = store.create_training_job(running_job(&m)).unwrap_err();
        assert_eq!(
            err,
            StoreError::TrainingInProgress {
                model_id: *m.id(),
                job_id: first.id
            }
        );

        first.fail(Utc::now(), "stopped").unwrap();
        store.update_training_job(&first).unwrap();
        store.create_training_job(running_job(&m)).unwrap();
        assert_eq!(store.list_training_jobs(m.tenant_id(), *m.id()).unwrap().len(), 2);
    }

    #[test]
    fn job_for_unknown_model_is_rejected() {
        let store = InMemoryModelStore::new();
        let m = model(test_tenant());
        assert!(matches!(
            store.create_training_job(running_job(&m)),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn list_models_applies_filter_per_tenant() {
        let store = InMemoryModelStore::new();
        let tenant = test_tenant();
        store.create_model(model(tenant)).unwrap();
        store.create_model(model(tenant)).unwrap();
        store.create_model(model(test_tenant())).unwrap();

        assert_eq!(store.list_models(tenant, &ModelFilter::all()).unwrap().len(), 2);
        let trained = ModelFilter::all().with_status(ModelStatus::Trained);
        assert!(store.list_models(tenant, &trained).unwrap().is_empty());
        let clustering = ModelFilter::all().with_model_type(ModelType::Clustering);
        assert_eq!(store.list_models(tenant, &clustering).unwrap().len(), 2);
    }

    #[test]
    fn retry_reapplies_after_conflict() {
        let store = InMemoryModelStore::new();
        let m = model(test_tenant());
        store.create_model(m.clone()).unwrap();

        let mut calls = 0;
        let updated = update_model_with_retry::<_, StoreError, _>(
            &store,
            m.tenant_id(),
            *m.id(),
            3,
            |model| {
                calls += 1;
                if calls == 1 {
                    // a concurrent writer sneaks in between read and write
                    let mut other = store.get_model(m.tenant_id(), *m.id())?;
                    other.record_usage(Utc::now());
                    store.update_model(&other, ExpectedVersion::Exact(1))?;
                }
                model.record_usage(Utc::now());
                Ok(true)
            },
        )
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(updated.usage_count(), 2);
        assert_eq!(store.get_model(m.tenant_id(), *m.id()).unwrap().version(), 3);
    }

    #[test]
    fn retry_gives_up_after_attempts() {
        let store = InMemoryModelStore::new();
        let m = model(test_tenant());
        store.create_model(m.clone()).unwrap();

        let err = update_model_with_retry::<_, StoreError, _>(&store, m.tenant_id(), *m.id(), 2, |model| {
            let mut other = store.get_model(m.tenant_id(), *m.id())?;
            other.record_usage(Utc::now());
            store.update_model(&other, ExpectedVersion::Any)?;
            model.record_usage(Utc::now());
            Ok(true)
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[test]
    fn works_through_arc() {
        let store = InMemoryModelStore::arc();
        let shared: Arc<dyn ModelStore> = store.clone();
        let m = model(test_tenant());
        shared.create_model(m.clone()).unwrap();
        assert_eq!(store.get_model(m.tenant_id(), *m.id()).unwrap(), m);
    }
}
