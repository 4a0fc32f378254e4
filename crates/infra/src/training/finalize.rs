//! Persistence of a finished training run. Only the supervisor of a job
//! calls into this module, once per job.
//!
//! Job and metric writes retry transient storage errors so that a job never
//! stays `RUNNING` (and blocks its model) because of a single failed write.

use chrono::Utc;
use tracing::{info, warn};

use forgeml_ai::{ModelType, TrainedModel};
use forgeml_models::{ModelMetric, TrainingJob};

use crate::error::PipelineError;
use crate::store::{ModelStore, update_model_with_retry, write_with_retry};

use super::TrainingOutcome;

/// Append metric rows, install the artifact and complete the job.
///
/// Metrics are written before the artifact: if any row cannot be stored the
/// run fails and the model keeps its previous state.
pub(crate) fn complete<S>(
    store: &S,
    mut job: TrainingJob,
    model_type: ModelType,
    trained: TrainedModel,
    retries: u32,
) -> TrainingOutcome
where
    S: ModelStore + ?Sized,
{
    let blob = match trained.artifact.encode() {
        Ok(blob) => blob,
        Err(e) => return Err(fail(store, job, e.to_string(), retries)),
    };
    let metrics = trained.metrics;
    let dataset_size = job.dataset_size;
    let now = Utc::now();

    for (kind, value) in metrics.observations() {
        let metric = ModelMetric::new(
            job.tenant_id,
            job.model_id,
            kind,
            value,
            ModelMetric::dataset_for(model_type, kind),
            now,
        );
        let recorded = write_with_retry(retries, "model metric", || {
            store.create_model_metric(metric.clone())
        });
        if let Err(e) = recorded {
            return Err(fail(
                store,
                job,
                format!("failed to record {kind:?} metric: {e}"),
                retries,
            ));
        }
    }

    let installed = update_model_with_retry::<_, PipelineError, _>(
        store,
        job.tenant_id,
        job.model_id,
        retries,
        |model| {
            model.record_training_success(blob.clone(), metrics.clone(), dataset_size, now);
            Ok(true)
        },
    );
    if let Err(e) = installed {
        return Err(fail(
            store,
            job,
            format!("failed to persist trained model: {e}"),
            retries,
        ));
    }

    job.complete(now, metrics.accuracy, metrics.loss)?;
    write_with_retry(retries, "training job", || store.update_training_job(&job))?;

    info!(
        tenant = %job.tenant_id,
        model_id = %job.model_id,
        job_id = %job.id,
        accuracy = ?metrics.accuracy,
        duration_ms = job.duration().map(|d| d.num_milliseconds()),
        "training job completed"
    );
    Ok(job)
}

/// Record a failed run: the job fails with `message` verbatim and a model
/// that never produced an artifact moves to `FAILED`. Returns the error to
/// surface to the caller.
pub(crate) fn fail<S>(store: &S, mut job: TrainingJob, message: String, retries: u32) -> PipelineError
where
    S: ModelStore + ?Sized,
{
    let now = Utc::now();

    let marked = update_model_with_retry::<_, PipelineError, _>(
        store,
        job.tenant_id,
        job.model_id,
        retries,
        |model| Ok(model.record_training_failure(now)),
    );
    if let Err(e) = marked {
        warn!(job_id = %job.id, error = %e, "failed to record training failure on model");
    }

    if let Err(e) = job.fail(now, message.clone()) {
        return e.into();
    }
    if let Err(e) = write_with_retry(retries, "training job", || store.update_training_job(&job)) {
        return e.into();
    }

    warn!(
        tenant = %job.tenant_id,
        model_id = %job.model_id,
        job_id = %job.id,
        error = %message,
        "training job failed"
    );
    PipelineError::TrainingFailure {
        job_id: job.id,
        message,
    }
}
