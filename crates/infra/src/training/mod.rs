//! Training orchestration.
//!
//! Each accepted `train` call gets its own supervisor thread, which spawns
//! the worker thread running the algorithm and waits for it up to the job
//! deadline. The supervisor is the single finaliser of the job: a result
//! arriving after the deadline is discarded.

mod finalize;

use std::sync::{Arc, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info};

use forgeml_ai::{ModelType, TrainingConfig, TrainingData, algorithm_for};
use forgeml_core::{ModelId, TenantId, TrainingJobId};
use forgeml_models::TrainingJob;

use crate::cache::ArtifactCache;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult, model_lookup};
use crate::store::ModelStore;

/// Terminal state of a training job: the completed job, or
/// [`PipelineError::TrainingFailure`].
pub type TrainingOutcome = PipelineResult<TrainingJob>;

/// Handle to a training job running in the background.
#[derive(Debug)]
pub struct TrainingHandle {
    job: TrainingJob,
    outcome: mpsc::Receiver<TrainingOutcome>,
    result: Option<TrainingOutcome>,
    supervisor: Option<thread::JoinHandle<()>>,
}

impl TrainingHandle {
    /// Snapshot of the job as it was created (status `RUNNING`).
    pub fn job(&self) -> &TrainingJob {
        &self.job
    }

    pub fn job_id(&self) -> TrainingJobId {
        self.job.id
    }

    /// Poll for the outcome without blocking.
    pub fn try_result(&mut self) -> Option<&TrainingOutcome> {
        if self.result.is_none() {
            match self.outcome.try_recv() {
                Ok(outcome) => self.result = Some(outcome),
                Err(mpsc::TryRecvError::Empty) => return None,
                Err(mpsc::TryRecvError::Disconnected) => self.result = Some(Err(self.lost())),
            }
        }
        self.result.as_ref()
    }

    /// Block until the job is terminal.
    pub fn wait(mut self) -> TrainingOutcome {
        let outcome = match self.result.take() {
            Some(outcome) => outcome,
            None => self.outcome.recv().unwrap_or_else(|_| Err(self.lost())),
        };
        if let Some(join) = self.supervisor.take() {
            let _ = join.join();
        }
        outcome
    }

    fn lost(&self) -> PipelineError {
        PipelineError::TrainingFailure {
            job_id: self.job.id,
            message: "training supervisor terminated unexpectedly".to_string(),
        }
    }
}

/// Accepts training requests and runs them in the background.
#[derive(Debug, Clone)]
pub struct TrainingOrchestrator<S> {
    store: S,
    config: PipelineConfig,
    cache: Option<Arc<ArtifactCache>>,
}

impl<S> TrainingOrchestrator<S>
where
    S: ModelStore + Clone + 'static,
{
    pub fn new(store: S, config: PipelineConfig) -> Self {
        Self {
            store,
            config,
            cache: None,
        }
    }

    /// Drop cached artifacts of a model once it is retrained.
    pub fn with_cache(mut self, cache: Arc<ArtifactCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Validate the request, create a `RUNNING` job and start training.
    ///
    /// Validation and lookup errors are returned before any job exists.
    /// Without an explicit `config` the defaults are combined with the
    /// model's own parameters.
    pub fn train(
        &self,
        tenant_id: TenantId,
        model_id: ModelId,
        data: TrainingData,
        config: Option<TrainingConfig>,
    ) -> PipelineResult<TrainingHandle> {
        let model = self
            .store
            .get_model(tenant_id, model_id)
            .map_err(|e| model_lookup(e, model_id))?;
        let model_type = model.model_type();

        let config = config.unwrap_or_else(|| TrainingConfig::new(model.config_params().clone()));
        config.validate_for(model_type)?;
        let declared_width = match model_type {
            ModelType::TimeSeries => 0,
            _ => model.feature_columns().len(),
        };
        data.validate_for(model_type, declared_width, &config)?;

        let job = TrainingJob::start(
            TrainingJobId::new(),
            tenant_id,
            model_id,
            format!("{}-{}", model.name(), Utc::now().format("%Y%m%dT%H%M%S")),
            config.clone(),
            data.len(),
            Utc::now(),
        );
        self.store.create_training_job(job.clone())?;

        info!(
            tenant = %tenant_id,
            model_id = %model_id,
            job_id = %job.id,
            model_type = %model_type,
            rows = job.dataset_size,
            epochs = job.epochs,
            "training job started"
        );

        let run = TrainingRun {
            store: self.store.clone(),
            job: job.clone(),
            model_type,
            data,
            config,
            deadline: self.config.training_deadline,
            retries: self.config.update_retries,
            cache: self.cache.clone(),
        };
        let (outcome_tx, outcome_rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name(format!("forgeml-training-{}", job.id))
            .spawn(move || {
                let _ = outcome_tx.send(run.supervise());
            });

        match spawned {
            Ok(join) => Ok(TrainingHandle {
                job,
                outcome: outcome_rx,
                result: None,
                supervisor: Some(join),
            }),
            Err(e) => {
                let message = format!("failed to spawn training supervisor: {e}");
                Err(finalize::fail(
                    &self.store,
                    job,
                    message,
                    self.config.update_retries,
                ))
            }
        }
    }
}

struct TrainingRun<S> {
    store: S,
    job: TrainingJob,
    model_type: ModelType,
    data: TrainingData,
    config: TrainingConfig,
    deadline: Duration,
    retries: u32,
    cache: Option<Arc<ArtifactCache>>,
}

impl<S> TrainingRun<S>
where
    S: ModelStore + 'static,
{
    fn supervise(self) -> TrainingOutcome {
        let TrainingRun {
            store,
            job,
            model_type,
            data,
            config,
            deadline,
            retries,
            cache,
        } = self;

        let (result_tx, result_rx) = mpsc::sync_channel(1);
        let job_id = job.id;
        let worker = thread::Builder::new()
            .name(format!("forgeml-trainer-{job_id}"))
            .spawn(move || {
                let started = Instant::now();
                let result = algorithm_for(model_type).train(&data, &config);
                if result_tx.send(result).is_err() {
                    debug!(
                        job_id = %job_id,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "discarding training result that arrived after the deadline"
                    );
                }
            });

        let trained = match worker {
            Err(e) => Err(format!("failed to spawn training worker: {e}")),
            Ok(_) => match result_rx.recv_timeout(deadline) {
                Ok(Ok(trained)) => Ok(trained),
                Ok(Err(e)) => Err(e.to_string()),
                Err(mpsc::RecvTimeoutError::Timeout) => Err(format!(
                    "training exceeded its deadline of {}ms",
                    deadline.as_millis()
                )),
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    Err("training worker terminated unexpectedly".to_string())
                }
            },
        };

        let (tenant_id, model_id) = (job.tenant_id, job.model_id);
        let outcome = match trained {
            Ok(trained) => finalize::complete(&store, job, model_type, trained, retries),
            Err(message) => Err(finalize::fail(&store, job, message, retries)),
        };
        if outcome.is_ok() {
            if let Some(cache) = &cache {
                cache.invalidate_model(tenant_id, model_id);
            }
        }
        outcome
    }
}
