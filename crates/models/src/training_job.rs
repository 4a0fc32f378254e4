use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use forgeml_ai::TrainingConfig;
use forgeml_core::{DomainError, DomainResult, ModelId, TenantId, TrainingJobId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrainingJobStatus {
    Running,
    Completed,
    Failed,
}

impl TrainingJobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TrainingJobStatus::Running)
    }
}

/// One training attempt for one model.
///
/// `end_time` is set exactly when the status is terminal, and a job is
/// finalised at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingJob {
    pub id: TrainingJobId,
    pub tenant_id: TenantId,
    pub model_id: ModelId,
    pub job_name: String,
    pub status: TrainingJobStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Snapshot of the configuration the run used.
    pub config: TrainingConfig,
    pub dataset_size: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub validation_split: f64,
    pub validation_accuracy: Option<f64>,
    pub validation_loss: Option<f64>,
    pub error_message: Option<String>,
}

impl TrainingJob {
    /// A new job in status `RUNNING`.
    pub fn start(
        id: TrainingJobId,
        tenant_id: TenantId,
        model_id: ModelId,
        job_name: impl Into<String>,
        config: TrainingConfig,
        dataset_size: usize,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            model_id,
            job_name: job_name.into(),
            status: TrainingJobStatus::Running,
            start_time: at,
            end_time: None,
            epochs: config.epochs,
            batch_size: config.batch_size,
            learning_rate: config.learning_rate,
            validation_split: config.validation_split,
            config,
            dataset_size,
            validation_accuracy: None,
            validation_loss: None,
            error_message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `end_time - start_time` once the job is terminal.
    pub fn duration(&self) -> Option<Duration> {
        self.end_time.map(|end| end - self.start_time)
    }

    pub fn complete(
        &mut self,
        at: DateTime<Utc>,
        validation_accuracy: Option<f64>,
        validation_loss: Option<f64>,
    ) -> DomainResult<()> {
        self.ensure_running()?;
        self.status = TrainingJobStatus::Completed;
        self.end_time = Some(at.max(self.start_time));
        self.validation_accuracy = validation_accuracy;
        self.validation_loss = validation_loss;
        Ok(())
    }

    pub fn fail(&mut self, at: DateTime<Utc>, message: impl Into<String>) -> DomainResult<()> {
        self.ensure_running()?;
        self.status = TrainingJobStatus::Failed;
        self.end_time = Some(at.max(self.start_time));
        self.error_message = Some(message.into());
        Ok(())
    }

    fn ensure_running(&self) -> DomainResult<()> {
        if self.is_terminal() {
            return Err(DomainError::invariant(format!(
                "training job {} is already {:?}",
                self.id, self.status
            )));
        }
        Ok(())
    }
}
