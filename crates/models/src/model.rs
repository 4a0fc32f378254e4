use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgeml_ai::{AlgorithmParams, ModelType, TrainingMetrics};
use forgeml_core::{AggregateRoot, DomainError, DomainResult, ModelId, TenantId};

/// Lifecycle status of a [`Model`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelStatus {
    /// Created, or waiting for its first successful training run.
    Training,
    Trained,
    Deployed,
    /// Never trained successfully.
    Failed,
}

impl ModelStatus {
    /// Statuses that carry an artifact and can serve predictions.
    pub fn is_servable(self) -> bool {
        matches!(self, ModelStatus::Trained | ModelStatus::Deployed)
    }
}

/// Request to register a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewModel {
    pub tenant_id: TenantId,
    pub name: String,
    pub model_type: ModelType,
    /// Free-text algorithm label; defaults per model type.
    pub algorithm: Option<String>,
    pub feature_columns: Vec<String>,
    pub target_column: Option<String>,
    /// Defaults to [`AlgorithmParams::defaults_for`] the model type.
    pub config_params: Option<AlgorithmParams>,
}

impl NewModel {
    pub fn new(tenant_id: TenantId, name: impl Into<String>, model_type: ModelType) -> Self {
        Self {
            tenant_id,
            name: name.into(),
            model_type,
            algorithm: None,
            feature_columns: Vec::new(),
            target_column: None,
            config_params: None,
        }
    }

    pub fn with_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    pub fn with_feature_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }

    pub fn with_config_params(mut self, params: AlgorithmParams) -> Self {
        self.config_params = Some(params);
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("model name cannot be empty"));
        }
        if self.model_type != ModelType::TimeSeries && self.feature_columns.is_empty() {
            return Err(DomainError::validation(format!(
                "{} models require at least one feature column",
                self.model_type
            )));
        }
        if self.feature_columns.iter().any(|c| c.trim().is_empty()) {
            return Err(DomainError::validation("feature column names cannot be empty"));
        }
        if self.model_type.is_supervised()
            && self
                .target_column
                .as_deref()
                .is_none_or(|c| c.trim().is_empty())
        {
            return Err(DomainError::validation(format!(
                "{} models require a target column",
                self.model_type
            )));
        }
        if let Some(params) = &self.config_params {
            params
                .validate_for(self.model_type)
                .map_err(|e| DomainError::validation(e.to_string()))?;
        }
        Ok(())
    }
}

fn default_algorithm(model_type: ModelType) -> &'static str {
    match model_type {
        ModelType::Regression => "linear_regression",
        ModelType::Classification => "neural_network",
        ModelType::TimeSeries => "moving_average",
        ModelType::Clustering => "kmeans",
    }
}

/// Aggregate root: a named, typed model definition plus its single active
/// artifact.
///
/// Invariant: `artifact` is present iff the status is servable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    id: ModelId,
    tenant_id: TenantId,
    name: String,
    model_type: ModelType,
    algorithm: String,
    feature_columns: Vec<String>,
    target_column: Option<String>,
    config_params: AlgorithmParams,
    status: ModelStatus,
    performance: TrainingMetrics,
    artifact: Option<Vec<u8>>,
    /// Incremented each time a new artifact is installed.
    artifact_revision: u64,
    usage_count: u64,
    training_data_size: usize,
    last_training_date: Option<DateTime<Utc>>,
    last_used_date: Option<DateTime<Utc>>,
    is_production: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl Model {
    /// Validate `new` and build a model in status `TRAINING` at version 1.
    pub fn create(id: ModelId, new: NewModel, at: DateTime<Utc>) -> DomainResult<Self> {
        new.validate()?;
        let config_params = new
            .config_params
            .unwrap_or_else(|| AlgorithmParams::defaults_for(new.model_type));
        let algorithm = new
            .algorithm
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| default_algorithm(new.model_type).to_string());

        Ok(Self {
            id,
            tenant_id: new.tenant_id,
            name: new.name,
            model_type: new.model_type,
            algorithm,
            feature_columns: new.feature_columns,
            target_column: new.target_column,
            config_params,
            status: ModelStatus::Training,
            performance: TrainingMetrics::default(),
            artifact: None,
            artifact_revision: 0,
            usage_count: 0,
            training_data_size: 0,
            last_training_date: None,
            last_used_date: None,
            is_production: false,
            created_at: at,
            updated_at: at,
            version: 1,
        })
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    pub fn target_column(&self) -> Option<&str> {
        self.target_column.as_deref()
    }

    pub fn config_params(&self) -> &AlgorithmParams {
        &self.config_params
    }

    pub fn status(&self) -> ModelStatus {
        self.status
    }

    /// Performance fields from the last successful training run.
    pub fn performance(&self) -> &TrainingMetrics {
        &self.performance
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.performance.accuracy
    }

    /// Encoded artifact blob.
    pub fn artifact(&self) -> Option<&[u8]> {
        self.artifact.as_deref()
    }

    pub fn artifact_revision(&self) -> u64 {
        self.artifact_revision
    }

    pub fn usage_count(&self) -> u64 {
        self.usage_count
    }

    pub fn training_data_size(&self) -> usize {
        self.training_data_size
    }

    pub fn last_training_date(&self) -> Option<DateTime<Utc>> {
        self.last_training_date
    }

    pub fn last_used_date(&self) -> Option<DateTime<Utc>> {
        self.last_used_date
    }

    pub fn is_production(&self) -> bool {
        self.is_production
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_servable(&self) -> bool {
        self.status.is_servable() && self.artifact.is_some()
    }

    /// Install a freshly trained artifact. Any previous artifact is replaced
    /// as a whole and the model leaves production.
    pub fn record_training_success(
        &mut self,
        artifact: Vec<u8>,
        performance: TrainingMetrics,
        dataset_size: usize,
        at: DateTime<Utc>,
    ) {
        self.status = ModelStatus::Trained;
        self.artifact = Some(artifact);
        self.artifact_revision += 1;
        self.performance = performance;
        self.training_data_size = dataset_size;
        self.last_training_date = Some(at);
        self.is_production = false;
        self.touch(at);
    }

    /// Record a failed training run.
    ///
    /// A model that already serves an artifact keeps it; one that was never
    /// trained moves to `FAILED`. Returns whether the model changed.
    pub fn record_training_failure(&mut self, at: DateTime<Utc>) -> bool {
        if self.artifact.is_some() || self.status == ModelStatus::Failed {
            return false;
        }
        self.status = ModelStatus::Failed;
        self.touch(at);
        true
    }

    pub fn deploy(&mut self, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status != ModelStatus::Trained {
            return Err(DomainError::invalid_state(format!(
                "only TRAINED models can be deployed (model {} is {:?})",
                self.id, self.status
            )));
        }
        self.status = ModelStatus::Deployed;
        self.is_production = true;
        self.touch(at);
        Ok(())
    }

    pub fn record_usage(&mut self, at: DateTime<Utc>) {
        self.usage_count = self.usage_count.saturating_add(1);
        self.last_used_date = Some(at);
        self.touch(at);
    }

    fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
        self.version += 1;
    }
}

impl AggregateRoot for Model {
    type Id = ModelId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
