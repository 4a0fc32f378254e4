use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgeml_ai::{MetricKind, ModelType};
use forgeml_core::{MetricId, ModelId, TenantId};

/// Dataset a metric was evaluated on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetType {
    Training,
    Validation,
    Test,
}

/// One historical metric observation (append-only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetric {
    pub id: MetricId,
    pub tenant_id: TenantId,
    pub model_id: ModelId,
    pub metric_type: MetricKind,
    pub value: f64,
    pub dataset_type: DatasetType,
    pub evaluation_date: DateTime<Utc>,
}

impl ModelMetric {
    pub fn new(
        tenant_id: TenantId,
        model_id: ModelId,
        metric_type: MetricKind,
        value: f64,
        dataset_type: DatasetType,
        evaluation_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MetricId::new(),
            tenant_id,
            model_id,
            metric_type,
            value,
            dataset_type,
            evaluation_date,
        }
    }

    /// Dataset a training metric of `kind` is reported against.
    ///
    /// Classification accuracy and loss come from the held-out validation
    /// pass; everything else is scored on the training data.
    pub fn dataset_for(model_type: ModelType, kind: MetricKind) -> DatasetType {
        match (model_type, kind) {
            (ModelType::Classification, MetricKind::Accuracy | MetricKind::Loss) => {
                DatasetType::Validation
            }
            _ => DatasetType::Training,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_accuracy_is_a_validation_metric() {
        assert_eq!(
            ModelMetric::dataset_for(ModelType::Classification, MetricKind::Accuracy),
            DatasetType::Validation
        );
        assert_eq!(
            ModelMetric::dataset_for(ModelType::Classification, MetricKind::F1Score),
            DatasetType::Training
        );
        assert_eq!(
            ModelMetric::dataset_for(ModelType::Regression, MetricKind::Accuracy),
            DatasetType::Training
        );
    }

    #[test]
    fn serialises_with_upper_case_tags() {
        let metric = ModelMetric::new(
            TenantId::new(),
            ModelId::new(),
            MetricKind::R2Score,
            0.97,
            DatasetType::Training,
            Utc::now(),
        );
        let json = serde_json::to_value(&metric).unwrap();
        assert_eq!(json["metric_type"], "R2_SCORE");
        assert_eq!(json["dataset_type"], "TRAINING");
    }
}
