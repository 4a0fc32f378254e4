use crate::artifact::ModelArtifact;
use crate::classification::ClassificationAlgorithm;
use crate::clustering::ClusteringAlgorithm;
use crate::config::TrainingConfig;
use crate::data::TrainingData;
use crate::metrics::TrainingMetrics;
use crate::model_type::ModelType;
use crate::regression::RegressionAlgorithm;
use crate::result::{AiResult, Inference};
use crate::time_series::TimeSeriesAlgorithm;

/// Output of a successful training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainedModel {
    pub artifact: ModelArtifact,
    pub metrics: TrainingMetrics,
}

/// A model family: trains artifacts and serves predictions from them.
///
/// Implementations are pure: no IO, no clock, deterministic for a given
/// config seed.
pub trait Algorithm: Send + Sync + 'static {
    fn model_type(&self) -> ModelType;

    /// Fit on `data`. Validation failures are reported as
    /// [`AiError::Validation`](crate::AiError::Validation).
    fn train(&self, data: &TrainingData, config: &TrainingConfig) -> AiResult<TrainedModel>;

    /// Run inference. `accuracy` is the model's recorded training accuracy,
    /// used by families whose confidence derives from it.
    fn predict(
        &self,
        artifact: &ModelArtifact,
        input: &[Vec<f64>],
        accuracy: Option<f64>,
    ) -> AiResult<Inference>;
}

/// The single dispatch point from model type to algorithm.
pub fn algorithm_for(model_type: ModelType) -> Box<dyn Algorithm> {
    match model_type {
        ModelType::Regression => Box::new(RegressionAlgorithm),
        ModelType::Classification => Box::new(ClassificationAlgorithm),
        ModelType::TimeSeries => Box::new(TimeSeriesAlgorithm),
        ModelType::Clustering => Box::new(ClusteringAlgorithm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_covers_every_type() {
        for t in ModelType::ALL {
            assert_eq!(algorithm_for(t).model_type(), t);
        }
    }

    #[test]
    fn artifact_of_another_type_is_unsupported() {
        let artifact = ModelArtifact::Regression(crate::artifact::RegressionArtifact {
            equation: vec![1.0, 0.0],
        });
        let err = algorithm_for(ModelType::Clustering)
            .predict(&artifact, &[vec![1.0]], None)
            .unwrap_err();
        assert!(matches!(err, crate::AiError::UnsupportedModelType(_)));
    }
}
