//! Windowed moving-average forecaster.

use crate::algorithm::{Algorithm, TrainedModel};
use crate::artifact::{ModelArtifact, TimeSeriesArtifact, mismatch};
use crate::config::{AlgorithmParams, TrainingConfig};
use crate::data::TrainingData;
use crate::linalg::mean;
use crate::metrics::{TrainingMetrics, mean_absolute_error, mean_squared_error};
use crate::model_type::ModelType;
use crate::result::{AiError, AiResult, Inference, PredictionOutput};

const MAX_CONFIDENCE: f64 = 0.9;
const FALLBACK_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Default, Copy, Clone)]
pub struct TimeSeriesAlgorithm;

/// In-sample forecasts: element `j` is the mean of `values[j..j + window]`,
/// i.e. the forecast for position `j + window`.
pub fn moving_average_forecasts(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || values.len() <= window {
        return Vec::new();
    }
    values.windows(window).take(values.len() - window).map(mean).collect()
}

impl Algorithm for TimeSeriesAlgorithm {
    fn model_type(&self) -> ModelType {
        ModelType::TimeSeries
    }

    fn train(&self, data: &TrainingData, config: &TrainingConfig) -> AiResult<TrainedModel> {
        let AlgorithmParams::TimeSeries { window_size } = config.params else {
            return Err(AiError::validation("time-series training requires time_series params"));
        };
        data.validate_for(ModelType::TimeSeries, 0, config)?;
        let values = data.numeric_target()?;

        let forecasts = moving_average_forecasts(&values, window_size);
        let actual = &values[window_size..];
        let mse = mean_squared_error(&forecasts, actual);
        let mae = mean_absolute_error(&forecasts, actual);

        let max_actual = actual.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let accuracy = if max_actual > 0.0 { 1.0 - mse / max_actual } else { 0.0 };

        tracing::debug!(window_size, mse, mae, accuracy, "evaluated moving-average forecaster");

        Ok(TrainedModel {
            artifact: ModelArtifact::TimeSeries(TimeSeriesArtifact {
                window_size,
                last_values: values[values.len() - window_size..].to_vec(),
            }),
            metrics: TrainingMetrics {
                accuracy: Some(accuracy),
                mse: Some(mse),
                mae: Some(mae),
                ..Default::default()
            },
        })
    }

    /// Input rows are read as a flat sequence of recent observations that
    /// extend the stored window.
    fn predict(
        &self,
        artifact: &ModelArtifact,
        input: &[Vec<f64>],
        accuracy: Option<f64>,
    ) -> AiResult<Inference> {
        let ModelArtifact::TimeSeries(artifact) = artifact else {
            return Err(mismatch(ModelType::TimeSeries, artifact));
        };
        if artifact.window_size == 0 {
            return Err(AiError::invalid_artifact("window_size is 0"));
        }

        let combined: Vec<f64> = artifact
            .last_values
            .iter()
            .copied()
            .chain(input.iter().flatten().copied())
            .collect();
        let start = combined.len().saturating_sub(artifact.window_size);
        let window = combined[start..].to_vec();
        let value = mean(&window);

        let confidence = MAX_CONFIDENCE.min(accuracy.unwrap_or(FALLBACK_CONFIDENCE));
        Ok(Inference::new(PredictionOutput::Forecast { value, window }, confidence))
    }
}
