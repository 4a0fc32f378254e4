//! Ordinary least squares on a single feature.

use crate::algorithm::{Algorithm, TrainedModel};
use crate::artifact::{ModelArtifact, RegressionArtifact, mismatch};
use crate::config::TrainingConfig;
use crate::data::TrainingData;
use crate::metrics::{TrainingMetrics, mean_absolute_error, mean_squared_error, r2_score};
use crate::model_type::ModelType;
use crate::result::{AiError, AiResult, Inference, PredictionOutput};

/// Confidence ceiling for regression predictions.
const MAX_CONFIDENCE: f64 = 0.95;
/// Confidence used when the model has no recorded accuracy.
const FALLBACK_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Default, Copy, Clone)]
pub struct RegressionAlgorithm;

/// Closed-form `(slope, intercept)` through `(x, y)` pairs.
pub fn fit_line(xs: &[f64], ys: &[f64]) -> AiResult<(f64, f64)> {
    let n = xs.len().min(ys.len()) as f64;
    if n < 2.0 {
        return Err(AiError::validation("at least two points are required"));
    }
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();
    let sum_x2: f64 = xs.iter().map(|x| x * x).sum();

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator.abs() <= f64::EPSILON * n * sum_x2.max(1.0) {
        return Err(AiError::validation("feature has zero variance; slope is undefined"));
    }
    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    Ok((slope, intercept))
}

impl Algorithm for RegressionAlgorithm {
    fn model_type(&self) -> ModelType {
        ModelType::Regression
    }

    fn train(&self, data: &TrainingData, config: &TrainingConfig) -> AiResult<TrainedModel> {
        data.validate_for(ModelType::Regression, 0, config)?;
        let ys = data.numeric_target()?;
        let xs: Vec<f64> = data.features.iter().map(|row| row[0]).collect();

        let (slope, intercept) = fit_line(&xs, &ys)?;
        let predicted: Vec<f64> = xs.iter().map(|x| slope * x + intercept).collect();
        let r2 = r2_score(&predicted, &ys);

        tracing::debug!(slope, intercept, r2, rows = xs.len(), "fitted regression line");

        Ok(TrainedModel {
            artifact: ModelArtifact::Regression(RegressionArtifact {
                equation: vec![slope, intercept],
            }),
            metrics: TrainingMetrics {
                accuracy: Some(r2),
                mse: Some(mean_squared_error(&predicted, &ys)),
                mae: Some(mean_absolute_error(&predicted, &ys)),
                r2_score: Some(r2),
                ..Default::default()
            },
        })
    }

    fn predict(
        &self,
        artifact: &ModelArtifact,
        input: &[Vec<f64>],
        accuracy: Option<f64>,
    ) -> AiResult<Inference> {
        let ModelArtifact::Regression(artifact) = artifact else {
            return Err(mismatch(ModelType::Regression, artifact));
        };
        let coefficients = artifact.coefficients();

        let values = input
            .iter()
            .enumerate()
            .map(|(i, row)| {
                if row.len() < coefficients.len() {
                    return Err(AiError::validation(format!(
                        "input row {i} has {} features, model needs {}",
                        row.len(),
                        coefficients.len()
                    )));
                }
                Ok(row
                    .iter()
                    .zip(coefficients)
                    .map(|(x, c)| x * c)
                    .sum::<f64>()
                    + artifact.intercept())
            })
            .collect::<AiResult<Vec<f64>>>()?;

        let confidence = MAX_CONFIDENCE.min(accuracy.unwrap_or(FALLBACK_CONFIDENCE));
        Ok(Inference::new(PredictionOutput::Regression { values }, confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cfg() -> TrainingConfig {
        TrainingConfig::defaults_for(ModelType::Regression)
    }

    #[test]
    fn fits_exact_line() {
        let data = TrainingData::numeric(
            vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]],
            vec![2.0, 4.0, 6.0, 8.0],
        );
        let trained = RegressionAlgorithm.train(&data, &cfg()).unwrap();
        let ModelArtifact::Regression(a) = &trained.artifact else {
            panic!("expected regression artifact");
        };
        assert!((a.equation[0] - 2.0).abs() < 1e-9);
        assert!(a.equation[1].abs() < 1e-9);
        assert!((trained.metrics.r2_score.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(trained.metrics.accuracy, trained.metrics.r2_score);
        assert!(trained.metrics.mse.unwrap() < 1e-12);
    }

    #[test]
    fn predicts_from_equation() {
        let artifact = ModelArtifact::Regression(RegressionArtifact {
            equation: vec![2.0, 0.0],
        });
        let inference = RegressionAlgorithm
            .predict(&artifact, &[vec![5.0], vec![-1.0]], Some(1.0))
            .unwrap();
        assert_eq!(
            inference.output,
            PredictionOutput::Regression {
                values: vec![10.0, -2.0]
            }
        );
        assert_eq!(inference.confidence, 0.95);
    }

    #[test]
    fn confidence_falls_back_without_accuracy() {
        let artifact = ModelArtifact::Regression(RegressionArtifact {
            equation: vec![1.0, 1.0],
        });
        let inference = RegressionAlgorithm.predict(&artifact, &[vec![1.0]], None).unwrap();
        assert_eq!(inference.confidence, 0.5);
        let negative = RegressionAlgorithm
            .predict(&artifact, &[vec![1.0]], Some(-3.0))
            .unwrap();
        assert_eq!(negative.confidence, 0.0);
    }

    #[test]
    fn constant_feature_is_a_validation_error() {
        let data = TrainingData::numeric(vec![vec![1.0], vec![1.0]], vec![2.0, 3.0]);
        let err = RegressionAlgorithm.train(&data, &cfg()).unwrap_err();
        assert!(matches!(err, AiError::Validation(_)));
    }

    #[test]
    fn short_input_row_is_rejected() {
        let artifact = ModelArtifact::Regression(RegressionArtifact {
            equation: vec![1.0, 2.0, 0.0],
        });
        assert!(RegressionAlgorithm.predict(&artifact, &[vec![1.0]], None).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: data lying exactly on a line yields R² = 1 and zero error.
        #[test]
        fn exact_lines_are_recovered(
            slope in -50.0f64..50.0,
            intercept in -100.0f64..100.0,
            start in -20i32..20,
            len in 2usize..30,
        ) {
            let xs: Vec<f64> = (0..len).map(|i| (start + i as i32) as f64).collect();
            let ys: Vec<f64> = xs.iter().map(|x| slope * x + intercept).collect();
            let data = TrainingData::numeric(xs.iter().map(|x| vec![*x]).collect(), ys);
            let trained = RegressionAlgorithm.train(&data, &cfg()).unwrap();
            let m = trained.metrics;
            prop_assert!((m.r2_score.unwrap() - 1.0).abs() < 1e-6);
            prop_assert!(m.mse.unwrap() < 1e-6);
            prop_assert!(m.mae.unwrap() < 1e-6);
        }
    }
}
