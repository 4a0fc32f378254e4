//! Binary classification with a small feed-forward network.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::algorithm::{Algorithm, TrainedModel};
use crate::artifact::{ClassificationArtifact, ModelArtifact, mismatch};
use crate::config::{AlgorithmParams, TrainingConfig};
use crate::data::TrainingData;
use crate::metrics::{ConfusionCounts, TrainingMetrics};
use crate::model_type::ModelType;
use crate::network::{Adam, Network};
use crate::result::{AiError, AiResult, Inference, PredictionOutput};

const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Default, Copy, Clone)]
pub struct ClassificationAlgorithm;

/// Number of trailing rows held out for validation. At least one row always
/// stays in the training set.
fn validation_rows(rows: usize, split: f64) -> usize {
    let held_out = (rows as f64 * split).floor() as usize;
    held_out.min(rows.saturating_sub(1))
}

impl Algorithm for ClassificationAlgorithm {
    fn model_type(&self) -> ModelType {
        ModelType::Classification
    }

    fn train(&self, data: &TrainingData, config: &TrainingConfig) -> AiResult<TrainedModel> {
        let AlgorithmParams::Classification {
            hidden_layers,
            dropout,
        } = &config.params
        else {
            return Err(AiError::validation(
                "classification training requires classification params",
            ));
        };
        data.validate_for(ModelType::Classification, 0, config)?;
        let target = data.binary_target()?;
        let width = data.feature_width()?;

        let rows: Vec<(&[f64], f64)> = data
            .features
            .iter()
            .map(Vec::as_slice)
            .zip(target.iter().copied())
            .collect();
        let held_out = validation_rows(rows.len(), config.validation_split);
        let (train_rows, validation) = rows.split_at(rows.len() - held_out);
        let evaluation = if validation.is_empty() {
            train_rows
        } else {
            validation
        };

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut network = Network::binary_classifier(width, hidden_layers, *dropout, &mut rng);
        let mut optimizer = Adam::new(&network, config.learning_rate);

        let mut order: Vec<usize> = (0..train_rows.len()).collect();
        let mut batch = Vec::with_capacity(config.batch_size);
        let (mut loss, mut accuracy) = (0.0, 0.0);

        for epoch in 0..config.epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;
            let mut batches = 0usize;
            for chunk in order.chunks(config.batch_size) {
                batch.clear();
                batch.extend(chunk.iter().map(|&i| train_rows[i]));
                epoch_loss += network.train_batch(&batch, &mut optimizer, &mut rng);
                batches += 1;
            }
            (loss, accuracy) = network.evaluate(evaluation);
            tracing::trace!(
                epoch,
                train_loss = epoch_loss / batches.max(1) as f64,
                val_loss = loss,
                val_accuracy = accuracy,
                "classification epoch"
            );
        }

        let probabilities: Vec<f64> = rows.iter().map(|(x, _)| network.predict_proba(x)).collect();
        let counts = ConfusionCounts::from_probabilities(&probabilities, &target, DECISION_THRESHOLD);

        tracing::debug!(
            parameters = network.parameter_count(),
            epochs = config.epochs,
            held_out,
            accuracy,
            loss,
            "trained classifier"
        );

        Ok(TrainedModel {
            artifact: ModelArtifact::Classification(ClassificationArtifact {
                network,
                threshold: DECISION_THRESHOLD,
            }),
            metrics: TrainingMetrics {
                accuracy: Some(accuracy),
                precision: Some(counts.precision()),
                recall: Some(counts.recall()),
                f1_score: Some(counts.f1_score()),
                loss: Some(loss),
                ..Default::default()
            },
        })
    }

    fn predict(
        &self,
        artifact: &ModelArtifact,
        input: &[Vec<f64>],
        _accuracy: Option<f64>,
    ) -> AiResult<Inference> {
        let ModelArtifact::Classification(artifact) = artifact else {
            return Err(mismatch(ModelType::Classification, artifact));
        };
        let width = artifact.network.input_width();

        let mut probabilities = Vec::with_capacity(input.len());
        for (i, row) in input.iter().enumerate() {
            if row.len() != width {
                return Err(AiError::validation(format!(
                    "input row {i} has {} features, model expects {width}",
                    row.len()
                )));
            }
            probabilities.push(artifact.network.predict_proba(row));
        }

        let labels = probabilities
            .iter()
            .map(|p| u8::from(*p > artifact.threshold))
            .collect();
        let confidence = if probabilities.is_empty() {
            0.0
        } else {
            probabilities.iter().map(|p| p.max(1.0 - p)).sum::<f64>() / probabilities.len() as f64
        };

        Ok(Inference::new(
            PredictionOutput::Classification {
                labels,
                probabilities,
            },
            confidence,
        ))
    }
}
