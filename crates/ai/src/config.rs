//! Training configuration: shared optimiser settings plus a closed, per-type
//! parameter union.

use serde::{Deserialize, Serialize};

use crate::model_type::ModelType;
use crate::result::{AiError, AiResult};

/// Current schema tag written into every serialized [`TrainingConfig`].
pub const CONFIG_SCHEMA_VERSION: u16 = 1;

/// Algorithm-specific parameters. The variant must match the model type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlgorithmParams {
    Regression,
    Classification {
        /// Units of each hidden dense layer (relu).
        hidden_layers: Vec<usize>,
        /// Dropout rate applied after the first hidden layer during training.
        dropout: f64,
    },
    TimeSeries {
        window_size: usize,
    },
    Clustering {
        k: usize,
        max_iterations: usize,
    },
}

impl AlgorithmParams {
    pub const DEFAULT_HIDDEN_LAYERS: [usize; 2] = [64, 32];
    pub const DEFAULT_DROPOUT: f64 = 0.2;
    pub const DEFAULT_WINDOW_SIZE: usize = 7;
    pub const DEFAULT_K: usize = 3;
    pub const DEFAULT_MAX_ITERATIONS: usize = 100;

    pub fn defaults_for(model_type: ModelType) -> Self {
        match model_type {
            ModelType::Regression => AlgorithmParams::Regression,
            ModelType::Classification => AlgorithmParams::Classification {
                hidden_layers: Self::DEFAULT_HIDDEN_LAYERS.to_vec(),
                dropout: Self::DEFAULT_DROPOUT,
            },
            ModelType::TimeSeries => AlgorithmParams::TimeSeries {
                window_size: Self::DEFAULT_WINDOW_SIZE,
            },
            ModelType::Clustering => AlgorithmParams::Clustering {
                k: Self::DEFAULT_K,
                max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            },
        }
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            AlgorithmParams::Regression => ModelType::Regression,
            AlgorithmParams::Classification { .. } => ModelType::Classification,
            AlgorithmParams::TimeSeries { .. } => ModelType::TimeSeries,
            AlgorithmParams::Clustering { .. } => ModelType::Clustering,
        }
    }

    /// Check the variant against `model_type` and the values against their ranges.
    pub fn validate_for(&self, model_type: ModelType) -> AiResult<()> {
        if self.model_type() != model_type {
            return Err(AiError::validation(format!(
                "{} parameters supplied for a {} model",
                self.model_type(),
                model_type
            )));
        }

        match self {
            AlgorithmParams::Regression => Ok(()),
            AlgorithmParams::Classification {
                hidden_layers,
                dropout,
            } => {
                if hidden_layers.iter().any(|units| *units == 0) {
                    return Err(AiError::validation("hidden layers must have at least one unit"));
                }
                if !(0.0..1.0).contains(dropout) {
                    return Err(AiError::validation("dropout must be in [0, 1)"));
                }
                Ok(())
            }
            AlgorithmParams::TimeSeries { window_size } => {
                if *window_size == 0 {
                    return Err(AiError::validation("window_size must be >= 1"));
                }
                Ok(())
            }
            AlgorithmParams::Clustering { k, max_iterations } => {
                if *k == 0 {
                    return Err(AiError::validation("k must be >= 1"));
                }
                if *max_iterations == 0 {
                    return Err(AiError::validation("max_iterations must be >= 1"));
                }
                Ok(())
            }
        }
    }
}

/// Snapshot of everything a training run needs besides the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    #[serde(default = "current_schema")]
    pub schema_version: u16,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Trailing fraction of rows held out for validation (classification).
    pub validation_split: f64,
    /// Seed for weight initialisation, shuffling and dropout.
    pub seed: u64,
    pub params: AlgorithmParams,
}

fn current_schema() -> u16 {
    CONFIG_SCHEMA_VERSION
}

impl TrainingConfig {
    pub const DEFAULT_EPOCHS: usize = 100;
    pub const DEFAULT_BATCH_SIZE: usize = 32;
    pub const DEFAULT_LEARNING_RATE: f64 = 0.001;
    pub const DEFAULT_VALIDATION_SPLIT: f64 = 0.2;
    pub const DEFAULT_SEED: u64 = 42;

    pub fn new(params: AlgorithmParams) -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            epochs: Self::DEFAULT_EPOCHS,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            learning_rate: Self::DEFAULT_LEARNING_RATE,
            validation_split: Self::DEFAULT_VALIDATION_SPLIT,
            seed: Self::DEFAULT_SEED,
            params,
        }
    }

    pub fn defaults_for(model_type: ModelType) -> Self {
        Self::new(AlgorithmParams::defaults_for(model_type))
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_validation_split(mut self, validation_split: f64) -> Self {
        self.validation_split = validation_split;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_params(mut self, params: AlgorithmParams) -> Self {
        self.params = params;
        self
    }

    pub fn model_type(&self) -> ModelType {
        self.params.model_type()
    }

    pub fn validate_for(&self, model_type: ModelType) -> AiResult<()> {
        if self.schema_version != CONFIG_SCHEMA_VERSION {
            return Err(AiError::validation(format!(
                "unsupported config schema version {} (expected {CONFIG_SCHEMA_VERSION})",
                self.schema_version
            )));
        }
        if self.epochs == 0 {
            return Err(AiError::validation("epochs must be >= 1"));
        }
        if self.batch_size == 0 {
            return Err(AiError::validation("batch_size must be >= 1"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(AiError::validation("learning_rate must be a finite positive number"));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(AiError::validation("validation_split must be in [0, 1)"));
        }
        self.params.validate_for(model_type)
    }
}
