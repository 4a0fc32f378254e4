//! Training dataset representation and type-specific validation.

use serde::{Deserialize, Serialize};

use crate::config::{AlgorithmParams, TrainingConfig};
use crate::model_type::ModelType;
use crate::result::{AiError, AiResult};

/// One target cell. Labels are accepted on the wire so that a non-numeric
/// target can be reported as a validation error instead of a parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetValue {
    Number(f64),
    Label(String),
}

impl From<f64> for TargetValue {
    fn from(value: f64) -> Self {
        TargetValue::Number(value)
    }
}

impl From<&str> for TargetValue {
    fn from(value: &str) -> Self {
        TargetValue::Label(value.to_string())
    }
}

/// Feature matrix plus optional target column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingData {
    #[serde(default)]
    pub features: Vec<Vec<f64>>,
    #[serde(default)]
    pub target: Vec<TargetValue>,
}

impl TrainingData {
    pub fn new(features: Vec<Vec<f64>>, target: Vec<TargetValue>) -> Self {
        Self { features, target }
    }

    /// Numeric dataset, the common case in tests and callers.
    pub fn numeric(features: Vec<Vec<f64>>, target: Vec<f64>) -> Self {
        Self::new(features, target.into_iter().map(TargetValue::Number).collect())
    }

    pub fn unlabeled(features: Vec<Vec<f64>>) -> Self {
        Self::new(features, Vec::new())
    }

    /// Target-only series (time-series models).
    pub fn series(values: Vec<f64>) -> Self {
        Self::numeric(Vec::new(), values)
    }

    /// Number of samples (rows, or target length when there are no rows).
    pub fn len(&self) -> usize {
        if self.features.is_empty() {
            self.target.len()
        } else {
            self.features.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Width of the feature matrix; rows must be non-empty, equal-width and finite.
    pub fn feature_width(&self) -> AiResult<usize> {
        let first = self
            .features
            .first()
            .ok_or_else(|| AiError::validation("feature matrix is empty"))?;
        let width = first.len();
        if width == 0 {
            return Err(AiError::validation("feature rows must not be empty"));
        }
        for (i, row) in self.features.iter().enumerate() {
            if row.len() != width {
                return Err(AiError::validation(format!(
                    "feature row {i} has {} columns, expected {width}",
                    row.len()
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(AiError::validation(format!(
                    "feature row {i} contains a non-finite value"
                )));
            }
        }
        Ok(width)
    }

    /// Target as numbers; any label or non-finite value is a validation error.
    pub fn numeric_target(&self) -> AiResult<Vec<f64>> {
        if self.target.is_empty() {
            return Err(AiError::validation("target column is empty"));
        }
        self.target
            .iter()
            .enumerate()
            .map(|(i, v)| match v {
                TargetValue::Number(n) if n.is_finite() => Ok(*n),
                TargetValue::Number(_) => Err(AiError::validation(format!(
                    "target value at row {i} is not finite"
                ))),
                TargetValue::Label(label) => Err(AiError::validation(format!(
                    "target value at row {i} is not numeric: {label:?}"
                ))),
            })
            .collect()
    }

    /// Target as binary labels (0.0 / 1.0).
    pub fn binary_target(&self) -> AiResult<Vec<f64>> {
        let values = self.numeric_target()?;
        if let Some((i, v)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| **v != 0.0 && **v != 1.0)
        {
            return Err(AiError::validation(format!(
                "classification target at row {i} must be 0 or 1, got {v}"
            )));
        }
        Ok(values)
    }

    /// Validate the dataset for a model of `model_type` trained with `config`.
    ///
    /// `feature_columns` is the declared width of the model; 0 skips the
    /// width check.
    pub fn validate_for(
        &self,
        model_type: ModelType,
        feature_columns: usize,
        config: &TrainingConfig,
    ) -> AiResult<()> {
        match model_type {
            ModelType::Regression | ModelType::Classification => {
                let width = self.feature_width()?;
                check_declared_width(width, feature_columns)?;
                if model_type == ModelType::Classification {
                    self.binary_target()?;
                } else {
                    self.numeric_target()?;
                }
                self.check_target_len()?;
                if self.features.len() < 2 {
                    return Err(AiError::validation("at least two rows are required"));
                }
                Ok(())
            }
            ModelType::TimeSeries => {
                let values = self.numeric_target()?;
                if !self.features.is_empty() {
                    self.feature_width()?;
                    self.check_target_len()?;
                }
                if let AlgorithmParams::TimeSeries { window_size } = config.params {
                    if values.len() <= window_size {
                        return Err(AiError::validation(format!(
                            "series of length {} is too short for window {window_size}",
                            values.len()
                        )));
                    }
                }
                Ok(())
            }
            ModelType::Clustering => {
                let width = self.feature_width()?;
                check_declared_width(width, feature_columns)?;
                if let AlgorithmParams::Clustering { k, .. } = config.params {
                    if k > self.features.len() {
                        return Err(AiError::validation(format!(
                            "k={k} exceeds the number of rows ({})",
                            self.features.len()
                        )));
                    }
                }
                Ok(())
            }
        }
    }

    fn check_target_len(&self) -> AiResult<()> {
        if self.target.len() != self.features.len() {
            return Err(AiError::validation(format!(
                "feature/target length mismatch: {} rows vs {} targets",
                self.features.len(),
                self.target.len()
            )));
        }
        Ok(())
    }
}

fn check_declared_width(width: usize, declared: usize) -> AiResult<()> {
    if declared > 0 && width != declared {
        return Err(AiError::validation(format!(
            "rows have {width} features but the model declares {declared} feature columns"
        )));
    }
    Ok(())
}
