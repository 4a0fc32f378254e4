use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::result::AiError;

/// Kind of model; selects both the trainer and the predictor.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelType {
    Regression,
    Classification,
    TimeSeries,
    Clustering,
}

impl ModelType {
    pub const ALL: [ModelType; 4] = [
        ModelType::Regression,
        ModelType::Classification,
        ModelType::TimeSeries,
        ModelType::Clustering,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Regression => "REGRESSION",
            ModelType::Classification => "CLASSIFICATION",
            ModelType::TimeSeries => "TIME_SERIES",
            ModelType::Clustering => "CLUSTERING",
        }
    }

    /// Whether training requires a target column.
    pub fn is_supervised(&self) -> bool {
        !matches!(self, ModelType::Clustering)
    }
}

impl core::fmt::Display for ModelType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = AiError;

    /// Accepts the canonical labels case-insensitively, with `-`/`_`/no separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "regression" => Ok(ModelType::Regression),
            "classification" => Ok(ModelType::Classification),
            "timeseries" => Ok(ModelType::TimeSeries),
            "clustering" => Ok(ModelType::Clustering),
            _ => Err(AiError::UnsupportedModelType(s.to_string())),
        }
    }
}
