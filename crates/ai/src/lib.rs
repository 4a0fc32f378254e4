//! `forgeml-ai`
//!
//! **Responsibility:** the numeric half of the model lifecycle.
//!
//! This crate is storage-agnostic and tenant-agnostic:
//! - It never persists anything and never reads the clock.
//! - Training consumes a [`TrainingData`] + [`TrainingConfig`] and returns an
//!   artifact plus metrics; prediction consumes an artifact and an input matrix.
//! - Model type dispatch happens once, in [`algorithm_for`].

pub mod algorithm;
pub mod artifact;
pub mod classification;
pub mod clustering;
pub mod config;
pub mod data;
pub mod linalg;
pub mod metrics;
pub mod model_type;
pub mod network;
pub mod regression;
pub mod result;
pub mod time_series;

pub use algorithm::{Algorithm, TrainedModel, algorithm_for};
pub use artifact::{
    ARTIFACT_SCHEMA_VERSION, ClassificationArtifact, ClusteringArtifact, ModelArtifact,
    RegressionArtifact, TimeSeriesArtifact,
};
pub use config::{AlgorithmParams, CONFIG_SCHEMA_VERSION, TrainingConfig};
pub use data::{TargetValue, TrainingData};
pub use metrics::{ConfusionCounts, MetricKind, TrainingMetrics};
pub use model_type::ModelType;
pub use result::{AiError, AiResult, Inference, PredictionOutput};
