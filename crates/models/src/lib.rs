//! Lifecycle records of the ML pipeline.
//!
//! Deterministic state only: every transition takes its timestamp as an
//! argument and nothing here touches storage or threads.

pub mod metric;
pub mod model;
pub mod prediction;
pub mod training_job;

pub use metric::{DatasetType, ModelMetric};
pub use model::{Model, ModelStatus, NewModel};
pub use prediction::Prediction;
pub use training_job::{TrainingJob, TrainingJobStatus};
