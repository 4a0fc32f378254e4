//! Infrastructure layer: persistence contract, artifact cache, training
//! orchestration and the caller-facing pipeline.

pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod prediction;
pub mod store;
pub mod training;

pub use cache::{ArtifactCache, CacheKey};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use pipeline::MlPipeline;
pub use prediction::{PredictionRequest, PredictionResult, PredictionService};
pub use store::{
    InMemoryModelStore, ModelFilter, ModelStore, StoreError, StoreResult, update_model_with_retry,
    write_with_retry,
};
pub use training::{TrainingHandle, TrainingOrchestrator, TrainingOutcome};
