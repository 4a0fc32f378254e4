//! `forgeml-core`: shared building blocks for the model lifecycle crates.
//!
//! This crate contains **pure** primitives (identifiers, errors, optimistic
//! concurrency). No storage, threading or numeric code lives here.

pub mod aggregate;
pub mod error;
pub mod id;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{MetricId, ModelId, PredictionId, TenantId, TrainingJobId};
