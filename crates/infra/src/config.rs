//! Pipeline configuration.

use std::time::Duration;

/// Tunables of the training and prediction services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Wall-clock budget of one training job.
    pub training_deadline: Duration,
    /// Maximum number of decoded artifacts kept in memory (0 disables caching).
    pub artifact_cache_capacity: usize,
    pub artifact_cache_ttl: Duration,
    /// Attempts for an optimistic model update before giving up.
    pub update_retries: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            training_deadline: Duration::from_secs(600),
            artifact_cache_capacity: 128,
            artifact_cache_ttl: Duration::from_secs(300),
            update_retries: 5,
        }
    }
}

impl PipelineConfig {
    pub const ENV_TRAINING_DEADLINE_SECS: &'static str = "FORGEML_TRAINING_DEADLINE_SECS";
    pub const ENV_ARTIFACT_CACHE_CAPACITY: &'static str = "FORGEML_ARTIFACT_CACHE_CAPACITY";
    pub const ENV_ARTIFACT_CACHE_TTL_SECS: &'static str = "FORGEML_ARTIFACT_CACHE_TTL_SECS";
    pub const ENV_UPDATE_RETRIES: &'static str = "FORGEML_UPDATE_RETRIES";

    /// Defaults overridden by any `FORGEML_*` variable that is set.
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(secs) = parse::<u64>(&lookup, Self::ENV_TRAINING_DEADLINE_SECS) {
            config.training_deadline = Duration::from_secs(secs);
        }
        if let Some(capacity) = parse::<usize>(&lookup, Self::ENV_ARTIFACT_CACHE_CAPACITY) {
            config.artifact_cache_capacity = capacity;
        }
        if let Some(secs) = parse::<u64>(&lookup, Self::ENV_ARTIFACT_CACHE_TTL_SECS) {
            config.artifact_cache_ttl = Duration::from_secs(secs);
        }
        if let Some(retries) = parse::<u32>(&lookup, Self::ENV_UPDATE_RETRIES) {
            config.update_retries = retries.max(1);
        }
        config
    }

    pub fn with_training_deadline(mut self, deadline: Duration) -> Self {
        self.training_deadline = deadline;
        self
    }

    pub fn with_artifact_cache_capacity(mut self, capacity: usize) -> Self {
        self.artifact_cache_capacity = capacity;
        self
    }

    pub fn with_artifact_cache_ttl(mut self, ttl: Duration) -> Self {
        self.artifact_cache_ttl = ttl;
        self
    }

    pub fn with_update_retries(mut self, retries: u32) -> Self {
        self.update_retries = retries.max(1);
        self
    }
}

fn parse<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable configuration value");
            None
        }
    }
}
