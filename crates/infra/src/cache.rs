//! Bounded, TTL-based cache of decoded model artifacts.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use forgeml_ai::ModelArtifact;
use forgeml_core::{ModelId, TenantId};

/// `(tenant, model, artifact revision)`. A retrain bumps the revision, so an
/// entry for an older artifact is never looked up again.
pub type CacheKey = (TenantId, ModelId, u64);

#[derive(Debug)]
struct Entry {
    artifact: Arc<ModelArtifact>,
    inserted_at: Instant,
    last_access: Instant,
}

/// Artifact cache injected into the prediction service.
///
/// Entries expire `ttl` after insertion; when full, the least recently used
/// entry is evicted.
#[derive(Debug)]
pub struct ArtifactCache {
    capacity: usize,
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, Entry>>,
}

impl ArtifactCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// A cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<ModelArtifact>> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&self, key: CacheKey, artifact: Arc<ModelArtifact>) {
        self.insert_at(key, artifact, Instant::now());
    }

    /// Lookup as of `now`; an expired entry is dropped and reported as a miss.
    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<Arc<ModelArtifact>> {
        let mut entries = self.entries.lock().ok()?;
        let expired = match entries.get_mut(key) {
            Some(entry) if now.saturating_duration_since(entry.inserted_at) < self.ttl => {
                entry.last_access = now;
                return Some(entry.artifact.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    pub fn insert_at(&self, key: CacheKey, artifact: Arc<ModelArtifact>, now: Instant) {
        if self.capacity == 0 {
            return;
        }
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };

        let ttl = self.ttl;
        entries.retain(|_, e| now.saturating_duration_since(e.inserted_at) < ttl);

        while entries.len() >= self.capacity && !entries.contains_key(&key) {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| *k)
            else {
                break;
            };
            entries.remove(&oldest);
        }

        entries.insert(
            key,
            Entry {
                artifact,
                inserted_at: now,
                last_access: now,
            },
        );
    }

    /// Drop every cached version of a model.
    pub fn invalidate_model(&self, tenant_id: TenantId, model_id: ModelId) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|(t, m, _), _| !(*t == tenant_id && *m == model_id));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
