use crate::config::Config;
use crate::types::activity::Activity;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct AppState {
    cache: Arc<DashMap<String, CachedActivity>>,
    config: Arc<Config>,
}

struct CachedActivity {
    activity: Arc<Activity>,
    inserted_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            cache: Arc::new(DashMap::new()),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn insert(&self, activity_id: String, activity: Activity) {
        self.cache.insert(
            activity_id,
            CachedActivity {
                activity: Arc::new(activity),
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn get(&self, activity_id: &str) -> Option<Arc<Activity>> {
        self.cache
            .get(activity_id)
            .map(|entry| Arc::clone(&entry.activity))
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn evict_expired(&self, ttl: Duration) {
        let now = Instant::now();
        self.cache
            .retain(|_, cached| now.duration_since(cached.inserted_at) < ttl);
        tracing::info!("Cache eviction complete. Current size: {}", self.cache.len());
    }
}
