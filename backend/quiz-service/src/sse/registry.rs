use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::event::SseEvent;

/// Sending half of one subscriber connection
pub type Emitter = mpsc::Sender<SseEvent>;

struct CachedEvent {
    event: SseEvent,
    cached_at: Instant,
}

/// In-process registry of open notification streams and recently sent events.
///
/// Keys have the form `"{userId}_{millis}"`; lookups by user scan for the
/// `"{userId}_"` prefix.
pub struct EmitterRegistry {
    emitters: DashMap<String, Emitter>,
    event_cache: DashMap<String, CachedEvent>,
    last_millis: AtomicI64,
}

impl Default for EmitterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EmitterRegistry {
    pub fn new() -> Self {
        Self {
            emitters: DashMap::new(),
            event_cache: DashMap::new(),
            last_millis: AtomicI64::new(0),
        }
    }

    /// Mint a `"{userId}_{millis}"` id. Millis strictly increase across calls.
    pub fn make_id(&self, user_id: &str) -> String {
        format!("{user_id}_{}", self.next_millis())
    }

    fn next_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last_millis.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self.last_millis.compare_exchange_weak(
                prev,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }

    pub fn save(&self, emitter_id: String, emitter: Emitter) -> Emitter {
        self.emitters.insert(emitter_id, emitter.clone());
        emitter
    }

    pub fn save_event_cache(&self, event_id: String, event: SseEvent) {
        self.event_cache.insert(
            event_id,
            CachedEvent {
                event,
                cached_at: Instant::now(),
            },
        );
    }

    pub fn find_all_emitter_start_with_by_user_id(&self, user_id: &str) -> Vec<(String, Emitter)> {
        let prefix = user_prefix(user_id);
        self.emitters
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn find_all_event_cache_start_with_by_user_id(
        &self,
        user_id: &str,
    ) -> Vec<(String, SseEvent)> {
        let prefix = user_prefix(user_id);
        self.event_cache
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| (entry.key().clone(), entry.value().event.clone()))
            .collect()
    }

    pub fn delete_by_id(&self, emitter_id: &str) {
        self.emitters.remove(emitter_id);
    }

    pub fn delete_all_emitter_start_with_id(&self, user_id: &str) {
        let prefix = user_prefix(user_id);
        self.emitters.retain(|key, _| !key.starts_with(&prefix));
    }

    pub fn delete_all_event_cache_start_with_id(&self, user_id: &str) {
        let prefix = user_prefix(user_id);
        self.event_cache.retain(|key, _| !key.starts_with(&prefix));
    }

    pub fn emitter_count(&self) -> usize {
        self.emitters.len()
    }

    /// Forget every emitter and cached event; open streams end
    pub fn clear(&self) {
        self.emitters.clear();
        self.event_cache.clear();
    }

    /// Drop cached events at least `ttl` old; returns how many were removed
    pub fn evict_expired_events(&self, ttl: Duration) -> usize {
        let before = self.event_cache.len();
        self.event_cache
            .retain(|_, cached| cached.cached_at.elapsed() < ttl);
        before.saturating_sub(self.event_cache.len())
    }

    /// Periodic event-cache sweep
    pub fn spawn_eviction(self: &Arc<Self>, ttl: Duration, every: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let evicted = registry.evict_expired_events(ttl);
                if evicted > 0 {
                    debug!(evicted, "evicted expired notification events");
                }
            }
        })
    }
}

fn user_prefix(user_id: &str) -> String {
    format!("{user_id}_")
}
