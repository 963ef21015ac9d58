use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SseConfig;
use crate::db::NotificationRepository;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{
    NewNotification, Notification, NotificationSort, NotificationView, Page, PageRequest,
};
use crate::sse::{event_stream, id_timestamp, EmitterRegistry, EventStream, SseEvent};

pub const HANDSHAKE_EVENT: &str = "sse";
pub const NOTIFICATION_EVENT: &str = "notification";

/// Notification persistence plus live delivery over server-sent events
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
    registry: Arc<EmitterRegistry>,
    config: SseConfig,
}

impl NotificationService {
    pub fn new(
        repo: Arc<dyn NotificationRepository>,
        registry: Arc<EmitterRegistry>,
        config: SseConfig,
    ) -> Self {
        Self {
            repo,
            registry,
            config,
        }
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        view: NotificationView,
        sort: NotificationSort,
        page: PageRequest,
    ) -> Result<Page<Notification>> {
        let (rows, total) = self.repo.list(user_id, view, sort, page).await?;
        Ok(Page::new(rows, page, total))
    }

    pub async fn mark_read(&self, user_id: Uuid, ids: Vec<Uuid>) -> Result<u64> {
        let updated = self.repo.mark_read(user_id, ids).await?;
        debug!(user_id = %user_id, updated, "notifications marked read");
        Ok(updated)
    }

    /// Open a stream for `user_id`: handshake first, then any cached events
    /// newer than `last_event_id`, then live pushes.
    pub fn subscribe(&self, user_id: Uuid, last_event_id: Option<&str>) -> EventStream {
        let user_key = user_id.to_string();
        let emitter_id = self.registry.make_id(&user_key);
        let (sender, mut receiver) = mpsc::channel(self.config.channel_capacity.max(1));
        self.registry.save(emitter_id.clone(), sender);

        let mut initial = vec![SseEvent::new(
            emitter_id.clone(),
            HANDSHAKE_EVENT,
            format!("EventStream Created. [userId={user_id}]"),
        )];
        if let Some(last_event_id) = last_event_id.map(str::trim).filter(|id| !id.is_empty()) {
            let replayed = self.replay_after(&user_key, last_event_id);
            initial.extend(merge_live(replayed, &mut receiver));
        }

        debug!(user_id = %user_id, emitter_id = %emitter_id, replayed = initial.len() - 1, "notification stream opened");
        event_stream(
            Arc::clone(&self.registry),
            emitter_id,
            initial,
            receiver,
            Duration::from_secs(self.config.emitter_timeout_secs),
        )
    }

    /// Cached events of the user newer than `last_event_id`, oldest first
    fn replay_after(&self, user_key: &str, last_event_id: &str) -> Vec<SseEvent> {
        let Some(since) = id_timestamp(last_event_id) else {
            warn!(last_event_id, "ignoring malformed Last-Event-ID");
            return Vec::new();
        };

        let mut missed: Vec<(i64, SseEvent)> = self
            .registry
            .find_all_event_cache_start_with_by_user_id(user_key)
            .into_iter()
            .filter_map(|(id, event)| id_timestamp(&id).map(|ts| (ts, event)))
            .filter(|(ts, _)| *ts > since)
            .collect();
        missed.sort_by_key(|(ts, _)| *ts);
        missed.into_iter().map(|(_, event)| event).collect()
    }

    /// Persist a notification, cache it for replay and push it to every open
    /// stream of its owner
    pub async fn send(&self, notification: NewNotification) -> Result<Notification> {
        let stored = self.repo.insert(notification).await?;
        let user_key = stored.user_id.to_string();

        let payload = serde_json::to_string(&stored)
            .map_err(|e| AppError::Internal(format!("Failed to encode notification: {e}")))?;
        let event_id = self.registry.make_id(&user_key);
        let event = SseEvent::new(event_id.clone(), NOTIFICATION_EVENT, payload);
        self.registry.save_event_cache(event_id, event.clone());

        for (emitter_id, emitter) in self.registry.find_all_emitter_start_with_by_user_id(&user_key)
        {
            match emitter.try_send(event.clone()) {
                Ok(()) => metrics::NOTIFICATIONS_PUSHED.inc(),
                Err(TrySendError::Closed(_)) => {
                    self.registry.delete_by_id(&emitter_id);
                    metrics::SSE_EVENTS_DROPPED.with_label_values(&["closed"]).inc();
                    debug!(emitter_id = %emitter_id, "pruned closed emitter");
                }
                Err(TrySendError::Full(_)) => {
                    metrics::SSE_EVENTS_DROPPED.with_label_values(&["full"]).inc();
                    warn!(emitter_id = %emitter_id, "emitter buffer full; event dropped");
                }
            }
        }

        Ok(stored)
    }

    /// Close every stream of the user and forget their cached events
    pub fn disconnect_user(&self, user_id: Uuid) {
        let user_key = user_id.to_string();
        self.registry.delete_all_emitter_start_with_id(&user_key);
        self.registry.delete_all_event_cache_start_with_id(&user_key);
    }

    pub fn registry(&self) -> &Arc<EmitterRegistry> {
        &self.registry
    }
}

/// Append whatever was pushed live while the replay snapshot was taken,
/// skipping events the snapshot already holds
fn merge_live(replayed: Vec<SseEvent>, live: &mut mpsc::Receiver<SseEvent>) -> Vec<SseEvent> {
    let seen: HashSet<String> = replayed.iter().map(|e| e.id.clone()).collect();
    let mut merged = replayed;
    while let Ok(event) = live.try_recv() {
        if !seen.contains(&event.id) {
            merged.push(event);
        }
    }
    merged
}
