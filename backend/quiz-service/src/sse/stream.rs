use actix_web::web::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use super::event::SseEvent;
use super::registry::EmitterRegistry;
use crate::metrics;

pub type EventStream = BoxStream<'static, Result<Bytes, Infallible>>;

/// Removes the emitter once its stream is dropped, whether by timeout,
/// client disconnect or registry teardown.
struct EmitterGuard {
    registry: Arc<EmitterRegistry>,
    emitter_id: String,
}

impl Drop for EmitterGuard {
    fn drop(&mut self) {
        self.registry.delete_by_id(&self.emitter_id);
        metrics::SSE_CONNECTIONS.dec();
        debug!(emitter_id = %self.emitter_id, "notification stream closed");
    }
}

/// Body stream for one subscriber: `initial` frames first, then whatever
/// arrives on `receiver` until `timeout` elapses or every sender is gone.
pub fn event_stream(
    registry: Arc<EmitterRegistry>,
    emitter_id: String,
    initial: Vec<SseEvent>,
    receiver: mpsc::Receiver<SseEvent>,
    timeout: Duration,
) -> EventStream {
    metrics::SSE_CONNECTIONS.inc();
    let guard = EmitterGuard {
        registry,
        emitter_id,
    };
    let deadline = tokio::time::Instant::now() + timeout;

    let live = stream::unfold((receiver, guard), move |(mut receiver, guard)| async move {
        tokio::select! {
            event = receiver.recv() => event.map(|e| (Ok(e.to_frame()), (receiver, guard))),
            _ = tokio::time::sleep_until(deadline) => None,
        }
    });

    stream::iter(initial.into_iter().map(|e| Ok(e.to_frame())))
        .chain(live)
        .boxed()
}
