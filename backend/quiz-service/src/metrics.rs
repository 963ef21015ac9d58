//! Prometheus metrics for quiz-service.
//!
//! Collectors register into the default registry; `/metrics` renders them.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    /// Open notification streams.
    pub static ref SSE_CONNECTIONS: IntGauge = register_int_gauge!(
        "quiz_sse_connections",
        "Currently open notification event streams"
    )
    .expect("failed to register quiz_sse_connections");

    /// Notification frames handed to a live emitter.
    pub static ref NOTIFICATIONS_PUSHED: IntCounter = register_int_counter!(
        "quiz_notifications_pushed_total",
        "Notification events delivered to an open stream"
    )
    .expect("failed to register quiz_notifications_pushed_total");

    /// Events that could not be handed to an emitter (full/closed).
    pub static ref SSE_EVENTS_DROPPED: IntCounterVec = register_int_counter_vec!(
        "quiz_sse_events_dropped_total",
        "Notification events dropped segmented by reason",
        &["reason"]
    )
    .expect("failed to register quiz_sse_events_dropped_total");

    /// Grading results (correct/incorrect).
    pub static ref QUIZ_GRADINGS: IntCounterVec = register_int_counter_vec!(
        "quiz_gradings_total",
        "Quiz answers graded segmented by outcome",
        &["outcome"]
    )
    .expect("failed to register quiz_gradings_total");
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
