/// Notification handlers - listing, read marks and the event stream
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::handlers::ack;
use crate::middleware::AuthUser;
use crate::models::{NotificationSort, NotificationView, PageRequest};
use crate::AppState;

pub const LAST_EVENT_ID: &str = "Last-Event-ID";

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub sort: NotificationSort,
    #[serde(default)]
    pub view: NotificationView,
}

pub async fn list(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    let page = state
        .notifications
        .list(user.id, query.view, query.sort, PageRequest::of(query.page))
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Body is a bare JSON array of notification ids
pub async fn mark_read(
    state: web::Data<AppState>,
    user: AuthUser,
    ids: web::Json<Vec<Uuid>>,
) -> Result<HttpResponse> {
    state
        .notifications
        .mark_read(user.id, ids.into_inner())
        .await?;
    Ok(ack("successfully processed"))
}

/// `text/event-stream` of the caller's notifications
pub async fn subscribe(
    state: web::Data<AppState>,
    user: AuthUser,
    req: HttpRequest,
) -> HttpResponse {
    let last_event_id = req
        .headers()
        .get(LAST_EVENT_ID)
        .and_then(|value| value.to_str().ok());

    let stream = state.notifications.subscribe(user.id, last_event_id);
    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .insert_header(("X-Accel-Buffering", "no"))
        .streaming(stream)
}
