/// Admin handlers - user moderation, post removal and quiz reports
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::handlers::users::PageOnly;
use crate::handlers::{ack, PageQuery};
use crate::middleware::AdminUser;
use crate::models::{PageRequest, PostSort, SuspendStatus, UserSort};
use crate::AppState;

fn default_suspension_days() -> u32 {
    7
}

#[derive(Debug, Deserialize, Validate)]
pub struct SuspensionQuery {
    pub status: SuspendStatus,
    /// Length of a suspension; ignored when lifting one
    #[serde(default = "default_suspension_days")]
    #[validate(range(min = 1, max = 3650, message = "days must be between 1 and 3650"))]
    pub days: u32,
}

pub async fn list_users(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<PageQuery<UserSort>>,
) -> Result<HttpResponse> {
    let page = state
        .admin
        .list_users(query.page_request(), query.sort)
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn delete_user(
    state: web::Data<AppState>,
    AdminUser(admin): AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.admin.delete_user(admin.id, path.into_inner()).await?;
    Ok(ack("user deleted"))
}

pub async fn set_suspension(
    state: web::Data<AppState>,
    AdminUser(admin): AdminUser,
    path: web::Path<Uuid>,
    query: web::Query<SuspensionQuery>,
) -> Result<HttpResponse> {
    query.validate()?;
    state
        .admin
        .set_suspension(admin.id, path.into_inner(), query.status, query.days)
        .await?;
    Ok(ack("user status changed"))
}

pub async fn list_posts(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<PageQuery<PostSort>>,
) -> Result<HttpResponse> {
    let page = state
        .admin
        .list_posts(query.page_request(), query.sort)
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn list_reports(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<PageOnly>,
) -> Result<HttpResponse> {
    let page = state.quizzes.reports(PageRequest::of(query.page)).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn delete_post(
    state: web::Data<AppState>,
    AdminUser(admin): AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.admin.delete_post(admin.id, path.into_inner()).await?;
    Ok(ack("post deleted"))
}
