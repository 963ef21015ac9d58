/// Post handlers - posts, their likes and comments
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::handlers::{ack, PageQuery};
use crate::middleware::AuthUser;
use crate::models::{PageRequest, PostInput, PostSort};
use crate::validators::validate_not_blank;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostRequest {
    #[validate(range(min = 1, message = "categoryId must be positive"))]
    pub category_id: i64,
    #[validate(custom(function = "validate_not_blank"))]
    pub title: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub content: String,
}

impl From<PostRequest> for PostInput {
    fn from(req: PostRequest) -> Self {
        Self {
            category_id: req.category_id,
            title: req.title,
            content: req.content,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub sort: PostSort,
}

pub async fn categories(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.posts.categories().await?))
}

pub async fn create(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<PostRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    state.posts.create(user.id, body.into_inner().into()).await?;
    Ok(ack("post created"))
}

pub async fn get(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post = state.posts.get(user.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

pub async fn update(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<PostRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    state
        .posts
        .update(user.id, path.into_inner(), body.into_inner().into())
        .await?;
    Ok(ack("post updated"))
}

pub async fn delete(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.posts.delete(user.id, path.into_inner()).await?;
    Ok(ack("post deleted"))
}

pub async fn search(
    state: web::Data<AppState>,
    _user: AuthUser,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let page = state
        .posts
        .search(query.keyword.trim().to_string(), query.sort, PageRequest::of(query.page))
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn by_category(
    state: web::Data<AppState>,
    _user: AuthUser,
    path: web::Path<i64>,
    query: web::Query<PageQuery<PostSort>>,
) -> Result<HttpResponse> {
    let page = state
        .posts
        .by_category(path.into_inner(), query.sort, query.page_request())
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn like(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.posts.like(user.id, path.into_inner()).await?;
    Ok(ack("like added"))
}

pub async fn unlike(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.posts.unlike(user.id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn create_comment(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let comment = state
        .comments
        .create(user.id, path.into_inner(), &body.content)
        .await?;
    Ok(HttpResponse::Ok().json(comment))
}

pub async fn update_comment(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<CommentRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let (_post_id, comment_id) = path.into_inner();
    state
        .comments
        .update(user.id, comment_id, &body.content)
        .await?;
    Ok(ack("comment updated"))
}

pub async fn delete_comment(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse> {
    let (_post_id, comment_id) = path.into_inner();
    state.comments.delete(user.id, comment_id).await?;
    Ok(ack("comment deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_request_rules() {
        let req: PostRequest = serde_json::from_value(serde_json::json!({
            "categoryId": 0,
            "title": "  ",
            "content": "body"
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("category_id"));
        assert!(fields.contains_key("title"));
        assert!(!fields.contains_key("content"));
    }

    #[test]
    fn blank_comment_is_rejected() {
        let req = CommentRequest {
            content: "\n\t".into(),
        };
        assert!(req.validate().is_err());
    }
}
