/// User handlers - the caller's own account and their lists
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use validator::Validate;

use crate::error::Result;
use crate::handlers::{ack, PageQuery};
use crate::middleware::AuthUser;
use crate::models::{PageRequest, PostSort, QuizListScope};
use crate::services::ProfileUpdate;
use crate::validators::{validate_nickname, validate_not_blank, validate_password, validate_username};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct UsernameRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct NicknameRequest {
    #[validate(custom(function = "validate_nickname"))]
    pub nickname: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MailRequest {
    #[validate(email(message = "invalid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MailCodeRequest {
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(equal = 6, message = "code must be 6 digits"))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfoRequest {
    #[validate(custom(function = "validate_nickname"))]
    pub nickname: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub major_name: String,
    pub agree_email: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub current_password: String,
    #[validate(custom(function = "validate_password"))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PasswordRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PageOnly {
    #[serde(default)]
    pub page: i64,
}

#[derive(Debug, Deserialize)]
pub struct TriedQuery {
    pub solved: bool,
    #[serde(default)]
    pub page: i64,
}

pub async fn verify_username(
    state: web::Data<AppState>,
    body: web::Json<UsernameRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    state.auth.ensure_username_available(&body.username).await?;
    Ok(HttpResponse::Ok().finish())
}

pub async fn verify_nickname(
    state: web::Data<AppState>,
    body: web::Json<NicknameRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    state.auth.ensure_nickname_available(&body.nickname).await?;
    Ok(HttpResponse::Ok().finish())
}

pub async fn request_mail_code(
    state: web::Data<AppState>,
    body: web::Json<MailRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    state.account.request_mail_code(&body.email).await?;
    Ok(ack("verification mail sent"))
}

pub async fn verify_mail_code(
    state: web::Data<AppState>,
    body: web::Json<MailCodeRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    state.account.verify_mail_code(&body.email, &body.code).await?;
    Ok(ack(true))
}

pub async fn get_my_info(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    let info = state.users.get_info(user.id).await?;
    Ok(HttpResponse::Ok().json(info))
}

pub async fn update_my_info(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<UpdateInfoRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let body = body.into_inner();
    state
        .users
        .update_info(
            user.id,
            ProfileUpdate {
                nickname: body.nickname,
                major_name: body.major_name,
                agree_email: body.agree_email,
            },
        )
        .await?;
    Ok(ack("profile updated"))
}

pub async fn change_password(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    state
        .users
        .change_password(user.id, &body.current_password, &body.new_password)
        .await?;
    Ok(ack("password changed"))
}

pub async fn verify_password(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<PasswordRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    state.users.verify_password(user.id, &body.password).await?;
    Ok(ack(true))
}

pub async fn delete_my_account(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    state
        .users
        .delete_account(user.id, &user.token_id, user.remaining_secs)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn my_quizzes(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<PageOnly>,
) -> Result<HttpResponse> {
    let page = state
        .quizzes
        .list_for_user(user.id, QuizListScope::Written, PageRequest::of(query.page))
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn my_tried_quizzes(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<TriedQuery>,
) -> Result<HttpResponse> {
    let scope = QuizListScope::Tried {
        solved: query.solved,
    };
    let page = state
        .quizzes
        .list_for_user(user.id, scope, PageRequest::of(query.page))
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn my_pinned_quizzes(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<PageOnly>,
) -> Result<HttpResponse> {
    let page = state
        .quizzes
        .list_for_user(user.id, QuizListScope::Pinned, PageRequest::of(query.page))
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn my_posts(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<PageQuery<PostSort>>,
) -> Result<HttpResponse> {
    let page = state
        .posts
        .by_writer(user.id, query.sort, query.page_request())
        .await?;
    Ok(HttpResponse::Ok().json(page))
}
