/// Auth handlers - sign-up, sign-in, token rotation, OAuth and recovery
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::handlers::{ack, Ack};
use crate::middleware::AuthUser;
use crate::models::LoginType;
use crate::services::{OAuthOutcome, OAuthSignUpInput, SignUpInput, TokenPair};
use crate::validators::{validate_nickname, validate_not_blank, validate_password, validate_username};
use crate::AppState;

pub const REFRESH_COOKIE: &str = "refreshToken";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    #[validate(custom(function = "validate_nickname"))]
    pub nickname: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub major_name: String,
    pub agree_email: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub username: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OAuthCodeRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub code: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OAuthSignUpRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub sign_up_token: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(custom(function = "validate_nickname"))]
    pub nickname: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub major_name: String,
    pub agree_email: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FindUsernameRequest {
    #[validate(email(message = "invalid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyUserRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(email(message = "invalid email address"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(custom(function = "validate_username"))]
    pub username: String,
    #[validate(custom(function = "validate_password"))]
    pub new_password: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
}

fn refresh_cookie(token: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build(REFRESH_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age_secs))
        .finish()
}

/// Access token in header and body, refresh token as an HttpOnly cookie
fn token_response(state: &AppState, tokens: TokenPair) -> HttpResponse {
    let bearer = format!("Bearer {}", tokens.access_token);
    HttpResponse::Ok()
        .insert_header((AUTHORIZATION, bearer.clone()))
        .cookie(refresh_cookie(
            tokens.refresh_token,
            state.jwt.refresh_ttl_secs(),
            state.secure_cookie,
        ))
        .json(TokenResponse {
            access_token: bearer,
        })
}

pub async fn sign_up(
    state: web::Data<AppState>,
    body: web::Json<SignUpRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let body = body.into_inner();

    state
        .auth
        .sign_up(SignUpInput {
            username: body.username,
            password: body.password,
            nickname: body.nickname,
            email: body.email,
            major_name: body.major_name,
            agree_email: body.agree_email,
        })
        .await?;

    Ok(ack("sign-up succeeded"))
}

pub async fn sign_in(
    state: web::Data<AppState>,
    body: web::Json<SignInRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let tokens = state.auth.sign_in(&body.username, &body.password).await?;
    Ok(token_response(&state, tokens))
}

pub async fn reissue(state: web::Data<AppState>, req: HttpRequest) -> Result<HttpResponse> {
    let cookie = req.cookie(REFRESH_COOKIE).ok_or(AppError::InvalidToken)?;
    let tokens = state.auth.reissue(cookie.value()).await?;
    Ok(token_response(&state, tokens))
}

pub async fn sign_out(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    state
        .auth
        .sign_out(user.id, &user.token_id, user.remaining_secs)
        .await?;

    let mut removal = Cookie::build(REFRESH_COOKIE, "").path("/").finish();
    removal.make_removal();
    Ok(HttpResponse::Ok()
        .cookie(removal)
        .json(Ack {
            response: "sign-out succeeded",
        }))
}

async fn oauth_sign_in(
    state: web::Data<AppState>,
    login_type: LoginType,
    body: web::Json<OAuthCodeRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    match state
        .auth
        .oauth_sign_in(login_type, &body.code, &body.state)
        .await?
    {
        OAuthOutcome::SignedIn(tokens) => Ok(token_response(&state, tokens)),
        OAuthOutcome::SignUpRequired(pending) => Ok(HttpResponse::Accepted().json(pending)),
    }
}

pub async fn kakao_sign_in(
    state: web::Data<AppState>,
    body: web::Json<OAuthCodeRequest>,
) -> Result<HttpResponse> {
    oauth_sign_in(state, LoginType::Kakao, body).await
}

pub async fn naver_sign_in(
    state: web::Data<AppState>,
    body: web::Json<OAuthCodeRequest>,
) -> Result<HttpResponse> {
    oauth_sign_in(state, LoginType::Naver, body).await
}

pub async fn oauth_sign_up(
    state: web::Data<AppState>,
    body: web::Json<OAuthSignUpRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let body = body.into_inner();

    let tokens = state
        .auth
        .oauth_sign_up(OAuthSignUpInput {
            sign_up_token: body.sign_up_token,
            email: body.email,
            nickname: body.nickname,
            major_name: body.major_name,
            agree_email: body.agree_email,
        })
        .await?;
    Ok(token_response(&state, tokens))
}

pub async fn find_username(
    state: web::Data<AppState>,
    body: web::Json<FindUsernameRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let username = state.account.find_username(&body.email).await?;
    Ok(ack(username))
}

pub async fn request_password_reset(
    state: web::Data<AppState>,
    body: web::Json<VerifyUserRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    state
        .account
        .request_password_reset(&body.username, &body.email)
        .await?;
    Ok(ack("password reset mail sent"))
}

pub async fn reset_password(
    state: web::Data<AppState>,
    body: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    state
        .account
        .reset_password(&body.username, &body.new_password, &body.code)
        .await?;
    Ok(ack("password reset succeeded"))
}
