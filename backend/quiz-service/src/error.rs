use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::services::email::MailError;
use crate::services::oauth::OAuthError;

pub type Result<T> = std::result::Result<T, AppError>;

/// Domain error codes surfaced to API clients.
#[derive(Debug, Error)]
pub enum AppError {
    // ---- 404 ----
    #[error("User does not exist")]
    InvalidUserId,

    #[error("Quiz does not exist")]
    InvalidQuizId,

    #[error("Subject does not exist")]
    InvalidSubjectId,

    #[error("Post does not exist")]
    InvalidPostId,

    #[error("Category does not exist")]
    InvalidCategoryId,

    #[error("Comment does not exist")]
    InvalidCommentId,

    #[error("No user is registered with this email")]
    InvalidEmail,

    #[error("Username or password is invalid")]
    InvalidCredentials,

    #[error("Item is not liked")]
    NotLiked,

    #[error("Quiz is not pinned")]
    NotPinned,

    // ---- 409 ----
    #[error("Username already exists")]
    ExistUsername,

    #[error("Nickname already exists")]
    ExistNickname,

    #[error("Already liked")]
    AlreadyLiked,

    #[error("Quiz is already pinned")]
    AlreadyPinned,

    #[error("Quiz is already reported")]
    AlreadyReported,

    // ---- 403 / 423 ----
    #[error("You are not allowed to perform this action")]
    UnauthorizedAction,

    #[error("Access denied")]
    Forbidden,

    #[error("Account is suspended until {}", .0.format("%Y-%m-%d %H:%M UTC"))]
    SuspendedUser(DateTime<Utc>),

    // ---- 401 ----
    #[error("Token is invalid")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Authentication required")]
    Unauthorized,

    // ---- 400 ----
    #[error("Verification code does not match")]
    InvalidCode,

    #[error("Password does not match")]
    InvalidPassword,

    #[error("Please enter your information correctly")]
    InvalidUserInfo,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    // ---- upstream / infrastructure ----
    #[error("OAuth provider error: {0}")]
    OAuth(#[from] OAuthError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    status: u16,
    message: String,
}

impl AppError {
    /// Stable machine-readable code, used in logs.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidUserId => "INVALID_USER_ID",
            AppError::InvalidQuizId => "INVALID_QUIZ_ID",
            AppError::InvalidSubjectId => "INVALID_SUBJECT_ID",
            AppError::InvalidPostId => "INVALID_POST_ID",
            AppError::InvalidCategoryId => "INVALID_CATEGORY_ID",
            AppError::InvalidCommentId => "INVALID_COMMENT_ID",
            AppError::InvalidEmail => "INVALID_EMAIL",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::NotLiked => "NOT_LIKED",
            AppError::NotPinned => "NOT_PINNED",
            AppError::ExistUsername => "EXIST_USERNAME",
            AppError::ExistNickname => "EXIST_NICKNAME",
            AppError::AlreadyLiked => "ALREADY_LIKED",
            AppError::AlreadyPinned => "ALREADY_PINNED",
            AppError::AlreadyReported => "ALREADY_REPORTED",
            AppError::UnauthorizedAction => "UNAUTHORIZED_ACTION",
            AppError::Forbidden => "FORBIDDEN",
            AppError::SuspendedUser(_) => "SUSPENDED_USER",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::InvalidCode => "INVALID_CODE",
            AppError::InvalidPassword => "INVALID_PASSWORD",
            AppError::InvalidUserInfo => "INVALID_USER_INFO",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Validation(_) => "VALIDATION",
            AppError::OAuth(_) => "OAUTH",
            AppError::Database(_) => "DATABASE",
            AppError::Cache(_) => "CACHE",
            AppError::Mail(_) => "MAIL",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    fn is_server_error(&self) -> bool {
        matches!(
            self,
            AppError::Database(_) | AppError::Cache(_) | AppError::Mail(_) | AppError::Internal(_)
        )
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidUserId
            | AppError::InvalidQuizId
            | AppError::InvalidSubjectId
            | AppError::InvalidPostId
            | AppError::InvalidCategoryId
            | AppError::InvalidCommentId
            | AppError::InvalidEmail
            | AppError::InvalidCredentials
            | AppError::NotLiked
            | AppError::NotPinned => StatusCode::NOT_FOUND,
            AppError::ExistUsername
            | AppError::ExistNickname
            | AppError::AlreadyLiked
            | AppError::AlreadyPinned
            | AppError::AlreadyReported => StatusCode::CONFLICT,
            AppError::UnauthorizedAction | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::SuspendedUser(_) => StatusCode::LOCKED,
            AppError::InvalidToken | AppError::TokenExpired | AppError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AppError::InvalidCode
            | AppError::InvalidPassword
            | AppError::InvalidUserInfo
            | AppError::BadRequest(_)
            | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::OAuth(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Mail(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        if let AppError::Validation(fields) = self {
            return HttpResponse::build(status).json(fields);
        }

        let message = if self.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(ErrorResponse {
            status: status.as_u16(),
            message,
        })
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .or_else(|| errs.first().map(|e| e.code.to_string()))
                    .unwrap_or_else(|| "invalid value".to_string());
                (field.to_string(), message)
            })
            .collect();
        AppError::Validation(fields)
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        match error.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
            _ => AppError::InvalidToken,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use validator::Validate;

    #[derive(Validate)]
    struct Form {
        #[validate(length(min = 1, message = "title is required"))]
        title: String,
    }

    #[test]
    fn domain_codes_map_to_statuses() {
        assert_eq!(AppError::InvalidUserId.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::AlreadyLiked.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::AlreadyPinned.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::AlreadyReported.status_code(), StatusCode::CONFLICT);
        assert_eq!(AppError::UnauthorizedAction.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::SuspendedUser(Utc::now()).status_code(),
            StatusCode::LOCKED
        );
        assert_eq!(AppError::InvalidCode.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn error_body_has_status_and_message() {
        let resp = AppError::InvalidQuizId.error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], 404);
        assert_eq!(json["message"], "Quiz does not exist");
    }

    #[test]
    fn suspension_message_carries_unlock_time() {
        let until = DateTime::parse_from_rfc3339("2024-08-23T02:19:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            AppError::SuspendedUser(until).to_string(),
            "Account is suspended until 2024-08-23 02:19 UTC"
        );
    }

    #[actix_web::test]
    async fn internal_errors_hide_details() {
        let resp = AppError::Internal("pool exhausted on shard 3".into()).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], 500);
        assert_eq!(json["message"], "Internal server error");
    }

    #[actix_web::test]
    async fn validation_errors_render_field_map() {
        let form = Form {
            title: String::new(),
        };
        let err: AppError = form.validate().unwrap_err().into();
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["title"], "title is required");
    }
}
