/// Quiz Service Library
///
/// Quiz and community backend: accounts with JWT and OAuth sign-in, quizzes
/// with grading, posts with comments, and live notifications over
/// server-sent events.
///
/// # Modules
///
/// - `config`: environment configuration
/// - `db`: Postgres repositories and the Redis key/value store
/// - `error`: domain error codes and their HTTP mapping
/// - `handlers`: HTTP request handlers
/// - `middleware`: bearer-token authentication
/// - `models`: rows, inputs and response shapes
/// - `security`: password hashing and JWT
/// - `services`: business logic
/// - `sse`: emitter registry and event streams
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod security;
pub mod services;
pub mod sse;
pub mod validators;

use std::sync::Arc;

pub use config::Config;
pub use error::{AppError, Result};

use db::KeyValueStore;
use security::JwtManager;
use services::{
    AccountService, AdminService, AuthService, CommentService, NotificationService, PostService,
    QuizService, UserService,
};

/// Shared handler state, registered once as `web::Data<AppState>`
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub account: Arc<AccountService>,
    pub users: Arc<UserService>,
    pub admin: Arc<AdminService>,
    pub quizzes: Arc<QuizService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub notifications: Arc<NotificationService>,
    pub jwt: Arc<JwtManager>,
    pub store: Arc<dyn KeyValueStore>,
    /// Mark the refresh cookie `Secure`
    pub secure_cookie: bool,
}
