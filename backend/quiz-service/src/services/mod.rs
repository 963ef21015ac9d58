/// Business logic layer
///
/// Each service owns its repositories behind `Arc<dyn Trait>` so tests can
/// substitute mocks.
pub mod account;
pub mod admin;
pub mod auth;
pub mod comments;
pub mod email;
pub mod notifications;
pub mod oauth;
pub mod posts;
pub mod quizzes;
pub mod users;

pub use account::AccountService;
pub use admin::AdminService;
pub use auth::{AuthService, OAuthOutcome, OAuthSignUpInput, PendingOAuthUser, SignUpInput, TokenPair};
pub use comments::CommentService;
pub use email::{Mailer, SmtpMailer};
pub use notifications::NotificationService;
pub use oauth::{OAuthProvider, OAuthUserInfo};
pub use posts::PostService;
pub use quizzes::QuizService;
pub use users::{ProfileUpdate, UserService};
