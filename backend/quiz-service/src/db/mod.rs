/// Persistence layer
///
/// Postgres repositories behind async traits, plus the Redis key/value store.
pub mod comment_repo;
pub mod kv_store;
pub mod notification_repo;
pub mod post_repo;
pub mod quiz_repo;
pub mod user_repo;

pub use comment_repo::{CommentRepository, PgCommentRepository};
pub use kv_store::{KeyValueStore, RedisStore};
pub use notification_repo::{NotificationRepository, PgNotificationRepository};
pub use post_repo::{PgPostRepository, PostRepository};
pub use quiz_repo::{PgQuizRepository, QuizRepository};
pub use user_repo::{PgUserRepository, UserRepository};
