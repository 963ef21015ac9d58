/// Data models for quiz-service
///
/// Row types derive `sqlx::FromRow`; response types serialize with
/// camelCase keys.
pub mod notification;
pub mod page;
pub mod post;
pub mod quiz;
pub mod user;

pub use notification::{
    NewNotification, Notification, NotificationSort, NotificationType, NotificationView,
};
pub use page::{Page, PageRequest};
pub use post::{
    Category, Comment, CommentView, Post, PostDetail, PostFilter, PostInput, PostSort, PostSummary,
};
pub use quiz::{
    LikedQuizSort, Quiz, QuizDetail, QuizFilter, QuizInput, QuizListScope, QuizReport, QuizSort,
    QuizSummary, QuizSummaryRow, QuizType, Subject, TriedStatus,
};
pub use user::{
    LoginType, NewUser, Role, SuspendStatus, User, UserDetail, UserSort, UserSummary,
};
