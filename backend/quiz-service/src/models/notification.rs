use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Comment,
    Like,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub message: String,
    pub target_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub notification_type: NotificationType,
    pub message: String,
    pub target_id: Option<Uuid>,
}

impl NewNotification {
    pub fn comment(post_writer: Uuid, post_id: Uuid, post_title: &str, commenter: &str) -> Self {
        Self {
            user_id: post_writer,
            notification_type: NotificationType::Comment,
            message: format!("{} commented on your post \"{}\"", commenter, post_title),
            target_id: Some(post_id),
        }
    }

    pub fn quiz_like(quiz_writer: Uuid, quiz_id: Uuid, quiz_title: &str) -> Self {
        Self {
            user_id: quiz_writer,
            notification_type: NotificationType::Like,
            message: format!("Someone liked your quiz \"{}\"", quiz_title),
            target_id: Some(quiz_id),
        }
    }
}

/// Which notifications to list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationView {
    #[default]
    Unchecked,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationSort {
    #[default]
    DateDesc,
    DateAsc,
}

impl NotificationSort {
    pub fn order_by(&self) -> &'static str {
        match self {
            NotificationSort::DateDesc => "created_at DESC",
            NotificationSort::DateAsc => "created_at ASC",
        }
    }
}
