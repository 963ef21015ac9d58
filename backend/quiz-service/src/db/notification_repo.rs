use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{NewNotification, Notification, NotificationSort, NotificationView, PageRequest};

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, notification_type, message, target_id, is_read, created_at";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: NewNotification) -> Result<Notification>;

    async fn list(
        &self,
        user_id: Uuid,
        view: NotificationView,
        sort: NotificationSort,
        page: PageRequest,
    ) -> Result<(Vec<Notification>, i64)>;

    /// Marks the given ids read, skipping ids owned by other users
    async fn mark_read(&self, user_id: Uuid, ids: Vec<Uuid>) -> Result<u64>;
}

pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn insert(&self, notification: NewNotification) -> Result<Notification> {
        let sql = format!(
            r#"
            INSERT INTO notifications (user_id, notification_type, message, target_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, Notification>(&sql)
            .bind(notification.user_id)
            .bind(notification.notification_type)
            .bind(&notification.message)
            .bind(notification.target_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn list(
        &self,
        user_id: Uuid,
        view: NotificationView,
        sort: NotificationSort,
        page: PageRequest,
    ) -> Result<(Vec<Notification>, i64)> {
        let condition = view_condition(view);
        let list_sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE {condition} \
             ORDER BY {} LIMIT $2 OFFSET $3",
            sort.order_by()
        );
        let count_sql = format!("SELECT COUNT(*) FROM notifications WHERE {condition}");

        let rows = sqlx::query_as::<_, Notification>(&list_sql)
            .bind(user_id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok((rows, total))
    }

    async fn mark_read(&self, user_id: Uuid, ids: Vec<Uuid>) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND id = ANY($2)",
        )
        .bind(user_id)
        .bind(&ids)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}

fn view_condition(view: NotificationView) -> &'static str {
    match view {
        NotificationView::Unchecked => "user_id = $1 AND NOT is_read",
        NotificationView::All => "user_id = $1",
    }
}
