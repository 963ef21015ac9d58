use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::Comment;

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.content, c.post_id, c.writer_id, u.nickname AS writer_nickname,
           c.created_at, c.updated_at
    FROM comments c
    JOIN users u ON u.id = c.writer_id
"#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn find_writer_id(&self, id: Uuid) -> Result<Option<Uuid>>;

    /// Comments of a post in creation order
    async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>>;

    async fn insert(&self, post_id: Uuid, writer_id: Uuid, content: &str) -> Result<Comment>;

    async fn update(&self, id: Uuid, content: &str) -> Result<bool>;

    async fn delete(&self, id: Uuid) -> Result<bool>;
}

pub struct PgCommentRepository {
    pool: PgPool,
}

impl PgCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn find_writer_id(&self, id: Uuid) -> Result<Option<Uuid>> {
        let writer =
            sqlx::query_scalar::<_, Uuid>("SELECT writer_id FROM comments WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(writer)
    }

    async fn list_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let sql = format!("{COMMENT_SELECT} WHERE c.post_id = $1 ORDER BY c.created_at ASC");
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }

    async fn insert(&self, post_id: Uuid, writer_id: Uuid, content: &str) -> Result<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (content, post_id, writer_id)
                VALUES ($1, $2, $3)
                RETURNING id, content, post_id, writer_id, created_at, updated_at
            )
            SELECT i.id, i.content, i.post_id, i.writer_id, u.nickname AS writer_nickname,
                   i.created_at, i.updated_at
            FROM inserted i
            JOIN users u ON u.id = i.writer_id
            "#,
        )
        .bind(content)
        .bind(post_id)
        .bind(writer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn update(&self, id: Uuid, content: &str) -> Result<bool> {
        let result =
            sqlx::query("UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(content)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
