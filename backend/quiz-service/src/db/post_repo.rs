use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::quiz_repo::escape_like;
use crate::error::Result;
use crate::models::{Category, PageRequest, Post, PostFilter, PostInput, PostSort, PostSummary};

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.content, p.category_id, c.name AS category_name,
           p.writer_id, u.nickname AS writer_nickname, p.view_count, p.like_count,
           p.created_at, p.updated_at
    FROM posts p
    JOIN users u ON u.id = p.writer_id
    JOIN categories c ON c.id = p.category_id
"#;

const SUMMARY_SELECT: &str = r#"
    SELECT p.id, p.title, u.nickname, c.name AS category_name,
           p.view_count, p.like_count, p.created_at
    FROM posts p
    JOIN users u ON u.id = p.writer_id
    JOIN categories c ON c.id = p.category_id
"#;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>>;

    async fn find_writer_id(&self, id: Uuid) -> Result<Option<Uuid>>;

    async fn category_exists(&self, category_id: i64) -> Result<bool>;

    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn insert(&self, writer_id: Uuid, input: PostInput) -> Result<Uuid>;

    async fn update(&self, id: Uuid, input: PostInput) -> Result<bool>;

    async fn delete(&self, id: Uuid) -> Result<bool>;

    async fn increment_view(&self, id: Uuid) -> Result<()>;

    async fn list(
        &self,
        filter: PostFilter,
        sort: PostSort,
        page: PageRequest,
    ) -> Result<(Vec<PostSummary>, i64)>;

    async fn is_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;

    /// Returns false when the like already existed
    async fn like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;

    /// Returns false when there was nothing to remove
    async fn unlike(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;
}

pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        let sql = format!("{POST_SELECT} WHERE p.id = $1");
        let post = sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn find_writer_id(&self, id: Uuid) -> Result<Option<Uuid>> {
        let writer = sqlx::query_scalar::<_, Uuid>("SELECT writer_id FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(writer)
    }

    async fn category_exists(&self, category_id: i64) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)",
        )
        .bind(category_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, name FROM categories ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    async fn insert(&self, writer_id: Uuid, input: PostInput) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO posts (title, content, category_id, writer_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.category_id)
        .bind(writer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update(&self, id: Uuid, input: PostInput) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = $2, content = $3, category_id = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.category_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_view(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE posts SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(
        &self,
        filter: PostFilter,
        sort: PostSort,
        page: PageRequest,
    ) -> Result<(Vec<PostSummary>, i64)> {
        let (clause, next) = filter_clause(&filter);
        let list_sql = format!(
            "{SUMMARY_SELECT} {clause} ORDER BY {} LIMIT ${next} OFFSET ${}",
            sort.order_by(),
            next + 1
        );
        let count_sql = format!("SELECT COUNT(*) FROM posts p {clause}");

        let (rows, total) = match filter {
            PostFilter::All => {
                let rows = sqlx::query_as::<_, PostSummary>(&list_sql)
                    .bind(page.limit())
                    .bind(page.offset())
                    .fetch_all(&self.pool)
                    .await?;
                let total = sqlx::query_scalar::<_, i64>(&count_sql)
                    .fetch_one(&self.pool)
                    .await?;
                (rows, total)
            }
            PostFilter::Keyword(keyword) => {
                let needle = format!("%{}%", escape_like(&keyword));
                let rows = sqlx::query_as::<_, PostSummary>(&list_sql)
                    .bind(&needle)
                    .bind(page.limit())
                    .bind(page.offset())
                    .fetch_all(&self.pool)
                    .await?;
                let total = sqlx::query_scalar::<_, i64>(&count_sql)
                    .bind(&needle)
                    .fetch_one(&self.pool)
                    .await?;
                (rows, total)
            }
            PostFilter::Category(category_id) => {
                let rows = sqlx::query_as::<_, PostSummary>(&list_sql)
                    .bind(category_id)
                    .bind(page.limit())
                    .bind(page.offset())
                    .fetch_all(&self.pool)
                    .await?;
                let total = sqlx::query_scalar::<_, i64>(&count_sql)
                    .bind(category_id)
                    .fetch_one(&self.pool)
                    .await?;
                (rows, total)
            }
            PostFilter::Writer(writer_id) => {
                let rows = sqlx::query_as::<_, PostSummary>(&list_sql)
                    .bind(writer_id)
                    .bind(page.limit())
                    .bind(page.offset())
                    .fetch_all(&self.pool)
                    .await?;
                let total = sqlx::query_scalar::<_, i64>(&count_sql)
                    .bind(writer_id)
                    .fetch_one(&self.pool)
                    .await?;
                (rows, total)
            }
        };
        Ok((rows, total))
    }

    async fn is_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM liked_posts WHERE user_id = $1 AND post_id = $2)",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO liked_posts (user_id, post_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if inserted {
            sqlx::query("UPDATE posts SET like_count = like_count + 1 WHERE id = $1")
                .bind(post_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn unlike(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM liked_posts WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if removed {
            sqlx::query(
                "UPDATE posts SET like_count = GREATEST(like_count - 1, 0) WHERE id = $1",
            )
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(removed)
    }
}

/// `WHERE` clause for the filter and the first placeholder left for paging
fn filter_clause(filter: &PostFilter) -> (&'static str, usize) {
    match filter {
        PostFilter::All => ("", 1),
        PostFilter::Keyword(_) => ("WHERE (p.title ILIKE $1 OR p.content ILIKE $1)", 2),
        PostFilter::Category(_) => ("WHERE p.category_id = $1", 2),
        PostFilter::Writer(_) => ("WHERE p.writer_id = $1", 2),
    }
}
