use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{LoginType, NewUser, PageRequest, User, UserSort};

const USER_COLUMNS: &str = "id, username, password_hash, nickname, email, major_name, agree_email, \
     role, suspended_until, login_type, oauth_id, created_at, updated_at";

/// Account storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_oauth(&self, login_type: LoginType, oauth_id: &str) -> Result<Option<User>>;

    async fn exists_by_username(&self, username: &str) -> Result<bool>;

    async fn exists_by_nickname(&self, nickname: &str) -> Result<bool>;

    async fn exists_by_username_and_email(&self, username: &str, email: &str) -> Result<bool>;

    async fn insert(&self, user: NewUser) -> Result<User>;

    /// Returns false when no row matched
    async fn update_profile(
        &self,
        id: Uuid,
        nickname: &str,
        major_name: &str,
        agree_email: bool,
    ) -> Result<bool>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool>;

    async fn update_password_by_username(&self, username: &str, password_hash: &str)
        -> Result<bool>;

    /// `None` lifts the suspension
    async fn set_suspended_until(&self, id: Uuid, until: Option<DateTime<Utc>>) -> Result<bool>;

    async fn delete(&self, id: Uuid) -> Result<bool>;

    async fn list(&self, page: PageRequest, sort: UserSort) -> Result<(Vec<User>, i64)>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, filter: &str, value: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {filter} = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.find_one("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_one("email", email).await
    }

    async fn find_by_oauth(&self, login_type: LoginType, oauth_id: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE login_type = $1 AND oauth_id = $2");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(login_type)
            .bind(oauth_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn exists_by_nickname(&self, nickname: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE nickname = $1)",
        )
        .bind(nickname)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn exists_by_username_and_email(&self, username: &str, email: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND email = $2)",
        )
        .bind(username)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert(&self, user: NewUser) -> Result<User> {
        let sql = format!(
            r#"
            INSERT INTO users (username, password_hash, nickname, email, major_name,
                               agree_email, login_type, oauth_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(&user.nickname)
            .bind(&user.email)
            .bind(&user.major_name)
            .bind(user.agree_email)
            .bind(user.login_type)
            .bind(&user.oauth_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        nickname: &str,
        major_name: &str,
        agree_email: bool,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET nickname = $2, major_name = $3, agree_email = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(nickname)
        .bind(major_name)
        .bind(agree_email)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_password_by_username(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE username = $1",
        )
        .bind(username)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_suspended_until(&self, id: Uuid, until: Option<DateTime<Utc>>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET suspended_until = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(until)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        // Like rows vanish through ON DELETE CASCADE; release their counters first
        sqlx::query(
            r#"
            UPDATE quizzes SET like_count = GREATEST(like_count - 1, 0)
            WHERE id IN (SELECT quiz_id FROM liked_quizzes WHERE user_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            r#"
            UPDATE posts SET like_count = GREATEST(like_count - 1, 0)
            WHERE id IN (SELECT post_id FROM liked_posts WHERE user_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, page: PageRequest, sort: UserSort) -> Result<(Vec<User>, i64)> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY {} LIMIT $1 OFFSET $2",
            sort.order_by()
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok((users, total))
    }
}
