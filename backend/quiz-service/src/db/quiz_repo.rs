use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    PageRequest, Quiz, QuizFilter, QuizInput, QuizListScope, QuizReport, QuizSort, QuizSummaryRow,
    Subject,
};

const QUIZ_SELECT: &str = r#"
    SELECT q.id, q.title, q.question, q.choices, q.quiz_imgs, q.answer, q.quiz_type,
           q.like_count, q.view_count, q.visibility, q.writer_id, u.nickname AS writer_nickname,
           q.subject_id, q.created_at, q.updated_at
    FROM quizzes q
    JOIN users u ON u.id = q.writer_id
"#;

/// Summary columns; `$1` is always the viewer used for the tried-status join
const SUMMARY_SELECT: &str = r#"
    SELECT q.id, q.title, u.nickname, q.like_count, q.view_count, q.created_at,
           t.is_solved
    FROM quizzes q
    JOIN users u ON u.id = q.writer_id
    LEFT JOIN tried_quizzes t ON t.quiz_id = q.id AND t.user_id = $1
"#;

/// Quiz storage including tried/pinned/liked relations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Quiz>>;

    async fn find_writer_id(&self, id: Uuid) -> Result<Option<Uuid>>;

    async fn find_answer(&self, id: Uuid) -> Result<Option<String>>;

    async fn subject_exists(&self, subject_id: i64) -> Result<bool>;

    async fn list_subjects(&self) -> Result<Vec<Subject>>;

    async fn insert(&self, writer_id: Uuid, input: QuizInput) -> Result<Uuid>;

    async fn update(&self, id: Uuid, input: QuizInput) -> Result<bool>;

    async fn delete(&self, id: Uuid) -> Result<bool>;

    async fn increment_view(&self, id: Uuid) -> Result<()>;

    /// Insert or overwrite the viewer's attempt result
    async fn upsert_tried(&self, user_id: Uuid, quiz_id: Uuid, is_solved: bool) -> Result<()>;

    async fn search(
        &self,
        viewer: Uuid,
        filter: QuizFilter,
        sort: QuizSort,
        page: PageRequest,
    ) -> Result<(Vec<QuizSummaryRow>, i64)>;

    async fn list_for_user(
        &self,
        user_id: Uuid,
        scope: QuizListScope,
        page: PageRequest,
    ) -> Result<(Vec<QuizSummaryRow>, i64)>;

    async fn is_pinned(&self, user_id: Uuid, quiz_id: Uuid) -> Result<bool>;

    /// Returns false if the pin already existed
    async fn pin(&self, user_id: Uuid, quiz_id: Uuid) -> Result<bool>;

    async fn unpin(&self, user_id: Uuid, quiz_id: Uuid) -> Result<bool>;

    async fn is_liked(&self, user_id: Uuid, quiz_id: Uuid) -> Result<bool>;

    /// Insert the like row and bump the counter atomically.
    /// Returns false if the like already existed.
    async fn like(&self, user_id: Uuid, quiz_id: Uuid) -> Result<bool>;

    async fn unlike(&self, user_id: Uuid, quiz_id: Uuid) -> Result<bool>;

    /// False when this reporter already reported the quiz
    async fn insert_report(&self, reporter_id: Uuid, quiz_id: Uuid, reason: &str) -> Result<bool>;

    /// Newest first
    async fn list_reports(&self, page: PageRequest) -> Result<(Vec<QuizReport>, i64)>;
}

pub struct PgQuizRepository {
    pool: PgPool,
}

impl PgQuizRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizRepository for PgQuizRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Quiz>> {
        let sql = format!("{QUIZ_SELECT} WHERE q.id = $1");
        let quiz = sqlx::query_as::<_, Quiz>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(quiz)
    }

    async fn find_writer_id(&self, id: Uuid) -> Result<Option<Uuid>> {
        let writer = sqlx::query_scalar::<_, Uuid>("SELECT writer_id FROM quizzes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(writer)
    }

    async fn find_answer(&self, id: Uuid) -> Result<Option<String>> {
        let answer = sqlx::query_scalar::<_, String>("SELECT answer FROM quizzes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(answer)
    }

    async fn subject_exists(&self, subject_id: i64) -> Result<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM subjects WHERE id = $1)")
                .bind(subject_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>> {
        let subjects = sqlx::query_as::<_, Subject>("SELECT id, name FROM subjects ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(subjects)
    }

    async fn insert(&self, writer_id: Uuid, input: QuizInput) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO quizzes (title, question, choices, quiz_imgs, answer, quiz_type,
                                 writer_id, subject_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(&input.title)
        .bind(&input.question)
        .bind(&input.choices)
        .bind(&input.quiz_imgs)
        .bind(&input.answer)
        .bind(input.quiz_type)
        .bind(writer_id)
        .bind(input.subject_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update(&self, id: Uuid, input: QuizInput) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE quizzes
            SET title = $2, question = $3, choices = $4, quiz_imgs = $5, answer = $6,
                quiz_type = $7, subject_id = $8, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&input.title)
        .bind(&input.question)
        .bind(&input.choices)
        .bind(&input.quiz_imgs)
        .bind(&input.answer)
        .bind(input.quiz_type)
        .bind(input.subject_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_view(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE quizzes SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_tried(&self, user_id: Uuid, quiz_id: Uuid, is_solved: bool) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tried_quizzes (user_id, quiz_id, is_solved)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, quiz_id)
            DO UPDATE SET is_solved = EXCLUDED.is_solved, updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(quiz_id)
        .bind(is_solved)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn search(
        &self,
        viewer: Uuid,
        filter: QuizFilter,
        sort: QuizSort,
        page: PageRequest,
    ) -> Result<(Vec<QuizSummaryRow>, i64)> {
        let list_sql = format!(
            "{SUMMARY_SELECT} WHERE q.visibility AND {} ORDER BY {} LIMIT $3 OFFSET $4",
            filter_condition(&filter, 2),
            sort.order_by()
        );
        let count_sql = format!(
            "SELECT COUNT(*) FROM quizzes q WHERE q.visibility AND {}",
            filter_condition(&filter, 1)
        );

        let (rows, total) = match filter {
            QuizFilter::Subject(subject_id) => {
                let rows = sqlx::query_as::<_, QuizSummaryRow>(&list_sql)
                    .bind(viewer)
                    .bind(subject_id)
                    .bind(page.limit())
                    .bind(page.offset())
                    .fetch_all(&self.pool)
                    .await?;
                let total = sqlx::query_scalar::<_, i64>(&count_sql)
                    .bind(subject_id)
                    .fetch_one(&self.pool)
                    .await?;
                (rows, total)
            }
            QuizFilter::Keyword(keyword) => {
                let needle = format!("%{}%", escape_like(&keyword));
                let rows = sqlx::query_as::<_, QuizSummaryRow>(&list_sql)
                    .bind(viewer)
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
        };
        Ok((rows, total))
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        scope: QuizListScope,
        page: PageRequest,
    ) -> Result<(Vec<QuizSummaryRow>, i64)> {
        let (join, condition, order, count_sql) = match scope {
            QuizListScope::Written => (
                "",
                "q.writer_id = $1".to_string(),
                "q.created_at DESC",
                "SELECT COUNT(*) FROM quizzes WHERE writer_id = $1".to_string(),
            ),
            QuizListScope::Tried { solved } => (
                "",
                format!("t.is_solved = {solved}"),
                "t.updated_at DESC",
                format!(
                    "SELECT COUNT(*) FROM tried_quizzes WHERE user_id = $1 AND is_solved = {solved}"
                ),
            ),
            QuizListScope::Pinned => (
                "JOIN pinned_quizzes p ON p.quiz_id = q.id AND p.user_id = $1",
                "TRUE".to_string(),
                "p.created_at DESC",
                "SELECT COUNT(*) FROM pinned_quizzes WHERE user_id = $1".to_string(),
            ),
            QuizListScope::Liked(sort) => (
                "JOIN liked_quizzes l ON l.quiz_id = q.id AND l.user_id = $1",
                "TRUE".to_string(),
                sort.order_by(),
                "SELECT COUNT(*) FROM liked_quizzes WHERE user_id = $1".to_string(),
            ),
        };

        let list_sql =
            format!("{SUMMARY_SELECT} {join} WHERE {condition} ORDER BY {order} LIMIT $2 OFFSET $3");

        let rows = sqlx::query_as::<_, QuizSummaryRow>(&list_sql)
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

    async fn is_pinned(&self, user_id: Uuid, quiz_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM pinned_quizzes WHERE user_id = $1 AND quiz_id = $2)",
        )
        .bind(user_id)
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn pin(&self, user_id: Uuid, quiz_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO pinned_quizzes (user_id, quiz_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(quiz_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn unpin(&self, user_id: Uuid, quiz_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pinned_quizzes WHERE user_id = $1 AND quiz_id = $2")
            .bind(user_id)
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_liked(&self, user_id: Uuid, quiz_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM liked_quizzes WHERE user_id = $1 AND quiz_id = $2)",
        )
        .bind(user_id)
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn like(&self, user_id: Uuid, quiz_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO liked_quizzes (user_id, quiz_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(quiz_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if inserted {
            sqlx::query("UPDATE quizzes SET like_count = like_count + 1 WHERE id = $1")
                .bind(quiz_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn unlike(&self, user_id: Uuid, quiz_id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM liked_quizzes WHERE user_id = $1 AND quiz_id = $2")
            .bind(user_id)
            .bind(quiz_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if removed {
            sqlx::query(
                "UPDATE quizzes SET like_count = GREATEST(like_count - 1, 0) WHERE id = $1",
            )
            .bind(quiz_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(removed)
    }

    async fn insert_report(&self, reporter_id: Uuid, quiz_id: Uuid, reason: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO quiz_reports (quiz_id, reporter_id, reason)
            VALUES ($1, $2, $3)
            ON CONFLICT (quiz_id, reporter_id) DO NOTHING
            "#,
        )
        .bind(quiz_id)
        .bind(reporter_id)
        .bind(reason)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_reports(&self, page: PageRequest) -> Result<(Vec<QuizReport>, i64)> {
        let reports = sqlx::query_as::<_, QuizReport>(
            r#"
            SELECT r.id, r.quiz_id, q.title AS quiz_title, r.reporter_id,
                   u.nickname AS reporter_nickname, r.reason, r.created_at
            FROM quiz_reports r
            JOIN quizzes q ON q.id = r.quiz_id
            JOIN users u ON u.id = r.reporter_id
            ORDER BY r.created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM quiz_reports")
            .fetch_one(&self.pool)
            .await?;
        Ok((reports, total))
    }
}

fn filter_condition(filter: &QuizFilter, placeholder: usize) -> String {
    match filter {
        QuizFilter::Subject(_) => format!("q.subject_id = ${placeholder}"),
        QuizFilter::Keyword(_) => {
            format!("(q.title ILIKE ${placeholder} OR q.question ILIKE ${placeholder})")
        }
    }
}

/// Escape `%`, `_` and `\` so a keyword matches literally inside ILIKE
pub(crate) fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len());
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
