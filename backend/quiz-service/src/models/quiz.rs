use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizType {
    MultipleChoice,
    ShortAnswer,
    TrueOrFalse,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Subject {
    pub id: i64,
    pub name: String,
}

/// Quiz row joined with its writer's nickname
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,
    pub question: String,
    pub choices: Vec<String>,
    pub quiz_imgs: Vec<String>,
    pub answer: String,
    pub quiz_type: QuizType,
    pub like_count: i64,
    pub view_count: i64,
    pub visibility: bool,
    pub writer_id: Uuid,
    pub writer_nickname: String,
    pub subject_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Writable quiz fields, shared by create and update
#[derive(Debug, Clone, PartialEq)]
pub struct QuizInput {
    pub title: String,
    pub question: String,
    pub choices: Vec<String>,
    pub quiz_imgs: Vec<String>,
    pub answer: String,
    pub quiz_type: QuizType,
    pub subject_id: i64,
}

/// Quiz as shown to a reader; the answer is never included
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDetail {
    pub id: Uuid,
    pub title: String,
    pub question: String,
    pub choices: Vec<String>,
    pub quiz_imgs: Vec<String>,
    pub quiz_type: QuizType,
    pub like_count: i64,
    pub view_count: i64,
    pub subject_id: i64,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
    pub is_writer: bool,
    pub is_liked: bool,
    pub is_pinned: bool,
}

impl QuizDetail {
    pub fn from_quiz(quiz: Quiz, viewer: Uuid, is_liked: bool, is_pinned: bool) -> Self {
        Self {
            is_writer: quiz.writer_id == viewer,
            id: quiz.id,
            title: quiz.title,
            question: quiz.question,
            choices: quiz.choices,
            quiz_imgs: quiz.quiz_imgs,
            quiz_type: quiz.quiz_type,
            like_count: quiz.like_count,
            view_count: quiz.view_count,
            subject_id: quiz.subject_id,
            nickname: quiz.writer_nickname,
            created_at: quiz.created_at,
            is_liked,
            is_pinned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriedStatus {
    Solved,
    Failed,
    NotAttempted,
}

impl From<Option<bool>> for TriedStatus {
    fn from(is_solved: Option<bool>) -> Self {
        match is_solved {
            Some(true) => TriedStatus::Solved,
            Some(false) => TriedStatus::Failed,
            None => TriedStatus::NotAttempted,
        }
    }
}

/// List row, carrying the caller's attempt state
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuizSummaryRow {
    pub id: Uuid,
    pub title: String,
    pub nickname: String,
    pub like_count: i64,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub is_solved: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSummary {
    pub id: Uuid,
    pub title: String,
    pub nickname: String,
    pub like_count: i64,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub tried_status: TriedStatus,
}

impl From<QuizSummaryRow> for QuizSummary {
    fn from(row: QuizSummaryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            nickname: row.nickname,
            like_count: row.like_count,
            view_count: row.view_count,
            created_at: row.created_at,
            tried_status: row.is_solved.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuizSort {
    #[default]
    DateDesc,
    DateAsc,
    LikeDesc,
    ViewDesc,
}

impl QuizSort {
    pub fn order_by(&self) -> &'static str {
        match self {
            QuizSort::DateDesc => "q.created_at DESC",
            QuizSort::DateAsc => "q.created_at ASC",
            QuizSort::LikeDesc => "q.like_count DESC, q.created_at DESC",
            QuizSort::ViewDesc => "q.view_count DESC, q.created_at DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LikedQuizSort {
    #[default]
    LikedDateDesc,
    LikedDateAsc,
}

impl LikedQuizSort {
    pub fn order_by(&self) -> &'static str {
        match self {
            LikedQuizSort::LikedDateDesc => "l.created_at DESC",
            LikedQuizSort::LikedDateAsc => "l.created_at ASC",
        }
    }
}

/// A reader's complaint about a quiz, as listed for moderators
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizReport {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub quiz_title: String,
    pub reporter_id: Uuid,
    pub reporter_nickname: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Search criteria for public quiz listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizFilter {
    Subject(i64),
    Keyword(String),
}

/// Which list of the caller's quizzes to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizListScope {
    Written,
    Tried { solved: bool },
    Pinned,
    Liked(LikedQuizSort),
}
