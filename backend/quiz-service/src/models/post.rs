use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Post row joined with writer nickname and category name
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category_id: i64,
    pub category_name: String,
    pub writer_id: Uuid,
    pub writer_nickname: String,
    pub view_count: i64,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostInput {
    pub category_id: i64,
    pub title: String,
    pub content: String,
}

/// Comment row joined with writer nickname
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub content: String,
    pub post_id: Uuid,
    pub writer_id: Uuid,
    pub writer_nickname: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: Uuid,
    pub content: String,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub is_writer: bool,
}

impl CommentView {
    pub fn from_comment(comment: Comment, viewer: Uuid) -> Self {
        Self {
            is_writer: comment.writer_id == viewer,
            id: comment.id,
            content: comment.content,
            nickname: comment.writer_nickname,
            created_at: comment.created_at,
            modified_at: comment.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category_name: String,
    pub nickname: String,
    pub view_count: i64,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub is_writer: bool,
    pub is_liked: bool,
    pub comments: Vec<CommentView>,
}

impl PostDetail {
    pub fn assemble(post: Post, comments: Vec<Comment>, viewer: Uuid, is_liked: bool) -> Self {
        Self {
            is_writer: post.writer_id == viewer,
            id: post.id,
            title: post.title,
            content: post.content,
            category_name: post.category_name,
            nickname: post.writer_nickname,
            view_count: post.view_count,
            like_count: post.like_count,
            created_at: post.created_at,
            modified_at: post.updated_at,
            is_liked,
            comments: comments
                .into_iter()
                .map(|c| CommentView::from_comment(c, viewer))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub nickname: String,
    pub category_name: String,
    pub view_count: i64,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostSort {
    #[default]
    DateDesc,
    DateAsc,
    LikeDesc,
    ViewDesc,
}

impl PostSort {
    pub fn order_by(&self) -> &'static str {
        match self {
            PostSort::DateDesc => "p.created_at DESC",
            PostSort::DateAsc => "p.created_at ASC",
            PostSort::LikeDesc => "p.like_count DESC, p.created_at DESC",
            PostSort::ViewDesc => "p.view_count DESC, p.created_at DESC",
        }
    }
}

/// Filter for post listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Keyword(String),
    Category(i64),
    Writer(Uuid),
}
