/// Quiz handlers - CRUD, grading, search, pins, likes and reports
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::handlers::{ack, PageQuery};
use crate::middleware::AuthUser;
use crate::models::{
    LikedQuizSort, PageRequest, QuizFilter, QuizInput, QuizListScope, QuizSort, QuizType,
};
use crate::validators::validate_not_blank;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QuizRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub title: String,
    #[validate(custom(function = "validate_not_blank"))]
    pub question: String,
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub quiz_imgs: Vec<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub answer: String,
    pub quiz_type: QuizType,
    #[validate(range(min = 1, message = "subjectId must be positive"))]
    pub subject_id: i64,
}

impl From<QuizRequest> for QuizInput {
    fn from(req: QuizRequest) -> Self {
        Self {
            title: req.title,
            question: req.question,
            choices: req.choices,
            quiz_imgs: req.quiz_imgs,
            answer: req.answer,
            quiz_type: req.quiz_type,
            subject_id: req.subject_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    pub answer: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReportRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 500, message = "reason must be at most 500 characters")
    )]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub sort: QuizSort,
}

pub async fn subjects(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.quizzes.subjects().await?))
}

pub async fn create(
    state: web::Data<AppState>,
    user: AuthUser,
    body: web::Json<QuizRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    state.quizzes.create(user.id, body.into_inner().into()).await?;
    Ok(ack("quiz created"))
}

pub async fn get(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let quiz = state.quizzes.get(user.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(quiz))
}

pub async fn update(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<QuizRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    state
        .quizzes
        .update(user.id, path.into_inner(), body.into_inner().into())
        .await?;
    Ok(ack("quiz updated"))
}

pub async fn delete(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.quizzes.delete(user.id, path.into_inner()).await?;
    Ok(ack("quiz deleted"))
}

pub async fn grade(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<GradeRequest>,
) -> Result<HttpResponse> {
    let solved = state
        .quizzes
        .grade(user.id, path.into_inner(), &body.answer)
        .await?;
    Ok(ack(solved))
}

pub async fn answer(
    state: web::Data<AppState>,
    _user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let answer = state.quizzes.answer(path.into_inner()).await?;
    Ok(ack(answer))
}

pub async fn search(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let page = state
        .quizzes
        .search(
            user.id,
            QuizFilter::Keyword(query.keyword.trim().to_string()),
            query.sort,
            PageRequest::of(query.page),
        )
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn by_subject(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<i64>,
    query: web::Query<PageQuery<QuizSort>>,
) -> Result<HttpResponse> {
    let page = state
        .quizzes
        .search(
            user.id,
            QuizFilter::Subject(path.into_inner()),
            query.sort,
            query.page_request(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn liked(
    state: web::Data<AppState>,
    user: AuthUser,
    query: web::Query<PageQuery<LikedQuizSort>>,
) -> Result<HttpResponse> {
    let page = state
        .quizzes
        .list_for_user(user.id, QuizListScope::Liked(query.sort), query.page_request())
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn pin(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.quizzes.pin(user.id, path.into_inner()).await?;
    Ok(ack("quiz pinned"))
}

pub async fn unpin(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.quizzes.unpin(user.id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn like(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.quizzes.like(user.id, path.into_inner()).await?;
    Ok(ack("like added"))
}

pub async fn unlike(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state.quizzes.unlike(user.id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn report(
    state: web::Data<AppState>,
    user: AuthUser,
    path: web::Path<Uuid>,
    body: web::Json<ReportRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    state
        .quizzes
        .report(user.id, path.into_inner(), &body.reason)
        .await?;
    Ok(ack("report received"))
}
