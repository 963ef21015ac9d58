use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{QuizRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{
    NewNotification, Page, PageRequest, QuizDetail, QuizFilter, QuizInput, QuizListScope,
    QuizReport, QuizSort, QuizSummary, Subject,
};
use crate::services::notifications::NotificationService;

pub struct QuizService {
    quizzes: Arc<dyn QuizRepository>,
    users: Arc<dyn UserRepository>,
    notifications: Arc<NotificationService>,
}

impl QuizService {
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        users: Arc<dyn UserRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            quizzes,
            users,
            notifications,
        }
    }

    /// Tokens can outlive their account; every write checks the caller first
    async fn ensure_user(&self, user_id: Uuid) -> Result<()> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::InvalidUserId);
        }
        Ok(())
    }

    pub async fn create(&self, writer_id: Uuid, input: QuizInput) -> Result<Uuid> {
        self.ensure_user(writer_id).await?;
        if !self.quizzes.subject_exists(input.subject_id).await? {
            return Err(AppError::InvalidSubjectId);
        }

        let quiz_id = self.quizzes.insert(writer_id, input).await?;
        info!(quiz_id = %quiz_id, writer_id = %writer_id, "quiz created");
        Ok(quiz_id)
    }

    /// Counts a view and returns the quiz without its answer
    pub async fn get(&self, viewer: Uuid, quiz_id: Uuid) -> Result<QuizDetail> {
        let mut quiz = self
            .quizzes
            .find_by_id(quiz_id)
            .await?
            .ok_or(AppError::InvalidQuizId)?;

        self.quizzes.increment_view(quiz_id).await?;
        quiz.view_count += 1;

        let is_liked = self.quizzes.is_liked(viewer, quiz_id).await?;
        let is_pinned = self.quizzes.is_pinned(viewer, quiz_id).await?;
        Ok(QuizDetail::from_quiz(quiz, viewer, is_liked, is_pinned))
    }

    async fn ensure_writer(&self, viewer: Uuid, quiz_id: Uuid) -> Result<()> {
        let writer = self
            .quizzes
            .find_writer_id(quiz_id)
            .await?
            .ok_or(AppError::InvalidQuizId)?;
        if writer != viewer {
            return Err(AppError::UnauthorizedAction);
        }
        Ok(())
    }

    pub async fn update(&self, viewer: Uuid, quiz_id: Uuid, input: QuizInput) -> Result<()> {
        self.ensure_writer(viewer, quiz_id).await?;
        if !self.quizzes.subject_exists(input.subject_id).await? {
            return Err(AppError::InvalidSubjectId);
        }
        self.quizzes.update(quiz_id, input).await?;
        Ok(())
    }

    pub async fn delete(&self, viewer: Uuid, quiz_id: Uuid) -> Result<()> {
        self.ensure_writer(viewer, quiz_id).await?;
        self.quizzes.delete(quiz_id).await?;
        info!(quiz_id = %quiz_id, "quiz deleted");
        Ok(())
    }

    /// Trimmed exact comparison; the attempt is recorded either way
    pub async fn grade(&self, user_id: Uuid, quiz_id: Uuid, answer: &str) -> Result<bool> {
        self.ensure_user(user_id).await?;
        let expected = self
            .quizzes
            .find_answer(quiz_id)
            .await?
            .ok_or(AppError::InvalidQuizId)?;

        let is_solved = expected.trim() == answer.trim();
        self.quizzes.upsert_tried(user_id, quiz_id, is_solved).await?;

        let outcome = if is_solved { "correct" } else { "incorrect" };
        metrics::QUIZ_GRADINGS.with_label_values(&[outcome]).inc();
        Ok(is_solved)
    }

    pub async fn answer(&self, quiz_id: Uuid) -> Result<String> {
        self.quizzes
            .find_answer(quiz_id)
            .await?
            .ok_or(AppError::InvalidQuizId)
    }

    pub async fn search(
        &self,
        viewer: Uuid,
        filter: QuizFilter,
        sort: QuizSort,
        page: PageRequest,
    ) -> Result<Page<QuizSummary>> {
        if let QuizFilter::Subject(subject_id) = filter {
            if !self.quizzes.subject_exists(subject_id).await? {
                return Err(AppError::InvalidSubjectId);
            }
        }
        let (rows, total) = self.quizzes.search(viewer, filter, sort, page).await?;
        Ok(Page::new(rows, page, total).map(QuizSummary::from))
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        scope: QuizListScope,
        page: PageRequest,
    ) -> Result<Page<QuizSummary>> {
        let (rows, total) = self.quizzes.list_for_user(user_id, scope, page).await?;
        Ok(Page::new(rows, page, total).map(QuizSummary::from))
    }

    pub async fn pin(&self, user_id: Uuid, quiz_id: Uuid) -> Result<()> {
        self.ensure_user(user_id).await?;
        if self.quizzes.find_writer_id(quiz_id).await?.is_none() {
            return Err(AppError::InvalidQuizId);
        }
        if !self.quizzes.pin(user_id, quiz_id).await? {
            return Err(AppError::AlreadyPinned);
        }
        Ok(())
    }

    pub async fn unpin(&self, user_id: Uuid, quiz_id: Uuid) -> Result<()> {
        self.ensure_user(user_id).await?;
        if !self.quizzes.unpin(user_id, quiz_id).await? {
            return Err(AppError::NotPinned);
        }
        Ok(())
    }

    /// Records the like and notifies the writer unless they liked their own quiz
    pub async fn like(&self, user_id: Uuid, quiz_id: Uuid) -> Result<()> {
        self.ensure_user(user_id).await?;
        let quiz = self
            .quizzes
            .find_by_id(quiz_id)
            .await?
            .ok_or(AppError::InvalidQuizId)?;
        if !self.quizzes.like(user_id, quiz_id).await? {
            return Err(AppError::AlreadyLiked);
        }

        if quiz.writer_id != user_id {
            let notification = NewNotification::quiz_like(quiz.writer_id, quiz.id, &quiz.title);
            if let Err(e) = self.notifications.send(notification).await {
                warn!(quiz_id = %quiz_id, error = %e, "failed to notify quiz writer");
            }
        }
        Ok(())
    }

    pub async fn unlike(&self, user_id: Uuid, quiz_id: Uuid) -> Result<()> {
        self.ensure_user(user_id).await?;
        if !self.quizzes.unlike(user_id, quiz_id).await? {
            return Err(AppError::NotLiked);
        }
        Ok(())
    }

    /// One report per reader per quiz
    pub async fn report(&self, reporter_id: Uuid, quiz_id: Uuid, reason: &str) -> Result<()> {
        self.ensure_user(reporter_id).await?;
        if self.quizzes.find_writer_id(quiz_id).await?.is_none() {
            return Err(AppError::InvalidQuizId);
        }
        if !self
            .quizzes
            .insert_report(reporter_id, quiz_id, reason.trim())
            .await?
        {
            return Err(AppError::AlreadyReported);
        }

        info!(quiz_id = %quiz_id, reporter_id = %reporter_id, "quiz reported");
        Ok(())
    }

    pub async fn reports(&self, page: PageRequest) -> Result<Page<QuizReport>> {
        let (reports, total) = self.quizzes.list_reports(page).await?;
        Ok(Page::new(reports, page, total))
    }

    pub async fn subjects(&self) -> Result<Vec<Subject>> {
        self.quizzes.list_subjects().await
    }
}
