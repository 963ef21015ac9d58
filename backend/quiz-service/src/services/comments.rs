use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{CommentRepository, PostRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::models::{CommentView, NewNotification};
use crate::services::notifications::NotificationService;

pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    notifications: Arc<NotificationService>,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            comments,
            posts,
            users,
            notifications,
        }
    }

    /// Adds a comment and notifies the post writer when someone else commented
    pub async fn create(&self, writer_id: Uuid, post_id: Uuid, content: &str) -> Result<CommentView> {
        if self.users.find_by_id(writer_id).await?.is_none() {
            return Err(AppError::InvalidUserId);
        }
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(AppError::InvalidPostId)?;

        let comment = self.comments.insert(post_id, writer_id, content).await?;
        info!(comment_id = %comment.id, post_id = %post_id, "comment created");

        if post.writer_id != writer_id {
            let notification = NewNotification::comment(
                post.writer_id,
                post.id,
                &post.title,
                &comment.writer_nickname,
            );
            if let Err(e) = self.notifications.send(notification).await {
                warn!(post_id = %post_id, error = %e, "failed to notify post writer");
            }
        }

        Ok(CommentView::from_comment(comment, writer_id))
    }

    async fn ensure_writer(&self, viewer: Uuid, comment_id: Uuid) -> Result<()> {
        match self.comments.find_writer_id(comment_id).await? {
            None => Err(AppError::InvalidCommentId),
            Some(writer) if writer != viewer => Err(AppError::UnauthorizedAction),
            Some(_) => Ok(()),
        }
    }

    pub async fn update(&self, viewer: Uuid, comment_id: Uuid, content: &str) -> Result<()> {
        self.ensure_writer(viewer, comment_id).await?;
        self.comments.update(comment_id, content).await?;
        Ok(())
    }

    pub async fn delete(&self, viewer: Uuid, comment_id: Uuid) -> Result<()> {
        self.ensure_writer(viewer, comment_id).await?;
        self.comments.delete(comment_id).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SseConfig;
    use crate::db::comment_repo::MockCommentRepository;
    use crate::db::notification_repo::MockNotificationRepository;
    use crate::db::post_repo::MockPostRepository;
    use crate::db::user_repo::MockUserRepository;
    use crate::models::{
        Comment, LoginType, Notification, NotificationType, Post, Role, User,
    };
    use crate::services::notifications::NOTIFICATION_EVENT;
    use crate::sse::EmitterRegistry;
    use chrono::Utc;
    use futures::StreamExt;

    fn user(id: Uuid) -> User {
        User {
            id,
            username: "commenter".into(),
            password_hash: String::new(),
            nickname: "commenter".into(),
            email: "c@example.com".into(),
            major_name: "CS".into(),
            agree_email: false,
            role: Role::User,
            suspended_until: None,
            login_type: LoginType::Default,
            oauth_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn post(id: Uuid, writer_id: Uuid) -> Post {
        Post {
            id,
            title: "Pinning futures".into(),
            content: "body".into(),
            category_id: 1,
            category_name: "FREE".into(),
            writer_id,
            writer_nickname: "writer".into(),
            view_count: 0,
            like_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn repos_for(writer: Uuid) -> (MockUserRepository, MockPostRepository, MockCommentRepository) {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| Ok(Some(user(id))));
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_by_id()
            .returning(move |id| Ok(Some(post(id, writer))));
        let mut comments = MockCommentRepository::new();
        comments
            .expect_insert()
            .returning(|post_id, writer_id, content| {
                Ok(Comment {
                    id: Uuid::new_v4(),
                    content: content.to_string(),
                    post_id,
                    writer_id,
                    writer_nickname: "commenter".into(),
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
            });
        (users, posts, comments)
    }

    fn stored_notifications() -> MockNotificationRepository {
        let mut repo = MockNotificationRepository::new();
        repo.expect_insert().returning(|n| {
            Ok(Notification {
                id: Uuid::new_v4(),
                user_id: n.user_id,
                notification_type: n.notification_type,
                message: n.message,
                target_id: n.target_id,
                is_read: false,
                created_at: Utc::now(),
            })
        });
        repo
    }

    fn service(
        comments: MockCommentRepository,
        posts: MockPostRepository,
        users: MockUserRepository,
        notifications: MockNotificationRepository,
    ) -> CommentService {
        let notifications = Arc::new(NotificationService::new(
            Arc::new(notifications),
            Arc::new(EmitterRegistry::new()),
            SseConfig::default(),
        ));
        CommentService::new(Arc::new(comments), Arc::new(posts), Arc::new(users), notifications)
    }

    #[tokio::test]
    async fn comment_on_missing_post_is_invalid_post() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|id| Ok(Some(user(id))));
        let mut posts = MockPostRepository::new();
        posts.expect_find_by_id().returning(|_| Ok(None));
        let mut comments = MockCommentRepository::new();
        comments.expect_insert().never();

        let result = service(comments, posts, users, MockNotificationRepository::new())
            .create(Uuid::new_v4(), Uuid::new_v4(), "hello")
            .await;
        assert!(matches!(result, Err(AppError::InvalidPostId)));
    }

    #[tokio::test]
    async fn comment_reaches_connected_post_writer() {
        let writer = Uuid::new_v4();
        let (users, posts, comments) = repos_for(writer);
        let service = service(comments, posts, users, stored_notifications());

        let mut stream = service.notifications.subscribe(writer, None);
        let _handshake = stream.next().await.unwrap().unwrap();

        let view = service
            .create(Uuid::new_v4(), Uuid::new_v4(), "nice post")
            .await
            .unwrap();
        assert!(view.is_writer);
        assert_eq!(view.content, "nice post");

        let frame = stream.next().await.unwrap().unwrap();
        let text = String::from_utf8(frame.to_vec()).unwrap();
        assert!(text.contains(&format!("event:{NOTIFICATION_EVENT}")));
        assert!(text.contains("commenter commented on your post"));
    }

    #[tokio::test]
    async fn own_comment_sends_no_notification() {
        let writer = Uuid::new_v4();
        let (users, posts, comments) = repos_for(writer);
        let mut notifications = MockNotificationRepository::new();
        notifications.expect_insert().never();

        service(comments, posts, users, notifications)
            .create(writer, Uuid::new_v4(), "bump")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_comment() {
        let writer = Uuid::new_v4();
        let (users, posts, comments) = repos_for(writer);
        let mut notifications = MockNotificationRepository::new();
        notifications
            .expect_insert()
            .withf(|n| n.notification_type == NotificationType::Comment)
            .returning(|_| Err(AppError::Internal("insert failed".into())));

        let result = service(comments, posts, users, notifications)
            .create(Uuid::new_v4(), Uuid::new_v4(), "still saved")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn only_writer_may_edit_or_delete() {
        let writer = Uuid::new_v4();
        let mut comments = MockCommentRepository::new();
        comments
            .expect_find_writer_id()
            .returning(move |_| Ok(Some(writer)));
        comments.expect_update().never();
        comments.expect_delete().never();
        let service = service(
            comments,
            MockPostRepository::new(),
            MockUserRepository::new(),
            MockNotificationRepository::new(),
        );

        let intruder = Uuid::new_v4();
        assert!(matches!(
            service.update(intruder, Uuid::new_v4(), "edit").await,
            Err(AppError::UnauthorizedAction)
        ));
        assert!(matches!(
            service.delete(intruder, Uuid::new_v4()).await,
            Err(AppError::UnauthorizedAction)
        ));
    }

    #[tokio::test]
    async fn missing_comment_is_invalid_comment() {
        let mut comments = MockCommentRepository::new();
        comments.expect_find_writer_id().returning(|_| Ok(None));

        let result = service(
            comments,
            MockPostRepository::new(),
            MockUserRepository::new(),
            MockNotificationRepository::new(),
        )
        .delete(Uuid::new_v4(), Uuid::new_v4())
        .await;
        assert!(matches!(result, Err(AppError::InvalidCommentId)));
    }
}
