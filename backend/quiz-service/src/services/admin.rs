use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::kv_store::keys;
use crate::db::{KeyValueStore, PostRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::models::{
    Page, PageRequest, PostFilter, PostSort, PostSummary, SuspendStatus, UserSort, UserSummary,
};
use crate::services::notifications::NotificationService;

/// Moderation over all users and posts; callers are checked for the admin role upstream
pub struct AdminService {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    store: Arc<dyn KeyValueStore>,
    notifications: Arc<NotificationService>,
}

impl AdminService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        posts: Arc<dyn PostRepository>,
        store: Arc<dyn KeyValueStore>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            users,
            posts,
            store,
            notifications,
        }
    }

    pub async fn list_users(&self, page: PageRequest, sort: UserSort) -> Result<Page<UserSummary>> {
        let (users, total) = self.users.list(page, sort).await?;
        Ok(Page::new(users, page, total).map(UserSummary::from))
    }

    pub async fn delete_user(&self, admin_id: Uuid, user_id: Uuid) -> Result<()> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AppError::InvalidUserId);
        }
        self.users.delete(user_id).await?;
        self.store.delete(&keys::refresh_token(user_id)).await?;
        self.notifications.disconnect_user(user_id);

        info!(admin_id = %admin_id, user_id = %user_id, "user deleted by admin");
        Ok(())
    }

    /// Suspend for `days` from now, or lift a suspension. Suspending also
    /// revokes the stored refresh token and closes open streams.
    pub async fn set_suspension(
        &self,
        admin_id: Uuid,
        user_id: Uuid,
        status: SuspendStatus,
        days: u32,
    ) -> Result<()> {
        let until = match status {
            SuspendStatus::Suspend => Some(Utc::now() + Duration::days(i64::from(days))),
            SuspendStatus::Unsuspend => None,
        };
        if !self.users.set_suspended_until(user_id, until).await? {
            return Err(AppError::InvalidUserId);
        }
        if until.is_some() {
            self.store.delete(&keys::refresh_token(user_id)).await?;
            self.notifications.disconnect_user(user_id);
        }

        info!(admin_id = %admin_id, user_id = %user_id, until = ?until, "user suspension changed");
        Ok(())
    }

    pub async fn list_posts(&self, page: PageRequest, sort: PostSort) -> Result<Page<PostSummary>> {
        let (posts, total) = self.posts.list(PostFilter::All, sort, page).await?;
        Ok(Page::new(posts, page, total))
    }

    pub async fn delete_post(&self, admin_id: Uuid, post_id: Uuid) -> Result<()> {
        if !self.posts.delete(post_id).await? {
            return Err(AppError::InvalidPostId);
        }
        info!(admin_id = %admin_id, post_id = %post_id, "post deleted by admin");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SseConfig;
    use crate::db::kv_store::MockKeyValueStore;
    use crate::db::notification_repo::MockNotificationRepository;
    use crate::db::post_repo::MockPostRepository;
    use crate::db::user_repo::MockUserRepository;
    use crate::sse::EmitterRegistry;

    fn service(
        users: MockUserRepository,
        posts: MockPostRepository,
        store: MockKeyValueStore,
    ) -> AdminService {
        let notifications = Arc::new(NotificationService::new(
            Arc::new(MockNotificationRepository::new()),
            Arc::new(EmitterRegistry::new()),
            SseConfig::default(),
        ));
        AdminService::new(Arc::new(users), Arc::new(posts), Arc::new(store), notifications)
    }

    #[tokio::test]
    async fn deleting_missing_user_is_invalid_user() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));
        users.expect_delete().never();

        let result = service(users, MockPostRepository::new(), MockKeyValueStore::new())
            .delete_user(Uuid::new_v4(), Uuid::new_v4())
            .await;
        assert!(matches!(result, Err(AppError::InvalidUserId)));
    }

    #[tokio::test]
    async fn suspend_sets_unlock_time_and_revokes_refresh_token() {
        let target = Uuid::new_v4();
        let earliest = Utc::now() + Duration::days(7);
        let mut users = MockUserRepository::new();
        users
            .expect_set_suspended_until()
            .withf(move |id, until| {
                *id == target
                    && until.map_or(false, |t| {
                        t >= earliest && t <= earliest + Duration::minutes(1)
                    })
            })
            .times(1)
            .returning(|_, _| Ok(true));
        let mut store = MockKeyValueStore::new();
        let key = keys::refresh_token(target);
        store
            .expect_delete()
            .withf(move |k| k == key)
            .times(1)
            .returning(|_| Ok(()));

        service(users, MockPostRepository::new(), store)
            .set_suspension(Uuid::new_v4(), target, SuspendStatus::Suspend, 7)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unsuspend_clears_unlock_time_and_keeps_tokens() {
        let mut users = MockUserRepository::new();
        users
            .expect_set_suspended_until()
            .withf(|_, until| until.is_none())
            .returning(|_, _| Ok(true));
        let mut store = MockKeyValueStore::new();
        store.expect_delete().never();

        service(users, MockPostRepository::new(), store)
            .set_suspension(Uuid::new_v4(), Uuid::new_v4(), SuspendStatus::Unsuspend, 7)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn suspending_missing_user_is_invalid_user() {
        let mut users = MockUserRepository::new();
        users.expect_set_suspended_until().returning(|_, _| Ok(false));
        let mut store = MockKeyValueStore::new();
        store.expect_delete().never();

        let result = service(users, MockPostRepository::new(), store)
            .set_suspension(Uuid::new_v4(), Uuid::new_v4(), SuspendStatus::Suspend, 1)
            .await;
        assert!(matches!(result, Err(AppError::InvalidUserId)));
    }

    #[tokio::test]
    async fn deleting_missing_post_is_invalid_post() {
        let mut posts = MockPostRepository::new();
        posts.expect_delete().returning(|_| Ok(false));

        let result = service(MockUserRepository::new(), posts, MockKeyValueStore::new())
            .delete_post(Uuid::new_v4(), Uuid::new_v4())
            .await;
        assert!(matches!(result, Err(AppError::InvalidPostId)));
    }
}
