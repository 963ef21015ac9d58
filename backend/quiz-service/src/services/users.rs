use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::kv_store::keys;
use crate::db::{KeyValueStore, UserRepository};
use crate::error::{AppError, Result};
use crate::models::{User, UserDetail};
use crate::security::{hash_password, verify_password};
use crate::services::notifications::NotificationService;

#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub nickname: String,
    pub major_name: String,
    pub agree_email: bool,
}

/// Operations a signed-in user performs on their own account
pub struct UserService {
    users: Arc<dyn UserRepository>,
    store: Arc<dyn KeyValueStore>,
    notifications: Arc<NotificationService>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        store: Arc<dyn KeyValueStore>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            users,
            store,
            notifications,
        }
    }

    async fn load(&self, user_id: Uuid) -> Result<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::InvalidUserId)
    }

    pub async fn get_info(&self, user_id: Uuid) -> Result<UserDetail> {
        Ok(self.load(user_id).await?.into())
    }

    pub async fn update_info(&self, user_id: Uuid, update: ProfileUpdate) -> Result<()> {
        let user = self.load(user_id).await?;
        if user.nickname != update.nickname && self.users.exists_by_nickname(&update.nickname).await? {
            return Err(AppError::ExistNickname);
        }

        self.users
            .update_profile(user_id, &update.nickname, &update.major_name, update.agree_email)
            .await?;
        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self.load(user_id).await?;
        if !verify_password(current_password, &user.password_hash)? {
            return Err(AppError::InvalidPassword);
        }

        self.users
            .update_password(user_id, &hash_password(new_password)?)
            .await?;
        info!(user_id = %user_id, "password changed");
        Ok(())
    }

    pub async fn verify_password(&self, user_id: Uuid, password: &str) -> Result<()> {
        let user = self.load(user_id).await?;
        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::InvalidPassword);
        }
        Ok(())
    }

    /// The presented access token is denied for the rest of its lifetime
    pub async fn delete_account(
        &self,
        user_id: Uuid,
        token_id: &str,
        remaining_secs: u64,
    ) -> Result<()> {
        self.load(user_id).await?;
        self.users.delete(user_id).await?;
        self.store
            .set_ex(&keys::denied_token(token_id), "1", remaining_secs.max(1))
            .await?;
        self.store.delete(&keys::refresh_token(user_id)).await?;
        self.notifications.disconnect_user(user_id);

        info!(user_id = %user_id, "account deleted");
        Ok(())
    }
}
