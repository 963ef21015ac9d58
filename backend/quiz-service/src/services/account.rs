/// Account recovery and email ownership checks
use rand::Rng;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::kv_store::keys;
use crate::db::{KeyValueStore, UserRepository};
use crate::error::{AppError, Result};
use crate::security::hash_password;
use crate::services::email::Mailer;

const RESET_CODE_TTL_SECS: u64 = 10 * 60;
const MAIL_CODE_TTL_SECS: u64 = 5 * 60;

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    store: Arc<dyn KeyValueStore>,
    mailer: Arc<dyn Mailer>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        store: Arc<dyn KeyValueStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            users,
            store,
            mailer,
        }
    }

    pub async fn find_username(&self, email: &str) -> Result<String> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidEmail)?;
        Ok(user.username)
    }

    /// Store a reset code for the account and mail a link carrying it
    pub async fn request_password_reset(&self, username: &str, email: &str) -> Result<()> {
        if !self
            .users
            .exists_by_username_and_email(username, email)
            .await?
        {
            return Err(AppError::InvalidUserInfo);
        }

        let code = Uuid::new_v4().to_string();
        self.store
            .set_ex(&keys::reset_code(username), &code, RESET_CODE_TTL_SECS)
            .await?;
        self.mailer.send_password_reset(email, username, &code).await?;

        info!(username, "password reset mail sent");
        Ok(())
    }

    /// Only a matching, unexpired code permits the write; the code is
    /// consumed on success
    pub async fn reset_password(&self, username: &str, new_password: &str, code: &str) -> Result<()> {
        let key = keys::reset_code(username);
        let stored = self.store.get(&key).await?;
        if stored.as_deref() != Some(code) {
            return Err(AppError::UnauthorizedAction);
        }

        let hash = hash_password(new_password)?;
        if !self
            .users
            .update_password_by_username(username, &hash)
            .await?
        {
            return Err(AppError::InvalidUserId);
        }
        self.store.delete(&key).await?;

        info!(username, "password reset");
        Ok(())
    }

    pub async fn request_mail_code(&self, email: &str) -> Result<()> {
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        self.store
            .set_ex(&keys::mail_code(email), &code, MAIL_CODE_TTL_SECS)
            .await?;
        self.mailer.send_verification_code(email, &code).await?;
        Ok(())
    }

    pub async fn verify_mail_code(&self, email: &str, code: &str) -> Result<()> {
        let key = keys::mail_code(email);
        match self.store.get(&key).await? {
            Some(stored) if stored == code => {
                self.store.delete(&key).await?;
                Ok(())
            }
            _ => Err(AppError::InvalidCode),
        }
    }
}
