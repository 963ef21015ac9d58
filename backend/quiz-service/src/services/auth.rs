/// Sign-up, sign-in, token rotation and OAuth login
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::kv_store::keys;
use crate::db::{KeyValueStore, UserRepository};
use crate::error::{AppError, Result};
use crate::models::{LoginType, NewUser, User};
use crate::security::{hash_password, unusable_password, verify_password, JwtManager, REFRESH_TOKEN};
use crate::services::notifications::NotificationService;
use crate::services::oauth::OAuthProvider;

/// Lifetime of the ticket handed out for an unregistered provider identity
const OAUTH_SIGN_UP_TTL_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct SignUpInput {
    pub username: String,
    pub password: String,
    pub nickname: String,
    pub email: String,
    pub major_name: String,
    pub agree_email: bool,
}

#[derive(Debug, Clone)]
pub struct OAuthSignUpInput {
    pub sign_up_token: String,
    pub email: String,
    pub nickname: String,
    pub major_name: String,
    pub agree_email: bool,
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Provider identity with no local account yet. `sign_up_token` is the only
/// way to claim it; the identity itself stays on the server.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOAuthUser {
    pub sign_up_token: String,
    pub login_type: LoginType,
    pub email: Option<String>,
}

/// Identity confirmed by a provider, parked until sign-up completes
#[derive(Debug, Serialize, Deserialize)]
struct VerifiedIdentity {
    oauth_id: String,
    login_type: LoginType,
}

#[derive(Debug)]
pub enum OAuthOutcome {
    SignedIn(TokenPair),
    SignUpRequired(PendingOAuthUser),
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    store: Arc<dyn KeyValueStore>,
    jwt: Arc<JwtManager>,
    notifications: Arc<NotificationService>,
    kakao: Arc<dyn OAuthProvider>,
    naver: Arc<dyn OAuthProvider>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        store: Arc<dyn KeyValueStore>,
        jwt: Arc<JwtManager>,
        notifications: Arc<NotificationService>,
        kakao: Arc<dyn OAuthProvider>,
        naver: Arc<dyn OAuthProvider>,
    ) -> Self {
        Self {
            users,
            store,
            jwt,
            notifications,
            kakao,
            naver,
        }
    }

    pub async fn sign_up(&self, input: SignUpInput) -> Result<Uuid> {
        self.ensure_username_available(&input.username).await?;
        self.ensure_nickname_available(&input.nickname).await?;

        let user = self
            .users
            .insert(NewUser {
                password_hash: hash_password(&input.password)?,
                username: input.username,
                nickname: input.nickname,
                email: input.email,
                major_name: input.major_name,
                agree_email: input.agree_email,
                login_type: LoginType::Default,
                oauth_id: None,
            })
            .await?;

        info!(user_id = %user.id, "user signed up");
        Ok(user.id)
    }

    pub async fn ensure_username_available(&self, username: &str) -> Result<()> {
        if self.users.exists_by_username(username).await? {
            return Err(AppError::ExistUsername);
        }
        Ok(())
    }

    pub async fn ensure_nickname_available(&self, nickname: &str) -> Result<()> {
        if self.users.exists_by_nickname(nickname).await? {
            return Err(AppError::ExistNickname);
        }
        Ok(())
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> Result<TokenPair> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::InvalidCredentials);
        }

        self.issue_tokens(&user).await
    }

    /// Rotate the pair; the presented refresh token must be the stored one
    pub async fn reissue(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.jwt.validate(refresh_token, REFRESH_TOKEN)?;
        let user_id = claims.user_id()?;

        let stored = self.store.get(&keys::refresh_token(user_id)).await?;
        if stored.as_deref() != Some(refresh_token) {
            return Err(AppError::InvalidToken);
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::InvalidToken)?;
        self.issue_tokens(&user).await
    }

    /// Deny the access token until it expires, drop the refresh token and
    /// close the user's notification streams
    pub async fn sign_out(&self, user_id: Uuid, token_id: &str, remaining_secs: u64) -> Result<()> {
        self.store
            .set_ex(&keys::denied_token(token_id), "1", remaining_secs.max(1))
            .await?;
        self.store.delete(&keys::refresh_token(user_id)).await?;
        self.notifications.disconnect_user(user_id);

        info!(user_id = %user_id, "user signed out");
        Ok(())
    }

    pub async fn oauth_sign_in(
        &self,
        login_type: LoginType,
        code: &str,
        state: &str,
    ) -> Result<OAuthOutcome> {
        let provider = self.provider(login_type)?;
        let identity = provider.fetch_user(code, state).await?;

        match self
            .users
            .find_by_oauth(login_type, &identity.oauth_id)
            .await?
        {
            Some(user) => Ok(OAuthOutcome::SignedIn(self.issue_tokens(&user).await?)),
            None => {
                let ticket = Uuid::new_v4().to_string();
                let verified = serde_json::to_string(&VerifiedIdentity {
                    oauth_id: identity.oauth_id,
                    login_type,
                })
                .map_err(|e| AppError::Internal(e.to_string()))?;
                self.store
                    .set_ex(&keys::oauth_sign_up(&ticket), &verified, OAUTH_SIGN_UP_TTL_SECS)
                    .await?;

                Ok(OAuthOutcome::SignUpRequired(PendingOAuthUser {
                    sign_up_token: ticket,
                    login_type,
                    email: identity.email,
                }))
            }
        }
    }

    /// Complete registration for an identity parked by `oauth_sign_in`.
    /// The ticket is spent once the account exists.
    pub async fn oauth_sign_up(&self, input: OAuthSignUpInput) -> Result<TokenPair> {
        let key = keys::oauth_sign_up(&input.sign_up_token);
        let raw = self.store.get(&key).await?.ok_or(AppError::InvalidToken)?;
        let identity: VerifiedIdentity =
            serde_json::from_str(&raw).map_err(|e| AppError::Internal(e.to_string()))?;

        if self
            .users
            .find_by_oauth(identity.login_type, &identity.oauth_id)
            .await?
            .is_some()
        {
            self.store.delete(&key).await?;
            return Err(AppError::ExistUsername);
        }
        self.ensure_nickname_available(&input.nickname).await?;

        let user = self
            .users
            .insert(NewUser {
                username: oauth_username(identity.login_type, &identity.oauth_id),
                password_hash: hash_password(&unusable_password())?,
                nickname: input.nickname,
                email: input.email,
                major_name: input.major_name,
                agree_email: input.agree_email,
                login_type: identity.login_type,
                oauth_id: Some(identity.oauth_id),
            })
            .await?;
        self.store.delete(&key).await?;

        info!(user_id = %user.id, login_type = ?user.login_type, "oauth user signed up");
        self.issue_tokens(&user).await
    }

    fn provider(&self, login_type: LoginType) -> Result<&Arc<dyn OAuthProvider>> {
        match login_type {
            LoginType::Kakao => Ok(&self.kakao),
            LoginType::Naver => Ok(&self.naver),
            LoginType::Default => Err(AppError::BadRequest("unsupported login type".into())),
        }
    }

    async fn issue_tokens(&self, user: &User) -> Result<TokenPair> {
        if let Some(until) = user.suspension_at(Utc::now()) {
            return Err(AppError::SuspendedUser(until));
        }

        let access_token = self.jwt.issue_access(user.id, user.role)?;
        let refresh_token = self.jwt.issue_refresh(user.id, user.role)?;
        self.store
            .set_ex(
                &keys::refresh_token(user.id),
                &refresh_token,
                self.jwt.refresh_ttl_secs().max(1) as u64,
            )
            .await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

/// Local username for an OAuth account, unique per provider identity
fn oauth_username(login_type: LoginType, oauth_id: &str) -> String {
    let prefix = match login_type {
        LoginType::Kakao => "kakao",
        LoginType::Naver => "naver",
        LoginType::Default => "user",
    };
    format!("{prefix}_{}", oauth_id.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SseConfig;
    use crate::db::kv_store::MockKeyValueStore;
    use crate::db::notification_repo::MockNotificationRepository;
    use crate::db::user_repo::MockUserRepository;
    use crate::models::Role;
    use crate::security::jwt::test_keys;
    use crate::services::oauth::{MockOAuthProvider, OAuthUserInfo};
    use crate::sse::EmitterRegistry;
    use chrono::{DateTime, Duration};
    use mockall::predicate::eq;
    use std::sync::Mutex;

    fn user(password: &str, suspended_until: Option<DateTime<Utc>>) -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice01".into(),
            password_hash: hash_password(password).unwrap(),
            nickname: "alice".into(),
            email: "alice@example.com".into(),
            major_name: "CS".into(),
            agree_email: true,
            role: Role::User,
            suspended_until,
            login_type: LoginType::Default,
            oauth_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    struct Deps {
        users: MockUserRepository,
        store: MockKeyValueStore,
        kakao: MockOAuthProvider,
    }

    impl Deps {
        fn new() -> Self {
            Self {
                users: MockUserRepository::new(),
                store: MockKeyValueStore::new(),
                kakao: MockOAuthProvider::new(),
            }
        }

        fn build(self) -> (AuthService, Arc<NotificationService>) {
            let notifications = Arc::new(NotificationService::new(
                Arc::new(MockNotificationRepository::new()),
                Arc::new(EmitterRegistry::new()),
                SseConfig::default(),
            ));
            let service = AuthService::new(
                Arc::new(self.users),
                Arc::new(self.store),
                Arc::new(JwtManager::from_config(&test_keys::config()).unwrap()),
                notifications.clone(),
                Arc::new(self.kakao),
                Arc::new(MockOAuthProvider::new()),
            );
            (service, notifications)
        }
    }

    fn sign_up_input() -> SignUpInput {
        SignUpInput {
            username: "alice01".into(),
            password: "password1".into(),
            nickname: "alice".into(),
            email: "alice@example.com".into(),
            major_name: "CS".into(),
            agree_email: true,
        }
    }

    #[tokio::test]
    async fn sign_up_rejects_taken_username() {
        let mut deps = Deps::new();
        deps.users
            .expect_exists_by_username()
            .returning(|_| Ok(true));
        deps.users.expect_insert().never();

        let (service, _) = deps.build();
        assert!(matches!(
            service.sign_up(sign_up_input()).await,
            Err(AppError::ExistUsername)
        ));
    }

    #[tokio::test]
    async fn sign_up_rejects_taken_nickname() {
        let mut deps = Deps::new();
        deps.users.expect_exists_by_username().returning(|_| Ok(false));
        deps.users.expect_exists_by_nickname().returning(|_| Ok(true));
        deps.users.expect_insert().never();

        let (service, _) = deps.build();
        assert!(matches!(
            service.sign_up(sign_up_input()).await,
            Err(AppError::ExistNickname)
        ));
    }

    #[tokio::test]
    async fn sign_up_stores_hashed_password() {
        let mut deps = Deps::new();
        deps.users.expect_exists_by_username().returning(|_| Ok(false));
        deps.users.expect_exists_by_nickname().returning(|_| Ok(false));
        deps.users
            .expect_insert()
            .withf(|new| {
                new.password_hash != "password1"
                    && verify_password("password1", &new.password_hash).unwrap()
                    && new.login_type == LoginType::Default
            })
            .returning(|new| {
                let mut created = user("password1", None);
                created.username = new.username;
                Ok(created)
            });

        let (service, _) = deps.build();
        service.sign_up(sign_up_input()).await.unwrap();
    }

    #[tokio::test]
    async fn sign_in_with_unknown_username_is_invalid_credentials() {
        let mut deps = Deps::new();
        deps.users.expect_find_by_username().returning(|_| Ok(None));

        let (service, _) = deps.build();
        assert!(matches!(
            service.sign_in("nobody", "password1").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn sign_in_with_wrong_password_is_invalid_credentials() {
        let mut deps = Deps::new();
        let stored = user("password1", None);
        deps.users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(stored.clone())));

        let (service, _) = deps.build();
        assert!(matches!(
            service.sign_in("alice01", "password2").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn suspended_user_cannot_sign_in() {
        let mut deps = Deps::new();
        let until = Utc::now() + Duration::days(3);
        let stored = user("password1", Some(until));
        deps.users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(stored.clone())));
        deps.store.expect_set_ex().never();

        let (service, _) = deps.build();
        match service.sign_in("alice01", "password1").await {
            Err(AppError::SuspendedUser(reported)) => assert_eq!(reported, until),
            other => panic!("expected suspension, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn lapsed_suspension_allows_sign_in() {
        let mut deps = Deps::new();
        let stored = user("password1", Some(Utc::now() - Duration::minutes(1)));
        deps.users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(stored.clone())));
        deps.store.expect_set_ex().times(1).returning(|_, _, _| Ok(()));

        let (service, _) = deps.build();
        assert!(service.sign_in("alice01", "password1").await.is_ok());
    }

    #[tokio::test]
    async fn sign_in_stores_refresh_token() {
        let mut deps = Deps::new();
        let stored = user("password1", None);
        let key = keys::refresh_token(stored.id);
        deps.users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(stored.clone())));
        deps.store
            .expect_set_ex()
            .withf(move |k, _, ttl| k == key && *ttl == 1_209_600)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let (service, _) = deps.build();
        let pair = service.sign_in("alice01", "password1").await.unwrap();
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[tokio::test]
    async fn reissue_rejects_rotated_refresh_token() {
        let jwt = JwtManager::from_config(&test_keys::config()).unwrap();
        let user_id = Uuid::new_v4();
        let presented = jwt.issue_refresh(user_id, Role::User).unwrap();

        let key = keys::refresh_token(user_id);
        let mut deps = Deps::new();
        deps.store
            .expect_get()
            .withf(move |k| k == key)
            .returning(|_| Ok(Some("a-newer-token".into())));
        deps.users.expect_find_by_id().never();

        let (service, _) = deps.build();
        assert!(matches!(
            service.reissue(&presented).await,
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn reissue_rejects_access_token() {
        let jwt = JwtManager::from_config(&test_keys::config()).unwrap();
        let access = jwt.issue_access(Uuid::new_v4(), Role::User).unwrap();

        let (service, _) = Deps::new().build();
        assert!(matches!(
            service.reissue(&access).await,
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn sign_out_denies_token_and_closes_streams() {
        let user_id = Uuid::new_v4();
        let refresh_key = keys::refresh_token(user_id);
        let mut deps = Deps::new();
        deps.store
            .expect_set_ex()
            .withf(|key, value, ttl| key == "deny:jti-1" && value == "1" && *ttl == 120)
            .times(1)
            .returning(|_, _, _| Ok(()));
        deps.store
            .expect_delete()
            .withf(move |k| k == refresh_key)
            .times(1)
            .returning(|_| Ok(()));

        let (service, notifications) = deps.build();
        let _stream = notifications.subscribe(user_id, None);
        assert_eq!(notifications.registry().emitter_count(), 1);

        service.sign_out(user_id, "jti-1", 120).await.unwrap();
        assert_eq!(notifications.registry().emitter_count(), 0);
    }

    #[tokio::test]
    async fn unknown_oauth_identity_requires_sign_up() {
        let mut deps = Deps::new();
        deps.kakao.expect_fetch_user().returning(|_, _| {
            Ok(OAuthUserInfo {
                oauth_id: "98765".into(),
                email: Some("kim@kakao.com".into()),
            })
        });
        deps.users
            .expect_find_by_oauth()
            .with(eq(LoginType::Kakao), eq("98765"))
            .returning(|_, _| Ok(None));
        let parked = Arc::new(Mutex::new(None));
        let sink = parked.clone();
        deps.store
            .expect_set_ex()
            .withf(|key, _, ttl| key.starts_with("oauth:") && *ttl == OAUTH_SIGN_UP_TTL_SECS)
            .times(1)
            .returning(move |key, value, _| {
                *sink.lock().unwrap() = Some((key.to_string(), value.to_string()));
                Ok(())
            });

        let (service, _) = deps.build();
        let pending = match service
            .oauth_sign_in(LoginType::Kakao, "code", "state")
            .await
            .unwrap()
        {
            OAuthOutcome::SignUpRequired(pending) => pending,
            OAuthOutcome::SignedIn(_) => panic!("expected sign-up"),
        };
        assert_eq!(pending.login_type, LoginType::Kakao);

        let (key, value) = parked.lock().unwrap().clone().unwrap();
        assert_eq!(key, keys::oauth_sign_up(&pending.sign_up_token));
        assert!(value.contains("98765"));
        let body = serde_json::to_value(&pending).unwrap();
        assert!(body.get("oauthId").is_none());
    }

    fn oauth_sign_up_input(ticket: &str) -> OAuthSignUpInput {
        OAuthSignUpInput {
            sign_up_token: ticket.into(),
            email: "kim@kakao.com".into(),
            nickname: "kim".into(),
            major_name: "CS".into(),
            agree_email: false,
        }
    }

    #[tokio::test]
    async fn oauth_sign_up_without_parked_identity_is_rejected() {
        let mut deps = Deps::new();
        deps.store.expect_get().returning(|_| Ok(None));
        deps.kakao.expect_fetch_user().never();
        deps.users.expect_find_by_oauth().never();
        deps.users.expect_insert().never();

        let (service, _) = deps.build();
        assert!(matches!(
            service.oauth_sign_up(oauth_sign_up_input("forged-ticket")).await,
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn oauth_sign_up_binds_parked_identity_and_spends_ticket() {
        let key = keys::oauth_sign_up("ticket-1");
        let mut deps = Deps::new();
        let lookup = key.clone();
        deps.store
            .expect_get()
            .withf(move |k| k == lookup)
            .returning(|_| Ok(Some(r#"{"oauth_id":"98765","login_type":"KAKAO"}"#.into())));
        deps.users
            .expect_find_by_oauth()
            .with(eq(LoginType::Kakao), eq("98765"))
            .returning(|_, _| Ok(None));
        deps.users.expect_exists_by_nickname().returning(|_| Ok(false));
        deps.users
            .expect_insert()
            .withf(|new| {
                new.oauth_id.as_deref() == Some("98765")
                    && new.login_type == LoginType::Kakao
                    && new.username == "kakao_98765"
            })
            .times(1)
            .returning(|new| {
                let mut created = user("unused1", None);
                created.username = new.username;
                created.login_type = new.login_type;
                created.oauth_id = new.oauth_id;
                Ok(created)
            });
        deps.store
            .expect_delete()
            .withf(move |k| k == key)
            .times(1)
            .returning(|_| Ok(()));
        deps.store.expect_set_ex().times(1).returning(|_, _, _| Ok(()));

        let (service, _) = deps.build();
        service
            .oauth_sign_up(oauth_sign_up_input("ticket-1"))
            .await
            .unwrap();
    }

    #[test]
    fn oauth_usernames_are_namespaced() {
        assert_eq!(oauth_username(LoginType::Naver, "AbC"), "naver_abc");
        assert_eq!(oauth_username(LoginType::Kakao, "42"), "kakao_42");
    }
}
