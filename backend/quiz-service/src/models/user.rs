use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoginType {
    Default,
    Kakao,
    Naver,
}

/// Row of the `users` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub nickname: String,
    pub email: String,
    pub major_name: String,
    pub agree_email: bool,
    pub role: Role,
    /// Sign-in is refused until this instant
    pub suspended_until: Option<DateTime<Utc>>,
    pub login_type: LoginType,
    pub oauth_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// End of a suspension still in force at `now`
    pub fn suspension_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.suspended_until.filter(|until| *until > now)
    }
}

/// Insert payload for a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub nickname: String,
    pub email: String,
    pub major_name: String,
    pub agree_email: bool,
    pub login_type: LoginType,
    pub oauth_id: Option<String>,
}

/// Profile returned to the account owner
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    pub id: Uuid,
    pub username: String,
    pub nickname: String,
    pub email: String,
    pub major_name: String,
    pub agree_email: bool,
    pub role: Role,
    pub login_type: LoginType,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDetail {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            nickname: user.nickname,
            email: user.email,
            major_name: user.major_name,
            agree_email: user.agree_email,
            role: user.role,
            login_type: user.login_type,
            created_at: user.created_at,
        }
    }
}

/// Row shown in the admin user list
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub nickname: String,
    pub email: String,
    pub role: Role,
    pub suspended_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            nickname: user.nickname,
            email: user.email,
            role: user.role,
            suspended_until: user.suspended_until,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserSort {
    #[default]
    NickAsc,
    NickDesc,
    DateAsc,
    DateDesc,
}

impl UserSort {
    pub fn order_by(&self) -> &'static str {
        match self {
            UserSort::NickAsc => "nickname ASC",
            UserSort::NickDesc => "nickname DESC",
            UserSort::DateAsc => "created_at ASC",
            UserSort::DateDesc => "created_at DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuspendStatus {
    Suspend,
    Unsuspend,
}
