use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{fetch_json, OAuthError, OAuthProvider, OAuthUserInfo};
use crate::config::OAuthClientConfig;
use crate::models::LoginType;

const TOKEN_URL: &str = "https://kauth.kakao.com/oauth/token";
const USER_URL: &str = "https://kapi.kakao.com/v2/user/me";
const PROVIDER: &str = "kakao";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct KakaoAccount {
    email: Option<String>,
}

#[derive(Deserialize)]
struct KakaoUser {
    id: i64,
    kakao_account: Option<KakaoAccount>,
}

impl From<KakaoUser> for OAuthUserInfo {
    fn from(user: KakaoUser) -> Self {
        Self {
            oauth_id: user.id.to_string(),
            email: user.kakao_account.and_then(|account| account.email),
        }
    }
}

pub struct KakaoProvider {
    http: Client,
    config: OAuthClientConfig,
}

impl KakaoProvider {
    pub fn new(http: Client, config: OAuthClientConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl OAuthProvider for KakaoProvider {
    fn login_type(&self) -> LoginType {
        LoginType::Kakao
    }

    async fn fetch_user(&self, code: &str, _state: &str) -> Result<OAuthUserInfo, OAuthError> {
        if self.config.client_id.is_empty() {
            return Err(OAuthError::NotConfigured(PROVIDER));
        }

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code),
        ];
        if !self.config.client_secret.is_empty() {
            params.push(("client_secret", self.config.client_secret.as_str()));
        }

        let token: TokenResponse =
            fetch_json(self.http.post(TOKEN_URL).form(&params), PROVIDER, "token").await?;
        let user: KakaoUser = fetch_json(
            self.http.get(USER_URL).bearer_auth(&token.access_token),
            PROVIDER,
            "user",
        )
        .await?;

        Ok(user.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_payload_maps_to_identity() {
        let user: KakaoUser = serde_json::from_str(
            r#"{"id": 1234567, "kakao_account": {"email": "kim@kakao.com", "has_email": true}}"#,
        )
        .unwrap();
        let info = OAuthUserInfo::from(user);
        assert_eq!(info.oauth_id, "1234567");
        assert_eq!(info.email.as_deref(), Some("kim@kakao.com"));
    }

    #[tokio::test]
    async fn unconfigured_client_fails_fast() {
        let provider = KakaoProvider::new(Client::new(), OAuthClientConfig::default());
        assert!(matches!(
            provider.fetch_user("code", "state").await,
            Err(OAuthError::NotConfigured("kakao"))
        ));
    }
}
