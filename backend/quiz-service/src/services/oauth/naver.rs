use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{fetch_json, OAuthError, OAuthProvider, OAuthUserInfo};
use crate::config::OAuthClientConfig;
use crate::models::LoginType;

const TOKEN_URL: &str = "https://nid.naver.com/oauth2.0/token";
const USER_URL: &str = "https://openapi.naver.com/v1/nid/me";
const PROVIDER: &str = "naver";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct NaverProfile {
    id: String,
    email: Option<String>,
}

#[derive(Deserialize)]
struct NaverUser {
    response: NaverProfile,
}

pub struct NaverProvider {
    http: Client,
    config: OAuthClientConfig,
}

impl NaverProvider {
    pub fn new(http: Client, config: OAuthClientConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl OAuthProvider for NaverProvider {
    fn login_type(&self) -> LoginType {
        LoginType::Naver
    }

    async fn fetch_user(&self, code: &str, state: &str) -> Result<OAuthUserInfo, OAuthError> {
        if self.config.client_id.is_empty() {
            return Err(OAuthError::NotConfigured(PROVIDER));
        }

        // Naver validates `state` against the value it issued at authorize time
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("state", state),
        ];

        let token: TokenResponse =
            fetch_json(self.http.post(TOKEN_URL).form(&params), PROVIDER, "token").await?;
        let user: NaverUser = fetch_json(
            self.http.get(USER_URL).bearer_auth(&token.access_token),
            PROVIDER,
            "user",
        )
        .await?;

        Ok(OAuthUserInfo {
            oauth_id: user.response.id,
            email: user.response.email,
        })
    }
}
