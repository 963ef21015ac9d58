/// Authorization-code exchange with the supported OAuth providers
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::LoginType;

pub mod kakao;
pub mod naver;

pub use kakao::KakaoProvider;
pub use naver::NaverProvider;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("{0} client is not configured")]
    NotConfigured(&'static str),

    #[error("{provider} {step} request failed: {message}")]
    Request {
        provider: &'static str,
        step: &'static str,
        message: String,
    },

    #[error("{provider} {step} returned status {status}")]
    Status {
        provider: &'static str,
        step: &'static str,
        status: u16,
    },

    #[error("{provider} {step} response could not be parsed: {message}")]
    Parse {
        provider: &'static str,
        step: &'static str,
        message: String,
    },
}

/// Identity returned by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthUserInfo {
    pub oauth_id: String,
    pub email: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn login_type(&self) -> LoginType;

    /// Exchange an authorization code and read the user's provider identity
    async fn fetch_user(&self, code: &str, state: &str) -> Result<OAuthUserInfo, OAuthError>;
}

/// Send `request` and decode a successful JSON body
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    provider: &'static str,
    step: &'static str,
) -> Result<T, OAuthError> {
    let response = request.send().await.map_err(|e| OAuthError::Request {
        provider,
        step,
        message: e.to_string(),
    })?;

    if !response.status().is_success() {
        return Err(OAuthError::Status {
            provider,
            step,
            status: response.status().as_u16(),
        });
    }

    response.json::<T>().await.map_err(|e| OAuthError::Parse {
        provider,
        step,
        message: e.to_string(),
    })
}
