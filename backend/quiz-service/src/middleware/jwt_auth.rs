use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, FromRequest, HttpMessage, HttpRequest,
};
use futures::future::{ready, Ready};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::kv_store::keys;
use crate::db::KeyValueStore;
use crate::error::AppError;
use crate::models::Role;
use crate::security::{bearer_token, JwtManager, ACCESS_TOKEN};

/// Caller identity taken from a valid access token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    /// `jti` of the presented token, used to deny it on sign-out
    pub token_id: String,
    pub remaining_secs: u64,
}

/// An [`AuthUser`] holding the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

/// Validates `Authorization: Bearer` access tokens.
///
/// Requests without the header pass through anonymously; handlers that need
/// a caller ask for [`AuthUser`]. A present but invalid, expired or signed-out
/// token is rejected with 401.
pub struct JwtAuthMiddleware {
    jwt: Arc<JwtManager>,
    store: Arc<dyn KeyValueStore>,
}

impl JwtAuthMiddleware {
    pub fn new(jwt: Arc<JwtManager>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { jwt, store }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            jwt: self.jwt.clone(),
            store: self.store.clone(),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    jwt: Arc<JwtManager>,
    store: Arc<dyn KeyValueStore>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let jwt = self.jwt.clone();
        let store = self.store.clone();

        Box::pin(async move {
            let header = match req.headers().get(AUTHORIZATION) {
                Some(value) => Some(value.to_str().map_err(|_| AppError::InvalidToken)?.to_owned()),
                None => None,
            };

            if let Some(header) = header {
                let token = bearer_token(&header).ok_or(AppError::InvalidToken)?;
                let claims = jwt.validate(token, ACCESS_TOKEN).map_err(|e| {
                    tracing::debug!(error = %e, "access token rejected");
                    e
                })?;

                if store.exists(&keys::denied_token(&claims.jti)).await? {
                    tracing::debug!(jti = %claims.jti, "signed-out token presented");
                    return Err(AppError::InvalidToken.into());
                }

                req.extensions_mut().insert(AuthUser {
                    id: claims.user_id()?,
                    role: claims.role,
                    remaining_secs: claims.remaining_secs(),
                    token_id: claims.jti,
                });
            }

            service.call(req).await
        })
    }
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or(AppError::Unauthorized),
        )
    }
}

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = match req.extensions().get::<AuthUser>() {
            None => Err(AppError::Unauthorized),
            Some(user) if user.role != Role::Admin => Err(AppError::Forbidden),
            Some(user) => Ok(AdminUser(user.clone())),
        };
        ready(result)
    }
}
