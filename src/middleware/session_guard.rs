/// Session Guard Middleware
///
/// Validates the bearer token of every request on a protected scope against
/// the session store and injects the authenticated session into request
/// extensions for use by route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;
use std::sync::Arc;

use crate::auth::SessionKeys;
use crate::directory::UserId;
use crate::error::{AppError, AuthError};
use crate::session::{token_fingerprint, SessionPayload, SessionStore};

const BEARER_SCHEME: &str = "bearer";

/// Session attached to a request that passed the guard
#[derive(Clone, Debug)]
pub struct AuthenticatedSession {
    pub user_id: UserId,
    pub email: String,
    pub access_token: String,
}

impl From<SessionPayload> for AuthenticatedSession {
    fn from(payload: SessionPayload) -> Self {
        Self {
            user_id: payload.user_id,
            email: payload.email,
            access_token: payload.access_token,
        }
    }
}

/// Read-only check of an `Authorization` header against the session store.
#[derive(Clone)]
pub struct AccessGuard {
    store: Arc<dyn SessionStore>,
    keys: SessionKeys,
}

impl AccessGuard {
    pub fn new(store: Arc<dyn SessionStore>, keys: SessionKeys) -> Self {
        Self { store, keys }
    }

    /// # Errors
    /// - `AuthError::MissingToken` if there is no usable `Bearer` credential
    /// - `AuthError::InvalidToken` if the session is unknown, expired, revoked,
    ///   mismatched, or the store cannot answer
    pub async fn check(&self, authorization: Option<&str>) -> Result<SessionPayload, AuthError> {
        let token = extract_bearer_token(authorization).ok_or(AuthError::MissingToken)?;
        let fingerprint = token_fingerprint(token);

        let raw = match self.store.get(&self.keys.access(token)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!(access = %fingerprint, "No active session for token");
                return Err(AuthError::InvalidToken);
            }
            Err(e) => {
                tracing::error!(access = %fingerprint, error = %e, "Session lookup failed; rejecting request");
                return Err(AuthError::InvalidToken);
            }
        };

        let payload = SessionPayload::decode(&raw).map_err(|e| {
            tracing::warn!(access = %fingerprint, error = %e, "Unreadable session payload");
            AuthError::InvalidToken
        })?;

        if payload.access_token != token {
            tracing::warn!(access = %fingerprint, "Stored session does not match presented token");
            return Err(AuthError::InvalidToken);
        }

        Ok(payload)
    }
}

/// `Bearer <token>` → `<token>`; anything else → `None`.
pub fn extract_bearer_token(authorization: Option<&str>) -> Option<&str> {
    let (scheme, token) = authorization?.trim().split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) || token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token)
}

/// Middleware protecting a scope with an [`AccessGuard`]
pub struct SessionGuard {
    guard: AccessGuard,
}

impl SessionGuard {
    pub fn new(guard: AccessGuard) -> Self {
        Self { guard }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionGuardService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(SessionGuardService {
            service: Rc::new(service),
            guard: self.guard.clone(),
        }))
    }
}

pub struct SessionGuardService<S> {
    service: Rc<S>,
    guard: AccessGuard,
}

impl<S, B> Service<ServiceRequest> for SessionGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let authorization = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        let guard = self.guard.clone();
        let service = self.service.clone();

        Box::pin(async move {
            match guard.check(authorization.as_deref()).await {
                Ok(payload) => {
                    tracing::debug!(user_id = payload.user_id, "Session validated");
                    req.extensions_mut()
                        .insert(AuthenticatedSession::from(payload));
                    service.call(req).await
                }
                Err(e) => {
                    tracing::warn!(path = %req.path(), error = %e, "Request rejected by session guard");
                    Err(AppError::Auth(e).into())
                }
            }
        })
    }
}
