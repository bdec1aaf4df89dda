/// Rate Limit Middleware
///
/// Refuses requests with 429 once the calling client has used up its budget.
/// Clients are told apart by peer IP; forwarded-for headers are not trusted.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::error::AppError;
use crate::security::RateLimiter;

const UNKNOWN_CLIENT: &str = "unknown";

pub struct RateLimit {
    limiter: RateLimiter,
    scope: &'static str,
}

impl RateLimit {
    /// `scope` names the limit in logs (e.g. "login").
    pub fn new(limiter: RateLimiter, scope: &'static str) -> Self {
        Self { limiter, scope }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RateLimitService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            scope: self.scope,
        }))
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
    limiter: RateLimiter,
    scope: &'static str,
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
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
        let client = req
            .peer_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string());

        if let Err(retry_after) = self.limiter.check(&client) {
            tracing::warn!(
                scope = self.scope,
                retry_after_secs = retry_after.as_secs(),
                "Request rejected by rate limit"
            );
            return Box::pin(async move { Err(AppError::RateLimited(retry_after).into()) });
        }

        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}
