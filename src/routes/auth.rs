/// Authentication Routes
///
/// Login, token refresh, logout, withdrawal and current-session lookup.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, TokenPair};
use crate::directory::UserId;
use crate::error::AppError;
use crate::middleware::AuthenticatedSession;
use crate::validators::{is_present_password, is_valid_email, is_valid_token_input};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    pub user_id: UserId,
    pub refresh_token: String,
}

/// Body of logout and withdraw
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOwnerRequest {
    pub user_id: UserId,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

impl AuthResponse {
    fn new(pair: TokenPair, service: &AuthService) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: "Bearer",
            expires_in: service.policy().access_ttl().as_secs(),
        }
    }
}

#[derive(Serialize)]
pub struct AcknowledgeResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user_id: UserId,
    pub email: String,
}

/// POST /auth/login
///
/// # Errors
/// - 400: Malformed body or email
/// - 401: Unknown email or wrong password (indistinguishable)
/// - 503: Session store or user directory unavailable
pub async fn login(
    form: web::Json<LoginRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    is_present_password(&form.password)?;

    let pair = service.login(&email, &form.password).await?;

    Ok(HttpResponse::Ok().json(AuthResponse::new(pair, &service)))
}

/// POST /auth/refresh-token
///
/// Rotates the session: the presented refresh token and its access token
/// stop working once the new pair is returned.
///
/// # Errors
/// - 400: Malformed body
/// - 401: Unknown, expired, rotated or foreign refresh token
/// - 404: The user no longer exists
/// - 503: Session store or user directory unavailable
pub async fn refresh_token(
    form: web::Json<RefreshTokenRequest>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    is_valid_token_input("refreshToken", &form.refresh_token)?;

    let pair = service.refresh(form.user_id, &form.refresh_token).await?;

    Ok(HttpResponse::Ok().json(AuthResponse::new(pair, &service)))
}

/// POST /auth/logout
///
/// **Requires** `Authorization: Bearer <access_token>`.
///
/// # Errors
/// - 401: Missing/invalid token, or the token belongs to another user
/// - 503: Session store unavailable
pub async fn logout(
    form: web::Json<SessionOwnerRequest>,
    session: web::ReqData<AuthenticatedSession>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    service.logout(form.user_id, &session.access_token).await?;

    Ok(HttpResponse::Ok().json(AcknowledgeResponse {
        success: true,
        message: "Logged out",
    }))
}

/// POST /auth/withdraw
///
/// Logs the session out and deactivates the account.
/// **Requires** `Authorization: Bearer <access_token>`.
pub async fn withdraw(
    form: web::Json<SessionOwnerRequest>,
    session: web::ReqData<AuthenticatedSession>,
    service: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    service.withdraw(form.user_id, &session.access_token).await?;

    Ok(HttpResponse::Ok().json(AcknowledgeResponse {
        success: true,
        message: "Account withdrawn",
    }))
}

/// GET /auth/me
///
/// **Requires** `Authorization: Bearer <access_token>`.
pub async fn current_session(session: web::ReqData<AuthenticatedSession>) -> HttpResponse {
    HttpResponse::Ok().json(SessionResponse {
        user_id: session.user_id,
        email: session.email.clone(),
    })
}
