//! Authentication routes: email code sign-in and token refresh.

use axum::{Router, extract::State, response::IntoResponse, routing::post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::auth::normalize_email;
use tally_core::ledger::initialize_defaults;
use tally_shared::types::UserId;
use tally_shared::{AppError, TokenKind};
use tracing::{error, info};
use uuid::Uuid;

use crate::AppState;
use crate::extract::ApiJson;
use crate::response::{ApiResult, ok};

/// Creates the auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/send-code", post(send_code))
        .route("/auth/verify", post(verify))
        .route("/auth/refresh", post(refresh))
}

/// Request body for `POST /auth/send-code`.
#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    /// Address to send the code to.
    pub email: String,
}

/// Response for `POST /auth/send-code`.
#[derive(Debug, Serialize)]
pub struct SendCodeResponse {
    /// Minutes until the code expires.
    pub expires_in_minutes: u64,
}

/// Request body for `POST /auth/verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Address the code was sent to.
    pub email: String,
    /// The six digits.
    pub code: String,
}

/// Signed-in user.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    /// User ID.
    pub id: Uuid,
    /// Normalized email.
    pub email: String,
    /// Sign-up time.
    pub created_at: DateTime<Utc>,
}

/// Response for `POST /auth/verify`.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// Whether this sign-in created the user.
    pub is_new_user: bool,
    /// The user.
    pub user: UserInfo,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// A refresh token from `/auth/verify`.
    pub refresh_token: String,
}

/// Response for `POST /auth/refresh`.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token.
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// POST /auth/send-code - Issue a login code and deliver it.
async fn send_code(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SendCodeRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&payload.email)?;
    let code = state.verification.issue(&email)?;
    let ttl_minutes = state.verification.ttl_minutes();

    match &state.email_service {
        Some(mailer) => {
            if let Err(e) = mailer.send_code(&email, &code, ttl_minutes).await {
                error!(error = %e, "Failed to send verification email");
                return Err(AppError::Internal(e.to_string()).into());
            }
            info!("Verification code sent");
        }
        None => {
            info!(email = %email, code = %code, "SMTP not configured, verification code logged");
        }
    }

    Ok(ok(SendCodeResponse {
        expires_in_minutes: ttl_minutes,
    }))
}

/// POST /auth/verify - Exchange a code for tokens, signing up on first use.
async fn verify(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = normalize_email(&payload.email)?;
    state.verification.verify(&email, &payload.code)?;

    let users = state.users();
    let (user, is_new_user) = users.find_or_create_by_email(&email).await?;
    let user_id = UserId::from_uuid(user.id);
    users.record_login(user_id).await?;
    let provisioned = initialize_defaults(&state.store, user_id).await?;
    let tokens = state.jwt_service.issue_pair(user_id)?;

    info!(
        user_id = %user.id,
        is_new_user,
        provisioned = !provisioned.is_empty(),
        "User signed in"
    );

    Ok(ok(VerifyResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        is_new_user,
        user: UserInfo {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
        },
    }))
}

/// POST /auth/refresh - Trade a refresh token for a new access token.
async fn refresh(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let claims = state
        .jwt_service
        .verify(&payload.refresh_token, TokenKind::Refresh)?;
    let access_token = state.jwt_service.issue_access(claims.user_id())?;

    Ok(ok(RefreshResponse {
        access_token,
        expires_in: state.jwt_service.access_ttl_secs(),
    }))
}
