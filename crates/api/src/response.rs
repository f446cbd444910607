//! Response envelope and error rendering.
//!
//! Success bodies are `{"success": true, "data": ...}`; failures are
//! `{"success": false, "error": {"code", "message"}}` with a message that
//! never carries store or driver details.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};
use sea_orm::DbErr;
use serde::Serialize;
use tally_core::auth::VerificationError;
use tally_core::export::ExportError;
use tally_core::ledger::LedgerError;
use tally_core::smart_booking::SmartBookingError;
use tally_shared::{AppError, JwtError};
use tracing::{error, warn};

/// Successful response body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always `true`.
    pub success: bool,
    /// Payload.
    pub data: T,
}

/// Wraps `data` in the success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

/// Wraps `data` in the success envelope with `201 Created`.
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok(data))
}

/// Handler error; renders as the error envelope.
#[derive(Debug)]
pub struct ApiError(pub AppError);

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Shorthand for a `NOT_FOUND` error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self(AppError::NotFound(what.into()))
    }

    /// Shorthand for a `VALIDATION` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self(AppError::Validation(message.into()))
    }

    /// Shorthand for an `UNAUTHORIZED` error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self(AppError::Unauthorized(message.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self.0 {
            AppError::Store(detail) => error!(error = %detail, "Store failure"),
            AppError::Internal(detail) => error!(error = %detail, "Internal failure"),
            AppError::UpstreamAi(detail) => warn!(error = %detail, "AI provider failure"),
            _ => {}
        }

        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self.0.to_body())).into_response();
        if let AppError::RateLimited { retry_after_secs } = self.0 {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        response
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        Self(err.into())
    }
}

impl From<SmartBookingError> for ApiError {
    fn from(err: SmartBookingError) -> Self {
        Self(err.into())
    }
}

impl From<VerificationError> for ApiError {
    fn from(err: VerificationError) -> Self {
        Self(err.into())
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        Self(err.into())
    }
}

impl From<DbErr> for ApiError {
    fn from(err: DbErr) -> Self {
        Self(AppError::Store(err.to_string()))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Config(detail) | JwtError::Sign(detail) => Self(AppError::Internal(detail)),
            JwtError::Expired => Self::unauthorized("Token has expired"),
            JwtError::Malformed(_) | JwtError::WrongKind => {
                Self::unauthorized("Invalid or malformed token")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;
    use serde_json::Value;

    async fn render(err: ApiError) -> (StatusCode, Value, Response) {
        let response = err.into_response();
        let status = response.status();
        let (parts, body) = response.into_parts();
        let bytes = body.collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap();
        (status, json, Response::from_parts(parts, axum::body::Body::empty()))
    }

    #[rstest]
    #[case(AppError::NotFound("Account".into()), 404, "NOT_FOUND")]
    #[case(AppError::Validation("bad".into()), 400, "VALIDATION")]
    #[case(AppError::Conflict("dup".into()), 409, "CONFLICT")]
    #[case(AppError::Unauthorized("no".into()), 401, "UNAUTHORIZED")]
    #[case(
        AppError::Store("UNIQUE constraint failed: accounts.id".into()),
        500,
        "STORE_WRITE_FAILURE"
    )]
    #[tokio::test]
    async fn test_error_envelope(#[case] err: AppError, #[case] status: u16, #[case] code: &str) {
        let (actual, body, _) = render(ApiError(err)).await;
        assert_eq!(actual.as_u16(), status);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], code);
    }

    #[tokio::test]
    async fn test_store_details_do_not_leak() {
        let (_, body, _) = render(ApiError(AppError::Store("SELECT * FROM users".into()))).await;
        let message = body["error"]["message"].as_str().unwrap();
        assert!(!message.contains("SELECT"));
    }

    #[tokio::test]
    async fn test_rate_limit_sets_retry_after() {
        let (status, _, response) = render(ApiError(AppError::RateLimited {
            retry_after_secs: 42,
        }))
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "42");
    }

    #[test]
    fn test_ledger_conflicts_map_to_conflict() {
        let err: ApiError = LedgerError::AccountInUse(3).into();
        assert_eq!(err.0.error_code(), "CONFLICT");
    }
}
