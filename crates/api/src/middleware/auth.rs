//! Bearer-token guard for everything behind sign-in.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tally_shared::types::UserId;
use tally_shared::{Claims, JwtService, TokenKind};

use crate::AppState;
use crate::response::ApiError;

/// The token from `Authorization: Bearer <token>`; the scheme is case-insensitive.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn authenticate(jwt: &JwtService, headers: &HeaderMap) -> Result<Claims, ApiError> {
    let token = bearer_token(headers).ok_or_else(|| {
        ApiError::unauthorized("Authorization header with Bearer token is required")
    })?;
    Ok(jwt.verify(token, TokenKind::Access)?)
}

/// Rejects requests without a valid access token and stashes the claims
/// for [`AuthUser`]. Refresh tokens are refused here.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&state.jwt_service, request.headers()) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// The signed-in user, available to handlers behind [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Owner id for every ledger call.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.0.user_id()
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;

    fn headers(value: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = value {
            headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        }
        headers
    }

    #[rstest]
    #[case(Some("Bearer abc"), Some("abc"))]
    #[case(Some("bearer abc"), Some("abc"))]
    #[case(Some("BEARER  abc "), Some("abc"))]
    #[case(Some("Bearer    "), None)]
    #[case(Some("Basic abc"), None)]
    #[case(Some("abc"), None)]
    #[case(None, None)]
    fn test_bearer_token(#[case] value: Option<&'static str>, #[case] expected: Option<&str>) {
        assert_eq!(bearer_token(&headers(value)), expected);
    }

    #[test]
    fn test_authenticate_accepts_only_access_tokens() {
        let jwt = JwtService::new(tally_shared::JwtConfig::default());
        let user = UserId::new();
        let pair = jwt.issue_pair(user).unwrap();

        let mut map = HeaderMap::new();
        let value = format!("Bearer {}", pair.access_token);
        map.insert(AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
        assert_eq!(authenticate(&jwt, &map).unwrap().user_id(), user);

        let value = format!("Bearer {}", pair.refresh_token);
        map.insert(AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
        assert!(authenticate(&jwt, &map).is_err());
    }
}
