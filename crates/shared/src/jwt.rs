//! Signed session tokens.
//!
//! Signing in hands out an access token (sent on every request) and a
//! refresh token (only good for minting new access tokens). Both are HS256
//! JWTs carrying the user id, a kind marker and the `tally` issuer.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{JwtSettings, redact};
use crate::types::UserId;

const ISSUER: &str = "tally";

/// Which of the two tokens a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Sent on every API request.
    Access,
    /// Only accepted by the refresh endpoint.
    Refresh,
}

/// Payload of a Tally token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The signed-in user.
    pub sub: UserId,
    /// Access or refresh.
    pub kind: TokenKind,
    /// Always `tally`.
    pub iss: String,
    /// Issued at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

impl Claims {
    /// The user the token was issued to.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.sub
    }
}

/// Tokens returned by a successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived token for API calls.
    pub access_token: String,
    /// Long-lived token for `/auth/refresh`.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

/// Signing secret and token lifetimes.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC secret.
    pub secret: String,
    /// Access token lifetime.
    pub access_ttl: Duration,
    /// Refresh token lifetime.
    pub refresh_ttl: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &redact(&self.secret))
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            access_ttl: Duration::days(1),
            refresh_ttl: Duration::days(30),
        }
    }
}

impl JwtConfig {
    /// Builds the config from the `[jwt]` settings section.
    ///
    /// # Errors
    ///
    /// `JwtError::Config` when the secret is blank or a lifetime is zero or
    /// too large to add to the current time.
    pub fn from_settings(settings: &JwtSettings) -> Result<Self, JwtError> {
        if settings.secret.trim().is_empty() {
            return Err(JwtError::Config("jwt.secret must not be empty".to_string()));
        }
        Ok(Self {
            secret: settings.secret.clone(),
            access_ttl: lifetime("access_token_expiry_secs", settings.access_token_expiry_secs)?,
            refresh_ttl: lifetime("refresh_token_expiry_secs", settings.refresh_token_expiry_secs)?,
        })
    }
}

// Ten years is plenty and keeps `now + ttl` from overflowing.
const MAX_LIFETIME_SECS: u64 = 10 * 365 * 86_400;

fn lifetime(field: &str, secs: u64) -> Result<Duration, JwtError> {
    if secs == 0 || secs > MAX_LIFETIME_SECS {
        return Err(JwtError::Config(format!(
            "jwt.{field} must be between 1 and {MAX_LIFETIME_SECS}"
        )));
    }
    i64::try_from(secs)
        .map(Duration::seconds)
        .map_err(|_| JwtError::Config(format!("jwt.{field} out of range")))
}

/// Token failures.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Bad signing configuration.
    #[error("invalid token configuration: {0}")]
    Config(String),

    /// Signing failed.
    #[error("failed to sign token: {0}")]
    Sign(String),

    /// Bad signature, wrong issuer, or not a JWT at all.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Past its `exp`.
    #[error("token has expired")]
    Expired,

    /// A refresh token where an access token was needed, or the reverse.
    #[error("wrong token kind")]
    WrongKind,
}

/// Issues and checks tokens.
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("access_ttl", &self.config.access_ttl)
            .field("refresh_ttl", &self.config.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// Prepares keys for the configured secret.
    #[must_use]
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            config,
        }
    }

    fn sign(&self, user: UserId, kind: TokenKind) -> Result<String, JwtError> {
        let ttl = match kind {
            TokenKind::Access => self.config.access_ttl,
            TokenKind::Refresh => self.config.refresh_ttl,
        };
        let now = Utc::now();
        let claims = Claims {
            sub: user,
            kind,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Sign(e.to_string()))
    }

    /// A fresh access token.
    ///
    /// # Errors
    ///
    /// `JwtError::Sign` if signing fails.
    pub fn issue_access(&self, user: UserId) -> Result<String, JwtError> {
        self.sign(user, TokenKind::Access)
    }

    /// Access and refresh tokens for a new session.
    ///
    /// # Errors
    ///
    /// `JwtError::Sign` if signing fails.
    pub fn issue_pair(&self, user: UserId) -> Result<TokenPair, JwtError> {
        Ok(TokenPair {
            access_token: self.sign(user, TokenKind::Access)?,
            refresh_token: self.sign(user, TokenKind::Refresh)?,
            expires_in: self.access_ttl_secs(),
        })
    }

    /// Checks signature, issuer, expiry and kind.
    ///
    /// # Errors
    ///
    /// `Expired`, `WrongKind`, or `Malformed` for anything else.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<Claims, JwtError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Malformed(e.to_string()),
            })?
            .claims;

        if claims.kind == expected {
            Ok(claims)
        } else {
            Err(JwtError::WrongKind)
        }
    }

    /// Access token lifetime in seconds, as reported to clients.
    #[must_use]
    pub const fn access_ttl_secs(&self) -> i64 {
        self.config.access_ttl.num_seconds()
    }
}
