//! Email verification codes.
//!
//! A code is six digits, lives for a configurable TTL, cannot be reissued
//! to the same address during the cooldown, and is burned after too many
//! wrong guesses. A correct guess consumes it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use rand::Rng;
use tally_shared::{AppError, VerificationConfig};
use thiserror::Error;
use tracing::{debug, warn};

/// Digits in a code.
pub const CODE_LENGTH: usize = 6;

/// Upper bound on addresses tracked at once.
const DEFAULT_CACHE_CAPACITY: u64 = 100_000;

/// Errors from issuing or checking codes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    /// Address is not usable.
    #[error("Invalid email address")]
    InvalidEmail,

    /// A code was issued too recently.
    #[error("Please wait {retry_after_secs}s before requesting another code")]
    Cooldown {
        /// Seconds until a new code may be issued.
        retry_after_secs: u64,
    },

    /// No live code, or the guess was wrong.
    #[error("Invalid or expired verification code")]
    InvalidCode,

    /// The code was burned by too many wrong guesses.
    #[error("Too many attempts, please request a new code")]
    TooManyAttempts,
}

impl From<VerificationError> for AppError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::InvalidEmail => Self::Validation(err.to_string()),
            VerificationError::Cooldown { retry_after_secs } => {
                Self::RateLimited { retry_after_secs }
            }
            VerificationError::InvalidCode | VerificationError::TooManyAttempts => {
                Self::Unauthorized(err.to_string())
            }
        }
    }
}

/// A code waiting to be verified.
#[derive(Debug, Clone)]
pub struct IssuedCode {
    /// The digits.
    pub code: String,
    /// When it was issued.
    pub issued_at: Instant,
    /// Wrong guesses so far.
    pub failed_attempts: u32,
}

/// Storage for issued codes, keyed by normalized email.
pub trait CodeStore: Send + Sync {
    /// Current code for an address.
    fn get(&self, email: &str) -> Option<IssuedCode>;

    /// Stores or replaces the code for an address.
    fn put(&self, email: &str, code: IssuedCode);

    /// Forgets the code for an address.
    fn remove(&self, email: &str);
}

/// In-memory code store that evicts entries after the code TTL.
#[derive(Clone)]
pub struct MokaCodeStore {
    cache: Cache<String, IssuedCode>,
}

impl MokaCodeStore {
    /// Creates a store whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(DEFAULT_CACHE_CAPACITY)
            .time_to_live(ttl.max(Duration::from_secs(1)))
            .build();
        Self { cache }
    }
}

impl CodeStore for MokaCodeStore {
    fn get(&self, email: &str) -> Option<IssuedCode> {
        self.cache.get(email)
    }

    fn put(&self, email: &str, code: IssuedCode) {
        self.cache.insert(email.to_string(), code);
    }

    fn remove(&self, email: &str) {
        self.cache.invalidate(email);
    }
}

/// Issues and checks verification codes.
#[derive(Clone)]
pub struct VerificationCodes {
    store: Arc<dyn CodeStore>,
    ttl: Duration,
    cooldown: Duration,
    max_attempts: u32,
}

impl VerificationCodes {
    /// Creates the service over the default in-memory store.
    #[must_use]
    pub fn new(config: &VerificationConfig) -> Self {
        let ttl = Duration::from_secs(config.code_ttl_secs);
        Self::with_store(config, Arc::new(MokaCodeStore::new(ttl)))
    }

    /// Creates the service over a custom store.
    #[must_use]
    pub fn with_store(config: &VerificationConfig, store: Arc<dyn CodeStore>) -> Self {
        Self {
            store,
            ttl: Duration::from_secs(config.code_ttl_secs),
            cooldown: Duration::from_secs(config.resend_cooldown_secs),
            max_attempts: config.max_attempts.max(1),
        }
    }

    /// Code lifetime in whole minutes, for message text.
    #[must_use]
    pub fn ttl_minutes(&self) -> u64 {
        self.ttl.as_secs().div_ceil(60)
    }

    /// Issues a fresh code for `email` and returns it.
    ///
    /// # Errors
    ///
    /// `InvalidEmail`, or `Cooldown` if the previous code is too recent.
    pub fn issue(&self, email: &str) -> Result<String, VerificationError> {
        let email = normalize_email(email)?;
        if let Some(previous) = self.store.get(&email) {
            let elapsed = previous.issued_at.elapsed();
            if elapsed < self.cooldown {
                let remaining = self.cooldown.saturating_sub(elapsed);
                let retry_after_secs =
                    remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
                debug!(retry_after_secs, "Verification code requested during cooldown");
                return Err(VerificationError::Cooldown { retry_after_secs });
            }
        }

        let code = generate_code();
        self.store.put(
            &email,
            IssuedCode {
                code: code.clone(),
                issued_at: Instant::now(),
                failed_attempts: 0,
            },
        );
        debug!("Verification code issued");
        Ok(code)
    }

    /// Checks a guess. A correct guess consumes the code.
    ///
    /// # Errors
    ///
    /// `InvalidEmail`, `InvalidCode` for a missing, expired or wrong code,
    /// or `TooManyAttempts` once the limit is reached.
    pub fn verify(&self, email: &str, guess: &str) -> Result<(), VerificationError> {
        let email = normalize_email(email)?;
        let Some(mut issued) = self.store.get(&email) else {
            return Err(VerificationError::InvalidCode);
        };
        if issued.issued_at.elapsed() >= self.ttl {
            self.store.remove(&email);
            return Err(VerificationError::InvalidCode);
        }
        if issued.failed_attempts >= self.max_attempts {
            return Err(VerificationError::TooManyAttempts);
        }

        if constant_time_eq(issued.code.as_bytes(), guess.trim().as_bytes()) {
            self.store.remove(&email);
            return Ok(());
        }

        issued.failed_attempts += 1;
        let exhausted = issued.failed_attempts >= self.max_attempts;
        self.store.put(&email, issued);
        if exhausted {
            warn!("Verification code burned after too many attempts");
            return Err(VerificationError::TooManyAttempts);
        }
        Err(VerificationError::InvalidCode)
    }
}

/// Trims and lowercases an address after a basic shape check.
///
/// # Errors
///
/// `InvalidEmail` unless it looks like `local@domain.tld`.
pub fn normalize_email(email: &str) -> Result<String, VerificationError> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(VerificationError::InvalidEmail);
    }
    Ok(email)
}

fn generate_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}

/// Compares every byte regardless of where the first mismatch is.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn config(ttl: u64, cooldown: u64, attempts: u32) -> VerificationConfig {
        VerificationConfig {
            code_ttl_secs: ttl,
            resend_cooldown_secs: cooldown,
            max_attempts: attempts,
        }
    }

    #[test]
    fn test_code_shape() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[rstest]
    #[case(" User@Example.COM ", Ok("user@example.com".to_string()))]
    #[case("no-at-sign", Err(VerificationError::InvalidEmail))]
    #[case("@example.com", Err(VerificationError::InvalidEmail))]
    #[case("a@localhost", Err(VerificationError::InvalidEmail))]
    #[case("a@b@c.com", Err(VerificationError::InvalidEmail))]
    fn test_normalize_email(
        #[case] input: &str,
        #[case] expected: Result<String, VerificationError>,
    ) {
        assert_eq!(normalize_email(input), expected);
    }

    #[test]
    fn test_issue_then_verify_consumes() {
        let codes = VerificationCodes::new(&config(300, 0, 5));
        let code = codes.issue("a@example.com").unwrap();

        assert_eq!(codes.verify("A@example.com", &code), Ok(()));
        assert_eq!(
            codes.verify("a@example.com", &code),
            Err(VerificationError::InvalidCode)
        );
    }

    #[test]
    fn test_cooldown_blocks_reissue() {
        let codes = VerificationCodes::new(&config(300, 60, 5));
        codes.issue("a@example.com").unwrap();

        match codes.issue("a@example.com") {
            Err(VerificationError::Cooldown { retry_after_secs }) => {
                assert!(retry_after_secs > 0 && retry_after_secs <= 60);
            }
            other => panic!("expected cooldown, got {other:?}"),
        }
        assert!(codes.issue("b@example.com").is_ok());
    }

    #[test]
    fn test_attempt_limit_burns_code() {
        let codes = VerificationCodes::new(&config(300, 0, 3));
        let code = codes.issue("a@example.com").unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        assert_eq!(codes.verify("a@example.com", wrong), Err(VerificationError::InvalidCode));
        assert_eq!(codes.verify("a@example.com", wrong), Err(VerificationError::InvalidCode));
        assert_eq!(codes.verify("a@example.com", wrong), Err(VerificationError::TooManyAttempts));
        assert_eq!(codes.verify("a@example.com", &code), Err(VerificationError::TooManyAttempts));
    }

    #[test]
    fn test_expired_code_rejected() {
        let codes = VerificationCodes::new(&config(0, 0, 5));
        let code = codes.issue("a@example.com").unwrap();
        assert_eq!(codes.verify("a@example.com", &code), Err(VerificationError::InvalidCode));
    }

    #[test]
    fn test_error_mapping() {
        let rate = AppError::from(VerificationError::Cooldown { retry_after_secs: 42 });
        assert_eq!(rate.status_code(), 429);
        assert_eq!(AppError::from(VerificationError::InvalidCode).status_code(), 401);
        assert_eq!(AppError::from(VerificationError::InvalidEmail).status_code(), 400);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"123456", b"123456"));
        assert!(!constant_time_eq(b"123456", b"123457"));
        assert!(!constant_time_eq(b"123456", b"12345"));
    }
}
