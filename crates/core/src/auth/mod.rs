//! Passwordless sign-in support.
//!
//! This module provides:
//! - One-time email verification codes with TTL, cooldown and attempt limits
//! - A pluggable code store, in-memory by default

mod verification;

pub use verification::{
    CodeStore, IssuedCode, MokaCodeStore, VerificationCodes, VerificationError, normalize_email,
};
