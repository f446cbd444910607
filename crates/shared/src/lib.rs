//! Shared types, errors, and configuration for Tally.
//!
//! This crate provides common types used across all other crates:
//! - Minor-unit money formatting
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Application-wide error types and the API error envelope
//! - Configuration management
//! - JWT issuing/validation and SMTP delivery of verification codes

pub mod config;
pub mod email;
pub mod error;
pub mod jwt;
pub mod types;

pub use config::{AiConfig, AppConfig, EmailConfig, VerificationConfig};
pub use email::{EmailError, EmailService};
pub use error::{AppError, AppResult, ErrorBody};
pub use jwt::{Claims, JwtConfig, JwtError, JwtService, TokenKind, TokenPair};
