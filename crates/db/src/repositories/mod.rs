//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Ledger records go through [`crate::SqlStore`] instead.

pub mod user;

pub use user::UserRepository;
