//! Database layer with `SeaORM` entities and the SQL ledger store.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - [`SqlStore`], the SQLite implementation of the core store traits
//! - The user repository
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;
pub mod store;

pub use repositories::UserRepository;
pub use store::{SqlScope, SqlStore};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

/// Establishes a connection pool.
///
/// An in-memory SQLite database exists per connection, so `sqlite::memory:`
/// URLs are pinned to a single pooled connection.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let max_connections = if database_url.contains(":memory:") {
        1
    } else {
        max_connections.max(1)
    };
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}

/// Applies pending migrations.
///
/// # Errors
///
/// Returns an error if a migration fails.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    migration::Migrator::up(db, None).await?;
    info!("Database migrations applied");
    Ok(())
}
