//! Shared setup for database integration tests.

use sea_orm::DatabaseConnection;
use tally_db::{connect, migrate};

/// A fresh, migrated in-memory database.
pub async fn setup_db() -> DatabaseConnection {
    let db = connect("sqlite::memory:", 1)
        .await
        .expect("Failed to open in-memory database");
    migrate(&db).await.expect("Failed to run migrations");
    db
}
