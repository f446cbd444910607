//! User repository for database operations.

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, SqlErr,
};
use tally_shared::types::UserId;
use tracing::info;

use crate::entities::users;

/// User repository for lookups and sign-up.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by (normalized) email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(id.0).one(&self.db).await
    }

    /// Returns the user with this email, creating it on first sign-in.
    ///
    /// The boolean is `true` when the user was created by this call. Two
    /// concurrent first sign-ins race on the unique email; the loser reads
    /// the winner's row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_or_create_by_email(
        &self,
        email: &str,
    ) -> Result<(users::Model, bool), DbErr> {
        if let Some(user) = self.find_by_email(email).await? {
            return Ok((user, false));
        }

        let now = Utc::now();
        let model = users::Model {
            id: UserId::new().0,
            email: email.to_string(),
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        let active = users::ActiveModel {
            id: Set(model.id),
            email: Set(model.email.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            last_login_at: Set(None),
        };

        match users::Entity::insert(active).exec_without_returning(&self.db).await {
            Ok(_) => {
                info!(user_id = %model.id, "User created");
                Ok((model, true))
            }
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                let existing = self.find_by_email(email).await?;
                existing
                    .map(|user| (user, false))
                    .ok_or(DbErr::RecordNotFound(format!("user {email}")))
            }
            Err(err) => Err(err),
        }
    }

    /// Stamps the user's last successful sign-in.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn record_login(&self, id: UserId) -> Result<(), DbErr> {
        let now = Utc::now();
        users::Entity::update_many()
            .col_expr(users::Column::LastLoginAt, Expr::value(Some(now)))
            .col_expr(users::Column::UpdatedAt, Expr::value(now))
            .filter(users::Column::Id.eq(id.0))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
