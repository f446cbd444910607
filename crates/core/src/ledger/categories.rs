//! Category management.

use chrono::Utc;
use tally_shared::types::{CategoryId, UserId};
use tracing::info;

use super::accounts::validate_name;
use super::error::LedgerError;
use super::types::{Category, CategoryPatch, NewCategory, TransactionFilter, TransactionKind};
use crate::store::{LedgerStore, UnitOfWork};

/// Icon used when a new category does not name one.
pub const DEFAULT_CATEGORY_ICON: &str = "tag";

/// Color used when a new category does not name one.
pub const DEFAULT_CATEGORY_COLOR: &str = "#999999";

/// Creates, edits and deletes categories.
#[derive(Debug, Clone)]
pub struct CategoryService<U> {
    store: U,
}

impl<U: UnitOfWork> CategoryService<U> {
    /// Creates the service.
    #[must_use]
    pub const fn new(store: U) -> Self {
        Self { store }
    }

    /// Creates a user-defined category.
    ///
    /// # Errors
    ///
    /// `InvalidName`, `InvalidColor`, `Duplicate` when the user already has
    /// a category of that kind and name, or a store error.
    pub async fn create(&self, user: UserId, input: NewCategory) -> Result<Category, LedgerError> {
        let name = validate_name(&input.name)?;
        let color = match input.color {
            Some(color) => validate_color(&color)?,
            None => DEFAULT_CATEGORY_COLOR.to_string(),
        };

        let mut scope = self.store.begin().await?;
        let sort_order = match input.sort_order {
            Some(order) => order,
            None => next_sort_order(&mut scope, user, input.kind).await?,
        };
        let now = Utc::now();
        let category = Category {
            id: CategoryId::new(),
            user_id: user,
            name,
            kind: input.kind,
            icon: input.icon.unwrap_or_else(|| DEFAULT_CATEGORY_ICON.to_string()),
            color,
            is_default: false,
            sort_order,
            created_at: now,
            updated_at: now,
        };
        let mut inserted = scope.insert_categories(vec![category]).await?;
        let category = inserted
            .pop()
            .ok_or_else(|| LedgerError::Store("category insert returned nothing".to_string()))?;
        self.store.commit(scope).await?;

        info!(
            user_id = %user,
            category_id = %category.id,
            kind = %category.kind,
            "Category created"
        );
        Ok(category)
    }

    /// Loads one category.
    ///
    /// # Errors
    ///
    /// `CategoryNotFound` or a store error.
    pub async fn get(&self, user: UserId, id: CategoryId) -> Result<Category, LedgerError> {
        let mut scope = self.store.begin().await?;
        scope
            .get_category(user, id)
            .await?
            .ok_or(LedgerError::CategoryNotFound(id))
    }

    /// Lists categories, optionally of one kind.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub async fn list(
        &self,
        user: UserId,
        kind: Option<TransactionKind>,
    ) -> Result<Vec<Category>, LedgerError> {
        let mut scope = self.store.begin().await?;
        Ok(scope.list_categories(user, kind).await?)
    }

    /// Applies a partial update. The kind never changes.
    ///
    /// # Errors
    ///
    /// `CategoryNotFound`, `InvalidName`, `InvalidColor`, `Duplicate` or a
    /// store error.
    pub async fn update(
        &self,
        user: UserId,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> Result<Category, LedgerError> {
        let mut scope = self.store.begin().await?;
        let mut category = scope
            .get_category(user, id)
            .await?
            .ok_or(LedgerError::CategoryNotFound(id))?;

        if let Some(name) = patch.name.as_deref() {
            category.name = validate_name(name)?;
        }
        if let Some(icon) = patch.icon {
            category.icon = icon;
        }
        if let Some(color) = patch.color.as_deref() {
            category.color = validate_color(color)?;
        }
        if let Some(order) = patch.sort_order {
            category.sort_order = order;
        }
        category.updated_at = Utc::now();

        if !scope.update_category(&category).await? {
            return Err(LedgerError::CategoryNotFound(id));
        }
        self.store.commit(scope).await?;

        info!(user_id = %user, category_id = %id, "Category updated");
        Ok(category)
    }

    /// Deletes a category that no transaction references.
    ///
    /// Returns `false` when the category does not exist.
    ///
    /// # Errors
    ///
    /// `CategoryInUse` when transactions still point at it, or a store error.
    pub async fn delete(&self, user: UserId, id: CategoryId) -> Result<bool, LedgerError> {
        let mut scope = self.store.begin().await?;
        let filter = TransactionFilter {
            category_id: Some(id),
            ..TransactionFilter::default()
        };
        let references = scope.count_transactions(user, &filter).await?;
        if references > 0 {
            return Err(LedgerError::CategoryInUse(references));
        }
        if !scope.delete_category(user, id).await? {
            return Ok(false);
        }
        self.store.commit(scope).await?;

        info!(user_id = %user, category_id = %id, "Category deleted");
        Ok(true)
    }
}

/// Accepts `#RRGGBB` and returns it uppercased.
pub(crate) fn validate_color(color: &str) -> Result<String, LedgerError> {
    let trimmed = color.trim();
    let valid = trimmed.len() == 7
        && trimmed.starts_with('#')
        && trimmed[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(LedgerError::InvalidColor(color.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

async fn next_sort_order<S: LedgerStore + ?Sized>(
    scope: &mut S,
    user: UserId,
    kind: TransactionKind,
) -> Result<i32, LedgerError> {
    let existing = scope.list_categories(user, Some(kind)).await?;
    Ok(existing
        .iter()
        .map(|c| c.sort_order)
        .max()
        .map_or(1, |max| max.saturating_add(1)))
}
