//! Smart booking service.
//!
//! Upstream failures never reach the caller: a timeout, an error status or
//! an unreadable reply is logged and answered with the fallback record at
//! confidence 0, so the client can still open a pre-filled form.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;
use tally_shared::AppError;
use tally_shared::types::{CategoryId, UserId};
use thiserror::Error;
use tracing::{debug, warn};

use super::extract::first_json_object;
use super::gateway::{AiError, ChatCompletion, UserContent};
use super::normalize::{BookingSuggestion, resolve_category};
use super::prompts;
use crate::ledger::{Category, LedgerError, TransactionKind};
use crate::store::{LedgerStore, UnitOfWork};

/// Longest description accepted, in characters.
pub const MAX_INPUT_CHARS: usize = 500;

/// Most categories returned by [`SmartBookingService::suggest_categories`].
pub const MAX_CATEGORY_SUGGESTIONS: usize = 3;

const IMAGE_URI_PREFIX: &str = "data:image/";

/// Caller errors. Upstream AI errors are absorbed, not returned.
#[derive(Debug, Error)]
pub enum SmartBookingError {
    /// Description is blank or too long.
    #[error("Text must be 1 to {MAX_INPUT_CHARS} characters")]
    InvalidText,

    /// Image is not an image data URI.
    #[error("Image must be a data:image/ URI")]
    InvalidImage,

    /// Loading the user's categories failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<SmartBookingError> for AppError {
    fn from(err: SmartBookingError) -> Self {
        match err {
            SmartBookingError::InvalidText | SmartBookingError::InvalidImage => {
                Self::Validation(err.to_string())
            }
            SmartBookingError::Ledger(e) => e.into(),
        }
    }
}

/// One ranked category suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySuggestion {
    /// Suggested name.
    pub name: String,
    /// Matching category of the user, if any.
    pub category_id: Option<CategoryId>,
}

/// Pre-fills transactions from text or images.
#[derive(Clone)]
pub struct SmartBookingService<U> {
    store: U,
    ai: Arc<dyn ChatCompletion>,
    timezone: Tz,
}

impl<U: UnitOfWork> SmartBookingService<U> {
    /// Creates the service.
    #[must_use]
    pub fn new(store: U, ai: Arc<dyn ChatCompletion>, timezone: Tz) -> Self {
        Self { store, ai, timezone }
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Suggests a transaction for a sentence like "午饭 35".
    ///
    /// # Errors
    ///
    /// `InvalidText` for blank or oversized input, or a store error while
    /// loading categories. AI failures degrade to the fallback record.
    pub async fn parse_text(
        &self,
        user: UserId,
        text: &str,
    ) -> Result<BookingSuggestion, SmartBookingError> {
        let text = validate_text(text)?;
        let categories = self.categories(user).await?;
        let today = self.today();
        let (expense, income) = names_by_kind(&categories);

        let prompt = prompts::parse_text_prompt(today, &expense, &income);
        let reply = self.ai.complete(&prompt, UserContent::Text(text.to_string())).await;
        Ok(suggestion_from_reply(user, "parse_text", reply, today, &categories))
    }

    /// Suggests a transaction from a receipt or payment screenshot.
    ///
    /// # Errors
    ///
    /// `InvalidImage` unless the URI starts with `data:image/`, checked
    /// before any AI call. AI failures degrade to the fallback record.
    pub async fn recognize_image(
        &self,
        user: UserId,
        image_data_uri: &str,
        hint: Option<&str>,
    ) -> Result<BookingSuggestion, SmartBookingError> {
        if !image_data_uri.starts_with(IMAGE_URI_PREFIX) {
            return Err(SmartBookingError::InvalidImage);
        }
        let categories = self.categories(user).await?;
        let today = self.today();
        let (expense, income) = names_by_kind(&categories);

        let prompt = prompts::recognize_image_prompt(today, &expense, &income);
        let content = UserContent::Image {
            text: hint
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .unwrap_or("请识别这张图片中的消费记录")
                .to_string(),
            image_data_uri: image_data_uri.to_string(),
        };
        let reply = self.ai.complete(&prompt, content).await;
        Ok(suggestion_from_reply(user, "recognize_image", reply, today, &categories))
    }

    /// Ranks the user's categories of `kind` for a description.
    ///
    /// Names the model invents are kept with no id. On AI failure the list
    /// is empty.
    ///
    /// # Errors
    ///
    /// `InvalidText` or a store error.
    pub async fn suggest_categories(
        &self,
        user: UserId,
        description: &str,
        kind: TransactionKind,
    ) -> Result<Vec<CategorySuggestion>, SmartBookingError> {
        let description = validate_text(description)?;
        let categories: Vec<Category> = self
            .categories(user)
            .await?
            .into_iter()
            .filter(|c| c.kind == kind)
            .collect();
        let names: Vec<String> = categories.iter().map(|c| c.name.clone()).collect();

        let prompt = prompts::suggest_categories_prompt(kind, &names);
        let reply = match self
            .ai
            .complete(&prompt, UserContent::Text(description.to_string()))
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(user_id = %user, error = %e, "Category suggestion degraded");
                return Ok(Vec::new());
            }
        };

        let candidates: Vec<&Category> = categories.iter().collect();
        let mut suggestions: Vec<CategorySuggestion> = Vec::new();
        for name in suggested_names(&reply) {
            let category_id = resolve_category(&name, &candidates).map(|c| c.id);
            let duplicate = suggestions
                .iter()
                .any(|s| s.name == name || (category_id.is_some() && s.category_id == category_id));
            if !duplicate {
                suggestions.push(CategorySuggestion { name, category_id });
            }
            if suggestions.len() == MAX_CATEGORY_SUGGESTIONS {
                break;
            }
        }
        debug!(user_id = %user, count = suggestions.len(), "Suggested categories");
        Ok(suggestions)
    }

    async fn categories(&self, user: UserId) -> Result<Vec<Category>, LedgerError> {
        let mut scope = self.store.begin().await?;
        Ok(scope.list_categories(user, None).await?)
    }
}

fn suggestion_from_reply(
    user: UserId,
    operation: &'static str,
    reply: Result<String, AiError>,
    today: NaiveDate,
    categories: &[Category],
) -> BookingSuggestion {
    let parsed = reply.and_then(|raw| {
        first_json_object(&raw).ok_or_else(|| AiError::Unparseable(truncate(&raw, 200)))
    });
    let mut suggestion = match parsed {
        Ok(fields) => BookingSuggestion::from_fields(&fields, today),
        Err(e) => {
            warn!(user_id = %user, operation, error = %e, "Smart booking degraded to fallback");
            BookingSuggestion::fallback(today)
        }
    };
    suggestion.resolve_against(categories);
    debug!(
        user_id = %user,
        operation,
        amount = suggestion.amount,
        resolved = suggestion.category_id.is_some(),
        "Smart booking suggestion ready"
    );
    suggestion
}

fn validate_text(text: &str) -> Result<&str, SmartBookingError> {
    let trimmed = text.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_INPUT_CHARS {
        return Err(SmartBookingError::InvalidText);
    }
    Ok(trimmed)
}

fn names_by_kind(categories: &[Category]) -> (Vec<String>, Vec<String>) {
    let names = |kind: TransactionKind| {
        categories
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.clone())
            .collect::<Vec<_>>()
    };
    (names(TransactionKind::Expense), names(TransactionKind::Income))
}

/// Category names from a `{"categories": [...]}` reply.
fn suggested_names(reply: &str) -> Vec<String> {
    first_json_object(reply)
        .and_then(|mut map| map.remove("categories"))
        .and_then(|v| match v {
            Value::Array(items) => Some(items),
            _ => None,
        })
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
        .collect()
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
