//! AI-assisted booking.
//!
//! A chat model turns free text or a receipt image into a suggested
//! transaction. The reply is normalized field by field and the suggested
//! category is matched against the user's own categories.

pub mod extract;
pub mod gateway;
pub mod normalize;
pub mod prompts;
pub mod service;

pub use gateway::{AiError, ChatCompletion, UserContent};
pub use normalize::{BookingSuggestion, resolve_category};
pub use service::{CategorySuggestion, SmartBookingError, SmartBookingService};
