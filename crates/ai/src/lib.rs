//! Chat-completion backends for smart booking.
//!
//! Every supported provider speaks the OpenAI-compatible
//! `/chat/completions` protocol, so one HTTP client covers all of them;
//! providers differ only in base URL and model names.

pub mod client;
pub mod provider;

pub use client::{DisabledCompletion, OpenAiCompatClient};
pub use provider::{AiProvider, ProviderError, ProviderSettings, build_chat_client};
