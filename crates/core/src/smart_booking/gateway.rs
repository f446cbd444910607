//! Seam between smart booking and a chat-completion backend.

use async_trait::async_trait;
use tally_shared::AppError;
use thiserror::Error;

/// What the user sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserContent {
    /// Plain text.
    Text(String),
    /// An image with an accompanying instruction.
    Image {
        /// Instruction or hint text.
        text: String,
        /// `data:image/...;base64,...` URI.
        image_data_uri: String,
    },
}

impl UserContent {
    /// True when the content carries an image.
    #[must_use]
    pub const fn has_image(&self) -> bool {
        matches!(self, Self::Image { .. })
    }
}

/// Failures talking to the model.
#[derive(Debug, Error)]
pub enum AiError {
    /// No provider is configured.
    #[error("AI provider is not configured")]
    NotConfigured,

    /// The request did not finish in time.
    #[error("AI request timed out")]
    Timeout,

    /// The provider answered with a non-success status.
    #[error("AI provider returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The reply had no content.
    #[error("AI reply was empty")]
    EmptyReply,

    /// The reply could not be decoded.
    #[error("AI reply could not be parsed: {0}")]
    Unparseable(String),

    /// Connection or protocol failure.
    #[error("AI transport error: {0}")]
    Transport(String),
}

impl From<AiError> for AppError {
    fn from(err: AiError) -> Self {
        Self::UpstreamAi(err.to_string())
    }
}

/// A chat-completion backend.
///
/// Implementations send one system prompt and one user message and return
/// the assistant's raw text.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Runs one completion.
    async fn complete(&self, system_prompt: &str, content: UserContent) -> Result<String, AiError>;
}
