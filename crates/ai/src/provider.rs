//! Provider catalogue and client factory.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tally_core::smart_booking::ChatCompletion;
use tally_shared::config::{AiConfig, redact};
use thiserror::Error;
use tracing::{info, warn};

use crate::client::{DisabledCompletion, OpenAiCompatClient};

/// Errors building a chat client from configuration.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider name is not one we know.
    #[error("Unknown AI provider '{0}'")]
    UnknownProvider(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Supported chat-completion providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiProvider {
    /// Volcengine Ark (Doubao models).
    Doubao,
    /// DeepSeek.
    Deepseek,
    /// Zhipu GLM.
    Zhipu,
    /// Self-hosted InsForge AI gateway.
    Insforge,
}

impl AiProvider {
    /// Lowercase config name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Doubao => "doubao",
            Self::Deepseek => "deepseek",
            Self::Zhipu => "zhipu",
            Self::Insforge => "insforge",
        }
    }

    /// Default API base URL, without the `/chat/completions` suffix.
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::Doubao => "https://ark.cn-beijing.volces.com/api/v3",
            Self::Deepseek => "https://api.deepseek.com/v1",
            Self::Zhipu => "https://open.bigmodel.cn/api/paas/v4",
            Self::Insforge => "http://localhost:7130/api/ai",
        }
    }

    /// Default model for text prompts.
    #[must_use]
    pub const fn default_text_model(self) -> &'static str {
        match self {
            Self::Doubao => "doubao-1-5-pro-32k-250115",
            Self::Deepseek => "deepseek-chat",
            Self::Zhipu => "glm-4-flash",
            Self::Insforge => "openai/gpt-4o-mini",
        }
    }

    /// Default model for image prompts.
    ///
    /// DeepSeek has no vision model; image requests go to its text model
    /// and usually fail upstream, which smart booking degrades gracefully.
    #[must_use]
    pub const fn default_vision_model(self) -> &'static str {
        match self {
            Self::Doubao => "doubao-1-5-vision-pro-32k-250115",
            Self::Deepseek => "deepseek-chat",
            Self::Zhipu => "glm-4v-flash",
            Self::Insforge => "openai/gpt-4o",
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiProvider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "doubao" => Ok(Self::Doubao),
            "deepseek" => Ok(Self::Deepseek),
            "zhipu" => Ok(Self::Zhipu),
            "insforge" => Ok(Self::Insforge),
            other => Err(ProviderError::UnknownProvider(other.to_string())),
        }
    }
}

/// Fully resolved connection settings for one provider.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    /// Which provider.
    pub provider: AiProvider,
    /// Base URL.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Model for text prompts.
    pub text_model: String,
    /// Model for image prompts.
    pub vision_model: String,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("text_model", &self.text_model)
            .field("vision_model", &self.vision_model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProviderSettings {
    /// Applies config overrides on top of the provider defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::UnknownProvider`] for an unrecognised name.
    pub fn from_config(config: &AiConfig) -> Result<Self, ProviderError> {
        let provider: AiProvider = config.provider.parse()?;
        let pick = |value: &Option<String>, default: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
                .to_string()
        };
        Ok(Self {
            provider,
            base_url: pick(&config.base_url, provider.default_base_url()),
            api_key: config.api_key.trim().to_string(),
            text_model: pick(&config.text_model, provider.default_text_model()),
            vision_model: pick(&config.vision_model, provider.default_vision_model()),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        })
    }
}

/// Builds the chat backend described by `config`.
///
/// Without an API key the returned backend fails every call with
/// `NotConfigured`, which smart booking turns into its fallback record.
///
/// # Errors
///
/// Returns an error for an unknown provider or if the HTTP client cannot be
/// built.
pub fn build_chat_client(config: &AiConfig) -> Result<Arc<dyn ChatCompletion>, ProviderError> {
    let settings = ProviderSettings::from_config(config)?;
    if settings.api_key.is_empty() {
        warn!(provider = %settings.provider, "No AI API key configured, smart booking is disabled");
        return Ok(Arc::new(DisabledCompletion));
    }

    info!(
        provider = %settings.provider,
        base_url = %settings.base_url,
        text_model = %settings.text_model,
        "AI provider configured"
    );
    Ok(Arc::new(OpenAiCompatClient::new(settings)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn config(provider: &str) -> AiConfig {
        AiConfig {
            provider: provider.to_string(),
            ..AiConfig::default()
        }
    }

    #[rstest]
    #[case("doubao", AiProvider::Doubao)]
    #[case("DeepSeek", AiProvider::Deepseek)]
    #[case(" zhipu ", AiProvider::Zhipu)]
    #[case("insforge", AiProvider::Insforge)]
    fn test_parse_provider(#[case] raw: &str, #[case] expected: AiProvider) {
        assert_eq!(raw.parse::<AiProvider>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_provider() {
        let err = ProviderSettings::from_config(&config("openai")).unwrap_err();
        assert!(matches!(err, ProviderError::UnknownProvider(name) if name == "openai"));
    }

    #[test]
    fn test_defaults_apply_without_overrides() {
        let settings = ProviderSettings::from_config(&config("zhipu")).unwrap();
        assert_eq!(settings.base_url, "https://open.bigmodel.cn/api/paas/v4");
        assert_eq!(settings.text_model, "glm-4-flash");
        assert_eq!(settings.vision_model, "glm-4v-flash");
        assert_eq!(settings.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides_win_and_blanks_are_ignored() {
        let cfg = AiConfig {
            provider: "doubao".to_string(),
            api_key: "  key  ".to_string(),
            base_url: Some("http://127.0.0.1:9000/v1".to_string()),
            text_model: Some("my-model".to_string()),
            vision_model: Some("   ".to_string()),
            timeout_secs: 0,
        };
        let settings = ProviderSettings::from_config(&cfg).unwrap();

        assert_eq!(settings.api_key, "key");
        assert_eq!(settings.base_url, "http://127.0.0.1:9000/v1");
        assert_eq!(settings.text_model, "my-model");
        assert_eq!(settings.vision_model, AiProvider::Doubao.default_vision_model());
        assert_eq!(settings.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let cfg = AiConfig {
            api_key: "sk-test-0123456789".to_string(),
            ..config("deepseek")
        };
        let settings = ProviderSettings::from_config(&cfg).unwrap();
        let client = OpenAiCompatClient::new(settings.clone()).unwrap();

        for printed in [
            format!("{cfg:?}"),
            format!("{settings:?}"),
            format!("{client:?}"),
        ] {
            assert!(!printed.contains("sk-test-0123456789"), "key leaked: {printed}");
            assert!(printed.contains("[redacted]"));
        }
    }

    #[tokio::test]
    async fn test_missing_key_yields_disabled_backend() {
        let backend = build_chat_client(&config("deepseek")).unwrap();
        let result = backend
            .complete("system", tally_core::smart_booking::UserContent::Text("hi".into()))
            .await;
        assert!(matches!(result, Err(tally_core::smart_booking::AiError::NotConfigured)));
    }
}
