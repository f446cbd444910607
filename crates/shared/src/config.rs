//! Application configuration management.

use std::fmt;

use chrono_tz::Tz;
use serde::Deserialize;

/// Stand-in for a secret in `Debug` output: `[redacted]`, or empty when
/// no secret is set so a missing key still shows up.
#[must_use]
pub fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { "[redacted]" }
}

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// AI provider configuration.
    #[serde(default)]
    pub ai: AiConfig,
    /// SMTP configuration. Codes are only logged when absent.
    #[serde(default)]
    pub email: Option<EmailConfig>,
    /// Verification code settings.
    #[serde(default)]
    pub verification: VerificationConfig,
    /// Application-level settings.
    #[serde(default)]
    pub app: AppSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL, e.g. `sqlite://tally.db?mode=rwc`.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Run pending migrations on startup.
    #[serde(default = "default_true")]
    pub migrate_on_start: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

/// JWT configuration.
#[derive(Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
    /// Refresh token expiration in seconds.
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry_secs: u64,
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &redact(&self.secret))
            .field("access_token_expiry_secs", &self.access_token_expiry_secs)
            .field("refresh_token_expiry_secs", &self.refresh_token_expiry_secs)
            .finish()
    }
}

fn default_access_token_expiry() -> u64 {
    86_400 // 1 day
}

fn default_refresh_token_expiry() -> u64 {
    2_592_000 // 30 days
}

/// AI provider configuration.
#[derive(Clone, Deserialize)]
pub struct AiConfig {
    /// Provider name: `doubao`, `deepseek`, `zhipu` or `insforge`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// API key sent as a bearer token.
    #[serde(default)]
    pub api_key: String,
    /// Overrides the provider's default base URL.
    pub base_url: Option<String>,
    /// Overrides the provider's default text model.
    pub text_model: Option<String>,
    /// Overrides the provider's default vision model.
    pub vision_model: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: String::new(),
            base_url: None,
            text_model: None,
            vision_model: None,
            timeout_secs: default_ai_timeout(),
        }
    }
}

impl fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiConfig")
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("text_model", &self.text_model)
            .field("vision_model", &self.vision_model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_ai_timeout() -> u64 {
    30
}

/// SMTP configuration for delivering verification codes.
#[derive(Clone, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host.
    pub smtp_host: String,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP username.
    pub smtp_username: String,
    /// SMTP password.
    pub smtp_password: String,
    /// Sender address.
    pub from_email: String,
    /// Sender display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "localhost".to_string(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_email: "noreply@localhost".to_string(),
            from_name: default_from_name(),
        }
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &redact(&self.smtp_password))
            .field("from_email", &self.from_email)
            .field("from_name", &self.from_name)
            .finish()
    }
}

fn default_smtp_port() -> u16 {
    465
}

fn default_from_name() -> String {
    "Tally".to_string()
}

/// Verification code settings.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationConfig {
    /// How long an issued code stays valid.
    #[serde(default = "default_code_ttl")]
    pub code_ttl_secs: u64,
    /// Minimum delay between two codes for one address.
    #[serde(default = "default_resend_cooldown")]
    pub resend_cooldown_secs: u64,
    /// Wrong guesses tolerated before the code is burned.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: default_code_ttl(),
            resend_cooldown_secs: default_resend_cooldown(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_code_ttl() -> u64 {
    300
}

fn default_resend_cooldown() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    5
}

/// Application-level settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    /// IANA timezone used to decide what "today" means.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

fn default_timezone() -> String {
    "Asia/Shanghai".to_string()
}

impl AppSettings {
    /// Parses the configured timezone.
    ///
    /// # Errors
    ///
    /// Returns a message naming the timezone when it is not a valid IANA name.
    pub fn tz(&self) -> Result<Tz, String> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| format!("unknown timezone '{}'", self.timezone))
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `TALLY__SECTION__KEY` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_env() {
        temp_env::with_vars(
            [
                ("TALLY__DATABASE__URL", Some("sqlite::memory:")),
                ("TALLY__JWT__SECRET", Some("s3cret")),
                ("TALLY__AI__PROVIDER", Some("zhipu")),
                ("TALLY__SERVER__PORT", Some("9000")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "sqlite::memory:");
                assert_eq!(config.jwt.secret, "s3cret");
                assert_eq!(config.ai.provider, "zhipu");
                assert_eq!(config.server.port, 9000);
                assert_eq!(config.ai.timeout_secs, 30);
                assert!(config.email.is_none());
                assert_eq!(config.verification.code_ttl_secs, 300);
            },
        );
    }

    #[test]
    fn test_missing_required_section() {
        temp_env::with_vars(
            [
                ("TALLY__DATABASE__URL", None::<&str>),
                ("TALLY__JWT__SECRET", None),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }

    #[test]
    fn test_debug_hides_secrets() {
        temp_env::with_vars(
            [
                ("TALLY__DATABASE__URL", Some("sqlite::memory:")),
                ("TALLY__JWT__SECRET", Some("jwt-signing-key")),
                ("TALLY__AI__API_KEY", Some("sk-live-123")),
                ("TALLY__EMAIL__SMTP_HOST", Some("smtp.example.com")),
                ("TALLY__EMAIL__SMTP_USERNAME", Some("mailer")),
                ("TALLY__EMAIL__SMTP_PASSWORD", Some("hunter2")),
                ("TALLY__EMAIL__FROM_EMAIL", Some("noreply@example.com")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.ai.api_key, "sk-live-123");

                let printed = format!("{config:?}");
                for secret in ["jwt-signing-key", "sk-live-123", "hunter2"] {
                    assert!(!printed.contains(secret), "{secret} leaked: {printed}");
                }
                assert!(printed.contains("[redacted]"));
                assert!(printed.contains("smtp.example.com"));
            },
        );
    }

    #[test]
    fn test_redact_keeps_missing_secrets_visible() {
        assert_eq!(redact(""), "");
        assert_eq!(redact("x"), "[redacted]");
    }

    #[test]
    fn test_timezone_parsing() {
        let settings = AppSettings::default();
        assert_eq!(settings.tz().unwrap(), chrono_tz::Asia::Shanghai);

        let bad = AppSettings {
            timezone: "Mars/Olympus".to_string(),
        };
        assert!(bad.tz().is_err());
    }
}
