//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Gemini model used for every advisory call.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Default API root; the model path is appended per request.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Process configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct AssistConfig {
    /// Gemini API key (sent as the `key` query parameter).
    pub api_key: SecretString,
    /// Model identifier, e.g. `gemini-2.5-flash`.
    pub model: String,
    /// API root without trailing slash.
    pub api_base: String,
    /// Address the HTTP server binds to.
    pub bind: String,
    /// Port the HTTP server listens on.
    pub port: u16,
    /// Whether to run the terminal channel alongside the server.
    pub cli_enabled: bool,
    /// Delays used by the scripted sub-flows and wizards.
    pub timings: Timings,
}

impl AssistConfig {
    /// Build configuration from environment variables.
    ///
    /// `GEMINI_API_KEY` is required; everything else has a default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let model = std::env::var("AROGYA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let api_base = std::env::var("AROGYA_API_BASE")
            .unwrap_or_else(|_| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let bind = std::env::var("AROGYA_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = match std::env::var("AROGYA_PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|e| ConfigError::InvalidValue {
                key: "AROGYA_PORT".to_string(),
                message: e.to_string(),
            })?,
            Err(_) => 8080,
        };

        let cli_enabled = match std::env::var("AROGYA_CLI") {
            Ok(raw) => parse_bool("AROGYA_CLI", &raw)?,
            Err(_) => true,
        };

        Ok(Self {
            api_key: SecretString::from(api_key),
            model,
            api_base,
            bind,
            port,
            cli_enabled,
            timings: Timings::default(),
        })
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}

/// Fixed delays for the scripted parts of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Gap between consecutive search status messages, and before the search call.
    pub search_step: Duration,
    /// Gap between consecutive result item messages.
    pub result_item: Duration,
    /// Pause before a chat reply is appended.
    pub chat_reply: Duration,
    /// Medical wizard: gap between booking track steps. The last step completes it.
    pub booking_step: Duration,
    /// Medical wizard: completed -> callback.
    pub medical_completion: Duration,
    /// Insurance wizard: processing -> completed.
    pub insurance_processing: Duration,
    /// Insurance wizard: completed -> callback.
    pub insurance_completion: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            search_step: Duration::from_millis(1500),
            result_item: Duration::from_millis(800),
            chat_reply: Duration::from_millis(1000),
            booking_step: Duration::from_secs(2),
            medical_completion: Duration::from_secs(2),
            insurance_processing: Duration::from_secs(2),
            insurance_completion: Duration::from_secs(3),
        }
    }
}

impl Timings {
    /// All delays zero. Scripts still run in order, just without waiting.
    pub fn immediate() -> Self {
        Self {
            search_step: Duration::ZERO,
            result_item: Duration::ZERO,
            chat_reply: Duration::ZERO,
            booking_step: Duration::ZERO,
            medical_completion: Duration::ZERO,
            insurance_processing: Duration::ZERO,
            insurance_completion: Duration::ZERO,
        }
    }
}
