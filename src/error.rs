//! Error types for Arogya Assist.

use uuid::Uuid;

/// Top-level error type for the assistant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Intake error: {0}")]
    Intake(#[from] IntakeError),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Advisory endpoint errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} returned HTTP status {status}")]
    HttpStatus { provider: String, status: u16 },

    #[error("Provider {provider} returned no text candidate")]
    EmptyResponse { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Profile intake validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntakeError {
    #[error("Field {0} is required")]
    MissingField(&'static str),

    #[error("Age must be a whole number between 1 and 120, got {0:?}")]
    InvalidAge(String),

    #[error("Unknown gender {0:?}, expected male, female or other")]
    InvalidGender(String),

    #[error("Invalid email address {0:?}")]
    InvalidEmail(String),

    #[error("Invalid phone number {0:?}")]
    InvalidPhone(String),
}

/// Booking/application wizard errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WizardError {
    #[error("Field {0} is required")]
    MissingField(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Wizard already left the form step (currently {phase})")]
    AlreadySubmitted { phase: String },

    #[error("No {0} wizard is open")]
    NotOpen(&'static str),

    #[error("No {kind} with id {id} in the current results")]
    UnknownItem { kind: &'static str, id: String },
}

/// Session lookup and conversation input errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Session {0} not found")]
    NotFound(Uuid),

    #[error("Location must not be empty")]
    EmptyLocation,

    #[error("No location was requested (sub-flow is {0})")]
    UnexpectedLocation(String),
}

/// Terminal channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} closed: {reason}")]
    Closed { name: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the assistant.
pub type Result<T> = std::result::Result<T, Error>;
