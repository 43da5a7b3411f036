use miette::{Diagnostic, Result};
use rust_i18n::t;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Validation error: {0}")]
    #[diagnostic(code(campus_calendar::validation))]
    Validation(String),

    #[error("Not authorized: {0}")]
    #[diagnostic(code(campus_calendar::authorization))]
    Authorization(String),

    #[error("Event store error: {0}")]
    #[diagnostic(
        code(campus_calendar::store),
        help("The request can be retried once the store is reachable again")
    )]
    TransientStore(String),

    #[error("Event not found: {0}")]
    #[diagnostic(code(campus_calendar::not_found), help("Refresh the event list"))]
    NotFound(String),

    #[error("Environment error: {0}")]
    #[diagnostic(code(campus_calendar::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(campus_calendar::config))]
    Config(String),

    #[error("Component error: {0}")]
    #[diagnostic(code(campus_calendar::component))]
    Component(String),

    #[error(transparent)]
    #[diagnostic(code(campus_calendar::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(campus_calendar::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(campus_calendar::other))]
    Other(String),
}

impl Error {
    /// Message shown to the user when an operation fails.
    ///
    /// Every failure of a calendar operation ends up here; none of them
    /// terminate the session.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(details) => t!("error_validation", details = details).to_string(),
            Error::Authorization(_) => t!("error_authorization").to_string(),
            Error::TransientStore(_) => t!("error_store").to_string(),
            Error::NotFound(_) => t!("error_not_found").to_string(),
            other => t!("error_other", details = other.to_string()).to_string(),
        }
    }

    /// Whether the caller should refetch its event set after this failure
    pub fn should_refresh(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// Implement From for JSON errors
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type CalendarResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create component errors
pub fn component_error(message: &str) -> Error {
    Error::Component(message.to_string())
}

/// Helper to create validation errors
pub fn validation_error(message: &str) -> Error {
    Error::Validation(message.to_string())
}

/// Helper to create authorization errors
pub fn authorization_error(message: &str) -> Error {
    Error::Authorization(message.to_string())
}

/// Helper to create transient store errors
pub fn store_error(message: &str) -> Error {
    Error::TransientStore(message.to_string())
}

/// Helper to create not-found errors
pub fn not_found_error(id: &str) -> Error {
    Error::NotFound(id.to_string())
}
