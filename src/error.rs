//! Top-level error types.

/// Error loading process configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Environment variable {0} is not valid unicode")]
    NotUnicode(String),
}
