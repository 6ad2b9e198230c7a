//! Unified error handling for the adaptive grid bot
//!
//! Every collaborator call (exchange, notifier, storage) returns a
//! `TradingResult` so the engine can branch on failures instead of
//! letting them unwind the poll loop.

use std::io;
use thiserror::Error;

/// Main error type for the grid bot
#[derive(Debug, Error)]
pub enum TradingError {
    // Configuration errors
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Configuration validation error: {0}")]
    ConfigValidation(String),

    #[error("Missing required configuration: {0}")]
    ConfigMissing(String),

    #[error("Invalid parameter '{0}': {1}")]
    InvalidParameter(String, String), // (parameter_name, reason)

    // Exchange API errors
    #[error("API connection error: {0}")]
    ApiConnection(String),

    #[error("API authentication failed: {0}")]
    ApiAuthentication(String),

    #[error("API rate limit exceeded: {0}")]
    ApiRateLimit(String),

    #[error("API response error: {0}")]
    ApiResponse(String),

    #[error("API timeout: {0}")]
    ApiTimeout(String),

    // Trading errors
    #[error("Order failed: {0}")]
    OrderFailed(String),

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    // Notification errors
    #[error("Notification failed: {0}")]
    Notifier(String),

    // IO errors
    #[error("File read error: {0}")]
    FileRead(String),

    #[error("File write error: {0}")]
    FileWrite(String),

    #[error("Directory creation error: {0}")]
    DirectoryCreate(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TradingError {
    /// Get a user-friendly error message with helpful context
    pub fn user_message(&self) -> String {
        match self {
            TradingError::ConfigNotFound(path) => {
                format!(
                    "Configuration file not found: {}\n\n\
                    💡 Quick fix:\n\
                    1. Run: grid-bot init\n\
                    2. Edit config.toml (or export KUCOIN_API_KEY, ...)\n\
                    3. Try again",
                    path
                )
            }
            TradingError::ConfigValidation(msg) | TradingError::ConfigMissing(msg) => {
                format!(
                    "Configuration error: {}\n\n\
                    💡 Check config.toml for:\n\
                    - An even grid_size between 2 and 50\n\
                    - A budget between 10 and 1,000,000\n\
                    - API credentials when sandbox = false",
                    msg
                )
            }
            TradingError::ApiAuthentication(msg) => {
                format!(
                    "API authentication failed: {}\n\n\
                    💡 Check:\n\
                    - API key, secret and passphrase\n\
                    - Keys have futures trading permission\n\
                    - The sandbox flag matches the key environment",
                    msg
                )
            }
            TradingError::ApiRateLimit(msg) => {
                format!(
                    "API rate limit exceeded: {}\n\n\
                    💡 The engine backs off automatically; consider a longer poll_interval_secs",
                    msg
                )
            }
            _ => self.to_string(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TradingError::ApiTimeout(_)
                | TradingError::ApiConnection(_)
                | TradingError::ApiRateLimit(_)
        )
    }

    /// Configuration errors are fatal to grid setup; everything else is transient
    pub fn is_config_error(&self) -> bool {
        matches!(self.category(), "config")
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            TradingError::ConfigNotFound(_)
            | TradingError::ConfigParse(_)
            | TradingError::ConfigValidation(_)
            | TradingError::ConfigMissing(_)
            | TradingError::InvalidParameter(_, _) => "config",

            TradingError::ApiConnection(_)
            | TradingError::ApiAuthentication(_)
            | TradingError::ApiRateLimit(_)
            | TradingError::ApiResponse(_)
            | TradingError::ApiTimeout(_) => "api",

            TradingError::OrderFailed(_)
            | TradingError::OrderRejected(_)
            | TradingError::OrderNotFound(_) => "trading",

            TradingError::Notifier(_) => "notifier",

            TradingError::FileRead(_)
            | TradingError::FileWrite(_)
            | TradingError::DirectoryCreate(_)
            | TradingError::Serialization(_) => "io",

            TradingError::Internal(_) => "internal",
        }
    }
}

impl From<io::Error> for TradingError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                TradingError::FileRead(err.to_string())
            }
            io::ErrorKind::TimedOut => TradingError::ApiTimeout(err.to_string()),
            io::ErrorKind::ConnectionRefused => TradingError::ApiConnection(err.to_string()),
            _ => TradingError::Internal(format!("IO error: {}", err)),
        }
    }
}

impl From<serde_json::Error> for TradingError {
    fn from(err: serde_json::Error) -> Self {
        TradingError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<toml::de::Error> for TradingError {
    fn from(err: toml::de::Error) -> Self {
        TradingError::ConfigParse(format!("TOML parse error: {}", err))
    }
}

impl From<reqwest::Error> for TradingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TradingError::ApiTimeout(err.to_string())
        } else if err.is_decode() {
            TradingError::ApiResponse(err.to_string())
        } else if err.is_status() {
            TradingError::ApiResponse(err.to_string())
        } else {
            TradingError::ApiConnection(err.to_string())
        }
    }
}

impl From<String> for TradingError {
    fn from(msg: String) -> Self {
        TradingError::Internal(msg)
    }
}

impl From<&str> for TradingError {
    fn from(msg: &str) -> Self {
        TradingError::Internal(msg.to_string())
    }
}

/// Result type alias using TradingError
pub type TradingResult<T> = Result<T, TradingError>;
