// src/error.rs

//! Unified error handling for the scraping engine.

use std::fmt;

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Policy is self-contradictory or missing a required selector
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// CSS selector could not be parsed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Page did not finish loading before the deadline
    #[error("Navigation to {url} timed out")]
    NavigationTimeout { url: String },

    /// Selector never matched before the deadline
    #[error("Selector '{selector}' not found")]
    SelectorNotFound { selector: String },

    /// Required numeric field had no usable text
    #[error("Failed to normalize {field} from '{text}'")]
    Normalization { field: String, text: String },

    /// The whole run exceeded its top-level deadline
    #[error("Scrape exceeded its {seconds}s deadline")]
    DeadlineExceeded { seconds: u64 },

    /// Browser backend failure
    #[error("Browser error: {0}")]
    Browser(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a navigation timeout error.
    pub fn navigation_timeout(url: impl Into<String>) -> Self {
        Self::NavigationTimeout { url: url.into() }
    }

    /// Create a selector-not-found error.
    pub fn selector_not_found(selector: impl Into<String>) -> Self {
        Self::SelectorNotFound {
            selector: selector.into(),
        }
    }

    /// Create a normalization error for a required field.
    pub fn normalization(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Normalization {
            field: field.into(),
            text: text.into(),
        }
    }

    /// Create a browser backend error.
    pub fn browser(message: impl fmt::Display) -> Self {
        Self::Browser(message.to_string())
    }

    /// Whether the task layer should retry the run that produced this error.
    ///
    /// Slow or changed sites are worth another attempt; broken policies and
    /// unusable data are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NavigationTimeout { .. }
            | AppError::SelectorNotFound { .. }
            | AppError::DeadlineExceeded { .. }
            | AppError::Browser(_)
            | AppError::Io(_) => true,
            AppError::Configuration(_)
            | AppError::Selector { .. }
            | AppError::Normalization { .. }
            | AppError::Json(_)
            | AppError::Toml(_) => false,
        }
    }
}

/// Typed failure for a single site run, carrying the mountain identity.
#[derive(Error, Debug)]
#[error("Failed to scrape {mountain_name}: {error}")]
pub struct ScrapeFailure {
    pub mountain_name: String,
    pub mountain_id: u32,
    #[source]
    pub error: AppError,
}

impl ScrapeFailure {
    pub fn new(mountain_name: impl Into<String>, mountain_id: u32, error: AppError) -> Self {
        Self {
            mountain_name: mountain_name.into(),
            mountain_id,
            error,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.error.is_retryable()
    }
}
