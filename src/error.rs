// src/error.rs

//! Unified error handling for the archive pipeline.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for archive operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A snapshot the step depends on has not been produced yet
    #[error("{} not found. Run '{remedy}' first", path.display())]
    MissingSnapshot { path: PathBuf, remedy: &'static str },

    /// A snapshot is missing a column the step needs
    #[error("{file} is missing required column '{column}'")]
    MissingColumn { file: String, column: String },

    /// Category filter outside the known set
    #[error("Invalid category '{value}'. Valid categories: Pres, Prim, Mun, Leg")]
    InvalidCategory { value: String },

    /// Two inventory entries share the same document name
    #[error("Duplicate document name in inventory: '{name}'")]
    DuplicateName { name: String },

    /// Listing page for a year could not be fetched
    #[error("Listing for {year} failed: {message}")]
    Listing { year: i32, message: String },

    /// Document fetch failed
    #[error("Fetch error for {context}: {message}")]
    Fetch { context: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a missing-snapshot error with the command that produces it.
    pub fn missing_snapshot(path: impl Into<PathBuf>, remedy: &'static str) -> Self {
        Self::MissingSnapshot {
            path: path.into(),
            remedy,
        }
    }

    /// Create a missing-column error.
    pub fn missing_column(file: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            file: file.into(),
            column: column.into(),
        }
    }

    /// Create a listing error for a year.
    pub fn listing(year: i32, message: impl fmt::Display) -> Self {
        Self::Listing {
            year,
            message: message.to_string(),
        }
    }

    /// Create a fetch error with context.
    pub fn fetch(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
