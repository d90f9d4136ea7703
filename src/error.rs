// src/error.rs

//! Unified error handling for the library desk.

use std::fmt;

use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Borrow attempted on a book that is already out
    #[error("Book is not available for borrowing: {0}")]
    BookUnavailable(String),

    /// Delete attempted on a book that has an open borrow
    #[error("Book is currently on loan: {0}")]
    BookOnLoan(String),

    /// Return attempted with no open borrow for the book
    #[error("No active borrowing found for book {0}")]
    NoActiveBorrow(String),

    /// Access number or registration number collision
    #[error("Duplicate {field}: '{value}' already exists")]
    DuplicateKey { field: String, value: String },

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced record does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// HTTP request failed
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// A serial import stopped part way through
    #[error("Import stopped after {imported} record(s): {source}")]
    Import {
        imported: usize,
        #[source]
        source: Box<AppError>,
    },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization failed
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Create a duplicate key error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::DuplicateKey {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a not-found error for the given record kind.
    pub fn not_found(kind: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.to_string(),
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

    /// Create a backend error from a status code and response body.
    pub fn backend(status: u16, message: impl fmt::Display) -> Self {
        Self::Backend {
            status,
            message: message.to_string(),
        }
    }

    /// Whether the failure came from talking to the backend.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Backend { .. })
    }
}
