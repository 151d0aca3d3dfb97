/*!
 * Error types for the eventdesk application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The provider answered but produced no text
    #[error("Provider returned an empty response")]
    EmptyResponse,
}

impl ProviderError {
    /// Whether a retry has a chance of succeeding
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError(_) | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

/// Errors raised while validating or looking up records
#[derive(Error, Debug, PartialEq)]
pub enum RecordError {
    /// No row with this identifier
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record (event, supplier, ...)
        entity: &'static str,
        /// Identifier or key that was looked up
        id: String,
    },

    /// A unique key is already taken
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// A field failed validation
    #[error("Invalid {field}: {message}")]
    Invalid {
        /// Field name
        field: &'static str,
        /// What is wrong with it
        message: String,
    },

    /// A supplier tried to act on a deliverable that is not theirs
    #[error("Deliverable {deliverable} is not assigned to supplier '{supplier}'")]
    NotAssigned {
        /// Supplier username
        supplier: String,
        /// Deliverable id
        deliverable: i64,
    },
}

impl RecordError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Errors that can occur while generating a report
#[derive(Error, Debug)]
pub enum ReportError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error with the records the report is built from
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// Error from the database layer
    #[error("Storage error: {0}")]
    Storage(String),

    /// Error while packaging the document
    #[error("Render error: {0}")]
    Render(String),
}

impl From<anyhow::Error> for ReportError {
    fn from(error: anyhow::Error) -> Self {
        let error = match error.downcast::<RecordError>() {
            Ok(record) => return Self::Record(record),
            Err(other) => other,
        };
        match error.downcast::<ProviderError>() {
            Ok(provider) => Self::Provider(provider),
            Err(other) => Self::Storage(format!("{:#}", other)),
        }
    }
}

impl From<zip::result::ZipError> for ReportError {
    fn from(error: zip::result::ZipError) -> Self {
        Self::Render(error.to_string())
    }
}

impl From<std::io::Error> for ReportError {
    fn from(error: std::io::Error) -> Self {
        Self::Render(error.to_string())
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from record handling
    #[error("Record error: {0}")]
    Record(#[from] RecordError),

    /// Error from report generation
    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
