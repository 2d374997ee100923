/**
 * Backend Error Types
 *
 * This module defines error types specific to the lock coordinator server.
 *
 * # Error Types
 *
 * - `StoreError` - The shared lock store could not complete an operation
 * - `BackplaneError` - The replication backplane could not publish or decode
 * - `BackendError` - Umbrella error used by HTTP handlers and the dispatcher
 *
 * # Failure Policy
 *
 * Contention and ownership violations are normal outcomes and never appear
 * here. Only unavailability of an external service is an error, and it is
 * fatal for the attempted operation only: no lock is granted and no lock is
 * reported as free.
 */

use crate::shared::SharedError;
use axum::http::StatusCode;
use thiserror::Error;

/// Shared lock store failure
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or the statement failed
    #[error("Lock store unavailable: {message}")]
    Unavailable {
        /// Human-readable error message
        message: String,
    },

    /// The store returned a row that could not be decoded
    #[error("Lock store returned invalid data: {message}")]
    Corrupt {
        /// Human-readable error message
        message: String,
    },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Decode(_) | sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
                Self::corrupt(err.to_string())
            }
            other => Self::unavailable(other.to_string()),
        }
    }
}

/// Replication backplane failure
#[derive(Debug, Error)]
pub enum BackplaneError {
    /// The channel could not be reached
    #[error("Backplane unavailable: {message}")]
    Unavailable {
        /// Human-readable error message
        message: String,
    },

    /// An envelope could not be encoded or decoded
    #[error("Backplane serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The encoded envelope exceeds what the transport can carry
    #[error("Backplane payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge {
        /// Encoded size in bytes
        size: usize,
        /// Transport limit in bytes
        limit: usize,
    },
}

impl BackplaneError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for BackplaneError {
    fn from(err: sqlx::Error) -> Self {
        Self::unavailable(err.to_string())
    }
}

/// Backend-specific error types
///
/// Each variant can be converted to an HTTP response (see `conversion`).
///
/// # Usage
///
/// ```rust
/// use listlock::backend::error::BackendError;
/// use axum::http::StatusCode;
///
/// let err = BackendError::handler(StatusCode::NOT_FOUND, "item is not locked");
/// assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error (e.g. unknown item, invalid request)
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Shared lock store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Replication backplane failure
    #[error(transparent)]
    Backplane(#[from] BackplaneError),

    /// Wire message error (from shared module)
    #[error(transparent)]
    SharedError(#[from] SharedError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl BackendError {
    /// Create a new handler error with a status code
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `HandlerError` - Uses the status code from the error
    /// - `Store` / `Backplane` unavailable - 503 Service Unavailable
    /// - `Store` corrupt data - 500 Internal Server Error
    /// - `SharedError` - 400 Bad Request (serialization: 500)
    /// - `SerializationError` - 500 Internal Server Error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::Store(StoreError::Unavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(StoreError::Corrupt { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Backplane(BackplaneError::Unavailable { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Backplane(BackplaneError::Serialization(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Backplane(BackplaneError::PayloadTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::SharedError(err) => match err {
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                SharedError::ValidationError { .. } => StatusCode::BAD_REQUEST,
                SharedError::ProtocolError { .. } => StatusCode::BAD_REQUEST,
            },
            Self::SerializationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
