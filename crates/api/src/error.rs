//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Every variant renders as a JSON
//! body with an `error` message and, where useful, `details`:
//!
//! ```json
//! {"error": "Invalid data format or missing required fields", "details": "record 0: missing required field `price_amt`"}
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use shipments_core::ValidationError;

use crate::db::RepositoryError;

/// Application-level error type for the shipments API.
#[derive(Debug, Error)]
pub enum AppError {
    /// The request carried no shipment records.
    #[error("No data provided")]
    NoData,

    /// A shipment record failed validation.
    #[error("Invalid data format or missing required fields")]
    InvalidData(#[source] ValidationError),

    /// The query string contains a key outside `carrier`, `date`, `price`.
    #[error("Malformed query params")]
    MalformedQuery,

    /// A recognized query parameter has an unparseable value.
    #[error("Invalid query param format")]
    InvalidQuery(#[source] ValidationError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// JSON error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    /// HTTP status code for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::NoData | Self::InvalidData(_) | Self::MalformedQuery | Self::InvalidQuery(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing body. Repository errors only carry their generic message.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        let (error, details) = match self {
            Self::NoData | Self::MalformedQuery => (self.to_string(), None),
            Self::InvalidData(e) | Self::InvalidQuery(e) => (self.to_string(), Some(e.to_string())),
            Self::Repository(e) => {
                let error = match e {
                    RepositoryError::Insertion(_) | RepositoryError::FieldTooLong { .. } => {
                        "Insertion error"
                    }
                    RepositoryError::Fetch(_) => "Fetch error",
                    RepositoryError::Schema(_) | RepositoryError::DataCorruption(_) => {
                        "Internal server error"
                    }
                };
                (error.to_string(), Some(e.to_string()))
            }
        };
        ErrorBody { error, details }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if let Self::Repository(err) = &self {
            let event_id = sentry::capture_error(err);
            tracing::error!(
                error = %err,
                source = ?std::error::Error::source(err),
                sentry_event_id = %event_id,
                "Repository error"
            );
        }

        (self.status(), Json(self.body())).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
