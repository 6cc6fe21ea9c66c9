use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Catalog error types.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    /// Region bounds with north < south, east < west or non-finite edges.
    InvalidBounds(String),
    /// No fixture matches the requested city/locality.
    NotFound(String),
    /// The operation did not finish before the caller's deadline.
    Timeout {
        /// Name of the operation that timed out.
        operation: String,
        /// Deadline the caller imposed, in milliseconds.
        deadline_ms: u64,
    },
    /// A simulated upstream source is offline or its circuit is open.
    SourceUnavailable(String),
    /// A newer request on the same channel replaced this one.
    Superseded(String),
    /// A fixture record breaks the listing invariants.
    InvalidFixture(String),
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Internal error.
    Internal(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<CatalogError>,
        /// Additional context message.
        context: String,
    },
}

impl CatalogError {
    /// Strips context layers and returns the underlying error.
    pub fn root(&self) -> &CatalogError {
        match self {
            CatalogError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// True for failures a UI should offer a retry for.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.root(),
            CatalogError::Timeout { .. } | CatalogError::SourceUnavailable(_)
        )
    }
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::InvalidBounds(msg) => write!(f, "Invalid bounds: {}", msg),
            CatalogError::NotFound(msg) => write!(f, "Not found: {}", msg),
            CatalogError::Timeout {
                operation,
                deadline_ms,
            } => write!(f, "Timeout: {} exceeded {}ms", operation, deadline_ms),
            CatalogError::SourceUnavailable(msg) => write!(f, "Source unavailable: {}", msg),
            CatalogError::Superseded(channel) => {
                write!(f, "Superseded by a newer request on '{}'", channel)
            }
            CatalogError::InvalidFixture(msg) => write!(f, "Invalid fixture: {}", msg),
            CatalogError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            CatalogError::Internal(msg) => write!(f, "Internal error: {}", msg),
            CatalogError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for CatalogError {}

impl IntoResponse for CatalogError {
    /// Maps each error variant to an HTTP status code and JSON body.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            CatalogError::InvalidBounds(msg) | CatalogError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            CatalogError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CatalogError::Timeout { .. } => {
                tracing::warn!("{}", self);
                (StatusCode::GATEWAY_TIMEOUT, self.to_string())
            }
            CatalogError::SourceUnavailable(msg) => {
                tracing::error!("Source unavailable: {}", msg);
                (StatusCode::BAD_GATEWAY, "Upstream source unavailable".to_string())
            }
            CatalogError::Superseded(_) => (StatusCode::CONFLICT, self.to_string()),
            CatalogError::InvalidFixture(msg) | CatalogError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            CatalogError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                return (**source).clone().into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for `CatalogError`.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, CatalogError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, CatalogError> {
    fn context(self, context: impl Into<String>) -> Result<T, CatalogError> {
        self.map_err(|e| CatalogError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, CatalogError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| CatalogError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}
