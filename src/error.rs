//! Error types for the store, the listener and the HTTP handlers.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::api::envelope::ApiResponse;

/// Store connection and query errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The database file does not exist.
    #[error("database file not found at {}", .0.display())]
    NotFound(PathBuf),

    /// The database file could not be opened.
    #[error("failed to open database: {0}")]
    Open(#[source] rusqlite::Error),

    /// The database was opened but did not answer a liveness query.
    #[error("failed to ping database: {0}")]
    Ping(#[source] rusqlite::Error),

    /// A query failed.
    #[error("query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// The blocking task running the query did not complete.
    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Listener lifecycle errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listener could not bind. Fatal.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The metrics exporter could not be installed.
    #[error("failed to install metrics exporter: {0}")]
    Metrics(String),
}

/// Errors a handler turns into an error envelope.
#[derive(Error, Debug)]
pub enum ApiError {
    /// `POST` body not declared as JSON.
    #[error("Content-Type must be application/json")]
    UnsupportedContentType,

    /// Body could not be read.
    #[error("failed to read request body: {0}")]
    Body(String),

    /// Body is not valid JSON for the expected shape.
    #[error("invalid JSON format: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Required fields were missing or empty.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// No route matched the path.
    #[error("Path {0} not found")]
    NotFound(String),

    /// The path matched but the method did not.
    #[error("Method {0} not allowed")]
    MethodNotAllowed(Method),

    /// Static asset path tried to escape the asset root.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// No store is attached; the status depends on the endpoint.
    #[error("store not available")]
    StoreUnavailable(StatusCode),

    /// Handling the request took longer than the write timeout.
    #[error("request timed out")]
    Timeout,

    /// A middleware stage failed for a reason other than the timeout.
    #[error("internal error: {0}")]
    Internal(String),

    /// A whole query failed (row-level failures never get here).
    #[error("{context}: {source}")]
    Store {
        /// What was being queried.
        context: &'static str,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnsupportedContentType
            | ApiError::Body(_)
            | ApiError::InvalidJson(_)
            | ApiError::MissingFields(_)
            | ApiError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::StoreUnavailable(status) => *status,
            ApiError::Timeout => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal(_) | ApiError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Human-readable envelope message.
    fn message(&self) -> String {
        match self {
            ApiError::UnsupportedContentType => "Content-Type must be application/json".to_string(),
            ApiError::Body(_) => "Failed to read request body".to_string(),
            ApiError::InvalidJson(_) => "Invalid JSON format".to_string(),
            ApiError::MissingFields(_) => "Username and email are required".to_string(),
            ApiError::NotFound(_) => "Endpoint not found".to_string(),
            ApiError::MethodNotAllowed(_) => "Method not allowed".to_string(),
            ApiError::InvalidPath(_) => "Invalid path".to_string(),
            ApiError::StoreUnavailable(_) => "Database not available".to_string(),
            ApiError::Timeout => "Request timed out".to_string(),
            ApiError::Internal(_) => "Internal server error".to_string(),
            ApiError::Store { context, .. } => format!("Failed to {context}"),
        }
    }

    /// Machine-readable envelope error string.
    fn detail(&self) -> String {
        match self {
            ApiError::InvalidJson(e) => e.to_string(),
            ApiError::Body(e) => e.clone(),
            ApiError::Store { source, .. } => source.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()>::failure(self.message(), self.detail());
        (self.status(), Json(body)).into_response()
    }
}

/// Convenient Result type alias for handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
