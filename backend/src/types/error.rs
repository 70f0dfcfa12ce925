//! Universal error handling for the API

use std::borrow::Cow;

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use schemars::JsonSchema;
use serde::Serialize;
use shop_storage::{cart::ClearOutcome, StorageError};

/// API error response envelope
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Whether the client should retry the request
    pub allow_retry: bool,
    /// Error details
    error: ErrorBody,
}

/// Error body containing code and message
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    /// Machine-readable error code
    pub code: &'static str,
    /// Human-readable error message
    pub message: Cow<'static, str>,
    /// Partial progress of a bulk operation that did not complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ClearOutcome>,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub fn new(
        status: StatusCode,
        code: &'static str,
        msg: impl Into<Cow<'static, str>>,
        retry: bool,
    ) -> Self {
        Self {
            status,
            inner: ApiErrorResponse {
                allow_retry: retry,
                error: ErrorBody {
                    code,
                    message: msg.into(),
                    progress: None,
                },
            },
        }
    }

    /// Request validation failure
    #[must_use]
    pub fn validation(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", msg, false)
    }

    /// HTTP status of the error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.inner.error.code
    }

    fn with_progress(mut self, outcome: ClearOutcome) -> Self {
        self.inner.error.progress = Some(outcome);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!(
                "Client error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            500..=599 => tracing::error!(
                "Server error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

/// Convert storage errors to application errors
impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Validation(msg) => Self::validation(msg),
            StorageError::MalformedKey(err) => Self::new(
                StatusCode::BAD_REQUEST,
                "invalid_id",
                err.to_string(),
                false,
            ),
            StorageError::NotFound(kind) => Self::new(
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{kind} not found"),
                false,
            ),
            StorageError::AlreadyExists(kind) => Self::new(
                StatusCode::CONFLICT,
                "already_exists",
                format!("{kind} already exists"),
                false,
            ),
            StorageError::StoreUnavailable(msg) => {
                tracing::error!("Store unavailable: {msg}");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "store_unavailable",
                    "Storage temporarily unavailable",
                    true,
                )
            }
            StorageError::PartialFailure { requested, removed } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "partial_failure",
                format!("Removed {removed} of {requested} items"),
                true,
            )
            .with_progress(ClearOutcome { requested, removed }),
            StorageError::Serialization(msg) => {
                tracing::error!("Stored record could not be decoded: {msg}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                    false,
                )
            }
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}
