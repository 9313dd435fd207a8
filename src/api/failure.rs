//! Shared shaping of executor failures into HTTP responses.

use axum::http::StatusCode;
use serde::Serialize;

use crate::domain::query::{ErrorKind, QueryFailure};

/// Fields every failed database-backed endpoint returns.
#[derive(Debug, Serialize)]
pub struct FailureBody {
    pub status: &'static str,
    pub error_type: &'static str,
    pub error_kind: ErrorKind,
    pub message: String,
    pub details: String,
}

impl FailureBody {
    /// Body for `failure` using the kind's own category as message.
    pub fn new(failure: &QueryFailure) -> Self {
        Self::with_message(failure, failure.kind.category())
    }

    pub fn with_message(failure: &QueryFailure, message: impl Into<String>) -> Self {
        Self {
            status: "error",
            error_type: failure.kind.error_type(),
            error_kind: failure.kind,
            message: message.into(),
            details: failure.detail.clone(),
        }
    }
}

/// The kind's default HTTP status.
pub fn failure_status(kind: ErrorKind) -> StatusCode {
    StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
