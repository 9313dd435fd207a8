use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// HTTP-layer failures that are not database outcomes.
///
/// Query failures are shaped from `QueryFailure` by the handlers instead.
#[derive(Error, Debug)]
pub enum AppError {
    /// No route matched
    #[error("Not found: {0}")]
    NotFound(String),

    /// The metrics registry could not be rendered
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Metrics(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Metrics(_) => "METRICS_ERROR",
        }
    }

    /// Text returned to clients. Encoder internals stay in the logs when
    /// running in production.
    fn client_message(&self) -> String {
        match self {
            AppError::NotFound(path) => path.clone(),
            AppError::Metrics(_) if is_production() => "Failed to encode metrics".to_string(),
            AppError::Metrics(e) => e.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "Request rejected");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.client_message(),
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_response() {
        let response = AppError::NotFound("No route for /nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_metrics_error_is_server_error() {
        let err: AppError = prometheus::Error::Msg("metrics output is not valid UTF-8".into()).into();
        assert_eq!(err.code(), "METRICS_ERROR");
        assert!(err.to_string().contains("not valid UTF-8"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
