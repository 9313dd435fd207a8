//! Database connectivity check.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::domain::query::{QueryOutcome, QueryRequest};
use crate::server::AppState;

use super::failure::{failure_status, FailureBody};

const PROBE_SQL: &str = "SELECT CURRENT_TIMESTAMP";

#[derive(Debug, Serialize)]
pub struct DbStatusResponse {
    pub status: &'static str,
    pub database: String,
    pub host: String,
    pub port: u16,
    pub timestamp: Value,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
struct DbStatusFailure {
    #[serde(flatten)]
    failure: FailureBody,
    database: String,
    host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
}

/// GET /dbstatus - run a smoke-test query and report the connection target
pub async fn dbstatus(State(state): State<AppState>) -> Response {
    let db = &state.settings.database;

    match state.executor.execute(&QueryRequest::new(PROBE_SQL)).await {
        QueryOutcome::Success(success) => {
            let timestamp = success.scalar().cloned().unwrap_or(Value::Null);
            let body = DbStatusResponse {
                status: "connected",
                database: db.name.clone(),
                host: db.host.clone(),
                port: db.port,
                timestamp,
                message: "Database connection successful",
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        QueryOutcome::Failure(failure) => {
            tracing::warn!(
                kind = %failure.kind,
                target = %db.target(),
                "Database status check failed"
            );

            // Network-level failures also report the port
            let port = (failure.kind.error_type() == "OperationalError").then_some(db.port);
            let body = DbStatusFailure {
                failure: FailureBody::new(&failure),
                database: db.name.clone(),
                host: db.host.clone(),
                port,
            };
            (failure_status(failure.kind), Json(body)).into_response()
        }
    }
}
