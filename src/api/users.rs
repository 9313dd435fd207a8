use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::query::{ErrorKind, QueryOutcome, QueryRequest};
use crate::server::AppState;

use super::failure::{failure_status, FailureBody};

const USERS_SQL: &str = "SELECT * FROM users";

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub status: &'static str,
    pub count: usize,
    pub users: Vec<Map<String, Value>>,
}

/// GET /users - fetch every row of the `users` table
pub async fn users(State(state): State<AppState>) -> Response {
    match state.executor.execute(&QueryRequest::new(USERS_SQL)).await {
        QueryOutcome::Success(success) => {
            let body = UsersResponse {
                status: "success",
                count: success.row_count(),
                users: success.records(),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        QueryOutcome::Failure(failure) if failure.kind == ErrorKind::QueryError => {
            tracing::warn!(details = %failure.detail, "Users query rejected by the database");
            let body =
                FailureBody::with_message(&failure, "Database query error - table may not exist");
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
        QueryOutcome::Failure(failure) => {
            tracing::warn!(kind = %failure.kind, "Users query failed");
            (failure_status(failure.kind), Json(FailureBody::new(&failure))).into_response()
        }
    }
}
