use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::server::AppState;

/// GET / - service description and endpoint listing
pub async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": state.settings.server.service_name,
        "endpoints": {
            "/": "Service description",
            "/health": "Service health check",
            "/dbstatus": "Check database connection status",
            "/users": "Fetch all users from the database",
            "/metrics": "Prometheus metrics",
        }
    }))
}
