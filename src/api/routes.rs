use axum::{routing::get, Router};

use crate::server::AppState;

use super::dbstatus::dbstatus;
use super::health::health;
use super::info::index;
use super::metrics::prometheus_metrics;
use super::users::users;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        // Database-backed endpoints
        .route("/dbstatus", get(dbstatus))
        .route("/users", get(users))
        .route("/metrics", get(prometheus_metrics))
}
