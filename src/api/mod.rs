//! API layer - HTTP endpoint handlers.

mod dbstatus;
mod failure;
mod health;
mod info;
mod metrics;
mod routes;
mod users;

pub use dbstatus::{dbstatus, DbStatusResponse};
pub use failure::{failure_status, FailureBody};
pub use health::{health, HealthResponse};
pub use info::index;
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
pub use users::{users, UsersResponse};
