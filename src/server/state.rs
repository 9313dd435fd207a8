use std::sync::Arc;

use crate::config::Settings;
use crate::domain::pool::{ConnectionPool, Connector, PoolOptions};
use crate::domain::query::QueryExecutor;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub pool: ConnectionPool,
    pub executor: Arc<QueryExecutor>,
}

impl AppState {
    /// Build the pool and executor on top of `connector`. No connection is
    /// opened until the first query.
    pub fn new(settings: Settings, connector: Arc<dyn Connector>) -> Self {
        let pool = ConnectionPool::new(connector, PoolOptions::from(&settings.database));
        let executor = Arc::new(QueryExecutor::from_config(pool.clone(), &settings.database));

        Self {
            settings: Arc::new(settings),
            pool,
            executor,
        }
    }
}
