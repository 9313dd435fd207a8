//! Database connection pool.
//!
//! - `Connector` / `DbConnection`: the driver seam
//! - `ConnectionPool`: bounded pool with overflow, recycling and pre-ping
//! - `PooledConnection`: checked-out connection guard

mod connection;
mod manager;
mod options;
mod stats;

pub use connection::{Connector, DbConnection};
pub use manager::{ConnectionPool, PooledConnection};
pub use options::PoolOptions;
pub use stats::PoolStats;
