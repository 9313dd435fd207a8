//! Domain layer modules
//!
//! - `pool`: Connection pool manager
//! - `query`: Resilient query executor and error classification

pub mod pool;
pub mod query;
