use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time view of the pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub pool_size: usize,
    pub max_overflow: usize,
    /// Live connections, idle and checked out
    pub open: usize,
    pub idle: usize,
    pub checked_out: usize,
    /// Live connections beyond `pool_size`
    pub overflow: usize,
    pub created_total: u64,
    pub recycled_total: u64,
    pub discarded_total: u64,
    pub exhausted_total: u64,
}

/// Lifetime counters, updated without taking the pool lock.
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub created: AtomicU64,
    pub recycled: AtomicU64,
    pub discarded: AtomicU64,
    pub exhausted: AtomicU64,
}

impl PoolCounters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn load(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
