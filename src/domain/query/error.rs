//! Structural representation of raw database failures.
//!
//! Driver adapters convert their native errors into [`DbError`] by error
//! variant, never by message text. The classifier only looks at
//! [`Phase`] and [`ErrorCategory`].

use std::fmt;
use std::time::Duration;

/// Where in the connection lifecycle a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Opening (or validating) a physical connection
    Connect,
    /// Running a statement on an established connection
    Query,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Connect => "connect",
            Phase::Query => "query",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Driver-independent failure category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Socket level failure (refused, reset, unreachable)
    Io,
    Tls,
    /// Unexpected or malformed message on the wire
    Protocol,
    /// Invalid connection options
    Configuration,
    /// Error reported by the database server, with its SQLSTATE code
    Database { code: Option<String> },
    /// A value could not be decoded from a row
    Decode,
    /// No pool slot became free within the wait bound
    PoolTimedOut,
    PoolClosed,
    /// A client-side deadline elapsed
    Deadline,
    Other,
}

/// A raw failure from the pool or the driver.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{phase} error: {detail}")]
pub struct DbError {
    pub phase: Phase,
    pub category: ErrorCategory,
    /// Verbatim driver text, for operators
    pub detail: String,
}

impl DbError {
    pub fn new(phase: Phase, category: ErrorCategory, detail: impl Into<String>) -> Self {
        Self {
            phase,
            category,
            detail: detail.into(),
        }
    }

    /// Database server error carrying a SQLSTATE code.
    pub fn database(phase: Phase, code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(
            phase,
            ErrorCategory::Database {
                code: Some(code.into()),
            },
            detail,
        )
    }

    pub fn pool_timed_out(waited: Duration) -> Self {
        Self::new(
            Phase::Connect,
            ErrorCategory::PoolTimedOut,
            format!(
                "no connection available after waiting {:.3}s",
                waited.as_secs_f64()
            ),
        )
    }

    pub fn pool_closed() -> Self {
        Self::new(Phase::Connect, ErrorCategory::PoolClosed, "connection pool is closed")
    }

    pub fn deadline(phase: Phase, limit: Duration) -> Self {
        Self::new(
            phase,
            ErrorCategory::Deadline,
            format!("{} exceeded deadline of {:.3}s", phase, limit.as_secs_f64()),
        )
    }

    /// SQLSTATE code, if the server reported one.
    pub fn sqlstate(&self) -> Option<&str> {
        match &self.category {
            ErrorCategory::Database { code } => code.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_phase_and_detail() {
        let err = DbError::new(Phase::Query, ErrorCategory::Io, "connection reset by peer");
        assert_eq!(err.to_string(), "query error: connection reset by peer");
    }

    #[test]
    fn test_sqlstate_only_for_database_errors() {
        let err = DbError::database(Phase::Query, "42P01", "relation \"users\" does not exist");
        assert_eq!(err.sqlstate(), Some("42P01"));

        let err = DbError::pool_closed();
        assert_eq!(err.sqlstate(), None);
    }

    #[test]
    fn test_deadline_detail() {
        let err = DbError::deadline(Phase::Connect, Duration::from_millis(1500));
        assert_eq!(err.category, ErrorCategory::Deadline);
        assert!(err.detail.contains("connect exceeded deadline of 1.500s"));
    }
}
