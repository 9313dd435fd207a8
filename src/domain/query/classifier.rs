//! Maps raw database failures onto a closed set of outcome kinds.

use std::fmt;

use serde::Serialize;

use super::error::{DbError, ErrorCategory, Phase};

/// Classification attached to every failed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Could not establish a connection
    ConnectError,
    /// Credentials invalid or access denied
    AuthError,
    /// An established connection failed mid-use
    ConnectionBroken,
    /// The statement is invalid or references missing objects
    QueryError,
    /// Deadline exceeded
    Timeout,
    /// No connection available within the wait bound
    PoolExhausted,
    Unknown,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::ConnectError,
        ErrorKind::AuthError,
        ErrorKind::ConnectionBroken,
        ErrorKind::QueryError,
        ErrorKind::Timeout,
        ErrorKind::PoolExhausted,
        ErrorKind::Unknown,
    ];

    /// Whether the executor retries (on a fresh connection) after this kind.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ErrorKind::ConnectionBroken)
    }

    /// Default HTTP status. Endpoints may override `QueryError`.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::ConnectError
            | ErrorKind::AuthError
            | ErrorKind::ConnectionBroken
            | ErrorKind::Timeout
            | ErrorKind::PoolExhausted => 503,
            ErrorKind::QueryError | ErrorKind::Unknown => 500,
        }
    }

    /// Label exposed as `error_type` in failure payloads.
    pub fn error_type(&self) -> &'static str {
        match self {
            ErrorKind::ConnectError | ErrorKind::ConnectionBroken | ErrorKind::Timeout => {
                "OperationalError"
            }
            ErrorKind::AuthError | ErrorKind::QueryError => "DatabaseError",
            ErrorKind::PoolExhausted => "PoolTimeoutError",
            ErrorKind::Unknown => "UnexpectedError",
        }
    }

    /// Human-readable category.
    pub fn category(&self) -> &'static str {
        match self {
            ErrorKind::ConnectError => "Failed to connect to database",
            ErrorKind::AuthError => "Database authentication or access error",
            ErrorKind::ConnectionBroken => "Database connection lost during operation",
            ErrorKind::QueryError => "Database query error",
            ErrorKind::Timeout => "Database operation timed out",
            ErrorKind::PoolExhausted => "No database connection available",
            ErrorKind::Unknown => "Unexpected error occurred",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ConnectError => "connect_error",
            ErrorKind::AuthError => "auth_error",
            ErrorKind::ConnectionBroken => "connection_broken",
            ErrorKind::QueryError => "query_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::PoolExhausted => "pool_exhausted",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SQLSTATE classes that mean the statement itself is at fault.
const QUERY_ERROR_CLASSES: &[&str] = &["0A", "21", "22", "23", "25", "26", "40", "42", "44"];

/// Classify a raw failure. Rules run most-specific first.
pub fn classify(error: &DbError) -> ErrorKind {
    match &error.category {
        ErrorCategory::PoolTimedOut => ErrorKind::PoolExhausted,
        ErrorCategory::PoolClosed => ErrorKind::ConnectError,
        ErrorCategory::Deadline => match error.phase {
            Phase::Connect => ErrorKind::ConnectError,
            Phase::Query => ErrorKind::Timeout,
        },
        ErrorCategory::Database { .. } => match error.sqlstate() {
            Some(code) => classify_sqlstate(code, error.phase),
            None => ErrorKind::Unknown,
        },
        ErrorCategory::Io | ErrorCategory::Tls | ErrorCategory::Protocol => {
            connection_failure(error.phase)
        }
        ErrorCategory::Configuration => ErrorKind::ConnectError,
        ErrorCategory::Decode | ErrorCategory::Other => ErrorKind::Unknown,
    }
}

fn classify_sqlstate(code: &str, phase: Phase) -> ErrorKind {
    let class = code.get(..2).unwrap_or(code);

    match (code, class) {
        (_, "28") | ("3D000", _) | ("42501", _) => ErrorKind::AuthError,
        ("57014", _) => ErrorKind::Timeout,
        ("57P01" | "57P02" | "57P03", _) | (_, "08") => connection_failure(phase),
        ("53300", _) => ErrorKind::ConnectError,
        _ if QUERY_ERROR_CLASSES.contains(&class) => ErrorKind::QueryError,
        _ => ErrorKind::Unknown,
    }
}

fn connection_failure(phase: Phase) -> ErrorKind {
    match phase {
        Phase::Connect => ErrorKind::ConnectError,
        Phase::Query => ErrorKind::ConnectionBroken,
    }
}
