use std::time::Duration;

use serde_json::{Map, Value};

use super::classifier::ErrorKind;

/// Result set of one statement. Column order is the statement's order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryRows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }
}

/// A statement to run through the executor.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub sql: String,
    /// Overrides the executor's retry count
    pub max_retries: Option<u32>,
    /// Overrides the executor's deadline
    pub timeout: Option<Duration>,
}

impl QueryRequest {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            max_retries: None,
            timeout: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone)]
pub struct QuerySuccess {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub elapsed: Duration,
}

impl QuerySuccess {
    /// Rows as `column -> value` mappings, keeping column order.
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect::<Map<String, Value>>()
            })
            .collect()
    }

    /// First column of the first row.
    pub fn scalar(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone)]
pub struct QueryFailure {
    pub kind: ErrorKind,
    /// Raw driver text, for operators
    pub detail: String,
    pub retriable: bool,
    pub elapsed: Duration,
}

impl QueryFailure {
    pub fn new(kind: ErrorKind, detail: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            kind,
            detail: detail.into(),
            retriable: kind.is_retriable(),
            elapsed,
        }
    }
}

/// Outcome of one executor invocation.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Success(QuerySuccess),
    Failure(QueryFailure),
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Success(_))
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            QueryOutcome::Success(success) => success.elapsed,
            QueryOutcome::Failure(failure) => failure.elapsed,
        }
    }

    /// Metric/log label: `success` or the failure kind.
    pub fn label(&self) -> &'static str {
        match self {
            QueryOutcome::Success(_) => "success",
            QueryOutcome::Failure(failure) => failure.kind.as_str(),
        }
    }
}
