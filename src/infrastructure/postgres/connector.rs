//! sqlx-backed PostgreSQL connector.

use async_trait::async_trait;
use sqlx::postgres::{PgColumn, PgConnectOptions, PgConnection};
use sqlx::{Column, Connection, Executor, Row, Statement};

use crate::config::DatabaseConfig;
use crate::domain::pool::{Connector, DbConnection};
use crate::domain::query::{DbError, ErrorCategory, Phase, QueryRows};

use super::rows::row_values;

/// Opens PostgreSQL connections for the pool.
pub struct PgConnector {
    options: PgConnectOptions,
    target: String,
}

impl PgConnector {
    pub fn new(config: &DatabaseConfig, application_name: &str) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.username)
            .password(&config.password)
            .application_name(application_name)
            // Server-side deadline, so the driver itself aborts overlong statements
            .options([(
                "statement_timeout",
                format!("{}s", config.query_timeout_seconds),
            )]);

        Self {
            options,
            target: config.target(),
        }
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self) -> Result<Box<dyn DbConnection>, DbError> {
        let conn = PgConnection::connect_with(&self.options)
            .await
            .map_err(|e| map_sqlx_error(Phase::Connect, e))?;
        Ok(Box::new(PgSession { conn }))
    }

    fn target(&self) -> String {
        self.target.clone()
    }
}

struct PgSession {
    conn: PgConnection,
}

#[async_trait]
impl DbConnection for PgSession {
    async fn query(&mut self, sql: &str) -> Result<QueryRows, DbError> {
        let rows = sqlx::query(sql)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| map_sqlx_error(Phase::Query, e))?;

        let columns = match rows.first() {
            Some(row) => column_names(row.columns()),
            None => {
                // No rows to read names from; describe the statement instead
                let statement = (&mut self.conn)
                    .prepare(sql)
                    .await
                    .map_err(|e| map_sqlx_error(Phase::Query, e))?;
                column_names(statement.columns())
            }
        };

        Ok(QueryRows::new(columns, rows.iter().map(row_values).collect()))
    }

    async fn ping(&mut self) -> Result<(), DbError> {
        self.conn
            .ping()
            .await
            .map_err(|e| map_sqlx_error(Phase::Query, e))
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.conn.close().await {
            tracing::debug!(error = %e, "Error while closing PostgreSQL connection");
        }
    }
}

fn column_names(columns: &[PgColumn]) -> Vec<String> {
    columns.iter().map(|c| c.name().to_string()).collect()
}

/// Convert a sqlx error by variant. Message text is kept only as detail.
pub(crate) fn map_sqlx_error(phase: Phase, error: sqlx::Error) -> DbError {
    let category = match &error {
        sqlx::Error::Io(_) => ErrorCategory::Io,
        sqlx::Error::Tls(_) => ErrorCategory::Tls,
        sqlx::Error::Protocol(_) => ErrorCategory::Protocol,
        sqlx::Error::Configuration(_) => ErrorCategory::Configuration,
        sqlx::Error::Database(db) => ErrorCategory::Database {
            code: db.code().map(|code| code.into_owned()),
        },
        sqlx::Error::PoolTimedOut => ErrorCategory::PoolTimedOut,
        sqlx::Error::PoolClosed => ErrorCategory::PoolClosed,
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::TypeNotFound { .. } => ErrorCategory::Decode,
        _ => ErrorCategory::Other,
    };

    DbError::new(phase, category, error.to_string())
}
