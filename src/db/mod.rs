use async_trait::async_trait;
use thiserror::Error;

use crate::models::{DbConfig, Row};
use crate::sql::{Param, Statement};

pub mod introspect;
pub mod mysql;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("not connected")]
    NotConnected,
    #[error("connection timed out after {0}s")]
    Timeout(u64),
    #[error("{0}")]
    Engine(String),
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db) => DbError::Engine(db.message().to_string()),
            other => DbError::Engine(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    pub last_insert_id: u64,
}

/// One live connection, owned by one request.
#[async_trait]
pub trait DatabaseDriver: Send {
    async fn connect(&mut self, config: &DbConfig) -> Result<(), DbError>;
    async fn fetch_all(&mut self, sql: &str, params: &[Param]) -> Result<Vec<Row>, DbError>;
    async fn execute(&mut self, sql: &str, params: &[Param]) -> Result<ExecOutcome, DbError>;
    async fn close(&mut self) -> Result<(), DbError>;

    async fn fetch(&mut self, stmt: &Statement) -> Result<Vec<Row>, DbError> {
        tracing::debug!(sql = %stmt.sql, params = stmt.params.len(), "fetch");
        self.fetch_all(&stmt.sql, &stmt.params).await
    }

    async fn run(&mut self, stmt: &Statement) -> Result<ExecOutcome, DbError> {
        tracing::debug!(sql = %stmt.sql, params = stmt.params.len(), "execute");
        self.execute(&stmt.sql, &stmt.params).await
    }
}

/// Opens a fresh connection per call. Nothing is pooled: the next request
/// may carry different credentials.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self, config: &DbConfig) -> Result<Box<dyn DatabaseDriver>, DbError>;
}
