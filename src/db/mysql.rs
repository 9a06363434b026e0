use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, ConnectOptions, Connection, MySql, Row as _, TypeInfo, ValueRef};

use crate::db::{Connector, DatabaseDriver, DbError, ExecOutcome};
use crate::models::{DbConfig, Row};
use crate::sql::Param;

/// Opens [`MySqlDriver`]s with a connect timeout.
pub struct MySqlConnector {
    pub connect_timeout: Duration,
}

impl MySqlConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Connector for MySqlConnector {
    async fn open(&self, config: &DbConfig) -> Result<Box<dyn DatabaseDriver>, DbError> {
        let mut driver = MySqlDriver::new(self.connect_timeout);
        driver.connect(config).await?;
        Ok(Box::new(driver))
    }
}

pub struct MySqlDriver {
    conn: Option<MySqlConnection>,
    timeout: Duration,
}

impl MySqlDriver {
    pub fn new(timeout: Duration) -> Self {
        Self {
            conn: None,
            timeout,
        }
    }

    fn conn(&mut self) -> Result<&mut MySqlConnection, DbError> {
        self.conn.as_mut().ok_or(DbError::NotConnected)
    }

    fn connect_options(config: &DbConfig) -> MySqlConnectOptions {
        let mut opts = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .charset("utf8mb4");

        let db = config.database.trim();
        if !db.is_empty() {
            opts = opts.database(db);
        }
        opts
    }
}

fn bind_all<'q>(sql: &'q str, params: &[Param]) -> Query<'q, MySql, MySqlArguments> {
    let mut query = sqlx::query(sql);
    for p in params {
        query = match p {
            Param::Unsigned(v) => query.bind(*v),
            Param::Float(v) => query.bind(*v),
            Param::Decimal(v) => query.bind(v.clone()),
            Param::Text(v) => query.bind(v.clone()),
        };
    }
    query
}

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    async fn connect(&mut self, config: &DbConfig) -> Result<(), DbError> {
        let opts = Self::connect_options(config);
        let conn = tokio::time::timeout(self.timeout, opts.connect())
            .await
            .map_err(|_| DbError::Timeout(self.timeout.as_secs()))??;

        tracing::debug!(host = %config.host, port = config.port, "mysql connection opened");
        self.conn = Some(conn);
        Ok(())
    }

    async fn fetch_all(&mut self, sql: &str, params: &[Param]) -> Result<Vec<Row>, DbError> {
        let conn = self.conn()?;

        // statements without placeholders go over the text protocol so that
        // SHOW / DESCRIBE, which cannot be prepared everywhere, work too
        let raw: Vec<MySqlRow> = if params.is_empty() {
            sqlx::Executor::fetch_all(&mut *conn, sql).await?
        } else {
            bind_all(sql, params).fetch_all(&mut *conn).await?
        };

        Ok(raw.iter().map(to_row).collect())
    }

    async fn execute(&mut self, sql: &str, params: &[Param]) -> Result<ExecOutcome, DbError> {
        let conn = self.conn()?;

        let result = if params.is_empty() {
            sqlx::Executor::execute(&mut *conn, sql).await?
        } else {
            bind_all(sql, params).execute(&mut *conn).await?
        };

        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_id(),
        })
    }

    async fn close(&mut self) -> Result<(), DbError> {
        match self.conn.take() {
            Some(conn) => Ok(conn.close().await?),
            None => Ok(()),
        }
    }
}

fn to_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| (col.name().to_string(), map_mysql_value(row, i)))
        .collect()
}

fn map_mysql_value(row: &MySqlRow, index: usize) -> serde_json::Value {
    let value_ref = match row.try_get_raw(index) {
        Ok(v) => v,
        Err(_) => return serde_json::Value::Null,
    };

    if value_ref.is_null() {
        return serde_json::Value::Null;
    }

    let type_info = value_ref.type_info();
    let type_name = type_info.name();

    match type_name {
        t if t.ends_with("UNSIGNED") => {
            let v: Option<u64> = row.try_get(index).ok();
            serde_json::json!(v)
        }
        "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            match row.try_get::<i64, _>(index) {
                Ok(v) => serde_json::json!(v),
                Err(_) => fallback(row, index, type_name),
            }
        }
        "FLOAT" | "DOUBLE" => {
            let v: Option<f64> = row.try_get(index).ok();
            serde_json::json!(v)
        }
        "DECIMAL" => {
            let v: Option<sqlx::types::BigDecimal> = row.try_get(index).ok();
            match v {
                Some(d) => serde_json::json!(d.to_string()),
                None => fallback(row, index, type_name),
            }
        }
        "DATETIME" | "TIMESTAMP" => {
            if let Ok(t) = row.try_get::<NaiveDateTime, _>(index) {
                return serde_json::json!(t.format("%Y-%m-%d %H:%M:%S").to_string());
            }
            if let Ok(t) = row.try_get::<DateTime<Utc>, _>(index) {
                return serde_json::json!(t.format("%Y-%m-%d %H:%M:%S").to_string());
            }
            // zero dates do not decode
            fallback(row, index, type_name)
        }
        "DATE" => match row.try_get::<NaiveDate, _>(index) {
            Ok(d) => serde_json::json!(d.format("%Y-%m-%d").to_string()),
            Err(_) => fallback(row, index, type_name),
        },
        "TIME" => match row.try_get::<NaiveTime, _>(index) {
            Ok(t) => serde_json::json!(t.format("%H:%M:%S").to_string()),
            Err(_) => fallback(row, index, type_name),
        },
        "JSON" => {
            let v: Option<serde_json::Value> = row.try_get(index).ok();
            v.unwrap_or_else(|| fallback(row, index, type_name))
        }
        _ => fallback(row, index, type_name),
    }
}

fn fallback(row: &MySqlRow, index: usize, type_name: &str) -> serde_json::Value {
    if let Ok(s) = row.try_get::<String, _>(index) {
        return serde_json::Value::String(s);
    }
    // read the bytes regardless of the declared type and keep them if they are text
    if let Ok(bytes) = row.try_get_unchecked::<Vec<u8>, _>(index) {
        if let Ok(s) = String::from_utf8(bytes) {
            return serde_json::Value::String(s);
        }
    }
    serde_json::Value::String(format!("<{}>", type_name))
}
