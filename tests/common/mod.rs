#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use myadmin::config::AppConfig;
use myadmin::db::{Connector, DatabaseDriver, DbError, ExecOutcome};
use myadmin::models::{DbConfig, Row};
use myadmin::sql::Param;
use myadmin::AppState;

pub const SECRET: &str = "__test_secret__";

#[derive(Clone)]
pub enum Reply {
    Rows(Vec<Row>),
    Exec(ExecOutcome),
    Fail(String),
}

type Responder = Arc<dyn Fn(&[Param]) -> Reply + Send + Sync>;

#[derive(Default)]
struct Shared {
    handlers: Vec<(String, Responder)>,
    log: Vec<(String, Vec<Param>)>,
    opened: Vec<DbConfig>,
    closed: usize,
    refuse_connect: Option<String>,
}

/// A fake MySQL server. Statements are answered by the first handler whose
/// prefix matches; unmatched reads return no rows and unmatched writes
/// affect none.
#[derive(Clone, Default)]
pub struct Script {
    shared: Arc<Mutex<Shared>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, prefix: &str, reply: Reply) -> &Self {
        self.on_with(prefix, move |_| reply.clone())
    }

    pub fn on_with(
        &self,
        prefix: &str,
        f: impl Fn(&[Param]) -> Reply + Send + Sync + 'static,
    ) -> &Self {
        self.shared
            .lock()
            .unwrap()
            .handlers
            .push((prefix.to_string(), Arc::new(f)));
        self
    }

    pub fn refuse_connect(&self, message: &str) {
        self.shared.lock().unwrap().refuse_connect = Some(message.to_string());
    }

    pub fn statements(&self) -> Vec<String> {
        self.shared
            .lock()
            .unwrap()
            .log
            .iter()
            .map(|(sql, _)| sql.clone())
            .collect()
    }

    pub fn log(&self) -> Vec<(String, Vec<Param>)> {
        self.shared.lock().unwrap().log.clone()
    }

    pub fn opened(&self) -> Vec<DbConfig> {
        self.shared.lock().unwrap().opened.clone()
    }

    pub fn closed(&self) -> usize {
        self.shared.lock().unwrap().closed
    }

    fn answer(&self, sql: &str, params: &[Param]) -> Option<Reply> {
        let responder = {
            let mut shared = self.shared.lock().unwrap();
            shared.log.push((sql.to_string(), params.to_vec()));
            shared
                .handlers
                .iter()
                .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
                .map(|(_, r)| r.clone())
        };
        responder.map(|r| r(params))
    }
}

pub struct ScriptedDriver {
    script: Script,
}

#[async_trait]
impl DatabaseDriver for ScriptedDriver {
    async fn connect(&mut self, config: &DbConfig) -> Result<(), DbError> {
        let mut shared = self.script.shared.lock().unwrap();
        if let Some(message) = &shared.refuse_connect {
            return Err(DbError::Engine(message.clone()));
        }
        shared.opened.push(config.clone());
        Ok(())
    }

    async fn fetch_all(&mut self, sql: &str, params: &[Param]) -> Result<Vec<Row>, DbError> {
        match self.script.answer(sql, params) {
            Some(Reply::Rows(rows)) => Ok(rows),
            Some(Reply::Fail(message)) => Err(DbError::Engine(message)),
            Some(Reply::Exec(_)) | None => Ok(Vec::new()),
        }
    }

    async fn execute(&mut self, sql: &str, params: &[Param]) -> Result<ExecOutcome, DbError> {
        match self.script.answer(sql, params) {
            Some(Reply::Exec(outcome)) => Ok(outcome),
            Some(Reply::Fail(message)) => Err(DbError::Engine(message)),
            Some(Reply::Rows(_)) | None => Ok(ExecOutcome::default()),
        }
    }

    async fn close(&mut self) -> Result<(), DbError> {
        self.script.shared.lock().unwrap().closed += 1;
        Ok(())
    }
}

pub struct ScriptedConnector {
    pub script: Script,
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn open(&self, config: &DbConfig) -> Result<Box<dyn DatabaseDriver>, DbError> {
        let mut driver = ScriptedDriver {
            script: self.script.clone(),
        };
        driver.connect(config).await?;
        Ok(Box::new(driver))
    }
}

pub fn state(script: &Script) -> AppState {
    AppState::with_connector(
        AppConfig::with_secret(SECRET),
        Arc::new(ScriptedConnector {
            script: script.clone(),
        }),
    )
}

pub fn db_config() -> DbConfig {
    DbConfig {
        host: "127.0.0.1".into(),
        user: "u".into(),
        password: "p".into(),
        database: "d".into(),
        port: 3306,
    }
}

pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
}

pub fn rows(list: &[&[(&str, Value)]]) -> Reply {
    Reply::Rows(list.iter().map(|pairs| row(pairs)).collect())
}

pub fn exec(rows_affected: u64, last_insert_id: u64) -> Reply {
    Reply::Exec(ExecOutcome {
        rows_affected,
        last_insert_id,
    })
}

/// `DESCRIBE` output for (field, type, key, extra) tuples.
pub fn describe(columns: &[(&str, &str, &str, &str)]) -> Reply {
    Reply::Rows(
        columns
            .iter()
            .map(|(field, ty, key, extra)| {
                row(&[
                    ("Field", json!(field)),
                    ("Type", json!(ty)),
                    ("Null", json!("NO")),
                    ("Key", json!(key)),
                    ("Default", Value::Null),
                    ("Extra", json!(extra)),
                ])
            })
            .collect(),
    )
}

/// The `people` table: `id` auto-increment primary key and `name`.
pub fn people(script: &Script) {
    script.on(
        "DESCRIBE `d`.`people`",
        describe(&[
            ("id", "int(11)", "PRI", "auto_increment"),
            ("name", "varchar(50)", "", ""),
        ]),
    );
}
