use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

pub mod column_type;
pub mod request;

pub use column_type::{classify, DefaultValue, SemanticType};

use crate::token::Token;

const KEY_HOST: &str = "mysql_host";
const KEY_USER: &str = "mysql_user";
const KEY_PASSWORD: &str = "mysql_password";
const KEY_DATABASE: &str = "mysql_database";
const KEY_PORT: &str = "mysql_port";

/// Credentials for one MySQL server. Never stored server-side: they travel
/// inside the session token and live for a single request.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DbConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u16,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("port", &self.port)
            .finish()
    }
}

impl DbConfig {
    /// Reads the settings a successful connect stored in the token.
    /// Returns `None` when the token carries no usable host.
    pub fn from_token(token: &Token) -> Option<Self> {
        let text = |key: &str| -> String {
            match token.data.get(key) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => String::new(),
            }
        };

        let host = text(KEY_HOST);
        if host.is_empty() {
            return None;
        }

        let port = match token.data.get(KEY_PORT) {
            Some(Value::Number(n)) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        }?;

        Some(Self {
            host,
            user: text(KEY_USER),
            password: text(KEY_PASSWORD),
            database: text(KEY_DATABASE),
            port,
        })
    }

    pub fn write_to(&self, data: &mut Map<String, Value>) {
        data.insert(KEY_HOST.to_string(), Value::from(self.host.clone()));
        data.insert(KEY_USER.to_string(), Value::from(self.user.clone()));
        data.insert(KEY_PASSWORD.to_string(), Value::from(self.password.clone()));
        data.insert(KEY_DATABASE.to_string(), Value::from(self.database.clone()));
        data.insert(KEY_PORT.to_string(), Value::from(self.port));
    }

    /// Same credentials, default schema switched to `database`.
    pub fn for_database(&self, database: &str) -> Self {
        Self {
            database: database.to_string(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    None,
    Primary,
    Unique,
    Multi,
}

impl KeyKind {
    /// Parses the `Key` column of `DESCRIBE`.
    pub fn from_describe(key: &str) -> Self {
        match key {
            "PRI" => KeyKind::Primary,
            "UNI" => KeyKind::Unique,
            "MUL" => KeyKind::Multi,
            _ => KeyKind::None,
        }
    }
}

/// One row of `DESCRIBE db.table`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescriptor {
    pub field: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub nullable: bool,
    pub key: KeyKind,
    pub default: Option<String>,
    pub extra: String,
}

impl ColumnDescriptor {
    pub fn semantic_type(&self) -> SemanticType {
        classify(&self.column_type).0
    }

    pub fn is_primary(&self) -> bool {
        self.key == KeyKind::Primary
    }

    pub fn is_auto_increment(&self) -> bool {
        self.extra.eq_ignore_ascii_case("auto_increment")
    }

    /// The default as shown to an operator: `NULL`, or quoted for string columns.
    pub fn display_default(&self) -> String {
        match &self.default {
            None => "NULL".to_string(),
            Some(d) if self.semantic_type() == SemanticType::String => format!("'{}'", d),
            Some(d) => d.clone(),
        }
    }
}

/// The single row-identity policy: the first primary key column, otherwise the
/// first column in introspected order.
pub fn primary_key(columns: &[ColumnDescriptor]) -> Option<&ColumnDescriptor> {
    columns
        .iter()
        .find(|c| c.is_primary())
        .or_else(|| columns.first())
}

/// A result row as an ordered list of (column name, value) pairs.
///
/// Order follows the statement's result columns, which for `SELECT *` is the
/// table's natural column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: Value) {
        self.values.push((column.into(), value));
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    /// The value rendered as text; `None` for SQL NULL or a missing column.
    pub fn get_text(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn first(&self) -> Option<&Value> {
        self.values.first().map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, v)| (name.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// One row of `SHOW INDEX`, reduced to what index resolution needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub key_name: String,
    pub column_name: String,
    pub non_unique: bool,
}

impl IndexEntry {
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            key_name: row.get_text("Key_name")?,
            column_name: row.get_text("Column_name")?,
            non_unique: row.get_text("Non_unique").as_deref() != Some("0"),
        })
    }
}

/// One page of `select_rows`.
#[derive(Debug, Clone, Serialize)]
pub struct RowPage {
    pub columns: Vec<String>,
    pub primary_key: String,
    pub rows: Vec<Row>,
    /// The executed statement with bound values spliced in, for display only.
    pub sql: String,
    pub limit: u64,
    pub offset: u64,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_offset: Option<u64>,
    pub next_offset: Option<u64>,
}

/// Outcome of a mutating command, named after the row it touched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowOutcome {
    pub table: String,
    pub pk_column: String,
    pub pk_value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ack {
    pub ok: bool,
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }
}
