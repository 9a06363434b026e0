//! Request payloads for the `/mysql/*` handlers.
//!
//! Read handlers take these from the query string, mutating handlers from a
//! JSON body. Flags accept `1`/`0` as well as booleans so that links built by
//! a page template keep working.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => b,
        Raw::Int(i) => i != 0,
        Raw::Text(s) => matches!(s.trim(), "1" | "true" | "on" | "yes"),
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectRequest {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseQuery {
    pub database: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseNameRequest {
    pub database_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TableQuery {
    pub database: String,
    pub table: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateTableFormQuery {
    pub database: String,
    pub table_name: String,
    pub number_of_columns: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKey {
    #[default]
    #[serde(rename = "", alias = "NONE")]
    None,
    #[serde(rename = "PRIMARY")]
    Primary,
    #[serde(rename = "UNIQUE")]
    Unique,
    #[serde(rename = "INDEX")]
    Index,
}

/// One column of a `create_table` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSpec {
    pub field: String,
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(deserialize_with = "flag")]
    pub nullable: bool,
    pub key: ColumnKey,
    /// Empty means "use the type's default".
    pub default: String,
    pub extra: String,
}

impl ColumnSpec {
    pub fn is_auto_increment(&self) -> bool {
        self.extra.eq_ignore_ascii_case("auto_increment")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CreateTableRequest {
    pub database: String,
    pub table_name: String,
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DropTableRequest {
    pub database: String,
    pub table_name: String,
}

/// Alter request. Several action flags may be set; only the first in
/// priority order is honoured (see [`crate::sql::ddl::AlterAction`]).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlterTableRequest {
    pub database: String,
    pub table: String,
    #[serde(deserialize_with = "flag")]
    pub add_primary: bool,
    #[serde(deserialize_with = "flag")]
    pub drop_primary: bool,
    #[serde(deserialize_with = "flag")]
    pub add_unique: bool,
    #[serde(deserialize_with = "flag")]
    pub drop_unique: bool,
    #[serde(deserialize_with = "flag")]
    pub add_index: bool,
    #[serde(deserialize_with = "flag")]
    pub drop_index: bool,
    #[serde(deserialize_with = "flag")]
    pub add_first: bool,
    #[serde(deserialize_with = "flag")]
    pub add_after: bool,
    #[serde(deserialize_with = "flag")]
    pub change_column: bool,
    #[serde(deserialize_with = "flag")]
    pub drop_column: bool,
    pub column: String,
    pub new_column_name: String,
    pub new_column_type: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RenameTableRequest {
    pub database: String,
    pub table_name: String,
    pub new_table_name: String,
}

/// Filter, sort and pagination parameters of `select_rows`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SelectRequest {
    pub database: String,
    pub table: String,
    pub field1: String,
    #[serde(deserialize_with = "flag")]
    pub like1: bool,
    pub keyword1: String,
    #[serde(deserialize_with = "flag")]
    pub is_or: bool,
    pub field2: String,
    #[serde(deserialize_with = "flag")]
    pub like2: bool,
    pub keyword2: String,
    pub order_by: String,
    #[serde(deserialize_with = "flag")]
    pub is_asc: bool,
    /// Absent means the configured maximum.
    pub limit: Option<i64>,
    pub offset: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RowKeyQuery {
    pub database: String,
    pub table: String,
    pub pk: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InsertRowRequest {
    pub database: String,
    pub table: String,
    pub values: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdateRowRequest {
    pub database: String,
    pub table: String,
    pub pk: String,
    pub values: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_numbers_and_text() {
        let req: SelectRequest = serde_json::from_str(
            r#"{"database":"d","table":"t","like1":1,"is_or":"1","is_asc":true,"like2":"0"}"#,
        )
        .unwrap();
        assert!(req.like1);
        assert!(req.is_or);
        assert!(req.is_asc);
        assert!(!req.like2);
        assert_eq!(req.limit, None);
        assert_eq!(req.offset, 0);
    }

    #[test]
    fn column_key_parses_form_values() {
        let spec: ColumnSpec = serde_json::from_str(
            r#"{"field":"id","type":"int","key":"PRIMARY","extra":"AUTO_INCREMENT"}"#,
        )
        .unwrap();
        assert_eq!(spec.key, ColumnKey::Primary);
        assert!(spec.is_auto_increment());
        assert!(!spec.nullable);

        let spec: ColumnSpec = serde_json::from_str(r#"{"field":"n","key":""}"#).unwrap();
        assert_eq!(spec.key, ColumnKey::None);
    }
}
