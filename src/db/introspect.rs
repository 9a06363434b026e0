//! Schema reads: `DESCRIBE`, `SHOW DATABASES`, `SHOW TABLES`, `SHOW INDEX`
//! and `SHOW CREATE TABLE`. Results are read fresh on every call.

use crate::db::{DatabaseDriver, DbError};
use crate::models::{ColumnDescriptor, IndexEntry, KeyKind, Row};
use crate::sql::{Ident, Statement};

/// Databases hidden from `list_databases`.
const SYSTEM_DATABASES: &[&str] = &[
    "information_schema",
    "mysql",
    "performance_schema",
    "sys",
    "test",
];

fn describe_row(row: &Row) -> Option<ColumnDescriptor> {
    Some(ColumnDescriptor {
        field: row.get_text("Field")?,
        column_type: row.get_text("Type").unwrap_or_default(),
        nullable: row.get_text("Null").as_deref() == Some("YES"),
        key: KeyKind::from_describe(&row.get_text("Key").unwrap_or_default()),
        default: row.get_text("Default"),
        extra: row.get_text("Extra").unwrap_or_default(),
    })
}

/// Columns of `database.table` in their declared order.
pub async fn describe(
    db: &mut dyn DatabaseDriver,
    database: &Ident,
    table: &Ident,
) -> Result<Vec<ColumnDescriptor>, DbError> {
    let rows = db
        .fetch(&Statement::new(format!("DESCRIBE {}.{}", database, table)))
        .await?;
    Ok(rows.iter().filter_map(describe_row).collect())
}

pub async fn list_databases(db: &mut dyn DatabaseDriver) -> Result<Vec<String>, DbError> {
    let rows = db.fetch(&Statement::new("SHOW DATABASES")).await?;
    let mut names: Vec<String> = rows
        .iter()
        .filter_map(first_text)
        .filter(|name| !SYSTEM_DATABASES.contains(&name.as_str()))
        .collect();
    names.sort();
    Ok(names)
}

pub async fn list_tables(db: &mut dyn DatabaseDriver, database: &Ident) -> Result<Vec<String>, DbError> {
    let rows = db
        .fetch(&Statement::new(format!("SHOW TABLES IN {}", database)))
        .await?;
    Ok(rows.iter().filter_map(first_text).collect())
}

fn first_text(row: &Row) -> Option<String> {
    match row.first()? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

pub async fn show_create_table(
    db: &mut dyn DatabaseDriver,
    database: &Ident,
    table: &Ident,
) -> Result<Vec<Row>, DbError> {
    db.fetch(&Statement::new(format!("SHOW CREATE TABLE {}.{}", database, table)))
        .await
}

pub async fn show_index(
    db: &mut dyn DatabaseDriver,
    database: &Ident,
    table: &Ident,
) -> Result<Vec<Row>, DbError> {
    db.fetch(&Statement::new(format!("SHOW INDEX FROM {}.{}", database, table)))
        .await
}

pub async fn index_entries(
    db: &mut dyn DatabaseDriver,
    database: &Ident,
    table: &Ident,
) -> Result<Vec<IndexEntry>, DbError> {
    let rows = show_index(db, database, table).await?;
    Ok(rows.iter().filter_map(IndexEntry::from_row).collect())
}

/// Drops the `AUTO_INCREMENT=n` table option so a dump does not carry the
/// source server's counter.
pub fn strip_auto_increment(ddl: &str) -> String {
    ddl.split(' ')
        .filter(|token| !token.starts_with("AUTO_INCREMENT="))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `SHOW CREATE TABLE` text ready for a dump, or `None` when the server
/// returned no DDL.
pub async fn show_create_table_for_dump(
    db: &mut dyn DatabaseDriver,
    database: &Ident,
    table: &Ident,
) -> Result<Option<String>, DbError> {
    let rows = show_create_table(db, database, table).await?;
    Ok(rows
        .first()
        .and_then(|row| row.get_text("Create Table"))
        .map(|ddl| strip_auto_increment(&ddl)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn auto_increment_counter_is_removed() {
        let ddl = "CREATE TABLE `t` (\n  `id` int NOT NULL AUTO_INCREMENT,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB AUTO_INCREMENT=42 DEFAULT CHARSET=utf8mb4";
        assert_eq!(
            strip_auto_increment(ddl),
            "CREATE TABLE `t` (\n  `id` int NOT NULL AUTO_INCREMENT,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"
        );
    }

    #[test]
    fn describe_rows_normalise() {
        let row: Row = vec![
            ("Field", json!("id")),
            ("Type", json!("int(11)")),
            ("Null", json!("NO")),
            ("Key", json!("PRI")),
            ("Default", json!(null)),
            ("Extra", json!("auto_increment")),
        ]
        .into_iter()
        .collect();
        let col = describe_row(&row).unwrap();
        assert_eq!(col.field, "id");
        assert!(!col.nullable);
        assert!(col.is_primary());
        assert!(col.is_auto_increment());
        assert_eq!(col.default, None);
    }
}
