use std::str::FromStr;

use bigdecimal::BigDecimal;

use super::ident::{self, quote_literal};
use super::{BuildError, Ident, Statement};
use crate::models::request::{AlterTableRequest, ColumnKey, ColumnSpec};
use crate::models::{classify, DefaultValue, IndexEntry, SemanticType};

const TABLE_OPTIONS: &str = "ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci";

pub fn create_database(name: &Ident) -> Statement {
    Statement::new(format!(
        "CREATE DATABASE {} DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci",
        name
    ))
}

pub fn drop_database(name: &Ident) -> Statement {
    Statement::new(format!("DROP DATABASE {}", name))
}

pub fn drop_table(database: &Ident, table: &Ident) -> Statement {
    Statement::new(format!("DROP TABLE {}.{}", database, table))
}

pub fn rename_table(database: &Ident, from: &Ident, to: &Ident) -> Statement {
    Statement::new(format!(
        "ALTER TABLE {db}.{} RENAME TO {db}.{}",
        from,
        to,
        db = database
    ))
}

/// Renders `DEFAULT …` for a column of `semantic` type. Numbers are checked
/// and left unquoted, strings are quoted; text, timestamp, binary and
/// unrecognised types get no clause.
fn default_clause(field: &str, semantic: SemanticType, value: &str) -> Result<String, BuildError> {
    let invalid = || BuildError::InvalidDefault {
        field: field.to_string(),
        value: value.to_string(),
    };

    match semantic {
        SemanticType::Integer => {
            let digits = value.strip_prefix('-').unwrap_or(value);
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            Ok(format!("DEFAULT {}", value))
        }
        SemanticType::Float | SemanticType::Decimal => {
            BigDecimal::from_str(value).map_err(|_| invalid())?;
            Ok(format!("DEFAULT {}", value))
        }
        SemanticType::String => Ok(format!("DEFAULT {}", quote_literal(value))),
        _ => Ok(String::new()),
    }
}

/// The type's own default clause, used for columns added by `ALTER TABLE`.
fn type_default_clause(field: &str, column_type: &str) -> Result<String, BuildError> {
    let (semantic, default) = classify(column_type);
    match default.as_input() {
        Some(value) => default_clause(field, semantic, &value),
        None => Ok(String::new()),
    }
}

fn column_definition(spec: &ColumnSpec) -> Result<(Ident, String), BuildError> {
    let field = Ident::column(&spec.field)?;
    let column_type = ident::column_type(&spec.column_type)?;
    let (semantic, type_default) = classify(column_type);

    let default = if spec.key == ColumnKey::Primary && spec.is_auto_increment() {
        "AUTO_INCREMENT".to_string()
    } else if spec.default.is_empty() {
        match type_default {
            DefaultValue::Null => String::new(),
            other => default_clause(&spec.field, semantic, &other.as_input().unwrap_or_default())?,
        }
    } else {
        default_clause(&spec.field, semantic, &spec.default)?
    };

    let null = if spec.nullable { "NULL" } else { "NOT NULL" };

    let mut parts = vec![field.to_string(), column_type.to_string(), null.to_string()];
    if !default.is_empty() {
        parts.push(default);
    }
    Ok((field, parts.join(" ")))
}

fn column_list(columns: &[Ident]) -> String {
    columns
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builds `CREATE TABLE` from column specs. Primary key columns become one
/// `PRIMARY KEY(...)`; all unique-marked columns share one unique index and
/// all index-marked columns share one plain index, each named after the
/// table and its first column.
pub fn create_table(
    database: &Ident,
    table: &Ident,
    specs: &[ColumnSpec],
) -> Result<Statement, BuildError> {
    if specs.is_empty() {
        return Err(BuildError::NoColumns);
    }
    if specs.iter().filter(|s| s.is_auto_increment()).count() > 1 {
        return Err(BuildError::MultipleAutoIncrement);
    }

    let mut lines = Vec::with_capacity(specs.len() + 3);
    let mut primary = Vec::new();
    let mut unique = Vec::new();
    let mut index = Vec::new();

    for spec in specs {
        let (field, line) = column_definition(spec)?;
        lines.push(line);
        match spec.key {
            ColumnKey::Primary => primary.push(field),
            ColumnKey::Unique => unique.push(field),
            ColumnKey::Index => index.push(field),
            ColumnKey::None => {}
        }
    }

    if !primary.is_empty() {
        lines.push(format!("PRIMARY KEY ({})", column_list(&primary)));
    }
    if let Some(first) = unique.first() {
        let name = Ident::strict("index", &format!("{}_{}_unique", table.as_str(), first.as_str()))?;
        lines.push(format!("UNIQUE INDEX {} ({})", name, column_list(&unique)));
    }
    if let Some(first) = index.first() {
        let name = Ident::strict("index", &format!("{}_{}_index", table.as_str(), first.as_str()))?;
        lines.push(format!("INDEX {} ({})", name, column_list(&index)));
    }

    Ok(Statement::new(format!(
        "CREATE TABLE {}.{} (\n{}\n) {}",
        database,
        table,
        lines.join(",\n"),
        TABLE_OPTIONS
    )))
}

/// The one change an `ALTER TABLE` request performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterAction {
    AddPrimary { column: Ident },
    DropPrimary,
    AddUnique { column: Ident },
    DropUnique { column: Ident },
    AddIndex { column: Ident },
    DropIndex { column: Ident },
    AddFirst { name: Ident, column_type: String },
    AddAfter { name: Ident, column_type: String, after: Ident },
    Change { column: Ident, name: Ident, column_type: String },
    DropColumn { column: Ident },
}

impl AlterAction {
    /// Picks the first flagged action in priority order: primary, unique,
    /// index, add first, add after, change, drop. Further flags are ignored.
    pub fn from_request(req: &AlterTableRequest) -> Result<Self, BuildError> {
        let column = || Ident::column(&req.column);
        let new_name = || Ident::column(&req.new_column_name);
        let new_type = || ident::column_type(&req.new_column_type).map(str::to_string);

        if req.add_primary {
            Ok(AlterAction::AddPrimary { column: column()? })
        } else if req.drop_primary {
            Ok(AlterAction::DropPrimary)
        } else if req.add_unique {
            Ok(AlterAction::AddUnique { column: column()? })
        } else if req.drop_unique {
            Ok(AlterAction::DropUnique { column: column()? })
        } else if req.add_index {
            Ok(AlterAction::AddIndex { column: column()? })
        } else if req.drop_index {
            Ok(AlterAction::DropIndex { column: column()? })
        } else if req.add_first {
            Ok(AlterAction::AddFirst {
                name: new_name()?,
                column_type: new_type()?,
            })
        } else if req.add_after {
            Ok(AlterAction::AddAfter {
                name: new_name()?,
                column_type: new_type()?,
                after: column()?,
            })
        } else if req.change_column {
            Ok(AlterAction::Change {
                column: column()?,
                name: new_name()?,
                column_type: new_type()?,
            })
        } else if req.drop_column {
            Ok(AlterAction::DropColumn { column: column()? })
        } else {
            Err(BuildError::NoAlterAction)
        }
    }

    /// Whether building the statement needs `SHOW INDEX` output.
    pub fn needs_indexes(&self) -> bool {
        matches!(self, AlterAction::DropUnique { .. } | AlterAction::DropIndex { .. })
    }
}

fn index_name(indexes: &[IndexEntry], column: &Ident) -> Result<Ident, BuildError> {
    let entry = indexes
        .iter()
        .find(|i| i.column_name == column.as_str())
        .ok_or_else(|| BuildError::IndexNotFound(column.as_str().to_string()))?;
    Ident::strict("index", &entry.key_name)
}

pub fn alter_table(
    database: &Ident,
    table: &Ident,
    action: &AlterAction,
    indexes: &[IndexEntry],
) -> Result<Statement, BuildError> {
    let clause = match action {
        AlterAction::AddPrimary { column } => format!("ADD PRIMARY KEY({})", column),
        AlterAction::DropPrimary => "DROP PRIMARY KEY".to_string(),
        AlterAction::AddUnique { column } => format!("ADD UNIQUE INDEX ({})", column),
        AlterAction::DropUnique { column } | AlterAction::DropIndex { column } => {
            format!("DROP INDEX {}", index_name(indexes, column)?)
        }
        AlterAction::AddIndex { column } => format!("ADD INDEX ({})", column),
        AlterAction::AddFirst { name, column_type } => {
            let default = type_default_clause(name.as_str(), column_type)?;
            join_words(&[&format!("ADD {} {} NOT NULL", name, column_type), &default, "FIRST"])
        }
        AlterAction::AddAfter {
            name,
            column_type,
            after,
        } => {
            let default = type_default_clause(name.as_str(), column_type)?;
            join_words(&[
                &format!("ADD {} {} NOT NULL", name, column_type),
                &default,
                &format!("AFTER {}", after),
            ])
        }
        AlterAction::Change {
            column,
            name,
            column_type,
        } => {
            let default = type_default_clause(name.as_str(), column_type)?;
            join_words(&[&format!("CHANGE {} {} {} NOT NULL", column, name, column_type), &default])
        }
        AlterAction::DropColumn { column } => format!("DROP {}", column),
    };

    Ok(Statement::new(format!("ALTER TABLE {}.{} {}", database, table, clause)))
}

fn join_words(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> Ident {
        Ident::column(s).unwrap()
    }

    fn spec(field: &str, ty: &str, key: ColumnKey, extra: &str) -> ColumnSpec {
        ColumnSpec {
            field: field.into(),
            column_type: ty.into(),
            key,
            extra: extra.into(),
            ..Default::default()
        }
    }

    #[test]
    fn create_and_drop_database() {
        assert_eq!(
            create_database(&id("shop")).sql,
            "CREATE DATABASE `shop` DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_ci"
        );
        assert_eq!(drop_database(&id("shop")).sql, "DROP DATABASE `shop`");
        assert_eq!(drop_table(&id("shop"), &id("t")).sql, "DROP TABLE `shop`.`t`");
        assert_eq!(
            rename_table(&id("shop"), &id("a"), &id("b")).sql,
            "ALTER TABLE `shop`.`a` RENAME TO `shop`.`b`"
        );
    }

    #[test]
    fn create_table_renders_keys_and_defaults() {
        let mut name = spec("name", "varchar(50)", ColumnKey::Unique, "");
        name.default = "anon".into();
        let mut note = spec("note", "text", ColumnKey::None, "");
        note.nullable = true;
        let specs = vec![
            spec("id", "int", ColumnKey::Primary, "AUTO_INCREMENT"),
            name,
            spec("flag", "char(1)", ColumnKey::Index, ""),
            spec("qty", "int", ColumnKey::Index, ""),
            note,
        ];
        let stmt = create_table(&id("d"), &id("items"), &specs).unwrap();
        assert_eq!(
            stmt.sql,
            "CREATE TABLE `d`.`items` (\n\
             `id` int NOT NULL AUTO_INCREMENT,\n\
             `name` varchar(50) NOT NULL DEFAULT 'anon',\n\
             `flag` char(1) NOT NULL DEFAULT 'N',\n\
             `qty` int NOT NULL DEFAULT 0,\n\
             `note` text NULL,\n\
             PRIMARY KEY (`id`),\n\
             UNIQUE INDEX `items_name_unique` (`name`),\n\
             INDEX `items_flag_index` (`flag`, `qty`)\n\
             ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_unicode_ci"
        );
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn two_auto_increments_are_rejected() {
        let specs = vec![
            spec("a", "int", ColumnKey::Primary, "AUTO_INCREMENT"),
            spec("b", "int", ColumnKey::None, "auto_increment"),
        ];
        assert_eq!(
            create_table(&id("d"), &id("t"), &specs),
            Err(BuildError::MultipleAutoIncrement)
        );
    }

    #[test]
    fn create_table_validates_everything_it_splices() {
        assert_eq!(create_table(&id("d"), &id("t"), &[]), Err(BuildError::NoColumns));

        let bad_field = vec![spec("a;b", "int", ColumnKey::None, "")];
        assert!(matches!(
            create_table(&id("d"), &id("t"), &bad_field),
            Err(BuildError::InvalidIdentifier { .. })
        ));

        let bad_type = vec![spec("a", "int); DROP TABLE x; --", ColumnKey::None, "")];
        assert!(matches!(
            create_table(&id("d"), &id("t"), &bad_type),
            Err(BuildError::InvalidColumnType(_))
        ));

        let mut bad_default = spec("a", "int", ColumnKey::None, "");
        bad_default.default = "1 OR 1".into();
        assert!(matches!(
            create_table(&id("d"), &id("t"), &[bad_default]),
            Err(BuildError::InvalidDefault { .. })
        ));
    }

    #[test]
    fn string_defaults_are_escaped() {
        let mut s = spec("a", "varchar(10)", ColumnKey::None, "");
        s.default = "o'neil".into();
        let stmt = create_table(&id("d"), &id("t"), &[s]).unwrap();
        assert!(stmt.sql.contains("DEFAULT 'o''neil'"));
    }

    fn alter(f: impl FnOnce(&mut AlterTableRequest)) -> AlterTableRequest {
        let mut req = AlterTableRequest {
            database: "d".into(),
            table: "t".into(),
            column: "name".into(),
            new_column_name: "title".into(),
            new_column_type: "varchar(50)".into(),
            ..Default::default()
        };
        f(&mut req);
        req
    }

    fn alter_sql(req: &AlterTableRequest, indexes: &[IndexEntry]) -> Result<String, BuildError> {
        let action = AlterAction::from_request(req)?;
        alter_table(&id("d"), &id("t"), &action, indexes).map(|s| s.sql)
    }

    #[test]
    fn alter_actions() {
        assert_eq!(
            alter_sql(&alter(|r| r.add_primary = true), &[]).unwrap(),
            "ALTER TABLE `d`.`t` ADD PRIMARY KEY(`name`)"
        );
        assert_eq!(
            alter_sql(&alter(|r| r.drop_primary = true), &[]).unwrap(),
            "ALTER TABLE `d`.`t` DROP PRIMARY KEY"
        );
        assert_eq!(
            alter_sql(&alter(|r| r.add_unique = true), &[]).unwrap(),
            "ALTER TABLE `d`.`t` ADD UNIQUE INDEX (`name`)"
        );
        assert_eq!(
            alter_sql(&alter(|r| r.add_index = true), &[]).unwrap(),
            "ALTER TABLE `d`.`t` ADD INDEX (`name`)"
        );
        assert_eq!(
            alter_sql(&alter(|r| r.add_first = true), &[]).unwrap(),
            "ALTER TABLE `d`.`t` ADD `title` varchar(50) NOT NULL DEFAULT '' FIRST"
        );
        assert_eq!(
            alter_sql(&alter(|r| r.add_after = true), &[]).unwrap(),
            "ALTER TABLE `d`.`t` ADD `title` varchar(50) NOT NULL DEFAULT '' AFTER `name`"
        );
        assert_eq!(
            alter_sql(
                &alter(|r| {
                    r.change_column = true;
                    r.new_column_type = "text".into();
                }),
                &[]
            )
            .unwrap(),
            "ALTER TABLE `d`.`t` CHANGE `name` `title` text NOT NULL"
        );
        assert_eq!(
            alter_sql(&alter(|r| r.drop_column = true), &[]).unwrap(),
            "ALTER TABLE `d`.`t` DROP `name`"
        );
    }

    #[test]
    fn drop_index_resolves_key_name_from_introspection() {
        let indexes = vec![
            IndexEntry {
                key_name: "PRIMARY".into(),
                column_name: "id".into(),
                non_unique: false,
            },
            IndexEntry {
                key_name: "t_name_unique".into(),
                column_name: "name".into(),
                non_unique: false,
            },
        ];
        assert_eq!(
            alter_sql(&alter(|r| r.drop_unique = true), &indexes).unwrap(),
            "ALTER TABLE `d`.`t` DROP INDEX `t_name_unique`"
        );
        assert_eq!(
            alter_sql(&alter(|r| r.drop_index = true), &indexes[..1]),
            Err(BuildError::IndexNotFound("name".into()))
        );
    }

    #[test]
    fn only_the_highest_priority_action_runs() {
        let req = alter(|r| {
            r.drop_column = true;
            r.add_index = true;
            r.add_first = true;
        });
        assert_eq!(
            AlterAction::from_request(&req).unwrap(),
            AlterAction::AddIndex { column: id("name") }
        );
        assert_eq!(
            AlterAction::from_request(&alter(|_| {})),
            Err(BuildError::NoAlterAction)
        );
    }

    #[test]
    fn alter_validates_names_and_types() {
        assert!(AlterAction::from_request(&alter(|r| {
            r.drop_column = true;
            r.column = "x`; DROP".into();
        }))
        .is_err());
        assert!(AlterAction::from_request(&alter(|r| {
            r.add_first = true;
            r.new_column_type = "int; --".into();
        }))
        .is_err());
    }
}
