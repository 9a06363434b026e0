use serde::Serialize;

use super::schema_pair;
use crate::db::{introspect, DatabaseDriver};
use crate::error::{AppError, AppResult};
use crate::models::column_type::OFFERED_TYPES;
use crate::models::request::{
    AlterTableRequest, ColumnSpec, CreateTableFormQuery, CreateTableRequest, DatabaseQuery,
    DropTableRequest, RenameTableRequest, TableQuery,
};
use crate::models::{Ack, ColumnDescriptor, DbConfig, KeyKind, Row};
use crate::server::gate::RequestConnection;
use crate::sql::ddl::{self, AlterAction};
use crate::sql::Ident;
use crate::state::AppState;

/// MySQL's hard limit on columns per table.
const MAX_COLUMNS: u32 = 4096;

pub async fn show_tables(
    state: &AppState,
    config: &DbConfig,
    query: DatabaseQuery,
) -> AppResult<Vec<String>> {
    let database = Ident::schema("database", &query.database)?;

    let mut conn = RequestConnection::open(state, &config.for_database(database.as_str())).await?;
    let result = introspect::list_tables(conn.db(), &database).await.map_err(Into::into);
    conn.finish(result).await
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTableForm {
    pub database: String,
    pub table_name: String,
    pub columns: Vec<ColumnSpec>,
    pub types: &'static [&'static str],
}

/// Blank column specs for a new table. Needs no connection.
pub fn create_table_form(query: CreateTableFormQuery) -> AppResult<CreateTableForm> {
    Ident::strict("database", &query.database)?;
    Ident::strict("table", &query.table_name)?;
    if query.number_of_columns < 1 || query.number_of_columns > MAX_COLUMNS {
        return Err(AppError::validation(format!(
            "number_of_columns must be between 1 and {}",
            MAX_COLUMNS
        )));
    }

    Ok(CreateTableForm {
        database: query.database,
        table_name: query.table_name,
        columns: vec![ColumnSpec::default(); query.number_of_columns as usize],
        types: OFFERED_TYPES,
    })
}

pub async fn create_table(
    state: &AppState,
    config: &DbConfig,
    req: CreateTableRequest,
) -> AppResult<Ack> {
    let database = Ident::schema("database", &req.database)?;
    let table = Ident::strict("table", &req.table_name)?;
    let stmt = ddl::create_table(&database, &table, &req.columns)?;

    let mut conn = RequestConnection::open(state, &config.for_database(database.as_str())).await?;
    let result = conn.db().run(&stmt).await;
    conn.finish(result.map_err(Into::into)).await?;

    tracing::info!(%database, %table, columns = req.columns.len(), "table created");
    Ok(Ack::new(format!("create table {}", table)))
}

pub async fn drop_table(state: &AppState, config: &DbConfig, req: DropTableRequest) -> AppResult<Ack> {
    let (database, table) = schema_pair(&req.database, &req.table_name)?;

    let mut conn = RequestConnection::open(state, &config.for_database(database.as_str())).await?;
    let result = conn.db().run(&ddl::drop_table(&database, &table)).await;
    conn.finish(result.map_err(Into::into)).await?;

    tracing::info!(%database, %table, "table dropped");
    Ok(Ack::new(format!("drop table {}", table)))
}

/// A described column with the key actions available on it.
#[derive(Debug, Clone, Serialize)]
pub struct AlterColumn {
    #[serde(flatten)]
    pub column: ColumnDescriptor,
    pub display_default: String,
    pub actions: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlterTableForm {
    pub database: String,
    pub table: String,
    pub columns: Vec<AlterColumn>,
    pub types: &'static [&'static str],
}

fn key_actions(column: &ColumnDescriptor) -> Vec<&'static str> {
    vec![
        if column.key == KeyKind::Primary { "drop_primary" } else { "add_primary" },
        if column.key == KeyKind::Unique { "drop_unique" } else { "add_unique" },
        if column.key == KeyKind::Multi { "drop_index" } else { "add_index" },
    ]
}

pub async fn alter_table_form(
    state: &AppState,
    config: &DbConfig,
    query: TableQuery,
) -> AppResult<AlterTableForm> {
    let (database, table) = schema_pair(&query.database, &query.table)?;

    let mut conn = RequestConnection::open(state, &config.for_database(database.as_str())).await?;
    let result = introspect::describe(conn.db(), &database, &table).await;
    let columns = conn.finish(result.map_err(Into::into)).await?;

    Ok(AlterTableForm {
        database: query.database,
        table: query.table,
        columns: columns
            .into_iter()
            .map(|column| AlterColumn {
                actions: key_actions(&column),
                display_default: column.display_default(),
                column,
            })
            .collect(),
        types: OFFERED_TYPES,
    })
}

pub async fn alter_table(state: &AppState, config: &DbConfig, req: AlterTableRequest) -> AppResult<Ack> {
    let (database, table) = schema_pair(&req.database, &req.table)?;
    let action = AlterAction::from_request(&req)?;

    let mut conn = RequestConnection::open(state, &config.for_database(database.as_str())).await?;
    let result = apply_alter(conn.db(), &database, &table, &action).await;
    conn.finish(result).await?;

    tracing::info!(%database, %table, ?action, "table altered");
    Ok(Ack::new(format!("alter table {}", table)))
}

async fn apply_alter(
    db: &mut dyn DatabaseDriver,
    database: &Ident,
    table: &Ident,
    action: &AlterAction,
) -> AppResult<()> {
    let indexes = if action.needs_indexes() {
        introspect::index_entries(db, database, table).await?
    } else {
        Vec::new()
    };
    let stmt = ddl::alter_table(database, table, action, &indexes)?;
    db.run(&stmt).await?;
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameTableForm {
    pub database: String,
    pub table_name: String,
}

pub fn rename_table_form(query: TableQuery) -> AppResult<RenameTableForm> {
    schema_pair(&query.database, &query.table)?;
    Ok(RenameTableForm {
        database: query.database,
        table_name: query.table,
    })
}

pub async fn rename_table(
    state: &AppState,
    config: &DbConfig,
    req: RenameTableRequest,
) -> AppResult<Ack> {
    let (database, from) = schema_pair(&req.database, &req.table_name)?;
    let to = Ident::strict("table", &req.new_table_name)?;

    let mut conn = RequestConnection::open(state, &config.for_database(database.as_str())).await?;
    let result = conn.db().run(&ddl::rename_table(&database, &from, &to)).await;
    conn.finish(result.map_err(Into::into)).await?;

    tracing::info!(%database, %from, %to, "table renamed");
    Ok(Ack::new(format!("rename table {} to {}", from, to)))
}

#[derive(Debug, Clone, Serialize)]
pub struct DescribedColumn {
    #[serde(flatten)]
    pub column: ColumnDescriptor,
    pub display_default: String,
}

pub async fn describe_table(
    state: &AppState,
    config: &DbConfig,
    query: TableQuery,
) -> AppResult<Vec<DescribedColumn>> {
    let (database, table) = schema_pair(&query.database, &query.table)?;

    let mut conn = RequestConnection::open(state, &config.for_database(database.as_str())).await?;
    let result = introspect::describe(conn.db(), &database, &table).await;
    let columns = conn.finish(result.map_err(Into::into)).await?;

    Ok(columns
        .into_iter()
        .map(|column| DescribedColumn {
            display_default: column.display_default(),
            column,
        })
        .collect())
}

pub async fn show_create_table(
    state: &AppState,
    config: &DbConfig,
    query: TableQuery,
) -> AppResult<Vec<Row>> {
    let (database, table) = schema_pair(&query.database, &query.table)?;

    let mut conn = RequestConnection::open(state, &config.for_database(database.as_str())).await?;
    let result = introspect::show_create_table(conn.db(), &database, &table).await;
    conn.finish(result.map_err(Into::into)).await
}

pub async fn show_index(state: &AppState, config: &DbConfig, query: TableQuery) -> AppResult<Vec<Row>> {
    let (database, table) = schema_pair(&query.database, &query.table)?;

    let mut conn = RequestConnection::open(state, &config.for_database(database.as_str())).await?;
    let result = introspect::show_index(conn.db(), &database, &table).await;
    conn.finish(result.map_err(Into::into)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_table_form_bounds() {
        let query = |n| CreateTableFormQuery {
            database: "d".into(),
            table_name: "t".into(),
            number_of_columns: n,
        };
        assert_eq!(create_table_form(query(3)).unwrap().columns.len(), 3);
        assert!(create_table_form(query(0)).is_err());
        assert!(create_table_form(CreateTableFormQuery {
            table_name: "bad name".into(),
            ..query(1)
        })
        .is_err());
    }

    #[test]
    fn key_actions_toggle_on_current_key() {
        let mut column = ColumnDescriptor {
            field: "id".into(),
            column_type: "int".into(),
            nullable: false,
            key: KeyKind::Primary,
            default: None,
            extra: String::new(),
        };
        assert_eq!(key_actions(&column), vec!["drop_primary", "add_unique", "add_index"]);
        column.key = KeyKind::Multi;
        assert_eq!(key_actions(&column), vec!["add_primary", "add_unique", "drop_index"]);
    }
}
