use serde::Serialize;
use serde_json::Value;

use super::schema_pair;
use crate::db::{introspect, DatabaseDriver};
use crate::error::{AppError, AppResult};
use crate::models::request::{
    InsertRowRequest, RowKeyQuery, SelectRequest, TableQuery, UpdateRowRequest,
};
use crate::models::{
    classify, primary_key, ColumnDescriptor, DbConfig, Row, RowOutcome, RowPage, SemanticType,
};
use crate::server::gate::RequestConnection;
use crate::sql::dml::{self, RowTarget, ValidSelect};
use crate::sql::{BuildError, Ident};
use crate::state::AppState;

const ROW_COUNT_MISMATCH: &str = "row_count != 1";

pub async fn select_rows(state: &AppState, config: &DbConfig, req: SelectRequest) -> AppResult<RowPage> {
    let query = req.validate(state.config.max_limit)?;

    let mut conn = RequestConnection::open(state, &config.for_database(query.database.as_str())).await?;
    let result = fetch_page(conn.db(), &query).await;
    conn.finish(result).await
}

async fn fetch_page(db: &mut dyn DatabaseDriver, query: &ValidSelect) -> AppResult<RowPage> {
    let columns = introspect::describe(db, &query.database, &query.table).await?;
    let pk = primary_key(&columns).ok_or(BuildError::NoPrimaryKey)?;
    let stmt = dml::select_rows(query, &columns)?;
    let rows = db.fetch(&stmt).await?;
    let page = dml::paginate(query.limit, query.offset, rows.len());

    Ok(RowPage {
        columns: columns.iter().map(|c| c.field.clone()).collect(),
        primary_key: pk.field.clone(),
        rows,
        sql: stmt.display(),
        limit: query.limit,
        offset: query.offset,
        has_prev: page.has_prev,
        has_next: page.has_next,
        prev_offset: page.prev_offset,
        next_offset: page.next_offset,
    })
}

/// One input of the insert or update form.
#[derive(Debug, Clone, Serialize)]
pub struct RowField {
    pub field: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub semantic: SemanticType,
    /// Server-assigned; the form shows no input for it.
    pub auto_increment: bool,
    pub primary: bool,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowForm {
    pub database: String,
    pub table: String,
    pub pk_column: String,
    pub fields: Vec<RowField>,
}

/// Inputs prefilled with the column default, or the type's default when
/// the column has none. Timestamp and binary columns are left out.
pub async fn insert_row_form(state: &AppState, config: &DbConfig, query: TableQuery) -> AppResult<RowForm> {
    let (database, table) = schema_pair(&query.database, &query.table)?;

    let mut conn = RequestConnection::open(state, &config.for_database(database.as_str())).await?;
    let result = introspect::describe(conn.db(), &database, &table).await;
    let columns = conn.finish(result.map_err(Into::into)).await?;
    let pk = primary_key(&columns).ok_or(BuildError::NoPrimaryKey)?;

    let fields = columns
        .iter()
        .filter(|c| c.is_primary() || c.semantic_type().is_bindable())
        .map(|c| {
            let (semantic, type_default) = classify(&c.column_type);
            let value = match &c.default {
                Some(d) => Value::String(d.clone()),
                None => type_default.as_input().map(Value::String).unwrap_or(Value::Null),
            };
            RowField {
                field: c.field.clone(),
                column_type: c.column_type.clone(),
                semantic,
                auto_increment: c.is_primary() && c.is_auto_increment(),
                primary: c.is_primary(),
                value,
            }
        })
        .collect();

    Ok(RowForm {
        database: query.database,
        table: query.table,
        pk_column: pk.field.clone(),
        fields,
    })
}

pub async fn insert_row(state: &AppState, config: &DbConfig, req: InsertRowRequest) -> AppResult<RowOutcome> {
    let (database, table) = schema_pair(&req.database, &req.table)?;

    let mut conn = RequestConnection::open(state, &config.for_database(database.as_str())).await?;
    let result = insert(conn.db(), &database, &table, &req).await;
    let outcome = conn.finish(result).await?;

    tracing::info!(%database, %table, pk = %outcome.pk_value, "row inserted");
    Ok(outcome)
}

async fn insert(
    db: &mut dyn DatabaseDriver,
    database: &Ident,
    table: &Ident,
    req: &InsertRowRequest,
) -> AppResult<RowOutcome> {
    let columns = introspect::describe(db, database, table).await?;
    let plan = dml::insert_row(database, table, &columns, &req.values)?;
    let outcome = db.run(&plan.statement).await?;

    let pk_value = if outcome.last_insert_id != 0 {
        Value::from(outcome.last_insert_id)
    } else {
        plan.supplied_pk.map(Value::String).unwrap_or(Value::Null)
    };

    Ok(RowOutcome {
        table: req.table.clone(),
        pk_column: plan.pk_column,
        pk_value,
    })
}

/// The current row for editing; 404 when no row has that key. Timestamp
/// and binary columns are left out since an update never sets them.
pub async fn update_row_form(state: &AppState, config: &DbConfig, query: RowKeyQuery) -> AppResult<RowForm> {
    let (database, table) = schema_pair(&query.database, &query.table)?;

    let mut conn = RequestConnection::open(state, &config.for_database(database.as_str())).await?;
    let result = fetch_row(conn.db(), &database, &table, &query.pk).await;
    let (columns, target, row) = conn.finish(result).await?;

    let fields = columns
        .iter()
        .filter(|c| c.is_primary() || c.semantic_type().is_bindable())
        .map(|c| RowField {
            field: c.field.clone(),
            column_type: c.column_type.clone(),
            semantic: c.semantic_type(),
            auto_increment: c.is_auto_increment(),
            primary: c.is_primary(),
            value: row.get(&c.field).cloned().unwrap_or(Value::Null),
        })
        .collect();

    Ok(RowForm {
        database: query.database,
        table: query.table,
        pk_column: target.pk_column.as_str().to_string(),
        fields,
    })
}

async fn fetch_row(
    db: &mut dyn DatabaseDriver,
    database: &Ident,
    table: &Ident,
    pk: &str,
) -> AppResult<(Vec<ColumnDescriptor>, RowTarget, Row)> {
    let columns = introspect::describe(db, database, table).await?;
    let target = RowTarget::resolve(database, table, &columns, pk)?;
    let row = db
        .fetch(&target.select())
        .await?
        .into_iter()
        .next()
        .ok_or(AppError::NotFound)?;
    Ok((columns, target, row))
}

/// Fails unless exactly one row has the target's key.
async fn expect_single_row(db: &mut dyn DatabaseDriver, target: &RowTarget) -> AppResult<()> {
    let rows = db.fetch(&target.count()).await?;
    let count = rows
        .first()
        .and_then(|r| r.get("_count"))
        .and_then(|v| v.as_i64().or_else(|| v.as_str()?.parse().ok()));
    if count != Some(1) {
        return Err(AppError::Invariant(ROW_COUNT_MISMATCH));
    }
    Ok(())
}

pub async fn update_row(state: &AppState, config: &DbConfig, req: UpdateRowRequest) -> AppResult<RowOutcome> {
    let (database, table) = schema_pair(&req.database, &req.table)?;

    let mut conn = RequestConnection::open(state, &config.for_database(database.as_str())).await?;
    let result = update(conn.db(), &database, &table, &req).await;
    let outcome = conn.finish(result).await?;

    tracing::info!(%database, %table, pk = %req.pk, "row updated");
    Ok(outcome)
}

async fn update(
    db: &mut dyn DatabaseDriver,
    database: &Ident,
    table: &Ident,
    req: &UpdateRowRequest,
) -> AppResult<RowOutcome> {
    let columns = introspect::describe(db, database, table).await?;
    let target = RowTarget::resolve(database, table, &columns, &req.pk)?;
    let stmt = target.update(&columns, &req.values)?;

    expect_single_row(db, &target).await?;
    let outcome = db.run(&stmt).await?;
    if outcome.rows_affected != 1 {
        return Err(AppError::Invariant(ROW_COUNT_MISMATCH));
    }

    Ok(RowOutcome {
        table: req.table.clone(),
        pk_column: target.pk_column.as_str().to_string(),
        pk_value: Value::String(req.pk.clone()),
    })
}

pub async fn delete_row(state: &AppState, config: &DbConfig, req: RowKeyQuery) -> AppResult<RowOutcome> {
    let (database, table) = schema_pair(&req.database, &req.table)?;

    let mut conn = RequestConnection::open(state, &config.for_database(database.as_str())).await?;
    let result = delete(conn.db(), &database, &table, &req).await;
    let outcome = conn.finish(result).await?;

    tracing::info!(%database, %table, pk = %req.pk, "row deleted");
    Ok(outcome)
}

async fn delete(
    db: &mut dyn DatabaseDriver,
    database: &Ident,
    table: &Ident,
    req: &RowKeyQuery,
) -> AppResult<RowOutcome> {
    let columns = introspect::describe(db, database, table).await?;
    let target = RowTarget::resolve(database, table, &columns, &req.pk)?;

    expect_single_row(db, &target).await?;
    let outcome = db.run(&target.delete()).await?;
    if outcome.rows_affected != 1 {
        return Err(AppError::Invariant(ROW_COUNT_MISMATCH));
    }

    Ok(RowOutcome {
        table: req.table.clone(),
        pk_column: target.pk_column.as_str().to_string(),
        pk_value: Value::String(req.pk.clone()),
    })
}
