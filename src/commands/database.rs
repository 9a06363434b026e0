use crate::db::{introspect, DatabaseDriver};
use crate::error::AppResult;
use crate::models::request::{DatabaseNameRequest, DatabaseQuery};
use crate::models::{Ack, DbConfig};
use crate::server::gate::RequestConnection;
use crate::sql::{ddl, Ident};
use crate::state::AppState;

pub async fn show_databases(state: &AppState, config: &DbConfig) -> AppResult<Vec<String>> {
    let mut conn = RequestConnection::open(state, config).await?;
    let result = introspect::list_databases(conn.db()).await.map_err(Into::into);
    conn.finish(result).await
}

pub async fn create_database(
    state: &AppState,
    config: &DbConfig,
    req: DatabaseNameRequest,
) -> AppResult<Ack> {
    let name = Ident::strict("database", &req.database_name)?;

    let mut conn = RequestConnection::open(state, config).await?;
    let result = conn.db().run(&ddl::create_database(&name)).await;
    conn.finish(result.map_err(Into::into)).await?;

    tracing::info!(database = %name, "database created");
    Ok(Ack::new(format!("create database {}", name)))
}

pub async fn drop_database(
    state: &AppState,
    config: &DbConfig,
    req: DatabaseNameRequest,
) -> AppResult<Ack> {
    let name = Ident::schema("database", &req.database_name)?;

    let mut conn = RequestConnection::open(state, config).await?;
    let result = conn.db().run(&ddl::drop_database(&name)).await;
    conn.finish(result.map_err(Into::into)).await?;

    tracing::info!(database = %name, "database dropped");
    Ok(Ack::new(format!("drop database {}", name)))
}

/// `CREATE DATABASE` plus the DDL of every table not excluded by prefix,
/// each statement terminated by `;`.
pub async fn dump_database(
    state: &AppState,
    config: &DbConfig,
    query: DatabaseQuery,
) -> AppResult<String> {
    let database = Ident::schema("database", &query.database)?;

    let mut conn = RequestConnection::open(state, &config.for_database(database.as_str())).await?;
    let result = dump(conn.db(), state, &database).await;
    let statements = conn.finish(result).await?;

    Ok(statements.join(";\n\n") + ";\n")
}

async fn dump(db: &mut dyn DatabaseDriver, state: &AppState, database: &Ident) -> AppResult<Vec<String>> {
    let mut statements = vec![ddl::create_database(database).sql];

    for table in introspect::list_tables(db, database).await? {
        if state.config.excluded_from_dump(&table) {
            tracing::debug!(%table, "skipped in dump");
            continue;
        }
        let table = Ident::schema("table", &table)?;
        if let Some(ddl) = introspect::show_create_table_for_dump(db, database, &table).await? {
            statements.push(ddl);
        }
    }
    Ok(statements)
}
