use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Redirect};
use axum::{Extension, Json};
use chrono::Utc;
use tower_cookies::Cookies;

use super::gate::{clear_session_cookie, session_cookie, CONNECT_FORM};
use crate::commands::session::{ConnectForm, ConnectOutcome};
use crate::commands::table::{AlterTableForm, CreateTableForm, DescribedColumn, RenameTableForm};
use crate::commands::row::RowForm;
use crate::commands::{database, row, session, table};
use crate::error::AppResult;
use crate::models::request::{
    AlterTableRequest, ConnectRequest, CreateTableFormQuery, CreateTableRequest, DatabaseNameRequest,
    DatabaseQuery, DropTableRequest, InsertRowRequest, RenameTableRequest, RowKeyQuery, SelectRequest,
    TableQuery, UpdateRowRequest,
};
use crate::models::{Ack, DbConfig, Row, RowOutcome, RowPage};
use crate::state::AppState;

pub async fn index() -> Redirect {
    Redirect::to(CONNECT_FORM)
}

pub async fn connect_form() -> Json<ConnectForm> {
    Json(session::connect_form())
}

pub async fn connect(
    State(state): State<AppState>,
    cookies: Cookies,
    Json(req): Json<ConnectRequest>,
) -> AppResult<Json<ConnectOutcome>> {
    let outcome = session::connect(&state, req, Utc::now().timestamp()).await?;
    cookies.add(session_cookie(outcome.token.clone()));
    Ok(Json(outcome))
}

pub async fn disconnect(cookies: Cookies) -> Redirect {
    clear_session_cookie(&cookies);
    Redirect::to(CONNECT_FORM)
}

pub async fn show_databases(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
) -> AppResult<Json<Vec<String>>> {
    Ok(Json(database::show_databases(&state, &config).await?))
}

pub async fn create_database(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Json(req): Json<DatabaseNameRequest>,
) -> AppResult<Json<Ack>> {
    Ok(Json(database::create_database(&state, &config, req).await?))
}

pub async fn drop_database(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Json(req): Json<DatabaseNameRequest>,
) -> AppResult<Json<Ack>> {
    Ok(Json(database::drop_database(&state, &config, req).await?))
}

pub async fn dump_database(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Query(query): Query<DatabaseQuery>,
) -> AppResult<impl IntoResponse> {
    let dump = database::dump_database(&state, &config, query).await?;
    Ok(([(CONTENT_TYPE, "text/plain; charset=utf-8")], dump))
}

pub async fn show_tables(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Query(query): Query<DatabaseQuery>,
) -> AppResult<Json<Vec<String>>> {
    Ok(Json(table::show_tables(&state, &config, query).await?))
}

pub async fn create_table_form(Query(query): Query<CreateTableFormQuery>) -> AppResult<Json<CreateTableForm>> {
    Ok(Json(table::create_table_form(query)?))
}

pub async fn create_table(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Json(req): Json<CreateTableRequest>,
) -> AppResult<Json<Ack>> {
    Ok(Json(table::create_table(&state, &config, req).await?))
}

pub async fn drop_table(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Json(req): Json<DropTableRequest>,
) -> AppResult<Json<Ack>> {
    Ok(Json(table::drop_table(&state, &config, req).await?))
}

pub async fn alter_table_form(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Query(query): Query<TableQuery>,
) -> AppResult<Json<AlterTableForm>> {
    Ok(Json(table::alter_table_form(&state, &config, query).await?))
}

pub async fn alter_table(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Json(req): Json<AlterTableRequest>,
) -> AppResult<Json<Ack>> {
    Ok(Json(table::alter_table(&state, &config, req).await?))
}

pub async fn rename_table_form(Query(query): Query<TableQuery>) -> AppResult<Json<RenameTableForm>> {
    Ok(Json(table::rename_table_form(query)?))
}

pub async fn rename_table(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Json(req): Json<RenameTableRequest>,
) -> AppResult<Json<Ack>> {
    Ok(Json(table::rename_table(&state, &config, req).await?))
}

pub async fn describe_table(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Query(query): Query<TableQuery>,
) -> AppResult<Json<Vec<DescribedColumn>>> {
    Ok(Json(table::describe_table(&state, &config, query).await?))
}

pub async fn show_create_table(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Query(query): Query<TableQuery>,
) -> AppResult<Json<Vec<Row>>> {
    Ok(Json(table::show_create_table(&state, &config, query).await?))
}

pub async fn show_index(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Query(query): Query<TableQuery>,
) -> AppResult<Json<Vec<Row>>> {
    Ok(Json(table::show_index(&state, &config, query).await?))
}

pub async fn select_rows(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Query(req): Query<SelectRequest>,
) -> AppResult<Json<RowPage>> {
    Ok(Json(row::select_rows(&state, &config, req).await?))
}

pub async fn insert_row_form(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Query(query): Query<TableQuery>,
) -> AppResult<Json<RowForm>> {
    Ok(Json(row::insert_row_form(&state, &config, query).await?))
}

pub async fn insert_row(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Json(req): Json<InsertRowRequest>,
) -> AppResult<Json<RowOutcome>> {
    Ok(Json(row::insert_row(&state, &config, req).await?))
}

pub async fn update_row_form(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Query(query): Query<RowKeyQuery>,
) -> AppResult<Json<RowForm>> {
    Ok(Json(row::update_row_form(&state, &config, query).await?))
}

pub async fn update_row(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Json(req): Json<UpdateRowRequest>,
) -> AppResult<Json<RowOutcome>> {
    Ok(Json(row::update_row(&state, &config, req).await?))
}

pub async fn delete_row(
    State(state): State<AppState>,
    Extension(config): Extension<DbConfig>,
    Json(req): Json<RowKeyQuery>,
) -> AppResult<Json<RowOutcome>> {
    Ok(Json(row::delete_row(&state, &config, req).await?))
}
