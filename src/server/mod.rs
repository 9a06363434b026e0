//! HTTP surface: the `/mysql/*` dispatch table, the connection gate and the
//! static file fallback.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub mod gate;
pub mod routes;
pub mod statics;

pub fn router(state: AppState) -> Router {
    let open = Router::new()
        .route("/", get(routes::index))
        .route("/mysql/connect_form", get(routes::connect_form))
        .route("/mysql/connect", post(routes::connect));

    let gated = Router::new()
        .route("/mysql/disconnect", get(routes::disconnect))
        .route("/mysql/show_databases", get(routes::show_databases))
        .route("/mysql/create_database", post(routes::create_database))
        .route("/mysql/drop_database", post(routes::drop_database))
        .route("/mysql/dump_database", get(routes::dump_database))
        .route("/mysql/show_tables", get(routes::show_tables))
        .route("/mysql/create_table_form", get(routes::create_table_form))
        .route("/mysql/create_table", post(routes::create_table))
        .route("/mysql/drop_table", post(routes::drop_table))
        .route("/mysql/alter_table_form", get(routes::alter_table_form))
        .route("/mysql/alter_table", post(routes::alter_table))
        .route("/mysql/rename_table_form", get(routes::rename_table_form))
        .route("/mysql/rename_table", post(routes::rename_table))
        .route("/mysql/describe_table", get(routes::describe_table))
        .route("/mysql/show_create_table", get(routes::show_create_table))
        .route("/mysql/show_index", get(routes::show_index))
        .route("/mysql/select_rows", get(routes::select_rows))
        .route("/mysql/insert_row_form", get(routes::insert_row_form))
        .route("/mysql/insert_row", post(routes::insert_row))
        .route("/mysql/update_row_form", get(routes::update_row_form))
        .route("/mysql/update_row", post(routes::update_row))
        .route("/mysql/delete_row", post(routes::delete_row))
        .route_layer(middleware::from_fn(gate::require_connection));

    Router::new()
        .merge(open)
        .merge(gated)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            gate::resolve_token,
        ))
        .fallback(statics::serve)
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
