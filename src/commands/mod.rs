//! Operation bodies behind the `/mysql/*` routes.
//!
//! Each command validates its request into identifiers first, then opens one
//! connection, does its work and closes the connection whatever the outcome.

use crate::error::AppResult;
use crate::sql::Ident;

pub mod database;
pub mod row;
pub mod session;
pub mod table;

/// Validates an existing database and table name pair.
fn schema_pair(database: &str, table: &str) -> AppResult<(Ident, Ident)> {
    Ok((
        Ident::schema("database", database)?,
        Ident::schema("table", table)?,
    ))
}
