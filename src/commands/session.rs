use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::models::request::ConnectRequest;
use crate::models::DbConfig;
use crate::server::gate::RequestConnection;
use crate::state::AppState;
use crate::token::Token;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectForm {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: u16,
}

pub fn connect_form() -> ConnectForm {
    ConnectForm {
        host: "127.0.0.1".to_string(),
        user: String::new(),
        password: String::new(),
        database: "mysql".to_string(),
        port: 3306,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectOutcome {
    /// Serialized session token, also set as the `token` cookie.
    pub token: String,
    pub access_expires_at: i64,
    pub refresh_expires_at: i64,
}

/// Proves the credentials by opening and closing a connection, then mints
/// a token carrying them.
pub async fn connect(state: &AppState, req: ConnectRequest, now: i64) -> AppResult<ConnectOutcome> {
    if req.host.is_empty()
        || req.user.is_empty()
        || req.password.is_empty()
        || req.database.is_empty()
        || req.port == 0
    {
        return Err(AppError::validation(
            "host, user, password, database and port are required",
        ));
    }

    let config = DbConfig {
        host: req.host,
        user: req.user,
        password: req.password,
        database: req.database,
        port: req.port,
    };

    let conn = RequestConnection::open(state, &config).await?;
    conn.finish(Ok(())).await?;

    let mut token = Token::issue(state.config.lifetimes, now);
    config.write_to(&mut token.data);
    let serialized = state
        .codec
        .serialize(&token)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(host = %config.host, user = %config.user, port = config.port, "connected");

    Ok(ConnectOutcome {
        token: serialized,
        access_expires_at: token.exp.access,
        refresh_expires_at: token.exp.refresh,
    })
}
