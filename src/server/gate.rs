//! Token resolution and the connection-required guard.
//!
//! `resolve_token` runs on every routed request and leaves a [`Token`] in
//! the request extensions. `require_connection` wraps the handlers that talk
//! to MySQL: it turns the token into a [`DbConfig`] or redirects to the
//! connect form. Handlers open their connection through
//! [`RequestConnection`], which is closed before the response is built.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use tower_cookies::{Cookie, Cookies};

use crate::db::DatabaseDriver;
use crate::error::{AppError, AppResult};
use crate::models::DbConfig;
use crate::state::AppState;
use crate::token::Token;

pub const TOKEN_COOKIE: &str = "token";
pub const CONNECT_FORM: &str = "/mysql/connect_form";

pub fn session_cookie(value: String) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, value))
        .http_only(true)
        .path("/")
        .build()
}

pub fn clear_session_cookie(cookies: &Cookies) {
    cookies.remove(Cookie::build((TOKEN_COOKIE, "")).path("/").build());
}

fn header_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Token ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Cookie first, then `Authorization: Token …`. A bad cookie clears itself
/// and sends the browser home; a bad header is a 401. With neither the
/// request carries an empty token.
pub async fn resolve_token(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request,
    next: Next,
) -> Response {
    let cookie = cookies
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());

    let token = if let Some(value) = cookie {
        match state.codec.deserialize(&value) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "rejected token cookie");
                clear_session_cookie(&cookies);
                return Redirect::to("/").into_response();
            }
        }
    } else if let Some(value) = header_token(req.headers()) {
        match state.codec.deserialize(value) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "rejected authorization token");
                return AppError::Unauthorized.into_response();
            }
        }
    } else {
        Token::default()
    };

    req.extensions_mut().insert(token);
    next.run(req).await
}

/// Lets the request through only when its token carries a MySQL host.
pub async fn require_connection(mut req: Request, next: Next) -> Response {
    let config = req
        .extensions()
        .get::<Token>()
        .and_then(DbConfig::from_token);

    match config {
        Some(config) => {
            req.extensions_mut().insert(config);
            next.run(req).await
        }
        None => Redirect::to(CONNECT_FORM).into_response(),
    }
}

/// The one connection a request owns.
pub struct RequestConnection {
    driver: Box<dyn DatabaseDriver>,
}

impl RequestConnection {
    pub async fn open(state: &AppState, config: &DbConfig) -> AppResult<Self> {
        let driver = state.connector.open(config).await?;
        Ok(Self { driver })
    }

    pub fn db(&mut self) -> &mut dyn DatabaseDriver {
        &mut *self.driver
    }

    /// Closes the connection and hands back `result` unchanged. A failing
    /// close is logged, never reported over the handler's own outcome.
    pub async fn finish<T>(mut self, result: AppResult<T>) -> AppResult<T> {
        if let Err(e) = self.driver.close().await {
            tracing::warn!(error = %e, "closing connection failed");
        }
        result
    }
}
