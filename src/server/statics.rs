use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Uri};
use axum::response::{IntoResponse, Response};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub const STATIC_PREFIX: &str = "/web/";

/// Maps a request path onto the static directory. Paths outside the prefix
/// are unknown. The remainder must be plain relative segments: `..`, a root
/// or a drive prefix is refused before the filesystem is touched.
fn resolve(root: &Path, path: &str) -> AppResult<PathBuf> {
    let relative = path.strip_prefix(STATIC_PREFIX).ok_or(AppError::NotFound)?;
    let relative = Path::new(relative);
    if path.contains("..")
        || !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(AppError::validation("path traversal refused"));
    }
    Ok(root.join(relative))
}

/// Fallback for everything the router does not match.
pub async fn serve(State(state): State<AppState>, method: Method, uri: Uri) -> AppResult<Response> {
    let path = resolve(&state.config.static_dir, uri.path())?;

    let meta = tokio::fs::metadata(&path)
        .await
        .map_err(|_| AppError::NotFound)?;
    if !meta.is_file() {
        return Err(AppError::Forbidden);
    }
    if method != Method::GET && method != Method::HEAD {
        return Err(AppError::MethodNotAllowed);
    }

    let mime = mime_guess::from_path(&path).first_or_octet_stream().to_string();
    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        let bytes = tokio::fs::read(&path).await.map_err(|_| AppError::NotFound)?;
        Body::from(bytes)
    };

    Ok(([(CONTENT_TYPE, mime)], body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_paths() {
        let root = Path::new("/srv/web");
        assert_eq!(resolve(root, "/web/css/a.css").unwrap(), root.join("css/a.css"));
        assert!(matches!(resolve(root, "/other"), Err(AppError::NotFound)));
        assert!(matches!(
            resolve(root, "/web/../etc/passwd"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn absolute_remainder_cannot_escape_root() {
        let root = Path::new("/srv/web");
        assert!(matches!(
            resolve(root, "/web//etc/passwd"),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            resolve(root, "/web/./a.css"),
            Err(AppError::Validation(_))
        ));
    }
}
