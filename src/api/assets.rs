//! Landing page and static files.

use std::path::{Component, Path as FsPath};

use axum::extract::{Path, Request, State};
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::state::AppState;
use crate::error::{ApiError, ApiResult};

/// File served at `/`, relative to the asset root.
pub const LANDING_ASSET: &str = "index.html";

/// Serve the landing page.
pub async fn index(State(state): State<AppState>, request: Request) -> Response {
    serve_file(&state.config.asset_root.join(LANDING_ASSET), request).await
}

/// Serve a file under `/static/`. A path containing `..` anywhere is
/// rejected before the file system is touched.
pub async fn static_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    request: Request,
) -> ApiResult<Response> {
    let relative = checked_relative(&path)?;
    Ok(serve_file(&state.config.asset_root.join(relative), request).await)
}

fn checked_relative(path: &str) -> ApiResult<&FsPath> {
    if path.contains("..") {
        return Err(ApiError::InvalidPath(path.to_string()));
    }

    let relative = FsPath::new(path.trim_start_matches('/'));
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ApiError::InvalidPath(path.to_string()));
    }
    Ok(relative)
}

async fn serve_file(path: &FsPath, request: Request) -> Response {
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
