//! HTTP API handlers.

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use tracing::warn;
use utoipa::{IntoParams, ToSchema};

use super::envelope::ApiResponse;
use super::state::{AppState, SERVER_VERSION};
use crate::error::{ApiError, ApiResult};
use crate::store::{Project, SqliteStore, User};
use crate::utils::format_duration;

/// Page size used when `limit` is absent or invalid.
pub const DEFAULT_LIMIT: i64 = 10;
/// Offset used when `offset` is absent or invalid.
pub const DEFAULT_OFFSET: i64 = 0;

/// Status code plus envelope.
pub type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

/// Overall service health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Health {
    Healthy,
    Unhealthy,
}

/// Health check payload, computed per request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthStatus {
    pub status: Health,
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime: String,
}

/// Aggregate statistics, recomputed on every request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Statistics {
    pub active_users: i64,
    pub projects_by_status: BTreeMap<String, i64>,
    pub total_tasks: i64,
    pub server_uptime: String,
    pub server_version: String,
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTime<Utc>,
}

/// Raw pagination parameters. Kept as strings so bad values fall back to
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page size, positive (default 10).
    #[param(value_type = Option<i64>)]
    pub limit: Option<String>,
    /// Rows to skip, non-negative (default 0).
    #[param(value_type = Option<i64>)]
    pub offset: Option<String>,
}

/// Effective pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl From<PageParams> for Pagination {
    fn from(params: PageParams) -> Self {
        let limit = params
            .limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT);
        let offset = params
            .offset
            .as_deref()
            .and_then(|o| o.trim().parse::<i64>().ok())
            .filter(|o| *o >= 0)
            .unwrap_or(DEFAULT_OFFSET);
        Self { limit, offset }
    }
}

/// Body accepted by `POST /api/users`. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
}

impl NewUser {
    /// Names of required fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.username.trim().is_empty() {
            missing.push("username");
        }
        if self.email.trim().is_empty() {
            missing.push("email");
        }
        missing
    }
}

fn require_store(state: &AppState, unavailable: StatusCode) -> ApiResult<&SqliteStore> {
    state
        .store
        .connected()
        .ok_or(ApiError::StoreUnavailable(unavailable))
}

/// Health check: 200 when the store answers, 503 otherwise.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = ApiResponse<HealthStatus>),
        (status = 503, description = "Store missing or not answering", body = ApiResponse<HealthStatus>)
    )
)]
pub async fn health(State(state): State<AppState>) -> Reply<HealthStatus> {
    let healthy = match state.store.connected() {
        Some(store) => match store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Health check ping failed: {}", e);
                false
            }
        },
        None => false,
    };

    let status = if healthy { Health::Healthy } else { Health::Unhealthy };
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthStatus {
        status,
        timestamp: Utc::now(),
        version: SERVER_VERSION.to_string(),
        uptime: format_duration(state.uptime()),
    };

    (
        code,
        Json(ApiResponse::with_status(healthy, format!("Service is {}", status), body)),
    )
}

/// List active users, newest first.
#[utoipa::path(
    get,
    path = "/api/users",
    params(PageParams),
    responses(
        (status = 200, description = "Active users", body = ApiResponse<Vec<User>>),
        (status = 500, description = "Store not available or query failed")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> ApiResult<Reply<Vec<User>>> {
    let store = require_store(&state, StatusCode::INTERNAL_SERVER_ERROR)?;
    let page = Pagination::from(params);

    let users = store
        .list_active_users(page.limit, page.offset)
        .await
        .map_err(|source| ApiError::Store {
            context: "query users",
            source,
        })?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(format!("Retrieved {} users", users.len()), users)),
    ))
}

/// Validate and acknowledge a new user. Nothing is persisted.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "Accepted payload echoed back", body = ApiResponse<NewUser>),
        (status = 400, description = "Wrong content type, malformed JSON or missing fields")
    )
)]
pub async fn create_user(
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Reply<NewUser>> {
    if !is_json(&headers) {
        return Err(ApiError::UnsupportedContentType);
    }

    let body = body.map_err(|rejection| ApiError::Body(rejection.body_text()))?;
    let user: NewUser = serde_json::from_slice(&body)?;

    let missing = user.missing_fields();
    if !missing.is_empty() {
        return Err(ApiError::MissingFields(missing));
    }

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("User creation endpoint (demo)", user)),
    ))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
}

/// List all projects, newest first.
#[utoipa::path(
    get,
    path = "/api/projects",
    responses(
        (status = 200, description = "All projects", body = ApiResponse<Vec<Project>>),
        (status = 405, description = "Method other than GET"),
        (status = 500, description = "Store not available or query failed")
    )
)]
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Reply<Vec<Project>>> {
    let store = require_store(&state, StatusCode::INTERNAL_SERVER_ERROR)?;

    let projects = store.list_projects().await.map_err(|source| ApiError::Store {
        context: "query projects",
        source,
    })?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok(
            format!("Retrieved {} projects", projects.len()),
            projects,
        )),
    ))
}

/// Aggregate statistics. Each figure is computed independently; a failed
/// query defaults that figure and never aborts the others.
#[utoipa::path(
    get,
    path = "/api/stats",
    responses(
        (status = 200, description = "System statistics", body = ApiResponse<Statistics>),
        (status = 503, description = "Store not available")
    )
)]
pub async fn stats(State(state): State<AppState>) -> ApiResult<Reply<Statistics>> {
    let store = require_store(&state, StatusCode::SERVICE_UNAVAILABLE)?;

    let (active_users, projects_by_status, total_tasks) = tokio::join!(
        store.count_active_users(),
        store.count_projects_by_status(),
        store.count_tasks(),
    );

    let active_users = active_users.unwrap_or_else(|e| {
        warn!("Error counting users: {}", e);
        0
    });
    let projects_by_status = projects_by_status.unwrap_or_else(|e| {
        warn!("Error counting projects by status: {}", e);
        BTreeMap::new()
    });
    let total_tasks = total_tasks.unwrap_or_else(|e| {
        warn!("Error counting tasks: {}", e);
        0
    });

    let statistics = Statistics {
        active_users,
        projects_by_status,
        total_tasks,
        server_uptime: format_duration(state.uptime()),
        server_version: SERVER_VERSION.to_string(),
        timestamp: Utc::now(),
    };

    Ok((
        StatusCode::OK,
        Json(ApiResponse::ok("System statistics", statistics)),
    ))
}

/// Fallback for unmatched paths.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

/// Fallback for a matched path with an unsupported method.
pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}
