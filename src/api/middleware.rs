//! Request interceptor stages applied around the whole router.
//!
//! Order, outermost first:
//! 1. [`access_control`]: cross-origin headers, preflight short-circuit.
//! 2. [`request_logging`]: method, URI, remote address and latency.
//! 3. Request timeout, answered with an error envelope on expiry.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::error_handling::HandleErrorLayer;
use axum::extract::{ConnectInfo, Request};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{from_fn, Next};
use axum::response::{IntoResponse, Response};
use axum::{BoxError, Router};
use tower::timeout::error::Elapsed;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::metrics;

/// Bound on handling a single request, including writing the response.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(15);

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Wrap `router` in the interceptor pipeline.
pub fn apply(router: Router) -> Router {
    with_timeout(router, WRITE_TIMEOUT)
}

fn with_timeout(router: Router, limit: Duration) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(from_fn(access_control))
            .layer(from_fn(request_logging))
            .layer(HandleErrorLayer::new(request_failed))
            .layer(TimeoutLayer::new(limit)),
    )
}

async fn request_failed(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::Timeout
    } else {
        warn!("Request failed in middleware: {}", err);
        ApiError::Internal(err.to_string())
    }
}

/// Set permissive cross-origin headers on every response; answer `OPTIONS`
/// with 200 without running anything downstream.
pub async fn access_control(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        next.run(request).await
    };
    set_cors_headers(response.headers_mut());
    response
}

fn set_cors_headers(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static(ALLOW_ORIGIN));
    headers.insert(ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
    headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
}

/// Log each request after its response has been produced.
pub async fn request_logging(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());

    let response = next.run(request).await;

    let status = response.status();
    info!(
        method = %method,
        uri = %uri,
        remote = %remote,
        status = status.as_u16(),
        latency_ms = start.elapsed().as_secs_f64() * 1000.0,
        "request"
    );
    metrics::record_http_request(start, method.as_str(), status.as_u16());

    response
}
