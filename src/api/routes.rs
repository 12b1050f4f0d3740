//! HTTP API route definitions.

use axum::routing::{get, MethodRouter};
use axum::Router;

use super::assets::{index, static_file};
use super::handlers::{
    create_user, health, list_projects, list_users, method_not_allowed, not_found, stats,
};
use super::middleware;
use super::state::AppState;

/// Paths listed at startup in debug mode.
pub const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("GET", "/", "Main page"),
    ("GET", "/health", "Health check"),
    ("GET", "/api/users", "Get users"),
    ("POST", "/api/users", "Create user (demo)"),
    ("GET", "/api/projects", "Get projects"),
    ("GET", "/api/stats", "Get statistics"),
    ("GET", "/static/*", "Static files"),
];

/// Router with unmatched methods answered by an envelope instead of an
/// empty 405.
fn strict(methods: MethodRouter<AppState>) -> MethodRouter<AppState> {
    methods.fallback(method_not_allowed)
}

/// Create the API router with its middleware pipeline.
pub fn create_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/health", strict(get(health)))
        .route("/api/users", strict(get(list_users).post(create_user)))
        .route("/api/projects", strict(get(list_projects)))
        .route("/api/stats", strict(get(stats)))
        .route("/", strict(get(index)))
        .route("/static/*path", strict(get(static_file)))
        .fallback(not_found)
        .with_state(state);

    middleware::apply(routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::sqlite::tests::seeded_store;
    use crate::store::Store;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn degraded() -> Router {
        create_router(AppState::new(Config::default(), Store::Unavailable))
    }

    fn connected() -> Router {
        create_router(AppState::new(
            Config::default(),
            Store::Connected(seeded_store()),
        ))
    }

    async fn send(app: Router, method: Method, uri: &str) -> Response {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn post_json(app: Router, body: &str) -> Response {
        app.oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/users")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_without_store_is_unhealthy() {
        let response = send(degraded(), Method::GET, "/health").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = json_body(response).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("Service is unhealthy"));
        assert_eq!(body["data"]["status"], json!("unhealthy"));
        assert_eq!(body["data"]["version"], json!("1.0.0"));
    }

    #[tokio::test]
    async fn health_with_store_is_healthy() {
        let response = send(connected(), Method::GET, "/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["status"], json!("healthy"));
        assert!(body["data"]["uptime"].is_string());
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn list_users_without_store_is_500() {
        let response = send(degraded(), Method::GET, "/api/users").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = json_body(response).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"], json!("store not available"));
        assert!(body.get("data").is_none());
    }

    #[tokio::test]
    async fn list_users_paginates() {
        let response = send(connected(), Method::GET, "/api/users?limit=2&offset=0").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["message"], json!("Retrieved 2 users"));
        assert_eq!(body["data"][0]["username"], json!("carol"));
        assert_eq!(body["data"][1]["username"], json!("bob"));
    }

    #[tokio::test]
    async fn list_users_accepts_large_limit() {
        let response = send(connected(), Method::GET, "/api/users?limit=5000000000").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["message"], json!("Retrieved 3 users"));
    }

    #[tokio::test]
    async fn list_users_invalid_paging_falls_back_to_defaults() {
        for uri in [
            "/api/users?limit=0",
            "/api/users?limit=-3&offset=-1",
            "/api/users?limit=abc&offset=xyz",
        ] {
            let response = send(connected(), Method::GET, uri).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            let body = json_body(response).await;
            assert_eq!(body["message"], json!("Retrieved 3 users"), "{uri}");
        }
    }

    #[tokio::test]
    async fn create_user_echoes_payload() {
        let response = post_json(degraded(), r#"{"username":"u","email":"e@x.com"}"#).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = json_body(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["username"], json!("u"));
        assert_eq!(body["data"]["email"], json!("e@x.com"));
    }

    #[tokio::test]
    async fn create_user_requires_username_and_email() {
        let response = post_json(degraded(), "{}").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["success"], json!(false));
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("username") && error.contains("email"), "{error}");
    }

    #[tokio::test]
    async fn create_user_rejects_malformed_json() {
        let response = post_json(degraded(), "{not json").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["message"], json!("Invalid JSON format"));
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_user_rejects_wrong_content_type() {
        let response = degraded()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/users")
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from(r#"{"username":"u","email":"e@x.com"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["message"], json!("Content-Type must be application/json"));
    }

    #[tokio::test]
    async fn projects_wrong_method_is_405_regardless_of_store() {
        for app in [degraded(), connected()] {
            let response = send(app, Method::DELETE, "/api/projects").await;
            assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

            let body = json_body(response).await;
            assert_eq!(body["success"], json!(false));
            assert_eq!(body["error"], json!("Method DELETE not allowed"));
        }
    }

    #[tokio::test]
    async fn list_projects() {
        let response = send(connected(), Method::GET, "/api/projects").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["message"], json!("Retrieved 3 projects"));
        assert_eq!(body["data"][0]["status"], json!("active"));
        assert_eq!(body["data"][1]["budget"], json!(15000.5));
    }

    #[tokio::test]
    async fn list_projects_without_store_is_500() {
        let response = send(degraded(), Method::GET, "/api/projects").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn stats_without_store_is_503() {
        let response = send(degraded(), Method::GET, "/api/stats").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = json_body(response).await;
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn stats_aggregates() {
        let response = send(connected(), Method::GET, "/api/stats").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let data = &body["data"];
        assert_eq!(data["active_users"], json!(3));
        assert_eq!(data["projects_by_status"], json!({"active": 2, "completed": 1}));
        assert_eq!(data["total_tasks"], json!(5));
        assert_eq!(data["server_version"], json!("1.0.0"));
        assert!(data["timestamp"].is_string());
    }

    #[tokio::test]
    async fn unknown_path_is_404_envelope() {
        let response = send(degraded(), Method::GET, "/api/unknown").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let body = json_body(response).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!("Endpoint not found"));
        assert_eq!(body["error"], json!("Path /api/unknown not found"));
    }

    #[tokio::test]
    async fn preflight_never_reaches_handlers() {
        let response = send(degraded(), Method::OPTIONS, "/api/stats").await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn static_traversal_is_rejected() {
        for uri in ["/static/../secret", "/static/..secret", "/static/a..b"] {
            let response = send(degraded(), Method::GET, uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");

            let body = json_body(response).await;
            assert_eq!(body["success"], json!(false));
            assert_eq!(body["message"], json!("Invalid path"));
        }
    }
}
