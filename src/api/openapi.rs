//! OpenAPI description of the HTTP surface.

use utoipa::OpenApi;

use super::handlers;

/// Generated OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "project-api",
        description = "Users, projects and statistics over an optional SQLite store"
    ),
    paths(
        handlers::health,
        handlers::list_users,
        handlers::create_user,
        handlers::list_projects,
        handlers::stats
    )
)]
pub struct ApiDoc;

/// Render the document as pretty JSON.
pub fn to_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_api_path() {
        let doc = ApiDoc::openapi();
        for path in ["/health", "/api/users", "/api/projects", "/api/stats"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let users = &doc.paths.paths["/api/users"];
        assert!(users.get.is_some());
        assert!(users.post.is_some());
    }

    #[test]
    fn renders_json() {
        let json = to_json().unwrap();
        assert!(json.contains("\"/api/stats\""));
    }
}
