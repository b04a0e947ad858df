use crate::api::{authorize, guard, health, permissions};
use crate::state::AppState;
use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

pub(crate) const HEALTH_TAG: &str = "Health API";
pub(crate) const AUTHZ_TAG: &str = "Authorization API";

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::ready_check,
        authorize::authorize_handler,
        guard::guard_handler,
        permissions::permissions_handler,
    ),
    tags(
        (name = HEALTH_TAG, description = "Health check endpoints"),
        (name = AUTHZ_TAG, description = "Authorization endpoints"),
    ),
    info(
        title = "Group Authorization Decision API",
        description = "Group-based authorization decisions for an API gateway",
        version = "0.1.0"
    )
)]
pub(crate) struct ApiDoc;

/// Serves the OpenAPI document as JSON
pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestFixture;

    #[test]
    fn test_all_routes_are_documented() {
        let doc = ApiDoc::openapi();
        for path in ["/health", "/ready", "/authorize", "/guard", "/permissions"] {
            assert!(doc.paths.paths.contains_key(path), "{path} is not documented");
        }
    }

    #[tokio::test]
    async fn test_openapi_json_is_served() {
        let fixture = TestFixture::new().await;
        let response = fixture.get("/openapi.json").await;
        response.assert_ok();
        assert_eq!(
            response.json["info"]["title"],
            "Group Authorization Decision API"
        );
    }
}
