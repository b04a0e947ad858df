use crate::errors::ApiError;
use crate::headers::ClientCacheControl;
use crate::models::{Action, Principal};
use crate::openapi::AUTHZ_TAG;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, State},
    http::{header::CACHE_CONTROL, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use utoipa::ToSchema;

/// Single permission check for the authenticated caller
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub(crate) struct GuardQuery {
    /// Required action: read, write, delete or admin (case-insensitive)
    pub action: String,
    /// Resource the action is performed on, matched exactly
    pub resource: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub(crate) struct GuardResult {
    pub allowed: bool,
}

#[utoipa::path(
    post,
    path = "/guard",
    tag = AUTHZ_TAG,
    request_body = GuardQuery,
    params(
        ("Authorization" = String, Header, description = "Bearer ID token"),
    ),
    responses(
        (status = 200, description = "The caller holds the action", body = GuardResult),
        (status = 400, description = "Unknown action"),
        (status = 401, description = "Caller is not authenticated or the check timed out"),
        (status = 403, description = "The caller does not hold the action")
    )
)]
pub(crate) async fn guard_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    Json(query): Json<GuardQuery>,
) -> Response {
    let action = match query.action.parse::<Action>() {
        Ok(action) => action,
        Err(e) => return ApiError::new(e, StatusCode::BAD_REQUEST).into_response(),
    };
    let cache_control = ClientCacheControl::from_header_value(headers.get(CACHE_CONTROL));
    let deadline = Instant::now() + state.config.decision_timeout();

    match state
        .guard
        .check(&principal, action, &query.resource, &cache_control, deadline)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(GuardResult { allowed: true })).into_response(),
        Err(denial) => ApiError::from(denial).into_response(),
    }
}

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/guard", post(guard_handler))
}

#[cfg(test)]
mod tests {
    use super::GuardResult;
    use crate::test_utils::{
        offline_app, scenario_entries, send_to, CountingStore, StaticIdentityProvider,
        TestFixture,
    };
    use axum::body::Body;
    use http::{Method, Request, StatusCode};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_guard_allows_user1_write() {
        let fixture = TestFixture::new().await;
        fixture.mock_token("token-user1", "user1").await;

        let response = fixture
            .post_with_headers(
                "/guard",
                &json!({"action": "write", "resource": "Project_Data"}),
                &[("Authorization", "Bearer token-user1")],
            )
            .await;
        assert_eq!(
            response.assert_ok().json_as::<GuardResult>(),
            GuardResult { allowed: true }
        );
    }

    #[tokio::test]
    async fn test_guard_denies_user2_write() {
        let fixture = TestFixture::new().await;
        fixture.mock_token("token-user2", "user2").await;

        let response = fixture
            .post_with_headers(
                "/guard",
                &json!({"action": "WRITE", "resource": "Project_Data"}),
                &[("Authorization", "Bearer token-user2")],
            )
            .await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(response.json, json!({"detail": "Forbidden"}));
    }

    #[tokio::test]
    async fn test_guard_unknown_action() {
        let fixture = TestFixture::new().await;
        fixture.mock_token("token-user1", "user1").await;

        let response = fixture
            .post_with_headers(
                "/guard",
                &json!({"action": "fly", "resource": "Project_Data"}),
                &[("Authorization", "Bearer token-user1")],
            )
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_guard_requires_authentication() {
        let fixture = TestFixture::new().await;

        let response = fixture
            .post("/guard", &json!({"action": "read", "resource": "Public_Data"}))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(fixture.store.reads(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_guard_times_out_on_slow_store() {
        let store = CountingStore::new(scenario_entries()).with_delay(Duration::from_secs(30));
        let app = offline_app(
            store,
            StaticIdentityProvider::new().with_token("token-user1", "user1"),
        )
        .await;

        let request = Request::builder()
            .method(Method::POST)
            .uri("/guard")
            .header("Content-Type", "application/json")
            .header("Authorization", "Bearer token-user1")
            .body(Body::from(
                json!({"action": "read", "resource": "Public_Data"}).to_string(),
            ))
            .unwrap();
        let response = send_to(&app, request).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json, json!({"detail": "Unauthorized"}));
    }
}
