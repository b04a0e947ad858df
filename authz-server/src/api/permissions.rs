use crate::errors::ApiError;
use crate::headers::ClientCacheControl;
use crate::models::{AggregatedPermissions, Principal};
use crate::openapi::AUTHZ_TAG;
use crate::state::AppState;
use axum::{
    extract::{Extension, Json, State},
    http::{header::CACHE_CONTROL, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use utoipa::ToSchema;

/// Aggregated permissions of the authenticated caller
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
pub(crate) struct PermissionsResult {
    pub principal: Principal,
    /// Resource → actions, unioned over all of the caller's groups
    #[schema(value_type = Object)]
    pub permissions: AggregatedPermissions,
}

#[utoipa::path(
    get,
    path = "/permissions",
    tag = AUTHZ_TAG,
    params(
        ("Authorization" = String, Header, description = "Bearer ID token"),
    ),
    responses(
        (status = 200, description = "Permissions of the caller", body = PermissionsResult),
        (status = 401, description = "Caller is not authenticated or the lookup timed out")
    )
)]
pub(crate) async fn permissions_handler(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
) -> Response {
    let cache_control = ClientCacheControl::from_header_value(headers.get(CACHE_CONTROL));
    let deadline = Instant::now() + state.config.decision_timeout();

    match state
        .pipeline
        .permissions_for(&principal, &cache_control, deadline)
        .await
    {
        Ok(permissions) => (
            StatusCode::OK,
            Json(PermissionsResult {
                principal,
                permissions,
            }),
        )
            .into_response(),
        Err(unauthorized) => ApiError::from(unauthorized).into_response(),
    }
}

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/permissions", get(permissions_handler))
}
