use crate::errors::ApiError;
use crate::headers::ClientCacheControl;
use crate::openapi::AUTHZ_TAG;
use crate::pipeline::AuthorizationRequest;
use crate::policy::Decision;
use crate::state::AppState;
use axum::{
    extract::{Json, State},
    http::{header::CACHE_CONTROL, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use log::debug;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Token authorizer event sent by the API gateway
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuthorizerEvent {
    /// Authorizer type, `TOKEN` for bearer authorizers
    #[serde(rename = "type", default = "token_event_type")]
    pub event_type: String,
    /// Raw `Authorization` header value of the client request
    pub authorization_token: String,
    /// ARN of the method being invoked
    pub method_arn: String,
}

fn token_event_type() -> String {
    "TOKEN".to_string()
}

#[utoipa::path(
    post,
    path = "/authorize",
    tag = AUTHZ_TAG,
    request_body = AuthorizerEvent,
    params(
        ("Cache-Control" = Option<String>, Header, description = "no-cache / no-store directives"),
    ),
    responses(
        (status = 200, description = "Decision for the caller", body = Decision),
        (status = 401, description = "Caller is not authorized"),
        (status = 422, description = "Invalid request payload")
    )
)]
pub(crate) async fn authorize_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<AuthorizerEvent>,
) -> Response {
    debug!("Received {} authorizer event for {}", event.event_type, event.method_arn);
    let request = AuthorizationRequest::new(
        event.authorization_token,
        event.method_arn,
        ClientCacheControl::from_header_value(headers.get(CACHE_CONTROL)),
        state.config.decision_timeout(),
    );

    match state.pipeline.decide(&request).await {
        Ok(decision) => (StatusCode::OK, Json(decision)).into_response(),
        Err(unauthorized) => ApiError::from(unauthorized).into_response(),
    }
}

pub(super) fn router() -> Router<AppState> {
    Router::new().route("/authorize", post(authorize_handler))
}
