use crate::errors::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use log::warn;

/// Validates the bearer ID token and stores the caller's
/// [`Principal`](crate::models::Principal) in the request extensions
pub(super) async fn authentication_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = match request.headers().get(http::header::AUTHORIZATION) {
        Some(header) => header,
        None => {
            warn!("Missing Authorization header");
            return ApiError::unauthorized().into_response();
        }
    };

    let auth_header = match auth_header.to_str() {
        Ok(header_str) => header_str.to_string(),
        Err(e) => {
            warn!("Failed to parse Authorization header to string: {}", e);
            return ApiError::unauthorized().into_response();
        }
    };

    match state.validator.validate(&auth_header).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(e) => {
            warn!("Authentication failed: {}", e);
            ApiError::unauthorized().into_response()
        }
    }
}
