mod authn_middleware;
pub(crate) mod authorize;
pub(crate) mod guard;
pub(crate) mod health;
pub(crate) mod permissions;

use crate::api::authn_middleware::authentication_middleware;
use crate::state::AppState;
use axum::{middleware, Router};

/// Combines all API routes into a single router
pub(super) fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(authorize::router())
        .merge(protected_routes(state))
}

/// Routes that require a bearer ID token; the caller's principal is placed
/// in the request extensions
fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(guard::router())
        .merge(permissions::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authentication_middleware,
        ))
}
