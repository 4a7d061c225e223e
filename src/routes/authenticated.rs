use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every handler here takes `AuthUser`, which the required-mode guard layered
/// on this router in `create_router` has already resolved.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /users/me
        .route("/users/me", get(handlers::get_me))
        // POST /posts
        // Slugs and categories are resolved idempotently before the insert.
        .route("/posts", post(handlers::create_post))
        // GET /team
        // The root team, created with a fresh signup token on first access.
        .route("/team", get(handlers::get_team))
        // POST /team/regenerate_signup_token
        .route(
            "/team/regenerate_signup_token",
            post(handlers::regenerate_signup_token),
        )
}
