use crate::{AppState, auth::optional_auth, handlers};
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints open to anonymous clients: the login and registration entry
/// points, and post reads.
pub fn public_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // POST /auth/login
        // Verifies credentials, returns an access token and sets the `auth_token` cookie.
        .route("/auth/login", post(handlers::login))
        // POST /auth/register
        // Open while no user exists; afterwards requires the root team's signup token.
        .route("/auth/register", post(handlers::register))
        // GET /posts/{postID}
        // A valid session is picked up if present but never required.
        .route(
            "/posts/{postID}",
            get(handlers::get_post)
                .route_layer(middleware::from_fn_with_state(state, optional_auth)),
        )
}
