use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::{
    AppState, accounts,
    auth::{AuthUser, credentials::session_cookie},
    error::ApiError,
    models::{
        CreatePostRequest, ErrorResponse, LoginRequest, LoginResponse, Post, RegisterRequest,
        Team, User,
    },
    posts,
    repository::RepositoryState,
};

/// Lifetime of the `auth_token` cookie set on login: one day.
pub const LOGIN_COOKIE_MAX_AGE_SECS: i64 = 60 * 60 * 24;

/// parse_json
///
/// Bodies are decoded by hand so that an unreadable payload is reported as a
/// server-side failure (500), distinct from a rejected request (400).
fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(ApiError::internal)
}

fn empty_object() -> Json<Value> {
    Json(json!({}))
}

/// login
///
/// [Public Route] Exchanges credentials for an access token. The token is
/// returned in the body and also set as the `auth_token` cookie.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Invalid login type", body = ErrorResponse),
        (status = 401, description = "Invalid username or password", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: LoginRequest = parse_json(&body)?;
    let token = accounts::login(&state, &request).await?;

    let cookie = session_cookie(&token, LOGIN_COOKIE_MAX_AGE_SECS, state.config.secure_cookie);
    Ok(([(header::SET_COOKIE, cookie)], Json(LoginResponse { token })))
}

/// register
///
/// [Public Route] Creates a new account, subject to the signup gate.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered"),
        (status = 400, description = "Invalid input or duplicate user", body = ErrorResponse),
        (status = 401, description = "Signup token missing or invalid", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: RegisterRequest = parse_json(&body)?;
    let user = accounts::register(&state, request).await?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok(empty_object())
}

/// get_me
///
/// [Authenticated Route] Returns the session's user.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn get_me(AuthUser { user, .. }: AuthUser) -> Json<User> {
    Json(user)
}

/// create_post
///
/// [Authenticated Route] Creates a post owned by the session's user.
#[utoipa::path(
    post,
    path = "/api/v1/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 200, description = "Created"),
        (status = 400, description = "Invalid post", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn create_post(
    AuthUser { user, .. }: AuthUser,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: CreatePostRequest = parse_json(&body)?;
    posts::create_post(state.repo.as_ref(), request, &user.id).await?;
    Ok(empty_object())
}

/// get_post
///
/// [Public Route] Returns a post with its category names. Every failure,
/// including an unknown id, is a 500.
#[utoipa::path(
    get,
    path = "/api/v1/posts/{postID}",
    params(("postID" = String, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post", body = Post),
        (status = 500, description = "Lookup failed", body = ErrorResponse)
    )
)]
pub async fn get_post(
    viewer: Option<AuthUser>,
    State(repo): State<RepositoryState>,
    Path(post_id): Path<String>,
) -> Result<Json<Post>, ApiError> {
    let post = posts::get_post(repo.as_ref(), &post_id)
        .await
        .map_err(ApiError::internal)?;

    tracing::debug!(
        post_id = %post_id,
        viewer = viewer.as_ref().map(|v| v.user.id.as_str()).unwrap_or(""),
        "GetPost"
    );
    Ok(Json(post))
}

/// get_team
///
/// [Authenticated Route] Returns the root team and its signup token.
#[utoipa::path(
    get,
    path = "/api/v1/team",
    responses(
        (status = 200, description = "Root team", body = Team),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn get_team(
    _auth: AuthUser,
    State(repo): State<RepositoryState>,
) -> Result<Json<Team>, ApiError> {
    Ok(Json(accounts::get_root_team(repo.as_ref()).await?))
}

/// regenerate_signup_token
///
/// [Authenticated Route] Rotates the root team's signup token.
#[utoipa::path(
    post,
    path = "/api/v1/team/regenerate_signup_token",
    responses(
        (status = 200, description = "Rotated", body = Team),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn regenerate_signup_token(
    AuthUser { user, .. }: AuthUser,
    State(repo): State<RepositoryState>,
) -> Result<Json<Team>, ApiError> {
    let team = accounts::regenerate_signup_token(repo.as_ref(), &user.id).await?;
    Ok(Json(team))
}
