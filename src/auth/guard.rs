use std::{any::Any, backtrace::Backtrace, convert::Infallible};

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tower_http::catch_panic::CatchPanicLayer;

use super::{
    credentials::{TokenLocation, extract_credential},
    token::{TokenError, TokenService},
};
use crate::{
    AppState,
    error::{ApiError, INTERNAL_ERROR_MESSAGE},
    models::User,
    repository::{Repository, StoreError},
};

pub const HEADER_REQUESTED_WITH: &str = "x-requested-with";
pub const REQUESTED_WITH_XML: &str = "XMLHttpRequest";
pub const REQUESTED_WITH_KY: &str = "ky";

/// Which failures a guarded route tolerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardMode {
    /// Any session failure is a 401; the handler never runs.
    Required,
    /// Session failures, provider mismatch included, fall through with no
    /// identity attached. Only a store failure stops the request.
    Optional,
}

/// AuthUser
///
/// The identity resolved by the session guard, stored in the request
/// extensions. Handlers take it as an extractor; on a route without a
/// guard in front of it, extraction fails with 401.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    pub token_location: TokenLocation,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))
    }
}

impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<AuthUser>().cloned())
    }
}

/// SessionError
///
/// Every way identity resolution can fail. Only `Store` is a server fault.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no credential on request")]
    NoCredential,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("user {0} not found")]
    UserNotFound(String),
    #[error("auth service mismatch for user {user_id}: want {want:?}, got {got:?}")]
    ProviderMismatch {
        user_id: String,
        want: String,
        got: String,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// resolve_session
///
/// Extracts a credential, verifies it and loads the live user it names, then
/// checks the user's auth provider against the server's.
pub async fn resolve_session(
    repo: &dyn Repository,
    tokens: &TokenService,
    auth_mode: &str,
    headers: &HeaderMap,
) -> Result<AuthUser, SessionError> {
    let (token, token_location) = extract_credential(headers).ok_or(SessionError::NoCredential)?;
    tracing::debug!(location = ?token_location, "attachAuthMiddleware");

    let decoded = tokens.verify(&token)?;
    let user = repo
        .get_user_by_id(&decoded.user_id)
        .await?
        .ok_or_else(|| SessionError::UserNotFound(decoded.user_id.clone()))?;

    if user.auth_service != auth_mode {
        return Err(SessionError::ProviderMismatch {
            user_id: user.id,
            want: auth_mode.to_string(),
            got: user.auth_service,
        });
    }

    Ok(AuthUser {
        user,
        token_location,
    })
}

async fn guard(
    state: &AppState,
    mode: GuardMode,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = request.headers().clone();
    let resolved = resolve_session(
        state.repo.as_ref(),
        &state.tokens,
        &state.config.auth_mode,
        &headers,
    )
    .await;

    match resolved {
        Ok(auth_user) => {
            request.extensions_mut().insert(auth_user);
        }
        Err(SessionError::Store(e)) => return Err(ApiError::internal(e)),
        Err(e) if mode == GuardMode::Required => {
            return Err(ApiError::unauthorized("Unauthorized").with_detail(e));
        }
        Err(e) => {
            tracing::debug!("continuing without session: {e}");
        }
    }

    Ok(next.run(request).await)
}

/// require_auth
///
/// Guard middleware for routes that need a session.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    guard(&state, GuardMode::Required, request, next).await
}

/// optional_auth
///
/// Guard middleware for routes that read a session when one is present.
pub async fn optional_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    guard(&state, GuardMode::Optional, request, next).await
}

/// csrf_guard
///
/// Rejects any request whose `X-Requested-With` header is not one of the
/// recognized values.
pub async fn csrf_guard(request: Request, next: Next) -> Result<Response, ApiError> {
    let marker = request
        .headers()
        .get(HEADER_REQUESTED_WITH)
        .and_then(|value| value.to_str().ok());

    match marker {
        Some(REQUESTED_WITH_XML) | Some(REQUESTED_WITH_KY) => Ok(next.run(request).await),
        _ => {
            tracing::error!("checkCSRFToken FAILED");
            Err(ApiError::bad_request("checkCSRFToken FAILED"))
        }
    }
}

/// panic_layer
///
/// Converts a panic anywhere below it into a 500 envelope. The request path
/// is carried by the enclosing trace span.
pub fn panic_layer() -> CatchPanicLayer<fn(Box<dyn Any + Send + 'static>) -> Response> {
    CatchPanicLayer::custom(handle_panic as fn(Box<dyn Any + Send + 'static>) -> Response)
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(
        panic = %message,
        stack = %Backtrace::force_capture(),
        "Http handler panic"
    );

    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE).into_response()
}
