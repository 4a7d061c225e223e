use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    accounts::AuthError, auth::password::PasswordError, models::ErrorResponse, posts::PostError,
    repository::StoreError,
};

/// Client-facing text for every 500; details stay in the logs.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";

/// ApiError
///
/// The single error type returned by handlers and guard middleware. It
/// renders the `{"error", "errorCode"}` envelope and logs itself: 401 and 403
/// at debug level, everything else at error level together with `detail`.
#[derive(Debug, Error)]
#[error("{status}: {message}")]
pub struct ApiError {
    status: StatusCode,
    message: String,
    error_code: i32,
    // Server-side context, never sent to the client.
    detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error_code: 0,
            detail: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// An opaque 500; `detail` is logged only.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_MESSAGE)
            .with_detail(detail)
    }

    pub fn with_detail(mut self, detail: impl std::fmt::Display) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status.as_u16();
        let detail = self.detail.as_deref().unwrap_or("");
        if self.status == StatusCode::UNAUTHORIZED || self.status == StatusCode::FORBIDDEN {
            tracing::debug!(code, msg = %self.message, detail, "API DEBUG");
        } else {
            tracing::error!(code, msg = %self.message, detail, "API ERROR");
        }

        let body = ErrorResponse {
            error: self.message,
            error_code: self.error_code,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => ApiError::bad_request("resource already exists")
                .with_detail(err),
            other => ApiError::internal(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidLoginType | AuthError::InvalidInput(_) => {
                ApiError::bad_request(err.to_string())
            }
            AuthError::UsernameTaken | AuthError::EmailTaken => {
                ApiError::bad_request(err.to_string())
            }
            AuthError::InvalidPassword(PasswordError::InvalidPassword { .. }) => {
                ApiError::bad_request(err.to_string())
            }
            AuthError::InvalidPassword(PasswordError::Hash(_)) => ApiError::internal(err),
            AuthError::InvalidCredentials
            | AuthError::InvalidSignupToken
            | AuthError::SignupTokenRequired => ApiError::unauthorized(err.to_string()),
            AuthError::Token(inner) => ApiError::internal(inner),
            AuthError::Store(StoreError::Conflict(constraint)) => {
                ApiError::bad_request("Unable to create the new user").with_detail(constraint)
            }
            AuthError::Store(inner) => ApiError::internal(inner),
        }
    }
}

impl From<PostError> for ApiError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::EmptyTitle | PostError::EmptyContent | PostError::TooManyCategories(_) => {
                ApiError::bad_request(err.to_string())
            }
            PostError::NotFound(_) => ApiError::internal(err),
            PostError::Store(StoreError::Conflict(constraint)) => {
                ApiError::bad_request("the post could not be saved").with_detail(constraint)
            }
            PostError::Store(inner) => ApiError::internal(inner),
        }
    }
}
