use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Application Schemas (Mapped to Database) ---
//
// Timestamps are epoch milliseconds. A non-zero `delete_at` marks a row as
// soft-deleted; such rows are invisible to every lookup.

/// User
///
/// A registered account in the `users` table. Credentials and the auth
/// provider tag are never serialized.
#[derive(Debug, Clone, Serialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip)]
    pub email: String,
    #[serde(skip)]
    pub password: String,
    #[serde(skip)]
    pub auth_service: String,
    #[sqlx(json)]
    #[ts(type = "Record<string, unknown>")]
    #[schema(value_type = Object)]
    pub props: HashMap<String, serde_json::Value>,
    pub create_at: i64,
    pub update_at: i64,
    pub delete_at: i64,
}

/// Category
///
/// A named category in the `categories` table. Names are unique.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub create_at: i64,
}

/// Post
///
/// A post in the `posts` table. The slug is unique per owning user.
/// `categories` is not a column; it is filled from `post_categories` on read.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub sub_title: String,
    pub content: String,
    #[sqlx(skip)]
    pub categories: Vec<String>,
    pub publishing_at: i64,
    pub cover_image: String,
    pub disabled_comment: bool,
    pub user_id: String,
    pub create_at: i64,
    pub update_at: i64,
    pub delete_at: i64,
}

/// PostCategory
///
/// Join row between a post and a category. `(post_id, category_id)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default, PartialEq)]
pub struct PostCategory {
    pub id: String,
    pub post_id: String,
    pub category_id: String,
}

/// Team
///
/// The root team only exists to hold the signup token gating registration.
#[derive(Debug, Clone, Serialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub signup_token: String,
    pub modified_by: String,
    pub update_at: i64,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
///
/// Input payload for POST /api/v1/auth/login. `type` must be "normal".
/// Either `username` or `email` identifies the account.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(default)]
pub struct LoginRequest {
    #[serde(rename = "type")]
    pub login_type: String,
    pub username: String,
    pub email: String,
    pub password: String,
    // Accepted for compatibility; MFA is not enforced.
    pub mfa_token: String,
}

/// LoginResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
}

/// RegisterRequest
///
/// Input payload for POST /api/v1/auth/register. `token` is the optional
/// signup token of the root team.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// CreatePostRequest
///
/// Input payload for POST /api/v1/posts. An empty `slug` is generated from
/// the title.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(default)]
pub struct CreatePostRequest {
    pub title: String,
    pub slug: String,
    pub sub_title: String,
    pub content: String,
    pub categories: Vec<String>,
    pub publishing_at: i64,
    pub cover_image: String,
    pub disabled_comment: bool,
}

// --- Output Schemas ---

/// ErrorResponse
///
/// Shared envelope for every error response. `errorCode` stays 0 unless a
/// domain-specific code applies.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(rename = "errorCode")]
    pub error_code: i32,
}
