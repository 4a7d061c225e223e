use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Category, Post, PostCategory, Team, User};

mod memory;
mod postgres;
mod schema;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;
pub use schema::schema_statements;

/// StoreError
///
/// Failures surfaced by any `Repository` implementation. Unique-constraint
/// violations are separated from every other database failure so callers
/// can treat a lost insert race as a normal outcome.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unique").to_string();
                return StoreError::Conflict(constraint);
            }
        }
        StoreError::Database(err)
    }
}

/// Repository Trait
///
/// The persistence contract used by the identity, reference-resolution and
/// post use cases. Lookups return `Ok(None)` for absent or soft-deleted rows.
///
/// **Send + Sync + async_trait** are required to share `Arc<dyn Repository>`
/// across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Creates every table and index if missing.
    async fn migrate(&self) -> Result<(), StoreError>;

    // --- Users ---
    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    // Number of non-deleted users.
    async fn get_registered_user_count(&self) -> Result<i64, StoreError>;
    // Fails with `Conflict` if the username or email belongs to a live user.
    async fn create_user(&self, user: &User) -> Result<(), StoreError>;
    // Bootstrap insert: writes `user` only while no live user exists, checked
    // and inserted atomically. Returns false, writing nothing, otherwise.
    async fn create_first_user(&self, user: &User) -> Result<bool, StoreError>;
    // Returns false if no live user had this id.
    async fn soft_delete_user(&self, id: &str) -> Result<bool, StoreError>;

    // --- Teams ---
    async fn get_team(&self, id: &str) -> Result<Option<Team>, StoreError>;
    async fn upsert_team_signup_token(&self, team: &Team) -> Result<(), StoreError>;

    // --- Posts ---
    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError>;
    // Fails with `Conflict` if the owner already has a live post with this slug.
    async fn insert_post(&self, post: &Post) -> Result<(), StoreError>;
    // Returns the slug if `user_id` owns a live post with this non-empty slug.
    async fn find_post_slug(&self, slug: &str, user_id: &str)
    -> Result<Option<String>, StoreError>;

    // --- Categories ---
    async fn get_categories_by_names(&self, names: &[String])
    -> Result<Vec<Category>, StoreError>;
    // All-or-nothing: one conflicting name fails the whole batch with `Conflict`.
    async fn insert_categories(&self, categories: &[Category]) -> Result<(), StoreError>;
    async fn get_categories_for_post(&self, post_id: &str) -> Result<Vec<Category>, StoreError>;
    async fn get_post_category(
        &self,
        post_id: &str,
        category_id: &str,
    ) -> Result<Option<PostCategory>, StoreError>;
    async fn insert_post_category(&self, link: &PostCategory) -> Result<(), StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
