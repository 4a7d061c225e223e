use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};

use super::{Repository, StoreError, schema::schema_statements};
use crate::models::{Category, Post, PostCategory, Team, User};

const USER_COLUMNS: &str =
    "id, username, email, password, auth_service, props, create_at, update_at, delete_at";
const POST_COLUMNS: &str = "id, title, slug, sub_title, content, publishing_at, cover_image, \
     disabled_comment, user_id, create_at, update_at, delete_at";
const CATEGORY_COLUMNS: &str = "id, name, create_at";

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Every table name carries the configured prefix.
pub struct PostgresRepository {
    pool: PgPool,
    prefix: String,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool, table_prefix: impl Into<String>) -> Self {
        Self {
            pool,
            prefix: table_prefix.into(),
        }
    }

    fn table(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    async fn get_user_where(&self, column: &str, value: &str) -> Result<Option<User>, StoreError> {
        let query = format!(
            "SELECT {USER_COLUMNS} FROM {} WHERE delete_at = 0 AND {column} = $1",
            self.table("users")
        );
        sqlx::query_as::<_, User>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("get_user_where({column}) error: {:?}", e);
                StoreError::from(e)
            })
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// migrate
    ///
    /// Runs the prefix-templated schema statements in order.
    async fn migrate(&self) -> Result<(), StoreError> {
        for statement in schema_statements(&self.prefix) {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        tracing::info!(prefix = %self.prefix, "database schema is up to date");
        Ok(())
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.get_user_where("id", id).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.get_user_where("username", username).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.get_user_where("email", email).await
    }

    async fn get_registered_user_count(&self) -> Result<i64, StoreError> {
        let query = format!(
            "SELECT COUNT(*) FROM {} WHERE delete_at = 0",
            self.table("users")
        );
        Ok(sqlx::query_scalar::<_, i64>(&query)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let query = format!(
            "INSERT INTO {} ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            self.table("users")
        );
        sqlx::query(&query)
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password)
            .bind(&user.auth_service)
            .bind(sqlx::types::Json(&user.props))
            .bind(user.create_at)
            .bind(user.update_at)
            .bind(user.delete_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// create_first_user
    ///
    /// Bootstrap attempts serialize on a transaction-scoped advisory lock, so
    /// two concurrent first registrations cannot both see an empty table.
    async fn create_first_user(&self, user: &User) -> Result<bool, StoreError> {
        let users = self.table("users");
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(format!("{users}_bootstrap"))
            .execute(&mut *tx)
            .await?;

        let query = format!(
            "INSERT INTO {users} ({USER_COLUMNS}) \
             SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9 \
             WHERE NOT EXISTS (SELECT 1 FROM {users} WHERE delete_at = 0)"
        );
        let result = sqlx::query(&query)
            .bind(&user.id)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password)
            .bind(&user.auth_service)
            .bind(sqlx::types::Json(&user.props))
            .bind(user.create_at)
            .bind(user.update_at)
            .bind(user.delete_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() == 1)
    }

    /// soft_delete_user
    ///
    /// Stamps `delete_at`; the row is kept.
    async fn soft_delete_user(&self, id: &str) -> Result<bool, StoreError> {
        let now = chrono::Utc::now().timestamp_millis();
        let query = format!(
            "UPDATE {} SET delete_at = $1, update_at = $1 WHERE id = $2 AND delete_at = 0",
            self.table("users")
        );
        let result = sqlx::query(&query)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_team(&self, id: &str) -> Result<Option<Team>, StoreError> {
        let query = format!(
            "SELECT id, signup_token, modified_by, update_at FROM {} WHERE id = $1",
            self.table("teams")
        );
        Ok(sqlx::query_as::<_, Team>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn upsert_team_signup_token(&self, team: &Team) -> Result<(), StoreError> {
        let query = format!(
            "INSERT INTO {} (id, signup_token, modified_by, update_at) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET signup_token = EXCLUDED.signup_token, \
             modified_by = EXCLUDED.modified_by, update_at = EXCLUDED.update_at",
            self.table("teams")
        );
        sqlx::query(&query)
            .bind(&team.id)
            .bind(&team.signup_token)
            .bind(&team.modified_by)
            .bind(team.update_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        let query = format!(
            "SELECT {POST_COLUMNS} FROM {} WHERE id = $1 AND delete_at = 0",
            self.table("posts")
        );
        sqlx::query_as::<_, Post>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("get_post error: {:?}", e);
                StoreError::from(e)
            })
    }

    async fn insert_post(&self, post: &Post) -> Result<(), StoreError> {
        let query = format!(
            "INSERT INTO {} ({POST_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            self.table("posts")
        );
        sqlx::query(&query)
            .bind(&post.id)
            .bind(&post.title)
            .bind(&post.slug)
            .bind(&post.sub_title)
            .bind(&post.content)
            .bind(post.publishing_at)
            .bind(&post.cover_image)
            .bind(post.disabled_comment)
            .bind(&post.user_id)
            .bind(post.create_at)
            .bind(post.update_at)
            .bind(post.delete_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_post_slug(
        &self,
        slug: &str,
        user_id: &str,
    ) -> Result<Option<String>, StoreError> {
        let query = format!(
            "SELECT slug FROM {} WHERE user_id = $1 AND slug = $2 AND slug <> '' \
             AND delete_at = 0 LIMIT 1",
            self.table("posts")
        );
        Ok(sqlx::query_scalar::<_, String>(&query)
            .bind(user_id)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_categories_by_names(
        &self,
        names: &[String],
    ) -> Result<Vec<Category>, StoreError> {
        if names.is_empty() {
            return Ok(vec![]);
        }
        let query = format!(
            "SELECT {CATEGORY_COLUMNS} FROM {} WHERE name = ANY($1) ORDER BY name",
            self.table("categories")
        );
        Ok(sqlx::query_as::<_, Category>(&query)
            .bind(names.to_vec())
            .fetch_all(&self.pool)
            .await?)
    }

    /// insert_categories
    ///
    /// Single multi-row INSERT built with `QueryBuilder`, so the batch is
    /// atomic: a unique violation on any name rejects every row.
    async fn insert_categories(&self, categories: &[Category]) -> Result<(), StoreError> {
        if categories.is_empty() {
            return Ok(());
        }
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} ({CATEGORY_COLUMNS}) ",
            self.table("categories")
        ));
        builder.push_values(categories, |mut row, category| {
            row.push_bind(category.id.clone())
                .push_bind(category.name.clone())
                .push_bind(category.create_at);
        });
        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn get_categories_for_post(&self, post_id: &str) -> Result<Vec<Category>, StoreError> {
        let query = format!(
            "SELECT c.id, c.name, c.create_at FROM {} c \
             JOIN {} pc ON pc.category_id = c.id \
             WHERE pc.post_id = $1 ORDER BY c.name",
            self.table("categories"),
            self.table("post_categories")
        );
        Ok(sqlx::query_as::<_, Category>(&query)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_post_category(
        &self,
        post_id: &str,
        category_id: &str,
    ) -> Result<Option<PostCategory>, StoreError> {
        let query = format!(
            "SELECT id, post_id, category_id FROM {} WHERE post_id = $1 AND category_id = $2",
            self.table("post_categories")
        );
        Ok(sqlx::query_as::<_, PostCategory>(&query)
            .bind(post_id)
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_post_category(&self, link: &PostCategory) -> Result<(), StoreError> {
        let query = format!(
            "INSERT INTO {} (id, post_id, category_id) VALUES ($1, $2, $3)",
            self.table("post_categories")
        );
        sqlx::query(&query)
            .bind(&link.id)
            .bind(&link.post_id)
            .bind(&link.category_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
