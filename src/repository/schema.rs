/// schema_statements
///
/// DDL for every table, with `prefix` prepended to table, index and
/// constraint names. Each statement is idempotent.
pub fn schema_statements(prefix: &str) -> Vec<String> {
    vec![
        format!(
            r#"CREATE TABLE IF NOT EXISTS {prefix}users (
                id VARCHAR(36) PRIMARY KEY,
                username VARCHAR(100) NOT NULL,
                email VARCHAR(255) NOT NULL,
                password VARCHAR(255) NOT NULL,
                auth_service VARCHAR(32) NOT NULL DEFAULT '',
                props JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                create_at BIGINT NOT NULL,
                update_at BIGINT NOT NULL,
                delete_at BIGINT NOT NULL DEFAULT 0
            )"#
        ),
        // Uniqueness only binds live users, so a soft-deleted name can be reused.
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {prefix}users_username_live_key \
             ON {prefix}users (username) WHERE delete_at = 0"
        ),
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {prefix}users_email_live_key \
             ON {prefix}users (email) WHERE delete_at = 0"
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {prefix}teams (
                id VARCHAR(36) PRIMARY KEY,
                signup_token VARCHAR(100) NOT NULL,
                modified_by VARCHAR(36) NOT NULL DEFAULT '',
                update_at BIGINT NOT NULL DEFAULT 0
            )"#
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {prefix}categories (
                id VARCHAR(36) PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                create_at BIGINT NOT NULL,
                CONSTRAINT {prefix}categories_name_key UNIQUE (name)
            )"#
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {prefix}posts (
                id VARCHAR(36) PRIMARY KEY,
                title TEXT NOT NULL,
                slug VARCHAR(255) NOT NULL,
                sub_title TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL,
                publishing_at BIGINT NOT NULL DEFAULT 0,
                cover_image TEXT NOT NULL DEFAULT '',
                disabled_comment BOOLEAN NOT NULL DEFAULT FALSE,
                user_id VARCHAR(36) NOT NULL,
                create_at BIGINT NOT NULL,
                update_at BIGINT NOT NULL,
                delete_at BIGINT NOT NULL DEFAULT 0
            )"#
        ),
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {prefix}posts_user_slug_live_key \
             ON {prefix}posts (user_id, slug) WHERE delete_at = 0"
        ),
        format!(
            r#"CREATE TABLE IF NOT EXISTS {prefix}post_categories (
                id VARCHAR(36) PRIMARY KEY,
                post_id VARCHAR(36) NOT NULL,
                category_id VARCHAR(36) NOT NULL,
                CONSTRAINT {prefix}post_categories_pair_key UNIQUE (post_id, category_id)
            )"#
        ),
    ]
}
