//! Postgres-backed repository tests. They need a reachable `DATABASE_URL`
//! and run with `cargo test -- --ignored`. Every test works in its own table
//! prefix so runs never see each other's rows.

use std::collections::HashMap;

use postline::{
    PostgresRepository,
    ids::{IdType, new_id},
    models::{Category, Post, PostCategory, Team, User},
    reference::find_or_create_categories,
    repository::Repository,
};
use sqlx::PgPool;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
    prefix: String,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        let prefix = format!("t{}_", &uuid::Uuid::new_v4().simple().to_string()[..12]);
        DbTestContext { pool, prefix }
    }

    async fn repository(&self) -> PostgresRepository {
        let repo = PostgresRepository::new(self.pool.clone(), self.prefix.clone());
        repo.migrate().await.expect("Failed to create schema.");
        repo
    }
}

// --- Test Data Helpers ---

fn user(username: &str) -> User {
    let now = chrono::Utc::now().timestamp_millis();
    User {
        id: new_id(IdType::User),
        username: username.to_string(),
        email: format!("{username}@test.com"),
        password: "$argon2id$placeholder".to_string(),
        auth_service: "native".to_string(),
        props: HashMap::from([("theme".to_string(), serde_json::json!("dark"))]),
        create_at: now,
        update_at: now,
        delete_at: 0,
    }
}

fn post(user_id: &str, slug: &str) -> Post {
    Post {
        id: new_id(IdType::Post),
        title: "Integration".into(),
        slug: slug.into(),
        content: "content".into(),
        user_id: user_id.into(),
        ..Default::default()
    }
}

// --- Tests ---

#[tokio::test]
#[ignore]
async fn test_migrate_is_repeatable() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository().await;
    repo.migrate().await.unwrap();
    assert_eq!(repo.get_registered_user_count().await.unwrap(), 0);
}

#[tokio::test]
#[ignore]
async fn test_user_round_trip_and_live_uniqueness() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository().await;

    let alice = user("alice");
    repo.create_user(&alice).await.unwrap();

    let by_name = repo.get_user_by_username("alice").await.unwrap().unwrap();
    assert_eq!(by_name, alice);
    let by_email = repo.get_user_by_email("alice@test.com").await.unwrap().unwrap();
    assert_eq!(by_email.id, alice.id);
    assert_eq!(repo.get_registered_user_count().await.unwrap(), 1);

    let err = repo.create_user(&user("alice")).await.unwrap_err();
    assert!(err.is_conflict());

    // Soft deletion frees the username for a new live row.
    assert!(repo.soft_delete_user(&alice.id).await.unwrap());
    assert!(repo.get_user_by_id(&alice.id).await.unwrap().is_none());
    assert_eq!(repo.get_registered_user_count().await.unwrap(), 0);
    repo.create_user(&user("alice")).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_team_upsert_replaces_token() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository().await;
    assert!(repo.get_team("0").await.unwrap().is_none());

    let mut team = Team {
        id: "0".into(),
        signup_token: new_id(IdType::Token),
        modified_by: String::new(),
        update_at: 1,
    };
    repo.upsert_team_signup_token(&team).await.unwrap();

    team.signup_token = new_id(IdType::Token);
    team.modified_by = "u1".into();
    team.update_at = 2;
    repo.upsert_team_signup_token(&team).await.unwrap();

    assert_eq!(repo.get_team("0").await.unwrap().unwrap(), team);
}

#[tokio::test]
#[ignore]
async fn test_post_slug_unique_per_owner() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository().await;

    let first = post("u1", "hello");
    repo.insert_post(&first).await.unwrap();
    repo.insert_post(&post("u2", "hello")).await.unwrap();

    let err = repo.insert_post(&post("u1", "hello")).await.unwrap_err();
    assert!(err.is_conflict());

    assert_eq!(
        repo.find_post_slug("hello", "u1").await.unwrap().as_deref(),
        Some("hello")
    );
    let stored = repo.get_post(&first.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Integration");
    assert!(stored.categories.is_empty());
}

#[tokio::test]
#[ignore]
async fn test_category_and_link_uniqueness() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository().await;

    let rust = Category {
        id: new_id(IdType::Category),
        name: "rust".into(),
        create_at: 1,
    };
    repo.insert_categories(std::slice::from_ref(&rust))
        .await
        .unwrap();

    let clash = Category {
        id: new_id(IdType::Category),
        name: "rust".into(),
        create_at: 2,
    };
    assert!(repo.insert_categories(&[clash]).await.unwrap_err().is_conflict());

    let resolved = find_or_create_categories(&repo, &["rust".into(), "db".into()])
        .await
        .unwrap();
    assert_eq!(resolved.len(), 2);

    let owner = post("u1", "tagged");
    repo.insert_post(&owner).await.unwrap();
    let link = PostCategory {
        id: new_id(IdType::PostCategory),
        post_id: owner.id.clone(),
        category_id: rust.id.clone(),
    };
    repo.insert_post_category(&link).await.unwrap();
    let again = PostCategory {
        id: new_id(IdType::PostCategory),
        ..link.clone()
    };
    assert!(repo.insert_post_category(&again).await.unwrap_err().is_conflict());

    assert_eq!(
        repo.get_post_category(&owner.id, &rust.id).await.unwrap(),
        Some(link)
    );
    assert_eq!(
        repo.get_categories_for_post(&owner.id).await.unwrap(),
        vec![rust]
    );
}

#[tokio::test]
#[ignore]
async fn test_create_first_user_admits_one_concurrent_writer() {
    let ctx = DbTestContext::setup().await;
    let repo = std::sync::Arc::new(ctx.repository().await);

    let mut handles = Vec::new();
    for i in 0..4 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.create_first_user(&user(&format!("founder{i}"))).await
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(repo.get_registered_user_count().await.unwrap(), 1);
    assert!(!repo.create_first_user(&user("late")).await.unwrap());
}
