#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use postline::{
    AppConfig, AppState, MemoryRepository, create_router,
    audit::{AuditRecord, AuditSink},
    auth::password,
    ids::{IdType, new_id},
    models::{Category, Post, PostCategory, Team, User},
    repository::{Repository, RepositoryState, StoreError},
};
use serde_json::Value;
use tower::ServiceExt;

/// Collects audit records so tests can assert on them.
#[derive(Default)]
pub struct RecordingAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl RecordingAuditSink {
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn record(&self, record: AuditRecord) {
        self.records.lock().unwrap().push(record);
    }
}

/// TestRepository
///
/// Wraps the in-memory store with fault injection for tests: a failing
/// switch, a "concurrent writer" that commits category names right before the
/// next category insert, and a switch hiding users from name/email lookups so
/// the store's unique constraints are the only line of defence.
#[derive(Default)]
pub struct TestRepository {
    inner: MemoryRepository,
    failing: AtomicBool,
    blind_user_lookups: AtomicBool,
    preempted_categories: Mutex<Vec<String>>,
}

impl TestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_blind_user_lookups(&self, blind: bool) {
        self.blind_user_lookups.store(blind, Ordering::SeqCst);
    }

    /// `name` is committed right before the next `insert_categories` call,
    /// after the caller's lookup.
    pub fn preempt_category_insert(&self, name: &str) {
        self.preempted_categories
            .lock()
            .unwrap()
            .push(name.to_string());
    }

    /// Number of category rows with this exact name.
    pub async fn category_rows_named(&self, name: &str) -> usize {
        self.inner
            .get_categories_by_names(&[name.to_string()])
            .await
            .unwrap()
            .len()
    }

    /// Number of join rows for this post.
    pub async fn post_category_rows(&self, post_id: &str) -> usize {
        self.inner
            .get_categories_for_post(post_id)
            .await
            .unwrap()
            .len()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("test store is failing".into()));
        }
        Ok(())
    }

    fn lookups_hidden(&self) -> bool {
        self.blind_user_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Repository for TestRepository {
    async fn migrate(&self) -> Result<(), StoreError> {
        self.check()?;
        self.inner.migrate().await
    }
    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.check()?;
        self.inner.get_user_by_id(id).await
    }
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.check()?;
        if self.lookups_hidden() {
            return Ok(None);
        }
        self.inner.get_user_by_username(username).await
    }
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check()?;
        if self.lookups_hidden() {
            return Ok(None);
        }
        self.inner.get_user_by_email(email).await
    }
    async fn get_registered_user_count(&self) -> Result<i64, StoreError> {
        self.check()?;
        self.inner.get_registered_user_count().await
    }
    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        self.check()?;
        self.inner.create_user(user).await
    }
    async fn create_first_user(&self, user: &User) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.create_first_user(user).await
    }
    async fn soft_delete_user(&self, id: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.soft_delete_user(id).await
    }
    async fn get_team(&self, id: &str) -> Result<Option<Team>, StoreError> {
        self.check()?;
        self.inner.get_team(id).await
    }
    async fn upsert_team_signup_token(&self, team: &Team) -> Result<(), StoreError> {
        self.check()?;
        self.inner.upsert_team_signup_token(team).await
    }
    async fn get_post(&self, id: &str) -> Result<Option<Post>, StoreError> {
        self.check()?;
        self.inner.get_post(id).await
    }
    async fn insert_post(&self, post: &Post) -> Result<(), StoreError> {
        self.check()?;
        self.inner.insert_post(post).await
    }
    async fn find_post_slug(
        &self,
        slug: &str,
        user_id: &str,
    ) -> Result<Option<String>, StoreError> {
        self.check()?;
        self.inner.find_post_slug(slug, user_id).await
    }
    async fn get_categories_by_names(
        &self,
        names: &[String],
    ) -> Result<Vec<Category>, StoreError> {
        self.check()?;
        self.inner.get_categories_by_names(names).await
    }
    async fn insert_categories(&self, categories: &[Category]) -> Result<(), StoreError> {
        self.check()?;
        let preempted = std::mem::take(&mut *self.preempted_categories.lock().unwrap());
        for name in preempted {
            let category = Category {
                id: new_id(IdType::Category),
                name,
                create_at: chrono::Utc::now().timestamp_millis(),
            };
            // Already present is fine; the writer only has to have committed.
            let _ = self.inner.insert_categories(&[category]).await;
        }
        self.inner.insert_categories(categories).await
    }
    async fn get_categories_for_post(&self, post_id: &str) -> Result<Vec<Category>, StoreError> {
        self.check()?;
        self.inner.get_categories_for_post(post_id).await
    }
    async fn get_post_category(
        &self,
        post_id: &str,
        category_id: &str,
    ) -> Result<Option<PostCategory>, StoreError> {
        self.check()?;
        self.inner.get_post_category(post_id, category_id).await
    }
    async fn insert_post_category(&self, link: &PostCategory) -> Result<(), StoreError> {
        self.check()?;
        self.inner.insert_post_category(link).await
    }
}

pub struct TestContext {
    pub repo: Arc<TestRepository>,
    pub audit: Arc<RecordingAuditSink>,
    pub state: AppState,
    pub router: Router,
}

pub fn test_context() -> TestContext {
    test_context_with(AppConfig::default())
}

pub fn test_context_with(config: AppConfig) -> TestContext {
    let repo = Arc::new(TestRepository::new());
    let audit = Arc::new(RecordingAuditSink::default());
    let state = AppState::new(repo.clone() as RepositoryState, audit.clone(), config);
    let router = create_router(state.clone());
    TestContext {
        repo,
        audit,
        state,
        router,
    }
}

/// Inserts a live user directly into the store.
pub async fn seed_user(
    repo: &dyn Repository,
    username: &str,
    plain_password: &str,
    auth_service: &str,
) -> User {
    let now = chrono::Utc::now().timestamp_millis();
    let user = User {
        id: new_id(IdType::User),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password: password::hash(plain_password).unwrap(),
        auth_service: auth_service.to_string(),
        props: HashMap::new(),
        create_at: now,
        update_at: now,
        delete_at: 0,
    };
    repo.create_user(&user).await.unwrap();
    user
}

/// A request carrying the CSRF marker, with an optional JSON body.
pub fn api_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Requested-With", "XMLHttpRequest");
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn with_bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    request
}

pub fn with_cookie(mut request: Request<Body>, token: &str) -> Request<Body> {
    request.headers_mut().insert(
        header::COOKIE,
        format!("auth_token={token}").parse().unwrap(),
    );
    request
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Drives the router once and decodes the body as JSON (`Null` if empty or
/// not JSON).
pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    TestResponse {
        status,
        headers,
        body,
    }
}
