use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
    routing::get,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Identity and access control, and the use cases built on it.
pub mod accounts;
pub mod audit;
pub mod auth;
pub mod config;
pub mod error;
pub mod ids;
pub mod models;
pub mod posts;
pub mod reference;
pub mod repository;

// HTTP surface.
pub mod handlers;
pub mod routes;

use auth::{csrf_guard, guard::panic_layer, require_auth};
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use audit::{AuditSink, AuditState, TracingAuditSink};
pub use auth::TokenService;
pub use config::AppConfig;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every `/api/v1` handler and the schemas they use,
/// served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::register, handlers::get_me, handlers::create_post,
        handlers::get_post, handlers::get_team, handlers::regenerate_signup_token
    ),
    components(
        schemas(
            models::User, models::Post, models::Category, models::Team, models::LoginRequest,
            models::LoginResponse, models::RegisterRequest, models::CreatePostRequest,
            models::ErrorResponse,
        )
    ),
    tags(
        (name = "postline", description = "Postline publishing API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable container for the services every request needs. The
/// token service is built once from the configuration and never changes.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer (Postgres or in-memory).
    pub repo: RepositoryState,
    /// Issues and verifies access tokens.
    pub tokens: Arc<TokenService>,
    /// Receives login and registration audit records.
    pub audit: AuditState,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, audit: AuditState, config: AppConfig) -> Self {
        Self {
            repo,
            tokens: Arc::new(TokenService::from_config(&config)),
            audit,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

/// api_routes
///
/// The `/api/v1` router. Layers run outermost first: panic containment,
/// then the CSRF check, then the per-route session guard.
fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(public::public_routes(state.clone()))
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(state, require_auth)),
        )
        .layer(middleware::from_fn(csrf_guard))
        .layer(panic_layer())
}

/// create_router
///
/// Assembles the application's routing structure, applies global and scoped
/// middleware, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // GET /health
        // Liveness check; outside the CSRF and session layers.
        .route("/health", get(|| async { "ok" }))
        .nest("/api/v1", api_routes(state.clone()))
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: the span carries the request ID, so every
                // log line of a request (panics included) can be correlated.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id on the response.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span from the method, URI and `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
