use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
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

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;

// Routing segregated by access level (Public, Authenticated).
pub mod routes;
use auth::AuthUser;
use handlers::{products, session, stats, users};
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        products::create_product, products::get_products, products::get_moderation_queue,
        products::get_featured_products, products::get_trending_products,
        products::get_product_details, products::get_products_by_owner,
        products::get_reported_products, products::update_product_status,
        products::mark_as_featured, products::delete_product, products::upvote_product,
        products::add_comment, products::add_tag, products::report_product,
        users::create_user, users::list_users, users::get_role, users::get_user,
        users::update_role, stats::get_stats, session::issue_jwt, session::upload_image
    ),
    components(
        schemas(
            models::Product, models::ProductStatus, models::PricingType, models::Comment,
            models::User, models::CreateProductRequest, models::StatusUpdateRequest,
            models::CommentInput, models::AddCommentRequest, models::AddTagRequest,
            models::CreateUserRequest, models::RoleUpdateRequest, models::TokenRequest,
            models::MessageResponse, models::InsertedResponse, models::ProductPage,
            models::StatusUpdateResponse, models::FeatureResponse, models::UpvoteResponse,
            models::CommentResponse, models::TagResponse, models::UserCreatedResponse,
            models::RoleResponse, models::RoleUpdateResponse, models::StatsResponse,
            models::TokenResponse, models::ImageUploadResponse,
        )
    ),
    tags(
        (name = "apporbit", description = "AppOrbit product submission and moderation API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, cloneable container of everything a handler needs. Each field is
/// either an `Arc` or an immutable value, so cloning per request is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    /// Object storage for uploaded images.
    pub storage: StorageState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated router. Extracting `AuthUser` rejects the request
/// (401 without a bearer token, 403 with an invalid one) before any handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the routing tree, applies the auth guard to the protected routes and
/// the observability layers to everything.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span with method, uri and the `x-request-id` set by the
/// layer above, so every log line of one request is correlated.
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
