use crate::{
    AppState,
    handlers::{products, session, stats, users},
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Upper bound on an image upload request body.
const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Public Router Module
///
/// Endpoints that need no token. Catalogue reads only ever expose accepted
/// products, except the single-product lookup, which returns any status.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Plain-text banner.
        .route("/", get(|| async { "AppOrbit Backend is running..." }))
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // --- Product Catalogue ---
        // GET /products?page=&limit=&search=
        // Paginated accepted products, newest first, optional name search.
        .route("/products", get(products::get_products))
        // GET /products/featured-products
        // Up to six accepted products flagged as featured.
        .route(
            "/products/featured-products",
            get(products::get_featured_products),
        )
        // GET /products/trending
        // Up to six accepted products ranked by votes.
        .route("/products/trending", get(products::get_trending_products))
        // GET /products/single/{id}
        .route("/products/single/{id}", get(products::get_product_details))
        // --- Users ---
        // POST /api/users creates on first sign-in, GET /api/users lists everyone.
        .route(
            "/api/users",
            post(users::create_user).get(users::list_users),
        )
        // GET /api/users/role/{email} defaults to "user"; PATCH sets the role.
        // The PATCH is unauthenticated, matching the existing client contract.
        .route(
            "/api/users/role/{email}",
            get(users::get_role).patch(users::update_role),
        )
        // GET /api/users/{email}
        // Role of a known user; 404 when unknown.
        .route("/api/users/{email}", get(users::get_user))
        // GET /api/stats
        .route("/api/stats", get(stats::get_stats))
        // POST /api/jwt
        // Issues the bearer token consumed by the authenticated routes.
        .route("/api/jwt", post(session::issue_jwt))
        // POST /api/upload/upload-image
        // Multipart image upload to object storage.
        .route(
            "/api/upload/upload-image",
            post(session::upload_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
}
