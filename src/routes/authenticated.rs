use crate::{AppState, handlers::products};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Authenticated Router Module
///
/// Routes that require a valid bearer token. The router is wrapped in the
/// `auth_middleware` route layer; handlers that need the caller's identity (the
/// voter, the reporter) also take `AuthUser` directly.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /products/add-product
        // Submits a product into the moderation queue as Pending.
        .route("/products/add-product", post(products::create_product))
        // GET /products/moderator-review
        // Every product regardless of status, newest first.
        .route(
            "/products/moderator-review",
            get(products::get_moderation_queue),
        )
        // GET /products/user/{email}
        // All products submitted under one owner email.
        .route("/products/user/{email}", get(products::get_products_by_owner))
        // GET /products/reported
        // Products with at least one report.
        .route("/products/reported", get(products::get_reported_products))
        // PATCH/DELETE /products/{id}
        // PATCH sets the moderation status (Accepted | Rejected); DELETE removes.
        .route(
            "/products/{id}",
            patch(products::update_product_status).delete(products::delete_product),
        )
        // PATCH /products/mark-as-featured/{id}
        .route(
            "/products/mark-as-featured/{id}",
            patch(products::mark_as_featured),
        )
        // PATCH /products/upvote/{id}
        // One vote per identity per product; a repeat is rejected.
        .route("/products/upvote/{id}", patch(products::upvote_product))
        // PATCH /products/{id}/add-tag
        .route("/products/{id}/add-tag", patch(products::add_tag))
        // POST /products/{id}/comment
        .route("/products/{id}/comment", post(products::add_comment))
        // POST /products/{id}/report
        // One report per identity per product.
        .route("/products/{id}/report", post(products::report_product))
}
