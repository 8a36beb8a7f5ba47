use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{
        self, AddCommentRequest, AddTagRequest, CommentResponse, CreateProductRequest,
        FeatureResponse, InsertedResponse, MessageResponse, Product, ProductPage, ProductStatus,
        StatusUpdateRequest, StatusUpdateResponse, TagResponse, UpvoteResponse,
    },
    repository::VoteOutcome,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

/// Default page size of the public catalogue.
pub const DEFAULT_PAGE_SIZE: i64 = 6;
/// Size of the featured and trending showcases.
pub const SHOWCASE_LIMIT: i64 = 6;

/// ProductFilter
///
/// Query parameters of the public catalogue (GET /products).
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ProductFilter {
    /// 1-based page number. Defaults to 1.
    pub page: Option<i64>,
    /// Page size. Defaults to 6.
    pub limit: Option<i64>,
    /// Case-insensitive substring matched against the product name.
    pub search: Option<String>,
}

/// create_product
///
/// [Authenticated Route] Submits a new product. It always enters the moderation
/// queue as `Pending` with no votes, comments or reports, whatever the client sent.
#[utoipa::path(
    post,
    path = "/products/add-product",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Created", body = InsertedResponse),
        (status = 400, description = "Missing name, ownerName or ownerEmail")
    )
)]
pub async fn create_product(
    AuthUser { email, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<InsertedResponse>), AppError> {
    let new_product = payload.validate()?;
    let product = state.repo.insert_product(new_product).await?;

    tracing::info!(product_id = %product.id, submitted_by = %email, "product submitted");
    Ok((
        StatusCode::CREATED,
        Json(InsertedResponse {
            inserted_id: product.id,
        }),
    ))
}

/// get_products
///
/// [Public Route] One page of accepted products, newest first, optionally
/// filtered by name. `totalPages` is `ceil(matching / limit)`.
#[utoipa::path(
    get,
    path = "/products",
    params(ProductFilter),
    responses(
        (status = 200, description = "Page of accepted products", body = ProductPage),
        (status = 400, description = "page or limit below 1, or page out of range")
    )
)]
pub async fn get_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<ProductPage>, AppError> {
    let page = filter.page.unwrap_or(1);
    let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if page < 1 || limit < 1 {
        return Err(AppError::validation("page and limit must be at least 1"));
    }
    let offset = (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| AppError::validation("page is out of range"))?;

    let (products, total) = state
        .repo
        .accepted_page(filter.search.as_deref(), offset, limit)
        .await?;

    Ok(Json(ProductPage {
        products,
        total_pages: total_pages(total, limit),
    }))
}

/// ceil(total / limit) for a positive limit, without overflowing on huge limits.
pub fn total_pages(total: i64, limit: i64) -> i64 {
    total / limit + i64::from(total % limit != 0)
}

/// get_moderation_queue
///
/// [Authenticated Route] Every product regardless of status, newest first.
/// Any valid token is accepted; no role is checked.
#[utoipa::path(
    get,
    path = "/products/moderator-review",
    responses((status = 200, description = "All products", body = [Product]))
)]
pub async fn get_moderation_queue(
    State(state): State<AppState>,
) -> Result<Json<Vec<models::Product>>, AppError> {
    Ok(Json(state.repo.all_products().await?))
}

/// get_featured_products
///
/// [Public Route] Up to six accepted, featured products, newest first.
#[utoipa::path(
    get,
    path = "/products/featured-products",
    responses((status = 200, description = "Featured products", body = [Product]))
)]
pub async fn get_featured_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<models::Product>>, AppError> {
    Ok(Json(state.repo.featured_products(SHOWCASE_LIMIT).await?))
}

/// get_trending_products
///
/// [Public Route] Up to six accepted products ranked by vote count.
#[utoipa::path(
    get,
    path = "/products/trending",
    responses((status = 200, description = "Trending products", body = [Product]))
)]
pub async fn get_trending_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<models::Product>>, AppError> {
    Ok(Json(state.repo.trending_products(SHOWCASE_LIMIT).await?))
}

/// get_product_details
///
/// [Public Route] A single product by id, whatever its status.
#[utoipa::path(
    get,
    path = "/products/single/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Found", body = Product),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_product_details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<models::Product>, AppError> {
    state
        .repo
        .get_product(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Product"))
}

/// get_products_by_owner
///
/// [Authenticated Route] Every product submitted under `email`, any status.
#[utoipa::path(
    get,
    path = "/products/user/{email}",
    params(("email" = String, Path, description = "Owner email")),
    responses((status = 200, description = "Owner's products", body = [Product]))
)]
pub async fn get_products_by_owner(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Vec<models::Product>>, AppError> {
    Ok(Json(state.repo.products_by_owner(&email).await?))
}

/// get_reported_products
///
/// [Authenticated Route] Products with at least one report.
#[utoipa::path(
    get,
    path = "/products/reported",
    responses((status = 200, description = "Reported products", body = [Product]))
)]
pub async fn get_reported_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<models::Product>>, AppError> {
    Ok(Json(state.repo.reported_products().await?))
}

/// update_product_status
///
/// [Authenticated Route] Moderation decision. Only `Accepted` and `Rejected` are
/// valid targets; anything else is a 400 and the record is left untouched.
#[utoipa::path(
    patch,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Updated", body = StatusUpdateResponse),
        (status = 400, description = "Invalid status"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_product_status(
    AuthUser { email, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>, AppError> {
    let status = payload
        .status
        .as_deref()
        .and_then(ProductStatus::moderation_target)
        .ok_or_else(|| AppError::validation("Invalid status. Must be 'Accepted' or 'Rejected'."))?;

    let updated_product = state
        .repo
        .set_status(id, status)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    tracing::info!(product_id = %id, status = status.as_str(), moderator = %email, "product moderated");
    Ok(Json(StatusUpdateResponse {
        message: format!("Product {} successfully", status.as_str().to_lowercase()),
        updated_product,
    }))
}

/// mark_as_featured
///
/// [Authenticated Route] Sets `isFeatured`. There is no way to clear it.
#[utoipa::path(
    patch,
    path = "/products/mark-as-featured/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Featured", body = FeatureResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn mark_as_featured(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FeatureResponse>, AppError> {
    let product = state
        .repo
        .mark_featured(id)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    Ok(Json(FeatureResponse {
        message: "Product marked as featured".to_string(),
        product,
    }))
}

/// delete_product
///
/// [Authenticated Route] Physically removes a product.
#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_product(
    AuthUser { email, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    if !state.repo.delete_product(id).await? {
        return Err(AppError::NotFound("Product"));
    }

    tracing::info!(product_id = %id, deleted_by = %email, "product deleted");
    Ok(Json(MessageResponse::new("Product deleted successfully")))
}

/// upvote_product
///
/// [Authenticated Route] Casts the caller's single vote. The voter is the email
/// from the verified token, never from the body. A second vote by the same
/// identity is rejected and leaves the count unchanged.
#[utoipa::path(
    patch,
    path = "/products/upvote/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Voted", body = UpvoteResponse),
        (status = 400, description = "Already voted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn upvote_product(
    AuthUser { email, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UpvoteResponse>, AppError> {
    match state.repo.upvote(id, &email).await? {
        VoteOutcome::Recorded(votes) => Ok(Json(UpvoteResponse {
            message: "Upvoted!".to_string(),
            votes,
        })),
        VoteOutcome::Duplicate => Err(AppError::Conflict("You already voted".to_string())),
        VoteOutcome::Missing => Err(AppError::NotFound("Product")),
    }
}

/// add_comment
///
/// [Authenticated Route] Appends a comment. Empty text is rejected before the
/// product is looked up.
#[utoipa::path(
    post,
    path = "/products/{id}/comment",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = AddCommentRequest,
    responses(
        (status = 200, description = "Comment Added", body = CommentResponse),
        (status = 400, description = "Empty comment"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn add_comment(
    AuthUser { email, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddCommentRequest>,
) -> Result<Json<CommentResponse>, AppError> {
    let comment = payload.into_comment()?;

    if !state.repo.push_comment(id, comment.clone()).await? {
        return Err(AppError::NotFound("Product"));
    }

    tracing::debug!(product_id = %id, commenter = %email, "comment added");
    Ok(Json(CommentResponse {
        message: "Comment added".to_string(),
        comment,
    }))
}

/// add_tag
///
/// [Authenticated Route] Adds a normalized (trimmed, lowercased) tag. Adding a tag
/// that already exists in any casing is a successful no-op.
#[utoipa::path(
    patch,
    path = "/products/{id}/add-tag",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = AddTagRequest,
    responses(
        (status = 200, description = "Added or already present", body = TagResponse),
        (status = 400, description = "Empty or too long"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn add_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddTagRequest>,
) -> Result<Json<TagResponse>, AppError> {
    let tag = models::normalize_tag(payload.tag.as_deref().unwrap_or_default())?;

    let outcome = state
        .repo
        .add_tag(id, &tag)
        .await?
        .ok_or(AppError::NotFound("Product"))?;

    let message = if outcome.added {
        "Tag added successfully"
    } else {
        "Tag already exists"
    };
    Ok(Json(TagResponse {
        message: message.to_string(),
        tags: outcome.tags,
    }))
}

/// report_product
///
/// [Authenticated Route] Flags a product for moderator attention. One report per
/// identity; the reporter is the email from the verified token.
#[utoipa::path(
    post,
    path = "/products/{id}/report",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Reported", body = MessageResponse),
        (status = 400, description = "Already reported"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn report_product(
    AuthUser { email, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    match state.repo.report(id, &email).await? {
        VoteOutcome::Recorded(count) => {
            tracing::info!(product_id = %id, reports = count, "product reported");
            Ok(Json(MessageResponse::new("Product reported")))
        }
        VoteOutcome::Duplicate => Err(AppError::Conflict(
            "You already reported this product".to_string(),
        )),
        VoteOutcome::Missing => Err(AppError::NotFound("Product")),
    }
}
