use crate::{AppState, error::AppError, models::{ProductStatus, StatsResponse}};
use axum::{Json, extract::State};

/// get_stats
///
/// [Public Route] Product counts by status. The four counts are issued
/// concurrently and the first failure aborts the request. `totalReviews` and
/// `totalUsers` are always zero.
#[utoipa::path(
    get,
    path = "/api/stats",
    responses((status = 200, description = "Stats", body = StatsResponse))
)]
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let repo = &state.repo;
    let (total_products, accepted, pending, rejected) = tokio::try_join!(
        repo.count_products(None),
        repo.count_products(Some(ProductStatus::Accepted)),
        repo.count_products(Some(ProductStatus::Pending)),
        repo.count_products(Some(ProductStatus::Rejected)),
    )?;

    Ok(Json(StatsResponse {
        total_products,
        accepted,
        pending,
        rejected,
        total_reviews: 0,
        total_users: 0,
    }))
}
