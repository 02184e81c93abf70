use crate::api::{ApiResponse, ExtractUser};
use crate::core::services::DashboardStats;
use crate::core::traits::DashboardService;
use crate::error::AppResult;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new().route("/stats", get(stats))
}

async fn stats(
    Inject(dashboard_service): Inject<dyn DashboardService>,
    ExtractUser(user): ExtractUser,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    Ok(ApiResponse::ok(dashboard_service.stats(&user).await?))
}
