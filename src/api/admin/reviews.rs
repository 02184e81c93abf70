use crate::api::admin::reviews::schemas::UpdateReview;
use crate::api::admin::{DELETED, Deleted};
use crate::api::reviews::schemas::Review;
use crate::api::{ApiJson, ApiPath, ApiResponse, ExtractUser};
use crate::core::services::ReviewPatch;
use crate::core::traits::ReviewService;
use crate::error::AppResult;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_reviews))
        .route(
            "/:id",
            get(get_review).put(update_review).delete(delete_review),
        )
}

async fn list_reviews(
    Inject(review_service): Inject<dyn ReviewService>,
    ExtractUser(user): ExtractUser,
) -> AppResult<Json<ApiResponse<Vec<Review>>>> {
    let reviews = review_service.list_reviews(&user).await?;

    Ok(ApiResponse::ok(reviews.into_iter().map(Review::from).collect()))
}

async fn get_review(
    Inject(review_service): Inject<dyn ReviewService>,
    ExtractUser(user): ExtractUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let review = review_service.get_review(&user, id).await?;

    Ok(ApiResponse::ok(review.into()))
}

async fn update_review(
    Inject(review_service): Inject<dyn ReviewService>,
    ExtractUser(user): ExtractUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdateReview>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let review = review_service
        .update_review(
            &user,
            id,
            ReviewPatch {
                is_approved: update.is_approved,
                is_featured: update.is_featured,
                content: update.content,
                rating: update.rating,
            },
        )
        .await?;

    Ok(ApiResponse::with_message("저장되었습니다", review.into()))
}

async fn delete_review(
    Inject(review_service): Inject<dyn ReviewService>,
    ExtractUser(user): ExtractUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Deleted>>> {
    review_service.delete_review(&user, id).await?;

    Ok(ApiResponse::with_message(DELETED, Deleted { id }))
}

pub mod schemas {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase", default)]
    pub struct UpdateReview {
        pub is_approved: Option<bool>,
        pub is_featured: Option<bool>,
        pub content: Option<String>,
        pub rating: Option<i64>,
    }
}
