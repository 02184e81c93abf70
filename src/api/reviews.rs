use crate::api::reviews::schemas::PublicReview;
use crate::api::{ApiJson, ApiResponse};
use crate::core::traits::ReviewService;
use crate::core::validation::ReviewSubmission;
use crate::error::AppResult;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use di_axum::Inject;

pub fn router() -> Router {
    Router::new().route("/", get(list_reviews).post(submit_review))
}

async fn submit_review(
    Inject(review_service): Inject<dyn ReviewService>,
    ApiJson(submission): ApiJson<ReviewSubmission>,
) -> AppResult<(StatusCode, Json<ApiResponse<PublicReview>>)> {
    let review = review_service.submit_review(submission).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("후기가 등록되었습니다. 승인 후 게시됩니다", review.into()),
    ))
}

async fn list_reviews(
    Inject(review_service): Inject<dyn ReviewService>,
) -> AppResult<Json<ApiResponse<Vec<PublicReview>>>> {
    let reviews = review_service.list_public().await?;

    Ok(ApiResponse::ok(
        reviews.into_iter().map(PublicReview::from).collect(),
    ))
}

pub mod schemas {
    use crate::infrastructure::entities;
    use chrono::{DateTime, Utc};
    use serde::Serialize;
    use uuid::Uuid;

    /// What visitors see of a review. Moderation fields stay internal.
    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct PublicReview {
        pub id: Uuid,
        pub author_name: String,
        pub resident_name: Option<String>,
        pub rating: i64,
        pub content: String,
        pub is_featured: bool,
        pub created_at: DateTime<Utc>,
    }

    impl From<entities::Review> for PublicReview {
        fn from(review: entities::Review) -> Self {
            PublicReview {
                id: review.id,
                author_name: review.author_name,
                resident_name: review.resident_name,
                rating: review.rating,
                content: review.content,
                is_featured: review.is_featured,
                created_at: review.created_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Review {
        pub id: Uuid,
        pub author_name: String,
        pub resident_name: Option<String>,
        pub rating: i64,
        pub content: String,
        pub is_approved: bool,
        pub is_featured: bool,
        pub approved_at: Option<DateTime<Utc>>,
        pub approved_by: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl From<entities::Review> for Review {
        fn from(review: entities::Review) -> Self {
            Review {
                id: review.id,
                author_name: review.author_name,
                resident_name: review.resident_name,
                rating: review.rating,
                content: review.content,
                is_approved: review.is_approved,
                is_featured: review.is_featured,
                approved_at: review.approved_at,
                approved_by: review.approved_by,
                created_at: review.created_at,
                updated_at: review.updated_at,
            }
        }
    }
}
