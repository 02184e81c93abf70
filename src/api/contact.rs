//! Contact form endpoint

use crate::api::contact::schemas::Receipt;
use crate::api::{ApiJson, ApiResponse, ClientMeta};
use crate::core::traits::ContactService;
use crate::core::validation::ContactSubmission;
use crate::error::AppResult;
use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::post;
use di_axum::Inject;

pub const ESTIMATED_RESPONSE_TIME: &str = "24시간 이내";

pub fn router() -> Router {
    Router::new().route("/", post(submit_contact))
}

async fn submit_contact(
    Inject(contact_service): Inject<dyn ContactService>,
    ClientMeta(meta): ClientMeta,
    ApiJson(submission): ApiJson<ContactSubmission>,
) -> AppResult<(StatusCode, Json<ApiResponse<Receipt>>)> {
    let inquiry = contact_service.submit(submission, meta).await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message(
            "상담 신청이 접수되었습니다",
            Receipt {
                id: inquiry.id,
                estimated_response_time: ESTIMATED_RESPONSE_TIME,
            },
        ),
    ))
}

pub mod schemas {
    use serde::Serialize;
    use uuid::Uuid;

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Receipt {
        pub id: Uuid,
        pub estimated_response_time: &'static str,
    }
}
