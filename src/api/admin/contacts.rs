//! Inquiry moderation

use crate::api::admin::contacts::schemas::{
    Delivery, Inquiry, InquiryPage, ListQuery, RetryResult, UpdateInquiry,
};
use crate::api::admin::{DELETED, Deleted};
use crate::api::{ApiJson, ApiPath, ApiResponse, ExtractUser, query_number, query_value};
use crate::core::services::InquiryPatch;
use crate::core::traits::InquiryAdminService;
use crate::error::{AppError, AppResult};
use crate::infrastructure::entities::{InquiryFilter, InquiryStatus, PageRequest, SortOrder};
use axum::extract::Query;
use axum::routing::{get, post};
use axum::{Json, Router};
use di_axum::Inject;
use uuid::Uuid;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_inquiries))
        .route(
            "/:id",
            get(get_inquiry).put(update_inquiry).delete(delete_inquiry),
        )
        .route("/:id/notifications", get(list_deliveries))
        .route("/:id/notifications/retry", post(retry_notifications))
}

/// `asc`/`oldest` list oldest first, anything else newest first.
pub fn parse_sort(raw: Option<String>) -> SortOrder {
    match query_value(raw).map(|s| s.to_ascii_lowercase()).as_deref() {
        Some("asc" | "oldest") => SortOrder::Oldest,
        _ => SortOrder::Newest,
    }
}

fn parse_status(raw: Option<String>) -> AppResult<Option<InquiryStatus>> {
    match query_value(raw) {
        None => Ok(None),
        Some(raw) if raw.eq_ignore_ascii_case("ALL") => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("알 수 없는 상태입니다: {raw}"))),
    }
}

async fn list_inquiries(
    Inject(inquiry_service): Inject<dyn InquiryAdminService>,
    ExtractUser(user): ExtractUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<InquiryPage>>> {
    let filter = InquiryFilter {
        search: query_value(query.q),
        status: parse_status(query.status)?,
        sort: parse_sort(query.sort),
    };
    let page = PageRequest::new(query_number(query.page), query_number(query.page_size));

    let page = inquiry_service.list_inquiries(&user, filter, page).await?;

    Ok(ApiResponse::ok(InquiryPage {
        total_pages: page.total_pages(),
        page: page.page,
        page_size: page.page_size,
        total: page.total,
        items: page.items.into_iter().map(Inquiry::from).collect(),
    }))
}

async fn get_inquiry(
    Inject(inquiry_service): Inject<dyn InquiryAdminService>,
    ExtractUser(user): ExtractUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Inquiry>>> {
    let inquiry = inquiry_service.get_inquiry(&user, id).await?;

    Ok(ApiResponse::ok(inquiry.into()))
}

async fn update_inquiry(
    Inject(inquiry_service): Inject<dyn InquiryAdminService>,
    ExtractUser(user): ExtractUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdateInquiry>,
) -> AppResult<Json<ApiResponse<Inquiry>>> {
    let inquiry = inquiry_service
        .update_inquiry(
            &user,
            id,
            InquiryPatch {
                reply: update.reply,
                status: update.status,
            },
        )
        .await?;

    Ok(ApiResponse::with_message("저장되었습니다", inquiry.into()))
}

async fn delete_inquiry(
    Inject(inquiry_service): Inject<dyn InquiryAdminService>,
    ExtractUser(user): ExtractUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Deleted>>> {
    inquiry_service.delete_inquiry(&user, id).await?;

    Ok(ApiResponse::with_message(DELETED, Deleted { id }))
}

async fn list_deliveries(
    Inject(inquiry_service): Inject<dyn InquiryAdminService>,
    ExtractUser(user): ExtractUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<Delivery>>>> {
    let deliveries = inquiry_service.list_deliveries(&user, id).await?;

    Ok(ApiResponse::ok(
        deliveries.into_iter().map(Delivery::from).collect(),
    ))
}

async fn retry_notifications(
    Inject(inquiry_service): Inject<dyn InquiryAdminService>,
    ExtractUser(user): ExtractUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ApiResponse<RetryResult>>> {
    let reset = inquiry_service.retry_notifications(&user, id).await?;

    Ok(ApiResponse::ok(RetryResult { reset }))
}

pub mod schemas {
    use crate::infrastructure::entities::{
        self, Channel, DeliveryStatus, InquiryStatus, InquiryType,
    };
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use uuid::Uuid;

    #[derive(Deserialize, Debug, Default)]
    #[serde(rename_all = "camelCase")]
    pub struct ListQuery {
        pub q: Option<String>,
        pub status: Option<String>,
        pub page: Option<String>,
        pub page_size: Option<String>,
        pub sort: Option<String>,
    }

    #[derive(Deserialize, Debug, Default)]
    #[serde(default)]
    pub struct UpdateInquiry {
        pub reply: Option<String>,
        pub status: Option<InquiryStatus>,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Inquiry {
        pub id: Uuid,
        pub name: String,
        pub phone: String,
        pub email: Option<String>,
        pub inquiry_type: InquiryType,
        pub message: String,
        pub status: InquiryStatus,
        pub reply: Option<String>,
        pub replied_at: Option<DateTime<Utc>>,
        pub replied_by: Option<String>,
        pub ip_address: Option<String>,
        pub user_agent: Option<String>,
        pub referrer: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl From<entities::Inquiry> for Inquiry {
        fn from(inquiry: entities::Inquiry) -> Self {
            Inquiry {
                id: inquiry.id,
                name: inquiry.name,
                phone: inquiry.phone,
                email: inquiry.email,
                inquiry_type: inquiry.inquiry_type,
                message: inquiry.message,
                status: inquiry.status,
                reply: inquiry.reply,
                replied_at: inquiry.replied_at,
                replied_by: inquiry.replied_by,
                ip_address: inquiry.ip_address,
                user_agent: inquiry.user_agent,
                referrer: inquiry.referrer,
                created_at: inquiry.created_at,
                updated_at: inquiry.updated_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct InquiryPage {
        pub items: Vec<Inquiry>,
        pub page: u32,
        pub page_size: u32,
        pub total: i64,
        pub total_pages: i64,
    }

    #[derive(Serialize, Debug)]
    #[serde(rename_all = "camelCase")]
    pub struct Delivery {
        pub channel: Channel,
        pub status: DeliveryStatus,
        /// Failed in a way the retry endpoint resets.
        pub failed: bool,
        pub attempts: i64,
        pub last_error: Option<String>,
        pub provider_message_id: Option<String>,
        pub last_attempt_at: Option<DateTime<Utc>>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    impl From<entities::Delivery> for Delivery {
        fn from(delivery: entities::Delivery) -> Self {
            Delivery {
                channel: delivery.channel,
                status: delivery.status,
                failed: delivery.status.is_failure(),
                attempts: delivery.attempts,
                last_error: delivery.last_error,
                provider_message_id: delivery.provider_message_id,
                last_attempt_at: delivery.last_attempt_at,
                created_at: delivery.created_at,
                updated_at: delivery.updated_at,
            }
        }
    }

    #[derive(Serialize, Debug)]
    pub struct RetryResult {
        pub reset: u64,
    }
}
