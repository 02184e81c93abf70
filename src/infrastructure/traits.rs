//! Infrastructure traits, used for DI on higher levels

use crate::infrastructure::entities::{
    self, Channel, DeliveryStatus, HistoryCategory, HistoryFilter, InquiryFilter, InquiryStatus,
    Page, PageRequest, ResidentStatus, StaffStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

pub type DbResult<T> = Result<T, sqlx::Error>;

#[async_trait]
pub trait InquiryRepository: Send + Sync {
    /// Stores the inquiry together with a `PENDING` delivery row per channel, in one transaction.
    async fn create_inquiry(
        &self,
        inquiry: entities::Inquiry,
        channels: &[Channel],
    ) -> DbResult<entities::Inquiry>;

    async fn find_inquiry(&self, id: Uuid) -> DbResult<Option<entities::Inquiry>>;

    async fn list_inquiries(
        &self,
        filter: &InquiryFilter,
        page: PageRequest,
    ) -> DbResult<Page<entities::Inquiry>>;

    /// Writes the mutable fields of `inquiry` if the stored row still carries
    /// `expected_updated_at`. `enqueue` adds a `PENDING` delivery in the same transaction.
    ///
    /// Returns `None` when the row changed (or vanished) in the meantime.
    async fn update_inquiry(
        &self,
        inquiry: &entities::Inquiry,
        expected_updated_at: DateTime<Utc>,
        enqueue: Option<Channel>,
    ) -> DbResult<Option<entities::Inquiry>>;

    /// Returns `false` if there was nothing to delete.
    async fn delete_inquiry(&self, id: Uuid) -> DbResult<bool>;

    async fn count_inquiries_by_status(&self) -> DbResult<Vec<(InquiryStatus, i64)>>;
}

/// The notification outbox.
#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    async fn list_deliveries(&self, inquiry_id: Uuid) -> DbResult<Vec<entities::Delivery>>;

    /// Moves a claimable row to `SENDING` and bumps its attempt counter.
    ///
    /// A row is claimable when it is `PENDING` or failed retryably and has fewer than
    /// `max_attempts` attempts, or when it has been `SENDING` since before `stale_before`.
    /// Returns `true` if this call won the row.
    async fn claim_delivery(
        &self,
        inquiry_id: Uuid,
        channel: Channel,
        max_attempts: u32,
        stale_before: DateTime<Utc>,
    ) -> DbResult<bool>;

    async fn record_delivery(
        &self,
        inquiry_id: Uuid,
        channel: Channel,
        status: DeliveryStatus,
        detail: Option<String>,
        provider_message_id: Option<String>,
    ) -> DbResult<()>;

    /// Fails rows that were left in `SENDING` on their last permitted attempt, so that they
    /// count as failed and can be reset. Returns the number of rows moved.
    async fn expire_exhausted_deliveries(
        &self,
        max_attempts: u32,
        stale_before: DateTime<Utc>,
    ) -> DbResult<u64>;

    /// Inquiries that have at least one claimable delivery, oldest first.
    async fn due_inquiries(
        &self,
        max_attempts: u32,
        stale_before: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<Uuid>>;

    /// Puts every failed delivery of the inquiry back to `PENDING` with a fresh attempt budget.
    ///
    /// Returns the number of rows reset.
    async fn reset_failed_deliveries(&self, inquiry_id: Uuid) -> DbResult<u64>;

    async fn count_failed_deliveries(&self) -> DbResult<i64>;
}

#[async_trait]
pub trait HistoryRepository: Send + Sync {
    async fn list_published(&self, filter: &HistoryFilter) -> DbResult<Vec<entities::HistoryPost>>;

    async fn list_all(&self) -> DbResult<Vec<entities::HistoryPost>>;

    async fn find_post(&self, id: Uuid) -> DbResult<Option<entities::HistoryPost>>;

    async fn find_post_by_slug(&self, slug: &str) -> DbResult<Option<entities::HistoryPost>>;

    async fn slug_exists(&self, slug: &str, except: Option<Uuid>) -> DbResult<bool>;

    async fn create_post(&self, post: entities::HistoryPost) -> DbResult<entities::HistoryPost>;

    async fn update_post(&self, post: &entities::HistoryPost) -> DbResult<Option<entities::HistoryPost>>;

    async fn delete_post(&self, id: Uuid) -> DbResult<bool>;

    /// Increments the view counter and returns the updated row.
    async fn record_view(&self, id: Uuid) -> DbResult<Option<entities::HistoryPost>>;

    async fn related_posts(
        &self,
        category: HistoryCategory,
        exclude_slug: &str,
        limit: u32,
    ) -> DbResult<Vec<entities::HistoryPost>>;

    /// Published post count per category; categories without posts are absent.
    async fn category_counts(&self) -> DbResult<Vec<(HistoryCategory, i64)>>;

    async fn published_years(&self) -> DbResult<Vec<i32>>;

    async fn published_tags(&self) -> DbResult<Vec<String>>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn list_reviews(&self, approved: Option<bool>) -> DbResult<Vec<entities::Review>>;

    async fn find_review(&self, id: Uuid) -> DbResult<Option<entities::Review>>;

    async fn create_review(&self, review: entities::Review) -> DbResult<entities::Review>;

    async fn update_review(&self, review: &entities::Review) -> DbResult<Option<entities::Review>>;

    async fn delete_review(&self, id: Uuid) -> DbResult<bool>;

    async fn count_reviews(&self, approved: bool) -> DbResult<i64>;
}

#[async_trait]
pub trait ResidentRepository: Send + Sync {
    async fn list_residents(
        &self,
        status: Option<ResidentStatus>,
    ) -> DbResult<Vec<entities::Resident>>;

    async fn find_resident(&self, id: Uuid) -> DbResult<Option<entities::Resident>>;

    async fn create_resident(&self, resident: entities::Resident) -> DbResult<entities::Resident>;

    async fn update_resident(
        &self,
        resident: &entities::Resident,
    ) -> DbResult<Option<entities::Resident>>;

    async fn delete_resident(&self, id: Uuid) -> DbResult<bool>;

    async fn count_residents(&self, status: Option<ResidentStatus>) -> DbResult<i64>;

    /// Residents admitted on `day`.
    async fn count_admitted_on(&self, day: NaiveDate) -> DbResult<i64>;

    /// Residents admitted in the calendar month containing `day`.
    async fn count_admitted_in_month(&self, day: NaiveDate) -> DbResult<i64>;
}

#[async_trait]
pub trait StaffRepository: Send + Sync {
    async fn list_staff(&self, status: Option<StaffStatus>) -> DbResult<Vec<entities::StaffMember>>;

    async fn find_staff(&self, id: Uuid) -> DbResult<Option<entities::StaffMember>>;

    async fn create_staff(&self, member: entities::StaffMember) -> DbResult<entities::StaffMember>;

    async fn update_staff(
        &self,
        member: &entities::StaffMember,
    ) -> DbResult<Option<entities::StaffMember>>;

    async fn count_staff(&self, status: Option<StaffStatus>) -> DbResult<i64>;
}

/// Why a single outbound notification could not be handed to its provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// Credentials or addresses the channel needs are not configured.
    #[error("not configured: {0}")]
    Configuration(String),

    /// Network trouble, rate limiting or a provider-side error; worth retrying.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The provider rejected the request itself; retrying will not help.
    #[error("rejected: {0}")]
    Permanent(String),
}

impl DeliveryError {
    /// Classifies a non-success provider response.
    pub fn from_status(status: reqwest::StatusCode, detail: &str) -> DeliveryError {
        let detail = format!("HTTP {}: {}", status.as_u16(), truncate(detail, 200));

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            DeliveryError::Transient(detail)
        } else {
            DeliveryError::Permanent(detail)
        }
    }

    /// Classifies a request that never got a response.
    pub fn from_transport(err: reqwest::Error) -> DeliveryError {
        if err.is_builder() {
            DeliveryError::Configuration(err.to_string())
        } else {
            DeliveryError::Transient(err.to_string())
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingSms {
    pub to: String,
    pub content: String,
}

/// Transactional email provider.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Returns the provider's message id.
    async fn send_email(&self, email: &OutgoingEmail) -> Result<String, DeliveryError>;
}

/// SMS gateway.
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// `false` when the channel is switched off; nothing is sent then.
    fn is_enabled(&self) -> bool;

    /// Returns the gateway's request id.
    async fn send_sms(&self, sms: &OutgoingSms) -> Result<String, DeliveryError>;
}
