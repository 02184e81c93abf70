//! DI "Interfaces"

use crate::core::auth::CurrentUser;
use crate::core::history::{HistoryMeta, PostDraft, PostPatch, PostView};
use crate::core::notifier::{NotifyResult, Outcome};
use crate::core::residents::{ResidentDraft, ResidentPatch, StaffDraft, StaffPatch};
use crate::core::services::{AuditMeta, DashboardStats, InquiryPatch, ReviewPatch};
use crate::core::validation::{ContactSubmission, ReviewSubmission};
use crate::error::AppResult;
use crate::infrastructure::entities::{
    self, HistoryFilter, InquiryFilter, Page, PageRequest, ResidentStatus, StaffStatus,
};
use async_trait::async_trait;
use uuid::Uuid;

#[async_trait]
pub trait ContactService: Send + Sync {
    /// Validates and stores a submission, then hands it to the notification outbox.
    ///
    /// Succeeds once the inquiry is stored; notification problems never surface here.
    async fn submit(
        &self,
        submission: ContactSubmission,
        meta: AuditMeta,
    ) -> AppResult<entities::Inquiry>;
}

/// Admin side of inquiries.
#[async_trait]
pub trait InquiryAdminService: Send + Sync {
    async fn list_inquiries(
        &self,
        user: &CurrentUser,
        filter: InquiryFilter,
        page: PageRequest,
    ) -> AppResult<Page<entities::Inquiry>>;

    async fn get_inquiry(&self, user: &CurrentUser, id: Uuid) -> AppResult<entities::Inquiry>;

    /// Applies a reply and/or status change.
    ///
    /// Returns `Conflict` if the change would move the status backwards, replace an existing
    /// reply, or if someone else modified the inquiry in the meantime.
    async fn update_inquiry(
        &self,
        user: &CurrentUser,
        id: Uuid,
        patch: InquiryPatch,
    ) -> AppResult<entities::Inquiry>;

    async fn delete_inquiry(&self, user: &CurrentUser, id: Uuid) -> AppResult<()>;

    async fn list_deliveries(
        &self,
        user: &CurrentUser,
        id: Uuid,
    ) -> AppResult<Vec<entities::Delivery>>;

    /// Gives failed deliveries a fresh attempt budget. Returns how many were reset.
    async fn retry_notifications(&self, user: &CurrentUser, id: Uuid) -> AppResult<u64>;
}

#[async_trait]
pub trait HistoryService: Send + Sync {
    async fn list_published(&self, filter: HistoryFilter) -> AppResult<Vec<entities::HistoryPost>>;

    async fn meta(&self) -> AppResult<HistoryMeta>;

    /// Public read of a single post. Counts as a view.
    async fn view_post(&self, slug: &str) -> AppResult<PostView>;

    async fn list_posts(&self, user: &CurrentUser) -> AppResult<Vec<entities::HistoryPost>>;

    async fn get_post(&self, user: &CurrentUser, id: Uuid) -> AppResult<entities::HistoryPost>;

    async fn create_post(
        &self,
        user: &CurrentUser,
        draft: PostDraft,
    ) -> AppResult<entities::HistoryPost>;

    async fn update_post(
        &self,
        user: &CurrentUser,
        id: Uuid,
        patch: PostPatch,
    ) -> AppResult<entities::HistoryPost>;

    async fn delete_post(&self, user: &CurrentUser, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait ReviewService: Send + Sync {
    /// Approved reviews, featured ones first.
    async fn list_public(&self) -> AppResult<Vec<entities::Review>>;

    /// A family member's review. Stored unapproved until moderated.
    async fn submit_review(&self, submission: ReviewSubmission) -> AppResult<entities::Review>;

    async fn list_reviews(&self, user: &CurrentUser) -> AppResult<Vec<entities::Review>>;

    async fn get_review(&self, user: &CurrentUser, id: Uuid) -> AppResult<entities::Review>;

    async fn update_review(
        &self,
        user: &CurrentUser,
        id: Uuid,
        patch: ReviewPatch,
    ) -> AppResult<entities::Review>;

    async fn delete_review(&self, user: &CurrentUser, id: Uuid) -> AppResult<()>;
}

#[async_trait]
pub trait ResidentService: Send + Sync {
    async fn list_residents(
        &self,
        user: &CurrentUser,
        status: Option<ResidentStatus>,
    ) -> AppResult<Vec<entities::Resident>>;

    async fn get_resident(&self, user: &CurrentUser, id: Uuid) -> AppResult<entities::Resident>;

    async fn admit_resident(
        &self,
        user: &CurrentUser,
        draft: ResidentDraft,
    ) -> AppResult<entities::Resident>;

    async fn update_resident(
        &self,
        user: &CurrentUser,
        id: Uuid,
        patch: ResidentPatch,
    ) -> AppResult<entities::Resident>;

    /// Admin only. Discharging a resident is a status change, not a delete.
    async fn delete_resident(&self, user: &CurrentUser, id: Uuid) -> AppResult<()>;
}

/// Employee records. Admin only.
#[async_trait]
pub trait StaffService: Send + Sync {
    async fn list_staff(
        &self,
        user: &CurrentUser,
        status: Option<StaffStatus>,
    ) -> AppResult<Vec<entities::StaffMember>>;

    async fn get_staff(&self, user: &CurrentUser, id: Uuid) -> AppResult<entities::StaffMember>;

    async fn hire_staff(
        &self,
        user: &CurrentUser,
        draft: StaffDraft,
    ) -> AppResult<entities::StaffMember>;

    async fn update_staff(
        &self,
        user: &CurrentUser,
        id: Uuid,
        patch: StaffPatch,
    ) -> AppResult<entities::StaffMember>;
}

#[async_trait]
pub trait DashboardService: Send + Sync {
    async fn stats(&self, user: &CurrentUser) -> AppResult<DashboardStats>;
}

/// Customer notifications. Implementations never fail, they report.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Intake confirmation. Skipped when the inquiry has no email address.
    async fn notify_email(&self, inquiry: &entities::Inquiry) -> Outcome;

    /// Intake confirmation by text message. Skipped while SMS is switched off.
    async fn notify_sms(&self, inquiry: &entities::Inquiry) -> Outcome;

    /// The admin's reply, by email.
    async fn notify_reply(&self, inquiry: &entities::Inquiry) -> Outcome;

    /// Both intake channels. One failing has no effect on the other.
    async fn notify(&self, inquiry: &entities::Inquiry) -> NotifyResult {
        NotifyResult {
            email: self.notify_email(inquiry).await,
            sms: self.notify_sms(inquiry).await,
        }
    }
}
