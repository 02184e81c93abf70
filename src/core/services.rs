//! Implementations for the services the app needs.
//!

use crate::core::auth::{Capability, CurrentUser};
use crate::core::outbox::NotificationQueue;
use crate::core::traits::{ContactService, DashboardService, InquiryAdminService, ReviewService};
use crate::core::validation::{self, ContactSubmission, ReviewSubmission};
use crate::error::{AppError, AppResult, FieldErrors};
use crate::infrastructure::entities::{
    Channel, Delivery, Inquiry, InquiryFilter, InquiryStatus, Page, PageRequest, ResidentStatus,
    Review, StaffStatus,
};
use crate::infrastructure::traits::{
    DeliveryRepository, HistoryRepository, InquiryRepository, ResidentRepository,
    ReviewRepository, StaffRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use di::{Ref, injectable};
use log::info;
use serde::Serialize;
use uuid::Uuid;

/// Request metadata stored with an inquiry for abuse investigation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

#[injectable(ContactService)]
pub struct ContactIntakeService {
    inquiries: Ref<dyn InquiryRepository>,
    queue: Ref<NotificationQueue>,
}

#[async_trait]
impl ContactService for ContactIntakeService {
    async fn submit(&self, submission: ContactSubmission, meta: AuditMeta) -> AppResult<Inquiry> {
        let accepted = validation::validate(&submission).map_err(AppError::Validation)?;
        let accepted = validation::sanitize(accepted);

        let now = Utc::now();
        let inquiry = self
            .inquiries
            .create_inquiry(
                Inquiry {
                    id: Uuid::new_v4(),
                    name: accepted.name,
                    phone: accepted.phone,
                    email: accepted.email,
                    inquiry_type: accepted.inquiry_type,
                    message: accepted.message,
                    status: InquiryStatus::Pending,
                    reply: None,
                    replied_at: None,
                    replied_by: None,
                    ip_address: meta.ip_address,
                    user_agent: meta.user_agent,
                    referrer: meta.referrer,
                    created_at: now,
                    updated_at: now,
                },
                &Channel::INTAKE,
            )
            .await?;

        info!(
            "stored inquiry {} ({})",
            inquiry.id,
            inquiry.inquiry_type.label()
        );
        self.queue.enqueue(inquiry.id);

        Ok(inquiry)
    }
}

/// Admin edit of an inquiry. Blank replies count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InquiryPatch {
    pub reply: Option<String>,
    pub status: Option<InquiryStatus>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InquiryChange {
    pub inquiry: Inquiry,
    /// The reply was set by this change; the customer gets told.
    pub first_reply: bool,
}

/// Computes the inquiry after `patch`, or `None` if nothing would change.
///
/// A reply always lands together with `repliedAt`, `repliedBy` and at least `REPLIED`.
/// Status only moves forward; asking for the current status is a no-op.
pub fn apply_patch(
    current: &Inquiry,
    patch: InquiryPatch,
    actor: &str,
    now: DateTime<Utc>,
) -> AppResult<Option<InquiryChange>> {
    let mut next = current.clone();
    let mut first_reply = false;

    let reply = patch
        .reply
        .map(|reply| reply.trim().to_owned())
        .filter(|reply| !reply.is_empty());

    if let Some(reply) = reply {
        match current.reply.as_deref() {
            Some(existing) if existing == reply => {}
            Some(_) => {
                return Err(AppError::Conflict(
                    "이미 답변이 등록된 상담입니다".to_owned(),
                ));
            }
            None if current.status == InquiryStatus::Closed => {
                return Err(AppError::Conflict(
                    "종료된 상담에는 답변할 수 없습니다".to_owned(),
                ));
            }
            None => {
                next.reply = Some(reply);
                next.replied_at = Some(now);
                next.replied_by = Some(actor.to_owned());
                next.status = InquiryStatus::Replied;
                first_reply = true;
            }
        }
    }

    if let Some(status) = patch.status {
        if status < current.status {
            return Err(AppError::Conflict(
                "상태를 이전 단계로 되돌릴 수 없습니다".to_owned(),
            ));
        }
        if status == InquiryStatus::Replied && next.reply.is_none() {
            return Err(AppError::BadRequest(
                "답변을 입력해야 답변 완료로 변경할 수 있습니다".to_owned(),
            ));
        }
        next.status = next.status.max(status);
    }

    if next == *current {
        return Ok(None);
    }

    next.updated_at = now;
    Ok(Some(InquiryChange {
        inquiry: next,
        first_reply,
    }))
}

#[injectable(InquiryAdminService)]
pub struct InquiryModerationService {
    inquiries: Ref<dyn InquiryRepository>,
    deliveries: Ref<dyn DeliveryRepository>,
    queue: Ref<NotificationQueue>,
}

impl InquiryModerationService {
    async fn require_inquiry(&self, id: Uuid) -> AppResult<Inquiry> {
        self.inquiries
            .find_inquiry(id)
            .await?
            .ok_or(AppError::NotFound("상담"))
    }
}

#[async_trait]
impl InquiryAdminService for InquiryModerationService {
    async fn list_inquiries(
        &self,
        user: &CurrentUser,
        filter: InquiryFilter,
        page: PageRequest,
    ) -> AppResult<Page<Inquiry>> {
        user.require(Capability::ReadInquiries)?;

        Ok(self.inquiries.list_inquiries(&filter, page).await?)
    }

    async fn get_inquiry(&self, user: &CurrentUser, id: Uuid) -> AppResult<Inquiry> {
        user.require(Capability::ReadInquiries)?;

        self.require_inquiry(id).await
    }

    async fn update_inquiry(
        &self,
        user: &CurrentUser,
        id: Uuid,
        patch: InquiryPatch,
    ) -> AppResult<Inquiry> {
        user.require(Capability::ReplyInquiries)?;

        let current = self.require_inquiry(id).await?;
        let Some(change) = apply_patch(&current, patch, &user.display_name(), Utc::now())? else {
            return Ok(current);
        };

        let updated = self
            .inquiries
            .update_inquiry(
                &change.inquiry,
                current.updated_at,
                change.first_reply.then_some(Channel::ReplyEmail),
            )
            .await?
            .ok_or_else(|| {
                AppError::Conflict(
                    "다른 사용자가 먼저 수정했습니다. 새로고침 후 다시 시도해주세요".to_owned(),
                )
            })?;

        info!(
            "inquiry {id} updated by {}: {} -> {}",
            user.id,
            current.status.as_str(),
            updated.status.as_str()
        );
        if change.first_reply {
            self.queue.enqueue(id);
        }

        Ok(updated)
    }

    async fn delete_inquiry(&self, user: &CurrentUser, id: Uuid) -> AppResult<()> {
        user.require(Capability::DeleteInquiries)?;

        if !self.inquiries.delete_inquiry(id).await? {
            return Err(AppError::NotFound("상담"));
        }

        info!("inquiry {id} deleted by {}", user.id);
        Ok(())
    }

    async fn list_deliveries(&self, user: &CurrentUser, id: Uuid) -> AppResult<Vec<Delivery>> {
        user.require(Capability::ReadInquiries)?;
        self.require_inquiry(id).await?;

        Ok(self.deliveries.list_deliveries(id).await?)
    }

    async fn retry_notifications(&self, user: &CurrentUser, id: Uuid) -> AppResult<u64> {
        user.require(Capability::RetryNotifications)?;
        self.require_inquiry(id).await?;

        let reset = self.deliveries.reset_failed_deliveries(id).await?;
        if reset > 0 {
            info!("{reset} failed notification(s) of inquiry {id} queued again by {}", user.id);
            self.queue.enqueue(id);
        }

        Ok(reset)
    }
}

/// Admin edit of a review.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewPatch {
    pub is_approved: Option<bool>,
    pub is_featured: Option<bool>,
    pub content: Option<String>,
    pub rating: Option<i64>,
}

/// The first approval is stamped and never re-stamped, even across unapprove/approve.
pub fn apply_review_patch(
    current: &Review,
    patch: ReviewPatch,
    actor: &str,
    now: DateTime<Utc>,
) -> AppResult<Review> {
    let mut errors = FieldErrors::new();
    let mut next = current.clone();

    if let Some(rating) = patch.rating {
        if (1..=5).contains(&rating) {
            next.rating = rating;
        } else {
            errors.insert("rating", "평점은 1에서 5 사이여야 합니다".to_owned());
        }
    }

    if let Some(content) = patch.content {
        let content = content.trim();
        if content.is_empty() {
            errors.insert("content", "후기 내용을 입력해주세요".to_owned());
        } else {
            next.content = content.to_owned();
        }
    }

    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    if let Some(featured) = patch.is_featured {
        next.is_featured = featured;
    }

    if let Some(approved) = patch.is_approved {
        next.is_approved = approved;
        if approved && next.approved_at.is_none() {
            next.approved_at = Some(now);
            next.approved_by = Some(actor.to_owned());
        }
    }

    next.updated_at = now;
    Ok(next)
}

#[injectable(ReviewService)]
pub struct ReviewModerationService {
    reviews: Ref<dyn ReviewRepository>,
}

#[async_trait]
impl ReviewService for ReviewModerationService {
    async fn list_public(&self) -> AppResult<Vec<Review>> {
        Ok(self.reviews.list_reviews(Some(true)).await?)
    }

    async fn submit_review(&self, submission: ReviewSubmission) -> AppResult<Review> {
        let accepted = validation::validate_review(&submission).map_err(AppError::Validation)?;
        let now = Utc::now();

        let review = self
            .reviews
            .create_review(Review {
                id: Uuid::new_v4(),
                author_name: accepted.author_name,
                resident_name: accepted.resident_name,
                rating: accepted.rating,
                content: accepted.content,
                is_approved: false,
                is_featured: false,
                approved_at: None,
                approved_by: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!("review {} submitted, awaiting approval", review.id);
        Ok(review)
    }

    async fn list_reviews(&self, user: &CurrentUser) -> AppResult<Vec<Review>> {
        user.require(Capability::ModerateReviews)?;

        Ok(self.reviews.list_reviews(None).await?)
    }

    async fn get_review(&self, user: &CurrentUser, id: Uuid) -> AppResult<Review> {
        user.require(Capability::ModerateReviews)?;

        self.reviews
            .find_review(id)
            .await?
            .ok_or(AppError::NotFound("후기"))
    }

    async fn update_review(
        &self,
        user: &CurrentUser,
        id: Uuid,
        patch: ReviewPatch,
    ) -> AppResult<Review> {
        let current = self.get_review(user, id).await?;
        let next = apply_review_patch(&current, patch, &user.display_name(), Utc::now())?;

        self.reviews
            .update_review(&next)
            .await?
            .ok_or(AppError::NotFound("후기"))
    }

    async fn delete_review(&self, user: &CurrentUser, id: Uuid) -> AppResult<()> {
        user.require(Capability::ModerateReviews)?;

        if !self.reviews.delete_review(id).await? {
            return Err(AppError::NotFound("후기"));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub pending_contacts: i64,
    pub replied_contacts: i64,
    pub closed_contacts: i64,
    pub total_contacts: i64,
    pub published_posts: i64,
    pub pending_reviews: i64,
    pub failed_notifications: i64,
    pub total_residents: i64,
    pub active_residents: i64,
    pub total_staff: i64,
    pub today_admissions: i64,
    pub monthly_admissions: i64,
}

#[injectable(DashboardService)]
pub struct StatsDashboardService {
    inquiries: Ref<dyn InquiryRepository>,
    deliveries: Ref<dyn DeliveryRepository>,
    history: Ref<dyn HistoryRepository>,
    reviews: Ref<dyn ReviewRepository>,
    residents: Ref<dyn ResidentRepository>,
    staff: Ref<dyn StaffRepository>,
}

#[async_trait]
impl DashboardService for StatsDashboardService {
    async fn stats(&self, user: &CurrentUser) -> AppResult<DashboardStats> {
        user.require(Capability::ViewDashboard)?;

        let mut stats = DashboardStats::default();

        for (status, count) in self.inquiries.count_inquiries_by_status().await? {
            match status {
                InquiryStatus::Pending => stats.pending_contacts = count,
                InquiryStatus::Replied => stats.replied_contacts = count,
                InquiryStatus::Closed => stats.closed_contacts = count,
            }
            stats.total_contacts += count;
        }

        stats.published_posts = self
            .history
            .category_counts()
            .await?
            .into_iter()
            .map(|(_, count)| count)
            .sum();
        stats.pending_reviews = self.reviews.count_reviews(false).await?;
        stats.failed_notifications = self.deliveries.count_failed_deliveries().await?;

        let today = Utc::now().date_naive();
        stats.total_residents = self.residents.count_residents(None).await?;
        stats.active_residents = self
            .residents
            .count_residents(Some(ResidentStatus::Active))
            .await?;
        stats.total_staff = self.staff.count_staff(Some(StaffStatus::Active)).await?;
        stats.today_admissions = self.residents.count_admitted_on(today).await?;
        stats.monthly_admissions = self.residents.count_admitted_in_month(today).await?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::entities::InquiryType;
    use chrono::Duration;

    fn inquiry(status: InquiryStatus) -> Inquiry {
        let created = Utc::now() - Duration::hours(1);
        Inquiry {
            id: Uuid::new_v4(),
            name: "김영희".to_owned(),
            phone: "01012345678".to_owned(),
            email: None,
            inquiry_type: InquiryType::Other,
            message: "상담 부탁드립니다 감사합니다".to_owned(),
            status,
            reply: None,
            replied_at: None,
            replied_by: None,
            ip_address: None,
            user_agent: None,
            referrer: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn patch(reply: Option<&str>, status: Option<InquiryStatus>) -> InquiryPatch {
        InquiryPatch {
            reply: reply.map(str::to_owned),
            status,
        }
    }

    #[test]
    fn reply_sets_all_reply_fields_and_status() {
        let now = Utc::now();
        let change = apply_patch(
            &inquiry(InquiryStatus::Pending),
            patch(Some(" 내일 연락드리겠습니다 "), None),
            "김관리",
            now,
        )
        .unwrap()
        .unwrap();

        assert!(change.first_reply);
        assert_eq!(change.inquiry.status, InquiryStatus::Replied);
        assert_eq!(change.inquiry.reply.as_deref(), Some("내일 연락드리겠습니다"));
        assert_eq!(change.inquiry.replied_at, Some(now));
        assert_eq!(change.inquiry.replied_by.as_deref(), Some("김관리"));
        assert_eq!(change.inquiry.updated_at, now);
    }

    #[test]
    fn reply_with_stale_status_still_marks_replied() {
        let change = apply_patch(
            &inquiry(InquiryStatus::Pending),
            patch(Some("답변"), Some(InquiryStatus::Pending)),
            "김관리",
            Utc::now(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(change.inquiry.status, InquiryStatus::Replied);
    }

    #[test]
    fn reply_and_close_in_one_step() {
        let change = apply_patch(
            &inquiry(InquiryStatus::Pending),
            patch(Some("답변"), Some(InquiryStatus::Closed)),
            "김관리",
            Utc::now(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(change.inquiry.status, InquiryStatus::Closed);
        assert!(change.first_reply);
    }

    #[test]
    fn status_never_moves_backwards() {
        let mut replied = inquiry(InquiryStatus::Replied);
        replied.reply = Some("답변".to_owned());
        replied.replied_at = Some(Utc::now());
        replied.replied_by = Some("김관리".to_owned());

        let err = apply_patch(&replied, patch(None, Some(InquiryStatus::Pending)), "x", Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn same_status_is_a_no_op() {
        let current = inquiry(InquiryStatus::Pending);
        assert_eq!(
            apply_patch(&current, patch(None, Some(InquiryStatus::Pending)), "x", Utc::now())
                .unwrap(),
            None
        );
        assert_eq!(
            apply_patch(&current, patch(Some("   "), None), "x", Utc::now()).unwrap(),
            None
        );
    }

    #[test]
    fn reply_is_set_only_once() {
        let mut replied = inquiry(InquiryStatus::Replied);
        replied.reply = Some("첫 답변".to_owned());
        replied.replied_at = Some(Utc::now());
        replied.replied_by = Some("김관리".to_owned());

        assert_eq!(
            apply_patch(&replied, patch(Some("첫 답변"), None), "x", Utc::now()).unwrap(),
            None
        );
        assert!(matches!(
            apply_patch(&replied, patch(Some("다른 답변"), None), "x", Utc::now()),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn closed_inquiries_cannot_be_answered() {
        assert!(matches!(
            apply_patch(
                &inquiry(InquiryStatus::Closed),
                patch(Some("답변"), None),
                "x",
                Utc::now()
            ),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn replied_status_requires_reply() {
        assert!(matches!(
            apply_patch(
                &inquiry(InquiryStatus::Pending),
                patch(None, Some(InquiryStatus::Replied)),
                "x",
                Utc::now()
            ),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn closing_without_reply_is_allowed() {
        let change = apply_patch(
            &inquiry(InquiryStatus::Pending),
            patch(None, Some(InquiryStatus::Closed)),
            "x",
            Utc::now(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(change.inquiry.status, InquiryStatus::Closed);
        assert!(!change.first_reply);
        assert_eq!(change.inquiry.reply, None);
    }

    fn review() -> Review {
        let created = Utc::now() - Duration::days(1);
        Review {
            id: Uuid::new_v4(),
            author_name: "이철수".to_owned(),
            resident_name: None,
            rating: 5,
            content: "항상 감사합니다".to_owned(),
            is_approved: false,
            is_featured: false,
            approved_at: None,
            approved_by: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn first_approval_is_stamped_once() {
        let first = Utc::now();
        let approve = ReviewPatch {
            is_approved: Some(true),
            ..ReviewPatch::default()
        };

        let approved = apply_review_patch(&review(), approve.clone(), "김관리", first).unwrap();
        assert_eq!(approved.approved_at, Some(first));

        let unapproved = apply_review_patch(
            &approved,
            ReviewPatch {
                is_approved: Some(false),
                ..ReviewPatch::default()
            },
            "박관리",
            first + Duration::minutes(1),
        )
        .unwrap();
        let again =
            apply_review_patch(&unapproved, approve, "박관리", first + Duration::minutes(2)).unwrap();

        assert!(again.is_approved);
        assert_eq!(again.approved_at, Some(first));
        assert_eq!(again.approved_by.as_deref(), Some("김관리"));
    }

    #[test]
    fn rating_out_of_range_is_rejected() {
        let err = apply_review_patch(
            &review(),
            ReviewPatch {
                rating: Some(6),
                ..ReviewPatch::default()
            },
            "x",
            Utc::now(),
        )
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(errors) if errors.contains_key("rating")));
    }
}
