//! Database entities

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle of an inquiry. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InquiryStatus {
    Pending,
    Replied,
    Closed,
}

impl InquiryStatus {
    pub const ALL: [InquiryStatus; 3] = [Self::Pending, Self::Replied, Self::Closed];

    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryStatus::Pending => "PENDING",
            InquiryStatus::Replied => "REPLIED",
            InquiryStatus::Closed => "CLOSED",
        }
    }
}

impl FromStr for InquiryStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum InquiryType {
    #[serde(rename = "입소상담")]
    #[sqlx(rename = "입소상담")]
    Admission,
    #[serde(rename = "비용문의")]
    #[sqlx(rename = "비용문의")]
    Cost,
    #[serde(rename = "시설견학")]
    #[sqlx(rename = "시설견학")]
    Visit,
    #[serde(rename = "프로그램문의")]
    #[sqlx(rename = "프로그램문의")]
    Program,
    #[default]
    #[serde(rename = "기타")]
    #[sqlx(rename = "기타")]
    Other,
}

impl InquiryType {
    pub const ALL: [InquiryType; 5] = [
        Self::Admission,
        Self::Cost,
        Self::Visit,
        Self::Program,
        Self::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            InquiryType::Admission => "입소상담",
            InquiryType::Cost => "비용문의",
            InquiryType::Visit => "시설견학",
            InquiryType::Program => "프로그램문의",
            InquiryType::Other => "기타",
        }
    }
}

impl fmt::Display for InquiryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InquiryType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label() == s)
            .ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
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

/// Notification channel of an outbox row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Email,
    Sms,
    ReplyEmail,
}

impl Channel {
    /// Channels queued when an inquiry is submitted.
    pub const INTAKE: [Channel; 2] = [Channel::Email, Channel::Sms];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "EMAIL",
            Channel::Sms => "SMS",
            Channel::ReplyEmail => "REPLY_EMAIL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    Sending,
    Sent,
    Skipped,
    FailedTransient,
    FailedConfiguration,
    FailedPermanent,
}

impl DeliveryStatus {
    /// Terminal states are never attempted again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Sent | DeliveryStatus::Skipped | DeliveryStatus::FailedPermanent
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::FailedTransient
                | DeliveryStatus::FailedConfiguration
                | DeliveryStatus::FailedPermanent
        )
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Delivery {
    pub inquiry_id: Uuid,
    pub channel: Channel,
    pub status: DeliveryStatus,
    pub attempts: i64,
    pub last_error: Option<String>,
    pub provider_message_id: Option<String>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryCategory {
    Notice,
    Program,
    Meal,
    Facility,
    Family,
    Archive,
}

impl HistoryCategory {
    pub const ALL: [HistoryCategory; 6] = [
        Self::Notice,
        Self::Program,
        Self::Meal,
        Self::Facility,
        Self::Family,
        Self::Archive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryCategory::Notice => "NOTICE",
            HistoryCategory::Program => "PROGRAM",
            HistoryCategory::Meal => "MEAL",
            HistoryCategory::Facility => "FACILITY",
            HistoryCategory::Family => "FAMILY",
            HistoryCategory::Archive => "ARCHIVE",
        }
    }
}

impl FromStr for HistoryCategory {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct HistoryPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub category: HistoryCategory,
    pub content: String,
    pub excerpt: String,
    pub thumbnail: Option<String>,
    pub tags: Json<Vec<String>>,
    pub author: String,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResidentStatus {
    #[default]
    Active,
    Discharged,
    Hospitalized,
}

impl FromStr for ResidentStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "DISCHARGED" => Ok(Self::Discharged),
            "HOSPITALIZED" => Ok(Self::Hospitalized),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Resident {
    pub id: Uuid,
    pub name: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub admission_date: NaiveDate,
    pub room_number: String,
    /// Long-term care grade, `"1"` to `"5"`.
    pub grade: String,
    pub emergency_contact: String,
    pub emergency_phone: String,
    pub status: ResidentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffStatus {
    #[default]
    Active,
    Inactive,
}

impl FromStr for StaffStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "INACTIVE" => Ok(Self::Inactive),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct StaffMember {
    pub id: Uuid,
    pub name: String,
    /// Job title, e.g. 간호사 or 요양보호사.
    pub role: String,
    pub department: String,
    pub phone: String,
    pub email: Option<String>,
    pub hire_date: NaiveDate,
    pub status: StaffStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin listing of inquiries.
#[derive(Debug, Clone, Default)]
pub struct InquiryFilter {
    /// Case-insensitive substring of name, email, phone or message.
    pub search: Option<String>,
    pub status: Option<InquiryStatus>,
    pub sort: SortOrder,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub const DEFAULT_PAGE_SIZE: u32 = 20;
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Clamps raw query values: page is at least 1, page size within 1..=100.
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> PageRequest {
        let page = page.unwrap_or(1).clamp(1, u32::MAX as i64) as u32;
        let page_size = page_size
            .unwrap_or(Self::DEFAULT_PAGE_SIZE as i64)
            .clamp(1, Self::MAX_PAGE_SIZE as i64) as u32;

        PageRequest { page, page_size }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(None, None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> i64 {
        (self.total + self.page_size as i64 - 1) / self.page_size as i64
    }
}

/// Public history listing. All set fields must match.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub category: Option<HistoryCategory>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub search: Option<String>,
    pub tag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_is_clamped() {
        assert_eq!(
            PageRequest::new(Some(0), Some(500)),
            PageRequest {
                page: 1,
                page_size: 100
            }
        );
        assert_eq!(
            PageRequest::new(Some(-3), Some(0)),
            PageRequest {
                page: 1,
                page_size: 1
            }
        );
        assert_eq!(PageRequest::new(Some(3), None).offset(), 40);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = |total| Page::<()> {
            items: vec![],
            page: 1,
            page_size: 20,
            total,
        };
        assert_eq!(page(0).total_pages(), 0);
        assert_eq!(page(20).total_pages(), 1);
        assert_eq!(page(21).total_pages(), 2);
    }

    #[test]
    fn inquiry_type_parses_korean_labels() {
        assert_eq!("시설견학".parse(), Ok(InquiryType::Visit));
        assert_eq!("visit".parse::<InquiryType>(), Err(()));
        assert_eq!(InquiryType::default().label(), "기타");
    }

    #[test]
    fn status_order_follows_lifecycle() {
        assert!(InquiryStatus::Pending < InquiryStatus::Replied);
        assert!(InquiryStatus::Replied < InquiryStatus::Closed);
        assert_eq!("replied".parse(), Ok(InquiryStatus::Replied));
    }
}
