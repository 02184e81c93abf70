//! Care home website backend - Library exports for testing
//!
//! (c) Softlandia 2025

pub mod api;
pub mod core;
pub mod error;
pub mod infrastructure;

use crate::core::history::CmsHistoryService;
use crate::core::notifier::ChannelNotifier;
use crate::core::outbox::{NotificationQueue, OutboxWorker};
use crate::core::residents::{ResidentDirectoryService, StaffDirectoryService};
use crate::core::services::{
    ContactIntakeService, InquiryModerationService, ReviewModerationService, StatsDashboardService,
};
use crate::infrastructure::database::DatabaseConnection;
use crate::infrastructure::mailer::ResendMailer;
use crate::infrastructure::repositories::{
    DbDeliveryRepository, DbHistoryRepository, DbInquiryRepository, DbResidentRepository,
    DbReviewRepository, DbStaffRepository,
};
use crate::infrastructure::settings::Settings;
use crate::infrastructure::sms::SensSmsGateway;
use di::{Injectable, ServiceCollection};

/// Every service of the application, wired for production.
pub fn service_collection() -> ServiceCollection {
    let mut services = ServiceCollection::new();

    services
        .add(Settings::singleton())
        .add(DatabaseConnection::singleton())
        .add(NotificationQueue::singleton())
        .add(ResendMailer::singleton())
        .add(SensSmsGateway::singleton())
        .add(ChannelNotifier::singleton())
        .add(DbInquiryRepository::scoped())
        .add(DbDeliveryRepository::scoped())
        .add(DbHistoryRepository::scoped())
        .add(DbReviewRepository::scoped())
        .add(DbResidentRepository::scoped())
        .add(DbStaffRepository::scoped())
        .add(ContactIntakeService::scoped())
        .add(InquiryModerationService::scoped())
        .add(CmsHistoryService::scoped())
        .add(ReviewModerationService::scoped())
        .add(ResidentDirectoryService::scoped())
        .add(StaffDirectoryService::scoped())
        .add(StatsDashboardService::scoped())
        .add(OutboxWorker::transient());

    services
}
