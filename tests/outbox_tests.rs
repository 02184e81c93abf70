//! Notification outbox tests
//!
//! Runs the worker against an in-memory database with scripted notifiers, and once end to end
//! against a mocked email provider.

use async_trait::async_trait;
use carehome_api::core::notifier::{ChannelNotifier, FailureKind, Outcome, SkipReason};
use carehome_api::core::outbox::{NotificationQueue, OutboxWorker};
use carehome_api::core::traits::Notifier;
use carehome_api::infrastructure::database::DatabaseConnection;
use carehome_api::infrastructure::entities::{
    Channel, Delivery, DeliveryStatus, Inquiry, InquiryStatus, InquiryType,
};
use carehome_api::infrastructure::mailer::ResendMailer;
use carehome_api::infrastructure::repositories::{DbDeliveryRepository, DbInquiryRepository};
use carehome_api::infrastructure::settings::{DeliverySettings, EmailSettings, Settings};
use carehome_api::infrastructure::sms::SensSmsGateway;
use carehome_api::infrastructure::traits::{DeliveryRepository, InquiryRepository};
use chrono::Utc;
use di::{Injectable, Ref, ServiceCollection};
use serial_test::serial;
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

static TEST_DB_COUNTER: AtomicU32 = AtomicU32::new(0);

const POLICY: DeliverySettings = DeliverySettings {
    max_attempts: 3,
    sweep_interval: Duration::from_millis(50),
    lease: Duration::from_secs(300),
};

/// Answers every channel with a fixed outcome and remembers who was called.
struct ScriptedNotifier {
    email: Outcome,
    sms: Outcome,
    reply: Outcome,
    calls: Mutex<Vec<(Uuid, Channel)>>,
}

impl ScriptedNotifier {
    fn new(email: Outcome, sms: Outcome) -> ScriptedNotifier {
        ScriptedNotifier {
            email,
            sms,
            reply: Outcome::Sent {
                message_id: Some("reply-1".to_owned()),
            },
            calls: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, inquiry: &Inquiry, channel: Channel, outcome: &Outcome) -> Outcome {
        self.calls.lock().unwrap().push((inquiry.id, channel));
        outcome.clone()
    }

    fn calls(&self) -> Vec<(Uuid, Channel)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for ScriptedNotifier {
    async fn notify_email(&self, inquiry: &Inquiry) -> Outcome {
        self.record(inquiry, Channel::Email, &self.email)
    }

    async fn notify_sms(&self, inquiry: &Inquiry) -> Outcome {
        self.record(inquiry, Channel::Sms, &self.sms)
    }

    async fn notify_reply(&self, inquiry: &Inquiry) -> Outcome {
        self.record(inquiry, Channel::ReplyEmail, &self.reply)
    }
}

fn sent(id: &str) -> Outcome {
    Outcome::Sent {
        message_id: Some(id.to_owned()),
    }
}

fn failed(kind: FailureKind) -> Outcome {
    Outcome::Failed {
        kind,
        message: "provider said no".to_owned(),
    }
}

struct Fixture {
    inquiries: Ref<dyn InquiryRepository>,
    deliveries: Ref<dyn DeliveryRepository>,
}

impl Fixture {
    async fn new() -> Fixture {
        let db_num = TEST_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&format!("sqlite:file:outboxdb{db_num}?mode=memory&cache=shared"))
            .await
            .unwrap();
        sqlx::migrate!().run(&pool).await.unwrap();
        DatabaseConnection::set_test_pool(pool);

        let provider = ServiceCollection::new()
            .add(Settings::singleton())
            .add(DatabaseConnection::transient())
            .add(DbInquiryRepository::scoped())
            .add(DbDeliveryRepository::scoped())
            .build_provider()
            .unwrap();

        Fixture {
            inquiries: provider.get_required::<dyn InquiryRepository>(),
            deliveries: provider.get_required::<dyn DeliveryRepository>(),
        }
    }

    fn worker(&self, notifier: Ref<dyn Notifier>) -> OutboxWorker {
        OutboxWorker::new(
            self.deliveries.clone(),
            self.inquiries.clone(),
            notifier,
            POLICY,
        )
    }

    async fn submit(&self, email: Option<&str>, channels: &[Channel]) -> Uuid {
        let now = Utc::now();
        self.inquiries
            .create_inquiry(
                Inquiry {
                    id: Uuid::new_v4(),
                    name: "김영희".to_owned(),
                    phone: "01012345678".to_owned(),
                    email: email.map(str::to_owned),
                    inquiry_type: InquiryType::Admission,
                    message: "입소 상담을 받고 싶습니다".to_owned(),
                    status: InquiryStatus::Pending,
                    reply: None,
                    replied_at: None,
                    replied_by: None,
                    ip_address: None,
                    user_agent: None,
                    referrer: None,
                    created_at: now,
                    updated_at: now,
                },
                channels,
            )
            .await
            .unwrap()
            .id
    }

    async fn delivery(&self, id: Uuid, channel: Channel) -> Delivery {
        self.deliveries
            .list_deliveries(id)
            .await
            .unwrap()
            .into_iter()
            .find(|delivery| delivery.channel == channel)
            .unwrap()
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        DatabaseConnection::clear_test_pool();
    }
}

#[tokio::test]
#[serial]
async fn test_each_channel_is_attempted_once_and_recorded() {
    let fixture = Fixture::new().await;
    let notifier = Ref::new(ScriptedNotifier::new(
        sent("email-1"),
        Outcome::Skipped(SkipReason::SmsDisabled),
    ));
    let worker = fixture.worker(notifier.clone());
    let id = fixture.submit(Some("younghee@example.com"), &Channel::INTAKE).await;

    assert_eq!(worker.process(id).await.unwrap(), 2);

    let email = fixture.delivery(id, Channel::Email).await;
    assert_eq!(email.status, DeliveryStatus::Sent);
    assert_eq!(email.provider_message_id.as_deref(), Some("email-1"));
    assert_eq!(email.attempts, 1);

    let sms = fixture.delivery(id, Channel::Sms).await;
    assert_eq!(sms.status, DeliveryStatus::Skipped);
    assert_eq!(sms.last_error.as_deref(), Some("sms-disabled"));

    // terminal rows are never sent again, whether by queue or sweep
    assert_eq!(worker.process(id).await.unwrap(), 0);
    assert_eq!(worker.sweep().await.unwrap(), 0);
    assert_eq!(notifier.calls().len(), 2);
}

#[tokio::test]
#[serial]
async fn test_transient_failures_retry_up_to_the_attempt_cap() {
    let fixture = Fixture::new().await;
    let notifier = Ref::new(ScriptedNotifier::new(
        failed(FailureKind::Transient),
        Outcome::Skipped(SkipReason::SmsDisabled),
    ));
    let worker = fixture.worker(notifier.clone());
    let id = fixture.submit(Some("younghee@example.com"), &[Channel::Email]).await;

    assert_eq!(worker.process(id).await.unwrap(), 1);
    assert_eq!(worker.sweep().await.unwrap(), 1);
    assert_eq!(worker.sweep().await.unwrap(), 1);
    assert_eq!(worker.sweep().await.unwrap(), 0);

    let email = fixture.delivery(id, Channel::Email).await;
    assert_eq!(email.status, DeliveryStatus::FailedTransient);
    assert_eq!(email.attempts, POLICY.max_attempts as i64);
    assert_eq!(email.last_error.as_deref(), Some("provider said no"));
    assert_eq!(notifier.calls().len(), 3);
}

#[tokio::test]
#[serial]
async fn test_configuration_failures_are_retried() {
    let fixture = Fixture::new().await;
    let notifier = Ref::new(ScriptedNotifier::new(
        failed(FailureKind::Configuration),
        Outcome::Skipped(SkipReason::SmsDisabled),
    ));
    let worker = fixture.worker(notifier);
    let id = fixture.submit(Some("younghee@example.com"), &[Channel::Email]).await;

    worker.process(id).await.unwrap();

    assert_eq!(
        fixture.delivery(id, Channel::Email).await.status,
        DeliveryStatus::FailedConfiguration
    );
    assert_eq!(worker.sweep().await.unwrap(), 1);
}

#[tokio::test]
#[serial]
async fn test_permanent_failures_are_final() {
    let fixture = Fixture::new().await;
    let notifier = Ref::new(ScriptedNotifier::new(
        failed(FailureKind::Permanent),
        Outcome::Skipped(SkipReason::SmsDisabled),
    ));
    let worker = fixture.worker(notifier.clone());
    let id = fixture.submit(Some("not-an-inbox@example.com"), &[Channel::Email]).await;

    assert_eq!(worker.process(id).await.unwrap(), 1);
    assert_eq!(worker.sweep().await.unwrap(), 0);
    assert_eq!(worker.process(id).await.unwrap(), 0);

    assert_eq!(
        fixture.delivery(id, Channel::Email).await.status,
        DeliveryStatus::FailedPermanent
    );
    assert_eq!(notifier.calls().len(), 1);
}

#[tokio::test]
#[serial]
async fn test_row_abandoned_on_final_attempt_becomes_retryable_failure() {
    let fixture = Fixture::new().await;
    let notifier = Ref::new(ScriptedNotifier::new(
        sent("email-1"),
        Outcome::Skipped(SkipReason::SmsDisabled),
    ));
    let worker = OutboxWorker::new(
        fixture.deliveries.clone(),
        fixture.inquiries.clone(),
        notifier.clone(),
        DeliverySettings {
            max_attempts: 2,
            lease: Duration::ZERO,
            ..POLICY
        },
    );
    let id = fixture.submit(Some("younghee@example.com"), &[Channel::Email]).await;

    // first attempt fails, second one dies before recording anything
    assert!(fixture
        .deliveries
        .claim_delivery(id, Channel::Email, 2, Utc::now())
        .await
        .unwrap());
    fixture
        .deliveries
        .record_delivery(
            id,
            Channel::Email,
            DeliveryStatus::FailedTransient,
            Some("timeout".to_owned()),
            None,
        )
        .await
        .unwrap();
    assert!(fixture
        .deliveries
        .claim_delivery(id, Channel::Email, 2, Utc::now())
        .await
        .unwrap());
    assert_eq!(
        fixture.delivery(id, Channel::Email).await.status,
        DeliveryStatus::Sending
    );
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(worker.sweep().await.unwrap(), 0);

    let email = fixture.delivery(id, Channel::Email).await;
    assert_eq!(email.status, DeliveryStatus::FailedTransient);
    assert_eq!(email.attempts, 2);
    assert_eq!(fixture.deliveries.count_failed_deliveries().await.unwrap(), 1);

    assert_eq!(fixture.deliveries.reset_failed_deliveries(id).await.unwrap(), 1);
    assert_eq!(worker.sweep().await.unwrap(), 1);
    assert_eq!(
        fixture.delivery(id, Channel::Email).await.status,
        DeliveryStatus::Sent
    );
    assert_eq!(notifier.calls(), vec![(id, Channel::Email)]);
}

#[tokio::test]
#[serial]
async fn test_sweep_delivers_what_the_queue_missed() {
    let fixture = Fixture::new().await;
    let notifier = Ref::new(ScriptedNotifier::new(
        sent("email-1"),
        sent("sms-1"),
    ));
    let worker = fixture.worker(notifier.clone());

    let first = fixture.submit(Some("a@example.com"), &Channel::INTAKE).await;
    let second = fixture.submit(None, &Channel::INTAKE).await;
    let reply = fixture.submit(Some("b@example.com"), &[Channel::ReplyEmail]).await;

    assert_eq!(worker.sweep().await.unwrap(), 5);

    let calls = notifier.calls();
    for id in [first, second] {
        assert!(calls.contains(&(id, Channel::Email)));
        assert!(calls.contains(&(id, Channel::Sms)));
    }
    assert!(calls.contains(&(reply, Channel::ReplyEmail)));
    assert_eq!(
        fixture.delivery(reply, Channel::ReplyEmail).await.provider_message_id.as_deref(),
        Some("reply-1")
    );
}

#[tokio::test]
#[serial]
async fn test_deleted_inquiry_is_ignored() {
    let fixture = Fixture::new().await;
    let notifier = Ref::new(ScriptedNotifier::new(sent("email-1"), sent("sms-1")));
    let worker = fixture.worker(notifier.clone());

    let id = fixture.submit(Some("a@example.com"), &Channel::INTAKE).await;
    fixture.inquiries.delete_inquiry(id).await.unwrap();

    assert_eq!(worker.process(id).await.unwrap(), 0);
    assert!(notifier.calls().is_empty());
}

#[tokio::test]
#[serial]
async fn test_running_worker_drains_the_queue() {
    let fixture = Fixture::new().await;
    let notifier = Ref::new(ScriptedNotifier::new(sent("email-1"), sent("sms-1")));
    let worker = fixture.worker(notifier.clone());
    let queue = NotificationQueue::with_capacity(8);
    let receiver = queue.take_receiver().unwrap();

    let handle = tokio::spawn(async move { worker.run(receiver).await });

    let id = fixture.submit(Some("a@example.com"), &Channel::INTAKE).await;
    queue.enqueue(id);

    tokio::time::timeout(Duration::from_secs(10), async {
        while notifier.calls().len() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    // closing the queue stops the worker
    drop(queue);
    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        fixture.delivery(id, Channel::Sms).await.status,
        DeliveryStatus::Sent
    );
}

#[tokio::test]
#[serial]
async fn test_intake_email_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(body_partial_json(serde_json::json!({
            "to": ["younghee@example.com"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "re_123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let settings = Settings {
        email: EmailSettings {
            api_url: server.uri(),
            api_key: Some("re_test_key".to_owned()),
            ..Settings::default().email
        },
        ..Settings::default()
    };
    let notifier: Ref<dyn Notifier> = Ref::new(ChannelNotifier::new(
        &settings,
        Ref::new(ResendMailer::new(settings.email.clone(), settings.http_timeout)),
        Ref::new(SensSmsGateway::new(settings.sms.clone(), settings.http_timeout)),
    ));

    let fixture = Fixture::new().await;
    let worker = fixture.worker(notifier);
    let id = fixture.submit(Some("younghee@example.com"), &Channel::INTAKE).await;

    assert_eq!(worker.process(id).await.unwrap(), 2);

    let email = fixture.delivery(id, Channel::Email).await;
    assert_eq!(email.status, DeliveryStatus::Sent);
    assert_eq!(email.provider_message_id.as_deref(), Some("re_123"));
    assert_eq!(
        fixture.delivery(id, Channel::Sms).await.status,
        DeliveryStatus::Skipped
    );
}
