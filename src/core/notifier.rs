//! Customer notifications for inquiries: rendering and per-channel outcomes.
//!
//! Nothing in here returns an error. Whatever happens on a channel is folded into an
//! [`Outcome`], which the outbox records against the delivery row.

use crate::core::traits::Notifier;
use crate::infrastructure::entities::{DeliveryStatus, Inquiry};
use crate::infrastructure::settings::Settings;
use crate::infrastructure::traits::{
    DeliveryError, EmailSender, OutgoingEmail, OutgoingSms, SmsSender,
};
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use log::error;
use minijinja::{Environment, context};
use std::fmt;

const RECEIVED_TEMPLATE: &str = "contact_received.html";
const REPLIED_TEMPLATE: &str = "contact_replied.html";

const RECEIVED_HTML: &str = r#"<div style="font-family: Arial, sans-serif; line-height:1.6">
  <h2>상담 신청이 접수되었습니다</h2>
  <p>{{ name }}님, 안녕하세요. {{ site }}입니다.</p>
  <p>문의가 정상 접수되었습니다. <b>24시간 이내</b> 답변드리겠습니다.</p>
  <hr />
  <p><b>접수번호:</b> {{ ticket_id }}</p>
  <p><b>문의유형:</b> {{ inquiry_type }}</p>
  <p><b>문의내용:</b><br/>{{ message|escape|replace("\n", "<br/>")|safe }}</p>
  <hr />
  <p style="color:#666; font-size:12px">본 메일은 발신 전용입니다.</p>
</div>"#;

const REPLIED_HTML: &str = r#"<div style="font-family: Arial, sans-serif; line-height:1.6">
  <h2>상담 답변 안내</h2>
  <p>{{ name }}님, 안녕하세요. {{ site }}입니다.</p>
  <p>문의하신 내용에 대해 답변드립니다.</p>
  <hr />
  <p><b>접수번호:</b> {{ ticket_id }}</p>
  <p><b>문의유형:</b> {{ inquiry_type }}</p>
  <p><b>문의내용:</b><br/>{{ message|escape|replace("\n", "<br/>")|safe }}</p>
  <hr />
  <p><b>답변:</b><br/>{{ reply|escape|replace("\n", "<br/>")|safe }}</p>
  {% if replied_by %}<p style="margin-top:12px; color:#666;">담당자: {{ replied_by }}</p>{% endif %}
  <hr />
  <p style="color:#666; font-size:12px">본 메일은 발신 전용입니다.</p>
</div>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoEmail,
    SmsDisabled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::NoEmail => "no-email",
            SkipReason::SmsDisabled => "sms-disabled",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Configuration,
    Transient,
    Permanent,
}

/// Result of one channel for one inquiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Sent { message_id: Option<String> },
    Skipped(SkipReason),
    Failed { kind: FailureKind, message: String },
}

impl Outcome {
    /// The outbox state this outcome leaves the delivery in.
    pub fn delivery_status(&self) -> DeliveryStatus {
        match self {
            Outcome::Sent { .. } => DeliveryStatus::Sent,
            Outcome::Skipped(_) => DeliveryStatus::Skipped,
            Outcome::Failed { kind, .. } => match kind {
                FailureKind::Configuration => DeliveryStatus::FailedConfiguration,
                FailureKind::Transient => DeliveryStatus::FailedTransient,
                FailureKind::Permanent => DeliveryStatus::FailedPermanent,
            },
        }
    }

    /// Skip reason or failure message, stored as the delivery's `last_error`.
    pub fn detail(&self) -> Option<String> {
        match self {
            Outcome::Sent { .. } => None,
            Outcome::Skipped(reason) => Some(reason.to_string()),
            Outcome::Failed { message, .. } => Some(message.clone()),
        }
    }
}

impl From<Result<String, DeliveryError>> for Outcome {
    fn from(result: Result<String, DeliveryError>) -> Self {
        match result {
            Ok(id) => Outcome::Sent {
                message_id: Some(id).filter(|id| !id.is_empty()),
            },
            Err(err) => {
                let kind = match err {
                    DeliveryError::Configuration(_) => FailureKind::Configuration,
                    DeliveryError::Transient(_) => FailureKind::Transient,
                    DeliveryError::Permanent(_) => FailureKind::Permanent,
                };
                Outcome::Failed {
                    kind,
                    message: err.to_string(),
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyResult {
    pub email: Outcome,
    pub sms: Outcome,
}

pub struct ChannelNotifier {
    site_name: String,
    subject_prefix: &'static str,
    templates: Environment<'static>,
    mailer: Ref<dyn EmailSender>,
    sms: Ref<dyn SmsSender>,
}

#[injectable(Notifier)]
impl ChannelNotifier {
    #[inject]
    pub fn create(
        settings: Ref<Settings>,
        mailer: Ref<dyn EmailSender>,
        sms: Ref<dyn SmsSender>,
    ) -> ChannelNotifier {
        ChannelNotifier::new(&settings, mailer, sms)
    }
}

impl ChannelNotifier {
    pub fn new(
        settings: &Settings,
        mailer: Ref<dyn EmailSender>,
        sms: Ref<dyn SmsSender>,
    ) -> ChannelNotifier {
        let mut templates = Environment::new();
        for (name, source) in [
            (RECEIVED_TEMPLATE, RECEIVED_HTML),
            (REPLIED_TEMPLATE, REPLIED_HTML),
        ] {
            if let Err(e) = templates.add_template(name, source) {
                error!("email template {name} is broken: {e}");
            }
        }

        ChannelNotifier {
            site_name: settings.site_name.clone(),
            subject_prefix: if settings.is_development() { "[DEV] " } else { "" },
            templates,
            mailer,
            sms,
        }
    }

    fn subject(&self, text: &str, inquiry: &Inquiry) -> String {
        format!(
            "{}[{}] {text} ({})",
            self.subject_prefix, self.site_name, inquiry.id
        )
    }

    fn render(&self, template: &str, inquiry: &Inquiry) -> Result<String, minijinja::Error> {
        self.templates.get_template(template)?.render(context! {
            site => self.site_name,
            name => inquiry.name,
            ticket_id => inquiry.id.to_string(),
            inquiry_type => inquiry.inquiry_type.label(),
            message => inquiry.message,
            reply => inquiry.reply,
            replied_by => inquiry.replied_by,
        })
    }

    async fn send_email(&self, to: &str, subject: String, html: String, text: String) -> Outcome {
        self.mailer
            .send_email(&OutgoingEmail {
                to: to.to_owned(),
                subject,
                html,
                text,
            })
            .await
            .into()
    }

    pub fn sms_text(&self, inquiry: &Inquiry) -> String {
        format!(
            "[{}] 상담 접수 완료. 접수번호: {}. 24시간 이내 연락드리겠습니다.",
            self.site_name, inquiry.id
        )
    }
}

fn template_failure(e: minijinja::Error) -> Outcome {
    Outcome::Failed {
        kind: FailureKind::Configuration,
        message: format!("template error: {e}"),
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify_email(&self, inquiry: &Inquiry) -> Outcome {
        let Some(to) = inquiry.email.as_deref() else {
            return Outcome::Skipped(SkipReason::NoEmail);
        };

        let html = match self.render(RECEIVED_TEMPLATE, inquiry) {
            Ok(html) => html,
            Err(e) => return template_failure(e),
        };
        let text = format!(
            "{}님, 안녕하세요. {}입니다.\n문의가 정상 접수되었습니다. 24시간 이내 답변드리겠습니다.\n\n접수번호: {}\n문의유형: {}\n문의내용:\n{}",
            inquiry.name,
            self.site_name,
            inquiry.id,
            inquiry.inquiry_type.label(),
            inquiry.message
        );

        self.send_email(to, self.subject("상담 신청이 접수되었습니다", inquiry), html, text)
            .await
    }

    async fn notify_sms(&self, inquiry: &Inquiry) -> Outcome {
        if !self.sms.is_enabled() {
            return Outcome::Skipped(SkipReason::SmsDisabled);
        }

        self.sms
            .send_sms(&OutgoingSms {
                to: inquiry.phone.clone(),
                content: self.sms_text(inquiry),
            })
            .await
            .into()
    }

    async fn notify_reply(&self, inquiry: &Inquiry) -> Outcome {
        let Some(to) = inquiry.email.as_deref() else {
            return Outcome::Skipped(SkipReason::NoEmail);
        };
        let Some(reply) = inquiry.reply.as_deref() else {
            return Outcome::Failed {
                kind: FailureKind::Permanent,
                message: "inquiry has no reply".to_owned(),
            };
        };

        let html = match self.render(REPLIED_TEMPLATE, inquiry) {
            Ok(html) => html,
            Err(e) => return template_failure(e),
        };
        let text = format!(
            "{}님, 안녕하세요. {}입니다.\n문의하신 내용에 대해 답변드립니다.\n\n접수번호: {}\n문의내용:\n{}\n\n답변:\n{reply}",
            inquiry.name, self.site_name, inquiry.id, inquiry.message
        );

        self.send_email(to, self.subject("상담 답변 안내", inquiry), html, text)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::entities::{InquiryStatus, InquiryType};
    use chrono::Utc;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
    }

    #[async_trait]
    impl EmailSender for RecordingMailer {
        async fn send_email(&self, email: &OutgoingEmail) -> Result<String, DeliveryError> {
            self.sent.lock().unwrap().push(email.clone());
            Ok("mail-1".to_owned())
        }
    }

    struct FailingSms;

    #[async_trait]
    impl SmsSender for FailingSms {
        fn is_enabled(&self) -> bool {
            true
        }

        async fn send_sms(&self, _sms: &OutgoingSms) -> Result<String, DeliveryError> {
            Err(DeliveryError::Transient("connection reset".to_owned()))
        }
    }

    struct DisabledSms;

    #[async_trait]
    impl SmsSender for DisabledSms {
        fn is_enabled(&self) -> bool {
            false
        }

        async fn send_sms(&self, _sms: &OutgoingSms) -> Result<String, DeliveryError> {
            panic!("disabled gateway must not be called");
        }
    }

    fn inquiry(email: Option<&str>) -> Inquiry {
        let now = Utc::now();
        Inquiry {
            id: Uuid::new_v4(),
            name: "김영희".to_owned(),
            phone: "01012345678".to_owned(),
            email: email.map(str::to_owned),
            inquiry_type: InquiryType::Visit,
            message: "<b>방문</b> 가능한가요?\n주말도 되나요?".to_owned(),
            status: InquiryStatus::Pending,
            reply: None,
            replied_at: None,
            replied_by: None,
            ip_address: None,
            user_agent: None,
            referrer: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn notifier(settings: &Settings, sms: Ref<dyn SmsSender>) -> (ChannelNotifier, Ref<RecordingMailer>) {
        let mailer = Ref::new(RecordingMailer::default());
        (ChannelNotifier::new(settings, mailer.clone(), sms), mailer)
    }

    #[tokio::test]
    async fn no_email_skips_without_calling_provider() {
        let (notifier, mailer) = notifier(&Settings::default(), Ref::new(DisabledSms));

        let result = notifier.notify(&inquiry(None)).await;

        assert_eq!(
            result,
            NotifyResult {
                email: Outcome::Skipped(SkipReason::NoEmail),
                sms: Outcome::Skipped(SkipReason::SmsDisabled),
            }
        );
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn channels_fail_independently() {
        let (notifier, mailer) = notifier(&Settings::default(), Ref::new(FailingSms));
        let inquiry = inquiry(Some("family@test.kr"));

        let result = notifier.notify(&inquiry).await;

        assert_eq!(
            result.email,
            Outcome::Sent {
                message_id: Some("mail-1".to_owned())
            }
        );
        assert!(matches!(
            result.sms,
            Outcome::Failed {
                kind: FailureKind::Transient,
                ..
            }
        ));
        assert_eq!(result.sms.delivery_status(), DeliveryStatus::FailedTransient);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(
            sent[0].subject,
            format!("[행복한요양원] 상담 신청이 접수되었습니다 ({})", inquiry.id)
        );
        assert!(sent[0].html.contains("&lt;b&gt;방문"));
        assert!(sent[0].html.contains("가능한가요?<br/>주말도 되나요?"));
        assert!(sent[0].html.contains("시설견학"));
    }

    #[tokio::test]
    async fn development_subjects_are_marked() {
        let mut settings = Settings::default();
        settings.environment = "development".to_owned();
        let (notifier, mailer) = notifier(&settings, Ref::new(DisabledSms));

        notifier.notify_email(&inquiry(Some("a@b.kr"))).await;

        assert!(mailer.sent.lock().unwrap()[0].subject.starts_with("[DEV] [행복한요양원]"));
    }

    #[tokio::test]
    async fn reply_email_carries_reply_and_staff_name() {
        let (notifier, mailer) = notifier(&Settings::default(), Ref::new(DisabledSms));
        let mut inquiry = inquiry(Some("family@test.kr"));
        inquiry.reply = Some("주말에도 방문 가능합니다.".to_owned());
        inquiry.replied_by = Some("김관리".to_owned());

        let outcome = notifier.notify_reply(&inquiry).await;

        assert_eq!(outcome.delivery_status(), DeliveryStatus::Sent);
        let sent = mailer.sent.lock().unwrap();
        assert!(sent[0].subject.contains("상담 답변 안내"));
        assert!(sent[0].html.contains("주말에도 방문 가능합니다."));
        assert!(sent[0].html.contains("담당자: 김관리"));
    }

    #[test]
    fn sms_text_names_ticket() {
        let (notifier, _) = notifier(&Settings::default(), Ref::new(DisabledSms));
        let inquiry = inquiry(None);

        assert_eq!(
            notifier.sms_text(&inquiry),
            format!(
                "[행복한요양원] 상담 접수 완료. 접수번호: {}. 24시간 이내 연락드리겠습니다.",
                inquiry.id
            )
        );
    }
}
