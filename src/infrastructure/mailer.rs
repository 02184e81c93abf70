//! Transactional email over the provider's HTTP API

use crate::infrastructure::settings::{EmailSettings, Settings};
use crate::infrastructure::traits::{DeliveryError, EmailSender, OutgoingEmail};
use async_trait::async_trait;
use di::{Ref, inject, injectable};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

#[derive(Deserialize)]
struct SendEmailResponse {
    id: String,
}

pub struct ResendMailer {
    http_client: reqwest::Client,
    config: EmailSettings,
}

#[injectable(EmailSender)]
impl ResendMailer {
    #[inject]
    pub fn create(settings: Ref<Settings>) -> ResendMailer {
        ResendMailer::new(settings.email.clone(), settings.http_timeout)
    }
}

impl ResendMailer {
    pub fn new(config: EmailSettings, timeout: Duration) -> ResendMailer {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("failed to build email client, using defaults: {e}");
                reqwest::Client::new()
            });

        ResendMailer {
            http_client,
            config,
        }
    }
}

#[async_trait]
impl EmailSender for ResendMailer {
    async fn send_email(&self, email: &OutgoingEmail) -> Result<String, DeliveryError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| DeliveryError::Configuration("EMAIL_API_KEY is not set".to_owned()))?;

        let url = format!("{}/emails", self.config.api_url.trim_end_matches('/'));
        debug!("sending email to {} via {url}", email.to);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&SendEmailRequest {
                from: &self.config.from,
                to: [&email.to],
                subject: &email.subject,
                html: &email.html,
                text: &email.text,
                reply_to: self.config.reply_to.as_deref(),
            })
            .send()
            .await
            .map_err(DeliveryError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DeliveryError::from_status(status, &detail));
        }

        // The mail is on its way at this point, an unreadable body must not cause a resend.
        match response.json::<SendEmailResponse>().await {
            Ok(sent) => Ok(sent.id),
            Err(e) => {
                warn!("email accepted but the response was unreadable: {e}");
                Ok(String::new())
            }
        }
    }
}
