//! SMS over the SENS gateway, requests signed with HMAC-SHA256

use crate::infrastructure::settings::{Settings, SmsSettings};
use crate::infrastructure::traits::{DeliveryError, OutgoingSms, SmsSender};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use di::{Ref, inject, injectable};
use hmac::{Hmac, Mac};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

const TIMESTAMP_HEADER: &str = "x-ncp-apigw-timestamp";
const ACCESS_KEY_HEADER: &str = "x-ncp-iam-access-key";
const SIGNATURE_HEADER: &str = "x-ncp-apigw-signature-v2";

/// Longest body that still goes out as a short message, in gateway bytes.
const SHORT_MESSAGE_BYTES: usize = 80;

type HmacSha256 = Hmac<Sha256>;

/// Base64 HMAC-SHA256 over `"{method} {path}\n{timestamp}\n{access_key}"`.
pub fn make_signature(
    method: &str,
    path: &str,
    timestamp: &str,
    access_key: &str,
    secret_key: &str,
) -> Result<String, DeliveryError> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| DeliveryError::Configuration(format!("unusable SENS_SECRET_KEY: {e}")))?;
    mac.update(format!("{method} {path}\n{timestamp}\n{access_key}").as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// `SMS` up to 80 bytes, `LMS` beyond. Non-ASCII characters count as two bytes.
pub fn message_type(content: &str) -> &'static str {
    let size: usize = content
        .chars()
        .map(|c| if c.is_ascii() { 1 } else { 2 })
        .sum();

    if size <= SHORT_MESSAGE_BYTES { "SMS" } else { "LMS" }
}

pub fn digits_only(number: &str) -> String {
    number.chars().filter(char::is_ascii_digit).collect()
}

#[derive(Serialize)]
struct SendSmsRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    from: String,
    content: &'a str,
    messages: [Recipient; 1],
}

#[derive(Serialize)]
struct Recipient {
    to: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendSmsResponse {
    request_id: String,
}

pub struct SensSmsGateway {
    http_client: reqwest::Client,
    config: SmsSettings,
}

#[injectable(SmsSender)]
impl SensSmsGateway {
    #[inject]
    pub fn create(settings: Ref<Settings>) -> SensSmsGateway {
        SensSmsGateway::new(settings.sms.clone(), settings.http_timeout)
    }
}

impl SensSmsGateway {
    pub fn new(config: SmsSettings, timeout: Duration) -> SensSmsGateway {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("failed to build SMS client, using defaults: {e}");
                reqwest::Client::new()
            });

        SensSmsGateway {
            http_client,
            config,
        }
    }

    fn credential<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, DeliveryError> {
        value
            .as_deref()
            .ok_or_else(|| DeliveryError::Configuration(format!("{name} is not set")))
    }
}

#[async_trait]
impl SmsSender for SensSmsGateway {
    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    async fn send_sms(&self, sms: &OutgoingSms) -> Result<String, DeliveryError> {
        let service_id = Self::credential(&self.config.service_id, "SENS_SERVICE_ID")?;
        let access_key = Self::credential(&self.config.access_key, "SENS_ACCESS_KEY")?;
        let secret_key = Self::credential(&self.config.secret_key, "SENS_SECRET_KEY")?;
        let caller = Self::credential(&self.config.caller, "SENS_CALLER")?;

        let path = format!("/sms/v2/services/{service_id}/messages");
        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = make_signature("POST", &path, &timestamp, access_key, secret_key)?;

        let url = format!("{}{path}", self.config.api_url.trim_end_matches('/'));
        debug!("sending SMS via {url}");

        let response = self
            .http_client
            .post(&url)
            .header(TIMESTAMP_HEADER, &timestamp)
            .header(ACCESS_KEY_HEADER, access_key)
            .header(SIGNATURE_HEADER, signature)
            .json(&SendSmsRequest {
                kind: message_type(&sms.content),
                from: digits_only(caller),
                content: &sms.content,
                messages: [Recipient {
                    to: digits_only(&sms.to),
                }],
            })
            .send()
            .await
            .map_err(DeliveryError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(DeliveryError::from_status(status, &detail));
        }

        match response.json::<SendSmsResponse>().await {
            Ok(sent) => Ok(sent.request_id),
            Err(e) => {
                warn!("SMS accepted but the response was unreadable: {e}");
                Ok(String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

    /// Recomputes the signature from the request's own timestamp header.
    struct SignedWith {
        access_key: &'static str,
        secret_key: &'static str,
    }

    impl Match for SignedWith {
        fn matches(&self, request: &Request) -> bool {
            let header = |name: &str| {
                request
                    .headers
                    .get(name)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_owned)
            };

            match (header(TIMESTAMP_HEADER), header(SIGNATURE_HEADER)) {
                (Some(timestamp), Some(signature)) => {
                    make_signature(
                        "POST",
                        request.url.path(),
                        &timestamp,
                        self.access_key,
                        self.secret_key,
                    )
                    .ok()
                        == Some(signature)
                }
                _ => false,
            }
        }
    }

    fn gateway(server: &MockServer) -> SensSmsGateway {
        SensSmsGateway::new(
            SmsSettings {
                enabled: true,
                api_url: server.uri(),
                service_id: Some("ncp:sms:kr:1234:carehome".to_owned()),
                access_key: Some("ACCESS".to_owned()),
                secret_key: Some("SECRET".to_owned()),
                caller: Some("02-123-4567".to_owned()),
            },
            Duration::from_secs(5),
        )
    }

    #[test]
    fn signature_is_base64_sha256() {
        let signature = make_signature("POST", "/sms/v2/services/x/messages", "1", "a", "s").unwrap();
        assert_eq!(signature.len(), 44);
        assert!(signature.ends_with('='));
        assert_ne!(
            signature,
            make_signature("POST", "/sms/v2/services/x/messages", "2", "a", "s").unwrap()
        );
    }

    #[test]
    fn korean_text_counts_double() {
        assert_eq!(message_type(&"a".repeat(80)), "SMS");
        assert_eq!(message_type(&"가".repeat(40)), "SMS");
        assert_eq!(message_type(&"가".repeat(41)), "LMS");
    }

    #[test]
    fn numbers_are_reduced_to_digits() {
        assert_eq!(digits_only("010-1234-5678"), "01012345678");
        assert_eq!(digits_only(" 02) 123 4567 "), "021234567");
    }

    #[tokio::test]
    async fn sends_signed_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/sms/v2/services/ncp:sms:kr:1234:carehome/messages"))
            .and(header(ACCESS_KEY_HEADER, "ACCESS"))
            .and(SignedWith {
                access_key: "ACCESS",
                secret_key: "SECRET",
            })
            .and(body_partial_json(json!({
                "type": "SMS",
                "from": "021234567",
                "messages": [{"to": "01012345678"}]
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "requestId": "req-1",
                "statusCode": "202",
                "statusName": "success"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = gateway(&server)
            .send_sms(&OutgoingSms {
                to: "010-1234-5678".to_owned(),
                content: "접수 완료".to_owned(),
            })
            .await
            .unwrap();
        assert_eq!(id, "req-1");
    }

    #[tokio::test]
    async fn missing_credentials_are_reported_before_sending() {
        let server = MockServer::start().await;
        let mut gateway = gateway(&server);
        gateway.config.secret_key = None;

        let err = gateway
            .send_sms(&OutgoingSms {
                to: "01012345678".to_owned(),
                content: "test".to_owned(),
            })
            .await
            .unwrap_err();

        assert_eq!(
            err,
            DeliveryError::Configuration("SENS_SECRET_KEY is not set".to_owned())
        );
    }

    #[tokio::test]
    async fn unauthorized_is_permanent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .send_sms(&OutgoingSms {
                to: "01012345678".to_owned(),
                content: "test".to_owned(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Permanent(_)));
    }
}
