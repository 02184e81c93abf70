//! Process configuration, read from the environment (and `.env` if present)

use di::{inject, injectable};
use log::warn;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_SITE_NAME: &str = "행복한요양원";

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_address: String,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub site_name: String,
    pub email: EmailSettings,
    pub sms: SmsSettings,
    pub http_timeout: Duration,
    pub delivery: DeliverySettings,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub from: String,
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SmsSettings {
    pub enabled: bool,
    pub api_url: String,
    pub service_id: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub caller: Option<String>,
}

/// Retry policy of the notification outbox.
#[derive(Debug, Clone, Copy)]
pub struct DeliverySettings {
    pub max_attempts: u32,
    pub sweep_interval: Duration,
    pub lease: Duration,
}

#[injectable]
impl Settings {
    #[inject]
    pub fn create() -> Settings {
        dotenvy::dotenv().ok();
        Settings::from_env()
    }
}

impl Settings {
    pub fn from_env() -> Settings {
        let defaults = Settings::default();

        Settings {
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_address: var("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            cors_origins: var("CORS_ORIGINS")
                .map(|origins| split_list(&origins))
                .unwrap_or(defaults.cors_origins),
            environment: var("ENVIRONMENT").unwrap_or(defaults.environment),
            site_name: var("SITE_NAME").unwrap_or(defaults.site_name),
            email: EmailSettings {
                api_url: var("EMAIL_API_URL").unwrap_or(defaults.email.api_url),
                api_key: var("EMAIL_API_KEY"),
                from: var("MAIL_FROM").unwrap_or(defaults.email.from),
                reply_to: var("MAIL_REPLY_TO"),
            },
            sms: SmsSettings {
                enabled: parsed("SMS_ENABLED", defaults.sms.enabled),
                api_url: var("SENS_API_URL").unwrap_or(defaults.sms.api_url),
                service_id: var("SENS_SERVICE_ID"),
                access_key: var("SENS_ACCESS_KEY"),
                secret_key: var("SENS_SECRET_KEY"),
                caller: var("SENS_CALLER"),
            },
            http_timeout: Duration::from_secs(parsed("HTTP_TIMEOUT_SECS", 20)),
            delivery: DeliverySettings {
                max_attempts: parsed("NOTIFY_MAX_ATTEMPTS", defaults.delivery.max_attempts),
                sweep_interval: Duration::from_secs(parsed("NOTIFY_SWEEP_INTERVAL_SECS", 60)),
                lease: Duration::from_secs(parsed("NOTIFY_LEASE_SECS", 300)),
            },
        }
    }

    /// Development environments get a visible marker on outgoing mail.
    pub fn is_development(&self) -> bool {
        matches!(
            self.environment.to_lowercase().as_str(),
            "dev" | "development" | "local"
        )
    }

    /// Names of the credentials that an enabled channel needs but that are not set.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if self.email.api_key.is_none() {
            missing.push("EMAIL_API_KEY");
        }

        if self.sms.enabled {
            for (name, value) in [
                ("SENS_SERVICE_ID", &self.sms.service_id),
                ("SENS_ACCESS_KEY", &self.sms.access_key),
                ("SENS_SECRET_KEY", &self.sms.secret_key),
                ("SENS_CALLER", &self.sms.caller),
            ] {
                if value.is_none() {
                    missing.push(name);
                }
            }
        }

        missing
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: "sqlite://carehome.db?mode=rwc".to_owned(),
            bind_address: "0.0.0.0:3000".to_owned(),
            cors_origins: vec![
                "http://localhost:3000".to_owned(),
                "http://localhost:5173".to_owned(),
            ],
            environment: "production".to_owned(),
            site_name: DEFAULT_SITE_NAME.to_owned(),
            email: EmailSettings {
                api_url: "https://api.resend.com".to_owned(),
                api_key: None,
                from: format!("{DEFAULT_SITE_NAME} <no-reply@example.com>"),
                reply_to: None,
            },
            sms: SmsSettings {
                enabled: false,
                api_url: "https://sens.apigw.ntruss.com".to_owned(),
                service_id: None,
                access_key: None,
                secret_key: None,
                caller: None,
            },
            http_timeout: Duration::from_secs(20),
            delivery: DeliverySettings {
                max_attempts: 5,
                sweep_interval: Duration::from_secs(60),
                lease: Duration::from_secs(300),
            },
        }
    }
}

/// Non-empty, trimmed environment variable.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parsed<T: FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match var(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("ignoring malformed {name}={raw:?}, using {default}");
            default
        }),
        None => default,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
