use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoints: Vec<Endpoint>,
    pub smtp: ChannelSettings<SmtpSettings>,
    pub slack_webhook_url: ChannelSettings<String>,
    pub log_file: String,
    pub timeout_secs: u64,
    pub max_concurrent_checks: usize,
    pub check_time: NaiveTime,
}

/// A configured endpoint: the label comes from the `URL_<label>` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub label: String,
    pub address: String,
}

impl Endpoint {
    pub fn new<L, A>(label: L, address: A) -> Self
    where
        L: Into<String>,
        A: Into<String>,
    {
        Self {
            label: label.into(),
            address: address.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub to: Vec<String>,
}

/// Delivery settings for one notification channel, or the keys that were absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSettings<T> {
    Configured(T),
    Missing(Vec<&'static str>),
}

impl<T> ChannelSettings<T> {
    pub fn as_configured(&self) -> Option<&T> {
        match self {
            ChannelSettings::Configured(v) => Some(v),
            ChannelSettings::Missing(_) => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, ChannelSettings::Configured(_))
    }
}

/// Snapshot of one endpoint's leaf certificate, taken during a single cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    pub label: String,
    pub host_port: String,
    pub common_name: String,
    pub expires_at: DateTime<Utc>,
    pub days_remaining: i64,
}

#[derive(Debug, Serialize)]
pub struct SlackPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub blocks: Vec<serde_json::Value>,
}
