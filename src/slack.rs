use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::{CheckError, DispatchOutcome};
use crate::notify::AlertNotifier;
use crate::severity::classify;
use crate::types::{CertificateRecord, ChannelSettings, SlackPayload};

pub const ALERT_TITLE: &str = "🚨 SSL Certificates Expiring Soon";

pub fn build_alert_message(expiring: &[CertificateRecord]) -> String {
    let mut lines: Vec<String> = vec!["🚨 *SSL Certificates Expiring Soon*".to_string(), String::new()];
    for c in expiring {
        lines.push(format!("{} *{}* ({})", classify(c.days_remaining).emoji(), c.label, c.host_port));
        lines.push(format!("• Certificate: {}", c.common_name));
        lines.push(format!("• Days Remaining: *{}*", c.days_remaining));
        lines.push(format!("• Expires: {}", c.expires_at.format("%Y-%m-%d")));
        lines.push(String::new());
    }
    lines.join("\n")
}

pub fn build_slack_payload(expiring: &[CertificateRecord]) -> SlackPayload {
    let message = build_alert_message(expiring);
    let blocks = vec![
        serde_json::json!({
            "type": "header",
            "text": {"type": "plain_text", "text": ALERT_TITLE}
        }),
        serde_json::json!({
            "type": "section",
            "text": {"type": "mrkdwn", "text": message}
        }),
    ];

    SlackPayload { text: Some(message), blocks }
}

pub async fn send_to_slack(client: &reqwest::Client, webhook_url: &str, payload: &SlackPayload) -> Result<()> {
    let res = client
        .post(webhook_url)
        .json(payload)
        .send()
        .await
        .context("Failed to send Slack request")?;
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        error!("Slack webhook failed: {} - {}", status, body);
        return Err(anyhow!("Slack webhook returned non-success status {}", status));
    }
    Ok(())
}

/// Alert channel delivering to a Slack-compatible incoming webhook.
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: ChannelSettings<String>,
}

impl SlackNotifier {
    pub fn new(webhook_url: ChannelSettings<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self { client, webhook_url })
    }
}

#[async_trait]
impl AlertNotifier for SlackNotifier {
    async fn send_alert(&self, expiring: &[CertificateRecord]) -> DispatchOutcome {
        let webhook_url = match &self.webhook_url {
            ChannelSettings::Configured(url) => url,
            ChannelSettings::Missing(keys) => {
                let reason = CheckError::ConfigurationMissing { channel: "slack", missing: keys.clone() };
                warn!("{}, skipping Slack notification", reason);
                return DispatchOutcome::Skipped(reason);
            }
        };

        let payload = build_slack_payload(expiring);
        match send_to_slack(&self.client, webhook_url, &payload).await {
            Ok(()) => {
                info!(certificates = expiring.len(), "Slack notification sent successfully");
                DispatchOutcome::Delivered
            }
            Err(e) => {
                let err = CheckError::dispatch("slack", format!("{:#}", e));
                error!("{}", err);
                DispatchOutcome::Failed(err)
            }
        }
    }
}
