use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::{CheckError, DispatchOutcome};
use crate::notify::ReportNotifier;
use crate::severity::{classify, BandCounts, SeverityBand};
use crate::types::{CertificateRecord, ChannelSettings, SmtpSettings};

pub const REPORT_SUBJECT: &str = "SSL Certificate Monitoring Report";

const SMTPS_PORT: u16 = 465;

const STYLE: &str = "\
body{font-family:-apple-system,'Segoe UI',Roboto,Arial,sans-serif;background:#f4f5fb;padding:20px;color:#333}\
.container{max-width:900px;margin:0 auto;background:#fff;border-radius:12px;overflow:hidden}\
.header{background:#667eea;color:#fff;padding:32px;text-align:center}\
.content{padding:32px}\
.stats{display:flex;flex-wrap:wrap;gap:16px;margin-bottom:24px}\
.stat{flex:1;min-width:140px;background:#667eea;color:#fff;padding:16px;border-radius:8px;text-align:center}\
.stat .n{font-size:28px;font-weight:700}\
.alert-section{background:#fff0f0;border:1px solid #dc3545;padding:20px;border-radius:8px;margin-bottom:24px}\
.section-title{border-bottom:3px solid #667eea;padding-bottom:8px;margin:24px 0 12px}\
.cert-card{background:#f8f9fa;border-left:4px solid #28a745;padding:12px 16px;margin-bottom:10px;border-radius:6px}\
.cert-card.critical{border-left-color:#dc3545}\
.cert-card.warning{border-left-color:#ffc107}\
.cert-card.caution{border-left-color:#ff9800}\
.badge{float:right;padding:4px 12px;border-radius:12px;color:#fff;font-weight:600}\
.badge-critical{background:#dc3545}.badge-warning{background:#e0a800}.badge-caution{background:#ff9800}.badge-ok{background:#28a745}\
.footer{background:#f8f9fa;padding:20px;text-align:center;color:#666;font-size:13px}";

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_card(out: &mut String, c: &CertificateRecord) {
    let band = classify(c.days_remaining);
    let _ = write!(
        out,
        "<div class=\"cert-card {band}\"><span class=\"badge badge-{band}\">{days} days</span>\
<strong>{label}</strong><br>Address: {addr}<br>Certificate: {cn}<br>Expires: {expires}</div>",
        band = band.as_str(),
        days = c.days_remaining,
        label = escape_html(&c.label),
        addr = escape_html(&c.host_port),
        cn = escape_html(&c.common_name),
        expires = c.expires_at.format("%B %-d, %Y"),
    );
}

/// HTML report: counters, the expiring subsection, then every record grouped by band.
pub fn build_email_body(all: &[CertificateRecord], expiring: &[CertificateRecord]) -> String {
    let counts = BandCounts::from_records(all);
    let mut out = String::new();

    let _ = write!(
        out,
        "<!DOCTYPE html><html><head><meta charset=\"UTF-8\"><style>{}</style></head><body>\
<div class=\"container\"><div class=\"header\"><h1>🔒 SSL Certificate Report</h1>\
<p>Automated monitoring of {} certificate(s)</p></div><div class=\"content\">",
        STYLE,
        all.len()
    );

    out.push_str("<div class=\"stats\">");
    let _ = write!(out, "<div class=\"stat\"><div class=\"n\">{}</div>Total</div>", counts.total());
    for band in SeverityBand::ALL {
        let _ = write!(
            out,
            "<div class=\"stat stat-{}\"><div class=\"n\">{}</div>{}</div>",
            band.as_str(),
            counts.get(band),
            band.title()
        );
    }
    out.push_str("</div>");

    if !expiring.is_empty() {
        let _ = write!(
            out,
            "<div class=\"alert-section\"><h2>⚠️ Expiring Soon ({})</h2>",
            expiring.len()
        );
        for c in expiring {
            render_card(&mut out, c);
        }
        out.push_str("</div>");
    }

    out.push_str("<h2 class=\"section-title\">📋 All Monitored Certificates</h2>");
    for band in SeverityBand::ALL {
        let in_band: Vec<&CertificateRecord> = all
            .iter()
            .filter(|c| classify(c.days_remaining) == band)
            .collect();
        if in_band.is_empty() {
            continue;
        }
        let _ = write!(out, "<h3>{} {} ({})</h3>", band.emoji(), band.title(), in_band.len());
        for c in in_band {
            render_card(&mut out, c);
        }
    }

    out.push_str("</div><div class=\"footer\">Generated by ssl-cert-monitor</div></div></body></html>");
    out
}

pub fn build_report_message(
    settings: &SmtpSettings,
    all: &[CertificateRecord],
    expiring: &[CertificateRecord],
) -> Result<Message> {
    let from: Mailbox = settings.from.parse().context("Invalid EMAIL_FROM address")?;
    let mut builder = Message::builder().from(from).subject(REPORT_SUBJECT);
    for to in &settings.to {
        let to: Mailbox = to.parse().with_context(|| format!("Invalid EMAIL_TO address '{}'", to))?;
        builder = builder.to(to);
    }
    let message = builder
        .header(ContentType::TEXT_HTML)
        .body(build_email_body(all, expiring))
        .context("Failed to build report email")?;
    Ok(message)
}

/// Seam between message construction and the wire.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, message: Message) -> Result<()>;
}

pub struct SmtpMailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    pub fn new(settings: &SmtpSettings, timeout: Duration) -> Result<Self> {
        let mut builder = if settings.port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
        } else {
            let tls = TlsParameters::new(settings.host.clone())
                .context("Invalid SMTP TLS parameters")?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                .tls(Tls::Opportunistic(tls))
        };
        builder = builder.port(settings.port).timeout(Some(timeout));

        if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self { transport: builder.build() })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn deliver(&self, message: Message) -> Result<()> {
        self.transport.send(message).await.context("SMTP delivery failed")?;
        Ok(())
    }
}

/// Report channel: one HTML email per cycle to every configured recipient.
pub struct EmailNotifier {
    delivery: Result<(SmtpSettings, Arc<dyn MailTransport>), Vec<&'static str>>,
}

impl EmailNotifier {
    pub fn new(settings: ChannelSettings<SmtpSettings>, timeout: Duration) -> Result<Self> {
        let delivery = match settings {
            ChannelSettings::Configured(s) => {
                let transport: Arc<dyn MailTransport> = Arc::new(SmtpMailTransport::new(&s, timeout)?);
                Ok((s, transport))
            }
            ChannelSettings::Missing(keys) => Err(keys),
        };
        Ok(Self { delivery })
    }

    pub fn with_transport(settings: SmtpSettings, transport: Arc<dyn MailTransport>) -> Self {
        Self { delivery: Ok((settings, transport)) }
    }

    pub fn unconfigured(missing: Vec<&'static str>) -> Self {
        Self { delivery: Err(missing) }
    }
}

#[async_trait]
impl ReportNotifier for EmailNotifier {
    async fn send_report(
        &self,
        all: &[CertificateRecord],
        expiring: &[CertificateRecord],
    ) -> DispatchOutcome {
        let (settings, transport) = match &self.delivery {
            Ok((settings, transport)) => (settings, transport),
            Err(keys) => {
                let reason = CheckError::ConfigurationMissing { channel: "email", missing: keys.clone() };
                warn!("{}, skipping email notification", reason);
                return DispatchOutcome::Skipped(reason);
            }
        };

        let result = match build_report_message(settings, all, expiring) {
            Ok(message) => transport.deliver(message).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!(certificates = all.len(), expiring = expiring.len(), "Email sent successfully");
                DispatchOutcome::Delivered
            }
            Err(e) => {
                let err = CheckError::dispatch("email", format!("{:#}", e));
                error!("{}", err);
                DispatchOutcome::Failed(err)
            }
        }
    }
}
