use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use ssl_cert_monitor::config::load_config;
use ssl_cert_monitor::email::EmailNotifier;
use ssl_cert_monitor::inspector::TlsInspector;
use ssl_cert_monitor::logging::init_logging;
use ssl_cert_monitor::scheduler;
use ssl_cert_monitor::slack::SlackNotifier;
use ssl_cert_monitor::CertificateChecker;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = load_config()?;
    init_logging(&cfg.log_file)?;
    info!("SSL Certificate Monitor started");
    info!(
        endpoints = cfg.endpoints.len(),
        email = cfg.smtp.is_configured(),
        slack = cfg.slack_webhook_url.is_configured(),
        "Loaded configuration"
    );

    let timeout = Duration::from_secs(cfg.timeout_secs);
    let inspector = TlsInspector::new(timeout).context("Failed to build TLS client")?;
    let email = EmailNotifier::new(cfg.smtp.clone(), timeout)?;
    let slack = SlackNotifier::new(cfg.slack_webhook_url.clone(), timeout)?;

    let checker = Arc::new(CertificateChecker::new(
        cfg.endpoints.clone(),
        Arc::new(inspector),
        Arc::new(email),
        Arc::new(slack),
        cfg.max_concurrent_checks,
    ));

    info!("Scheduled daily check at {}", cfg.check_time.format("%H:%M"));
    scheduler::run(checker, cfg.check_time, scheduler::shutdown_signal()).await;
    Ok(())
}
