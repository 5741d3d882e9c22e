use chrono::{DateTime, Local, NaiveTime, TimeZone};
use std::future::Future;
use std::sync::Arc;
use tracing::{info, warn};

use crate::checker::CertificateChecker;

/// Next wall-clock occurrence of `at` strictly after `now`. Local times that
/// fall into a DST gap are skipped to the following day.
pub fn next_run_after<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> DateTime<Tz> {
    let tz = now.timezone();
    let mut date = now.date_naive();
    for _ in 0..4 {
        if let Some(candidate) = tz.from_local_datetime(&date.and_time(at)).earliest() {
            if candidate > *now {
                return candidate;
            }
        }
        date = match date.succ_opt() {
            Some(d) => d,
            None => break,
        };
    }
    now.clone() + chrono::Duration::days(1)
}

/// Runs one cycle immediately, then once a day at `at` local time, until `shutdown` resolves.
pub async fn run<F>(checker: Arc<CertificateChecker>, at: NaiveTime, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                warn!("Shutdown requested during a check cycle, abandoning it");
                break;
            }
            _ = checker.run_cycle() => {}
        }

        let now = Local::now();
        let next = next_run_after(&now, at);
        info!("Next check scheduled at {}", next.format("%Y-%m-%d %H:%M:%S %Z"));
        let wait = (next - now).to_std().unwrap_or_default();

        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(wait) => {}
        }
    }

    info!("Scheduler stopped");
}

/// Resolves on SIGINT or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT"),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C");
    }
}
