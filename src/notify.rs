use async_trait::async_trait;

use crate::error::DispatchOutcome;
use crate::types::CertificateRecord;

/// Full status report: every inspected certificate plus the expiring subset.
///
/// Implementations log their own outcome and never propagate failures.
#[async_trait]
pub trait ReportNotifier: Send + Sync {
    async fn send_report(
        &self,
        all: &[CertificateRecord],
        expiring: &[CertificateRecord],
    ) -> DispatchOutcome;
}

/// Condensed alert covering only certificates inside the expiry threshold.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn send_alert(&self, expiring: &[CertificateRecord]) -> DispatchOutcome;
}
