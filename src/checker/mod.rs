use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::error::{CheckError, DispatchOutcome};
use crate::inspector::CertificateInspector;
use crate::notify::{AlertNotifier, ReportNotifier};
use crate::report::CheckResult;
use crate::types::{CertificateRecord, Endpoint};

/// Outcome of one cycle. A `None` outcome means the dispatcher was not invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub result: CheckResult,
    pub report_outcome: Option<DispatchOutcome>,
    pub alert_outcome: Option<DispatchOutcome>,
}

/// Runs check cycles over a fixed set of endpoints.
pub struct CertificateChecker {
    endpoints: Vec<Endpoint>,
    inspector: Arc<dyn CertificateInspector>,
    report_notifier: Arc<dyn ReportNotifier>,
    alert_notifier: Arc<dyn AlertNotifier>,
    permits: Arc<Semaphore>,
    cycle_lock: Mutex<()>,
}

impl CertificateChecker {
    pub fn new(
        endpoints: Vec<Endpoint>,
        inspector: Arc<dyn CertificateInspector>,
        report_notifier: Arc<dyn ReportNotifier>,
        alert_notifier: Arc<dyn AlertNotifier>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            endpoints,
            inspector,
            report_notifier,
            alert_notifier,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            cycle_lock: Mutex::new(()),
        }
    }

    /// One full pass: inspect every endpoint, then notify. Concurrent callers queue up.
    ///
    /// Dropping the returned future abandons the cycle: in-flight inspections are
    /// aborted and nothing is dispatched.
    pub async fn run_cycle(&self) -> CycleReport {
        let _guard = self.cycle_lock.lock().await;
        info!("Starting certificate check...");

        if self.endpoints.is_empty() {
            info!("No endpoints configured, nothing to check");
            return CycleReport {
                result: CheckResult::new(),
                report_outcome: None,
                alert_outcome: None,
            };
        }

        let result = CheckResult::from_records(self.inspect_all().await);
        let summary = result.summary();
        info!(
            checked = summary.total,
            failed = self.endpoints.len() - summary.total,
            expiring = summary.expiring,
            "Inspection finished"
        );

        let report_outcome = if result.is_empty() {
            None
        } else {
            Some(self.report_notifier.send_report(&result.all, &result.expiring).await)
        };

        let alert_outcome = if result.has_expiring() {
            Some(self.alert_notifier.send_alert(&result.expiring).await)
        } else {
            None
        };

        info!("Certificate check completed");
        CycleReport { result, report_outcome, alert_outcome }
    }

    /// Successful records in configuration order; failures are logged and dropped.
    async fn inspect_all(&self) -> Vec<CertificateRecord> {
        let mut tasks = JoinSet::new();
        for (index, endpoint) in self.endpoints.iter().cloned().enumerate() {
            let inspector = Arc::clone(&self.inspector);
            let permits = Arc::clone(&self.permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let outcome = inspector.inspect(&endpoint).await;
                (index, endpoint, outcome)
            });
        }

        let mut finished: Vec<(usize, CertificateRecord)> = Vec::with_capacity(self.endpoints.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(record))) => {
                    info!(
                        label = %record.label,
                        address = %record.host_port,
                        days_remaining = record.days_remaining,
                        "{} ({}): expires in {} days",
                        record.label, record.host_port, record.days_remaining
                    );
                    finished.push((index, record));
                }
                Ok((_, endpoint, Err(e))) => log_inspection_failure(&endpoint, &e),
                Err(e) => error!("Inspection task failed: {}", e),
            }
        }

        finished.sort_by_key(|(index, _)| *index);
        finished.into_iter().map(|(_, record)| record).collect()
    }
}

fn log_inspection_failure(endpoint: &Endpoint, err: &CheckError) {
    error!(
        label = %endpoint.label,
        address = %endpoint.address,
        "Error checking {} ({}): {}",
        endpoint.label, endpoint.address, err
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    struct FakeInspector {
        days: HashMap<String, i64>,
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl FakeInspector {
        fn new(days: &[(&str, i64)]) -> Self {
            Self {
                days: days.iter().map(|(l, d)| (l.to_string(), *d)).collect(),
                delay: Duration::from_millis(0),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl CertificateInspector for FakeInspector {
        async fn inspect(&self, endpoint: &Endpoint) -> Result<CertificateRecord, CheckError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.days.get(&endpoint.label) {
                Some(days) => Ok(CertificateRecord {
                    label: endpoint.label.clone(),
                    host_port: endpoint.address.clone(),
                    common_name: endpoint.address.clone(),
                    expires_at: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
                    days_remaining: *days,
                }),
                None => Err(CheckError::inspection(&endpoint.label, &endpoint.address, "connection refused")),
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        reports: StdMutex<Vec<(Vec<String>, Vec<String>)>>,
        alerts: StdMutex<Vec<Vec<String>>>,
    }

    fn labels(records: &[CertificateRecord]) -> Vec<String> {
        records.iter().map(|r| r.label.clone()).collect()
    }

    #[async_trait]
    impl ReportNotifier for Recorder {
        async fn send_report(&self, all: &[CertificateRecord], expiring: &[CertificateRecord]) -> DispatchOutcome {
            self.reports.lock().unwrap().push((labels(all), labels(expiring)));
            DispatchOutcome::Delivered
        }
    }

    #[async_trait]
    impl AlertNotifier for Recorder {
        async fn send_alert(&self, expiring: &[CertificateRecord]) -> DispatchOutcome {
            self.alerts.lock().unwrap().push(labels(expiring));
            DispatchOutcome::Delivered
        }
    }

    fn endpoints(labels: &[&str]) -> Vec<Endpoint> {
        labels.iter().map(|l| Endpoint::new(*l, format!("{}.example.com", l))).collect()
    }

    fn checker(eps: Vec<Endpoint>, inspector: Arc<FakeInspector>, recorder: Arc<Recorder>, max: usize) -> CertificateChecker {
        CertificateChecker::new(eps, inspector, recorder.clone(), recorder, max)
    }

    #[tokio::test]
    async fn test_empty_configuration_sends_nothing() {
        let recorder = Arc::new(Recorder::default());
        let checker = checker(vec![], Arc::new(FakeInspector::new(&[])), recorder.clone(), 4);

        let report = checker.run_cycle().await;
        assert!(report.result.is_empty());
        assert_eq!(report.report_outcome, None);
        assert_eq!(report.alert_outcome, None);
        assert!(recorder.reports.lock().unwrap().is_empty());
        assert!(recorder.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_failures_send_nothing() {
        let recorder = Arc::new(Recorder::default());
        let checker = checker(endpoints(&["a", "b"]), Arc::new(FakeInspector::new(&[])), recorder.clone(), 4);

        let report = checker.run_cycle().await;
        assert!(report.result.is_empty());
        assert!(recorder.reports.lock().unwrap().is_empty());
        assert!(recorder.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let recorder = Arc::new(Recorder::default());
        let inspector = Arc::new(FakeInspector::new(&[("a", 3), ("c", 60)]));
        let checker = checker(endpoints(&["a", "b", "c"]), inspector, recorder.clone(), 4);

        let report = checker.run_cycle().await;
        assert_eq!(labels(&report.result.all), vec!["a", "c"]);
        assert_eq!(labels(&report.result.expiring), vec!["a"]);
        assert_eq!(
            *recorder.reports.lock().unwrap(),
            vec![(vec!["a".to_string(), "c".to_string()], vec!["a".to_string()])]
        );
        assert_eq!(*recorder.alerts.lock().unwrap(), vec![vec!["a".to_string()]]);
    }

    #[tokio::test]
    async fn test_no_expiring_skips_alert() {
        let recorder = Arc::new(Recorder::default());
        let inspector = Arc::new(FakeInspector::new(&[("a", 15), ("b", 90)]));
        let checker = checker(endpoints(&["a", "b"]), inspector, recorder.clone(), 4);

        let report = checker.run_cycle().await;
        assert_eq!(report.report_outcome, Some(DispatchOutcome::Delivered));
        assert_eq!(report.alert_outcome, None);
        assert!(recorder.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_order_follows_configuration_not_completion() {
        let recorder = Arc::new(Recorder::default());
        let inspector = Arc::new(
            FakeInspector::new(&[("a", 1), ("b", 2), ("c", 3), ("d", 4)]).with_delay(Duration::from_millis(5)),
        );
        let checker = checker(endpoints(&["d", "b", "a", "c"]), inspector, recorder, 4);

        let report = checker.run_cycle().await;
        assert_eq!(labels(&report.result.all), vec!["d", "b", "a", "c"]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let recorder = Arc::new(Recorder::default());
        let pairs: Vec<(String, i64)> = (0..12).map(|i| (format!("e{}", i), 40)).collect();
        let refs: Vec<(&str, i64)> = pairs.iter().map(|(l, d)| (l.as_str(), *d)).collect();
        let inspector = Arc::new(FakeInspector::new(&refs).with_delay(Duration::from_millis(20)));
        let names: Vec<&str> = pairs.iter().map(|(l, _)| l.as_str()).collect();
        let checker = checker(endpoints(&names), inspector.clone(), recorder, 3);

        let report = checker.run_cycle().await;
        assert_eq!(report.result.all.len(), 12);
        let peak = inspector.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak concurrency {} exceeded bound", peak);
        assert!(peak >= 1);
    }

    #[tokio::test]
    async fn test_cycles_are_serialized() {
        let recorder = Arc::new(Recorder::default());
        let inspector = Arc::new(FakeInspector::new(&[("a", 5)]).with_delay(Duration::from_millis(20)));
        let checker = Arc::new(checker(endpoints(&["a"]), inspector.clone(), recorder.clone(), 4));

        let (first, second) = tokio::join!(checker.run_cycle(), checker.run_cycle());
        assert_eq!(first.result, second.result);
        assert_eq!(inspector.peak.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.reports.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_abandoned_cycle_notifies_nothing() {
        let recorder = Arc::new(Recorder::default());
        let inspector = Arc::new(FakeInspector::new(&[("a", 5)]).with_delay(Duration::from_secs(5)));
        let checker = checker(endpoints(&["a"]), inspector, recorder.clone(), 4);

        let abandoned = tokio::time::timeout(Duration::from_millis(50), checker.run_cycle()).await;
        assert!(abandoned.is_err());
        assert!(recorder.reports.lock().unwrap().is_empty());
        assert!(recorder.alerts.lock().unwrap().is_empty());
    }
}
