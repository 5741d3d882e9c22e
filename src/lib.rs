// Public modules
pub mod types;
pub mod error;
pub mod config;
pub mod severity;
pub mod inspector;
pub mod report;
pub mod notify;
pub mod email;
pub mod slack;
pub mod checker;
pub mod scheduler;
pub mod logging;

// Re-export commonly used items
pub use types::*;
pub use error::{CheckError, DispatchOutcome};
pub use config::{load_config, load_config_with_env, load_endpoints, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use severity::{classify, is_expiring, BandCounts, SeverityBand, EXPIRING_THRESHOLD_DAYS};
pub use inspector::{days_remaining, normalize_target, CertificateInspector, Clock, SystemClock, TlsInspector};
pub use report::{CheckResult, ReportSummary};
pub use notify::{AlertNotifier, ReportNotifier};
pub use email::{build_email_body, EmailNotifier, MailTransport};
pub use slack::{build_slack_payload, send_to_slack, SlackNotifier};
pub use checker::{CertificateChecker, CycleReport};
