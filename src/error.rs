use thiserror::Error;

/// Per-cycle failures. None of these abort a cycle; each one skips a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("{channel} configuration missing: {}", .missing.join(", "))]
    ConfigurationMissing {
        channel: &'static str,
        missing: Vec<&'static str>,
    },

    #[error("inspection of {label} ({address}) failed: {cause}")]
    Inspection {
        label: String,
        address: String,
        cause: String,
    },

    #[error("no certificate presented by {label} ({address})")]
    NoCertificate { label: String, address: String },

    #[error("{channel} delivery failed: {cause}")]
    Dispatch { channel: &'static str, cause: String },
}

impl CheckError {
    pub fn inspection(label: &str, address: &str, cause: impl ToString) -> Self {
        CheckError::Inspection {
            label: label.to_string(),
            address: address.to_string(),
            cause: cause.to_string(),
        }
    }

    pub fn dispatch(channel: &'static str, cause: impl ToString) -> Self {
        CheckError::Dispatch {
            channel,
            cause: cause.to_string(),
        }
    }
}

/// What happened when a notifier was handed a batch of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    Skipped(CheckError),
    Failed(CheckError),
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered)
    }
}
