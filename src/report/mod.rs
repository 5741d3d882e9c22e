use crate::severity::{is_expiring, BandCounts};
use crate::types::CertificateRecord;

/// Records gathered during one cycle, in configuration order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub all: Vec<CertificateRecord>,
    pub expiring: Vec<CertificateRecord>,
}

impl CheckResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = CertificateRecord>,
    {
        let mut result = Self::new();
        for record in records {
            result.add(record);
        }
        result
    }

    pub fn add(&mut self, record: CertificateRecord) {
        if is_expiring(record.days_remaining) {
            self.expiring.push(record.clone());
        }
        self.all.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn has_expiring(&self) -> bool {
        !self.expiring.is_empty()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            total: self.all.len(),
            expiring: self.expiring.len(),
            bands: BandCounts::from_records(&self.all),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub total: usize,
    pub expiring: usize,
    pub bands: BandCounts,
}
