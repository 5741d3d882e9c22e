use crate::types::CertificateRecord;

/// Records at or below this many days go to the alert channel.
pub const EXPIRING_THRESHOLD_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SeverityBand {
    Critical,
    Warning,
    Caution,
    Ok,
}

impl SeverityBand {
    /// Bands in order of urgency.
    pub const ALL: [SeverityBand; 4] = [
        SeverityBand::Critical,
        SeverityBand::Warning,
        SeverityBand::Caution,
        SeverityBand::Ok,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityBand::Critical => "critical",
            SeverityBand::Warning => "warning",
            SeverityBand::Caution => "caution",
            SeverityBand::Ok => "ok",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SeverityBand::Critical => "Critical (7 days or less)",
            SeverityBand::Warning => "Warning (8-14 days)",
            SeverityBand::Caution => "Caution (15-30 days)",
            SeverityBand::Ok => "OK (more than 30 days)",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            SeverityBand::Critical => "🔴",
            SeverityBand::Warning | SeverityBand::Caution => "⚠️",
            SeverityBand::Ok => "✅",
        }
    }
}

pub fn classify(days_remaining: i64) -> SeverityBand {
    match days_remaining {
        d if d <= 7 => SeverityBand::Critical,
        d if d <= 14 => SeverityBand::Warning,
        d if d <= 30 => SeverityBand::Caution,
        _ => SeverityBand::Ok,
    }
}

pub fn is_expiring(days_remaining: i64) -> bool {
    days_remaining <= EXPIRING_THRESHOLD_DAYS
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BandCounts {
    pub critical: usize,
    pub warning: usize,
    pub caution: usize,
    pub ok: usize,
}

impl BandCounts {
    pub fn from_records(records: &[CertificateRecord]) -> Self {
        let mut counts = BandCounts::default();
        for r in records {
            match classify(r.days_remaining) {
                SeverityBand::Critical => counts.critical += 1,
                SeverityBand::Warning => counts.warning += 1,
                SeverityBand::Caution => counts.caution += 1,
                SeverityBand::Ok => counts.ok += 1,
            }
        }
        counts
    }

    pub fn get(&self, band: SeverityBand) -> usize {
        match band {
            SeverityBand::Critical => self.critical,
            SeverityBand::Warning => self.warning,
            SeverityBand::Caution => self.caution,
            SeverityBand::Ok => self.ok,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.warning + self.caution + self.ok
    }
}
