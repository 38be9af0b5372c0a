use serde::{Deserialize, Serialize};

/// Summary counters attached to a task once it stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub websites_scanned: u64,
    pub tenders_found: u64,
    pub successful_scans: u64,
    pub failed_scans: u64,
    /// False when the task was stopped before its work finished.
    pub completed: bool,
}

impl ScanSummary {
    /// Fold the counters of a finished sub-step into the running totals.
    pub fn absorb(&mut self, report: &StepReport) {
        self.websites_scanned += report.websites_scanned;
        self.tenders_found += report.tenders_found;
        self.successful_scans += report.successful_scans;
        self.failed_scans += report.failed_scans;
    }

    /// Mark the summary as covering the whole scan.
    pub fn finished(mut self) -> Self {
        self.completed = true;
        self
    }
}

/// Counters produced by a single scan sub-step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub websites_scanned: u64,
    pub tenders_found: u64,
    pub successful_scans: u64,
    pub failed_scans: u64,
}

impl StepReport {
    /// One website visited successfully, yielding `tenders` new tender notices.
    pub fn scanned(tenders: u64) -> Self {
        Self {
            websites_scanned: 1,
            tenders_found: tenders,
            successful_scans: 1,
            failed_scans: 0,
        }
    }

    /// One website visited but the scan of it failed.
    pub fn failed_site() -> Self {
        Self {
            websites_scanned: 1,
            failed_scans: 1,
            ..Self::default()
        }
    }
}
