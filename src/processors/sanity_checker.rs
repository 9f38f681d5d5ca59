use crate::error::{ProcessingError, Result};
use crate::models::{FlatRecord, QaCounts, QaOutcome, QaTally, SummaryStats};
use std::path::PathBuf;
use tracing::{debug, warn};

const OUTCOMES: [QaOutcome; 5] = [
    QaOutcome::Missing,
    QaOutcome::Erroneous,
    QaOutcome::Accepted,
    QaOutcome::Suppressed,
    QaOutcome::Doubtful,
];

/// Result of comparing one record against its declared counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanityOutcome {
    /// The document declares no summary statistics
    Skipped,
    Matched(QaTally),
}

/// Aggregate over many checked files
#[derive(Debug, Clone, Default)]
pub struct SanityReport {
    pub total_files: usize,
    pub matched: usize,
    pub skipped: usize,
    pub mismatches: Vec<(PathBuf, String)>,
    pub failures: Vec<(PathBuf, String)>,
}

impl SanityReport {
    pub fn record(&mut self, path: PathBuf, outcome: Result<SanityOutcome>) {
        self.total_files += 1;
        match outcome {
            Ok(SanityOutcome::Matched(_)) => self.matched += 1,
            Ok(SanityOutcome::Skipped) => self.skipped += 1,
            Err(e @ ProcessingError::QaCountMismatch { .. }) => self.mismatches.push((path, e.to_string())),
            Err(e) => self.failures.push((path, e.to_string())),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty() && self.failures.is_empty()
    }
}

/// Cross-checks extracted overall QA outcomes against declared summary counts
pub struct SanityChecker;

impl SanityChecker {
    pub fn new() -> Self {
        Self
    }

    /// Tally the overall QA summary values of every observation in `record`
    pub fn tally(&self, record: &FlatRecord) -> QaTally {
        let mut tally = QaTally::default();
        for code in record.overall_summaries().flatten() {
            tally.record(code);
        }
        tally
    }

    pub fn check(&self, record: &FlatRecord, summary: &SummaryStats) -> Result<SanityOutcome> {
        let expected = match summary {
            SummaryStats::Unavailable => {
                debug!(
                    station = record.metadata("station_name").unwrap_or_default(),
                    "No summary statistics, comparison not possible"
                );
                return Ok(SanityOutcome::Skipped);
            }
            SummaryStats::Available(counts) => counts,
        };

        let observed = self.tally(record);
        if !Self::counts_agree(&observed, expected) {
            let err = ProcessingError::QaCountMismatch {
                station: record.metadata("station_name").unwrap_or("unknown").to_string(),
                date_time: record.metadata("date_time").unwrap_or("unknown").to_string(),
                observed,
                expected: *expected,
            };
            warn!("{}", err);
            return Err(err);
        }

        Ok(SanityOutcome::Matched(observed))
    }

    fn counts_agree(observed: &QaTally, expected: &QaCounts) -> bool {
        observed.total() == expected.total_assessed
            && OUTCOMES
                .iter()
                .all(|outcome| observed.get(*outcome) == expected.get(*outcome))
    }

    /// Generate a summary report
    pub fn generate_summary(&self, report: &SanityReport) -> String {
        let mut summary = String::new();
        let percent = |n: usize| {
            if report.total_files == 0 {
                0.0
            } else {
                100.0 * n as f64 / report.total_files as f64
            }
        };

        summary.push_str("=== QA Count Check Report ===\n");
        summary.push_str(&format!("Files checked: {}\n", report.total_files));
        summary.push_str(&format!(
            "Matched: {} ({:.1}%)\n",
            report.matched,
            percent(report.matched)
        ));
        summary.push_str(&format!(
            "Skipped (no summary statistics): {} ({:.1}%)\n",
            report.skipped,
            percent(report.skipped)
        ));
        summary.push_str(&format!("Mismatched: {}\n", report.mismatches.len()));
        summary.push_str(&format!("Failed to extract: {}\n", report.failures.len()));

        for (title, entries) in [("Mismatches", &report.mismatches), ("Failures", &report.failures)] {
            if entries.is_empty() {
                continue;
            }
            summary.push_str(&format!("\n{} (first 10):\n", title));
            for (i, (path, details)) in entries.iter().take(10).enumerate() {
                summary.push_str(&format!("  {}. {}: {}\n", i + 1, path.display(), details));
            }
        }

        summary
    }
}

impl Default for SanityChecker {
    fn default() -> Self {
        Self::new()
    }
}
