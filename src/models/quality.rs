use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ProcessingError, Result};

/// One of the five independent QA validation dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum QaCategory {
    Presence,
    Range,
    Integrity,
    IntervariableComparison,
    Temporal,
}

impl QaCategory {
    pub const ALL: [QaCategory; 5] = [
        QaCategory::Presence,
        QaCategory::Range,
        QaCategory::Integrity,
        QaCategory::IntervariableComparison,
        QaCategory::Temporal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QaCategory::Presence => "presence",
            QaCategory::Range => "range",
            QaCategory::Integrity => "integrity",
            QaCategory::IntervariableComparison => "intervariable_comparison",
            QaCategory::Temporal => "temporal",
        }
    }

    /// Name of the assessment element holding this category's summary flag
    pub fn summary_element(&self) -> String {
        format!("{}_summary", self.as_str())
    }
}

impl FromStr for QaCategory {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        QaCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| ProcessingError::UnknownQaCategory(s.to_string()))
    }
}

impl fmt::Display for QaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coded outcome of an overall QA summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QaOutcome {
    Missing,
    Erroneous,
    Accepted,
    Suppressed,
    Doubtful,
}

impl QaOutcome {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "-1" => Some(QaOutcome::Missing),
            "0" => Some(QaOutcome::Erroneous),
            "100" => Some(QaOutcome::Accepted),
            "-10" => Some(QaOutcome::Suppressed),
            "10" => Some(QaOutcome::Doubtful),
            _ => None,
        }
    }

    /// Name of the identification element that declares this outcome's count
    pub fn count_field(&self) -> &'static str {
        match self {
            QaOutcome::Missing => "missing_count",
            QaOutcome::Erroneous => "erroneous_count",
            QaOutcome::Accepted => "accepted_count",
            QaOutcome::Suppressed => "suppressed_count",
            QaOutcome::Doubtful => "doubtful_count",
        }
    }
}

/// Category counts declared in a document's identification section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaCounts {
    pub missing: u64,
    pub erroneous: u64,
    pub accepted: u64,
    pub suppressed: u64,
    pub doubtful: u64,
    pub total_assessed: u64,
}

impl QaCounts {
    pub fn get(&self, outcome: QaOutcome) -> u64 {
        match outcome {
            QaOutcome::Missing => self.missing,
            QaOutcome::Erroneous => self.erroneous,
            QaOutcome::Accepted => self.accepted,
            QaOutcome::Suppressed => self.suppressed,
            QaOutcome::Doubtful => self.doubtful,
        }
    }
}

impl fmt::Display for QaCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} accepted={} doubtful={} erroneous={} suppressed={} missing={}",
            self.total_assessed,
            self.accepted,
            self.doubtful,
            self.erroneous,
            self.suppressed,
            self.missing
        )
    }
}

/// Counts of overall QA outcomes observed in a flattened record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QaTally {
    pub missing: u64,
    pub erroneous: u64,
    pub accepted: u64,
    pub suppressed: u64,
    pub doubtful: u64,
    /// Summary values that are not one of the known flag codes
    pub unrecognised: u64,
}

impl QaTally {
    pub fn record(&mut self, code: &str) {
        match QaOutcome::from_code(code) {
            Some(QaOutcome::Missing) => self.missing += 1,
            Some(QaOutcome::Erroneous) => self.erroneous += 1,
            Some(QaOutcome::Accepted) => self.accepted += 1,
            Some(QaOutcome::Suppressed) => self.suppressed += 1,
            Some(QaOutcome::Doubtful) => self.doubtful += 1,
            None => self.unrecognised += 1,
        }
    }

    pub fn get(&self, outcome: QaOutcome) -> u64 {
        match outcome {
            QaOutcome::Missing => self.missing,
            QaOutcome::Erroneous => self.erroneous,
            QaOutcome::Accepted => self.accepted,
            QaOutcome::Suppressed => self.suppressed,
            QaOutcome::Doubtful => self.doubtful,
        }
    }

    pub fn total(&self) -> u64 {
        self.missing
            + self.erroneous
            + self.accepted
            + self.suppressed
            + self.doubtful
            + self.unrecognised
    }
}

impl fmt::Display for QaTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} accepted={} doubtful={} erroneous={} suppressed={} missing={}",
            self.total(),
            self.accepted,
            self.doubtful,
            self.erroneous,
            self.suppressed,
            self.missing
        )?;
        if self.unrecognised > 0 {
            write!(f, " unrecognised={}", self.unrecognised)?;
        }
        Ok(())
    }
}

/// Output of the summary counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryStats {
    Unavailable,
    Available(QaCounts),
}

impl SummaryStats {
    pub fn is_available(&self) -> bool {
        matches!(self, SummaryStats::Available(_))
    }
}
