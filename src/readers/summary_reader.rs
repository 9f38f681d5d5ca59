use crate::error::{ProcessingError, Result};
use crate::models::{QaCounts, QaOutcome, SummaryStats};
use crate::readers::document::{find_child, find_children, Document, ElementFilter};
use roxmltree::Node;

pub const QA_SUMMARY_GROUP: &str = "qa_summary";

/// Documents with complete summary statistics carry exactly this many qa_summary elements
pub const QA_SUMMARY_GROUP_SIZE: usize = 7;

pub const TOTAL_ASSESSED_FIELD: &str = "elements_quality_assessed_count";

/// Read the declared QA category counts, if the document provides them
pub fn read_summary_stats(doc: &Document<'_>) -> Result<SummaryStats> {
    let identification = doc.identification()?;
    let group = ElementFilter::new("element").attr_eq("group", QA_SUMMARY_GROUP);

    if find_children(identification, &group, true).len() != QA_SUMMARY_GROUP_SIZE {
        return Ok(SummaryStats::Unavailable);
    }

    let count = |outcome: QaOutcome| read_count(identification, outcome.count_field());
    Ok(SummaryStats::Available(QaCounts {
        missing: count(QaOutcome::Missing)?,
        erroneous: count(QaOutcome::Erroneous)?,
        accepted: count(QaOutcome::Accepted)?,
        suppressed: count(QaOutcome::Suppressed)?,
        doubtful: count(QaOutcome::Doubtful)?,
        total_assessed: read_count(identification, TOTAL_ASSESSED_FIELD)?,
    }))
}

fn read_count(identification: Node<'_, '_>, name: &str) -> Result<u64> {
    let filter = ElementFilter::new("element").attr_eq("name", name);
    let value = find_child(identification, &filter, true)
        .and_then(|element| element.attribute("value"))
        .ok_or_else(|| {
            ProcessingError::MalformedDocument(format!(
                "qa_summary group is complete but '{}' is missing",
                name
            ))
        })?;

    value.trim().parse::<u64>().map_err(|_| {
        ProcessingError::MalformedDocument(format!("invalid count for '{}': '{}'", name, value))
    })
}
