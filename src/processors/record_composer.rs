use crate::error::{ProcessingError, Result};
use crate::models::{FlatRecord, RecordKey, SummaryStats};
use crate::processors::observation_flattener::{FlattenOptions, ObservationFlattener};
use crate::readers::document::{find_child, find_children, Document, ElementFilter, XmlFile};
use crate::readers::{read_summary_stats, DerivedReader, MetadataReader};
use crate::utils::constants::ORIGINAL_SCHEMA_VERSION;
use std::path::Path;
use tracing::debug;

/// Builds one flat record per source document
pub struct RecordComposer {
    metadata: MetadataReader,
    derived: DerivedReader,
    flattener: ObservationFlattener,
}

impl RecordComposer {
    pub fn new(options: FlattenOptions) -> Self {
        Self {
            metadata: MetadataReader::new(),
            derived: DerivedReader::new(),
            flattener: ObservationFlattener::new(options),
        }
    }

    pub fn options(&self) -> &FlattenOptions {
        self.flattener.options()
    }

    /// Extract the flat record of the file at `path`
    pub fn compose(&self, path: &Path) -> Result<FlatRecord> {
        let file = XmlFile::open(path)?;
        let doc = Document::parse(file.text()?)?;
        self.compose_document(&doc, path)
    }

    /// Like `compose`, also returning the document's declared QA counts
    pub fn compose_with_summary(&self, path: &Path) -> Result<(FlatRecord, SummaryStats)> {
        let file = XmlFile::open(path)?;
        let doc = Document::parse(file.text()?)?;
        let record = self.compose_document(&doc, path)?;
        let summary = read_summary_stats(&doc)?;
        Ok((record, summary))
    }

    pub fn compose_document(&self, doc: &Document<'_>, origin: &Path) -> Result<FlatRecord> {
        let mut record = FlatRecord::new();

        self.metadata.read_metadata(doc, &mut record)?;
        let version = record
            .metadata("version")
            .map(str::to_string)
            .ok_or(ProcessingError::MissingVersionField)?;

        if version == ORIGINAL_SCHEMA_VERSION {
            let derived = self.derived.read_derived(doc, &mut record)?;
            debug!(path = %origin.display(), derived, "Extracted derived values");
        }

        let observations = ElementFilter::new("element")
            .has_attr("element-index")
            .has_attr("name")
            .has_attr("orig-name");
        let status_indicators = ElementFilter::new("status-indicators");

        let mut flattened = 0usize;
        for observation in find_children(doc.elements()?, &observations, false) {
            // Revised-schema observations without status indicators were not transmitted
            if version != ORIGINAL_SCHEMA_VERSION
                && find_child(observation, &status_indicators, true).is_none()
            {
                debug!(
                    path = %origin.display(),
                    name = observation.attribute("name").unwrap_or_default(),
                    "Skipping observation without status indicators"
                );
                continue;
            }

            self.flattener.flatten(observation, &version, &mut record)?;
            flattened += 1;
        }

        record.insert(
            RecordKey::OriginFilename,
            Some(origin.display().to_string()),
        );
        debug!(path = %origin.display(), observations = flattened, keys = record.len(), "Composed record");

        Ok(record)
    }
}

impl Default for RecordComposer {
    fn default() -> Self {
        Self::new(FlattenOptions::default())
    }
}
