use crate::error::Result;
use crate::models::{FieldPolicy, FlatRecord, RecordKey};
use crate::readers::document::{find_child, Document, ElementFilter, IDENTIFICATION_SECTION};

/// Identification fields copied into every record
pub const IDENTIFICATION_FIELDS: [&str; 10] = [
    "date_time",
    "tc_identifier",
    "station_name",
    "station_elevation",
    "latitude",
    "longitude",
    "version",
    "correction",
    "source_uri",
    "station_identifier",
];

/// Value of a named element in the identification section.
///
/// `Ok(None)` when no such element exists or it carries no value.
pub fn identification_value<'a>(doc: &'a Document<'_>, name: &str) -> Result<Option<&'a str>> {
    let identification = doc.identification()?;
    let filter = ElementFilter::new("element").attr_eq("name", name);
    Ok(find_child(identification, &filter, true).and_then(|element| element.attribute("value")))
}

/// Extracts station, time, location and version fields
pub struct MetadataReader {
    fields: Vec<&'static str>,
}

impl MetadataReader {
    pub fn new() -> Self {
        Self {
            fields: IDENTIFICATION_FIELDS.to_vec(),
        }
    }

    /// Add identification fields to `record`; absent fields follow their policy
    pub fn read_metadata(&self, doc: &Document<'_>, record: &mut FlatRecord) -> Result<()> {
        let identification = doc.identification()?;

        for field in &self.fields {
            let filter = ElementFilter::new("element").attr_eq("name", *field);
            let element = find_child(identification, &filter, true);

            let policy = FieldPolicy::for_field(field);
            if let Some(element) = policy.resolve(field, IDENTIFICATION_SECTION, element)? {
                record.insert(
                    RecordKey::metadata(*field),
                    element.attribute("value").map(str::to_string),
                );
            }
        }

        Ok(())
    }
}

impl Default for MetadataReader {
    fn default() -> Self {
        Self::new()
    }
}
