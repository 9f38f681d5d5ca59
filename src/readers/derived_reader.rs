use crate::error::{ProcessingError, Result};
use crate::models::{FieldPolicy, FlatRecord, RecordKey};
use crate::readers::document::{find_child, find_children, Document, ElementFilter};
use crate::readers::summary_reader::QA_SUMMARY_GROUP;
use roxmltree::Node;
use tracing::warn;

/// Elements that are neither tested nor marked derived (unit wrongly set to datetime)
pub const UNVERIFIED_UNIT_ELEMENTS: [&str; 2] = [
    "minimum_air_temperature_time",
    "maximum_air_temperature_time",
];

/// Extracts derived, non quality-assessed values from original-schema documents
pub struct DerivedReader;

impl DerivedReader {
    pub fn new() -> Self {
        Self
    }

    /// Add derived values to `record`, returning how many were added
    pub fn read_derived(&self, doc: &Document<'_>, record: &mut FlatRecord) -> Result<usize> {
        let elements = doc.elements()?;
        let unindexed = ElementFilter::new("element")
            .lacks_attr("element-index")
            .has_attr("name");
        let derived_marker = ElementFilter::new("qualifier").attr_eq("value", "derived");

        let mut added = 0;
        for element in find_children(elements, &unindexed, false) {
            let name = element.attribute("name").unwrap_or_default();
            let is_derived = find_child(element, &derived_marker, true).is_some();

            if is_derived || UNVERIFIED_UNIT_ELEMENTS.contains(&name) {
                let key = derived_key(element, name)?;
                record.insert(key, element.attribute("value").map(str::to_string));
                added += 1;
            } else if element.attribute("group") != Some(QA_SUMMARY_GROUP) {
                let diagnostic = ProcessingError::UnexpectedElement {
                    name: name.to_string(),
                    details: format!(
                        "group={:?} value={:?}",
                        element.attribute("group"),
                        element.attribute("value")
                    ),
                };
                warn!("{}", diagnostic);
            }
        }

        Ok(added)
    }
}

impl Default for DerivedReader {
    fn default() -> Self {
        Self::new()
    }
}

fn derived_key(element: Node<'_, '_>, name: &str) -> Result<RecordKey> {
    let context = format!("derived element '{}'", name);
    let group = FieldPolicy::for_field("group").resolve("group", &context, element.attribute("group"))?;
    let std_pkg_id =
        FieldPolicy::for_field("std-pkg-id").resolve("std-pkg-id", &context, element.attribute("std-pkg-id"))?;

    match (group, std_pkg_id) {
        (Some(group), Some(std_pkg_id)) => Ok(RecordKey::Derived {
            group: group.to_string(),
            name: name.to_string(),
            std_pkg_id: std_pkg_id.to_string(),
        }),
        _ => Err(ProcessingError::missing_required("group/std-pkg-id", context)),
    }
}
