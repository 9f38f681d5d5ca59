use tracing::{debug, warn};

use crate::error::{ProcessingError, Result};

/// What to do when a field is absent from a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnMissing {
    /// Omit the field silently
    Skip,
    /// Omit the field and log a warning
    Warn,
    /// Abort extraction of the document
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPolicy {
    pub required: bool,
    pub on_missing: OnMissing,
}

impl FieldPolicy {
    pub const SKIP: FieldPolicy = FieldPolicy {
        required: false,
        on_missing: OnMissing::Skip,
    };
    pub const WARN: FieldPolicy = FieldPolicy {
        required: false,
        on_missing: OnMissing::Warn,
    };
    pub const FAIL: FieldPolicy = FieldPolicy {
        required: true,
        on_missing: OnMissing::Fail,
    };

    /// Policy for a named field; fields not in the table are skipped silently
    pub fn for_field(field: &str) -> FieldPolicy {
        FIELD_POLICIES
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, policy)| *policy)
            .unwrap_or(FieldPolicy::SKIP)
    }

    /// Apply the policy to a lookup result.
    ///
    /// `Ok(Some(_))` passes the value through, `Ok(None)` means the field is
    /// omitted, and a `Fail` policy turns absence into `MissingRequiredField`.
    pub fn resolve<T>(&self, field: &str, context: &str, value: Option<T>) -> Result<Option<T>> {
        if value.is_some() {
            return Ok(value);
        }

        match self.on_missing {
            OnMissing::Skip => {
                debug!(field, context, "Field absent, skipping");
                Ok(None)
            }
            OnMissing::Warn => {
                let diagnostic = ProcessingError::MissingOptionalField {
                    field: field.to_string(),
                };
                warn!(context, "{}", diagnostic);
                Ok(None)
            }
            OnMissing::Fail => Err(ProcessingError::missing_required(field, context)),
        }
    }
}

/// Missing-field handling for every field any extractor looks up
pub const FIELD_POLICIES: &[(&str, FieldPolicy)] = &[
    // Identification section
    ("date_time", FieldPolicy::WARN),
    ("tc_identifier", FieldPolicy::WARN),
    ("station_name", FieldPolicy::WARN),
    ("station_elevation", FieldPolicy::WARN),
    ("latitude", FieldPolicy::WARN),
    ("longitude", FieldPolicy::WARN),
    ("version", FieldPolicy::WARN),
    ("correction", FieldPolicy::WARN),
    ("source_uri", FieldPolicy::WARN),
    ("station_identifier", FieldPolicy::SKIP),
    // Derived values
    ("group", FieldPolicy::FAIL),
    ("std-pkg-id", FieldPolicy::FAIL),
    // Observations
    ("sensor_index", FieldPolicy::FAIL),
    ("orig-value", FieldPolicy::SKIP),
    ("value", FieldPolicy::SKIP),
    ("overall_qa_summary", FieldPolicy::FAIL),
    ("category_summary", FieldPolicy::SKIP),
    ("subtest_path", FieldPolicy::FAIL),
    ("flag_value", FieldPolicy::FAIL),
    ("native-error", FieldPolicy::FAIL),
    ("native-suspect", FieldPolicy::FAIL),
    ("native-suppressed", FieldPolicy::FAIL),
    ("status-indicators", FieldPolicy::FAIL),
    ("qa_flag_override", FieldPolicy::SKIP),
    ("value_override", FieldPolicy::SKIP),
    ("qc_remark", FieldPolicy::FAIL),
];
