use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::models::QaCategory;
use tracing::warn;

/// Value stored against a flat key; `None` when the element exists but carries no value
pub type FieldValue = Option<String>;

/// Flattened form of one record, as persisted
pub type FlatMap = BTreeMap<String, FieldValue>;

/// Field of a single observation within a record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObservationField {
    OrigValue,
    Value,
    OverallQaSummary,
    CategorySummary(QaCategory),
    Subtest(QaCategory, String),
    NativeError,
    NativeSuspect,
    NativeSuppressed,
    QaFlagOverride,
    ValueOverride,
    QcRemark,
}

impl fmt::Display for ObservationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObservationField::OrigValue => f.write_str("orig-value"),
            ObservationField::Value => f.write_str("value"),
            ObservationField::OverallQaSummary => f.write_str("overall_qa_summary"),
            ObservationField::CategorySummary(category) => write!(f, "qa-{}_summary", category),
            ObservationField::Subtest(category, test_id) => write!(f, "qa-{}_{}", category, test_id),
            ObservationField::NativeError => f.write_str("native-error"),
            ObservationField::NativeSuspect => f.write_str("native-suspect"),
            ObservationField::NativeSuppressed => f.write_str("native-suppressed"),
            ObservationField::QaFlagOverride => f.write_str("qa_flag_override"),
            ObservationField::ValueOverride => f.write_str("value_override"),
            ObservationField::QcRemark => f.write_str("qc_remark"),
        }
    }
}

/// Structured key of a flat record entry.
///
/// Keys stay structured while a record is built and are only rendered to
/// their flat string form (`Display`) when the record is persisted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKey {
    /// Identification metadata, e.g. `station_name`
    Metadata(String),
    /// Non quality-assessed derived value: `<group>-<name>-<std-pkg-id>-derived`
    Derived {
        group: String,
        name: String,
        std_pkg_id: String,
    },
    /// Observation field: `<prefix>_<field>`
    Observation {
        prefix: String,
        field: ObservationField,
    },
    /// Source file path of the record
    OriginFilename,
}

impl RecordKey {
    pub fn metadata(field: impl Into<String>) -> Self {
        RecordKey::Metadata(field.into())
    }

    pub fn observation(prefix: impl Into<String>, field: ObservationField) -> Self {
        RecordKey::Observation {
            prefix: prefix.into(),
            field,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Metadata(field) => f.write_str(field),
            RecordKey::Derived {
                group,
                name,
                std_pkg_id,
            } => write!(f, "{}-{}-{}-derived", group, name, std_pkg_id),
            RecordKey::Observation { prefix, field } => write!(f, "{}_{}", prefix, field),
            RecordKey::OriginFilename => f.write_str("origin_filename"),
        }
    }
}

/// All values extracted from one source document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatRecord {
    entries: BTreeMap<RecordKey, FieldValue>,
}

impl FlatRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: RecordKey, value: FieldValue) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &RecordKey) -> Option<&FieldValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &RecordKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Value of an identification field, if present and non-empty
    pub fn metadata(&self, field: &str) -> Option<&str> {
        self.entries
            .get(&RecordKey::Metadata(field.to_string()))
            .and_then(|value| value.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecordKey, &FieldValue)> {
        self.entries.iter()
    }

    /// Distinct observation prefixes present in the record
    pub fn observation_prefixes(&self) -> BTreeSet<&str> {
        self.entries
            .keys()
            .filter_map(|key| match key {
                RecordKey::Observation { prefix, .. } => Some(prefix.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Overall QA summary values of every observation in the record
    pub fn overall_summaries(&self) -> impl Iterator<Item = Option<&str>> {
        self.entries.iter().filter_map(|(key, value)| match key {
            RecordKey::Observation {
                field: ObservationField::OverallQaSummary,
                ..
            } => Some(value.as_deref()),
            _ => None,
        })
    }

    /// Flat keys containing `substring`; with `sensor_value_only` only `_value` keys are kept
    pub fn keys_containing(&self, substring: &str, sensor_value_only: bool) -> Vec<String> {
        self.entries
            .keys()
            .map(|key| key.to_string())
            .filter(|key| key.contains(substring))
            .filter(|key| !sensor_value_only || key.contains("_value"))
            .collect()
    }

    /// Render the record to its persisted flat string form.
    ///
    /// Distinct keys may render to the same string (a subtest named
    /// `summary` and its category summary); the entry sorting last is kept.
    pub fn to_flat_map(&self) -> FlatMap {
        let mut flat = FlatMap::new();
        for (key, value) in &self.entries {
            let rendered = key.to_string();
            if flat.insert(rendered.clone(), value.clone()).is_some() {
                warn!(key = %rendered, "Flat key rendered twice, keeping the later entry");
            }
        }
        flat
    }
}

impl Serialize for FlatRecord {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_flat_map().serialize(serializer)
    }
}
