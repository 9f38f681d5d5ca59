use crate::error::{ProcessingError, Result};
use crate::models::{FieldPolicy, FlatRecord, ObservationField, QaCategory, RecordKey};
use crate::readers::document::{find_child, find_children, ElementFilter};
use crate::utils::constants::{DUMMY_BYPASS_SENSOR, ORIGINAL_SCHEMA_VERSION};
use roxmltree::Node;
use serde::{Deserialize, Serialize};

/// Which parts of each observation are extracted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenOptions {
    pub categories: Vec<QaCategory>,
    /// Emit one entry per subtest in addition to each category summary
    pub output_subtests: bool,
    /// Emit the provider's native error/suspect/suppressed codes
    pub native_codes: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            categories: QaCategory::ALL.to_vec(),
            output_subtests: true,
            native_codes: true,
        }
    }
}

impl FlattenOptions {
    /// Options for the named categories; unknown names are rejected
    pub fn with_category_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut categories = Vec::with_capacity(names.len());
        for name in names {
            let category: QaCategory = name.as_ref().parse()?;
            if !categories.contains(&category) {
                categories.push(category);
            }
        }

        Ok(Self {
            categories,
            ..Self::default()
        })
    }

    pub fn with_subtests(mut self, output_subtests: bool) -> Self {
        self.output_subtests = output_subtests;
        self
    }

    pub fn with_native_codes(mut self, native_codes: bool) -> Self {
        self.native_codes = native_codes;
        self
    }
}

/// Flattens one transmitted observation element into prefixed record entries
pub struct ObservationFlattener {
    options: FlattenOptions,
}

impl ObservationFlattener {
    pub fn new(options: FlattenOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FlattenOptions {
        &self.options
    }

    /// Collision-resistant prefix `<name>_<orig-name>`.
    ///
    /// The dummy bypass sensor reuses its origin identifier across
    /// instances, so its sensor index is appended as well.
    pub fn observation_prefix(observation: Node<'_, '_>) -> Result<String> {
        let name = observation
            .attribute("name")
            .ok_or_else(|| ProcessingError::missing_required("name", "observation element"))?;
        let orig_name = observation
            .attribute("orig-name")
            .ok_or_else(|| ProcessingError::missing_required("orig-name", format!("observation '{}'", name)))?;

        if name != DUMMY_BYPASS_SENSOR {
            return Ok(format!("{}_{}", name, orig_name));
        }

        let filter = ElementFilter::new("qualifier").attr_eq("name", "sensor_index");
        let context = format!("observation '{}_{}'", name, orig_name);
        let sensor_index = FieldPolicy::for_field("sensor_index")
            .resolve("sensor_index", &context, find_child(observation, &filter, true))?
            .and_then(|qualifier| qualifier.attribute("value"))
            .ok_or_else(|| ProcessingError::missing_required("sensor_index", context.clone()))?;

        Ok(format!("{}_{}_sensor_index_{}", name, orig_name, sensor_index))
    }

    /// Add every extracted field of `observation` to `record`, returning its prefix
    pub fn flatten(&self, observation: Node<'_, '_>, version: &str, record: &mut FlatRecord) -> Result<String> {
        let prefix = Self::observation_prefix(observation)?;
        let context = format!("observation '{}'", prefix);

        self.extract_values(observation, &prefix, record);
        self.extract_overall_summary(observation, &prefix, &context, record)?;

        for category in &self.options.categories {
            self.extract_category(observation, *category, &prefix, &context, record)?;
        }

        if self.options.native_codes {
            self.extract_native_codes(observation, &prefix, &context, record)?;
        }

        if version != ORIGINAL_SCHEMA_VERSION {
            self.extract_status_indicators(observation, &prefix, &context, record)?;
        }

        Ok(prefix)
    }

    fn extract_values(&self, observation: Node<'_, '_>, prefix: &str, record: &mut FlatRecord) {
        if let Some(orig_value) = observation.attribute("orig-value") {
            record.insert(
                RecordKey::observation(prefix, ObservationField::OrigValue),
                Some(orig_value.to_string()),
            );
        }
        if let Some(value) = observation.attribute("value") {
            record.insert(
                RecordKey::observation(prefix, ObservationField::Value),
                Some(value.to_string()),
            );
        }
    }

    fn extract_overall_summary(
        &self,
        observation: Node<'_, '_>,
        prefix: &str,
        context: &str,
        record: &mut FlatRecord,
    ) -> Result<()> {
        let filter = ElementFilter::new("element").attr_eq("name", "overall_qa_summary");
        if let Some(summary) = FieldPolicy::for_field("overall_qa_summary").resolve(
            "overall_qa_summary",
            context,
            find_child(observation, &filter, true),
        )? {
            record.insert(
                RecordKey::observation(prefix, ObservationField::OverallQaSummary),
                summary.attribute("value").map(str::to_string),
            );
        }
        Ok(())
    }

    fn extract_category(
        &self,
        observation: Node<'_, '_>,
        category: QaCategory,
        prefix: &str,
        context: &str,
        record: &mut FlatRecord,
    ) -> Result<()> {
        let filter = ElementFilter::new("element")
            .attr_eq("name", category.summary_element())
            .attr_eq("group", "assessment");
        let summary = FieldPolicy::for_field("category_summary").resolve(
            "category_summary",
            context,
            find_child(observation, &filter, true),
        )?;
        let Some(summary) = summary else {
            return Ok(());
        };

        record.insert(
            RecordKey::observation(prefix, ObservationField::CategorySummary(category)),
            summary.attribute("value").map(str::to_string),
        );

        if !self.options.output_subtests {
            return Ok(());
        }

        let flag_filter = ElementFilter::new("qualifier").attr_eq("name", "flag_value");
        for subtest in find_children(summary, &ElementFilter::new("element"), true) {
            // The test identifier is the last level of the test path
            let test_path = FieldPolicy::for_field("subtest_path")
                .resolve("subtest_path", context, subtest.attribute("value"))?
                .unwrap_or_default();
            let test_id = test_path.rsplit('/').next().unwrap_or_default().to_string();

            let flag = FieldPolicy::for_field("flag_value").resolve(
                "flag_value",
                context,
                find_child(subtest, &flag_filter, true),
            )?;
            if let Some(flag) = flag {
                record.insert(
                    RecordKey::observation(prefix, ObservationField::Subtest(category, test_id)),
                    flag.attribute("value").map(str::to_string),
                );
            }
        }

        Ok(())
    }

    fn extract_native_codes(
        &self,
        observation: Node<'_, '_>,
        prefix: &str,
        context: &str,
        record: &mut FlatRecord,
    ) -> Result<()> {
        let codes = [
            ("native-error", "error", "quality", ObservationField::NativeError),
            ("native-suspect", "suspect", "quality", ObservationField::NativeSuspect),
            ("native-suppressed", "suppressed", "value", ObservationField::NativeSuppressed),
        ];

        for (field, name, group, key_field) in codes {
            let filter = ElementFilter::new("qualifier")
                .attr_eq("name", name)
                .attr_eq("group", group);
            if let Some(qualifier) =
                FieldPolicy::for_field(field).resolve(field, context, find_child(observation, &filter, true))?
            {
                record.insert(
                    RecordKey::observation(prefix, key_field),
                    qualifier.attribute("value").map(str::to_string),
                );
            }
        }

        Ok(())
    }

    fn extract_status_indicators(
        &self,
        observation: Node<'_, '_>,
        prefix: &str,
        context: &str,
        record: &mut FlatRecord,
    ) -> Result<()> {
        let Some(status) = FieldPolicy::for_field("status-indicators").resolve(
            "status-indicators",
            context,
            find_child(observation, &ElementFilter::new("status-indicators"), true),
        )?
        else {
            return Ok(());
        };

        let named = |name: &str| {
            find_child(
                status,
                &ElementFilter::new("element").attr_eq("name", name),
                true,
            )
        };

        if let Some(flag_override) = named("qa_flag_override") {
            record.insert(
                RecordKey::observation(prefix, ObservationField::QaFlagOverride),
                flag_override.attribute("value").map(str::to_string),
            );
        } else if let Some(value_override) = named("value_override") {
            record.insert(
                RecordKey::observation(prefix, ObservationField::ValueOverride),
                value_override.attribute("value").map(str::to_string),
            );
        }

        if let Some(remark) = FieldPolicy::for_field("qc_remark").resolve("qc_remark", context, named("qc_remark"))? {
            record.insert(
                RecordKey::observation(prefix, ObservationField::QcRemark),
                remark.attribute("value").map(str::to_string),
            );
        }

        Ok(())
    }
}

impl Default for ObservationFlattener {
    fn default() -> Self {
        Self::new(FlattenOptions::default())
    }
}
