//! Layered processor configuration.
//!
//! Values are resolved from built-in defaults, an optional TOML file and
//! `SWOB_`-prefixed environment variables, in increasing precedence. The
//! command line applies its own overrides on top and validates the result.

use crate::error::{ProcessingError, Result};
use crate::models::{ChunkBy, QaCategory};
use crate::processors::FlattenOptions;
use crate::utils::constants::{MIN_DATA_FILENAME_LEN, OUTPUT_SEGMENT, RAW_SEGMENT, STATION_CACHE_FILE};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use validator::Validate;

pub const ENV_PREFIX: &str = "SWOB";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProcessorConfig {
    pub chunk_by: ChunkBy,

    /// Files per chunk; derived from the file count and workers when unset
    #[validate(range(min = 1))]
    pub chunk_size: Option<usize>,

    #[validate(range(min = 1))]
    pub max_workers: usize,

    pub parallel: bool,

    #[validate(length(min = 1))]
    pub categories: Vec<QaCategory>,

    pub output_subtests: bool,
    pub native_codes: bool,
    pub verify_counts: bool,
    pub fail_fast: bool,
    pub min_filename_len: usize,

    #[validate(length(min = 1))]
    pub raw_segment: String,

    #[validate(length(min = 1))]
    pub output_segment: String,

    #[validate(length(min = 1))]
    pub station_cache_file: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            chunk_by: ChunkBy::Chunksize,
            chunk_size: None,
            max_workers: num_cpus::get(),
            parallel: true,
            categories: QaCategory::ALL.to_vec(),
            output_subtests: true,
            native_codes: true,
            verify_counts: false,
            fail_fast: false,
            min_filename_len: MIN_DATA_FILENAME_LEN,
            raw_segment: RAW_SEGMENT.to_string(),
            output_segment: OUTPUT_SEGMENT.to_string(),
            station_cache_file: STATION_CACHE_FILE.to_string(),
        }
    }
}

impl ProcessorConfig {
    /// Defaults, then `config_file` if given, then the environment
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = config_file {
            debug!(path = %path.display(), "Reading configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("categories"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.ensure_valid()?;
        Ok(config)
    }

    /// Field constraints plus checks spanning several fields
    pub fn ensure_valid(&self) -> Result<()> {
        self.validate()?;

        if self.raw_segment == self.output_segment {
            return Err(ProcessingError::Config(format!(
                "raw_segment and output_segment are both '{}'; output would overwrite input",
                self.raw_segment
            )));
        }
        Ok(())
    }

    pub fn flatten_options(&self) -> FlattenOptions {
        FlattenOptions {
            categories: self.categories.clone(),
            output_subtests: self.output_subtests,
            native_codes: self.native_codes,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn with_chunk_by(mut self, chunk_by: ChunkBy) -> Self {
        self.chunk_by = chunk_by;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProcessorConfig::default();
        assert!(config.ensure_valid().is_ok());
        assert_eq!(config.flatten_options(), FlattenOptions::default());
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("swob.toml");
        fs::write(
            &path,
            r#"
chunk_by = "station"
chunk_size = 50
categories = ["presence", "range"]
output_subtests = false
"#,
        )?;

        let config = ProcessorConfig::load(Some(&path))?;
        assert_eq!(config.chunk_by, ChunkBy::Station);
        assert_eq!(config.chunk_size, Some(50));
        assert_eq!(config.categories, vec![QaCategory::Presence, QaCategory::Range]);
        assert!(!config.output_subtests);
        assert_eq!(config.min_filename_len, MIN_DATA_FILENAME_LEN);
        Ok(())
    }

    #[test]
    fn test_unknown_category_in_file_is_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("swob.toml");
        fs::write(&path, "categories = [\"presence\", \"spatial\"]\n")?;

        assert!(ProcessorConfig::load(Some(&path)).is_err());
        Ok(())
    }

    #[test]
    fn test_invalid_values() {
        let zero_chunk = ProcessorConfig::default().with_chunk_size(0);
        assert!(matches!(
            zero_chunk.ensure_valid(),
            Err(ProcessingError::Validation(_))
        ));

        let no_workers = ProcessorConfig::default().with_workers(0);
        assert!(no_workers.ensure_valid().is_err());

        let same_segments = ProcessorConfig {
            output_segment: RAW_SEGMENT.to_string(),
            ..ProcessorConfig::default()
        };
        assert!(matches!(
            same_segments.ensure_valid(),
            Err(ProcessingError::Config(_))
        ));
    }
}
