use crate::error::Result;
use crate::models::{FlatMap, FlatRecord};
use crate::utils::constants::BATCH_EXTENSION;
use crate::utils::ensure_folder_exists;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Unique file identifier → flat record, one per chunk
pub type Batch = BTreeMap<String, FlatRecord>;

/// A persisted batch read back in its flat string form
pub type StoredBatch = BTreeMap<String, FlatMap>;

/// Persists chunk aggregates as JSON objects with sorted keys
pub struct BatchWriter {
    pretty: bool,
}

impl BatchWriter {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn batch_path(output_dir: &Path, chunk_id: &str) -> PathBuf {
        output_dir.join(format!("{}.{}", chunk_id, BATCH_EXTENSION))
    }

    /// Write one chunk's records to `<output_dir>/<chunk_id>.json`.
    ///
    /// The batch is written to a temporary name and renamed into place, so
    /// an interrupted run never leaves a truncated artifact behind.
    pub fn write_batch(&self, output_dir: &Path, chunk_id: &str, batch: &Batch) -> Result<PathBuf> {
        ensure_folder_exists(output_dir)?;
        let path = Self::batch_path(output_dir, chunk_id);
        let staging = path.with_extension(format!("{}.tmp", BATCH_EXTENSION));

        {
            let mut writer = BufWriter::new(File::create(&staging)?);
            if self.pretty {
                serde_json::to_writer_pretty(&mut writer, batch)?;
            } else {
                serde_json::to_writer(&mut writer, batch)?;
            }
            writer.flush()?;
        }
        fs::rename(&staging, &path)?;

        debug!(path = %path.display(), records = batch.len(), "Wrote batch");
        Ok(path)
    }

    pub fn read_batch(&self, path: &Path) -> Result<StoredBatch> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Get file statistics
    pub fn get_file_info(&self, path: &Path) -> Result<BatchFileInfo> {
        let batch = self.read_batch(path)?;
        let file_size = fs::metadata(path)?.len();

        let key_counts: Vec<usize> = batch.values().map(BTreeMap::len).collect();
        let null_values = batch
            .values()
            .flat_map(|record| record.values())
            .filter(|value| value.is_none())
            .count();

        Ok(BatchFileInfo {
            record_count: batch.len(),
            total_keys: key_counts.iter().sum(),
            min_keys: key_counts.iter().copied().min().unwrap_or(0),
            max_keys: key_counts.iter().copied().max().unwrap_or(0),
            null_values,
            file_size,
            sample_ids: batch.keys().take(5).cloned().collect(),
        })
    }
}

impl Default for BatchWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct BatchFileInfo {
    pub record_count: usize,
    pub total_keys: usize,
    pub min_keys: usize,
    pub max_keys: usize,
    pub null_values: usize,
    pub file_size: u64,
    pub sample_ids: Vec<String>,
}

impl BatchFileInfo {
    pub fn summary(&self) -> String {
        let avg_keys = if self.record_count == 0 {
            0.0
        } else {
            self.total_keys as f64 / self.record_count as f64
        };

        let mut summary = format!(
            "Batch File Summary:\n\
            - Records: {}\n\
            - Keys per record: min {}, max {}, avg {:.1}\n\
            - Null values: {}\n\
            - File size: {:.2} MB",
            self.record_count,
            self.min_keys,
            self.max_keys,
            avg_keys,
            self.null_values,
            self.file_size as f64 / 1_048_576.0,
        );

        if !self.sample_ids.is_empty() {
            summary.push_str("\n- Sample ids:");
            for id in &self.sample_ids {
                summary.push_str(&format!("\n    {}", id));
            }
        }
        summary
    }
}
