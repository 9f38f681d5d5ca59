use crate::cache::{FsStationCache, StationMapCache};
use crate::error::{ProcessingError, Result};
use crate::models::{Chunk, ChunkBy, ChunkPlan, FileFailure, FlatRecord};
use crate::processors::chunker::{chunk_by_size, chunk_by_station};
use crate::processors::observation_flattener::FlattenOptions;
use crate::processors::record_composer::RecordComposer;
use crate::processors::sanity_checker::{SanityChecker, SanityOutcome, SanityReport};
use crate::readers::StationReader;
use crate::utils::constants::{MIN_DATA_FILENAME_LEN, OUTPUT_SEGMENT, RAW_SEGMENT};
use crate::utils::progress::ProgressReporter;
use crate::utils::{ensure_folder_exists, list_input_files, output_dir_for, unique_file_id};
use crate::writers::{Batch, BatchWriter};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What one chunk produced
#[derive(Debug, Clone)]
pub struct ChunkReport {
    pub chunk_id: String,
    pub files: usize,
    pub records: usize,
    pub failures: Vec<FileFailure>,
    pub artifact: PathBuf,
}

/// Completion result of one chunk task
#[derive(Debug)]
pub struct ChunkResult {
    pub chunk_id: String,
    pub outcome: Result<ChunkReport>,
}

#[derive(Debug)]
pub struct RunReport {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub total_files: usize,
    /// Files left out of every chunk because no station could be derived
    pub unassigned: Vec<FileFailure>,
    pub chunks: Vec<ChunkResult>,
}

impl RunReport {
    pub fn completed_chunks(&self) -> impl Iterator<Item = &ChunkReport> {
        self.chunks.iter().filter_map(|c| c.outcome.as_ref().ok())
    }

    pub fn failed_chunks(&self) -> impl Iterator<Item = (&str, &ProcessingError)> {
        self.chunks
            .iter()
            .filter_map(|c| c.outcome.as_ref().err().map(|e| (c.chunk_id.as_str(), e)))
    }

    pub fn records_written(&self) -> usize {
        self.completed_chunks().map(|c| c.records).sum()
    }

    /// Unassigned files first, then files skipped inside completed chunks
    pub fn file_failures(&self) -> impl Iterator<Item = &FileFailure> {
        self.unassigned
            .iter()
            .chain(self.completed_chunks().flat_map(|c| c.failures.iter()))
    }

    pub fn is_clean(&self) -> bool {
        self.failed_chunks().next().is_none() && self.file_failures().next().is_none()
    }

    /// Generate a summary report
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        let failed: Vec<_> = self.failed_chunks().collect();
        let file_failures: Vec<_> = self.file_failures().collect();

        summary.push_str("=== Batch Processing Report ===\n");
        summary.push_str(&format!("Input: {}\n", self.input_dir.display()));
        summary.push_str(&format!("Output: {}\n", self.output_dir.display()));
        summary.push_str(&format!("Eligible files: {}\n", self.total_files));
        summary.push_str(&format!(
            "Chunks: {} ({} failed)\n",
            self.chunks.len(),
            failed.len()
        ));
        summary.push_str(&format!("Records written: {}\n", self.records_written()));
        summary.push_str(&format!("Files skipped: {}\n", file_failures.len()));

        if !failed.is_empty() {
            summary.push_str("\nFailed chunks:\n");
            for (chunk_id, err) in &failed {
                summary.push_str(&format!("  {}: {}\n", chunk_id, err));
            }
        }

        if !file_failures.is_empty() {
            summary.push_str("\nSkipped files (first 10):\n");
            for (i, failure) in file_failures.iter().take(10).enumerate() {
                summary.push_str(&format!(
                    "  {}. {}: {}\n",
                    i + 1,
                    failure.path.display(),
                    failure.error
                ));
            }
        }

        summary
    }
}

/// Batch pipeline: lists input files, chunks them and processes one task per chunk
pub struct ParallelProcessor {
    max_workers: usize,
    chunk_by: ChunkBy,
    chunk_size: Option<usize>,
    parallel: bool,
    fail_fast: bool,
    verify_counts: bool,
    min_filename_len: usize,
    raw_segment: String,
    output_segment: String,
    output_dir: Option<PathBuf>,
    composer: RecordComposer,
    checker: SanityChecker,
    writer: BatchWriter,
    cache: Arc<dyn StationMapCache>,
}

impl ParallelProcessor {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            chunk_by: ChunkBy::default(),
            chunk_size: None,
            parallel: true,
            fail_fast: false,
            verify_counts: false,
            min_filename_len: MIN_DATA_FILENAME_LEN,
            raw_segment: RAW_SEGMENT.to_string(),
            output_segment: OUTPUT_SEGMENT.to_string(),
            output_dir: None,
            composer: RecordComposer::default(),
            checker: SanityChecker::new(),
            writer: BatchWriter::new(),
            cache: Arc::new(FsStationCache::new()),
        }
    }

    pub fn with_chunk_by(mut self, chunk_by: ChunkBy) -> Self {
        self.chunk_by = chunk_by;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: Option<usize>) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Abort a chunk on its first failing file instead of skipping the file
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Run the QA count check on every record before it is kept
    pub fn with_verify_counts(mut self, verify_counts: bool) -> Self {
        self.verify_counts = verify_counts;
        self
    }

    pub fn with_min_filename_len(mut self, min_filename_len: usize) -> Self {
        self.min_filename_len = min_filename_len;
        self
    }

    pub fn with_path_segments(mut self, raw: impl Into<String>, output: impl Into<String>) -> Self {
        self.raw_segment = raw.into();
        self.output_segment = output.into();
        self
    }

    /// Write batches here instead of the mirrored output location
    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_flatten_options(mut self, options: FlattenOptions) -> Self {
        self.composer = RecordComposer::new(options);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn StationMapCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Output folder for an input folder
    pub fn output_dir_for(&self, folder: &Path) -> Result<PathBuf> {
        match &self.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => output_dir_for(folder, &self.raw_segment, &self.output_segment),
        }
    }

    /// List eligible files in `folder` and group them per the chunking mode
    pub fn plan(&self, folder: &Path) -> Result<ChunkPlan> {
        let files = list_input_files(folder, self.min_filename_len)?;
        let (chunks, unassigned) = match self.chunk_by {
            ChunkBy::Chunksize => (chunk_by_size(&files, self.chunk_size, self.max_workers)?, Vec::new()),
            ChunkBy::Station => {
                let reader = StationReader::new(self.max_workers).with_parallel(self.parallel);
                chunk_by_station(folder, &files, self.cache.as_ref(), &reader)?
            }
        };
        Ok(ChunkPlan {
            files,
            chunks,
            unassigned,
        })
    }

    /// Extract one file, returning its unique id and record
    pub fn process_file(&self, path: &Path) -> Result<(String, FlatRecord)> {
        let record = if self.verify_counts {
            let (record, summary) = self.composer.compose_with_summary(path)?;
            self.checker.check(&record, &summary)?;
            record
        } else {
            self.composer.compose(path)?
        };

        let uri = record
            .metadata("source_uri")
            .ok_or_else(|| ProcessingError::missing_required("source_uri", path.display().to_string()))?;
        let id = unique_file_id(uri)?;
        Ok((id, record))
    }

    /// Compose every file of `chunk` and persist the aggregate as one batch
    pub fn process_chunk(&self, chunk: &Chunk, output_dir: &Path) -> Result<ChunkReport> {
        let mut batch = Batch::new();
        let mut failures = Vec::new();

        for path in &chunk.files {
            match self.process_file(path) {
                Ok((id, record)) => {
                    if batch.insert(id.clone(), record).is_some() {
                        debug!(chunk = %chunk.id, id = %id, "Duplicate unique id, keeping the later file");
                    }
                }
                Err(e) if self.fail_fast => {
                    error!(chunk = %chunk.id, path = %path.display(), "Aborting chunk: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    warn!(chunk = %chunk.id, path = %path.display(), "Skipping file: {}", e);
                    failures.push(FileFailure::new(path.clone(), &e));
                }
            }
        }

        let artifact = self.writer.write_batch(output_dir, &chunk.id, &batch)?;

        Ok(ChunkReport {
            chunk_id: chunk.id.clone(),
            files: chunk.len(),
            records: batch.len(),
            failures,
            artifact,
        })
    }

    /// Process every eligible file in `folder`.
    ///
    /// Chunk failures are collected in the report; an `Err` means the run
    /// could not start (unreadable folder, no output location, station
    /// mapping failure).
    pub fn run(&self, folder: &Path, progress: Option<&ProgressReporter>) -> Result<RunReport> {
        let output_dir = self.output_dir_for(folder)?;
        ensure_folder_exists(&output_dir)?;

        if let Some(p) = progress {
            p.set_message("Planning chunks...");
        }
        let ChunkPlan {
            files,
            chunks,
            unassigned,
        } = self.plan(folder)?;
        info!(
            input = %folder.display(),
            output = %output_dir.display(),
            files = files.len(),
            chunks = chunks.len(),
            unassigned = unassigned.len(),
            mode = %self.chunk_by,
            "Starting batch run"
        );

        if let Some(p) = progress {
            p.set_message(&format!("Processing {} chunks...", chunks.len()));
        }

        let completed = AtomicUsize::new(0);
        let total_chunks = chunks.len();
        let run_chunk = |chunk: &Chunk| {
            let outcome = self.process_chunk(chunk, &output_dir);
            if let Err(e) = &outcome {
                error!(chunk = %chunk.id, "Chunk failed: {}", e);
            }

            let count = completed.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(chunk = %chunk.id, "Finished chunk {}/{}", count, total_chunks);
            if let Some(p) = progress {
                p.increment(1);
            }

            ChunkResult {
                chunk_id: chunk.id.clone(),
                outcome,
            }
        };

        let results: Vec<ChunkResult> = if self.parallel && self.max_workers > 1 && chunks.len() > 1 {
            self.thread_pool()?
                .install(|| chunks.par_iter().map(run_chunk).collect())
        } else {
            chunks.iter().map(run_chunk).collect()
        };

        let report = RunReport {
            input_dir: folder.to_path_buf(),
            output_dir,
            total_files: files.len(),
            unassigned,
            chunks: results,
        };

        if let Some(p) = progress {
            p.finish_with_message(&format!(
                "Processed {} chunks, {} records",
                report.chunks.len(),
                report.records_written()
            ));
        }

        Ok(report)
    }

    /// Extract every eligible file in `folder` and compare its QA outcomes
    /// with the declared summary counts. Nothing is written.
    pub fn check_counts(&self, folder: &Path, progress: Option<&ProgressReporter>) -> Result<SanityReport> {
        let files = list_input_files(folder, self.min_filename_len)?;
        info!(input = %folder.display(), files = files.len(), "Checking QA counts");

        let check_file = |path: &PathBuf| {
            let outcome = self
                .composer
                .compose_with_summary(path)
                .and_then(|(record, summary)| self.checker.check(&record, &summary));
            if let Some(p) = progress {
                p.increment(1);
            }
            (path.clone(), outcome)
        };

        let outcomes: Vec<(PathBuf, Result<SanityOutcome>)> = if self.parallel && self.max_workers > 1 {
            self.thread_pool()?
                .install(|| files.par_iter().map(check_file).collect())
        } else {
            files.iter().map(check_file).collect()
        };

        let mut report = SanityReport::default();
        for (path, outcome) in outcomes {
            report.record(path, outcome);
        }

        if let Some(p) = progress {
            p.finish_with_message(&format!("Checked {} files", report.total_files));
        }
        Ok(report)
    }

    fn thread_pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))
    }
}

impl Default for ParallelProcessor {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStationCache;
    use std::fs;
    use tempfile::TempDir;

    fn write_doc(dir: &Path, name: &str, station: &str, with_summary: bool) -> PathBuf {
        let uri = format!(
            "/data/raw/msc/observations/xml/partners/2019/20190101/nav-canada/{}/orig/{}",
            station, name
        );
        let summary = if with_summary {
            "<element name=\"overall_qa_summary\" value=\"100\"/>"
        } else {
            ""
        };
        let xml = format!(
            r#"<doc>
<identification-elements>
  <element name="station_name" value="{station}"/>
  <element name="version" value="0"/>
  <element name="source_uri" value="{uri}"/>
</identification-elements>
<elements>
  <element name="air_temp" element-index="1" orig-name="12" value="3.2">
    <qualifier name="error" group="quality" value="0"/>
    <qualifier name="suspect" group="quality" value="0"/>
    <qualifier name="suppressed" group="value" value="false"/>
    {summary}
  </element>
</elements>
</doc>"#
        );
        let path = dir.join(name);
        fs::write(&path, xml).unwrap();
        path
    }

    fn long_name(i: usize) -> String {
        format!("2019-01-01-{:04}-CYVR-AUTO-minute-swob.xml", i)
    }

    #[test]
    fn test_process_chunk_isolates_failures() -> Result<()> {
        let dir = TempDir::new()?;
        let good = write_doc(dir.path(), &long_name(0), "CYVR", true);
        let bad = write_doc(dir.path(), &long_name(1), "CYVR", false);
        let chunk = Chunk::new("0_to_2", vec![good, bad.clone()]);
        let out = dir.path().join("out");

        let report = ParallelProcessor::new(1).process_chunk(&chunk, &out)?;
        assert_eq!(report.records, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, bad);
        assert!(out.join("0_to_2.json").is_file());
        Ok(())
    }

    #[test]
    fn test_fail_fast_aborts_chunk() -> Result<()> {
        let dir = TempDir::new()?;
        let bad = write_doc(dir.path(), &long_name(0), "CYVR", false);
        let chunk = Chunk::new("0_to_1", vec![bad]);
        let out = dir.path().join("out");

        let err = ParallelProcessor::new(1)
            .with_fail_fast(true)
            .process_chunk(&chunk, &out)
            .unwrap_err();
        assert!(matches!(err, ProcessingError::MissingRequiredField { .. }));
        assert!(!out.join("0_to_1.json").exists());
        Ok(())
    }

    #[test]
    fn test_run_by_station() -> Result<()> {
        let dir = TempDir::new()?;
        let input = dir.path().join("raw").join("swob");
        fs::create_dir_all(&input)?;
        write_doc(&input, &long_name(0), "CYVR", true);
        write_doc(&input, &long_name(1), "CYYZ", true);
        write_doc(&input, &long_name(2), "CYVR", true);
        fs::write(input.join("notes.txt"), "control file")?;

        let report = ParallelProcessor::new(2)
            .with_chunk_by(ChunkBy::Station)
            .with_cache(Arc::new(MemoryStationCache::new()))
            .run(&input, None)?;

        assert_eq!(report.output_dir, dir.path().join("interim").join("swob"));
        assert_eq!(report.total_files, 3);
        assert_eq!(report.records_written(), 3);
        assert!(report.is_clean());

        let mut ids: Vec<&str> = report.completed_chunks().map(|c| c.chunk_id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["CYVR_nav-canada", "CYYZ_nav-canada"]);
        Ok(())
    }

    #[test]
    fn test_run_by_station_with_unmappable_file() -> Result<()> {
        let dir = TempDir::new()?;
        let input = dir.path().join("raw").join("swob");
        fs::create_dir_all(&input)?;
        write_doc(&input, &long_name(0), "CYVR", true);
        write_doc(&input, &long_name(1), "CYYZ", true);
        write_doc(&input, &long_name(2), "CYVR", true);
        let short_uri = input.join(long_name(3));
        fs::write(
            &short_uri,
            r#"<doc><identification-elements><element name="version" value="0"/><element name="source_uri" value="/short/uri.xml"/></identification-elements><elements/></doc>"#,
        )?;

        let report = ParallelProcessor::new(1)
            .with_chunk_by(ChunkBy::Station)
            .with_cache(Arc::new(MemoryStationCache::new()))
            .run(&input, None)?;

        assert_eq!(report.total_files, 4);
        assert_eq!(report.records_written(), 3);
        assert_eq!(report.failed_chunks().count(), 0);
        assert!(!report.is_clean());

        let failures: Vec<_> = report.file_failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path, short_uri);
        assert!(report.summary().contains("Files skipped: 1"));

        let output = dir.path().join("interim").join("swob");
        assert!(output.join("CYVR_nav-canada.json").is_file());
        assert!(output.join("CYYZ_nav-canada.json").is_file());
        Ok(())
    }

    #[test]
    fn test_run_without_raw_segment_needs_output_dir() -> Result<()> {
        let dir = TempDir::new()?;
        let processor = ParallelProcessor::new(1);
        assert!(matches!(
            processor.run(dir.path(), None),
            Err(ProcessingError::Config(_))
        ));

        let out = dir.path().join("out");
        let report = ParallelProcessor::new(1)
            .with_output_dir(Some(out.clone()))
            .run(dir.path(), None)?;
        assert_eq!(report.total_files, 0);
        assert!(report.chunks.is_empty());
        assert!(out.is_dir());
        Ok(())
    }
}
