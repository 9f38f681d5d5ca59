use crate::error::{ProcessingError, Result};
use crate::models::{FileFailure, StationScan};
use crate::readers::document::{Document, XmlFile};
use crate::readers::metadata_reader::identification_value;
use crate::utils::source_uri::station_from_uri;
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, warn};

/// Derives the originating station of observation files from their source_uri
pub struct StationReader {
    max_workers: usize,
    parallel: bool,
}

impl StationReader {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
            parallel: true,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Station of a single file
    pub fn read_station(&self, path: &Path) -> Result<String> {
        let file = XmlFile::open(path)?;
        let doc = Document::parse(file.text()?)?;
        let uri = identification_value(&doc, "source_uri")?.ok_or_else(|| {
            ProcessingError::missing_required("source_uri", path.display().to_string())
        })?;
        station_from_uri(uri)
    }

    /// Map each file name in `files` (relative to `folder`) to its station.
    ///
    /// A file whose station cannot be read is logged and listed in
    /// `unmapped`; the others are still mapped. In parallel mode the list is
    /// split into one slice per worker and the partial scans are merged;
    /// file names are disjoint across slices.
    pub fn build_file_to_station_map(&self, folder: &Path, files: &[String]) -> Result<StationScan> {
        if !self.parallel || files.len() < 2 || self.max_workers == 1 {
            return Ok(self.map_files(folder, files));
        }

        let slice_len = files.len().div_ceil(self.max_workers);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let partials: Vec<StationScan> = pool.install(|| {
            files
                .par_chunks(slice_len)
                .map(|slice| self.map_files(folder, slice))
                .collect()
        });

        let mut merged = StationScan::default();
        for partial in partials {
            merged.mapping.extend(partial.mapping);
            merged.unmapped.extend(partial.unmapped);
        }
        Ok(merged)
    }

    fn map_files(&self, folder: &Path, files: &[String]) -> StationScan {
        let mut scan = StationScan::default();
        for file in files {
            let path = folder.join(file);
            match self.read_station(&path) {
                Ok(station) => {
                    debug!(file = %file, station = %station, "Mapped file to station");
                    scan.mapping.insert(file.clone(), station);
                }
                Err(e) => {
                    warn!(path = %path.display(), "Cannot map file to a station: {}", e);
                    scan.unmapped.push(FileFailure::new(path, &e));
                }
            }
        }
        scan
    }
}

impl Default for StationReader {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}
