//! Caching of the file → station mapping of an input folder.
//!
//! Building the mapping parses every file in the folder, so it is computed
//! once and reloaded on later runs. The policy is behind `StationMapCache` so
//! the chunking layer does not care whether the mapping lives next to the
//! data, in memory, or elsewhere.

use crate::error::{ProcessingError, Result};
use crate::models::FileStationMap;
use crate::utils::constants::STATION_CACHE_FILE;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

pub trait StationMapCache: Send + Sync {
    /// Cached mapping for `folder`, if one exists
    fn get(&self, folder: &Path) -> Result<Option<FileStationMap>>;

    /// Store the mapping for `folder`
    fn put(&self, folder: &Path, mapping: &FileStationMap) -> Result<()>;
}

/// Persists the mapping as a JSON side artifact inside the input folder
pub struct FsStationCache {
    file_name: String,
}

impl FsStationCache {
    pub fn new() -> Self {
        Self {
            file_name: STATION_CACHE_FILE.to_string(),
        }
    }

    pub fn with_file_name(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    pub fn cache_path(&self, folder: &Path) -> PathBuf {
        folder.join(&self.file_name)
    }
}

impl Default for FsStationCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StationMapCache for FsStationCache {
    fn get(&self, folder: &Path) -> Result<Option<FileStationMap>> {
        let path = self.cache_path(folder);
        if !path.is_file() {
            return Ok(None);
        }

        let reader = BufReader::new(File::open(&path)?);
        match serde_json::from_reader::<_, FileStationMap>(reader) {
            Ok(mapping) => {
                info!(path = %path.display(), files = mapping.len(), "Loaded existing file to station mapping");
                Ok(Some(mapping))
            }
            Err(e) => {
                warn!(path = %path.display(), "Ignoring unreadable station mapping: {}", e);
                Ok(None)
            }
        }
    }

    /// Written to a staging file and renamed into place
    fn put(&self, folder: &Path, mapping: &FileStationMap) -> Result<()> {
        let path = self.cache_path(folder);
        let staging = folder.join(format!("{}.tmp", self.file_name));

        {
            let mut writer = BufWriter::new(File::create(&staging)?);
            serde_json::to_writer(&mut writer, mapping)?;
            writer.flush()?;
        }
        fs::rename(&staging, &path)?;

        info!(path = %path.display(), files = mapping.len(), "Saved file to station mapping");
        Ok(())
    }
}

/// Process-local cache, mostly for tests and one-shot runs
#[derive(Default)]
pub struct MemoryStationCache {
    entries: Mutex<HashMap<PathBuf, FileStationMap>>,
}

impl MemoryStationCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StationMapCache for MemoryStationCache {
    fn get(&self, folder: &Path) -> Result<Option<FileStationMap>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| ProcessingError::Config("station cache lock poisoned".to_string()))?;
        Ok(entries.get(folder).cloned())
    }

    fn put(&self, folder: &Path, mapping: &FileStationMap) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ProcessingError::Config("station cache lock poisoned".to_string()))?;
        entries.insert(folder.to_path_buf(), mapping.clone());
        Ok(())
    }
}
