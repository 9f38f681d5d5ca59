use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ProcessingError;

/// How input files are grouped into batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum ChunkBy {
    /// Fixed number of files per chunk, labelled `<start>_to_<end>`
    #[default]
    Chunksize,
    /// All files of one station per chunk, labelled by station
    Station,
}

impl FromStr for ChunkBy {
    type Err = ProcessingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "chunksize" => Ok(ChunkBy::Chunksize),
            "station" => Ok(ChunkBy::Station),
            other => Err(ProcessingError::Config(format!(
                "Unknown chunking mode '{}', expected 'chunksize' or 'station'",
                other
            ))),
        }
    }
}

impl fmt::Display for ChunkBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkBy::Chunksize => f.write_str("chunksize"),
            ChunkBy::Station => f.write_str("station"),
        }
    }
}

/// A group of input files processed and persisted together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    pub files: Vec<PathBuf>,
}

impl Chunk {
    pub fn new(id: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self {
            id: id.into(),
            files,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Ordered chunk identifier → files assignment
pub type ChunkMapping = Vec<Chunk>;

/// A file that could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

impl FileFailure {
    pub fn new(path: impl Into<PathBuf>, error: &ProcessingError) -> Self {
        Self {
            path: path.into(),
            error: error.to_string(),
        }
    }
}

/// Eligible files of one run and how they were grouped.
///
/// `unassigned` holds files that fit no chunk (a station could not be
/// derived); they are reported but never processed.
#[derive(Debug, Clone, Default)]
pub struct ChunkPlan {
    pub files: Vec<PathBuf>,
    pub chunks: ChunkMapping,
    pub unassigned: Vec<FileFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_by_parse() {
        assert_eq!("station".parse::<ChunkBy>().unwrap(), ChunkBy::Station);
        assert_eq!("chunksize".parse::<ChunkBy>().unwrap(), ChunkBy::Chunksize);
        assert!("size".parse::<ChunkBy>().is_err());
        assert_eq!(ChunkBy::Station.to_string(), "station");
    }
}
