use crate::models::FileFailure;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// File name (relative to its input folder) to station identifier
pub type FileStationMap = BTreeMap<String, String>;

/// Station identifier to the set of file names observed at that station
pub type StationFileMap = BTreeMap<String, BTreeSet<String>>;

/// Result of mapping a set of files to their stations
#[derive(Debug, Clone, Default)]
pub struct StationScan {
    pub mapping: FileStationMap,
    /// Files whose station could not be derived, left out of `mapping`
    pub unmapped: Vec<FileFailure>,
}

/// Invert a key→value mapping into value→set-of-keys.
///
/// Every key lands in exactly one set, and the result's key set equals the
/// distinct values of the input.
pub fn inverse<K, V>(input: &BTreeMap<K, V>) -> BTreeMap<V, BTreeSet<K>>
where
    K: Ord + Clone,
    V: Ord + Clone,
{
    let mut inverted: BTreeMap<V, BTreeSet<K>> = BTreeMap::new();
    for (key, value) in input {
        inverted.entry(value.clone()).or_default().insert(key.clone());
    }
    inverted
}

/// Resolve the file names in a station mapping to full paths under `folder`
pub fn with_folder_prefix(
    mapping: &StationFileMap,
    folder: &Path,
) -> BTreeMap<String, BTreeSet<PathBuf>> {
    mapping
        .iter()
        .map(|(station, files)| {
            let paths = files.iter().map(|file| folder.join(file)).collect();
            (station.clone(), paths)
        })
        .collect()
}
