use crate::cache::StationMapCache;
use crate::error::{ProcessingError, Result};
use crate::models::{inverse, with_folder_prefix, Chunk, ChunkMapping, FileFailure, StationScan};
use crate::readers::StationReader;
use crate::utils::constants::DEFAULT_MAX_CHUNK_SIZE;
use crate::utils::file_name_of;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Files per chunk when none is given: an even split across workers, capped
pub fn default_chunk_size(file_count: usize, workers: usize) -> usize {
    file_count
        .div_ceil(workers.max(1))
        .clamp(1, DEFAULT_MAX_CHUNK_SIZE)
}

/// Split `files` into contiguous chunks of at most `chunk_size`, preserving order.
///
/// Chunks are labelled `<start>_to_<end>` with an exclusive end index.
pub fn chunk_by_size(files: &[PathBuf], chunk_size: Option<usize>, workers: usize) -> Result<ChunkMapping> {
    let size = match chunk_size {
        Some(0) => {
            return Err(ProcessingError::Config(
                "Chunk size must be at least 1".to_string(),
            ))
        }
        Some(size) => size,
        None => default_chunk_size(files.len(), workers),
    };

    let chunks: ChunkMapping = files
        .chunks(size)
        .enumerate()
        .map(|(i, slice)| {
            let start = i * size;
            let end = start + slice.len();
            Chunk::new(format!("{}_to_{}", start, end), slice.to_vec())
        })
        .collect();

    debug!(files = files.len(), chunk_size = size, chunks = chunks.len(), "Chunked by size");
    Ok(chunks)
}

/// File → station mapping for `files`.
///
/// Cached entries are reused and only files the cache does not know are
/// read. Newly mapped files are added to the cache; files whose station
/// cannot be derived stay out of it and are returned in `unmapped`.
pub fn load_or_build_station_map(
    folder: &Path,
    files: &[PathBuf],
    cache: &dyn StationMapCache,
    reader: &StationReader,
) -> Result<StationScan> {
    let names = files
        .iter()
        .map(|path| file_name_of(path))
        .collect::<Result<Vec<_>>>()?;

    let mut mapping = cache.get(folder)?.unwrap_or_default();
    let missing: Vec<String> = names
        .into_iter()
        .filter(|name| !mapping.contains_key(name))
        .collect();
    if missing.is_empty() {
        debug!(folder = %folder.display(), "Station mapping served from cache");
        return Ok(StationScan {
            mapping,
            unmapped: Vec::new(),
        });
    }

    info!(folder = %folder.display(), files = missing.len(), "Mapping files to stations");
    let scan = reader.build_file_to_station_map(folder, &missing)?;
    if !scan.mapping.is_empty() {
        mapping.extend(scan.mapping);
        cache.put(folder, &mapping)?;
    }

    Ok(StationScan {
        mapping,
        unmapped: scan.unmapped,
    })
}

/// One chunk per station, labelled by the station identifier.
///
/// Also returns the files no station could be derived for.
pub fn chunk_by_station(
    folder: &Path,
    files: &[PathBuf],
    cache: &dyn StationMapCache,
    reader: &StationReader,
) -> Result<(ChunkMapping, Vec<FileFailure>)> {
    let StationScan {
        mut mapping,
        unmapped,
    } = load_or_build_station_map(folder, files, cache, reader)?;

    // Restrict a cached mapping to the files listed in this run
    let listed = files
        .iter()
        .map(|path| file_name_of(path))
        .collect::<Result<BTreeSet<_>>>()?;
    mapping.retain(|name, _| listed.contains(name));

    let chunks: ChunkMapping = with_folder_prefix(&inverse(&mapping), folder)
        .into_iter()
        .map(|(station, paths)| Chunk::new(station, paths.into_iter().collect()))
        .collect();

    debug!(
        files = files.len(),
        stations = chunks.len(),
        unmapped = unmapped.len(),
        "Chunked by station"
    );
    Ok((chunks, unmapped))
}
