use crate::error::{ProcessingError, Result};
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Observation files in `folder`, sorted by name.
///
/// Only regular files whose name is longer than `min_name_len` are kept;
/// shorter names belong to control files and side artifacts.
pub fn list_input_files(folder: &Path, min_name_len: usize) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(ProcessingError::Config(format!(
            "Input path is not a directory: {}",
            folder.display()
        )));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(folder)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let long_enough = path
            .file_name()
            .and_then(OsStr::to_str)
            .is_some_and(|name| name.chars().count() > min_name_len);
        if long_enough {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// File name of a path as an owned string
pub fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(OsStr::to_str)
        .map(str::to_string)
        .ok_or_else(|| ProcessingError::Config(format!("Invalid file path: {}", path.display())))
}

/// Output folder mirroring `input` with the raw path component replaced
///
/// # Examples
/// ```
/// use std::path::Path;
/// use swob_qa_processor::utils::output_dir_for;
///
/// let out = output_dir_for(Path::new("/data/raw/swob/2019"), "raw", "interim").unwrap();
/// assert_eq!(out, Path::new("/data/interim/swob/2019"));
/// ```
pub fn output_dir_for(input: &Path, raw_segment: &str, output_segment: &str) -> Result<PathBuf> {
    let mut replaced = false;
    let output: PathBuf = input
        .components()
        .map(|component| match component {
            Component::Normal(name) if name == OsStr::new(raw_segment) => {
                replaced = true;
                Component::Normal(OsStr::new(output_segment))
            }
            other => other,
        })
        .collect();

    if !replaced {
        return Err(ProcessingError::Config(format!(
            "Input path {} has no '{}' component to derive the output location from",
            input.display(),
            raw_segment
        )));
    }

    Ok(output)
}

pub fn ensure_folder_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
