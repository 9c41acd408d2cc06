use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, FramekitError};

/// List the regular files directly inside a directory, sorted by name
pub fn sorted_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(FramekitError::FileNotFound(dir.display().to_string()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Digit count of a sequential frame filename such as `f00000001.png`,
/// or `None` if the name is not `<prefix><digits>.<ext>`
pub fn counter_length(file_name: &str, prefix: &str, extension: &str) -> Option<usize> {
    let stem = file_name.strip_suffix(extension)?.strip_suffix('.')?;
    let digits = stem.strip_prefix(prefix)?;
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(digits.len())
    } else {
        None
    }
}

/// Zero-padding width of the frames in a directory, read from the first matching file
pub fn padding_width<P: AsRef<Path>>(dir: P, prefix: &str, extension: &str) -> Result<usize> {
    let dir = dir.as_ref();
    let no_sample = || FramekitError::NoSampleFile {
        dir: dir.display().to_string(),
        pattern: format!("{}<digits>.{}", prefix, extension),
    };

    if !dir.is_dir() {
        return Err(no_sample());
    }

    let width = sorted_files(dir)?
        .iter()
        .filter_map(|path| path.file_name().and_then(|name| name.to_str()))
        .find_map(|name| counter_length(name, prefix, extension))
        .ok_or_else(no_sample)?;

    debug!("Frames in {} use {} digit numbering", dir.display(), width);
    Ok(width)
}

/// Build the printf-style input pattern for a frame sequence, e.g. `dir/f%08d.png`
pub fn sequence_pattern<P: AsRef<Path>>(dir: P, prefix: &str, extension: &str) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let width = padding_width(dir, prefix, extension)?;
    Ok(pattern_with_width(dir, prefix, width, extension))
}

/// Build a frame sequence pattern for a known padding width
pub fn pattern_with_width<P: AsRef<Path>>(dir: P, prefix: &str, width: usize, extension: &str) -> PathBuf {
    dir.as_ref().join(format!("{}%0{}d.{}", prefix, width, extension))
}
