use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

// ---------------------------------------------------------------------------
// Folder enumeration
// ---------------------------------------------------------------------------

/// Sorted names of the non-hidden sub-directories of `level_folder`, one per
/// pose class. A missing folder yields no classes.
pub fn pose_class_names(level_folder: &Path) -> Result<Vec<String>> {
    if !level_folder.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(level_folder)
        .with_context(|| format!("listing {}", level_folder.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        match utf8_file_name(&entry) {
            Some(name) if !name.starts_with('.') => names.push(name),
            _ => {}
        }
    }
    names.sort();
    Ok(names)
}

/// Sorted file names in `class_folder` whose extension is one of
/// `extensions` (compared case-insensitively).
pub fn image_names(class_folder: &Path, extensions: &[String]) -> Result<Vec<String>> {
    if !class_folder.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(class_folder)
        .with_context(|| format!("listing {}", class_folder.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if !has_extension(&entry.path(), extensions) {
            continue;
        }
        if let Some(name) = utf8_file_name(&entry) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// File name of `entry` as UTF-8. Other names cannot be stored as CSV sample
/// ids, so they are skipped with a warning.
pub(crate) fn utf8_file_name(entry: &fs::DirEntry) -> Option<String> {
    match entry.file_name().into_string() {
        Ok(name) => Some(name),
        Err(_) => {
            warn!("skipping {}: file name is not valid UTF-8", entry.path().display());
            None
        }
    }
}

pub fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

/// Count images per class under `level_folder` and log the table.
pub fn folder_statistics(
    level_folder: &Path,
    classes: &[String],
    extensions: &[String],
) -> Result<Vec<(String, usize)>> {
    let mut counts = Vec::with_capacity(classes.len());
    for class in classes {
        let n = image_names(&level_folder.join(class), extensions)?.len();
        counts.push((class.clone(), n));
    }

    info!("Number of images per pose class in {}:", level_folder.display());
    for (class, n) in &counts {
        info!("  {class}: {n}");
    }
    Ok(counts)
}
