use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use csv::StringRecord;
use log::info;

use super::csv_store::{class_csv_files, read_rows, write_rows};
use super::scanner::{pose_class_names, utf8_file_name};

// ---------------------------------------------------------------------------
// Alignment report
// ---------------------------------------------------------------------------

/// What one alignment pass removed, as `(class, sample_id)` pairs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AlignReport {
    pub removed_rows: Vec<(String, String)>,
    pub removed_images: Vec<(String, String)>,
}

impl AlignReport {
    pub fn is_empty(&self) -> bool {
        self.removed_rows.is_empty() && self.removed_images.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Aligner
// ---------------------------------------------------------------------------

/// Reconcile `<images_folder>/<class>/` with `<csvs_folder>/<class>.csv` so
/// that every CSV row names an existing image and every image has a row.
///
/// Classes are the union of image sub-folders and CSV files. Rows without an
/// image are dropped, images without a row are deleted. A second pass is a
/// no-op.
pub fn align_images_and_csvs(
    images_folder: &Path,
    csvs_folder: &Path,
    print_removed_items: bool,
) -> Result<AlignReport> {
    let mut classes: BTreeSet<String> = pose_class_names(images_folder)?.into_iter().collect();
    classes.extend(class_csv_files(csvs_folder)?.into_iter().map(|(c, _)| c));

    let mut report = AlignReport::default();
    for class in &classes {
        align_class(images_folder, csvs_folder, class, &mut report)?;
    }

    if print_removed_items {
        for (class, id) in &report.removed_rows {
            info!("Removed row {class}/{id} (no image)");
        }
        for (class, id) in &report.removed_images {
            info!("Removed image {class}/{id} (no CSV row)");
        }
    }
    Ok(report)
}

fn align_class(
    images_folder: &Path,
    csvs_folder: &Path,
    class: &str,
    report: &mut AlignReport,
) -> Result<()> {
    let class_images = images_folder.join(class);
    let csv_path = csvs_folder.join(format!("{class}.csv"));

    let image_names: HashSet<String> = if class_images.is_dir() {
        fs::read_dir(&class_images)
            .with_context(|| format!("listing {}", class_images.display()))?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| utf8_file_name(&e))
            .collect()
    } else {
        HashSet::new()
    };

    // Rows whose image is gone.
    let rows = read_rows(&csv_path)?;
    let total_rows = rows.len();
    let mut kept: Vec<StringRecord> = Vec::with_capacity(total_rows);
    for row in rows {
        let id = row.get(0).unwrap_or("").to_string();
        if image_names.contains(&id) {
            kept.push(row);
        } else {
            report.removed_rows.push((class.to_string(), id));
        }
    }
    if kept.len() != total_rows || !csv_path.exists() {
        fs::create_dir_all(csvs_folder)?;
        write_rows(&csv_path, &kept)?;
    }

    // Images without a row.
    let row_ids: HashSet<&str> = kept.iter().filter_map(|r| r.get(0)).collect();
    let mut orphans: Vec<&String> = image_names
        .iter()
        .filter(|name| !row_ids.contains(name.as_str()))
        .collect();
    orphans.sort();
    for name in orphans {
        let path = class_images.join(name);
        fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        report.removed_images.push((class.to_string(), name.clone()));
    }
    Ok(())
}
