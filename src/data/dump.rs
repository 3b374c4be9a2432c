use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use super::csv_store::{class_csv_files, read_rows};
use super::model::DifficultyLevel;

/// Merge every per-class CSV of one level into `<trained_folder>/<level>.csv`.
///
/// Files are read in file-name order; each row gets its class name (the file
/// stem) inserted as the second field:
///   `sample_id,class_name,x1,y1,z1,...`
///
/// Returns the output path and the number of rows written.
pub fn dump_joint_coordinates(
    csvs_folder: &Path,
    trained_folder: &Path,
    level: DifficultyLevel,
) -> Result<(PathBuf, usize)> {
    fs::create_dir_all(trained_folder)
        .with_context(|| format!("creating {}", trained_folder.display()))?;

    let out_path = trained_folder.join(format!("{level}.csv"));
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&out_path)
        .with_context(|| format!("creating {}", out_path.display()))?;

    let mut written = 0usize;
    for (class_name, path) in class_csv_files(csvs_folder)? {
        for row in read_rows(&path)? {
            let mut fields = row.iter();
            let mut out = csv::StringRecord::with_capacity(row.as_slice().len(), row.len() + 1);
            if let Some(id) = fields.next() {
                out.push_field(id);
            }
            out.push_field(&class_name);
            for field in fields {
                out.push_field(field);
            }
            writer.write_record(&out)?;
            written += 1;
        }
    }
    writer.flush()?;

    info!("Dumped {written} {level} samples to {}", out_path.display());
    Ok((out_path, written))
}
