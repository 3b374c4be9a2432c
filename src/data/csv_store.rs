use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::StringRecord;

use super::model::PoseSample;
use crate::error::BootstrapError;
use crate::pose::skeleton::{LANDMARK_COUNT, LANDMARK_DIMENSIONS};

// ---------------------------------------------------------------------------
// Raw row access
// ---------------------------------------------------------------------------

/// Per-class CSV layout, no header row:
///   `sample_id,x1,y1,z1,x2,y2,z2,...`
/// `sample_id` is the image file name the row was bootstrapped from.
pub fn read_rows(path: &Path) -> Result<Vec<StringRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;

    reader
        .records()
        .enumerate()
        .map(|(row_no, rec)| rec.with_context(|| format!("{} row {row_no}", path.display())))
        .collect()
}

/// Overwrite `path` with `rows`.
pub fn write_rows(path: &Path, rows: &[StringRecord]) -> Result<()> {
    let mut writer = writer_for(path)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Sample ids (first field) of every row in `path`.
pub fn sample_ids(path: &Path) -> Result<Vec<String>> {
    Ok(read_rows(path)?
        .iter()
        .filter_map(|r| r.get(0).map(str::to_string))
        .collect())
}

/// Drop every row whose id is in `ids`. Returns how many rows were removed.
pub fn remove_rows(path: &Path, ids: &HashSet<&str>) -> Result<usize> {
    let rows = read_rows(path)?;
    let before = rows.len();
    let kept: Vec<StringRecord> = rows
        .into_iter()
        .filter(|r| !r.get(0).is_some_and(|id| ids.contains(id)))
        .collect();
    let removed = before - kept.len();
    if removed > 0 {
        write_rows(path, &kept)?;
    }
    Ok(removed)
}

fn writer_for(path: &Path) -> Result<csv::Writer<File>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))
}

// ---------------------------------------------------------------------------
// Sample writer used while bootstrapping a class
// ---------------------------------------------------------------------------

pub struct SampleWriter {
    writer: csv::Writer<File>,
}

impl SampleWriter {
    /// Truncate (or create) the class CSV at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        Ok(SampleWriter {
            writer: writer_for(path)?,
        })
    }

    pub fn write_sample(&mut self, sample: &PoseSample) -> Result<()> {
        let mut record = StringRecord::with_capacity(0, 1 + sample.landmarks.len() * 3);
        record.push_field(&sample.id);
        for v in sample.coordinates() {
            record.push_field(&v.to_string());
        }
        self.writer.write_record(&record)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sample loading for the classifier
// ---------------------------------------------------------------------------

/// `*.csv` files of a folder as `(class_name, path)`, sorted by file name.
pub fn class_csv_files(folder: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    if !folder.is_dir() {
        return Ok(files);
    }
    for entry in fs::read_dir(folder).with_context(|| format!("listing {}", folder.display()))? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((stem.to_string(), path.clone()));
        }
    }
    files.sort_by(|a, b| a.1.file_name().cmp(&b.1.file_name()));
    Ok(files)
}

/// Load every sample of every class CSV in `folder`. Each row must carry
/// exactly [`LANDMARK_COUNT`] 3D landmarks.
pub fn load_samples(folder: &Path) -> Result<Vec<PoseSample>> {
    let mut samples = Vec::new();
    for (class_name, path) in class_csv_files(folder)? {
        for (row_no, record) in read_rows(&path)?.iter().enumerate() {
            samples.push(parse_sample(&class_name, &path, row_no, record)?);
        }
    }
    Ok(samples)
}

fn parse_sample(
    class_name: &str,
    path: &Path,
    row: usize,
    record: &StringRecord,
) -> std::result::Result<PoseSample, BootstrapError> {
    let malformed = |reason: String| BootstrapError::MalformedRow {
        path: path.to_path_buf(),
        row,
        reason,
    };

    let expected = LANDMARK_COUNT * LANDMARK_DIMENSIONS;
    if record.len() != expected + 1 {
        return Err(malformed(format!(
            "expected {} fields, got {}",
            expected + 1,
            record.len()
        )));
    }

    let coords = record
        .iter()
        .skip(1)
        .enumerate()
        .map(|(j, tok)| {
            tok.trim()
                .parse::<f32>()
                .map_err(|_| malformed(format!("field {}: '{tok}' is not a number", j + 1)))
        })
        .collect::<std::result::Result<Vec<f32>, _>>()?;

    Ok(PoseSample {
        id: record[0].to_string(),
        class_name: class_name.to_string(),
        landmarks: coords.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
    })
}
