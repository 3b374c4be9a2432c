use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::{error, info};
use rayon::prelude::*;

use crate::bootstrap::{BootstrapStats, Bootstrapper};
use crate::config::BootstrapConfig;
use crate::data::dump::dump_joint_coordinates;
use crate::data::model::DifficultyLevel;
use crate::error::BootstrapError;
use crate::pose::classifier::PoseClassifier;
use crate::pose::detector::LandmarkDetector;
use crate::pose::embedder::FullBodyPoseEmbedder;

/// What one level's run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSummary {
    pub level: DifficultyLevel,
    pub bootstrap: BootstrapStats,
    /// Images dropped by the first alignment (no pose detected).
    pub undetected_removed: usize,
    pub outliers_removed: usize,
    pub rows_dumped: usize,
    pub dump_path: PathBuf,
}

// ---------------------------------------------------------------------------
// Trainer – sequences the per-level pipeline
// ---------------------------------------------------------------------------

pub struct Trainer<'a> {
    config: &'a BootstrapConfig,
    detector: &'a dyn LandmarkDetector,
}

impl<'a> Trainer<'a> {
    pub fn new(config: &'a BootstrapConfig, detector: &'a dyn LandmarkDetector) -> Self {
        Trainer { config, detector }
    }

    /// Reject configurations that would let two workers share a level, then
    /// check the input root.
    fn preflight(&self) -> Result<()> {
        self.config.validate()?;
        if !self.config.input_root.exists() {
            return Err(BootstrapError::MissingInputData(self.config.input_root.clone()).into());
        }
        Ok(())
    }

    /// Train every configured level in turn; the first failing level stops
    /// the run.
    pub fn train_normally(&self) -> Result<Vec<LevelSummary>> {
        self.preflight()?;
        self.config
            .levels
            .iter()
            .map(|&level| {
                self.train_level(level)
                    .with_context(|| format!("training {level}"))
            })
            .collect()
    }

    /// Train all configured levels concurrently on a pool of four workers per
    /// CPU (the work is I/O bound). Every level runs to completion or failure;
    /// the call fails if any level did.
    pub fn train_in_parallel(&self) -> Result<Vec<LevelSummary>> {
        self.preflight()?;
        let workers = num_cpus::get() * 4;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .context("building worker pool")?;
        info!("Training {} levels on {workers} workers", self.config.levels.len());

        let results: Vec<(DifficultyLevel, Result<LevelSummary>)> = pool.install(|| {
            self.config
                .levels
                .par_iter()
                .map(|&level| (level, self.train_level(level)))
                .collect()
        });

        let mut summaries = Vec::with_capacity(results.len());
        let mut failed = Vec::new();
        for (level, result) in results {
            match result {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    error!("{level}: {e:#}");
                    failed.push(level.to_string());
                }
            }
        }
        if !failed.is_empty() {
            bail!("training failed for: {}", failed.join(", "));
        }
        Ok(summaries)
    }

    /// Bootstrap, clean and dump one difficulty level.
    pub fn train_level(&self, level: DifficultyLevel) -> Result<LevelSummary> {
        for dir in [&self.config.csv_root, &self.config.output_root] {
            fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }

        let helper = Bootstrapper::new(level, self.config, self.detector)?;
        helper.print_images_in_statistics()?;

        let bootstrap = helper.bootstrap(self.config.per_pose_class_limit)?;
        helper.print_images_out_statistics()?;

        // Images without a detected pose were kept for inspection; drop them.
        info!("{level}: removing undetected poses");
        let undetected = helper.align_images_and_csvs(true)?;
        helper.print_images_out_statistics()?;

        let classifier = PoseClassifier::from_folder(
            &helper.paths().csv,
            FullBodyPoseEmbedder::new(self.config.torso_size_multiplier),
            self.config.classifier_settings(),
        )?;
        let outliers = classifier.find_pose_sample_outliers()?;
        if !outliers.is_empty() {
            info!("{level}: number of outliers: {}", outliers.len());
        }
        helper.analyze_outliers(&outliers)?;

        info!("{level}: removing outliers and re-aligning");
        let outliers_removed = helper.remove_outliers(&outliers)?;
        helper.print_images_out_statistics()?;

        let (dump_path, rows_dumped) =
            dump_joint_coordinates(&helper.paths().csv, &self.config.trained_root, level)?;

        let summary = LevelSummary {
            level,
            bootstrap,
            undetected_removed: undetected.removed_images.len(),
            outliers_removed,
            rows_dumped,
            dump_path,
        };
        info!(
            "{level}: {} detected, {} undetected removed, {} outliers removed, {} rows dumped",
            summary.bootstrap.detected,
            summary.undetected_removed,
            summary.outliers_removed,
            summary.rows_dumped
        );
        Ok(summary)
    }
}
