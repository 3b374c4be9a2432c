use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::config::{BootstrapConfig, LevelPaths};
use crate::data::align::{align_images_and_csvs, AlignReport};
use crate::data::csv_store::{remove_rows, SampleWriter};
use crate::data::model::{DifficultyLevel, Landmark, Outlier, PoseSample};
use crate::data::scanner::{folder_statistics, image_names, pose_class_names};
use crate::pose::detector::LandmarkDetector;
use crate::pose::skeleton::{LANDMARK_COUNT, POSE_CONNECTIONS};
use crate::render::annotate::draw_landmarks;
use crate::render::plot::{plot_landmarks, PlotStyle};

/// Name of the per-level outlier report written by [`Bootstrapper::analyze_outliers`].
pub const OUTLIER_REPORT: &str = "outliers.json";

/// Outcome of one bootstrap pass over a level.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapStats {
    pub detected: usize,
    pub undetected: usize,
}

// ---------------------------------------------------------------------------
// Bootstrapper – per-level image → CSV conversion and cleanup
// ---------------------------------------------------------------------------

/// Drives one difficulty level: `<in>/<level>/<class>/*` images become
/// annotated images under `<out>/<level>/<class>/` plus rows in
/// `<csv>/<level>/<class>.csv`.
pub struct Bootstrapper<'a> {
    level: DifficultyLevel,
    paths: LevelPaths,
    config: &'a BootstrapConfig,
    detector: &'a dyn LandmarkDetector,
    classes: Vec<String>,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(
        level: DifficultyLevel,
        config: &'a BootstrapConfig,
        detector: &'a dyn LandmarkDetector,
    ) -> Result<Self> {
        let paths = config.level_paths(level);
        let classes = pose_class_names(&paths.input)?;
        Ok(Bootstrapper {
            level,
            paths,
            config,
            detector,
            classes,
        })
    }

    pub fn pose_class_names(&self) -> &[String] {
        &self.classes
    }

    pub fn paths(&self) -> &LevelPaths {
        &self.paths
    }

    pub fn print_images_in_statistics(&self) -> Result<Vec<(String, usize)>> {
        folder_statistics(&self.paths.input, &self.classes, &self.config.image_extensions)
    }

    pub fn print_images_out_statistics(&self) -> Result<Vec<(String, usize)>> {
        folder_statistics(&self.paths.output, &self.classes, &self.config.image_extensions)
    }

    /// Run the detector over every input image, at most
    /// `per_pose_class_limit` per class.
    ///
    /// Images are always copied to the output folder; only detected poses get
    /// a CSV row, so undetected images stay behind until the next alignment.
    pub fn bootstrap(&self, per_pose_class_limit: Option<usize>) -> Result<BootstrapStats> {
        fs::create_dir_all(&self.paths.csv)
            .with_context(|| format!("creating {}", self.paths.csv.display()))?;

        let mut stats = BootstrapStats::default();
        for class in &self.classes {
            info!("Bootstrapping {}/{class}", self.level);

            let out_folder = self.paths.output.join(class);
            fs::create_dir_all(&out_folder)
                .with_context(|| format!("creating {}", out_folder.display()))?;

            let mut writer = SampleWriter::create(&self.paths.csv.join(format!("{class}.csv")))?;
            let mut names =
                image_names(&self.paths.input.join(class), &self.config.image_extensions)?;
            if let Some(limit) = per_pose_class_limit {
                names.truncate(limit);
            }

            for name in &names {
                if self.bootstrap_image(class, name, &out_folder, &mut writer)? {
                    stats.detected += 1;
                } else {
                    stats.undetected += 1;
                }
            }
            writer.finish()?;
        }

        info!(
            "{}: {} poses detected, {} images without a pose",
            self.level, stats.detected, stats.undetected
        );
        Ok(stats)
    }

    fn bootstrap_image(
        &self,
        class: &str,
        name: &str,
        out_folder: &Path,
        writer: &mut SampleWriter,
    ) -> Result<bool> {
        let in_path = self.paths.input.join(class).join(name);
        let image =
            image::open(&in_path).with_context(|| format!("reading {}", in_path.display()))?;

        let landmarks = self.detect(&in_path, &image);

        let mut output = image.to_rgb8();
        if let Some(lms) = &landmarks {
            draw_landmarks(
                &mut output,
                lms,
                &POSE_CONNECTIONS,
                self.config.visibility_threshold,
                self.config.presence_threshold,
            )?;
        }
        let out_path = out_folder.join(name);
        output
            .save(&out_path)
            .with_context(|| format!("writing {}", out_path.display()))?;

        let Some(lms) = landmarks else {
            return Ok(false);
        };

        let sample = PoseSample::from_detection(name, class, &lms, output.width(), output.height());
        writer.write_sample(&sample)?;

        if self.config.plot_landmarks {
            let style = PlotStyle {
                visibility_threshold: self.config.visibility_threshold,
                presence_threshold: self.config.presence_threshold,
                ..PlotStyle::default()
            };
            plot_landmarks(
                &self.config.plot_root,
                self.level,
                class,
                name,
                &lms,
                &POSE_CONNECTIONS,
                &style,
            )?;
        }
        Ok(true)
    }

    /// Detector failures only cost the image its CSV row.
    fn detect(&self, path: &Path, image: &image::DynamicImage) -> Option<Vec<Landmark>> {
        match self.detector.detect(path, image) {
            Ok(Some(lms)) if lms.len() == LANDMARK_COUNT => Some(lms),
            Ok(Some(lms)) => {
                warn!(
                    "{}: expected {LANDMARK_COUNT} landmarks, detector returned {}",
                    path.display(),
                    lms.len()
                );
                None
            }
            Ok(None) => {
                debug!("{}: no pose detected", path.display());
                None
            }
            Err(e) => {
                warn!("{}: {e}", path.display());
                None
            }
        }
    }

    pub fn align_images_and_csvs(&self, print_removed_items: bool) -> Result<AlignReport> {
        align_images_and_csvs(&self.paths.output, &self.paths.csv, print_removed_items)
    }

    /// Log every outlier and write them to `<out>/<level>/outliers.json`.
    pub fn analyze_outliers(&self, outliers: &[Outlier]) -> Result<PathBuf> {
        for o in outliers {
            info!(
                "Outlier {}/{}: sample class {}, detected {:?}, votes {:?}",
                self.paths.output.join(&o.class_name).display(),
                o.sample_id,
                o.class_name,
                o.detected_class_names,
                o.votes
            );
        }

        fs::create_dir_all(&self.paths.output)?;
        let report = self.paths.output.join(OUTLIER_REPORT);
        let file = File::create(&report).with_context(|| format!("creating {}", report.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, outliers)?;
        writer.flush()?;
        Ok(report)
    }

    /// Delete each outlier's image and CSV row, then re-align the level.
    /// Returns the number of samples removed.
    pub fn remove_outliers(&self, outliers: &[Outlier]) -> Result<usize> {
        let mut by_class: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();
        for o in outliers {
            by_class
                .entry(o.class_name.as_str())
                .or_default()
                .insert(o.sample_id.as_str());
        }

        let mut removed = 0;
        for (class, ids) in &by_class {
            for id in ids {
                let image = self.paths.output.join(class).join(id);
                if image.exists() {
                    fs::remove_file(&image)
                        .with_context(|| format!("removing {}", image.display()))?;
                }
            }
            removed += remove_rows(&self.paths.csv.join(format!("{class}.csv")), ids)?;
        }

        info!("{}: removed {removed} outliers", self.level);
        self.align_images_and_csvs(true)?;
        Ok(removed)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::data::csv_store::sample_ids;
    use crate::error::BootstrapError;
    use image::{DynamicImage, RgbImage};
    use std::collections::HashMap;

    /// Detector returning canned landmarks by image file name; unknown names
    /// have no pose and names starting with `err` fail.
    pub(crate) struct CannedDetector {
        pub poses: HashMap<String, Vec<Landmark>>,
    }

    impl LandmarkDetector for CannedDetector {
        fn detect(
            &self,
            image_path: &Path,
            _image: &DynamicImage,
        ) -> crate::error::Result<Option<Vec<Landmark>>> {
            let name = image_path.file_name().unwrap().to_string_lossy().into_owned();
            if name.starts_with("err") {
                return Err(BootstrapError::Detector("boom".into()));
            }
            Ok(self.poses.get(&name).cloned())
        }
    }

    pub(crate) fn full_pose(shift: f32) -> Vec<Landmark> {
        (0..LANDMARK_COUNT)
            .map(|i| {
                let t = i as f32 / LANDMARK_COUNT as f32;
                Landmark::new(0.2 + 0.5 * t + shift, 0.1 + 0.8 * t, 0.0).with_scores(0.9, 0.9)
            })
            .collect()
    }

    pub(crate) fn config_in(root: &Path) -> BootstrapConfig {
        BootstrapConfig {
            input_root: root.join("in"),
            output_root: root.join("out"),
            csv_root: root.join("csv"),
            trained_root: root.join("trained"),
            plot_root: root.join("plot"),
            ..BootstrapConfig::default()
        }
    }

    pub(crate) fn write_image(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbImage::new(32, 48).save(path).unwrap();
    }

    fn files(folder: &Path) -> Vec<String> {
        let mut v: Vec<String> = fs::read_dir(folder)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        v.sort();
        v
    }

    #[test]
    fn test_undetected_image_kept_until_alignment() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let level_in = config.input_root.join("beginner/tree");
        for name in ["a.png", "b.png", "err.png"] {
            write_image(&level_in.join(name));
        }
        let detector = CannedDetector {
            poses: HashMap::from([("a.png".to_string(), full_pose(0.0))]),
        };

        let boot = Bootstrapper::new(DifficultyLevel::Beginner, &config, &detector).unwrap();
        assert_eq!(boot.pose_class_names(), ["tree".to_string()]);

        let stats = boot.bootstrap(None).unwrap();
        assert_eq!(stats, BootstrapStats { detected: 1, undetected: 2 });

        let out = config.output_root.join("beginner/tree");
        let csv = config.csv_root.join("beginner/tree.csv");
        assert_eq!(files(&out), vec!["a.png", "b.png", "err.png"]);
        assert_eq!(sample_ids(&csv).unwrap(), vec!["a.png"]);
        assert!(config.plot_root.join("beginner/tree/a.png").exists());
        assert!(!config.plot_root.join("beginner/tree/b.png").exists());

        let report = boot.align_images_and_csvs(true).unwrap();
        assert_eq!(report.removed_images.len(), 2);
        assert_eq!(files(&out), vec!["a.png"]);
        assert_eq!(sample_ids(&csv).unwrap(), vec!["a.png"]);

        let counts = boot.print_images_out_statistics().unwrap();
        assert_eq!(counts, vec![("tree".to_string(), 1)]);
    }

    #[test]
    fn test_per_class_limit_and_wrong_landmark_count() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.plot_landmarks = false;
        let level_in = config.input_root.join("advanced/crow");
        for name in ["1.png", "2.png", "3.png"] {
            write_image(&level_in.join(name));
        }
        let detector = CannedDetector {
            poses: HashMap::from([
                ("1.png".to_string(), full_pose(0.0)),
                ("2.png".to_string(), full_pose(0.0)[..10].to_vec()),
                ("3.png".to_string(), full_pose(0.0)),
            ]),
        };

        let boot = Bootstrapper::new(DifficultyLevel::Advanced, &config, &detector).unwrap();
        let stats = boot.bootstrap(Some(2)).unwrap();
        assert_eq!(stats, BootstrapStats { detected: 1, undetected: 1 });
        assert!(!config.plot_root.exists());
    }

    #[test]
    fn test_remove_outliers_touches_only_listed_samples() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.plot_landmarks = false;
        let level_in = config.input_root.join("beginner/tree");
        let mut poses = HashMap::new();
        for name in ["a.png", "b.png", "c.png"] {
            write_image(&level_in.join(name));
            poses.insert(name.to_string(), full_pose(0.0));
        }
        let detector = CannedDetector { poses };

        let boot = Bootstrapper::new(DifficultyLevel::Beginner, &config, &detector).unwrap();
        boot.bootstrap(None).unwrap();

        let outlier = Outlier {
            sample_id: "b.png".into(),
            class_name: "tree".into(),
            detected_class_names: vec!["cobra".into()],
            votes: BTreeMap::from([("cobra".to_string(), 2)]),
        };
        let report = boot.analyze_outliers(std::slice::from_ref(&outlier)).unwrap();
        assert!(fs::read_to_string(report).unwrap().contains("b.png"));

        assert_eq!(boot.remove_outliers(&[outlier]).unwrap(), 1);
        let out = config.output_root.join("beginner/tree");
        assert_eq!(files(&out), vec!["a.png", "c.png"]);
        assert_eq!(
            sample_ids(&config.csv_root.join("beginner/tree.csv")).unwrap(),
            vec!["a.png", "c.png"]
        );
    }
}
