use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::model::DifficultyLevel;
use crate::error::{BootstrapError, Result};
use crate::pose::classifier::ClassifierSettings;

// ---------------------------------------------------------------------------
// Detector selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DetectorConfig {
    /// Landmarks pre-computed into `<image stem>.json` next to each image.
    #[default]
    Sidecar,
    /// External program invoked as `<program> <args...> <image path>`.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Bootstrap configuration
// ---------------------------------------------------------------------------

/// Every knob of a bootstrap run. Serialisable so a run can be described by a
/// JSON file; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    pub csv_root: PathBuf,
    pub trained_root: PathBuf,
    pub plot_root: PathBuf,
    pub levels: Vec<DifficultyLevel>,
    pub image_extensions: Vec<String>,
    /// Cap on images bootstrapped per class (debugging aid).
    pub per_pose_class_limit: Option<usize>,
    pub plot_landmarks: bool,
    pub visibility_threshold: f32,
    pub presence_threshold: f32,
    pub torso_size_multiplier: f32,
    pub top_n_by_max_distance: usize,
    pub top_n_by_mean_distance: usize,
    pub axes_weights: [f32; 3],
    pub detector: DetectorConfig,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        let classifier = ClassifierSettings::default();
        Self {
            input_root: "guru_asana_data_sets_in".into(),
            output_root: "guru_asana_data_sets_out".into(),
            csv_root: "guru_asana_pose_output_csv".into(),
            trained_root: "trained_poses_data_sets".into(),
            plot_root: "pose_landmark_3d_plot".into(),
            levels: DifficultyLevel::ALL.to_vec(),
            image_extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
            per_pose_class_limit: None,
            plot_landmarks: true,
            visibility_threshold: 0.5,
            presence_threshold: 0.5,
            torso_size_multiplier: 2.5,
            top_n_by_max_distance: classifier.top_n_by_max_distance,
            top_n_by_mean_distance: classifier.top_n_by_mean_distance,
            axes_weights: classifier.axes_weights,
            detector: DetectorConfig::default(),
        }
    }
}

/// Folders owned by one difficulty level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelPaths {
    pub input: PathBuf,
    pub output: PathBuf,
    pub csv: PathBuf,
    pub plot: PathBuf,
}

impl BootstrapConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: BootstrapConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.levels.is_empty() {
            return Err(BootstrapError::Config("no difficulty levels selected".into()));
        }
        // Each level owns its folders; two workers on one level would race.
        let mut seen = BTreeSet::new();
        if let Some(dup) = self.levels.iter().find(|&&level| !seen.insert(level)) {
            return Err(BootstrapError::Config(format!(
                "difficulty level '{dup}' listed twice"
            )));
        }
        if self.top_n_by_max_distance == 0 || self.top_n_by_mean_distance == 0 {
            return Err(BootstrapError::Config("top-N neighbour counts must be positive".into()));
        }
        if self.image_extensions.is_empty() {
            return Err(BootstrapError::Config("no image extensions configured".into()));
        }
        Ok(())
    }

    pub fn level_paths(&self, level: DifficultyLevel) -> LevelPaths {
        let name = level.as_str();
        LevelPaths {
            input: self.input_root.join(name),
            output: self.output_root.join(name),
            csv: self.csv_root.join(name),
            plot: self.plot_root.join(name),
        }
    }

    pub fn classifier_settings(&self) -> ClassifierSettings {
        ClassifierSettings {
            top_n_by_max_distance: self.top_n_by_max_distance,
            top_n_by_mean_distance: self.top_n_by_mean_distance,
            axes_weights: self.axes_weights,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_folder_layout() {
        let config = BootstrapConfig::default();
        assert_eq!(config.levels.len(), 3);
        assert_eq!(config.top_n_by_max_distance, 30);
        assert_eq!(config.top_n_by_mean_distance, 10);

        let paths = config.level_paths(DifficultyLevel::Beginner);
        assert_eq!(paths.input, PathBuf::from("guru_asana_data_sets_in/beginner"));
        assert_eq!(paths.csv, PathBuf::from("guru_asana_pose_output_csv/beginner"));
        assert_eq!(paths.plot, PathBuf::from("pose_landmark_3d_plot/beginner"));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BootstrapConfig = serde_json::from_str(
            r#"{
                "levels": ["advanced"],
                "detector": {"kind": "command", "program": "detect-pose"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.levels, vec![DifficultyLevel::Advanced]);
        assert_eq!(
            config.detector,
            DetectorConfig::Command {
                program: "detect-pose".into(),
                args: Vec::new()
            }
        );
        assert_eq!(config.csv_root, PathBuf::from("guru_asana_pose_output_csv"));
        assert!(config.plot_landmarks);
    }

    #[test]
    fn test_load_rejects_empty_levels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"levels": []}"#).unwrap();
        assert!(matches!(
            BootstrapConfig::load(&path),
            Err(BootstrapError::Config(_))
        ));
    }

    #[test]
    fn test_duplicate_levels_rejected() {
        let config = BootstrapConfig {
            levels: vec![
                DifficultyLevel::Beginner,
                DifficultyLevel::Advanced,
                DifficultyLevel::Beginner,
            ],
            ..BootstrapConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(&err, BootstrapError::Config(msg) if msg.contains("beginner")));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"levels": ["advanced", "advanced"]}"#).unwrap();
        assert!(matches!(
            BootstrapConfig::load(&path),
            Err(BootstrapError::Config(_))
        ));
    }

    #[test]
    fn test_round_trip() {
        let config = BootstrapConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: BootstrapConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
