use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BootstrapError;

// ---------------------------------------------------------------------------
// DifficultyLevel – partitions the data set into independent training sets
// ---------------------------------------------------------------------------

/// A named bucket of pose classes. The lowercase name is used for every
/// per-level folder and file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl DifficultyLevel {
    pub const ALL: [DifficultyLevel; 3] = [
        DifficultyLevel::Beginner,
        DifficultyLevel::Intermediate,
        DifficultyLevel::Advanced,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "beginner",
            DifficultyLevel::Intermediate => "intermediate",
            DifficultyLevel::Advanced => "advanced",
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyLevel {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(DifficultyLevel::Beginner),
            "intermediate" => Ok(DifficultyLevel::Intermediate),
            "advanced" => Ok(DifficultyLevel::Advanced),
            _ => Err(BootstrapError::UnknownLevel(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Landmark – one detected keypoint as reported by the detector
// ---------------------------------------------------------------------------

/// A body keypoint. `x` and `y` are normalised to the image size, `z` uses
/// roughly the same scale as `x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Landmark {
            x,
            y,
            z,
            visibility: None,
            presence: None,
        }
    }

    pub fn with_scores(mut self, visibility: f32, presence: f32) -> Self {
        self.visibility = Some(visibility);
        self.presence = Some(presence);
        self
    }

    /// A landmark is only rendered when both scores are reported and neither
    /// falls below its threshold.
    pub fn is_confident(&self, visibility_threshold: f32, presence_threshold: f32) -> bool {
        matches!(
            (self.visibility, self.presence),
            (Some(v), Some(p)) if v >= visibility_threshold && p >= presence_threshold
        )
    }
}

// ---------------------------------------------------------------------------
// PoseSample – one row of a per-class CSV
// ---------------------------------------------------------------------------

/// One bootstrapped sample: the image file name, the folder-derived class and
/// its landmarks in pixel space (`x*width, y*height, z*width`).
#[derive(Debug, Clone, PartialEq)]
pub struct PoseSample {
    pub id: String,
    pub class_name: String,
    pub landmarks: Vec<[f32; 3]>,
}

impl PoseSample {
    /// Build a sample from detector output scaled to the image dimensions.
    pub fn from_detection(
        id: impl Into<String>,
        class_name: impl Into<String>,
        landmarks: &[Landmark],
        width: u32,
        height: u32,
    ) -> Self {
        let (w, h) = (width as f32, height as f32);
        PoseSample {
            id: id.into(),
            class_name: class_name.into(),
            landmarks: landmarks
                .iter()
                .map(|lm| [lm.x * w, lm.y * h, lm.z * w])
                .collect(),
        }
    }

    /// Flattened `x1, y1, z1, x2, ...` coordinates as stored in the CSV.
    pub fn coordinates(&self) -> impl Iterator<Item = f32> + '_ {
        self.landmarks.iter().flat_map(|p| p.iter().copied())
    }
}

// ---------------------------------------------------------------------------
// Outlier – a sample whose vote disagrees with its folder label
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outlier {
    pub sample_id: String,
    pub class_name: String,
    /// Classes that received the maximum vote count.
    pub detected_class_names: Vec<String>,
    /// Full vote tally among the nearest neighbours.
    pub votes: BTreeMap<String, usize>,
}
