use super::skeleton::LANDMARK_COUNT;
use crate::error::{BootstrapError, Result};

/// Turns a landmark set into a feature vector for nearest-neighbour search.
pub trait PoseEmbedder: Send + Sync {
    fn embed(&self, landmarks: &[[f32; 3]]) -> Result<Vec<[f32; 3]>>;
}

// Landmark indices used by the distance embedding.
const LEFT_SHOULDER: usize = 11;
const RIGHT_SHOULDER: usize = 12;
const LEFT_ELBOW: usize = 13;
const RIGHT_ELBOW: usize = 14;
const LEFT_WRIST: usize = 15;
const RIGHT_WRIST: usize = 16;
const LEFT_HIP: usize = 23;
const RIGHT_HIP: usize = 24;
const LEFT_KNEE: usize = 25;
const RIGHT_KNEE: usize = 26;
const LEFT_ANKLE: usize = 27;
const RIGHT_ANKLE: usize = 28;

/// Joint pairs whose difference vectors make up the embedding, after the
/// hip-centre → shoulder-centre vector.
const DISTANCE_PAIRS: [(usize, usize); 22] = [
    // one joint
    (LEFT_SHOULDER, LEFT_ELBOW),
    (RIGHT_SHOULDER, RIGHT_ELBOW),
    (LEFT_ELBOW, LEFT_WRIST),
    (RIGHT_ELBOW, RIGHT_WRIST),
    (LEFT_HIP, LEFT_KNEE),
    (RIGHT_HIP, RIGHT_KNEE),
    (LEFT_KNEE, LEFT_ANKLE),
    (RIGHT_KNEE, RIGHT_ANKLE),
    // two joints
    (LEFT_SHOULDER, LEFT_WRIST),
    (RIGHT_SHOULDER, RIGHT_WRIST),
    (LEFT_HIP, LEFT_ANKLE),
    (RIGHT_HIP, RIGHT_ANKLE),
    // four joints
    (LEFT_HIP, LEFT_WRIST),
    (RIGHT_HIP, RIGHT_WRIST),
    // five joints
    (LEFT_SHOULDER, LEFT_ANKLE),
    (RIGHT_SHOULDER, RIGHT_ANKLE),
    (LEFT_HIP, LEFT_WRIST),
    (RIGHT_HIP, RIGHT_WRIST),
    // cross body
    (LEFT_ELBOW, RIGHT_ELBOW),
    (LEFT_KNEE, RIGHT_KNEE),
    (LEFT_WRIST, RIGHT_WRIST),
    (LEFT_ANKLE, RIGHT_ANKLE),
];

/// Length of the embedding produced by [`FullBodyPoseEmbedder`].
pub const EMBEDDING_LEN: usize = DISTANCE_PAIRS.len() + 1;

/// Normalises a 33-landmark pose (hip centre at the origin, scaled by torso
/// size) and embeds it as 3D difference vectors between selected joints.
#[derive(Debug, Clone, Copy)]
pub struct FullBodyPoseEmbedder {
    torso_size_multiplier: f32,
}

impl Default for FullBodyPoseEmbedder {
    fn default() -> Self {
        FullBodyPoseEmbedder {
            torso_size_multiplier: 2.5,
        }
    }
}

impl FullBodyPoseEmbedder {
    pub fn new(torso_size_multiplier: f32) -> Self {
        FullBodyPoseEmbedder {
            torso_size_multiplier,
        }
    }

    fn normalize(&self, landmarks: &[[f32; 3]]) -> Vec<[f32; 3]> {
        let center = average(landmarks[LEFT_HIP], landmarks[RIGHT_HIP]);
        let mut out: Vec<[f32; 3]> = landmarks.iter().map(|p| sub(*p, center)).collect();

        let size = self.pose_size(&out);
        // Degenerate pose (all landmarks on the hip centre): leave unscaled.
        if size > f32::EPSILON {
            for p in &mut out {
                for v in p.iter_mut() {
                    *v = *v / size * 100.0;
                }
            }
        }
        out
    }

    /// Pose size in 2D: the larger of the scaled torso length and the
    /// farthest landmark from the hip centre.
    fn pose_size(&self, centered: &[[f32; 3]]) -> f32 {
        let hips = average(centered[LEFT_HIP], centered[RIGHT_HIP]);
        let shoulders = average(centered[LEFT_SHOULDER], centered[RIGHT_SHOULDER]);
        let torso_size = norm_2d(sub(shoulders, hips));

        let max_dist = centered
            .iter()
            .map(|p| norm_2d(sub(*p, hips)))
            .fold(0.0f32, f32::max);

        (torso_size * self.torso_size_multiplier).max(max_dist)
    }
}

impl PoseEmbedder for FullBodyPoseEmbedder {
    fn embed(&self, landmarks: &[[f32; 3]]) -> Result<Vec<[f32; 3]>> {
        if landmarks.len() != LANDMARK_COUNT {
            return Err(BootstrapError::LandmarkCount {
                expected: LANDMARK_COUNT,
                actual: landmarks.len(),
            });
        }
        let lm = self.normalize(landmarks);

        let mut embedding = Vec::with_capacity(EMBEDDING_LEN);
        embedding.push(sub(
            average(lm[LEFT_SHOULDER], lm[RIGHT_SHOULDER]),
            average(lm[LEFT_HIP], lm[RIGHT_HIP]),
        ));
        embedding.extend(DISTANCE_PAIRS.iter().map(|&(from, to)| sub(lm[to], lm[from])));
        Ok(embedding)
    }
}

fn average(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [(a[0] + b[0]) * 0.5, (a[1] + b[1]) * 0.5, (a[2] + b[2]) * 0.5]
}

fn sub(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn norm_2d(v: [f32; 3]) -> f32 {
    (v[0] * v[0] + v[1] * v[1]).sqrt()
}
