use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;

use super::embedder::PoseEmbedder;
use crate::data::csv_store::load_samples;
use crate::data::model::{Outlier, PoseSample};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Neighbour-search parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierSettings {
    /// Candidates kept after ranking by the weighted max per-axis distance.
    pub top_n_by_max_distance: usize,
    /// Voters kept after re-ranking the candidates by weighted mean distance.
    pub top_n_by_mean_distance: usize,
    /// Per-axis weights; `z` is least reliable so it counts less.
    pub axes_weights: [f32; 3],
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        ClassifierSettings {
            top_n_by_max_distance: 30,
            top_n_by_mean_distance: 10,
            axes_weights: [1.0, 1.0, 0.2],
        }
    }
}

// ---------------------------------------------------------------------------
// PoseClassifier
// ---------------------------------------------------------------------------

struct EmbeddedSample {
    sample: PoseSample,
    embedding: Vec<[f32; 3]>,
}

/// k-NN pose classifier over a database of bootstrapped samples.
pub struct PoseClassifier<E: PoseEmbedder> {
    embedder: E,
    settings: ClassifierSettings,
    samples: Vec<EmbeddedSample>,
}

impl<E: PoseEmbedder> PoseClassifier<E> {
    pub fn new(
        embedder: E,
        settings: ClassifierSettings,
        samples: Vec<PoseSample>,
    ) -> Result<Self> {
        let samples = samples
            .into_iter()
            .map(|sample| {
                let embedding = embedder.embed(&sample.landmarks)?;
                Ok(EmbeddedSample { sample, embedding })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(PoseClassifier {
            embedder,
            settings,
            samples,
        })
    }

    /// Load every class CSV in `folder` as the sample database.
    pub fn from_folder(
        folder: &Path,
        embedder: E,
        settings: ClassifierSettings,
    ) -> anyhow::Result<Self> {
        let samples = load_samples(folder)?;
        Self::new(embedder, settings, samples)
            .with_context(|| format!("embedding samples from {}", folder.display()))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Vote counts per class among the nearest samples to `landmarks`.
    ///
    /// The pose and its horizontal mirror are both compared and the smaller
    /// distance wins, so left/right-swapped variants match.
    pub fn classify(&self, landmarks: &[[f32; 3]]) -> Result<BTreeMap<String, usize>> {
        let embedding = self.embedder.embed(landmarks)?;
        let mirrored: Vec<[f32; 3]> = landmarks.iter().map(|p| [-p[0], p[1], p[2]]).collect();
        let flipped = self.embedder.embed(&mirrored)?;
        let w = self.settings.axes_weights;

        let mut by_max: Vec<(f32, usize)> = self
            .samples
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let d = max_distance(&s.embedding, &embedding, w)
                    .min(max_distance(&s.embedding, &flipped, w));
                (d, i)
            })
            .collect();
        by_max.sort_by(|a, b| a.0.total_cmp(&b.0));
        by_max.truncate(self.settings.top_n_by_max_distance);

        let mut by_mean: Vec<(f32, usize)> = by_max
            .into_iter()
            .map(|(_, i)| {
                let s = &self.samples[i];
                let d = mean_distance(&s.embedding, &embedding, w)
                    .min(mean_distance(&s.embedding, &flipped, w));
                (d, i)
            })
            .collect();
        by_mean.sort_by(|a, b| a.0.total_cmp(&b.0));
        by_mean.truncate(self.settings.top_n_by_mean_distance);

        let mut votes = BTreeMap::new();
        for (_, i) in by_mean {
            *votes
                .entry(self.samples[i].sample.class_name.clone())
                .or_insert(0) += 1;
        }
        Ok(votes)
    }

    /// Classify every sample against the whole database (itself included).
    /// A sample is an outlier unless its own class is the single class with
    /// the most votes.
    pub fn find_pose_sample_outliers(&self) -> Result<Vec<Outlier>> {
        let mut outliers = Vec::new();
        for s in &self.samples {
            let votes = self.classify(&s.sample.landmarks)?;
            let best = votes.values().copied().max().unwrap_or(0);
            let detected: Vec<String> = votes
                .iter()
                .filter(|(_, n)| **n == best)
                .map(|(c, _)| c.clone())
                .collect();

            if detected.len() != 1 || detected[0] != s.sample.class_name {
                outliers.push(Outlier {
                    sample_id: s.sample.id.clone(),
                    class_name: s.sample.class_name.clone(),
                    detected_class_names: detected,
                    votes,
                });
            }
        }
        Ok(outliers)
    }
}

fn weighted_abs_diffs<'a>(
    a: &'a [[f32; 3]],
    b: &'a [[f32; 3]],
    w: [f32; 3],
) -> impl Iterator<Item = f32> + 'a {
    a.iter()
        .zip(b)
        .flat_map(move |(p, q)| (0..3).map(move |k| (p[k] - q[k]).abs() * w[k]))
}

fn max_distance(a: &[[f32; 3]], b: &[[f32; 3]], w: [f32; 3]) -> f32 {
    weighted_abs_diffs(a, b, w).fold(0.0, f32::max)
}

fn mean_distance(a: &[[f32; 3]], b: &[[f32; 3]], w: [f32; 3]) -> f32 {
    let n = a.len().min(b.len()) * 3;
    if n == 0 {
        return 0.0;
    }
    weighted_abs_diffs(a, b, w).sum::<f32>() / n as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::embedder::tests::standing_pose;
    use crate::pose::embedder::FullBodyPoseEmbedder;

    fn sample(id: &str, class: &str, spread: f32) -> PoseSample {
        PoseSample {
            id: id.into(),
            class_name: class.into(),
            landmarks: standing_pose(spread),
        }
    }

    fn small_settings() -> ClassifierSettings {
        ClassifierSettings {
            top_n_by_max_distance: 4,
            top_n_by_mean_distance: 3,
            ..ClassifierSettings::default()
        }
    }

    fn database(extra: Option<PoseSample>) -> Vec<PoseSample> {
        let mut samples = Vec::new();
        for i in 0..5 {
            samples.push(sample(&format!("n{i}.jpg"), "mountain", i as f32));
            samples.push(sample(&format!("w{i}.jpg"), "star", 20.0 + i as f32));
        }
        samples.extend(extra);
        samples
    }

    #[test]
    fn test_classify_votes_for_nearest_class() {
        let clf = PoseClassifier::new(
            FullBodyPoseEmbedder::default(),
            small_settings(),
            database(None),
        )
        .unwrap();
        let votes = clf.classify(&standing_pose(21.5)).unwrap();
        assert_eq!(votes.get("star"), Some(&3));
        assert_eq!(votes.get("mountain"), None);
    }

    #[test]
    fn test_clean_database_has_no_outliers() {
        let clf = PoseClassifier::new(
            FullBodyPoseEmbedder::default(),
            small_settings(),
            database(None),
        )
        .unwrap();
        assert_eq!(clf.len(), 10);
        assert!(clf.find_pose_sample_outliers().unwrap().is_empty());
    }

    #[test]
    fn test_mislabeled_sample_is_outlier() {
        let clf = PoseClassifier::new(
            FullBodyPoseEmbedder::default(),
            small_settings(),
            database(Some(sample("bad.jpg", "star", 2.5))),
        )
        .unwrap();
        let outliers = clf.find_pose_sample_outliers().unwrap();
        assert_eq!(outliers.len(), 1);
        assert_eq!(outliers[0].sample_id, "bad.jpg");
        assert_eq!(outliers[0].class_name, "star");
        assert_eq!(outliers[0].detected_class_names, vec!["mountain".to_string()]);
    }

    #[test]
    fn test_tie_is_outlier() {
        // Two voters, one per class: no single winner.
        let settings = ClassifierSettings {
            top_n_by_max_distance: 2,
            top_n_by_mean_distance: 2,
            ..ClassifierSettings::default()
        };
        let samples = vec![sample("a.jpg", "mountain", 0.0), sample("b.jpg", "star", 0.5)];
        let clf = PoseClassifier::new(FullBodyPoseEmbedder::default(), settings, samples).unwrap();
        assert_eq!(clf.find_pose_sample_outliers().unwrap().len(), 2);
    }

    #[test]
    fn test_from_folder_loads_csvs() {
        use crate::data::csv_store::SampleWriter;

        let dir = tempfile::tempdir().unwrap();
        let mut w = SampleWriter::create(&dir.path().join("mountain.csv")).unwrap();
        w.write_sample(&sample("a.jpg", "mountain", 0.0)).unwrap();
        w.finish().unwrap();

        let clf = PoseClassifier::from_folder(
            dir.path(),
            FullBodyPoseEmbedder::default(),
            ClassifierSettings::default(),
        )
        .unwrap();
        assert_eq!(clf.len(), 1);
        assert!(!clf.is_empty());
    }
}
