//! Writes a small synthetic input tree (`guru_asana_data_sets_in/`) with
//! sidecar landmark files, so the pipeline can run without a detector.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use image::{Rgb, RgbImage};

use asana_bootstrap::pose::skeleton::{LANDMARK_COUNT, POSE_CONNECTIONS};
use asana_bootstrap::render::annotate::draw_landmarks;
use asana_bootstrap::{DifficultyLevel, Landmark};

const IMAGE_SIZE: (u32, u32) = (320, 480);
const IMAGES_PER_CLASS: usize = 24;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f32(&mut self) -> f32 {
        ((self.next_u64() >> 40) as f32) / (1u64 << 24) as f32
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f32, std_dev: f32) -> f32 {
        let u1 = self.next_f32().max(1e-7);
        let u2 = self.next_f32();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Key joints `(index, x, y)` in normalised image coordinates per pose class.
fn key_joints(class: &str) -> Vec<(usize, f32, f32)> {
    // shoulders, hips and head are shared
    let mut joints = vec![
        (0, 0.50, 0.12),
        (11, 0.42, 0.25),
        (12, 0.58, 0.25),
        (23, 0.45, 0.52),
        (24, 0.55, 0.52),
    ];
    let limbs: [(usize, f32, f32); 8] = match class {
        // arms down, feet together
        "mountain" => [
            (13, 0.40, 0.38), (14, 0.60, 0.38), (15, 0.40, 0.50), (16, 0.60, 0.50),
            (25, 0.46, 0.70), (26, 0.54, 0.70), (27, 0.46, 0.88), (28, 0.54, 0.88),
        ],
        // arms and legs spread diagonally
        "star" => [
            (13, 0.30, 0.18), (14, 0.70, 0.18), (15, 0.18, 0.10), (16, 0.82, 0.10),
            (25, 0.36, 0.70), (26, 0.64, 0.70), (27, 0.26, 0.88), (28, 0.74, 0.88),
        ],
        // hands overhead, right knee out to the side
        "tree" => [
            (13, 0.40, 0.14), (14, 0.60, 0.14), (15, 0.48, 0.04), (16, 0.52, 0.04),
            (25, 0.46, 0.70), (26, 0.70, 0.62), (27, 0.46, 0.88), (28, 0.50, 0.68),
        ],
        // arms level, wide lunge
        _ => [
            (13, 0.28, 0.25), (14, 0.72, 0.25), (15, 0.14, 0.25), (16, 0.86, 0.25),
            (25, 0.30, 0.66), (26, 0.66, 0.68), (27, 0.22, 0.88), (28, 0.78, 0.88),
        ],
    };
    joints.extend(limbs);
    joints
}

/// Expand the key joints into all 33 landmarks (face around the nose, hands
/// at the wrists, feet at the ankles) with per-sample jitter.
fn sample_pose(class: &str, rng: &mut SimpleRng) -> Vec<Landmark> {
    let mut xy = [(0.5f32, 0.5f32); LANDMARK_COUNT];
    for (i, x, y) in key_joints(class) {
        xy[i] = (x, y);
    }
    let nose = xy[0];
    for i in 1..=10 {
        xy[i] = (nose.0 + (i as f32 - 5.5) * 0.006, nose.1 - 0.01);
    }
    for (hand, wrist) in [(17, 15), (19, 15), (21, 15), (18, 16), (20, 16), (22, 16)] {
        xy[hand] = xy[wrist];
    }
    for (foot, ankle) in [(29, 27), (31, 27), (30, 28), (32, 28)] {
        xy[foot] = (xy[ankle].0, xy[ankle].1 + 0.03);
    }

    xy.iter()
        .map(|&(x, y)| {
            Landmark::new(rng.gauss(x, 0.01), rng.gauss(y, 0.01), rng.gauss(0.0, 0.02))
                .with_scores(0.95, 0.95)
        })
        .collect()
}

fn classes_for(level: DifficultyLevel) -> &'static [&'static str] {
    match level {
        DifficultyLevel::Beginner => &["mountain", "star"],
        DifficultyLevel::Intermediate => &["tree", "warrior"],
        DifficultyLevel::Advanced => &["mountain", "star", "tree", "warrior"],
    }
}

fn write_sample(dir: &Path, name: &str, landmarks: Option<&[Landmark]>) -> Result<()> {
    let mut img = RgbImage::from_pixel(IMAGE_SIZE.0, IMAGE_SIZE.1, Rgb([40, 40, 48]));
    if let Some(lms) = landmarks {
        draw_landmarks(&mut img, lms, &POSE_CONNECTIONS, 0.5, 0.5)?;
        let json = serde_json::to_string(lms)?;
        fs::write(dir.join(format!("{name}.json")), json)?;
    }
    img.save(dir.join(format!("{name}.png")))?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let root = Path::new("guru_asana_data_sets_in");
    let mut written = 0usize;

    for level in DifficultyLevel::ALL {
        let classes = classes_for(level);
        for (ci, class) in classes.iter().enumerate() {
            let dir = root.join(level.as_str()).join(class);
            fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

            for i in 0..IMAGES_PER_CLASS {
                let name = format!("{class}_{i:03}");
                let pose = match i % 12 {
                    // no detectable pose
                    5 => None,
                    // filed under the wrong class
                    11 => Some(sample_pose(classes[(ci + 1) % classes.len()], &mut rng)),
                    _ => Some(sample_pose(class, &mut rng)),
                };
                write_sample(&dir, &name, pose.as_deref())?;
                written += 1;
            }
        }
    }

    println!("Wrote {written} images to {}", root.display());
    Ok(())
}
