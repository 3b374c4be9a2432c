use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use super::annotate::check_connections;
use crate::color::{generate_palette, AXIS_COLOR, BACKGROUND, LANDMARK_COLOR};
use crate::data::model::{DifficultyLevel, Landmark};
use crate::error::Result;

// ---------------------------------------------------------------------------
// 3D landmark plot (saved as PNG)
// ---------------------------------------------------------------------------

/// Camera and filter settings for [`plot_landmarks`].
#[derive(Debug, Clone, Copy)]
pub struct PlotStyle {
    /// Square canvas side in pixels.
    pub size: u32,
    pub elevation_deg: f32,
    pub azimuth_deg: f32,
    pub visibility_threshold: f32,
    pub presence_threshold: f32,
}

impl Default for PlotStyle {
    fn default() -> Self {
        PlotStyle {
            size: 640,
            elevation_deg: 10.0,
            azimuth_deg: 10.0,
            visibility_threshold: 0.5,
            presence_threshold: 0.5,
        }
    }
}

/// `<plot_root>/<level>/<class>/<image stem>.png`
pub fn plot_path(
    plot_root: &Path,
    level: DifficultyLevel,
    class_name: &str,
    image_name: &str,
) -> PathBuf {
    let stem = Path::new(image_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| image_name.to_string());
    plot_root
        .join(level.as_str())
        .join(class_name)
        .join(format!("{stem}.png"))
}

/// Render the landmarks as a 3D scatter with skeleton connections and save
/// the PNG. Returns `None` without writing anything when `landmarks` is
/// empty; fails when a connection is out of range.
///
/// Axes follow the usual pose-plot convention: the plot shows `(-z, x, -y)`
/// so the figure stands upright, seen from `elevation_deg` / `azimuth_deg`.
pub fn plot_landmarks(
    plot_root: &Path,
    level: DifficultyLevel,
    class_name: &str,
    image_name: &str,
    landmarks: &[Landmark],
    connections: &[(usize, usize)],
    style: &PlotStyle,
) -> Result<Option<PathBuf>> {
    if landmarks.is_empty() {
        return Ok(None);
    }
    check_connections(connections, landmarks.len())?;

    let projected: Vec<Option<(f32, f32)>> = landmarks
        .iter()
        .map(|lm| {
            lm.is_confident(style.visibility_threshold, style.presence_threshold)
                .then(|| project([-lm.z, lm.x, -lm.y], style))
        })
        .collect();

    let canvas = render(&projected, connections, style.size);

    let path = plot_path(plot_root, level, class_name, image_name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    canvas.save(&path)?;
    Ok(Some(path))
}

/// Orthographic view of a plot-space point: returns `(right, up)`.
fn project(p: [f32; 3], style: &PlotStyle) -> (f32, f32) {
    let (az, el) = (style.azimuth_deg.to_radians(), style.elevation_deg.to_radians());
    let right = -p[0] * az.sin() + p[1] * az.cos();
    let up = p[2] * el.cos() - (p[0] * az.cos() + p[1] * az.sin()) * el.sin();
    (right, up)
}

fn render(points: &[Option<(f32, f32)>], connections: &[(usize, usize)], size: u32) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(size, size, BACKGROUND);
    let margin = size as f32 * 0.08;
    draw_hollow_rect_mut(
        &mut canvas,
        Rect::at(margin as i32 / 2, margin as i32 / 2).of_size(
            size.saturating_sub(margin as u32).max(1),
            size.saturating_sub(margin as u32).max(1),
        ),
        AXIS_COLOR,
    );

    let visible: Vec<(f32, f32)> = points.iter().flatten().copied().collect();
    if visible.is_empty() {
        return canvas;
    }

    let (min_x, max_x, min_y, max_y) = visible.iter().fold(
        (f32::MAX, f32::MIN, f32::MAX, f32::MIN),
        |(a, b, c, d), &(x, y)| (a.min(x), b.max(x), c.min(y), d.max(y)),
    );
    let span = (max_x - min_x).max(max_y - min_y).max(f32::EPSILON);
    let scale = (size as f32 - 2.0 * margin) / span;
    let (cx, cy) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);
    let half = size as f32 / 2.0;
    let to_pixel = |(x, y): (f32, f32)| (half + (x - cx) * scale, half - (y - cy) * scale);

    let limb_colors = generate_palette(connections.len());
    for (&(a, b), color) in connections.iter().zip(limb_colors) {
        if let (Some(start), Some(end)) = (points[a], points[b]) {
            draw_line_segment_mut(&mut canvas, to_pixel(start), to_pixel(end), color);
        }
    }
    for p in visible {
        let (x, y) = to_pixel(p);
        draw_filled_circle_mut(&mut canvas, (x as i32, y as i32), 3, LANDMARK_COLOR);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BootstrapError;
    use crate::pose::skeleton::{LANDMARK_COUNT, POSE_CONNECTIONS};

    fn pose() -> Vec<Landmark> {
        (0..LANDMARK_COUNT)
            .map(|i| {
                let t = i as f32 / LANDMARK_COUNT as f32;
                Landmark::new(0.3 + 0.4 * t, 0.1 + 0.8 * t, 0.05 * t).with_scores(0.9, 0.9)
            })
            .collect()
    }

    #[test]
    fn test_empty_landmarks_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let out = plot_landmarks(
            dir.path(),
            DifficultyLevel::Beginner,
            "tree",
            "a.jpg",
            &[],
            &POSE_CONNECTIONS,
            &PlotStyle::default(),
        )
        .unwrap();
        assert!(out.is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_writes_png_under_level_and_class() {
        let dir = tempfile::tempdir().unwrap();
        let style = PlotStyle {
            size: 120,
            ..PlotStyle::default()
        };
        let out = plot_landmarks(
            dir.path(),
            DifficultyLevel::Intermediate,
            "crow",
            "crow_007.jpg",
            &pose(),
            &POSE_CONNECTIONS,
            &style,
        )
        .unwrap()
        .unwrap();

        assert_eq!(out, dir.path().join("intermediate/crow/crow_007.png"));
        let img = image::open(&out).unwrap().to_rgb8();
        assert_eq!(img.width(), 120);
    }

    #[test]
    fn test_out_of_range_connection_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = plot_landmarks(
            dir.path(),
            DifficultyLevel::Advanced,
            "crow",
            "a.jpg",
            &pose()[..5],
            &[(0, 1), (4, 5)],
            &PlotStyle::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BootstrapError::ConnectionOutOfRange { from: 4, to: 5, count: 5 }
        ));
    }

    #[test]
    fn test_projection_front_view_keeps_axes() {
        let style = PlotStyle {
            elevation_deg: 0.0,
            azimuth_deg: 0.0,
            ..PlotStyle::default()
        };
        // plot (X, Y, Z) seen from azimuth 0: right = Y, up = Z
        let (r, u) = project([5.0, 2.0, 3.0], &style);
        assert!((r - 2.0).abs() < 1e-6);
        assert!((u - 3.0).abs() < 1e-6);
    }
}
