use image::RgbImage;
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::color::{generate_palette, LANDMARK_COLOR};
use crate::data::model::Landmark;
use crate::error::{BootstrapError, Result};

/// Fail when any connection names a landmark index outside `0..count`.
pub fn check_connections(connections: &[(usize, usize)], count: usize) -> Result<()> {
    match connections.iter().find(|&&(a, b)| a >= count || b >= count) {
        Some(&(from, to)) => Err(BootstrapError::ConnectionOutOfRange { from, to, count }),
        None => Ok(()),
    }
}

/// Draw the detected skeleton over `image`.
///
/// Landmark coordinates are normalised to the image size. Only confident
/// landmarks are drawn, and a connection only when both ends are.
pub fn draw_landmarks(
    image: &mut RgbImage,
    landmarks: &[Landmark],
    connections: &[(usize, usize)],
    visibility_threshold: f32,
    presence_threshold: f32,
) -> Result<()> {
    if landmarks.is_empty() {
        return Ok(());
    }
    check_connections(connections, landmarks.len())?;

    let (w, h) = (image.width() as f32, image.height() as f32);
    let points: Vec<Option<(f32, f32)>> = landmarks
        .iter()
        .map(|lm| {
            lm.is_confident(visibility_threshold, presence_threshold)
                .then(|| (lm.x * w, lm.y * h))
        })
        .collect();

    let thickness = ((w.min(h) / 200.0).round() as i32).max(1);
    let limb_colors = generate_palette(connections.len());
    for (&(a, b), color) in connections.iter().zip(limb_colors) {
        if let (Some(start), Some(end)) = (points[a], points[b]) {
            draw_line_segment_mut(image, start, end, color);
        }
    }
    for (x, y) in points.into_iter().flatten() {
        draw_filled_circle_mut(image, (x as i32, y as i32), thickness + 1, LANDMARK_COLOR);
    }
    Ok(())
}
