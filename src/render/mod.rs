//! Image output: skeleton overlays on bootstrapped images and 3D landmark
//! plots.

pub mod annotate;
pub mod plot;
