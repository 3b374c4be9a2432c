//! Pose side of the pipeline: detection, skeleton topology, embedding and
//! nearest-neighbour classification.

pub mod classifier;
pub mod detector;
pub mod embedder;
pub mod skeleton;
