//! Bootstraps pose-classification training sets.
//!
//! Labeled images under `<in>/<level>/<class>/` are run through a landmark
//! detector; detected poses become rows of `<csv>/<level>/<class>.csv`,
//! images without a pose and samples that a nearest-neighbour vote assigns to
//! another class are pruned, and each level is finally merged into
//! `<trained>/<level>.csv`.

pub mod bootstrap;
pub mod cli;
pub mod color;
pub mod config;
pub mod data;
pub mod driver;
pub mod error;
pub mod pose;
pub mod render;

pub use config::BootstrapConfig;
pub use data::model::{DifficultyLevel, Landmark, Outlier, PoseSample};
pub use driver::{LevelSummary, Trainer};
pub use error::{BootstrapError, Result};
