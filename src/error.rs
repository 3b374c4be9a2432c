use std::path::PathBuf;

use thiserror::Error;

/// Result alias for the typed pipeline operations.
pub type Result<T> = std::result::Result<T, BootstrapError>;

/// Failures the pipeline distinguishes. Orchestration code wraps these in
/// `anyhow` with path context; callers can still downcast to match on them.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("input data not found at {}: add data sets to this folder", .0.display())]
    MissingInputData(PathBuf),

    #[error("landmark connection ({from}, {to}) is out of range for {count} landmarks")]
    ConnectionOutOfRange { from: usize, to: usize, count: usize },

    #[error("{}: row {row}: {reason}", .path.display())]
    MalformedRow {
        path: PathBuf,
        row: usize,
        reason: String,
    },

    #[error("expected {expected} landmarks, got {actual}")]
    LandmarkCount { expected: usize, actual: usize },

    #[error("detector failed: {0}")]
    Detector(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("unknown difficulty level '{0}' (expected beginner, intermediate or advanced)")]
    UnknownLevel(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BootstrapError::ConnectionOutOfRange {
            from: 11,
            to: 40,
            count: 33,
        };
        assert_eq!(
            err.to_string(),
            "landmark connection (11, 40) is out of range for 33 landmarks"
        );

        let err = BootstrapError::MissingInputData(PathBuf::from("guru_asana_data_sets_in"));
        assert!(err.to_string().contains("guru_asana_data_sets_in"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BootstrapError = io.into();
        assert!(matches!(err, BootstrapError::Io(_)));
    }
}
