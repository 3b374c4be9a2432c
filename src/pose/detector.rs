use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::DynamicImage;
use log::debug;

use crate::config::DetectorConfig;
use crate::data::model::Landmark;
use crate::error::{BootstrapError, Result};

// ---------------------------------------------------------------------------
// Detector seam
// ---------------------------------------------------------------------------

/// Anything that turns an image into pose landmarks.
///
/// `Ok(None)` means no pose was found. Implementations are shared across the
/// per-level workers, hence `Send + Sync`.
pub trait LandmarkDetector: Send + Sync {
    fn detect(&self, image_path: &Path, image: &DynamicImage) -> Result<Option<Vec<Landmark>>>;
}

/// Build the detector selected in the configuration.
pub fn from_config(config: &DetectorConfig) -> Box<dyn LandmarkDetector> {
    match config {
        DetectorConfig::Sidecar => Box::new(SidecarDetector),
        DetectorConfig::Command { program, args } => {
            Box::new(CommandDetector::new(program.clone(), args.clone()))
        }
    }
}

/// Detector JSON: `null`, `[]`, or `[{"x":..,"y":..,"z":..,"visibility":..,"presence":..}, ...]`.
pub fn parse_landmarks(bytes: &[u8]) -> Result<Option<Vec<Landmark>>> {
    let parsed: Option<Vec<Landmark>> = serde_json::from_slice(bytes)?;
    Ok(parsed.filter(|lms| !lms.is_empty()))
}

// ---------------------------------------------------------------------------
// External command
// ---------------------------------------------------------------------------

/// Runs `<program> <args...> <image path>` once per image and reads the
/// landmarks as JSON from stdout.
#[derive(Debug, Clone)]
pub struct CommandDetector {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandDetector {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        CommandDetector {
            program: program.into(),
            args,
        }
    }
}

impl LandmarkDetector for CommandDetector {
    fn detect(&self, image_path: &Path, _image: &DynamicImage) -> Result<Option<Vec<Landmark>>> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(image_path)
            .output()
            .map_err(|e| {
                BootstrapError::Detector(format!("spawning {}: {e}", self.program.display()))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BootstrapError::Detector(format!(
                "{} exited with {} on {}: {}",
                self.program.display(),
                output.status,
                image_path.display(),
                stderr.trim()
            )));
        }
        parse_landmarks(&output.stdout)
    }
}

// ---------------------------------------------------------------------------
// Pre-computed sidecar files
// ---------------------------------------------------------------------------

/// Reads landmarks from `<image stem>.json` beside the image. A missing
/// sidecar means the detector found no pose.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarDetector;

impl SidecarDetector {
    pub fn sidecar_path(image_path: &Path) -> PathBuf {
        image_path.with_extension("json")
    }
}

impl LandmarkDetector for SidecarDetector {
    fn detect(&self, image_path: &Path, _image: &DynamicImage) -> Result<Option<Vec<Landmark>>> {
        let sidecar = Self::sidecar_path(image_path);
        if !sidecar.exists() {
            debug!("no sidecar for {}", image_path.display());
            return Ok(None);
        }
        parse_landmarks(&fs::read(&sidecar)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> DynamicImage {
        DynamicImage::new_rgb8(4, 4)
    }

    #[test]
    fn test_parse_landmarks_empty_is_none() {
        assert_eq!(parse_landmarks(b"null").unwrap(), None);
        assert_eq!(parse_landmarks(b"[]").unwrap(), None);
        let lms = parse_landmarks(br#"[{"x":0.5,"y":0.5,"z":0.0,"visibility":0.9}]"#)
            .unwrap()
            .unwrap();
        assert_eq!(lms.len(), 1);
        assert_eq!(lms[0].visibility, Some(0.9));
        assert!(parse_landmarks(b"{oops").is_err());
    }

    #[test]
    fn test_sidecar_detector() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("pose_01.jpg");
        assert_eq!(SidecarDetector.detect(&img, &blank()).unwrap(), None);

        fs::write(
            dir.path().join("pose_01.json"),
            r#"[{"x":0.1,"y":0.2,"z":0.3}]"#,
        )
        .unwrap();
        let lms = SidecarDetector.detect(&img, &blank()).unwrap().unwrap();
        assert_eq!(lms[0], Landmark::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn test_command_detector_spawn_failure_is_detector_error() {
        let det = CommandDetector::new("/nonexistent/pose-detector", Vec::new());
        let err = det.detect(Path::new("a.jpg"), &blank()).unwrap_err();
        assert!(matches!(err, BootstrapError::Detector(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_detector_nonzero_exit_is_detector_error() {
        let det = CommandDetector::new(
            "sh",
            vec!["-c".into(), "echo 'no model' >&2; exit 3".into(), "detector".into()],
        );
        let err = det.detect(Path::new("a.jpg"), &blank()).unwrap_err();
        match err {
            BootstrapError::Detector(msg) => {
                assert!(msg.contains("a.jpg"));
                assert!(msg.contains("no model"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_command_detector_reads_stdout() {
        let det = CommandDetector::new(
            "sh",
            vec![
                "-c".into(),
                r#"echo '[{"x":0.25,"y":0.5,"z":0.0}]'"#.into(),
                "detector".into(),
            ],
        );
        let lms = det.detect(Path::new("a.jpg"), &blank()).unwrap().unwrap();
        assert_eq!(lms, vec![Landmark::new(0.25, 0.5, 0.0)]);
    }
}
