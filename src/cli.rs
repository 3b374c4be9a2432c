use std::path::PathBuf;

use clap::Parser;

use crate::config::BootstrapConfig;
use crate::data::model::DifficultyLevel;

/// Command-line arguments. Every flag overrides the matching field of the
/// configuration file (or of the defaults when no file is given).
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"Examples:
    asana-bootstrap
    asana-bootstrap --level beginner --limit 20
    asana-bootstrap --config bootstrap.json --parallel"#)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Difficulty level to train (repeatable) [default: all]
    #[arg(short, long = "level")]
    pub levels: Vec<DifficultyLevel>,

    /// Train levels concurrently
    #[arg(long, default_value_t = false)]
    pub parallel: bool,

    /// Bootstrap at most this many images per pose class
    #[arg(long)]
    pub limit: Option<usize>,

    /// Root folder of the labeled input images
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Skip rendering 3D landmark plots
    #[arg(long, default_value_t = false)]
    pub no_plots: bool,

    /// Show debug output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    pub fn apply(&self, config: &mut BootstrapConfig) {
        if !self.levels.is_empty() {
            // `-l beginner -l beginner` trains beginner once
            let mut levels = Vec::with_capacity(self.levels.len());
            for &level in &self.levels {
                if !levels.contains(&level) {
                    levels.push(level);
                }
            }
            config.levels = levels;
        }
        if self.limit.is_some() {
            config.per_pose_class_limit = self.limit;
        }
        if let Some(input) = &self.input {
            config.input_root = input.clone();
        }
        if self.no_plots {
            config.plot_landmarks = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "asana-bootstrap",
            "--level",
            "advanced",
            "-l",
            "beginner",
            "--limit",
            "5",
            "--no-plots",
        ]);
        let mut config = BootstrapConfig::default();
        cli.apply(&mut config);

        assert_eq!(
            config.levels,
            vec![DifficultyLevel::Advanced, DifficultyLevel::Beginner]
        );
        assert_eq!(config.per_pose_class_limit, Some(5));
        assert!(!config.plot_landmarks);
        assert!(!cli.parallel);
    }

    #[test]
    fn test_repeated_level_trained_once() {
        let cli = Cli::parse_from([
            "asana-bootstrap",
            "-l",
            "beginner",
            "-l",
            "advanced",
            "-l",
            "beginner",
        ]);
        let mut config = BootstrapConfig::default();
        cli.apply(&mut config);

        assert_eq!(
            config.levels,
            vec![DifficultyLevel::Beginner, DifficultyLevel::Advanced]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_no_flags_keeps_defaults() {
        let cli = Cli::parse_from(["asana-bootstrap"]);
        let mut config = BootstrapConfig::default();
        cli.apply(&mut config);
        assert_eq!(config, BootstrapConfig::default());
    }

    #[test]
    fn test_unknown_level_rejected() {
        assert!(Cli::try_parse_from(["asana-bootstrap", "--level", "expert"]).is_err());
    }
}
