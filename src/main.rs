use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use asana_bootstrap::cli::Cli;
use asana_bootstrap::pose::detector;
use asana_bootstrap::{BootstrapConfig, Trainer};

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(&cli) {
        error!("{e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => BootstrapConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BootstrapConfig::default(),
    };
    cli.apply(&mut config);
    config.validate()?;

    let detector = detector::from_config(&config.detector);
    let trainer = Trainer::new(&config, detector.as_ref());

    let summaries = if cli.parallel {
        trainer.train_in_parallel()?
    } else {
        trainer.train_normally()?
    };

    for s in &summaries {
        info!(
            "{}: {} samples written to {}",
            s.level,
            s.rows_dumped,
            s.dump_path.display()
        );
    }
    Ok(())
}
