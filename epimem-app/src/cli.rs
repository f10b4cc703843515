use anyhow::{Context, Result};
use clap::Parser;
use epimem_experiment::{ExperimentConfig, RandomMode};
use std::path::PathBuf;

/// Episodic memory recall battery
///
/// Runs sessions from an asset catalog, driven by operator commands on stdin,
/// and writes one JSON log per session.
#[derive(Parser, Debug)]
#[command(name = "epimem")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file; absent keys keep their defaults
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Asset catalog (JSON); the built-in sample catalog is used otherwise
    #[arg(long, value_name = "PATH")]
    pub catalog: Option<PathBuf>,

    /// Directory session logs are written to
    #[arg(long, value_name = "DIR")]
    pub sessions_dir: Option<PathBuf>,

    /// Fixed randomization seed
    #[arg(long, conflicts_with = "per_session")]
    pub seed: Option<String>,

    /// Seed every session from its own identity
    #[arg(long)]
    pub per_session: bool,

    /// Do not start the telemetry listener
    #[arg(long)]
    pub no_telemetry: bool,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Config file first, then command-line overrides
    pub fn load_config(&self) -> Result<ExperimentConfig> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_toml_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => ExperimentConfig::default(),
        };

        if let Some(dir) = &self.sessions_dir {
            config.sessions_dir = dir.clone();
        }
        if let Some(seed) = &self.seed {
            config.randomization = RandomMode::Fixed { seed: seed.clone() };
        }
        if self.per_session {
            config.randomization = RandomMode::PerSession;
        }
        if self.no_telemetry {
            config.telemetry.enabled = false;
        }
        Ok(config)
    }
}
