use epimem_core::TaskKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SEED: &str = "HARMORYC_V2";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(String),
}

/// How the builder's random source is seeded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RandomMode {
    /// Same order for every session
    Fixed { seed: String },
    /// Seeded by experiment name, subject id and session id
    PerSession,
}

impl Default for RandomMode {
    fn default() -> Self {
        RandomMode::Fixed {
            seed: DEFAULT_SEED.to_string(),
        }
    }
}

impl RandomMode {
    pub fn seed_key(&self, experiment: &str, subject: &str, session_id: &str) -> String {
        match self {
            RandomMode::Fixed { seed } => seed.clone(),
            RandomMode::PerSession => format!("{experiment}-{subject}-{session_id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskDurations {
    pub recognition_ms: u64,
    pub follow_up_ms: u64,
    pub day_night_ms: u64,
    pub room_order_ms: u64,
    pub late_recall_ms: u64,
    pub immediate_recall_ms: u64,
}

impl Default for TaskDurations {
    fn default() -> Self {
        Self {
            recognition_ms: 10_000,
            follow_up_ms: 20_000,
            day_night_ms: 10_000,
            room_order_ms: 10_000,
            late_recall_ms: 10_000,
            immediate_recall_ms: 10_000,
        }
    }
}

impl TaskDurations {
    pub fn for_kind(&self, kind: TaskKind) -> u64 {
        match kind {
            TaskKind::ObjectRecognition => self.recognition_ms,
            TaskKind::RoomLocate | TaskKind::SpatialPosition => self.follow_up_ms,
            TaskKind::DayNight => self.day_night_ms,
            TaskKind::RoomOrder => self.room_order_ms,
            TaskKind::ScenePlausibility => self.late_recall_ms,
            TaskKind::ScenePlausibilityImmediate => self.immediate_recall_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub enabled: bool,
    pub bind_addr: String,
    pub stop_timeout_ms: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_addr: "0.0.0.0:8765".to_string(),
            stop_timeout_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub durations: TaskDurations,
    pub intermission_ms: u64,
    pub tick_interval_ms: u64,
    pub randomization: RandomMode,
    /// Per-subset target for balanced scene sampling
    pub balanced_target: usize,
    pub telemetry: TelemetryConfig,
    pub sessions_dir: PathBuf,
    pub asset_dir: PathBuf,
    /// Overrides the catalog's experiment name when set
    pub experiment_name: Option<String>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            durations: TaskDurations::default(),
            intermission_ms: 3_000,
            tick_interval_ms: 50,
            randomization: RandomMode::default(),
            balanced_target: 5,
            telemetry: TelemetryConfig::default(),
            sessions_dir: PathBuf::from("sessions"),
            asset_dir: PathBuf::from("assets"),
            experiment_name: None,
        }
    }
}

impl ExperimentConfig {
    /// Parses a TOML document; absent keys keep their defaults
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}
