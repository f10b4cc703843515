use crate::metrics::{KindTally, Scoreboard, StageScore};
use chrono::{DateTime, Utc};
use epimem_core::{ResponseRecord, Stage, TaskKind, TaskMode, TelemetryEntry, TelemetryMessage};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

/// Identity and clocks of one run
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub session_id: String,
    pub subject_id: String,
    pub task_mode: TaskMode,
    pub experiment_name: String,
    pub seed_key: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Monotonic anchor for telemetry offsets
    pub started_mono: Instant,
    pub learning_room_order: Vec<String>,
    pub secondary_room_order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformInfo {
    pub os: &'static str,
    pub arch: &'static str,
    pub family: &'static str,
}

impl PlatformInfo {
    pub fn current() -> Self {
        Self {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            family: std::env::consts::FAMILY,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionMeta {
    pub session_id: String,
    pub subject_id: String,
    pub task_mode: TaskMode,
    pub experiment_name: String,
    pub seed: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub learning_room_order: Vec<String>,
    pub secondary_room_order: Vec<String>,
    pub platform: PlatformInfo,
    pub scores: BTreeMap<Stage, StageScore>,
    pub metrics: BTreeMap<TaskKind, KindTally>,
}

/// The persisted artifact of a finished session
#[derive(Debug, Clone, Serialize)]
pub struct SessionLog {
    pub session: SessionMeta,
    pub tasks: Vec<ResponseRecord>,
    pub vr_messages: Vec<TelemetryEntry>,
}

impl SessionLog {
    pub fn assemble(
        info: &SessionInfo,
        scoreboard: &Scoreboard,
        tasks: Vec<ResponseRecord>,
        messages: Vec<TelemetryMessage>,
    ) -> Self {
        let vr_messages = messages
            .into_iter()
            .map(|m| m.into_entry(info.started_mono))
            .collect();
        Self {
            session: SessionMeta {
                session_id: info.session_id.clone(),
                subject_id: info.subject_id.clone(),
                task_mode: info.task_mode,
                experiment_name: info.experiment_name.clone(),
                seed: info.seed_key.clone(),
                started_at: info.started_at,
                ended_at: info.ended_at,
                learning_room_order: info.learning_room_order.clone(),
                secondary_room_order: info.secondary_room_order.clone(),
                platform: PlatformInfo::current(),
                scores: scoreboard.stage_scores().clone(),
                metrics: scoreboard.metrics().clone(),
            },
            tasks,
            vr_messages,
        }
    }
}
