use crate::response::{Response, ResponseCategory};
use crate::stage::Stage;
use crate::task::{TaskKind, TaskPayload};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recorded result per finalized task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub task_id: String,
    pub stage: Stage,
    #[serde(flatten)]
    pub payload: TaskPayload,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Elapsed time clamped to `duration_ms`
    pub response_duration_ms: u64,
    pub actual_elapsed_ms: u64,
    pub response: Response,
    pub timeout: bool,
    pub is_correct: Option<bool>,
    pub response_category: ResponseCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_distance: Option<u32>,
}

impl ResponseRecord {
    pub fn kind(&self) -> TaskKind {
        self.payload.kind()
    }
}
