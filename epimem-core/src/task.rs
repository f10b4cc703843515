use crate::catalog::{CatalogObject, Room};
use crate::stage::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of question types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    ObjectRecognition,
    RoomLocate,
    SpatialPosition,
    DayNight,
    RoomOrder,
    ScenePlausibility,
    ScenePlausibilityImmediate,
}

impl TaskKind {
    pub const ALL: [TaskKind; 7] = [
        TaskKind::ObjectRecognition,
        TaskKind::RoomLocate,
        TaskKind::SpatialPosition,
        TaskKind::DayNight,
        TaskKind::RoomOrder,
        TaskKind::ScenePlausibility,
        TaskKind::ScenePlausibilityImmediate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::ObjectRecognition => "object_recognition",
            TaskKind::RoomLocate => "room_locate",
            TaskKind::SpatialPosition => "spatial_position",
            TaskKind::DayNight => "day_night",
            TaskKind::RoomOrder => "room_order",
            TaskKind::ScenePlausibility => "scene_plausibility",
            TaskKind::ScenePlausibilityImmediate => "scene_plausibility_immediate",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialChoice {
    pub id: String,
    pub image: Option<String>,
    pub is_correct: bool,
}

/// Kind-specific payload. Each variant carries only what its kind needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskPayload {
    ObjectRecognition { object: CatalogObject },
    RoomLocate {
        object: CatalogObject,
        rooms: Vec<Room>,
    },
    SpatialPosition {
        object: CatalogObject,
        choices: Vec<SpatialChoice>,
    },
    DayNight { room: Room },
    RoomOrder {
        room: Room,
        correct_order: Option<u32>,
    },
    ScenePlausibility {
        image: Option<String>,
        is_correct: bool,
    },
    ScenePlausibilityImmediate {
        image: Option<String>,
        is_correct: bool,
    },
}

impl TaskPayload {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskPayload::ObjectRecognition { .. } => TaskKind::ObjectRecognition,
            TaskPayload::RoomLocate { .. } => TaskKind::RoomLocate,
            TaskPayload::SpatialPosition { .. } => TaskKind::SpatialPosition,
            TaskPayload::DayNight { .. } => TaskKind::DayNight,
            TaskPayload::RoomOrder { .. } => TaskKind::RoomOrder,
            TaskPayload::ScenePlausibility { .. } => TaskKind::ScenePlausibility,
            TaskPayload::ScenePlausibilityImmediate { .. } => {
                TaskKind::ScenePlausibilityImmediate
            }
        }
    }

    pub fn object(&self) -> Option<&CatalogObject> {
        match self {
            TaskPayload::ObjectRecognition { object }
            | TaskPayload::RoomLocate { object, .. }
            | TaskPayload::SpatialPosition { object, .. } => Some(object),
            _ => None,
        }
    }

    /// Question text shown above the stimulus
    pub fn prompt(&self) -> &'static str {
        match self {
            TaskPayload::ObjectRecognition { .. } => "Avez-vous vu cet objet ?",
            TaskPayload::RoomLocate { .. } => "Dans quelle salle était cet objet ?",
            TaskPayload::SpatialPosition { .. } => "Quelle position spatiale avez-vous vue ?",
            TaskPayload::DayNight { .. } => "Faisait-il jour ou nuit ?",
            TaskPayload::RoomOrder { .. } => {
                "À quel moment cette salle a-t-elle été vue ? (1 = première salle vue, 10 = dernière salle vue)"
            }
            TaskPayload::ScenePlausibility { .. }
            | TaskPayload::ScenePlausibilityImmediate { .. } => "Cette scène est-elle correcte ?",
        }
    }

    /// Token a fully correct response would carry, if the task has one
    pub fn expected_answer(&self) -> Option<String> {
        match self {
            TaskPayload::ObjectRecognition { object } => {
                Some(if object.is_familiar { "yes" } else { "no" }.to_string())
            }
            TaskPayload::RoomLocate { object, .. } => {
                object.room_id.clone().filter(|_| object.is_familiar)
            }
            TaskPayload::SpatialPosition { object, choices } => {
                if !object.is_familiar {
                    return None;
                }
                choices.iter().find(|c| c.is_correct).map(|c| c.id.clone())
            }
            TaskPayload::DayNight { room } => room.timing.map(|t| t.as_str().to_string()),
            TaskPayload::RoomOrder { correct_order, .. } => correct_order.map(|o| o.to_string()),
            TaskPayload::ScenePlausibility { is_correct, .. }
            | TaskPayload::ScenePlausibilityImmediate { is_correct, .. } => {
                let token = if *is_correct { "correct" } else { "incorrect" };
                Some(token.to_string())
            }
        }
    }
}

/// One presented stimulus with its response window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub stage: Stage,
    pub duration_ms: u64,
    #[serde(flatten)]
    pub payload: TaskPayload,
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        self.payload.kind()
    }
}
