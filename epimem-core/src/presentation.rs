use crate::stage::Stage;
use crate::task::{Task, TaskKind, TaskPayload};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Highest rank offered on room-order tasks
pub const ORDER_CHOICES: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Object,
    Room,
}

/// Substitutes default images for missing or unreadable asset references.
///
/// Placeholders alternate between two variants so that consecutive missing
/// images are still distinguishable on screen.
#[derive(Debug, Clone)]
pub struct PlaceholderImages {
    asset_dir: PathBuf,
    counter: u64,
}

impl PlaceholderImages {
    pub fn new(asset_dir: impl Into<PathBuf>) -> Self {
        Self {
            asset_dir: asset_dir.into(),
            counter: 0,
        }
    }

    pub fn resolve(&mut self, src: Option<&str>, kind: AssetKind) -> String {
        match src {
            Some(path) if !path.is_empty() && Path::new(path).exists() => path.to_string(),
            _ => self.placeholder(kind),
        }
    }

    fn placeholder(&mut self, kind: AssetKind) -> String {
        self.counter += 1;
        let variant = if self.counter % 2 == 0 { 2 } else { 1 };
        let name = match kind {
            AssetKind::Object => format!("Default_Object_{variant}.jpg"),
            AssetKind::Room => format!("Default_Room_{variant}.jpg"),
        };
        self.asset(&name)
    }

    fn asset(&self, file: &str) -> String {
        self.asset_dir.join(file).to_string_lossy().into_owned()
    }
}

impl Default for PlaceholderImages {
    fn default() -> Self {
        Self::new("assets")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceView {
    pub id: String,
    pub label: String,
    pub image: Option<String>,
}

impl ChoiceView {
    fn text(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            image: None,
        }
    }

    /// Two text buttons as `(id, label)` pairs
    fn pair(first: (&str, &str), second: (&str, &str)) -> Vec<Self> {
        vec![Self::text(first.0, first.1), Self::text(second.0, second.1)]
    }
}

/// Everything an external renderer needs to show the active task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presentation {
    pub index: usize,
    pub task_id: String,
    pub stage: Stage,
    pub kind: TaskKind,
    pub prompt: &'static str,
    pub image: String,
    pub choices: Vec<ChoiceView>,
    pub allows_dont_know: bool,
}

impl Presentation {
    pub fn for_task(index: usize, task: &Task, images: &mut PlaceholderImages) -> Self {
        let payload = &task.payload;
        let image = match payload {
            TaskPayload::ObjectRecognition { object }
            | TaskPayload::RoomLocate { object, .. }
            | TaskPayload::SpatialPosition { object, .. } => {
                images.resolve(object.image.as_deref(), AssetKind::Object)
            }
            TaskPayload::DayNight { room } | TaskPayload::RoomOrder { room, .. } => {
                images.resolve(room.image.as_deref(), AssetKind::Room)
            }
            TaskPayload::ScenePlausibility { image, .. }
            | TaskPayload::ScenePlausibilityImmediate { image, .. } => {
                images.resolve(image.as_deref(), AssetKind::Object)
            }
        };

        let choices = match payload {
            TaskPayload::ObjectRecognition { .. } => {
                ChoiceView::pair(("yes", "Oui"), ("no", "Non"))
            }
            TaskPayload::RoomLocate { rooms, .. } => rooms
                .iter()
                .map(|room| ChoiceView {
                    id: room.id.clone(),
                    label: if room.name.is_empty() {
                        room.id.clone()
                    } else {
                        room.name.clone()
                    },
                    image: Some(images.resolve(room.image.as_deref(), AssetKind::Room)),
                })
                .collect(),
            TaskPayload::SpatialPosition { choices, .. } => choices
                .iter()
                .enumerate()
                .map(|(i, choice)| ChoiceView {
                    id: choice.id.clone(),
                    label: format!("Image {}", i + 1),
                    image: Some(images.resolve(choice.image.as_deref(), AssetKind::Object)),
                })
                .collect(),
            TaskPayload::DayNight { .. } => vec![
                ChoiceView {
                    image: Some(images.asset("Default_Day.jpg")),
                    ..ChoiceView::text("jour", "Jour")
                },
                ChoiceView {
                    image: Some(images.asset("Default_Night.jpg")),
                    ..ChoiceView::text("nuit", "Nuit")
                },
            ],
            TaskPayload::RoomOrder { .. } => (1..=ORDER_CHOICES)
                .map(|n| ChoiceView::text(&n.to_string(), &n.to_string()))
                .collect(),
            TaskPayload::ScenePlausibility { .. }
            | TaskPayload::ScenePlausibilityImmediate { .. } => {
                ChoiceView::pair(("correct", "Correct"), ("incorrect", "Incorrect"))
            }
        };

        Self {
            index,
            task_id: task.task_id.clone(),
            stage: task.stage,
            kind: task.kind(),
            prompt: payload.prompt(),
            image,
            choices,
            allows_dont_know: true,
        }
    }
}
