use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Time of day a room or object was shown during learning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timing {
    Jour,
    Nuit,
}

impl Timing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timing::Jour => "jour",
            Timing::Nuit => "nuit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jour" | "day" => Some(Timing::Jour),
            "nuit" | "night" => Some(Timing::Nuit),
            _ => None,
        }
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Unknown labels become "no timing" instead of failing the whole catalog.
fn lenient_timing<'de, D>(deserializer: D) -> Result<Option<Timing>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(Timing::parse))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_timing")]
    pub timing: Option<Timing>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogObject {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_familiar: bool,
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_timing")]
    pub timing: Option<Timing>,
}

/// One composite scene with its ground truth as stored in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneTrial {
    pub id: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub is_correct: bool,
}

/// Precomputed spatial-position images for one object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionImages {
    #[serde(default)]
    pub good: Option<String>,
    #[serde(default)]
    pub bad: Option<String>,
    #[serde(default)]
    pub alt_bad: Option<String>,
}

fn default_experiment_name() -> String {
    "MemoireEpisodique".to_string()
}

/// Finished asset catalog handed to the trial builder.
///
/// Familiarity is a property of list membership: [`Catalog::normalize`]
/// marks everything in `familiar_objects` as familiar and everything in
/// `new_objects` as novel, whatever the source file said.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default = "default_experiment_name")]
    pub experiment_name: String,
    #[serde(default)]
    pub rooms: Vec<Room>,
    #[serde(default)]
    pub familiar_objects: Vec<CatalogObject>,
    #[serde(default)]
    pub new_objects: Vec<CatalogObject>,
    /// Scene pool for stage V
    #[serde(default, alias = "step5_trials")]
    pub late_recall_trials: Vec<SceneTrial>,
    /// Scene pool for the immediate-recall blocks (RI and RI_END)
    #[serde(default, alias = "rappel_immediat_trials")]
    pub immediate_recall_trials: Vec<SceneTrial>,
    #[serde(default, alias = "iib_positions")]
    pub position_images: BTreeMap<String, PositionImages>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            experiment_name: default_experiment_name(),
            rooms: Vec::new(),
            familiar_objects: Vec::new(),
            new_objects: Vec::new(),
            late_recall_trials: Vec::new(),
            immediate_recall_trials: Vec::new(),
            position_images: BTreeMap::new(),
        }
    }
}

impl Catalog {
    pub fn normalize(mut self) -> Self {
        for obj in &mut self.familiar_objects {
            obj.is_familiar = true;
        }
        for obj in &mut self.new_objects {
            obj.is_familiar = false;
            obj.room_id = None;
            obj.timing = None;
        }
        self
    }

    pub fn room(&self, id: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn positions_for(&self, object_id: &str) -> PositionImages {
        self.position_images
            .get(object_id)
            .cloned()
            .unwrap_or_default()
    }
}
