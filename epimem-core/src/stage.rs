use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scoring groups of the battery, in presentation order
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    I,
    IIA,
    IIB,
    III,
    IV,
    V,
    RI,
    #[serde(rename = "RI_END")]
    RiEnd,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::I,
        Stage::IIA,
        Stage::IIB,
        Stage::III,
        Stage::IV,
        Stage::V,
        Stage::RI,
        Stage::RiEnd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::I => "I",
            Stage::IIA => "IIA",
            Stage::IIB => "IIB",
            Stage::III => "III",
            Stage::IV => "IV",
            Stage::V => "V",
            Stage::RI => "RI",
            Stage::RiEnd => "RI_END",
        }
    }

    /// Stages that only exist as follow-ups of a Stage I "yes"
    pub fn is_follow_up(&self) -> bool {
        matches!(self, Stage::IIA | Stage::IIB)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selects which queue-building branch runs for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskMode {
    /// Full battery: stages I to V plus the final immediate-recall block
    #[default]
    Recall,
    /// Short form: immediate-recall scenes only
    RappelImmediat,
}

impl TaskMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskMode::Recall => "recall",
            TaskMode::RappelImmediat => "rappel_immediat",
        }
    }
}

impl fmt::Display for TaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "recall" => Ok(TaskMode::Recall),
            "rappel_immediat" | "ri" => Ok(TaskMode::RappelImmediat),
            other => Err(format!("unknown task mode '{other}'")),
        }
    }
}
