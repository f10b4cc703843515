use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel for an explicit "don't know"
pub const DONT_KNOW: &str = "je_ne_sais_pas";
/// Sentinel recorded when the deadline expires without a response
pub const NO_RESPONSE: &str = "ne_repond_pas";

/// Raw response token as recorded in the session log
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Response {
    Choice(String),
    DontKnow,
    NoResponse,
}

impl Response {
    pub fn parse(token: &str) -> Self {
        match token.trim() {
            DONT_KNOW => Response::DontKnow,
            NO_RESPONSE => Response::NoResponse,
            other => Response::Choice(other.to_string()),
        }
    }

    pub fn token(&self) -> &str {
        match self {
            Response::Choice(c) => c,
            Response::DontKnow => DONT_KNOW,
            Response::NoResponse => NO_RESPONSE,
        }
    }

    pub fn choice(&self) -> Option<&str> {
        match self {
            Response::Choice(c) => Some(c),
            _ => None,
        }
    }
}

impl From<String> for Response {
    fn from(s: String) -> Self {
        Response::parse(&s)
    }
}

impl From<Response> for String {
    fn from(r: Response) -> Self {
        r.token().to_string()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Fine-grained outcome of one response
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseCategory {
    Hit,
    Miss,
    FalseAlarm,
    CorrectRejection,
    Other,
    CorrectRoom,
    WrongRoom,
    CorrectPosition,
    WrongPosition,
    CorrectTime,
    WrongTime,
    CorrectOrder,
    WrongOrder,
    CorrectScene,
    WrongScene,
    NoCorrectAnswer,
    DontKnow,
    NoResponse,
}

impl ResponseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseCategory::Hit => "hit",
            ResponseCategory::Miss => "miss",
            ResponseCategory::FalseAlarm => "false_alarm",
            ResponseCategory::CorrectRejection => "correct_rejection",
            ResponseCategory::Other => "other",
            ResponseCategory::CorrectRoom => "correct_room",
            ResponseCategory::WrongRoom => "wrong_room",
            ResponseCategory::CorrectPosition => "correct_position",
            ResponseCategory::WrongPosition => "wrong_position",
            ResponseCategory::CorrectTime => "correct_time",
            ResponseCategory::WrongTime => "wrong_time",
            ResponseCategory::CorrectOrder => "correct_order",
            ResponseCategory::WrongOrder => "wrong_order",
            ResponseCategory::CorrectScene => "correct_scene",
            ResponseCategory::WrongScene => "wrong_scene",
            ResponseCategory::NoCorrectAnswer => "no_correct_answer",
            ResponseCategory::DontKnow => "dont_know",
            ResponseCategory::NoResponse => "no_response",
        }
    }
}

impl fmt::Display for ResponseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
