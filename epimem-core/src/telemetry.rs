use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Message body: structured when it decodes as JSON, raw text otherwise
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TelemetryPayload {
    Json(serde_json::Value),
    Text(String),
}

impl TelemetryPayload {
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(value) => TelemetryPayload::Json(value),
            Err(_) => TelemetryPayload::Text(raw.to_string()),
        }
    }

    pub fn into_value(self) -> serde_json::Value {
        match self {
            TelemetryPayload::Json(v) => v,
            TelemetryPayload::Text(s) => serde_json::Value::String(s),
        }
    }
}

/// One inbound message, stamped on receipt
#[derive(Debug, Clone)]
pub struct TelemetryMessage {
    pub received_at: DateTime<Utc>,
    pub received_mono: Instant,
    pub payload: TelemetryPayload,
}

impl TelemetryMessage {
    pub fn received_now(raw: &str) -> Self {
        Self {
            received_at: Utc::now(),
            received_mono: Instant::now(),
            payload: TelemetryPayload::parse(raw),
        }
    }

    /// Whole milliseconds since `session_start`, zero if received before it
    pub fn relative_ms(&self, session_start: Instant) -> u64 {
        self.received_mono
            .saturating_duration_since(session_start)
            .as_millis() as u64
    }

    pub fn into_entry(self, session_start: Instant) -> TelemetryEntry {
        TelemetryEntry {
            relative_ms: self.relative_ms(session_start),
            received_at: self.received_at,
            payload: self.payload.into_value(),
        }
    }
}

/// Telemetry as written to the session log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEntry {
    pub received_at: DateTime<Utc>,
    pub relative_ms: u64,
    pub payload: serde_json::Value,
}
