//! WebSocket listener that collects headset telemetry during a session.
//!
//! A single actor task owns the message buffer. Connection tasks stamp each
//! inbound frame on receipt and forward it to the actor; the session driver
//! only ever sees the buffer through [`TelemetryService::drain`].

mod service;

pub use service::TelemetryService;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("telemetry service has stopped")]
    Stopped,
}
