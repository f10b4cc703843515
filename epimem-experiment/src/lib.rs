pub mod builder;
pub mod catalog;
pub mod config;
pub mod evaluate;
pub mod metrics;
pub mod persist;
pub mod queue;
pub mod session_log;
pub mod state;
pub use builder::{BuiltQueue, TrialBuilder, pick_balanced_trials, seeded_rng};
pub use catalog::{CatalogError, load_catalog, load_or_sample, sample_catalog};
pub use config::{ConfigError, ExperimentConfig, RandomMode, TaskDurations, TelemetryConfig};
pub use evaluate::{Evaluation, evaluate};
pub use metrics::{KindTally, Scoreboard, StageScore};
pub use persist::{PersistError, SessionStore};
pub use queue::TaskQueue;
pub use session_log::{PlatformInfo, SessionInfo, SessionLog, SessionMeta};
pub use state::{EndReason, SessionError, SessionEvent, SessionState, SessionStateMachine};
