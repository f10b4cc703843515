pub mod catalog;
pub mod presentation;
pub mod record;
pub mod response;
pub mod stage;
pub mod task;
pub mod telemetry;

pub use catalog::{Catalog, CatalogObject, PositionImages, Room, SceneTrial, Timing};
pub use presentation::{AssetKind, ChoiceView, PlaceholderImages, Presentation};
pub use record::ResponseRecord;
pub use response::{DONT_KNOW, NO_RESPONSE, Response, ResponseCategory};
pub use stage::{Stage, TaskMode};
pub use task::{SpatialChoice, Task, TaskKind, TaskPayload};
pub use telemetry::{TelemetryEntry, TelemetryMessage, TelemetryPayload};
