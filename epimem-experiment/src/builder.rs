//! Turns a finished catalog into the ordered task queue of one session.
//!
//! Every shuffle of a session draws from a single seeded generator, in a
//! fixed order: learning room order, secondary room order, stage I objects,
//! stage III rooms, stage V pool, final immediate-recall pool. Changing that
//! order changes every queue built from an existing seed.

use crate::config::{ExperimentConfig, TaskDurations};
use epimem_core::{
    Catalog, CatalogObject, Room, SceneTrial, SpatialChoice, Stage, Task, TaskMode, TaskPayload,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Canonical layout of the room grid offered on room-locate tasks
pub const ROOM_GRID_ORDER: [&str; 10] = [
    "room8", "room5", "room3", "room7", "room4", "room6", "room10", "room9", "room2", "room1",
];

const SECONDARY_ORDER_ATTEMPTS: usize = 5;

/// Deterministic generator for a seed string
pub fn seeded_rng(seed_key: &str) -> StdRng {
    let digest = Sha256::digest(seed_key.as_bytes());
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&digest);
    StdRng::from_seed(seed)
}

/// Up to `target_each` ground-truth-correct and as many incorrect trials.
///
/// Both subsets are shuffled independently; if either is smaller than
/// `target_each` the whole (shuffled) pool is returned instead.
pub fn pick_balanced_trials<R: Rng + ?Sized>(
    trials: &[SceneTrial],
    rng: &mut R,
    target_each: usize,
) -> Vec<SceneTrial> {
    let (mut correct, mut incorrect): (Vec<SceneTrial>, Vec<SceneTrial>) =
        trials.iter().cloned().partition(|t| t.is_correct);
    correct.shuffle(rng);
    incorrect.shuffle(rng);
    if correct.len() >= target_each && incorrect.len() >= target_each {
        correct.truncate(target_each);
        incorrect.truncate(target_each);
    }
    correct.extend(incorrect);
    correct
}

/// Catalog rooms in grid order, followed by any room the grid does not name
pub fn grid_ordered_rooms(rooms: &[Room]) -> Vec<Room> {
    let mut ordered: Vec<Room> = ROOM_GRID_ORDER
        .iter()
        .filter_map(|id| rooms.iter().find(|r| r.id == *id).cloned())
        .collect();
    for room in rooms {
        if !ordered.iter().any(|r| r.id == room.id) {
            ordered.push(room.clone());
        }
    }
    ordered
}

fn room_ids(rooms: &[Room]) -> Vec<String> {
    rooms
        .iter()
        .filter(|r| !r.id.is_empty())
        .map(|r| r.id.clone())
        .collect()
}

/// Queue plus the two room permutations it was derived from
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQueue {
    pub tasks: Vec<Task>,
    pub learning_order: Vec<String>,
    pub secondary_order: Vec<String>,
}

pub struct TrialBuilder<'a> {
    catalog: &'a Catalog,
    durations: &'a TaskDurations,
    balanced_target: usize,
}

impl<'a> TrialBuilder<'a> {
    pub fn new(catalog: &'a Catalog, config: &'a ExperimentConfig) -> Self {
        Self {
            catalog,
            durations: &config.durations,
            balanced_target: config.balanced_target,
        }
    }

    pub fn build(&self, mode: TaskMode, seed_key: &str) -> BuiltQueue {
        let mut rng = seeded_rng(seed_key);
        let queue = self.build_with(mode, &mut rng);
        debug!(
            "Built {} tasks for mode {} (seed '{}')",
            queue.tasks.len(),
            mode,
            seed_key
        );
        queue
    }

    pub fn build_with<R: Rng + ?Sized>(&self, mode: TaskMode, rng: &mut R) -> BuiltQueue {
        match mode {
            TaskMode::RappelImmediat => BuiltQueue {
                tasks: self.immediate_recall_block(Stage::RI, rng),
                learning_order: Vec::new(),
                secondary_order: Vec::new(),
            },
            TaskMode::Recall => self.recall_battery(rng),
        }
    }

    fn task(&self, task_id: String, stage: Stage, payload: TaskPayload) -> Task {
        Task {
            task_id,
            stage,
            duration_ms: self.durations.for_kind(payload.kind()),
            payload,
        }
    }

    fn recall_battery<R: Rng + ?Sized>(&self, rng: &mut R) -> BuiltQueue {
        let catalog = self.catalog;
        let mut tasks = Vec::new();

        let mut learning = catalog.rooms.clone();
        learning.shuffle(rng);
        let learning_order = room_ids(&learning);

        let mut secondary = catalog.rooms.clone();
        for _ in 0..SECONDARY_ORDER_ATTEMPTS {
            secondary.shuffle(rng);
            if room_ids(&secondary) != learning_order {
                break;
            }
        }
        if room_ids(&secondary) == learning_order && !secondary.is_empty() {
            secondary.rotate_left(1);
        }
        let secondary_order = room_ids(&secondary);

        // Stage I
        let mut objects: Vec<CatalogObject> = catalog
            .familiar_objects
            .iter()
            .chain(catalog.new_objects.iter())
            .cloned()
            .collect();
        objects.shuffle(rng);
        for (idx, object) in objects.into_iter().enumerate() {
            tasks.push(self.task(
                format!("step1_{}_{}", object.id, idx + 1),
                Stage::I,
                TaskPayload::ObjectRecognition { object },
            ));
        }

        // Stage III, then stage IV over the same room order
        let mut rooms = catalog.rooms.clone();
        rooms.shuffle(rng);
        for room in &rooms {
            tasks.push(self.task(
                format!("step3_{}", room.id),
                Stage::III,
                TaskPayload::DayNight { room: room.clone() },
            ));
        }
        for room in rooms {
            let correct_order = learning_order
                .iter()
                .position(|id| *id == room.id)
                .map(|rank| rank as u32 + 1);
            tasks.push(self.task(
                format!("step4_{}", room.id),
                Stage::IV,
                TaskPayload::RoomOrder {
                    room,
                    correct_order,
                },
            ));
        }

        // Stage V: previously correct scenes are now shown altered
        let mut late = pick_balanced_trials(&catalog.late_recall_trials, rng, self.balanced_target);
        late.shuffle(rng);
        for trial in late {
            tasks.push(self.task(
                format!("step5_{}", trial.id),
                Stage::V,
                TaskPayload::ScenePlausibility {
                    image: trial.image,
                    is_correct: !trial.is_correct,
                },
            ));
        }

        tasks.extend(self.immediate_recall_block(Stage::RiEnd, rng));

        BuiltQueue {
            tasks,
            learning_order,
            secondary_order,
        }
    }

    fn immediate_recall_block<R: Rng + ?Sized>(&self, stage: Stage, rng: &mut R) -> Vec<Task> {
        let mut trials = pick_balanced_trials(
            &self.catalog.immediate_recall_trials,
            rng,
            self.balanced_target,
        );
        trials.shuffle(rng);
        trials
            .into_iter()
            .map(|trial| {
                let task_id = match stage {
                    Stage::RiEnd => format!("ri_end_{}", trial.id),
                    _ => trial.id,
                };
                self.task(
                    task_id,
                    stage,
                    TaskPayload::ScenePlausibilityImmediate {
                        image: trial.image,
                        is_correct: trial.is_correct,
                    },
                )
            })
            .collect()
    }

    /// Room-locate (IIA) and spatial-position (IIB) follow-ups for an object
    /// answered "yes" at stage I. `rng` must not be the builder's generator.
    pub fn follow_ups<R: Rng + ?Sized>(&self, object: &CatalogObject, rng: &mut R) -> [Task; 2] {
        let positions = self.catalog.positions_for(&object.id);
        let mut choices = if object.is_familiar {
            vec![
                SpatialChoice {
                    id: "good".to_string(),
                    image: positions.good,
                    is_correct: true,
                },
                SpatialChoice {
                    id: "bad".to_string(),
                    image: positions.bad,
                    is_correct: false,
                },
            ]
        } else {
            vec![
                SpatialChoice {
                    id: "bad1".to_string(),
                    image: positions.bad,
                    is_correct: false,
                },
                SpatialChoice {
                    id: "bad2".to_string(),
                    image: positions.alt_bad,
                    is_correct: false,
                },
            ]
        };
        choices.shuffle(rng);

        let locate = self.task(
            format!("step2_where_{}", object.id),
            Stage::IIA,
            TaskPayload::RoomLocate {
                object: object.clone(),
                rooms: grid_ordered_rooms(&self.catalog.rooms),
            },
        );
        let spatial = self.task(
            format!("step2_spatial_{}", object.id),
            Stage::IIB,
            TaskPayload::SpatialPosition {
                object: object.clone(),
                choices,
            },
        );
        [locate, spatial]
    }
}
