use crate::evaluate::{Evaluation, categories};
use epimem_core::{ResponseCategory, Stage, TaskKind};
use serde::{Serialize, Serializer, ser::SerializeMap};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageScore {
    pub total: u32,
    pub correct: u32,
}

impl StageScore {
    pub fn percent(&self) -> Option<f64> {
        (self.total > 0).then(|| f64::from(self.correct) * 100.0 / f64::from(self.total))
    }
}

/// Category counts for one task kind.
///
/// Serializes as a flat object of counts. Room order also carries
/// `mean_abs_error`, which stays `null` until a ranked answer arrives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KindTally {
    pub counts: BTreeMap<ResponseCategory, u32>,
    pub mean_abs_error: Option<f64>,
    tracks_error: bool,
    error_sum: u64,
    error_samples: u32,
}

impl KindTally {
    fn for_kind(kind: TaskKind) -> Self {
        Self {
            counts: categories(kind).iter().map(|c| (*c, 0)).collect(),
            tracks_error: kind == TaskKind::RoomOrder,
            ..Self::default()
        }
    }

    pub fn count(&self, category: ResponseCategory) -> u32 {
        self.counts.get(&category).copied().unwrap_or(0)
    }

    fn add_error(&mut self, distance: u32) {
        self.error_sum += u64::from(distance);
        self.error_samples += 1;
        self.mean_abs_error = Some(self.error_sum as f64 / f64::from(self.error_samples));
    }
}

impl Serialize for KindTally {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.counts.len() + usize::from(self.tracks_error);
        let mut map = serializer.serialize_map(Some(len))?;
        for (category, count) in &self.counts {
            map.serialize_entry(category, count)?;
        }
        if self.tracks_error {
            map.serialize_entry("mean_abs_error", &self.mean_abs_error)?;
        }
        map.end()
    }
}

/// Running per-stage scores and per-kind category counts.
///
/// Only responses with a defined correctness count toward a stage total.
/// Category counts include every finalized task.
#[derive(Debug, Clone, PartialEq)]
pub struct Scoreboard {
    stage_scores: BTreeMap<Stage, StageScore>,
    metrics: BTreeMap<TaskKind, KindTally>,
}

impl Default for Scoreboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Scoreboard {
    pub fn new() -> Self {
        Self {
            stage_scores: Stage::ALL
                .iter()
                .map(|s| (*s, StageScore::default()))
                .collect(),
            metrics: TaskKind::ALL
                .iter()
                .map(|k| (*k, KindTally::for_kind(*k)))
                .collect(),
        }
    }

    pub fn record(&mut self, stage: Stage, kind: TaskKind, evaluation: &Evaluation) {
        if let Some(correct) = evaluation.correct {
            let score = self.stage_scores.entry(stage).or_default();
            score.total += 1;
            if correct {
                score.correct += 1;
            }
        }

        let tally = self
            .metrics
            .entry(kind)
            .or_insert_with(|| KindTally::for_kind(kind));
        *tally.counts.entry(evaluation.category).or_insert(0) += 1;
        if let Some(distance) = evaluation.error_distance {
            tally.add_error(distance);
        }
    }

    pub fn stage(&self, stage: Stage) -> StageScore {
        self.stage_scores.get(&stage).copied().unwrap_or_default()
    }

    pub fn stage_scores(&self) -> &BTreeMap<Stage, StageScore> {
        &self.stage_scores
    }

    pub fn kind(&self, kind: TaskKind) -> Option<&KindTally> {
        self.metrics.get(&kind)
    }

    pub fn metrics(&self) -> &BTreeMap<TaskKind, KindTally> {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(correct: Option<bool>, category: ResponseCategory) -> Evaluation {
        Evaluation {
            correct,
            category,
            expected: None,
            error_distance: None,
        }
    }

    fn hit() -> Evaluation {
        eval(Some(true), ResponseCategory::Hit)
    }

    #[test]
    fn starts_with_every_stage_at_zero() {
        let board = Scoreboard::new();
        assert_eq!(board.stage_scores().len(), Stage::ALL.len());
        assert!(board.stage_scores().values().all(|s| s.total == 0));
        assert_eq!(board.stage(Stage::I).percent(), None);
        let recognition = board.kind(TaskKind::ObjectRecognition).unwrap();
        assert_eq!(recognition.count(ResponseCategory::Hit), 0);
        let counts = &recognition.counts;
        assert!(counts.contains_key(&ResponseCategory::CorrectRejection));
    }

    #[test]
    fn unscored_responses_do_not_touch_stage_totals() {
        let mut board = Scoreboard::new();
        let miss = eval(Some(false), ResponseCategory::Miss);
        let unscored = eval(None, ResponseCategory::NoCorrectAnswer);
        board.record(Stage::I, TaskKind::ObjectRecognition, &hit());
        board.record(Stage::I, TaskKind::ObjectRecognition, &miss);
        board.record(Stage::IIA, TaskKind::RoomLocate, &unscored);

        let stage_one = board.stage(Stage::I);
        assert_eq!((stage_one.total, stage_one.correct), (2, 1));
        assert_eq!(stage_one.percent(), Some(50.0));
        assert_eq!(board.stage(Stage::IIA).total, 0);
        assert_eq!(
            board
                .kind(TaskKind::RoomLocate)
                .unwrap()
                .count(ResponseCategory::NoCorrectAnswer),
            1
        );
    }

    #[test]
    fn room_order_mean_error() {
        let mut board = Scoreboard::new();
        for distance in [0, 3, 2] {
            let mut e = eval(Some(distance == 0), ResponseCategory::WrongOrder);
            e.error_distance = Some(distance);
            board.record(Stage::IV, TaskKind::RoomOrder, &e);
        }
        let tally = board.kind(TaskKind::RoomOrder).unwrap();
        assert_eq!(tally.mean_abs_error, Some(5.0 / 3.0));
        let day_night = board.kind(TaskKind::DayNight).unwrap();
        assert_eq!(day_night.mean_abs_error, None);

        let value = serde_json::to_value(board.metrics()).unwrap();
        assert_eq!(value["room_order"]["mean_abs_error"], 5.0 / 3.0);
    }

    #[test]
    fn tally_serializes_as_flat_object() {
        let mut board = Scoreboard::new();
        board.record(Stage::I, TaskKind::ObjectRecognition, &hit());
        let tally = board.kind(TaskKind::ObjectRecognition).unwrap();
        let value = serde_json::to_value(tally).unwrap();
        assert_eq!(value["hit"], 1);
        assert_eq!(value["false_alarm"], 0);
        assert!(value.get("mean_abs_error").is_none());
    }

    #[test]
    fn room_order_reports_null_error_before_any_ranked_answer() {
        let value = serde_json::to_value(Scoreboard::new().metrics()).unwrap();
        let room_order = value["room_order"].as_object().unwrap();
        assert!(room_order.contains_key("mean_abs_error"));
        assert!(value["room_order"]["mean_abs_error"].is_null());
        assert_eq!(value["room_order"]["correct_order"], 0);

        for kind in ["object_recognition", "room_locate", "day_night"] {
            assert!(value[kind].get("mean_abs_error").is_none(), "{kind}");
        }
    }
}
