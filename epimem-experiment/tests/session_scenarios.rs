use epimem_core::{
    Catalog, Response, ResponseCategory, SceneTrial, Stage, TaskKind, TaskMode, TaskPayload,
    Timing,
};
use epimem_experiment::{
    EndReason, ExperimentConfig, RandomMode, SessionError, SessionEvent, SessionState,
    SessionStateMachine, sample_catalog,
};
use epimem_timing::ManualTimer;
use rand::SeedableRng;
use rand::rngs::StdRng;

type Machine = SessionStateMachine<ManualTimer, StdRng>;

fn machine_with(catalog: Catalog, config: ExperimentConfig) -> (Machine, ManualTimer) {
    let timer = ManualTimer::new();
    let sm = SessionStateMachine::new(catalog, config, timer.clone(), StdRng::seed_from_u64(42));
    (sm, timer)
}

fn machine() -> (Machine, ManualTimer) {
    machine_with(sample_catalog(), ExperimentConfig::default())
}

/// Rooms of the sample catalog, one familiar object (OF3, night) and nothing else
fn single_object_catalog(familiar: bool) -> Catalog {
    let mut catalog = sample_catalog();
    if familiar {
        let mut of3 = catalog.familiar_objects[2].clone();
        of3.timing = Some(Timing::Nuit);
        catalog.familiar_objects = vec![of3];
        catalog.new_objects.clear();
    } else {
        catalog.new_objects.truncate(1);
        catalog.familiar_objects.clear();
    }
    catalog
}

fn scenes(prefix: &str, n: usize) -> Vec<SceneTrial> {
    (0..n)
        .map(|i| SceneTrial {
            id: format!("{prefix}{i}"),
            image: None,
            is_correct: i % 2 == 0,
        })
        .collect()
}

fn finalized(events: &[SessionEvent]) -> Vec<&epimem_core::ResponseRecord> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::TaskFinalized { record, .. } => Some(record.as_ref()),
            _ => None,
        })
        .collect()
}

fn index_of(sm: &Machine, task_id: &str) -> usize {
    sm.queue()
        .iter()
        .position(|t| t.task_id == task_id)
        .unwrap_or_else(|| panic!("{task_id} not in queue"))
}

#[test]
fn yes_to_familiar_object_is_a_hit_and_inserts_follow_ups() {
    let (mut sm, timer) = machine_with(single_object_catalog(true), ExperimentConfig::default());
    sm.start("S01", TaskMode::Recall).unwrap();
    let before = sm.queue().len();

    timer.advance_ms(1_200);
    let events = sm.respond("yes");
    let records = finalized(&events);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].response_category, ResponseCategory::Hit);
    assert_eq!(records[0].is_correct, Some(true));
    assert_eq!(records[0].actual_elapsed_ms, 1_200);
    assert!(!records[0].timeout);
    assert!(events.contains(&SessionEvent::FollowUpsInserted { after: 0 }));

    assert_eq!(sm.queue().len(), before + 2);
    let locate = sm.queue().get(1).unwrap();
    let spatial = sm.queue().get(2).unwrap();
    assert_eq!(
        (locate.stage, locate.kind()),
        (Stage::IIA, TaskKind::RoomLocate)
    );
    assert_eq!(
        (spatial.stage, spatial.kind()),
        (Stage::IIB, TaskKind::SpatialPosition)
    );
    assert!(locate.stage.is_follow_up() && spatial.stage.is_follow_up());
    assert_eq!(locate.duration_ms, 20_000);
    assert_eq!(locate.payload.object().unwrap().id, "OF3");

    timer.advance_ms(3_000);
    let events = sm.tick();
    assert!(matches!(
        events.as_slice(),
        [SessionEvent::TaskActivated { index: 1, .. }]
    ));
    timer.advance_ms(800);
    let events = sm.respond("room3");
    assert_eq!(
        finalized(&events)[0].response_category,
        ResponseCategory::CorrectRoom
    );

    timer.advance_ms(3_000);
    sm.tick();
    timer.advance_ms(800);
    let events = sm.respond("good");
    assert_eq!(
        finalized(&events)[0].response_category,
        ResponseCategory::CorrectPosition
    );
}

#[test]
fn stage_one_task_is_expanded_at_most_once() {
    let (mut sm, timer) = machine_with(single_object_catalog(true), ExperimentConfig::default());
    sm.start("S01", TaskMode::Recall).unwrap();
    sm.respond("yes");
    let len = sm.queue().len();

    sm.jump(0).unwrap();
    timer.advance_ms(100);
    let events = sm.respond("yes");
    let expanded = events
        .iter()
        .any(|e| matches!(e, SessionEvent::FollowUpsInserted { .. }));
    assert!(!expanded);
    assert_eq!(sm.queue().len(), len);
}

// Follow-ups are also inserted after a false alarm; both are then unscorable.
#[test]
fn yes_to_novel_object_still_inserts_follow_ups() {
    let (mut sm, timer) = machine_with(single_object_catalog(false), ExperimentConfig::default());
    sm.start("S01", TaskMode::Recall).unwrap();
    let events = sm.respond("yes");
    assert_eq!(
        finalized(&events)[0].response_category,
        ResponseCategory::FalseAlarm
    );
    assert_eq!(sm.queue().get(1).unwrap().stage, Stage::IIA);

    for _ in 0..2 {
        timer.advance_ms(3_000);
        sm.tick();
        timer.advance_ms(20_000);
        let events = sm.tick();
        let record = finalized(&events)[0];
        assert_eq!(record.response, Response::NoResponse);
        assert!(record.timeout);
        assert_eq!(record.is_correct, None);
    }
    assert_eq!(sm.scoreboard().stage(Stage::IIA).total, 0);
    assert_eq!(sm.scoreboard().stage(Stage::IIB).total, 0);
}

#[test]
fn day_night_answer_for_day_room() {
    let (mut sm, timer) = machine();
    sm.start("S01", TaskMode::Recall).unwrap();
    let index = index_of(&sm, "step3_room5");
    sm.jump(index).unwrap();
    timer.advance_ms(2_000);
    let events = sm.respond("nuit");
    let record = finalized(&events)[0];
    assert_eq!(record.response_category, ResponseCategory::WrongTime);
    assert_eq!(record.is_correct, Some(false));
    assert_eq!(record.expected.as_deref(), Some("jour"));
}

#[test]
fn room_order_distance_from_learning_rank() {
    let (mut sm, timer) = machine();
    sm.start("S01", TaskMode::Recall).unwrap();
    let fourth = sm.session().unwrap().learning_room_order[3].clone();
    let index = index_of(&sm, &format!("step4_{fourth}"));

    sm.jump(index).unwrap();
    timer.advance_ms(1_000);
    let events = sm.respond("4");
    let record = finalized(&events)[0];
    assert_eq!(record.is_correct, Some(true));
    assert_eq!(record.error_distance, Some(0));

    sm.jump(index).unwrap();
    timer.advance_ms(1_000);
    let events = sm.respond("7");
    let record = finalized(&events)[0];
    assert_eq!(record.is_correct, Some(false));
    assert_eq!(record.error_distance, Some(3));
    assert_eq!(record.response_category, ResponseCategory::WrongOrder);
}

#[test]
fn silence_until_deadline_records_no_response() {
    let (mut sm, timer) = machine();
    sm.start("S01", TaskMode::Recall).unwrap();
    timer.advance_ms(9_999);
    assert!(sm.tick().is_empty());

    timer.advance_ms(1);
    let events = sm.tick();
    let record = finalized(&events)[0];
    assert_eq!(record.response, Response::NoResponse);
    assert_eq!(record.response.token(), "ne_repond_pas");
    assert_eq!(record.response_category, ResponseCategory::NoResponse);
    assert!(record.timeout);
    assert_eq!(record.is_correct, Some(false));
    assert_eq!(record.response_duration_ms, 10_000);
    assert_eq!(sm.state(), SessionState::Intermission);
}

#[test]
fn response_at_deadline_is_a_timeout() {
    let (mut sm, timer) = machine_with(single_object_catalog(true), ExperimentConfig::default());
    sm.start("S01", TaskMode::Recall).unwrap();
    let len = sm.queue().len();
    timer.advance_ms(10_000);

    let events = sm.respond("yes");
    let record = finalized(&events)[0];
    assert!(record.timeout);
    assert_eq!(record.response, Response::NoResponse);
    assert_eq!(sm.queue().len(), len);

    // the tick that would have fired finds nothing to finalize
    assert!(finalized(&sm.tick()).is_empty());
    assert_eq!(sm.records().len(), 1);
}

#[test]
fn intermission_lasts_three_seconds() {
    let (mut sm, timer) = machine();
    sm.start("S01", TaskMode::Recall).unwrap();
    sm.respond("no");
    timer.advance_ms(2_950);
    assert!(sm.tick().is_empty());
    timer.advance_ms(50);
    assert!(matches!(
        sm.tick().as_slice(),
        [SessionEvent::TaskActivated { index: 1, .. }]
    ));
}

fn with_scene_pools() -> Catalog {
    let mut catalog = sample_catalog();
    catalog.late_recall_trials = scenes("late", 12);
    catalog.immediate_recall_trials = scenes("ri", 12);
    catalog
}

#[test]
fn full_run_scores_match_records() {
    let (mut sm, timer) = machine_with(with_scene_pools(), ExperimentConfig::default());
    let mut events = sm.start("S01", TaskMode::Recall).unwrap();
    let mut follow_up_batches = 0;
    let mut guard = 0;

    while sm.state() != SessionState::Ended {
        guard += 1;
        assert!(guard < 100_000, "session never ended");

        // one task active xor intermission
        match sm.state() {
            SessionState::TaskActive => {
                assert!(sm.active_index().is_some() && !sm.in_intermission())
            }
            SessionState::Intermission => {
                assert!(sm.active_index().is_none() && sm.in_intermission())
            }
            other => panic!("unexpected state {other:?}"),
        }

        for event in std::mem::take(&mut events) {
            match event {
                SessionEvent::TaskActivated {
                    index,
                    presentation,
                } => {
                    timer.advance_ms(150);
                    if index % 6 == 5 {
                        timer.advance_ms(20_000);
                        events.extend(sm.tick());
                    } else if index % 7 == 3 {
                        events.extend(sm.respond("je_ne_sais_pas"));
                    } else {
                        let choice = &presentation.choices[index % presentation.choices.len()];
                        events.extend(sm.respond(&choice.id));
                    }
                }
                SessionEvent::FollowUpsInserted { after } => {
                    follow_up_batches += 1;
                    assert_eq!(sm.queue().get(after + 1).unwrap().stage, Stage::IIA);
                    assert_eq!(sm.queue().get(after + 2).unwrap().stage, Stage::IIB);
                }
                _ => {}
            }
        }
        if events.is_empty() && sm.state() != SessionState::Ended {
            timer.advance_ms(50);
            events.extend(sm.tick());
        }
    }

    assert!(follow_up_batches > 0);
    assert_eq!(sm.queue().len(), 40 + 10 + 10 + 2 * follow_up_batches);
    assert_eq!(sm.records().len(), sm.queue().len());

    for stage in Stage::ALL {
        let scored: Vec<_> = sm
            .records()
            .iter()
            .filter(|r| r.stage == stage && r.is_correct.is_some())
            .collect();
        let score = sm.scoreboard().stage(stage);
        assert_eq!(score.total as usize, scored.len(), "{stage}");
        assert_eq!(
            score.correct as usize,
            scored.iter().filter(|r| r.is_correct == Some(true)).count(),
            "{stage}"
        );
    }

    let log = sm.seal(Vec::new()).unwrap();
    assert_eq!(log.session.scores[&Stage::I].total, 20);
    assert!(log.session.ended_at.is_some());
    assert_eq!(log.tasks.len(), sm.records().len());
}

#[test]
fn jump_skips_intermission() {
    let (mut sm, timer) = machine();
    sm.start("S01", TaskMode::Recall).unwrap();
    timer.advance_ms(500);

    let events = sm.jump(5).unwrap();
    let record = finalized(&events)[0];
    assert!(record.timeout);
    assert_eq!(record.actual_elapsed_ms, 500);
    assert!(matches!(
        events.last(),
        Some(SessionEvent::TaskActivated { index: 5, .. })
    ));
    assert_eq!(sm.cursor(), Some(5));
    assert_eq!(sm.state(), SessionState::TaskActive);
    assert!(!sm.in_intermission());

    let len = sm.queue().len();
    assert_eq!(
        sm.jump(len).unwrap_err(),
        SessionError::InvalidJump { index: len, len }
    );
}

#[test]
fn jump_from_intermission_records_nothing_extra() {
    let (mut sm, _) = machine();
    sm.start("S01", TaskMode::Recall).unwrap();
    sm.respond("no");
    let events = sm.jump(3).unwrap();
    assert!(finalized(&events).is_empty());
    assert_eq!(sm.records().len(), 1);
    assert_eq!(sm.active_index(), Some(3));
}

#[test]
fn stop_during_intermission_produces_single_record() {
    let (mut sm, _) = machine();
    sm.start("S01", TaskMode::Recall).unwrap();
    sm.respond("no");
    let events = sm.stop();
    assert_eq!(
        events,
        vec![SessionEvent::SessionEnded {
            reason: EndReason::OperatorStop
        }]
    );
    assert_eq!(sm.records().len(), 1);
    assert_eq!(sm.state(), SessionState::Ended);
}

#[test]
fn stop_mid_task_finalizes_as_timeout() {
    let (mut sm, timer) = machine();
    sm.start("S01", TaskMode::Recall).unwrap();
    timer.advance_ms(300);
    let events = sm.stop();
    assert!(finalized(&events)[0].timeout);
    assert!(matches!(
        events.last(),
        Some(SessionEvent::SessionEnded {
            reason: EndReason::OperatorStop
        })
    ));
    assert!(sm.respond("yes").is_empty());
}

#[test]
fn queue_exhaustion_ends_session() {
    let mut catalog = with_scene_pools();
    catalog.late_recall_trials.clear();
    let (mut sm, timer) = machine_with(catalog, ExperimentConfig::default());
    sm.start("S01", TaskMode::RappelImmediat).unwrap();
    assert_eq!(sm.queue().len(), 10);
    assert!(sm.queue().iter().all(|t| t.stage == Stage::RI));

    let last = sm.queue().len() - 1;
    sm.jump(last).unwrap();
    sm.respond("correct");
    timer.advance_ms(3_000);
    assert_eq!(
        sm.tick(),
        vec![SessionEvent::SessionEnded {
            reason: EndReason::QueueExhausted
        }]
    );
}

#[test]
fn restart_after_end_gets_fresh_session() {
    let (mut sm, _) = machine();
    sm.start("S01", TaskMode::Recall).unwrap();
    let first = sm.session().unwrap().session_id.clone();
    sm.respond("no");
    sm.stop();
    sm.start("S02", TaskMode::Recall).unwrap();
    let session = sm.session().unwrap();
    assert_ne!(session.session_id, first);
    assert_eq!(session.subject_id, "S02");
    assert!(sm.records().is_empty());
}

fn stage_one_order(config: ExperimentConfig) -> Vec<String> {
    let (mut sm, _) = machine_with(sample_catalog(), config);
    sm.start("S01", TaskMode::Recall).unwrap();
    sm.queue()
        .iter()
        .filter(|t| t.stage == Stage::I)
        .map(|t| t.task_id.clone())
        .collect()
}

#[test]
fn fixed_seed_repeats_across_sessions() {
    let config = ExperimentConfig::default();
    assert_eq!(stage_one_order(config.clone()), stage_one_order(config));
}

#[test]
fn per_session_randomization_differs_across_sessions() {
    let config = ExperimentConfig {
        randomization: RandomMode::PerSession,
        ..ExperimentConfig::default()
    };
    assert_ne!(stage_one_order(config.clone()), stage_one_order(config));
}

#[test]
fn presentation_offers_dont_know_and_placeholder_images() {
    let (mut sm, _) = machine();
    let events = sm.start("S01", TaskMode::Recall).unwrap();
    let SessionEvent::TaskActivated { presentation, .. } = &events[0] else {
        panic!("expected activation, got {events:?}");
    };
    assert!(presentation.allows_dont_know);
    assert_eq!(presentation.prompt, "Avez-vous vu cet objet ?");
    assert!(presentation.image.contains("Default_Object_"));
    let ids: Vec<_> = presentation.choices.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, ["yes", "no"]);
    assert!(matches!(
        sm.queue().get(0).unwrap().payload,
        TaskPayload::ObjectRecognition { .. }
    ));
}
