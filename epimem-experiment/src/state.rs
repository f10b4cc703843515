use crate::builder::TrialBuilder;
use crate::config::ExperimentConfig;
use crate::evaluate::evaluate;
use crate::metrics::Scoreboard;
use crate::queue::TaskQueue;
use crate::session_log::{SessionInfo, SessionLog};
use chrono::{DateTime, Utc};
use epimem_core::{
    Catalog, PlaceholderImages, Presentation, Response, ResponseRecord, TaskMode, TaskPayload,
    TelemetryMessage,
};
use epimem_timing::Timer;
use rand::Rng;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    TaskActive,
    Intermission,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    QueueExhausted,
    OperatorStop,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TaskActivated {
        index: usize,
        presentation: Box<Presentation>,
    },
    TaskFinalized {
        index: usize,
        record: Box<ResponseRecord>,
    },
    /// Two follow-ups now sit at `after + 1` and `after + 2`
    FollowUpsInserted { after: usize },
    IntermissionStarted { after: usize },
    SessionEnded { reason: EndReason },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a subject id is required to start a session")]
    MissingSubject,
    #[error("a session is already running")]
    AlreadyRunning,
    #[error("the task queue for this mode is empty")]
    EmptyQueue,
    #[error("no session is running")]
    NotRunning,
    #[error("task index {index} is out of range (queue has {len} tasks)")]
    InvalidJump { index: usize, len: usize },
}

#[derive(Debug, Clone)]
struct ActiveTask {
    index: usize,
    started_ns: u64,
    started_at: DateTime<Utc>,
}

/// Drives one session at a time through its task queue.
///
/// All interval arithmetic goes through `T`; wall-clock stamps are only
/// copied into records. The driver calls [`tick`](Self::tick) on a fixed
/// interval and forwards operator input as it arrives.
pub struct SessionStateMachine<T, R>
where
    T: Timer,
    R: Rng,
{
    pub config: ExperimentConfig,
    pub timer: T,
    /// Shuffles follow-up choices; the queue itself is seeded separately
    pub rng: R,
    catalog: Catalog,
    state: SessionState,
    session: Option<SessionInfo>,
    queue: TaskQueue,
    cursor: Option<usize>,
    active: Option<ActiveTask>,
    intermission_started: Option<u64>,
    expanded: HashSet<String>,
    scoreboard: Scoreboard,
    records: Vec<ResponseRecord>,
    images: PlaceholderImages,
    last_tick: Option<u64>,
    sealed: bool,
}

impl<T, R> SessionStateMachine<T, R>
where
    T: Timer,
    R: Rng,
{
    pub fn new(catalog: Catalog, config: ExperimentConfig, timer: T, rng: R) -> Self {
        let images = PlaceholderImages::new(config.asset_dir.clone());
        Self {
            config,
            timer,
            rng,
            catalog,
            state: SessionState::Idle,
            session: None,
            queue: TaskQueue::default(),
            cursor: None,
            active: None,
            intermission_started: None,
            expanded: HashSet::new(),
            scoreboard: Scoreboard::new(),
            records: Vec::new(),
            images,
            last_tick: None,
            sealed: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.state,
            SessionState::TaskActive | SessionState::Intermission
        )
    }

    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active.as_ref().map(|a| a.index)
    }

    pub fn in_intermission(&self) -> bool {
        self.intermission_started.is_some()
    }

    pub fn records(&self) -> &[ResponseRecord] {
        &self.records
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn start(
        &mut self,
        subject_id: &str,
        mode: TaskMode,
    ) -> Result<Vec<SessionEvent>, SessionError> {
        if self.is_running() {
            return Err(SessionError::AlreadyRunning);
        }
        let subject_id = subject_id.trim();
        if subject_id.is_empty() {
            return Err(SessionError::MissingSubject);
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        let experiment_name = self
            .config
            .experiment_name
            .clone()
            .unwrap_or_else(|| self.catalog.experiment_name.clone());
        let seed_key = self
            .config
            .randomization
            .seed_key(&experiment_name, subject_id, &session_id);
        let built = TrialBuilder::new(&self.catalog, &self.config).build(mode, &seed_key);
        if built.tasks.is_empty() {
            return Err(SessionError::EmptyQueue);
        }

        info!(
            "Session {} started for subject '{}' in mode {} with {} tasks",
            session_id,
            subject_id,
            mode,
            built.tasks.len()
        );

        self.queue = TaskQueue::new(built.tasks);
        self.session = Some(SessionInfo {
            session_id,
            subject_id: subject_id.to_string(),
            task_mode: mode,
            experiment_name,
            seed_key,
            started_at: Utc::now(),
            ended_at: None,
            started_mono: Instant::now(),
            learning_room_order: built.learning_order,
            secondary_room_order: built.secondary_order,
        });
        self.cursor = None;
        self.active = None;
        self.intermission_started = None;
        self.expanded.clear();
        self.scoreboard = Scoreboard::new();
        self.records.clear();
        self.images = PlaceholderImages::new(self.config.asset_dir.clone());
        self.last_tick = None;
        self.sealed = false;
        self.state = SessionState::TaskActive;

        let mut events = Vec::new();
        self.advance(&mut events);
        Ok(events)
    }

    /// Periodic timing check; the only place timeouts and intermission ends fire
    pub fn tick(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let now = self.timer.now();
        if let Some(prev) = self.last_tick.replace(now) {
            self.timer
                .record_tick(Duration::from_nanos(now.saturating_sub(prev)));
        }

        match self.state {
            SessionState::TaskActive => {
                let expired = self.active.as_ref().and_then(|active| {
                    let task = self.queue.get(active.index)?;
                    let limit = Duration::from_millis(task.duration_ms);
                    (self.timer.elapsed(active.started_ns) >= limit).then_some(())
                });
                if expired.is_some() {
                    self.time_out(&mut events);
                }
            }
            SessionState::Intermission => {
                let limit = Duration::from_millis(self.config.intermission_ms);
                if let Some(started) = self.intermission_started {
                    if self.timer.elapsed(started) >= limit {
                        self.advance(&mut events);
                    }
                }
            }
            SessionState::Idle | SessionState::Ended => {}
        }
        events
    }

    /// Records `token` for the active task; ignored when nothing is active
    pub fn respond(&mut self, token: &str) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let Some(active) = self.active.as_ref() else {
            debug!("Ignoring response '{}': no active task", token);
            return events;
        };
        let Some(task) = self.queue.get(active.index) else {
            return events;
        };

        let limit = Duration::from_millis(task.duration_ms);
        if self.timer.elapsed(active.started_ns) >= limit {
            debug!(
                "Response '{}' for {} arrived after the deadline",
                token, task.task_id
            );
            self.time_out(&mut events);
        } else if let Some(index) = self.finalize(Response::parse(token), false, &mut events) {
            self.begin_intermission(index, &mut events);
        }
        events
    }

    /// Forces the active task to time out and activates `index` immediately
    pub fn jump(&mut self, index: usize) -> Result<Vec<SessionEvent>, SessionError> {
        if !self.is_running() {
            return Err(SessionError::NotRunning);
        }
        let len = self.queue.len();
        if index >= len {
            return Err(SessionError::InvalidJump { index, len });
        }

        let mut events = Vec::new();
        self.finalize(Response::NoResponse, true, &mut events);
        info!("Operator jump to task {}", index);
        self.cursor = index.checked_sub(1);
        self.advance(&mut events);
        Ok(events)
    }

    /// Ends the session; the active task, if any, is finalized as a timeout
    pub fn stop(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if !self.is_running() {
            return events;
        }
        self.finalize(Response::NoResponse, true, &mut events);
        self.end(EndReason::OperatorStop, &mut events);
        events
    }

    /// Hands out the session log once the session has ended
    pub fn seal(&mut self, messages: Vec<TelemetryMessage>) -> Option<SessionLog> {
        if self.state != SessionState::Ended || self.sealed {
            return None;
        }
        let info = self.session.as_ref()?;
        self.sealed = true;
        Some(SessionLog::assemble(info, &self.scoreboard, self.records.clone(), messages))
    }

    fn advance(&mut self, events: &mut Vec<SessionEvent>) {
        self.intermission_started = None;
        let next = self.cursor.map_or(0, |c| c + 1);
        self.cursor = Some(next);
        if next >= self.queue.len() {
            self.end(EndReason::QueueExhausted, events);
            return;
        }
        self.activate(next, events);
    }

    fn activate(&mut self, index: usize, events: &mut Vec<SessionEvent>) {
        let Some(task) = self.queue.get(index) else {
            return;
        };
        let presentation = Presentation::for_task(index, task, &mut self.images);
        debug!(
            "Task {} activated: {} ({}, stage {})",
            index,
            task.task_id,
            task.kind(),
            task.stage
        );
        self.active = Some(ActiveTask {
            index,
            started_ns: self.timer.now(),
            started_at: Utc::now(),
        });
        self.state = SessionState::TaskActive;
        events.push(SessionEvent::TaskActivated {
            index,
            presentation: Box::new(presentation),
        });
    }

    fn time_out(&mut self, events: &mut Vec<SessionEvent>) {
        if let Some(index) = self.finalize(Response::NoResponse, true, events) {
            self.begin_intermission(index, events);
        }
    }

    /// Records the active task and returns its index. The caller decides
    /// what follows: an intermission, a jump target or the end.
    fn finalize(
        &mut self,
        response: Response,
        timeout: bool,
        events: &mut Vec<SessionEvent>,
    ) -> Option<usize> {
        let active = self.active.take()?;
        let Some(task) = self.queue.get(active.index).cloned() else {
            warn!("Active index {} is outside the queue", active.index);
            return None;
        };

        let actual_elapsed_ms = self.timer.elapsed(active.started_ns).as_millis() as u64;
        let evaluation = evaluate(&task.payload, &response);
        self.scoreboard.record(task.stage, task.kind(), &evaluation);

        let record = ResponseRecord {
            task_id: task.task_id.clone(),
            stage: task.stage,
            payload: task.payload.clone(),
            started_at: active.started_at,
            ended_at: Utc::now(),
            duration_ms: task.duration_ms,
            response_duration_ms: actual_elapsed_ms.min(task.duration_ms),
            actual_elapsed_ms,
            response: response.clone(),
            timeout,
            is_correct: evaluation.correct,
            response_category: evaluation.category,
            expected: evaluation.expected,
            error_distance: evaluation.error_distance,
        };
        debug!(
            "Task {} finalized: response '{}', category {}, correct {:?}",
            task.task_id, record.response, record.response_category, record.is_correct
        );
        self.records.push(record.clone());
        events.push(SessionEvent::TaskFinalized {
            index: active.index,
            record: Box::new(record),
        });

        if let TaskPayload::ObjectRecognition { object } = &task.payload {
            if response.choice() == Some("yes") && self.expanded.insert(task.task_id.clone()) {
                let follow_ups = TrialBuilder::new(&self.catalog, &self.config)
                    .follow_ups(object, &mut self.rng);
                self.queue.insert_after(active.index, follow_ups);
                info!(
                    "Inserted follow-ups for {} after task {} (queue now {} tasks)",
                    object.id,
                    active.index,
                    self.queue.len()
                );
                events.push(SessionEvent::FollowUpsInserted {
                    after: active.index,
                });
            }
        }

        Some(active.index)
    }

    fn begin_intermission(&mut self, after: usize, events: &mut Vec<SessionEvent>) {
        self.state = SessionState::Intermission;
        self.intermission_started = Some(self.timer.now());
        events.push(SessionEvent::IntermissionStarted { after });
    }

    fn end(&mut self, reason: EndReason, events: &mut Vec<SessionEvent>) {
        self.active = None;
        self.intermission_started = None;
        self.state = SessionState::Ended;
        if let Some(info) = self.session.as_mut() {
            info.ended_at = Some(Utc::now());
        }

        let stats = self.timer.tick_stats();
        info!(
            "Session ended ({:?}), {} records; tick avg {:.3} ms, jitter {:.3} ms, {} samples",
            reason,
            self.records.len(),
            stats.average_tick_ns / 1_000_000.0,
            stats.jitter_ns / 1_000_000.0,
            stats.samples
        );
        events.push(SessionEvent::SessionEnded { reason });
    }
}
