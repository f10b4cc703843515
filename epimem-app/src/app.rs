use crate::console::{self, ConsoleCommand, HELP};
use anyhow::Result;
use epimem_core::{Catalog, Presentation, ResponseRecord};
use epimem_experiment::{
    ExperimentConfig, SessionEvent, SessionState, SessionStateMachine, SessionStore,
};
use epimem_telemetry::TelemetryService;
use epimem_timing::{HighPrecisionTimer, Timer};
use rand::Rng;
use rand::rngs::ThreadRng;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

pub struct App {
    machine: SessionStateMachine<HighPrecisionTimer, ThreadRng>,
    telemetry: Option<TelemetryService>,
    store: SessionStore,
}

impl App {
    pub fn new(config: ExperimentConfig, catalog: Catalog) -> Self {
        let store = SessionStore::new(config.sessions_dir.clone());
        let timer = HighPrecisionTimer::new();
        let rng = rand::rng();
        Self {
            machine: SessionStateMachine::new(catalog, config, timer, rng),
            telemetry: None,
            store,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let (tx, mut commands) = mpsc::channel(32);
        let reader = console::spawn_reader(tx);

        let tick_ms = self.machine.config.tick_interval_ms.max(1);
        let mut cadence = tokio::time::interval(Duration::from_millis(tick_ms));
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        println!("=== EPISODIC MEMORY BATTERY ===");
        println!("Platform: {}", std::env::consts::OS);
        println!("Architecture: {}", std::env::consts::ARCH);
        println!("{HELP}\n");

        loop {
            tokio::select! {
                _ = cadence.tick() => {
                    let events = self.machine.tick();
                    self.dispatch(events).await;
                }
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if !self.handle_command(command).await {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                    self.shutdown().await;
                    break;
                }
            }
        }

        reader.abort();
        Ok(())
    }

    /// Returns `false` once the operator asked to quit
    async fn handle_command(&mut self, command: ConsoleCommand) -> bool {
        match command {
            ConsoleCommand::Start { subject, mode } => match self.machine.start(&subject, mode) {
                Ok(events) => {
                    self.start_telemetry().await;
                    self.dispatch(events).await;
                }
                Err(e) => println!("Cannot start: {e}"),
            },
            ConsoleCommand::Respond(token) => {
                let events = self.machine.respond(&token);
                if events.is_empty() {
                    println!("No task is active");
                }
                self.dispatch(events).await;
            }
            ConsoleCommand::Jump(index) => match self.machine.jump(index) {
                Ok(events) => self.dispatch(events).await,
                Err(e) => println!("Cannot jump: {e}"),
            },
            ConsoleCommand::Stop => {
                let events = self.machine.stop();
                self.dispatch(events).await;
            }
            ConsoleCommand::Status => self.print_status(),
            ConsoleCommand::Quit => {
                self.shutdown().await;
                return false;
            }
        }
        true
    }

    async fn shutdown(&mut self) {
        let events = self.machine.stop();
        self.dispatch(events).await;
        if let Some(service) = self.telemetry.take() {
            service.stop(self.stop_timeout()).await;
        }
    }

    async fn start_telemetry(&mut self) {
        let settings = &self.machine.config.telemetry;
        if !settings.enabled || self.telemetry.is_some() {
            return;
        }
        match TelemetryService::bind(&settings.bind_addr).await {
            Ok(service) => self.telemetry = Some(service),
            Err(e) => warn!("Continuing without telemetry: {}", e),
        }
    }

    fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.machine.config.telemetry.stop_timeout_ms)
    }

    async fn dispatch(&mut self, events: Vec<SessionEvent>) {
        for event in events {
            match event {
                SessionEvent::TaskActivated { presentation, .. } => {
                    show_presentation(&presentation, self.machine.queue().len())
                }
                SessionEvent::TaskFinalized { record, .. } => show_outcome(&record),
                SessionEvent::FollowUpsInserted { .. }
                | SessionEvent::IntermissionStarted { .. } => {}
                SessionEvent::SessionEnded { reason } => {
                    println!("Session ended ({reason:?})");
                    let telemetry = self.telemetry.take();
                    let timeout = self.stop_timeout();
                    let saved =
                        finish_session(&mut self.machine, telemetry, &self.store, timeout).await;
                    if let Some(path) = saved {
                        println!("Results saved to {}", path.display());
                    }
                }
            }
        }
    }

    fn print_status(&self) {
        let machine = &self.machine;
        let Some(session) = machine.session() else {
            println!("No session yet");
            return;
        };
        println!(
            "Session {} subject {} ({}): {:?}, task {:?} of {}",
            session.session_id,
            session.subject_id,
            session.task_mode,
            machine.state(),
            machine.cursor(),
            machine.queue().len()
        );
        for (stage, score) in machine.scoreboard().stage_scores() {
            if score.total > 0 {
                println!(
                    "  {:<6} {}/{} ({:.0}%)",
                    stage,
                    score.correct,
                    score.total,
                    score.percent().unwrap_or(0.0)
                );
            }
        }
        if machine.state() == SessionState::Ended {
            println!("  ended at {:?}", session.ended_at);
        }
    }
}

/// Drains and stops telemetry, seals the log, then writes it.
///
/// Failures are logged and never end the app; `None` means nothing was saved.
async fn finish_session<T: Timer, R: Rng>(
    machine: &mut SessionStateMachine<T, R>,
    telemetry: Option<TelemetryService>,
    store: &SessionStore,
    stop_timeout: Duration,
) -> Option<PathBuf> {
    let messages = match telemetry {
        Some(service) => {
            let messages = service.drain().await.unwrap_or_else(|e| {
                warn!("Telemetry drain failed: {}", e);
                Vec::new()
            });
            service.stop(stop_timeout).await;
            messages
        }
        None => Vec::new(),
    };

    let log = machine.seal(messages)?;
    match store.save(&log) {
        Ok(path) => Some(path),
        Err(e) => {
            error!("Session {} was not saved: {}", log.session.session_id, e);
            None
        }
    }
}

fn show_presentation(p: &Presentation, queue_len: usize) {
    let follow_up = if p.stage.is_follow_up() {
        " follow-up"
    } else {
        ""
    };
    println!(
        "\n[{}/{}] {} {} ({}){}",
        p.index + 1,
        queue_len,
        p.stage,
        p.task_id,
        p.kind,
        follow_up
    );
    println!("  {}", p.prompt);
    println!("  image: {}", p.image);
    let choices: Vec<String> = p
        .choices
        .iter()
        .map(|c| format!("{} [{}]", c.label, c.id))
        .collect();
    println!("  choices: {}", choices.join(", "));
}

fn show_outcome(record: &ResponseRecord) {
    let correct = match record.is_correct {
        Some(true) => "correct",
        Some(false) => "incorrect",
        None => "not scored",
    };
    println!(
        "  -> {} in {} ms: {} ({})",
        record.response, record.response_duration_ms, record.response_category, correct
    );
}
