use std::sync::Arc;

use interview_core::model::{Difficulty, QuestionId, SessionStatus, ViewTab};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use super::orchestrator::{Completion, InterviewOrchestrator, ScoredAnswer, SubmitOutcome};
use crate::error::OrchestratorError;
use crate::timer::TimerEvents;

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 256;

/// Commands a front end sends to a running interview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Draft(String),
    Submit(String),
    Pause,
    Resume,
    SwitchView(ViewTab),
    /// Retry completion of a session whose questions are all answered.
    Finish,
    Shutdown,
}

/// Notifications emitted by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    QuestionStarted {
        index: usize,
        total: usize,
        question_id: QuestionId,
        text: String,
        difficulty: Difficulty,
        time_limit_secs: u32,
    },
    AnswerScored(ScoredAnswer),
    Completed(Completion),
    Paused,
    Resumed,
    /// A command failed; nothing changed.
    Rejected { reason: String },
    ViewChanged(ViewTab),
}

/// Front-end side of a `SessionDriver`.
#[derive(Clone)]
pub struct DriverHandle {
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
}

impl DriverHandle {
    /// Queue a command. Returns false once the driver has stopped.
    pub async fn send(&self, command: SessionCommand) -> bool {
        self.commands.send(command).await.is_ok()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// Message loop that feeds commands and timer expiries into the orchestrator.
///
/// Submissions run on their own tasks so pause and draft updates are still
/// handled while an answer is being scored.
pub struct SessionDriver {
    orchestrator: Arc<InterviewOrchestrator>,
    timer_events: TimerEvents,
    commands: mpsc::Receiver<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionDriver {
    #[must_use]
    pub fn new(
        orchestrator: Arc<InterviewOrchestrator>,
        timer_events: TimerEvents,
    ) -> (Self, DriverHandle) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let handle = DriverHandle {
            commands: commands_tx,
            events: events.clone(),
        };
        let driver = Self {
            orchestrator,
            timer_events,
            commands,
            events,
        };
        (driver, handle)
    }

    /// Run until `Shutdown` is received or every handle is dropped.
    ///
    /// Announces the current question first if a session is active.
    pub async fn run(mut self) {
        announce_question(&self.orchestrator, &self.events);
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    None | Some(SessionCommand::Shutdown) => break,
                    Some(command) => self.handle(command).await,
                },
                Some(expired) = self.timer_events.recv() => {
                    let orchestrator = Arc::clone(&self.orchestrator);
                    let events = self.events.clone();
                    tokio::spawn(async move {
                        let outcome = orchestrator.handle_timer_expired(expired).await;
                        report_submission(&orchestrator, &events, outcome);
                    });
                }
            }
        }
        debug!("session driver stopped");
    }

    async fn handle(&self, command: SessionCommand) {
        match command {
            SessionCommand::Draft(text) => {
                if let Err(err) = self.orchestrator.update_draft(text).await {
                    self.reject(&err);
                }
            }
            SessionCommand::Submit(text) => {
                let orchestrator = Arc::clone(&self.orchestrator);
                let events = self.events.clone();
                tokio::spawn(async move {
                    let outcome = orchestrator.submit_answer(text).await;
                    report_submission(&orchestrator, &events, outcome);
                });
            }
            SessionCommand::Pause => match self.orchestrator.pause().await {
                Ok(_) => self.emit(SessionEvent::Paused),
                Err(err) => self.reject(&err),
            },
            SessionCommand::Resume => match self.orchestrator.resume().await {
                Ok(completion) => {
                    self.emit(SessionEvent::Resumed);
                    match completion {
                        Some(completion) => self.emit(SessionEvent::Completed(completion)),
                        None => announce_question(&self.orchestrator, &self.events),
                    }
                }
                Err(err) => self.reject(&err),
            },
            SessionCommand::SwitchView(tab) => match self.orchestrator.switch_view(tab).await {
                Ok(prefs) => self.emit(SessionEvent::ViewChanged(prefs.active_tab)),
                Err(err) => self.reject(&err),
            },
            SessionCommand::Finish => match self.orchestrator.complete_pending().await {
                Ok(Some(completion)) => self.emit(SessionEvent::Completed(completion)),
                Ok(None) => debug!("nothing pending completion"),
                Err(err) => self.reject(&err),
            },
            SessionCommand::Shutdown => {}
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn reject(&self, err: &OrchestratorError) {
        reject(&self.events, err);
    }
}

fn reject(events: &broadcast::Sender<SessionEvent>, err: &OrchestratorError) {
    warn!(error = %err, "session command rejected");
    let _ = events.send(SessionEvent::Rejected {
        reason: err.to_string(),
    });
}

fn announce_question(orchestrator: &InterviewOrchestrator, events: &broadcast::Sender<SessionEvent>) {
    let current = orchestrator.current();
    if current.status() != Some(SessionStatus::Active) {
        return;
    }
    let (Some(question), Some(progress)) = (current.current_question(), current.progress()) else {
        return;
    };
    let _ = events.send(SessionEvent::QuestionStarted {
        index: progress.answered,
        total: progress.total,
        question_id: question.id().clone(),
        text: question.text().to_owned(),
        difficulty: question.difficulty(),
        time_limit_secs: question.time_limit_secs(),
    });
}

fn report_submission(
    orchestrator: &InterviewOrchestrator,
    events: &broadcast::Sender<SessionEvent>,
    outcome: Result<SubmitOutcome, OrchestratorError>,
) {
    match outcome {
        Ok(SubmitOutcome::Advanced(answer)) => {
            let _ = events.send(SessionEvent::AnswerScored(answer));
            announce_question(orchestrator, events);
        }
        Ok(SubmitOutcome::Completed(answer, completion)) => {
            let _ = events.send(SessionEvent::AnswerScored(answer));
            let _ = events.send(SessionEvent::Completed(completion));
        }
        Ok(SubmitOutcome::PendingCompletion(answer)) => {
            let _ = events.send(SessionEvent::AnswerScored(answer));
        }
        Ok(SubmitOutcome::Discarded) => debug!("submission discarded"),
        Err(err) => reject(events, &err),
    }
}
