use interview_core::model::{
    CandidateId, Question, QuestionId, Session, SessionId, SessionStateError, SessionStatus,
    UiPreferences, ViewTab,
};
use std::sync::Arc;
use storage::repository::{
    CandidateRepository, SessionRepository, Storage, UiPreferencesRepository,
};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use super::current::CurrentSession;
use crate::Clock;
use crate::error::OrchestratorError;
use crate::scoring::{AnswerScore, ScoreRequest, ScoringService, SummaryItem};
use crate::timer::{QuestionTimer, TimerEvents, TimerExpired};

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// An answer that was scored and recorded on the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredAnswer {
    pub index: usize,
    pub question_id: QuestionId,
    pub answer: String,
    pub score: u8,
    pub feedback: String,
    /// True when the countdown expired and the draft was submitted for the candidate.
    pub forced: bool,
}

/// Final result of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub session_id: SessionId,
    pub total_score: u32,
    pub max_score: u32,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Answer recorded; the next question's countdown is running.
    Advanced(ScoredAnswer),
    /// Last answer recorded and the session completed.
    Completed(ScoredAnswer, Completion),
    /// Last answer recorded, but the session was paused before the summary
    /// landed. Completion runs again on resume.
    PendingCompletion(ScoredAnswer),
    /// The session moved on while scoring (paused, resumed or replaced);
    /// nothing was recorded.
    Discarded,
}

//
// ─── ORCHESTRATOR ──────────────────────────────────────────────────────────────
//

enum Submission {
    Manual(String),
    Expired(TimerExpired),
}

#[derive(Debug, Default)]
struct CycleState {
    draft: String,
    /// Bumped whenever the session is paused, resumed or replaced; scoring
    /// results from an older epoch are dropped.
    epoch: u64,
    in_flight: bool,
}

impl CycleState {
    fn interrupt(&mut self) {
        self.epoch += 1;
        self.in_flight = false;
    }
}

/// Drives the per-question cycle: countdown, submission, scoring, advance,
/// and completion.
///
/// Transitions are serialized through an internal lock that is never held
/// across scorer calls. Every transition is persisted before it becomes
/// visible through `CurrentSession`.
pub struct InterviewOrchestrator {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    candidates: Arc<dyn CandidateRepository>,
    preferences: Arc<dyn UiPreferencesRepository>,
    scoring: ScoringService,
    timer: QuestionTimer,
    current: CurrentSession,
    cycle: Mutex<CycleState>,
}

impl InterviewOrchestrator {
    #[must_use]
    pub fn new(clock: Clock, storage: &Storage, scoring: ScoringService) -> (Self, TimerEvents) {
        let (timer, events) = QuestionTimer::new();
        let orchestrator = Self {
            clock,
            sessions: Arc::clone(&storage.sessions),
            candidates: Arc::clone(&storage.candidates),
            preferences: Arc::clone(&storage.preferences),
            scoring,
            timer,
            current: CurrentSession::default(),
            cycle: Mutex::new(CycleState::default()),
        };
        (orchestrator, events)
    }

    /// Read handle on the current session.
    #[must_use]
    pub fn current(&self) -> CurrentSession {
        self.current.clone()
    }

    /// Remaining seconds of the running countdown, for display.
    #[must_use]
    pub fn remaining_seconds(&self) -> watch::Receiver<u32> {
        self.timer.subscribe()
    }

    #[must_use]
    pub fn scoring(&self) -> &ScoringService {
        &self.scoring
    }

    /// Load the most recent active or paused session from storage.
    ///
    /// An active session restarts its current question with a full countdown;
    /// a paused one waits for `resume`. An active session whose questions are
    /// all answered is completed right away.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError::Storage` if the store cannot be read.
    pub async fn restore(&self) -> Result<Option<Session>, OrchestratorError> {
        {
            let mut cycle = self.cycle.lock().await;
            if self.current.is_resumable() {
                return Ok(self.current.snapshot());
            }
            let Some(session) = self.sessions.latest_resumable().await? else {
                debug!("no resumable interview session");
                return Ok(None);
            };

            cycle.interrupt();
            cycle.draft.clear();
            info!(
                session_id = %session.id(),
                status = %session.status(),
                question_index = session.current_index(),
                "restored interview session"
            );

            let needs_completion =
                session.status() == SessionStatus::Active && session.all_answered();
            if session.status() == SessionStatus::Active {
                self.start_countdown(session.current_question());
            }
            self.current.replace(Some(session));
            if !needs_completion {
                return Ok(self.current.snapshot());
            }
        }

        self.finalize().await?;
        Ok(self.current.snapshot())
    }

    /// Create a session for `candidate_id` and start its first countdown.
    ///
    /// # Errors
    ///
    /// - `SessionInProgress` while another session is active or paused, in
    ///   memory or in the store
    /// - `ProfileIncomplete` if the candidate cannot start an interview
    /// - `Storage` if the candidate is unknown or the session cannot be saved
    pub async fn start_interview(
        &self,
        candidate_id: CandidateId,
    ) -> Result<Session, OrchestratorError> {
        let ticket = {
            let mut cycle = self.cycle.lock().await;
            if cycle.in_flight || self.current.is_resumable() {
                return Err(OrchestratorError::SessionInProgress);
            }
            // A session left unfinished by an earlier run still owns the slot.
            if let Some(stored) = self.sessions.latest_resumable().await? {
                debug!(session_id = %stored.id(), "stored session blocks a new interview");
                return Err(OrchestratorError::SessionInProgress);
            }
            let candidate = self.candidates.get_candidate(candidate_id).await?;
            if !candidate.can_start_interview() {
                return Err(OrchestratorError::ProfileIncomplete);
            }
            cycle.in_flight = true;
            cycle.epoch
        };

        let drafts = self.scoring.questions().await;

        let mut cycle = self.cycle.lock().await;
        if cycle.epoch != ticket {
            return Err(OrchestratorError::SessionInProgress);
        }
        cycle.in_flight = false;

        let session = Session::from_drafts(
            SessionId::generate(),
            candidate_id,
            drafts,
            self.clock.now(),
        )?;
        self.sessions.save_session(&session).await?;

        cycle.interrupt();
        cycle.draft.clear();
        self.start_countdown(session.current_question());
        self.current.replace(Some(session.clone()));
        info!(
            session_id = %session.id(),
            candidate_id = %candidate_id,
            questions = session.questions().len(),
            "interview started"
        );
        Ok(session)
    }

    /// Record what the candidate has typed so far for the current question.
    ///
    /// # Errors
    ///
    /// Returns `NoSession` or `Session(NotActive)` unless a session is active.
    pub async fn update_draft(&self, text: impl Into<String>) -> Result<(), OrchestratorError> {
        let mut cycle = self.cycle.lock().await;
        self.active_session()?;
        cycle.draft = text.into();
        Ok(())
    }

    /// Current draft text.
    pub async fn draft(&self) -> String {
        self.cycle.lock().await.draft.clone()
    }

    /// Submit the candidate's answer for the current question.
    ///
    /// # Errors
    ///
    /// - `EmptyAnswer` for blank text
    /// - `SubmissionInFlight` while a previous answer is being scored
    /// - `NoSession` / `Session(..)` when no question is open for answers
    /// - `Storage` if the answered session cannot be saved; the question's
    ///   countdown restarts so the candidate can retry
    pub async fn submit_answer(
        &self,
        text: impl Into<String>,
    ) -> Result<SubmitOutcome, OrchestratorError> {
        self.submit(Submission::Manual(text.into())).await
    }

    /// Submit the current draft because the countdown ran out.
    ///
    /// Stale events (for a countdown that was cancelled or replaced) are
    /// ignored and yield `SubmitOutcome::Discarded`.
    ///
    /// # Errors
    ///
    /// Same as `submit_answer`, except that blank drafts are accepted.
    pub async fn handle_timer_expired(
        &self,
        event: TimerExpired,
    ) -> Result<SubmitOutcome, OrchestratorError> {
        self.submit(Submission::Expired(event)).await
    }

    async fn submit(&self, submission: Submission) -> Result<SubmitOutcome, OrchestratorError> {
        let forced = matches!(submission, Submission::Expired(_));
        let (ticket, index, question_id, request) = {
            let mut cycle = self.cycle.lock().await;
            // Checked under the cycle lock so a manual submit cannot slip in
            // between the check and the forced submission.
            if let Submission::Expired(event) = submission {
                if !self.timer.is_current(event) {
                    debug!(generation = event.generation, "ignoring stale timer expiry");
                    return Ok(SubmitOutcome::Discarded);
                }
            }
            let session = self.active_session()?;
            if cycle.in_flight {
                return if forced {
                    Ok(SubmitOutcome::Discarded)
                } else {
                    Err(OrchestratorError::SubmissionInFlight)
                };
            }
            let question = session
                .current_question()
                .ok_or(SessionStateError::NoCurrentQuestion)?;
            let answer = match submission {
                Submission::Manual(text) => {
                    let trimmed = text.trim();
                    if trimmed.is_empty() {
                        return Err(OrchestratorError::EmptyAnswer);
                    }
                    trimmed.to_owned()
                }
                Submission::Expired(_) => cycle.draft.trim().to_owned(),
            };

            self.timer.cancel();
            cycle.in_flight = true;
            (
                cycle.epoch,
                session.current_index(),
                question.id().clone(),
                ScoreRequest {
                    question: question.text().to_owned(),
                    answer,
                    difficulty: question.difficulty(),
                },
            )
        };

        debug!(question_index = index, forced, "scoring answer");
        let scored = self.scoring.score(&request).await;

        let answered = {
            let mut cycle = self.cycle.lock().await;
            if cycle.epoch != ticket {
                info!(question_index = index, "session changed while scoring; result discarded");
                return Ok(SubmitOutcome::Discarded);
            }
            cycle.in_flight = false;
            let Some(mut session) = self.current.snapshot() else {
                return Ok(SubmitOutcome::Discarded);
            };
            if session.current_index() != index {
                return Ok(SubmitOutcome::Discarded);
            }

            if let Err(err) = self
                .record_answer(&mut session, &question_id, &request.answer, &scored)
                .await
            {
                warn!(question_index = index, error = %err, "failed to record answer");
                self.start_countdown(self.current.current_question().as_ref());
                return Err(err);
            }

            cycle.draft.clear();
            info!(
                session_id = %session.id(),
                question_index = index,
                score = scored.score,
                forced,
                "answer recorded"
            );
            let answered = ScoredAnswer {
                index,
                question_id,
                answer: request.answer,
                score: scored.score,
                feedback: scored.feedback,
                forced,
            };

            let finished = session.all_answered();
            if !finished {
                self.start_countdown(session.current_question());
            }
            self.current.replace(Some(session));
            if !finished {
                return Ok(SubmitOutcome::Advanced(answered));
            }
            answered
        };

        Ok(match self.finalize().await? {
            Some(completion) => SubmitOutcome::Completed(answered, completion),
            None => SubmitOutcome::PendingCompletion(answered),
        })
    }

    /// Retry completion of an active session whose questions are all answered.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError` if the completed session cannot be saved.
    pub async fn complete_pending(&self) -> Result<Option<Completion>, OrchestratorError> {
        self.finalize().await
    }

    /// Pause the active session and stop its countdown.
    ///
    /// An answer being scored at this moment is discarded when its score
    /// arrives.
    ///
    /// # Errors
    ///
    /// Returns `NoSession`, `Session(..)` unless active, or `Storage`.
    pub async fn pause(&self) -> Result<Session, OrchestratorError> {
        let mut cycle = self.cycle.lock().await;
        let mut session = self.current.snapshot().ok_or(OrchestratorError::NoSession)?;
        session.pause()?;
        self.sessions.save_session(&session).await?;

        self.timer.cancel();
        cycle.interrupt();
        self.current.replace(Some(session.clone()));
        info!(
            session_id = %session.id(),
            question_index = session.current_index(),
            "interview paused"
        );
        Ok(session)
    }

    /// Resume a paused session with a full countdown for the current question.
    ///
    /// Returns the completion when every question was already answered.
    ///
    /// # Errors
    ///
    /// Returns `NoSession`, `Session(..)` unless paused, or `Storage`.
    pub async fn resume(&self) -> Result<Option<Completion>, OrchestratorError> {
        {
            let mut cycle = self.cycle.lock().await;
            let mut session = self.current.snapshot().ok_or(OrchestratorError::NoSession)?;
            session.resume()?;
            self.sessions.save_session(&session).await?;

            cycle.interrupt();
            self.start_countdown(session.current_question());
            let finished = session.all_answered();
            info!(
                session_id = %session.id(),
                question_index = session.current_index(),
                "interview resumed"
            );
            self.current.replace(Some(session));
            if !finished {
                return Ok(None);
            }
        }
        self.finalize().await
    }

    /// Persist the selected top-level view.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if preferences cannot be loaded or saved.
    pub async fn switch_view(&self, tab: ViewTab) -> Result<UiPreferences, OrchestratorError> {
        let mut prefs = self.preferences.load_preferences().await?;
        prefs.active_tab = tab;
        self.preferences.save_preferences(&prefs).await?;
        debug!(tab = %tab, "view switched");
        Ok(prefs)
    }

    /// # Errors
    ///
    /// Returns `Storage` if preferences cannot be loaded.
    pub async fn preferences(&self) -> Result<UiPreferences, OrchestratorError> {
        Ok(self.preferences.load_preferences().await?)
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    fn active_session(&self) -> Result<Session, OrchestratorError> {
        let session = self.current.snapshot().ok_or(OrchestratorError::NoSession)?;
        match session.status() {
            SessionStatus::Active => Ok(session),
            SessionStatus::Completed => Err(SessionStateError::Completed.into()),
            status @ SessionStatus::Paused => Err(SessionStateError::NotActive { status }.into()),
        }
    }

    fn start_countdown(&self, question: Option<&Question>) {
        match question {
            Some(q) => {
                self.timer.start(q.time_limit_secs());
            }
            None => self.timer.cancel(),
        }
    }

    async fn record_answer(
        &self,
        session: &mut Session,
        question_id: &QuestionId,
        answer: &str,
        scored: &AnswerScore,
    ) -> Result<(), OrchestratorError> {
        session.submit_answer(
            question_id,
            answer,
            Some(scored.score),
            Some(scored.feedback.clone()),
            self.clock.now(),
        )?;
        session.advance()?;
        self.sessions.save_session(session).await?;
        Ok(())
    }

    async fn finalize(&self) -> Result<Option<Completion>, OrchestratorError> {
        let (ticket, items, total) = {
            let mut cycle = self.cycle.lock().await;
            let Some(session) = self.current.snapshot() else {
                return Ok(None);
            };
            if session.status() != SessionStatus::Active
                || !session.all_answered()
                || cycle.in_flight
            {
                return Ok(None);
            }
            self.timer.cancel();
            cycle.in_flight = true;
            (cycle.epoch, summary_items(&session), session.computed_total())
        };

        let summary = self.scoring.summarize(&items, total).await;

        let mut cycle = self.cycle.lock().await;
        if cycle.epoch != ticket {
            info!("session changed while summarizing; completion deferred");
            return Ok(None);
        }
        cycle.in_flight = false;
        let Some(mut session) = self.current.snapshot() else {
            return Ok(None);
        };
        session.complete(total, summary.clone(), self.clock.now())?;
        self.sessions.save_session(&session).await?;
        self.current.replace(Some(session.clone()));

        info!(
            session_id = %session.id(),
            total_score = total,
            "interview completed"
        );
        self.record_candidate_result(&session).await;

        Ok(Some(Completion {
            session_id: session.id(),
            total_score: total,
            max_score: session.max_score(),
            summary,
        }))
    }

    async fn record_candidate_result(&self, session: &Session) {
        let (Some(total), Some(summary)) = (session.total_score(), session.summary()) else {
            return;
        };
        let result = async {
            let mut candidate = self.candidates.get_candidate(session.candidate_id()).await?;
            candidate.record_result(total, summary);
            self.candidates.upsert_candidate(&candidate).await
        }
        .await;
        if let Err(err) = result {
            warn!(
                candidate_id = %session.candidate_id(),
                error = %err,
                "failed to record interview result on candidate"
            );
        }
    }
}

fn summary_items(session: &Session) -> Vec<SummaryItem> {
    session
        .questions()
        .iter()
        .map(|q| SummaryItem {
            question: q.text().to_owned(),
            answer: q.answer().map(|a| a.text.clone()).unwrap_or_default(),
            score: q.score().unwrap_or(0),
        })
        .collect()
}
