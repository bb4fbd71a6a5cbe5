use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{CandidateId, QuestionId, SessionId};
use crate::model::question::{Answer, MAX_ANSWER_SCORE, Question, QuestionDraft, QuestionError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Rejected state-machine transitions.
///
/// These are contract violations by the caller, not retryable user errors.
/// A rejected transition never modifies the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error("a session needs at least one question")]
    Empty,

    #[error("duplicate question id in session: {0}")]
    DuplicateQuestionId(QuestionId),

    #[error("session is {status}, expected active")]
    NotActive { status: SessionStatus },

    #[error("session is {status}, expected paused")]
    NotPaused { status: SessionStatus },

    #[error("session already completed")]
    Completed,

    #[error("all questions have been answered")]
    NoCurrentQuestion,

    #[error("answer submitted for {got}, but current question is {expected}")]
    QuestionMismatch { expected: QuestionId, got: QuestionId },

    #[error("question {0} has already been answered")]
    AlreadyAnswered(QuestionId),

    #[error("current question has not been answered yet")]
    NotAnswered,

    #[error("{remaining} question(s) still unanswered")]
    QuestionsRemaining { remaining: usize },

    #[error("score {0} is outside 0..=10")]
    ScoreOutOfRange(u8),

    #[error("total score {got} does not match the sum of answer scores ({expected})")]
    TotalScoreMismatch { expected: u32, got: u32 },

    #[error("invalid persisted session: {0}")]
    InvalidPersistedState(String),

    #[error(transparent)]
    Question(#[from] QuestionError),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle state of a session. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Paused,
    Completed,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
        }
    }

    /// Active and paused sessions can be picked up again after a restart.
    #[must_use]
    pub fn is_resumable(self) -> bool {
        matches!(self, SessionStatus::Active | SessionStatus::Paused)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = SessionStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            other => Err(SessionStateError::InvalidPersistedState(format!(
                "unknown status: {other}"
            ))),
        }
    }
}

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

/// Aggregated view of session progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One candidate's interview attempt and the state machine that governs it.
///
/// Invariants, checked on rehydration and preserved by every transition:
/// - `current_index <= questions.len()`
/// - questions before the cursor are answered, questions after it are not
/// - `status == Completed` exactly when the cursor is past the last question
///   and `complete` has been called; `total_score`, `summary` and `ended_at`
///   are set only then
///
/// Between `submit_answer` and `advance` the question under the cursor holds
/// its answer; `advance` is the only transition allowed in that window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    id: SessionId,
    candidate_id: CandidateId,
    questions: Vec<Question>,
    current_index: usize,
    status: SessionStatus,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    total_score: Option<u32>,
    summary: Option<String>,
}

impl Session {
    /// Create an active session positioned at the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::Empty` when `questions` is empty,
    /// `DuplicateQuestionId` when two questions share an id, and
    /// `InvalidPersistedState` if any question already carries an answer.
    pub fn create(
        id: SessionId,
        candidate_id: CandidateId,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionStateError> {
        if questions.is_empty() {
            return Err(SessionStateError::Empty);
        }
        ensure_unique_ids(&questions)?;
        if questions.iter().any(Question::is_answered) {
            return Err(SessionStateError::InvalidPersistedState(
                "new session contains answered questions".into(),
            ));
        }

        Ok(Self {
            id,
            candidate_id,
            questions,
            current_index: 0,
            status: SessionStatus::Active,
            started_at,
            ended_at: None,
            total_score: None,
            summary: None,
        })
    }

    /// Create a session from unvalidated drafts, numbering questions by position.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::Question` for an invalid draft and
    /// `SessionStateError::Empty` when no drafts are given.
    pub fn from_drafts(
        id: SessionId,
        candidate_id: CandidateId,
        drafts: Vec<QuestionDraft>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionStateError> {
        let questions = drafts
            .into_iter()
            .enumerate()
            .map(|(i, draft)| draft.validate(QuestionId::for_position(i)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::create(id, candidate_id, questions, started_at)
    }

    /// Rehydrate a session from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::InvalidPersistedState` (or `Empty`) if the
    /// stored values violate any session invariant.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SessionId,
        candidate_id: CandidateId,
        questions: Vec<Question>,
        current_index: usize,
        status: SessionStatus,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        total_score: Option<u32>,
        summary: Option<String>,
    ) -> Result<Self, SessionStateError> {
        if questions.is_empty() {
            return Err(SessionStateError::Empty);
        }
        ensure_unique_ids(&questions)?;

        let session = Self {
            id,
            candidate_id,
            questions,
            current_index,
            status,
            started_at,
            ended_at,
            total_score,
            summary,
        };
        session.check_invariants()?;
        Ok(session)
    }

    /// Verify every structural invariant of a settled session.
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::InvalidPersistedState` describing the first
    /// violated invariant.
    pub fn check_invariants(&self) -> Result<(), SessionStateError> {
        let invalid = |msg: &str| Err(SessionStateError::InvalidPersistedState(msg.to_owned()));
        let len = self.questions.len();

        if self.current_index > len {
            return invalid("cursor past the end of the question list");
        }
        for (i, q) in self.questions.iter().enumerate() {
            if i < self.current_index && !q.is_answered() {
                return invalid("question before the cursor is unanswered");
            }
            if i >= self.current_index && q.is_answered() {
                return invalid("question at or after the cursor is answered");
            }
            if q.score().is_some_and(|s| s > MAX_ANSWER_SCORE) {
                return invalid("answer score out of range");
            }
        }

        let completed = self.status == SessionStatus::Completed;
        if completed && self.current_index != len {
            return invalid("completed session with unanswered questions");
        }
        if completed != self.total_score.is_some()
            || completed != self.summary.is_some()
            || completed != self.ended_at.is_some()
        {
            return invalid("completion fields disagree with status");
        }
        if let Some(total) = self.total_score {
            if total != self.computed_total() {
                return invalid("total score does not match answer scores");
            }
        }
        if let Some(ended_at) = self.ended_at {
            if ended_at < self.started_at {
                return invalid("ended_at is before started_at");
            }
        }
        Ok(())
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────────
    //

    /// Record the answer for the question under the cursor.
    ///
    /// # Errors
    ///
    /// - `Completed` / `NotActive` when the session is not active
    /// - `NoCurrentQuestion` when every question is answered
    /// - `AlreadyAnswered` when `question_id` was answered before
    /// - `QuestionMismatch` when `question_id` is not the current question
    /// - `ScoreOutOfRange` when `score > 10`
    pub fn submit_answer(
        &mut self,
        question_id: &QuestionId,
        text: impl Into<String>,
        score: Option<u8>,
        feedback: Option<String>,
        answered_at: DateTime<Utc>,
    ) -> Result<&Question, SessionStateError> {
        self.ensure_active()?;
        let index = self.current_index;
        let Some(current) = self.questions.get(index) else {
            return Err(SessionStateError::NoCurrentQuestion);
        };

        if current.id() != question_id {
            let answered_earlier = self.questions[..index]
                .iter()
                .any(|q| q.id() == question_id);
            if answered_earlier {
                return Err(SessionStateError::AlreadyAnswered(question_id.clone()));
            }
            return Err(SessionStateError::QuestionMismatch {
                expected: current.id().clone(),
                got: question_id.clone(),
            });
        }
        if current.is_answered() {
            return Err(SessionStateError::AlreadyAnswered(question_id.clone()));
        }
        if let Some(s) = score.filter(|s| *s > MAX_ANSWER_SCORE) {
            return Err(SessionStateError::ScoreOutOfRange(s));
        }

        let question = &mut self.questions[index];
        question.record_answer(Answer {
            text: text.into(),
            score,
            feedback,
            answered_at,
        });
        Ok(question)
    }

    /// Move the cursor past the just-answered question.
    ///
    /// Reaching the end of the list does not complete the session; call
    /// `complete` once the total and summary are known.
    ///
    /// # Errors
    ///
    /// Returns `NotActive`/`Completed` when not active, `NoCurrentQuestion`
    /// at the end of the list, and `NotAnswered` if `submit_answer` has not
    /// succeeded for the current question.
    pub fn advance(&mut self) -> Result<usize, SessionStateError> {
        self.ensure_active()?;
        let Some(current) = self.questions.get(self.current_index) else {
            return Err(SessionStateError::NoCurrentQuestion);
        };
        if !current.is_answered() {
            return Err(SessionStateError::NotAnswered);
        }
        self.current_index += 1;
        Ok(self.current_index)
    }

    /// # Errors
    ///
    /// Returns `NotActive`/`Completed` unless the session is active.
    pub fn pause(&mut self) -> Result<(), SessionStateError> {
        self.ensure_active()?;
        self.status = SessionStatus::Paused;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `NotPaused`/`Completed` unless the session is paused.
    pub fn resume(&mut self) -> Result<(), SessionStateError> {
        match self.status {
            SessionStatus::Paused => {
                self.status = SessionStatus::Active;
                Ok(())
            }
            SessionStatus::Completed => Err(SessionStateError::Completed),
            status @ SessionStatus::Active => Err(SessionStateError::NotPaused { status }),
        }
    }

    /// Finish the session. Irreversible.
    ///
    /// # Errors
    ///
    /// Returns `NotActive`/`Completed` unless active, `QuestionsRemaining`
    /// while the cursor has not passed the last question, and
    /// `TotalScoreMismatch` if `total_score` differs from the summed scores.
    pub fn complete(
        &mut self,
        total_score: u32,
        summary: impl Into<String>,
        ended_at: DateTime<Utc>,
    ) -> Result<(), SessionStateError> {
        self.ensure_active()?;
        let remaining = self.remaining();
        if remaining > 0 {
            return Err(SessionStateError::QuestionsRemaining { remaining });
        }
        let expected = self.computed_total();
        if total_score != expected {
            return Err(SessionStateError::TotalScoreMismatch {
                expected,
                got: total_score,
            });
        }

        self.status = SessionStatus::Completed;
        self.ended_at = Some(ended_at);
        self.total_score = Some(total_score);
        self.summary = Some(summary.into());
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), SessionStateError> {
        match self.status {
            SessionStatus::Active => Ok(()),
            SessionStatus::Completed => Err(SessionStateError::Completed),
            status @ SessionStatus::Paused => Err(SessionStateError::NotActive { status }),
        }
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn candidate_id(&self) -> CandidateId {
        self.candidate_id
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn total_score(&self) -> Option<u32> {
        self.total_score
    }

    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// The question under the cursor, or `None` once every question is answered.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.questions.len().saturating_sub(self.current_index)
    }

    /// True when the cursor has passed the last question.
    #[must_use]
    pub fn all_answered(&self) -> bool {
        self.current_index == self.questions.len()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            answered: self.current_index,
            remaining: self.remaining(),
            is_complete: self.is_completed(),
        }
    }

    /// Sum of recorded answer scores; absent scores count as zero.
    #[must_use]
    pub fn computed_total(&self) -> u32 {
        self.questions
            .iter()
            .filter_map(Question::answer)
            .map(Answer::points)
            .sum()
    }

    /// Best achievable total for this session.
    #[must_use]
    pub fn max_score(&self) -> u32 {
        let len = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        len.saturating_mul(u32::from(MAX_ANSWER_SCORE))
    }
}

fn ensure_unique_ids(questions: &[Question]) -> Result<(), SessionStateError> {
    let mut seen = HashSet::with_capacity(questions.len());
    for q in questions {
        if !seen.insert(q.id()) {
            return Err(SessionStateError::DuplicateQuestionId(q.id().clone()));
        }
    }
    Ok(())
}
