//! Scoring, summary and question-source capabilities.

mod config;
mod fallback;
mod remote;

use std::sync::Arc;

use async_trait::async_trait;
use interview_core::model::{Difficulty, MAX_ANSWER_SCORE, QuestionDraft};
use tracing::{debug, warn};

use crate::error::ScoringError;

pub use config::{AiConfig, AiSettings, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
pub use fallback::FallbackScorer;
pub use remote::RemoteScorer;

//
// ─── TYPES ─────────────────────────────────────────────────────────────────────
//

/// Input for scoring one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRequest {
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
}

/// Score and feedback for one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerScore {
    pub score: u8,
    pub feedback: String,
}

/// One answered question, as fed to the summary capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryItem {
    pub question: String,
    pub answer: String,
    pub score: u8,
}

/// An asynchronous, fallible scoring backend.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Whether the backend can be used right now. Checked before every call.
    fn is_available(&self) -> bool {
        true
    }

    /// # Errors
    ///
    /// Returns `ScoringError` on transport failures, timeouts, or replies that
    /// cannot be parsed.
    async fn score(&self, request: &ScoreRequest) -> Result<AnswerScore, ScoringError>;

    /// # Errors
    ///
    /// Returns `ScoringError` if no summary could be produced.
    async fn summarize(
        &self,
        items: &[SummaryItem],
        total_score: u32,
    ) -> Result<String, ScoringError>;

    /// # Errors
    ///
    /// Returns `ScoringError` if no question list could be produced.
    async fn generate_questions(&self) -> Result<Vec<QuestionDraft>, ScoringError>;
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Infallible front for a primary `Scorer`.
///
/// Uses the primary backend when it reports itself available at call time,
/// validates what it returns, and falls back to `FallbackScorer` on any
/// failure.
#[derive(Clone)]
pub struct ScoringService {
    primary: Arc<dyn Scorer>,
}

impl ScoringService {
    #[must_use]
    pub fn new(primary: Arc<dyn Scorer>) -> Self {
        Self { primary }
    }

    /// Use the remote chat-completions scorer configured by `settings`.
    #[must_use]
    pub fn remote(settings: AiSettings) -> Self {
        Self::new(Arc::new(RemoteScorer::new(settings)))
    }

    #[must_use]
    pub fn fallback_only() -> Self {
        Self::new(Arc::new(FallbackScorer))
    }

    #[must_use]
    pub fn primary_available(&self) -> bool {
        self.primary.is_available()
    }

    /// Score one answer. Always yields a score in 1..=10.
    pub async fn score(&self, request: &ScoreRequest) -> AnswerScore {
        if !self.primary.is_available() {
            debug!("primary scorer unavailable; using fallback scoring");
            return FallbackScorer::score_answer(&request.answer, request.difficulty);
        }
        match self.primary.score(request).await.and_then(check_score) {
            Ok(scored) => scored,
            Err(err) => {
                warn!(error = %err, "scoring failed; using fallback scoring");
                FallbackScorer::score_answer(&request.answer, request.difficulty)
            }
        }
    }

    /// Summarize a finished interview. Never returns an empty string.
    pub async fn summarize(&self, items: &[SummaryItem], total_score: u32) -> String {
        if !self.primary.is_available() {
            debug!("primary scorer unavailable; using fallback summary");
            return FallbackScorer::summary(items, total_score);
        }
        let result = self
            .primary
            .summarize(items, total_score)
            .await
            .and_then(|summary| {
                let trimmed = summary.trim();
                if trimmed.is_empty() {
                    Err(ScoringError::EmptyResponse)
                } else {
                    Ok(trimmed.to_owned())
                }
            });
        match result {
            Ok(summary) => summary,
            Err(err) => {
                warn!(error = %err, "summary failed; using fallback summary");
                FallbackScorer::summary(items, total_score)
            }
        }
    }

    /// Question list for a new session. Never returns an empty list.
    pub async fn questions(&self) -> Vec<QuestionDraft> {
        if !self.primary.is_available() {
            debug!("primary scorer unavailable; using static questions");
            return FallbackScorer::questions();
        }
        match self.primary.generate_questions().await.and_then(check_questions) {
            Ok(drafts) => drafts,
            Err(err) => {
                warn!(error = %err, "question generation failed; using static questions");
                FallbackScorer::questions()
            }
        }
    }
}

fn check_score(scored: AnswerScore) -> Result<AnswerScore, ScoringError> {
    if !(1..=MAX_ANSWER_SCORE).contains(&scored.score) {
        return Err(ScoringError::MalformedResponse(format!(
            "score {} outside 1..=10",
            scored.score
        )));
    }
    if scored.feedback.trim().is_empty() {
        return Err(ScoringError::MalformedResponse("empty feedback".into()));
    }
    Ok(scored)
}

fn check_questions(drafts: Vec<QuestionDraft>) -> Result<Vec<QuestionDraft>, ScoringError> {
    if drafts.is_empty() {
        return Err(ScoringError::EmptyResponse);
    }
    if let Some(bad) = drafts
        .iter()
        .find(|d| d.text.trim().is_empty() || d.time_limit_secs == 0)
    {
        return Err(ScoringError::MalformedResponse(format!(
            "invalid question: {bad:?}"
        )));
    }
    Ok(drafts)
}
