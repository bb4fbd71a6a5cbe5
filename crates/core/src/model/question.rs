use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Highest score a single answer can receive.
pub const MAX_ANSWER_SCORE: u8 = 10;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question time limit must be > 0 seconds")]
    InvalidTimeLimit,

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Difficulty tier of a question.
///
/// Each tier carries the time limit used by the reference question set and
/// nudges fallback scoring up (easy) or down (hard) by one point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Reference countdown for this tier, in seconds.
    #[must_use]
    pub fn default_time_limit(self) -> u32 {
        match self {
            Difficulty::Easy => 20,
            Difficulty::Medium => 60,
            Difficulty::Hard => 120,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(QuestionError::UnknownDifficulty(other.to_owned())),
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question as produced by a question source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub text: String,
    pub difficulty: Difficulty,
    #[serde(alias = "timeLimit")]
    pub time_limit_secs: u32,
}

impl QuestionDraft {
    #[must_use]
    pub fn new(text: impl Into<String>, difficulty: Difficulty, time_limit_secs: u32) -> Self {
        Self {
            text: text.into(),
            difficulty,
            time_limit_secs,
        }
    }

    /// Validate the draft into a `Question` with the given id.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` for blank text and
    /// `QuestionError::InvalidTimeLimit` for a zero time limit.
    pub fn validate(self, id: QuestionId) -> Result<Question, QuestionError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if self.time_limit_secs == 0 {
            return Err(QuestionError::InvalidTimeLimit);
        }
        Ok(Question {
            id,
            text: text.to_owned(),
            difficulty: self.difficulty,
            time_limit_secs: self.time_limit_secs,
            answer: None,
        })
    }
}

//
// ─── ANSWER ────────────────────────────────────────────────────────────────────
//

/// Recorded response to a question.
///
/// `text` may be empty when the countdown expired before anything was typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub score: Option<u8>,
    pub feedback: Option<String>,
    pub answered_at: DateTime<Utc>,
}

impl Answer {
    /// Score contribution of this answer; an absent score counts as zero.
    #[must_use]
    pub fn points(&self) -> u32 {
        u32::from(self.score.unwrap_or(0))
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// One question in a session.
///
/// The prompt fields never change after creation; `answer` is filled in
/// exactly once by `Session::submit_answer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    difficulty: Difficulty,
    time_limit_secs: u32,
    answer: Option<Answer>,
}

impl Question {
    /// Rehydrate a question from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt fields are invalid.
    pub fn from_persisted(
        id: QuestionId,
        text: String,
        difficulty: Difficulty,
        time_limit_secs: u32,
        answer: Option<Answer>,
    ) -> Result<Self, QuestionError> {
        let mut question = QuestionDraft::new(text, difficulty, time_limit_secs).validate(id)?;
        question.answer = answer;
        Ok(question)
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    #[must_use]
    pub fn answer(&self) -> Option<&Answer> {
        self.answer.as_ref()
    }

    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.answer.is_some()
    }

    /// Score of the recorded answer, if any.
    #[must_use]
    pub fn score(&self) -> Option<u8> {
        self.answer.as_ref().and_then(|a| a.score)
    }

    pub(crate) fn record_answer(&mut self, answer: Answer) {
        self.answer = Some(answer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_validation_trims_text() {
        let q = QuestionDraft::new("  What is Rust?  ", Difficulty::Easy, 20)
            .validate(QuestionId::for_position(0))
            .unwrap();
        assert_eq!(q.text(), "What is Rust?");
        assert!(!q.is_answered());
    }

    #[test]
    fn draft_rejects_blank_text_and_zero_limit() {
        let blank = QuestionDraft::new("   ", Difficulty::Easy, 20).validate(QuestionId::new("q"));
        assert_eq!(blank.unwrap_err(), QuestionError::EmptyText);

        let zero = QuestionDraft::new("Q", Difficulty::Hard, 0).validate(QuestionId::new("q"));
        assert_eq!(zero.unwrap_err(), QuestionError::InvalidTimeLimit);
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("Hard".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
        assert_eq!(Difficulty::Medium.default_time_limit(), 60);
    }

    #[test]
    fn draft_deserializes_camel_case_time_limit() {
        let draft: QuestionDraft = serde_json::from_str(
            r#"{"text":"Explain closures","difficulty":"medium","timeLimit":60}"#,
        )
        .unwrap();
        assert_eq!(draft.difficulty, Difficulty::Medium);
        assert_eq!(draft.time_limit_secs, 60);
    }
}
