use interview_core::model::{
    Answer, Candidate, CandidateId, Difficulty, Question, QuestionId, SessionId, SessionStatus,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn usize_from_i64(field: &'static str, v: i64) -> Result<usize, StorageError> {
    usize::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn i64_from_usize(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn session_id_from_str(raw: &str) -> Result<SessionId, StorageError> {
    raw.parse().map_err(ser)
}

pub(crate) fn candidate_id_from_str(raw: &str) -> Result<CandidateId, StorageError> {
    raw.parse().map_err(ser)
}

pub(crate) fn status_from_str(raw: &str) -> Result<SessionStatus, StorageError> {
    raw.parse().map_err(ser)
}

pub(crate) fn map_candidate_row(row: &sqlx::sqlite::SqliteRow) -> Result<Candidate, StorageError> {
    let id = candidate_id_from_str(&row.try_get::<String, _>("id").map_err(ser)?)?;
    let final_score = row
        .try_get::<Option<i64>, _>("final_score")
        .map_err(ser)?
        .map(|v| u32_from_i64("final_score", v))
        .transpose()?;

    Candidate::from_persisted(
        id,
        row.try_get("name").map_err(ser)?,
        row.try_get("email").map_err(ser)?,
        row.try_get("phone").map_err(ser)?,
        row.try_get("resume_text").map_err(ser)?,
        row.try_get("profile_complete").map_err(ser)?,
        row.try_get("interview_complete").map_err(ser)?,
        final_score,
        row.try_get("summary").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

/// Maps a `session_questions` row; a non-null `answered_at` marks an answer.
pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let difficulty: Difficulty = row
        .try_get::<String, _>("difficulty")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let time_limit_secs = u32_from_i64(
        "time_limit_secs",
        row.try_get::<i64, _>("time_limit_secs").map_err(ser)?,
    )?;

    let answered_at: Option<chrono::DateTime<chrono::Utc>> =
        row.try_get("answered_at").map_err(ser)?;
    let answer = match answered_at {
        Some(answered_at) => {
            let score = row
                .try_get::<Option<i64>, _>("score")
                .map_err(ser)?
                .map(|v| u8_from_i64("score", v))
                .transpose()?;
            Some(Answer {
                text: row
                    .try_get::<Option<String>, _>("answer_text")
                    .map_err(ser)?
                    .unwrap_or_default(),
                score,
                feedback: row.try_get("feedback").map_err(ser)?,
                answered_at,
            })
        }
        None => None,
    };

    Question::from_persisted(
        QuestionId::new(row.try_get::<String, _>("question_id").map_err(ser)?),
        row.try_get("text").map_err(ser)?,
        difficulty,
        time_limit_secs,
        answer,
    )
    .map_err(ser)
}
