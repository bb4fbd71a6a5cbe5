//! Shared error types for the services crate.

use std::time::Duration;

use thiserror::Error;

use interview_core::model::{CandidateError, SessionStateError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Failures of a scoring capability.
///
/// The orchestrator never surfaces these; `ScoringService` logs them and
/// substitutes fallback output.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScoringError {
    #[error("remote scorer is not configured")]
    Disabled,
    #[error("remote scorer returned an empty response")]
    EmptyResponse,
    #[error("remote scorer request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("remote scorer timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed scorer response: {0}")]
    MalformedResponse(String),
}

/// Errors emitted by `InterviewOrchestrator`.
///
/// When one of these is returned, the current session slot is unchanged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OrchestratorError {
    #[error("no interview session is loaded")]
    NoSession,
    #[error("an interview is already in progress")]
    SessionInProgress,
    #[error("candidate profile is incomplete or has no resume text")]
    ProfileIncomplete,
    #[error("an answer is already being scored")]
    SubmissionInFlight,
    #[error("answer cannot be empty")]
    EmptyAnswer,
    #[error(transparent)]
    Session(#[from] SessionStateError),
    #[error(transparent)]
    Candidate(#[from] CandidateError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
