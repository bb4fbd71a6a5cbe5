use async_trait::async_trait;
use interview_core::model::{Candidate, CandidateId, Session, SessionId, UiPreferences};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Durable snapshots of interview sessions.
///
/// Completed sessions are historical records: once a completed snapshot is
/// stored, saving a different value for the same id fails with
/// `StorageError::Conflict`.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Insert or replace the snapshot for `session.id()`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when overwriting a completed session
    /// with a different value, or other storage errors.
    async fn save_session(&self, session: &Session) -> Result<(), StorageError>;

    /// Fetch a session by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: SessionId) -> Result<Session, StorageError>;

    /// All sessions ordered by start time (oldest first).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_sessions(&self) -> Result<Vec<Session>, StorageError>;

    /// Sessions for one candidate ordered by start time (oldest first).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_sessions_for_candidate(
        &self,
        candidate_id: CandidateId,
    ) -> Result<Vec<Session>, StorageError>;

    /// The most recently started session that is still active or paused.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn latest_resumable(&self) -> Result<Option<Session>, StorageError>;
}

#[async_trait]
pub trait CandidateRepository: Send + Sync {
    /// Persist or update a candidate.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the candidate cannot be stored.
    async fn upsert_candidate(&self, candidate: &Candidate) -> Result<(), StorageError>;

    /// Fetch a candidate by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_candidate(&self, id: CandidateId) -> Result<Candidate, StorageError>;

    /// All candidates ordered by creation time (oldest first).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_candidates(&self) -> Result<Vec<Candidate>, StorageError>;
}

#[async_trait]
pub trait UiPreferencesRepository: Send + Sync {
    /// Load stored preferences, falling back to defaults when none are saved.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn load_preferences(&self) -> Result<UiPreferences, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the preferences cannot be stored.
    async fn save_preferences(&self, prefs: &UiPreferences) -> Result<(), StorageError>;
}

/// Shared rule for overwriting a stored snapshot.
pub(crate) fn check_overwrite(
    stored: Option<&Session>,
    incoming: &Session,
) -> Result<(), StorageError> {
    match stored {
        Some(existing) if existing.is_completed() && existing != incoming => {
            Err(StorageError::Conflict)
        }
        _ => Ok(()),
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
    candidates: Arc<Mutex<HashMap<CandidateId, Candidate>>>,
    preferences: Arc<Mutex<Option<UiPreferences>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn save_session(&self, session: &Session) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        check_overwrite(guard.get(&session.id()), session)?;
        guard.insert(session.id(), session.clone());
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut sessions: Vec<_> = guard.values().cloned().collect();
        sessions.sort_by_key(|s| (s.started_at(), s.id()));
        Ok(sessions)
    }

    async fn list_sessions_for_candidate(
        &self,
        candidate_id: CandidateId,
    ) -> Result<Vec<Session>, StorageError> {
        let mut sessions = self.list_sessions().await?;
        sessions.retain(|s| s.candidate_id() == candidate_id);
        Ok(sessions)
    }

    async fn latest_resumable(&self) -> Result<Option<Session>, StorageError> {
        let sessions = self.list_sessions().await?;
        Ok(sessions
            .into_iter()
            .rev()
            .find(|s| s.status().is_resumable()))
    }
}

#[async_trait]
impl CandidateRepository for InMemoryRepository {
    async fn upsert_candidate(&self, candidate: &Candidate) -> Result<(), StorageError> {
        let mut guard = self
            .candidates
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(candidate.id(), candidate.clone());
        Ok(())
    }

    async fn get_candidate(&self, id: CandidateId) -> Result<Candidate, StorageError> {
        let guard = self
            .candidates
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_candidates(&self) -> Result<Vec<Candidate>, StorageError> {
        let guard = self
            .candidates
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut candidates: Vec<_> = guard.values().cloned().collect();
        candidates.sort_by_key(|c| (c.created_at(), c.id()));
        Ok(candidates)
    }
}

#[async_trait]
impl UiPreferencesRepository for InMemoryRepository {
    async fn load_preferences(&self) -> Result<UiPreferences, StorageError> {
        let guard = self
            .preferences
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok((*guard).unwrap_or_default())
    }

    async fn save_preferences(&self, prefs: &UiPreferences) -> Result<(), StorageError> {
        let mut guard = self
            .preferences
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(*prefs);
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository>,
    pub candidates: Arc<dyn CandidateRepository>,
    pub preferences: Arc<dyn UiPreferencesRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo.clone());
        let candidates: Arc<dyn CandidateRepository> = Arc::new(repo.clone());
        let preferences: Arc<dyn UiPreferencesRepository> = Arc::new(repo);
        Self {
            sessions,
            candidates,
            preferences,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use interview_core::model::{Difficulty, QuestionDraft, SessionStatus, ViewTab};
    use interview_core::time::fixed_now;

    fn build_session(candidate_id: CandidateId, offset_secs: i64) -> Session {
        let drafts = vec![
            QuestionDraft::new("Q1", Difficulty::Easy, 20),
            QuestionDraft::new("Q2", Difficulty::Hard, 120),
        ];
        Session::from_drafts(
            SessionId::generate(),
            candidate_id,
            drafts,
            fixed_now() + Duration::seconds(offset_secs),
        )
        .unwrap()
    }

    fn finish(session: &mut Session) {
        while let Some(q) = session.current_question() {
            let id = q.id().clone();
            session
                .submit_answer(&id, "answer", Some(5), None, fixed_now())
                .unwrap();
            session.advance().unwrap();
        }
        let total = session.computed_total();
        session.complete(total, "done", fixed_now()).unwrap();
    }

    #[tokio::test]
    async fn latest_resumable_skips_completed_sessions() {
        let repo = InMemoryRepository::new();
        let candidate = CandidateId::generate();

        let paused = {
            let mut s = build_session(candidate, 0);
            s.pause().unwrap();
            s
        };
        let mut completed = build_session(candidate, 10);
        finish(&mut completed);

        repo.save_session(&paused).await.unwrap();
        repo.save_session(&completed).await.unwrap();

        let resumable = repo.latest_resumable().await.unwrap().unwrap();
        assert_eq!(resumable.id(), paused.id());
        assert_eq!(resumable.status(), SessionStatus::Paused);
    }

    #[tokio::test]
    async fn completed_session_cannot_be_overwritten() {
        let repo = InMemoryRepository::new();
        let mut session = build_session(CandidateId::generate(), 0);
        finish(&mut session);
        repo.save_session(&session).await.unwrap();

        // Re-saving the identical snapshot is harmless.
        repo.save_session(&session).await.unwrap();

        let template = build_session(session.candidate_id(), 0);
        let other = Session::from_persisted(
            session.id(),
            template.candidate_id(),
            template.questions().to_vec(),
            0,
            SessionStatus::Active,
            template.started_at(),
            None,
            None,
            None,
        )
        .unwrap();
        let err = repo.save_session(&other).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
        assert_eq!(repo.get_session(session.id()).await.unwrap(), session);
    }

    #[tokio::test]
    async fn preferences_default_until_saved() {
        let repo = InMemoryRepository::new();
        assert_eq!(
            repo.load_preferences().await.unwrap(),
            UiPreferences::default()
        );

        let prefs = UiPreferences {
            active_tab: ViewTab::Interviewer,
            dark_mode: false,
        };
        repo.save_preferences(&prefs).await.unwrap();
        assert_eq!(repo.load_preferences().await.unwrap(), prefs);
    }
}
