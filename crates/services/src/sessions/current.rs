use std::sync::{Arc, PoisonError, RwLock};

use interview_core::model::{Question, Session, SessionId, SessionProgress, SessionStatus};

/// Read handle on the single current-session slot.
///
/// Clones observe the same slot. Only `InterviewOrchestrator` writes it, and
/// only after a transition has been validated and persisted.
#[derive(Clone, Debug, Default)]
pub struct CurrentSession {
    inner: Arc<RwLock<Option<Session>>>,
}

impl CurrentSession {
    /// Owned copy of the current session, if one is loaded.
    #[must_use]
    pub fn snapshot(&self) -> Option<Session> {
        self.read(|s| s.clone())
    }

    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.read(|s| s.as_ref().map(Session::id))
    }

    #[must_use]
    pub fn status(&self) -> Option<SessionStatus> {
        self.read(|s| s.as_ref().map(Session::status))
    }

    /// True while an active or paused session occupies the slot.
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        self.status().is_some_and(SessionStatus::is_resumable)
    }

    #[must_use]
    pub fn current_question(&self) -> Option<Question> {
        self.read(|s| s.as_ref().and_then(Session::current_question).cloned())
    }

    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        self.read(|s| s.as_ref().map(Session::progress))
    }

    pub(crate) fn replace(&self, session: Option<Session>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn read<T>(&self, f: impl FnOnce(&Option<Session>) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interview_core::model::{CandidateId, Difficulty, QuestionDraft};
    use interview_core::time::fixed_now;

    #[test]
    fn clones_share_the_slot() {
        let slot = CurrentSession::default();
        let reader = slot.clone();
        assert!(reader.snapshot().is_none());
        assert!(!reader.is_resumable());

        let session = Session::from_drafts(
            SessionId::generate(),
            CandidateId::generate(),
            vec![QuestionDraft::new("Q1", Difficulty::Easy, 20)],
            fixed_now(),
        )
        .unwrap();
        slot.replace(Some(session.clone()));

        assert_eq!(reader.session_id(), Some(session.id()));
        assert_eq!(reader.status(), Some(SessionStatus::Active));
        assert_eq!(reader.current_question().unwrap().text(), "Q1");
        assert_eq!(reader.progress().unwrap().remaining, 1);
    }
}
