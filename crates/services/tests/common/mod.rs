#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use interview_core::model::{
    Candidate, CandidateId, QuestionDraft, ResumeDetails, Session, SessionId,
};
use interview_core::time::{fixed_clock, fixed_now};
use services::error::ScoringError;
use services::scoring::{AnswerScore, ScoreRequest, Scorer, SummaryItem};
use services::{InterviewOrchestrator, ScoringService, TimerEvents};
use storage::repository::{SessionRepository, Storage, StorageError};
use tokio::sync::Notify;

/// Returns queued scores in order; summaries fail so the fallback summary is used.
#[derive(Default)]
pub struct ScriptedScorer {
    scores: Mutex<VecDeque<u8>>,
    pub requests: Mutex<Vec<ScoreRequest>>,
    questions: Vec<QuestionDraft>,
}

impl ScriptedScorer {
    pub fn new(scores: &[u8]) -> Self {
        Self {
            scores: Mutex::new(scores.iter().copied().collect()),
            ..Self::default()
        }
    }

    pub fn with_questions(mut self, questions: Vec<QuestionDraft>) -> Self {
        self.questions = questions;
        self
    }
}

#[async_trait]
impl Scorer for ScriptedScorer {
    async fn score(&self, request: &ScoreRequest) -> Result<AnswerScore, ScoringError> {
        self.requests.lock().unwrap().push(request.clone());
        let score = self
            .scores
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ScoringError::EmptyResponse)?;
        Ok(AnswerScore {
            score,
            feedback: format!("scripted {score}"),
        })
    }

    async fn summarize(
        &self,
        _items: &[SummaryItem],
        _total_score: u32,
    ) -> Result<String, ScoringError> {
        Err(ScoringError::Disabled)
    }

    async fn generate_questions(&self) -> Result<Vec<QuestionDraft>, ScoringError> {
        if self.questions.is_empty() {
            return Err(ScoringError::EmptyResponse);
        }
        Ok(self.questions.clone())
    }
}

/// Always reports itself available and always fails.
pub struct FailingScorer;

#[async_trait]
impl Scorer for FailingScorer {
    async fn score(&self, _request: &ScoreRequest) -> Result<AnswerScore, ScoringError> {
        Err(ScoringError::MalformedResponse("not json".into()))
    }

    async fn summarize(
        &self,
        _items: &[SummaryItem],
        _total_score: u32,
    ) -> Result<String, ScoringError> {
        Err(ScoringError::EmptyResponse)
    }

    async fn generate_questions(&self) -> Result<Vec<QuestionDraft>, ScoringError> {
        Err(ScoringError::EmptyResponse)
    }
}

/// Blocks every score call until released.
#[derive(Default)]
pub struct GatedScorer {
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl Scorer for GatedScorer {
    async fn score(&self, _request: &ScoreRequest) -> Result<AnswerScore, ScoringError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(AnswerScore {
            score: 7,
            feedback: "gated".into(),
        })
    }

    async fn summarize(
        &self,
        _items: &[SummaryItem],
        _total_score: u32,
    ) -> Result<String, ScoringError> {
        Ok("Gated summary.".into())
    }

    async fn generate_questions(&self) -> Result<Vec<QuestionDraft>, ScoringError> {
        Err(ScoringError::Disabled)
    }
}

/// Session store that refuses to save completed sessions while `fail_completed` is set.
pub struct FlakySessions {
    inner: Arc<dyn SessionRepository>,
    pub fail_completed: AtomicBool,
}

impl FlakySessions {
    /// Wrap `storage`'s session repository; returns the wrapper and a storage using it.
    pub fn wrap(storage: &Storage) -> (Arc<Self>, Storage) {
        let flaky = Arc::new(Self {
            inner: Arc::clone(&storage.sessions),
            fail_completed: AtomicBool::new(true),
        });
        let wrapped = Storage {
            sessions: flaky.clone(),
            candidates: Arc::clone(&storage.candidates),
            preferences: Arc::clone(&storage.preferences),
        };
        (flaky, wrapped)
    }

    pub fn heal(&self) {
        self.fail_completed.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionRepository for FlakySessions {
    async fn save_session(&self, session: &Session) -> Result<(), StorageError> {
        if session.is_completed() && self.fail_completed.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("disk full".into()));
        }
        self.inner.save_session(session).await
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, StorageError> {
        self.inner.get_session(id).await
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, StorageError> {
        self.inner.list_sessions().await
    }

    async fn list_sessions_for_candidate(
        &self,
        candidate_id: CandidateId,
    ) -> Result<Vec<Session>, StorageError> {
        self.inner.list_sessions_for_candidate(candidate_id).await
    }

    async fn latest_resumable(&self) -> Result<Option<Session>, StorageError> {
        self.inner.latest_resumable().await
    }
}

pub async fn seeded_candidate(storage: &Storage) -> CandidateId {
    let candidate = Candidate::from_resume(
        CandidateId::generate(),
        ResumeDetails {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "+44 20 7946 0001".into(),
            text: "React, Node.js, PostgreSQL".into(),
        },
        fixed_now(),
    );
    storage.candidates.upsert_candidate(&candidate).await.unwrap();
    candidate.id()
}

pub fn orchestrator_with(
    storage: &Storage,
    scorer: Arc<dyn Scorer>,
) -> (Arc<InterviewOrchestrator>, TimerEvents) {
    let (orchestrator, events) =
        InterviewOrchestrator::new(fixed_clock(), storage, ScoringService::new(scorer));
    (Arc::new(orchestrator), events)
}
