mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use common::{ScriptedScorer, orchestrator_with, seeded_candidate};
use interview_core::model::{Session, SessionId, SessionStatus};
use interview_core::time::fixed_now;
use services::scoring::FallbackScorer;
use services::{OrchestratorError, SubmitOutcome};
use storage::repository::Storage;

async fn settle() {
    for _ in 0..4 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn paused_session_survives_restart_and_resumes_with_full_countdown() {
    let storage = Storage::in_memory();
    let candidate_id = seeded_candidate(&storage).await;

    let (answers_before, session_id) = {
        let (orchestrator, _events) =
            orchestrator_with(&storage, Arc::new(ScriptedScorer::new(&[8, 6])));
        let session = orchestrator.start_interview(candidate_id).await.unwrap();
        orchestrator.submit_answer("first").await.unwrap();
        orchestrator.submit_answer("second").await.unwrap();

        // Part-way through question 3 (a 60 second question).
        tokio::time::advance(Duration::from_secs(25)).await;
        settle().await;
        assert_eq!(*orchestrator.remaining_seconds().borrow(), 35);

        let paused = orchestrator.pause().await.unwrap();
        assert_eq!(paused.current_index(), 2);
        (paused.questions()[..2].to_vec(), session.id())
    };

    // New process: fresh orchestrator over the same store.
    let (orchestrator, _events) = orchestrator_with(&storage, Arc::new(ScriptedScorer::new(&[9])));
    let restored = orchestrator.restore().await.unwrap().unwrap();
    assert_eq!(restored.id(), session_id);
    assert_eq!(restored.status(), SessionStatus::Paused);
    assert_eq!(restored.current_index(), 2);
    assert_eq!(restored.questions()[..2], answers_before[..]);

    // Paused sessions wait for an explicit resume.
    assert!(matches!(
        orchestrator.submit_answer("too early").await,
        Err(OrchestratorError::Session(_))
    ));

    assert_eq!(orchestrator.resume().await.unwrap(), None);
    let resumed = orchestrator.current().snapshot().unwrap();
    assert_eq!(resumed.status(), SessionStatus::Active);
    assert_eq!(resumed.current_index(), 2);
    assert_eq!(resumed.questions()[..2], answers_before[..]);
    assert_eq!(*orchestrator.remaining_seconds().borrow(), 60);

    let outcome = orchestrator.submit_answer("third").await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Advanced(ref s) if s.index == 2 && s.score == 9));
}

#[tokio::test(start_paused = true)]
async fn pause_then_resume_keeps_answers_and_restarts_timer() {
    let storage = Storage::in_memory();
    let candidate_id = seeded_candidate(&storage).await;
    let (orchestrator, mut events) =
        orchestrator_with(&storage, Arc::new(ScriptedScorer::new(&[7, 4])));
    orchestrator.start_interview(candidate_id).await.unwrap();
    orchestrator.submit_answer("first").await.unwrap();

    tokio::time::advance(Duration::from_secs(15)).await;
    settle().await;
    assert_eq!(*orchestrator.remaining_seconds().borrow(), 5);

    let before = orchestrator.pause().await.unwrap();
    // No expiry fires while paused, however long the pause lasts.
    let waited = tokio::time::timeout(Duration::from_secs(300), events.recv()).await;
    assert!(waited.is_err());

    orchestrator.resume().await.unwrap();
    let after = orchestrator.current().snapshot().unwrap();
    assert_eq!(after.current_index(), before.current_index());
    assert_eq!(after.questions(), before.questions());
    assert_eq!(*orchestrator.remaining_seconds().borrow(), 20);

    let started = tokio::time::Instant::now();
    let expired = events.recv().await.unwrap();
    assert_eq!(started.elapsed(), Duration::from_secs(20));
    let outcome = orchestrator.handle_timer_expired(expired).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Advanced(ref s) if s.forced && s.score == 4));
}

#[tokio::test(start_paused = true)]
async fn restore_loads_active_session_and_restarts_its_question() {
    let storage = Storage::in_memory();
    let candidate_id = seeded_candidate(&storage).await;
    {
        let (orchestrator, _events) =
            orchestrator_with(&storage, Arc::new(ScriptedScorer::new(&[5])));
        orchestrator.start_interview(candidate_id).await.unwrap();
        orchestrator.submit_answer("first").await.unwrap();
    }

    let (orchestrator, _events) = orchestrator_with(&storage, Arc::new(ScriptedScorer::new(&[])));
    let restored = orchestrator.restore().await.unwrap().unwrap();
    assert_eq!(restored.status(), SessionStatus::Active);
    assert_eq!(restored.current_index(), 1);
    assert_eq!(*orchestrator.remaining_seconds().borrow(), 20);

    // Restoring twice keeps the loaded session.
    let again = orchestrator.restore().await.unwrap().unwrap();
    assert_eq!(again.id(), restored.id());
}

#[tokio::test(start_paused = true)]
async fn restore_completes_a_fully_answered_active_session() {
    let storage = Storage::in_memory();
    let candidate_id = seeded_candidate(&storage).await;

    let mut session = Session::from_drafts(
        SessionId::generate(),
        candidate_id,
        FallbackScorer::questions(),
        fixed_now() - ChronoDuration::minutes(10),
    )
    .unwrap();
    for score in [6, 6, 6, 6, 6, 6] {
        let id = session.current_question().unwrap().id().clone();
        session
            .submit_answer(&id, "answer", Some(score), None, fixed_now())
            .unwrap();
        session.advance().unwrap();
    }
    storage.sessions.save_session(&session).await.unwrap();

    let (orchestrator, _events) = orchestrator_with(&storage, Arc::new(ScriptedScorer::new(&[])));
    let restored = orchestrator.restore().await.unwrap().unwrap();
    assert_eq!(restored.status(), SessionStatus::Completed);
    assert_eq!(restored.total_score(), Some(36));
    assert!(restored.summary().unwrap().contains("36/60"));

    let candidate = storage.candidates.get_candidate(candidate_id).await.unwrap();
    assert_eq!(candidate.final_score(), Some(36));
}

#[tokio::test(start_paused = true)]
async fn stored_paused_session_blocks_a_new_interview_after_restart() {
    let storage = Storage::in_memory();
    let candidate_id = seeded_candidate(&storage).await;
    let paused_id = {
        let (orchestrator, _events) =
            orchestrator_with(&storage, Arc::new(ScriptedScorer::new(&[6])));
        orchestrator.start_interview(candidate_id).await.unwrap();
        orchestrator.submit_answer("first").await.unwrap();
        orchestrator.pause().await.unwrap().id()
    };

    // Fresh process that goes straight to starting without restoring.
    let (orchestrator, _events) = orchestrator_with(&storage, Arc::new(ScriptedScorer::new(&[])));
    assert!(matches!(
        orchestrator.start_interview(candidate_id).await,
        Err(OrchestratorError::SessionInProgress)
    ));
    assert!(orchestrator.current().snapshot().is_none());

    let resumable: Vec<_> = storage
        .sessions
        .list_sessions()
        .await
        .unwrap()
        .into_iter()
        .filter(|s| s.status().is_resumable())
        .collect();
    assert_eq!(resumable.len(), 1);
    assert_eq!(resumable[0].id(), paused_id);
    assert_eq!(
        storage.sessions.latest_resumable().await.unwrap().unwrap().id(),
        paused_id
    );
}

#[tokio::test(start_paused = true)]
async fn restore_without_resumable_session_is_empty() {
    let storage = Storage::in_memory();
    let (orchestrator, _events) = orchestrator_with(&storage, Arc::new(ScriptedScorer::new(&[])));
    assert!(orchestrator.restore().await.unwrap().is_none());
    assert!(matches!(
        orchestrator.resume().await,
        Err(OrchestratorError::NoSession)
    ));
}
