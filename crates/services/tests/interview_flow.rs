mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    FailingScorer, FlakySessions, GatedScorer, ScriptedScorer, orchestrator_with, seeded_candidate,
};
use interview_core::model::{SessionStateError, SessionStatus};
use services::{OrchestratorError, SubmitOutcome};
use storage::repository::Storage;

#[tokio::test(start_paused = true)]
async fn six_question_interview_with_final_timeout_totals_43() {
    let storage = Storage::in_memory();
    let candidate_id = seeded_candidate(&storage).await;
    let scorer = Arc::new(ScriptedScorer::new(&[8, 8, 7, 9, 8, 3]));
    let (orchestrator, mut timer_events) = orchestrator_with(&storage, scorer.clone());

    let session = orchestrator.start_interview(candidate_id).await.unwrap();
    assert_eq!(session.questions().len(), 6);
    assert_eq!(session.status(), SessionStatus::Active);

    for (i, expected) in [8u8, 8, 7, 9, 8].into_iter().enumerate() {
        let outcome = orchestrator
            .submit_answer(format!("  answer number {i}  "))
            .await
            .unwrap();
        let SubmitOutcome::Advanced(scored) = outcome else {
            panic!("expected the cycle to advance, got {outcome:?}");
        };
        assert_eq!(scored.index, i);
        assert_eq!(scored.score, expected);
        assert_eq!(scored.answer, format!("answer number {i}"));
        assert!(!scored.forced);
    }

    let current = orchestrator.current();
    assert_eq!(current.progress().unwrap().answered, 5);
    assert_eq!(*orchestrator.remaining_seconds().borrow(), 120);

    // Nothing typed for the last question; let the countdown run out.
    let expired = timer_events.recv().await.unwrap();
    let outcome = orchestrator.handle_timer_expired(expired).await.unwrap();
    let SubmitOutcome::Completed(scored, completion) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert!(scored.forced);
    assert_eq!(scored.answer, "");
    assert_eq!(scored.score, 3);
    assert_eq!(completion.total_score, 43);
    assert_eq!(completion.max_score, 60);
    assert!(!completion.summary.is_empty());

    let finished = current.snapshot().unwrap();
    assert_eq!(finished.status(), SessionStatus::Completed);
    assert_eq!(finished.total_score(), Some(43));
    assert!(finished.ended_at().is_some());
    assert_eq!(finished.questions()[5].answer().unwrap().text, "");

    let stored = storage.sessions.get_session(finished.id()).await.unwrap();
    assert_eq!(stored, finished);
    assert!(storage.sessions.latest_resumable().await.unwrap().is_none());

    let candidate = storage.candidates.get_candidate(candidate_id).await.unwrap();
    assert!(candidate.interview_complete());
    assert_eq!(candidate.final_score(), Some(43));
    assert_eq!(candidate.summary(), Some(completion.summary.as_str()));

    let requests = scorer.requests.lock().unwrap();
    assert_eq!(requests.len(), 6);
    assert_eq!(requests[5].answer, "");
}

#[tokio::test(start_paused = true)]
async fn timeout_submits_the_typed_draft() {
    let storage = Storage::in_memory();
    let candidate_id = seeded_candidate(&storage).await;
    let scorer = Arc::new(ScriptedScorer::new(&[5]));
    let (orchestrator, mut timer_events) = orchestrator_with(&storage, scorer.clone());
    orchestrator.start_interview(candidate_id).await.unwrap();

    orchestrator
        .update_draft("React uses a virtual DOM   ")
        .await
        .unwrap();
    let started = tokio::time::Instant::now();
    let expired = timer_events.recv().await.unwrap();
    assert_eq!(started.elapsed(), Duration::from_secs(20));

    let outcome = orchestrator.handle_timer_expired(expired).await.unwrap();
    let SubmitOutcome::Advanced(scored) = outcome else {
        panic!("expected advance, got {outcome:?}");
    };
    assert!(scored.forced);
    assert_eq!(scored.answer, "React uses a virtual DOM");
    assert_eq!(orchestrator.draft().await, "");

    // A replayed expiry for the finished countdown is ignored.
    let replay = orchestrator.handle_timer_expired(expired).await.unwrap();
    assert_eq!(replay, SubmitOutcome::Discarded);
    assert_eq!(orchestrator.current().progress().unwrap().answered, 1);
}

#[tokio::test(start_paused = true)]
async fn failing_scorer_falls_back_and_still_completes() {
    let storage = Storage::in_memory();
    let candidate_id = seeded_candidate(&storage).await;
    let (orchestrator, _timer_events) = orchestrator_with(&storage, Arc::new(FailingScorer));

    let session = orchestrator.start_interview(candidate_id).await.unwrap();
    assert_eq!(session.questions().len(), 6, "static questions are used");

    let mut completion = None;
    for _ in 0..6 {
        match orchestrator
            .submit_answer("A React component keeps state and receives props from an API")
            .await
            .unwrap()
        {
            SubmitOutcome::Advanced(scored) => assert!((1..=10).contains(&scored.score)),
            SubmitOutcome::Completed(scored, done) => {
                assert!((1..=10).contains(&scored.score));
                completion = Some(done);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    let completion = completion.unwrap();
    assert!(completion.summary.starts_with("Interview completed with a total score of"));
    let finished = orchestrator.current().snapshot().unwrap();
    assert_eq!(finished.total_score(), Some(finished.computed_total()));
    assert!(
        finished
            .questions()
            .iter()
            .all(|q| q.score().is_some_and(|s| (1..=10).contains(&s)))
    );
}

#[tokio::test(start_paused = true)]
async fn second_submit_while_scoring_is_rejected() {
    let storage = Storage::in_memory();
    let candidate_id = seeded_candidate(&storage).await;
    let gate = Arc::new(GatedScorer::default());
    let (orchestrator, _timer_events) = orchestrator_with(&storage, gate.clone());
    orchestrator.start_interview(candidate_id).await.unwrap();

    let first = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.submit_answer("first answer").await })
    };
    gate.entered.notified().await;

    let err = orchestrator.submit_answer("second answer").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::SubmissionInFlight));

    gate.release.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert!(matches!(outcome, SubmitOutcome::Advanced(ref s) if s.answer == "first answer"));

    let session = orchestrator.current().snapshot().unwrap();
    assert_eq!(session.current_index(), 1);
    assert_eq!(
        session.questions()[0].answer().unwrap().text,
        "first answer"
    );
    assert!(!session.questions()[1].is_answered());
}

#[tokio::test(start_paused = true)]
async fn pause_during_scoring_discards_the_result() {
    let storage = Storage::in_memory();
    let candidate_id = seeded_candidate(&storage).await;
    let gate = Arc::new(GatedScorer::default());
    let (orchestrator, _timer_events) = orchestrator_with(&storage, gate.clone());
    orchestrator.start_interview(candidate_id).await.unwrap();

    let pending = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.submit_answer("too late").await })
    };
    gate.entered.notified().await;

    let paused = orchestrator.pause().await.unwrap();
    assert_eq!(paused.status(), SessionStatus::Paused);

    gate.release.notify_one();
    assert_eq!(pending.await.unwrap().unwrap(), SubmitOutcome::Discarded);

    let session = orchestrator.current().snapshot().unwrap();
    assert_eq!(session.current_index(), 0);
    assert!(!session.questions()[0].is_answered());

    assert_eq!(orchestrator.resume().await.unwrap(), None);
    assert_eq!(*orchestrator.remaining_seconds().borrow(), 20);

    gate.release.notify_one();
    let outcome = orchestrator.submit_answer("on time").await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Advanced(ref s) if s.score == 7));
}

#[tokio::test(start_paused = true)]
async fn completed_session_rejects_further_transitions() {
    let storage = Storage::in_memory();
    let candidate_id = seeded_candidate(&storage).await;
    let (orchestrator, _timer_events) = orchestrator_with(&storage, Arc::new(FailingScorer));
    orchestrator.start_interview(candidate_id).await.unwrap();
    for _ in 0..6 {
        orchestrator.submit_answer("answer").await.unwrap();
    }

    assert!(matches!(
        orchestrator.submit_answer("extra").await,
        Err(OrchestratorError::Session(SessionStateError::Completed))
    ));
    assert!(matches!(
        orchestrator.pause().await,
        Err(OrchestratorError::Session(SessionStateError::Completed))
    ));

    // A finished session frees the slot for a new interview.
    let next = orchestrator.start_interview(candidate_id).await.unwrap();
    assert_eq!(next.current_index(), 0);
}

#[tokio::test(start_paused = true)]
async fn expiry_overtaken_by_manual_submit_is_discarded() {
    let storage = Storage::in_memory();
    let candidate_id = seeded_candidate(&storage).await;
    let gate = Arc::new(GatedScorer::default());
    let (orchestrator, mut timer_events) = orchestrator_with(&storage, gate.clone());
    orchestrator.start_interview(candidate_id).await.unwrap();
    orchestrator.update_draft("half typed").await.unwrap();

    // The countdown fires, but the manual submit takes the cycle first.
    let expired = timer_events.recv().await.unwrap();
    let manual = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.submit_answer("typed in time").await })
    };
    gate.entered.notified().await;

    let forced = orchestrator.handle_timer_expired(expired).await.unwrap();
    assert_eq!(forced, SubmitOutcome::Discarded);

    gate.release.notify_one();
    let outcome = manual.await.unwrap().unwrap();
    assert!(matches!(outcome, SubmitOutcome::Advanced(ref s) if s.answer == "typed in time"));

    // The forced path never touched the next question.
    let replay = orchestrator.handle_timer_expired(expired).await.unwrap();
    assert_eq!(replay, SubmitOutcome::Discarded);
    let session = orchestrator.current().snapshot().unwrap();
    assert_eq!(session.current_index(), 1);
    assert!(!session.questions()[1].is_answered());
}

#[tokio::test(start_paused = true)]
async fn failed_completion_save_can_be_retried() {
    let base = Storage::in_memory();
    let (flaky, storage) = FlakySessions::wrap(&base);
    let candidate_id = seeded_candidate(&storage).await;
    let (orchestrator, _timer_events) =
        orchestrator_with(&storage, Arc::new(ScriptedScorer::new(&[5, 5, 5, 5, 5, 5])));
    orchestrator.start_interview(candidate_id).await.unwrap();
    for _ in 0..5 {
        orchestrator.submit_answer("answer").await.unwrap();
    }

    let err = orchestrator.submit_answer("last").await.unwrap_err();
    assert!(matches!(err, OrchestratorError::Storage(_)));
    let pending = orchestrator.current().snapshot().unwrap();
    assert_eq!(pending.status(), SessionStatus::Active);
    assert!(pending.all_answered());
    assert_eq!(
        storage.sessions.latest_resumable().await.unwrap().unwrap().id(),
        pending.id()
    );

    flaky.heal();
    let completion = orchestrator.complete_pending().await.unwrap().unwrap();
    assert_eq!(completion.total_score, 30);
    assert_eq!(
        orchestrator.current().status(),
        Some(SessionStatus::Completed)
    );
    assert!(storage.sessions.latest_resumable().await.unwrap().is_none());

    // Nothing left to finish.
    assert_eq!(orchestrator.complete_pending().await.unwrap(), None);
}
