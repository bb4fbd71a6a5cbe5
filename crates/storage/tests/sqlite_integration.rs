use chrono::Duration;
use interview_core::model::{
    Candidate, CandidateId, Difficulty, QuestionDraft, ResumeDetails, Session, SessionId,
    SessionStatus, UiPreferences, ViewTab,
};
use interview_core::time::fixed_now;
use storage::repository::{
    CandidateRepository, SessionRepository, StorageError, UiPreferencesRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_candidate() -> Candidate {
    Candidate::from_resume(
        CandidateId::generate(),
        ResumeDetails {
            name: "Grace Hopper".into(),
            email: "grace@example.com".into(),
            phone: "+1 555 000 1111".into(),
            text: "COBOL, compilers".into(),
        },
        fixed_now(),
    )
}

fn build_session(candidate: &Candidate, offset_secs: i64) -> Session {
    let drafts = vec![
        QuestionDraft::new("What is ownership?", Difficulty::Easy, 20),
        QuestionDraft::new("Explain Send and Sync.", Difficulty::Medium, 60),
        QuestionDraft::new("Design a lock-free queue.", Difficulty::Hard, 120),
    ];
    Session::from_drafts(
        SessionId::generate(),
        candidate.id(),
        drafts,
        fixed_now() + Duration::seconds(offset_secs),
    )
    .unwrap()
}

fn answer_current(session: &mut Session, text: &str, score: Option<u8>) {
    let id = session.current_question().unwrap().id().clone();
    session
        .submit_answer(&id, text, score, Some(format!("feedback for {id}")), fixed_now())
        .unwrap();
    session.advance().unwrap();
}

#[tokio::test]
async fn sqlite_roundtrips_paused_session_losslessly() {
    let repo = connect("memdb_session_roundtrip").await;
    let candidate = build_candidate();
    repo.upsert_candidate(&candidate).await.unwrap();

    let mut session = build_session(&candidate, 0);
    answer_current(&mut session, "Each value has one owner.", Some(8));
    answer_current(&mut session, "", None);
    session.pause().unwrap();
    repo.save_session(&session).await.unwrap();

    let fetched = repo.get_session(session.id()).await.unwrap();
    assert_eq!(fetched, session);
    assert_eq!(fetched.current_index(), 2);
    assert_eq!(fetched.questions()[1].answer().unwrap().text, "");
    assert_eq!(fetched.questions()[1].score(), None);

    let resumable = repo.latest_resumable().await.unwrap().unwrap();
    assert_eq!(resumable.id(), session.id());
    assert_eq!(resumable.status(), SessionStatus::Paused);
}

#[tokio::test]
async fn sqlite_keeps_completed_sessions_immutable() {
    let repo = connect("memdb_session_immutable").await;
    let candidate = build_candidate();
    repo.upsert_candidate(&candidate).await.unwrap();

    let mut session = build_session(&candidate, 0);
    for score in [7, 9, 4] {
        answer_current(&mut session, "answer", Some(score));
    }
    session.complete(20, "Solid overall.", fixed_now()).unwrap();
    repo.save_session(&session).await.unwrap();
    repo.save_session(&session).await.unwrap();

    let reopened = Session::from_persisted(
        session.id(),
        session.candidate_id(),
        build_session(&candidate, 0).questions().to_vec(),
        0,
        SessionStatus::Active,
        session.started_at(),
        None,
        None,
        None,
    )
    .unwrap();
    let err = repo.save_session(&reopened).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let fetched = repo.get_session(session.id()).await.unwrap();
    assert_eq!(fetched.total_score(), Some(20));
    assert!(repo.latest_resumable().await.unwrap().is_none());
}

#[tokio::test]
async fn sqlite_lists_sessions_per_candidate_in_start_order() {
    let repo = connect("memdb_session_listing").await;
    let first = build_candidate();
    let second = build_candidate();
    repo.upsert_candidate(&first).await.unwrap();
    repo.upsert_candidate(&second).await.unwrap();

    let older = build_session(&first, 0);
    let newer = build_session(&first, 60);
    let other = build_session(&second, 30);
    for s in [&newer, &other, &older] {
        repo.save_session(s).await.unwrap();
    }

    let for_first = repo.list_sessions_for_candidate(first.id()).await.unwrap();
    let ids: Vec<_> = for_first.iter().map(Session::id).collect();
    assert_eq!(ids, vec![older.id(), newer.id()]);

    assert_eq!(repo.list_sessions().await.unwrap().len(), 3);
    let latest = repo.latest_resumable().await.unwrap().unwrap();
    assert_eq!(latest.id(), newer.id());
}

#[tokio::test]
async fn sqlite_roundtrips_candidates_and_preferences() {
    let repo = connect("memdb_candidates_prefs").await;
    let mut candidate = build_candidate();
    repo.upsert_candidate(&candidate).await.unwrap();

    candidate.record_result(43, "Strong candidate.");
    repo.upsert_candidate(&candidate).await.unwrap();

    let fetched = repo.get_candidate(candidate.id()).await.unwrap();
    assert_eq!(fetched, candidate);
    assert!(matches!(
        repo.get_candidate(CandidateId::generate()).await,
        Err(StorageError::NotFound)
    ));

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
