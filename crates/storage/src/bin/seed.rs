use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use interview_core::model::{
    Candidate, CandidateId, Difficulty, QuestionDraft, ResumeDetails, Session, SessionId,
};
use storage::repository::Storage;

/// Seed a database with demo candidates and completed interviews.
#[derive(Debug, Parser)]
#[command(name = "seed")]
struct Args {
    /// `SQLite` URL to seed.
    #[arg(long = "db", env = "INTERVIEW_DB_URL", default_value = "sqlite:dev.sqlite3?mode=rwc")]
    db_url: String,

    /// Number of demo candidates to create.
    #[arg(long, env = "INTERVIEW_SEED_CANDIDATES", default_value_t = 3)]
    candidates: u32,

    /// Fixed current time (RFC 3339) for deterministic seeding.
    #[arg(long, value_parser = parse_rfc3339)]
    now: Option<DateTime<Utc>>,
}

fn parse_rfc3339(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| format!("expected RFC3339 timestamp, got {raw}"))
}

const PEOPLE: [(&str, &str, &str); 4] = [
    ("Ada Lovelace", "ada@example.com", "+44 20 7946 0001"),
    ("Alan Turing", "alan@example.com", "+44 20 7946 0002"),
    ("Grace Hopper", "grace@example.com", "+1 555 010 0003"),
    ("Linus Torvalds", "linus@example.com", "+358 40 123 4567"),
];

fn sample_drafts() -> Vec<QuestionDraft> {
    [
        ("What are the key features of React?", Difficulty::Easy),
        ("Explain the difference between props and state.", Difficulty::Easy),
        ("How would you optimize a slow React app?", Difficulty::Medium),
        ("Describe the Node.js event loop.", Difficulty::Medium),
        ("Design a microservices e-commerce backend.", Difficulty::Hard),
        ("Build a real-time chat with WebSockets.", Difficulty::Hard),
    ]
    .into_iter()
    .map(|(text, difficulty)| QuestionDraft::new(text, difficulty, difficulty.default_time_limit()))
    .collect()
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    for i in 0..args.candidates {
        let idx = usize::try_from(i)?;
        let (name, email, phone) = PEOPLE[idx % PEOPLE.len()];
        let started_at = now - Duration::days(i64::from(i)) - Duration::minutes(15);
        let mut candidate = Candidate::from_resume(
            CandidateId::generate(),
            ResumeDetails {
                name: name.into(),
                email: email.into(),
                phone: phone.into(),
                text: format!("{name} - software engineer"),
            },
            started_at,
        );
        storage.candidates.upsert_candidate(&candidate).await?;

        let mut session = Session::from_drafts(
            SessionId::generate(),
            candidate.id(),
            sample_drafts(),
            started_at,
        )?;
        let mut answered_at = started_at;
        while let Some(question) = session.current_question() {
            let id = question.id().clone();
            let score = u8::try_from((idx * 3 + session.current_index()) % 6 + 4)?;
            answered_at += Duration::seconds(i64::from(question.time_limit_secs() / 2));
            session.submit_answer(
                &id,
                "Seeded answer",
                Some(score),
                Some("Seeded feedback".into()),
                answered_at,
            )?;
            session.advance()?;
        }
        let total = session.computed_total();
        let summary = format!("{name} finished the seeded interview with {total} points.");
        session.complete(total, summary.clone(), answered_at)?;
        storage.sessions.save_session(&session).await?;

        candidate.record_result(total, summary);
        storage.candidates.upsert_candidate(&candidate).await?;
    }

    println!(
        "Seeded {} candidates with completed interviews into {}",
        args.candidates, args.db_url
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
