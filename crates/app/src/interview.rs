use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use interview_core::model::{
    Candidate, CandidateError, CandidateId, ProfileForm, ResumeDetails, Session, SessionStatus,
    ViewTab,
};
use services::{AppServices, Clock, SessionCommand, SessionEvent};
use storage::repository::CandidateRepository;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

type Input = Lines<BufReader<Stdin>>;

/// Seconds-left marks announced while a question is open.
const COUNTDOWN_MARKS: [u32; 2] = [10, 5];

#[derive(Debug, Default, Args)]
pub struct InterviewArgs {
    /// Interview a candidate already on file.
    #[arg(long, conflicts_with_all = ["resume", "name", "email", "phone"])]
    candidate: Option<CandidateId>,

    /// Plain-text resume for a new candidate.
    #[arg(long)]
    resume: Option<PathBuf>,

    #[arg(long)]
    name: Option<String>,

    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    phone: Option<String>,
}

/// Run one interview over stdin/stdout.
///
/// A paused or unfinished session is offered first; otherwise a candidate is
/// selected or created and a new session starts.
///
/// # Errors
///
/// Returns an error if stdin closes during setup or the session store fails.
pub async fn run(services: &AppServices, args: InterviewArgs) -> Result<()> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let orchestrator = services.orchestrator();

    match orchestrator.restore().await? {
        Some(session) if session.status() == SessionStatus::Completed => {
            print_report(&session);
            return Ok(());
        }
        Some(session) if session.status() == SessionStatus::Paused => {
            println!(
                "A paused interview is waiting at question {} of {}.",
                session.current_index() + 1,
                session.questions().len()
            );
            if !confirm(&mut input, "Resume it? [Y/n] ").await? {
                println!("Leaving it paused.");
                return Ok(());
            }
            if let Some(completion) = orchestrator.resume().await? {
                println!("Interview complete: {}/{}", completion.total_score, completion.max_score);
                println!("{}", completion.summary);
                return Ok(());
            }
        }
        Some(session) => {
            if args.candidate.is_some() || args.resume.is_some() {
                warn!(session_id = %session.id(), "unfinished interview takes priority over new candidate");
            }
            println!(
                "Continuing the unfinished interview at question {} of {}.",
                session.current_index() + 1,
                session.questions().len()
            );
        }
        None => {
            let candidate_id = select_candidate(services, &mut input, args).await?;
            println!("Preparing questions...");
            orchestrator.start_interview(candidate_id).await?;
        }
    }

    drive(services, &mut input).await
}

async fn select_candidate(
    services: &AppServices,
    input: &mut Input,
    args: InterviewArgs,
) -> Result<CandidateId> {
    let candidates = &services.storage().candidates;
    if let Some(id) = args.candidate {
        let candidate = candidates
            .get_candidate(id)
            .await
            .with_context(|| format!("loading candidate {id}"))?;
        println!("Interviewing {}.", candidate.name());
        return Ok(id);
    }

    let text = match &args.resume {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading resume {}", path.display()))?,
        None => prompt(input, "Paste a one-line resume summary: ").await?,
    };

    let mut form = ProfileForm {
        name: args.name.unwrap_or_default(),
        email: args.email.unwrap_or_default(),
        phone: args.phone.unwrap_or_default(),
    };
    // Ask only for the fields that are missing or malformed.
    while let Err(err) = form.validate() {
        if !(form.name.is_empty() && form.email.is_empty() && form.phone.is_empty()) {
            println!("{err}");
        }
        let (field, label) = match err {
            CandidateError::MissingName => (&mut form.name, "Full name: "),
            CandidateError::MissingEmail | CandidateError::InvalidEmail => {
                (&mut form.email, "Email: ")
            }
            CandidateError::MissingPhone | CandidateError::InvalidPhone => {
                (&mut form.phone, "Phone: ")
            }
            other => bail!(other),
        };
        *field = prompt(input, label).await?;
    }

    let resume = ResumeDetails {
        name: form.name.clone(),
        email: form.email.clone(),
        phone: form.phone.clone(),
        text,
    };
    let mut candidate =
        Candidate::from_resume(CandidateId::generate(), resume, Clock::default_clock().now());
    candidate.complete_profile(&form)?;
    if !candidate.can_start_interview() {
        bail!("a resume is required before the interview can start");
    }
    candidates.upsert_candidate(&candidate).await?;
    info!(candidate_id = %candidate.id(), "candidate created");
    Ok(candidate.id())
}

//
// ─── SESSION LOOP ──────────────────────────────────────────────────────────────
//

async fn drive(services: &AppServices, input: &mut Input) -> Result<()> {
    let Some((driver, handle)) = services.session_driver() else {
        bail!("the session driver is already running");
    };
    let mut events = handle.subscribe();
    let mut remaining = services.orchestrator().remaining_seconds();
    let running = tokio::spawn(driver.run());

    println!(
        "Type your answer; an empty line submits it. Commands: :pause :resume :finish :view <tab> :quit"
    );
    let mut draft = DraftBuffer::default();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(SessionEvent::Completed(completion)) => {
                    println!();
                    println!("Interview complete: {}/{}", completion.total_score, completion.max_score);
                    println!("{}", completion.summary);
                    break;
                }
                Ok(event) => {
                    draft.observe(&event);
                    render(&event);
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "missed session events"),
                Err(RecvError::Closed) => break,
            },
            line = input.next_line() => {
                let Some(line) = line? else {
                    println!("Input closed; pausing the interview.");
                    handle.send(SessionCommand::Pause).await;
                    break;
                };
                match line.trim() {
                    ":quit" => {
                        handle.send(SessionCommand::Pause).await;
                        println!("Interview paused. Run the interview again to resume.");
                        break;
                    }
                    ":pause" => {
                        handle.send(SessionCommand::Pause).await;
                    }
                    ":resume" => {
                        handle.send(SessionCommand::Resume).await;
                    }
                    ":finish" => {
                        handle.send(SessionCommand::Finish).await;
                    }
                    cmd if cmd.starts_with(":view") => {
                        match cmd.trim_start_matches(":view").trim().parse::<ViewTab>() {
                            Ok(tab) => {
                                handle.send(SessionCommand::SwitchView(tab)).await;
                            }
                            Err(err) => println!("! {err}"),
                        }
                    }
                    "" => {
                        handle.send(draft.submit()).await;
                    }
                    _ => {
                        handle.send(draft.push_line(&line)).await;
                    }
                }
            },
            Ok(()) = remaining.changed() => {
                let secs = *remaining.borrow_and_update();
                if COUNTDOWN_MARKS.contains(&secs) {
                    println!("({secs}s left)");
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Interrupted; pausing the interview.");
                handle.send(SessionCommand::Pause).await;
                break;
            }
        }
    }

    handle.send(SessionCommand::Shutdown).await;
    running.await?;
    Ok(())
}

/// Lines typed for the open question.
///
/// Cleared only when the driver reports the answer as scored or a new
/// question opens; a rejected submit keeps the text.
#[derive(Debug, Default)]
struct DraftBuffer {
    text: String,
}

impl DraftBuffer {
    fn push_line(&mut self, line: &str) -> SessionCommand {
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(line);
        SessionCommand::Draft(self.text.clone())
    }

    fn submit(&self) -> SessionCommand {
        SessionCommand::Submit(self.text.clone())
    }

    fn observe(&mut self, event: &SessionEvent) {
        if matches!(
            event,
            SessionEvent::AnswerScored(_) | SessionEvent::QuestionStarted { .. }
        ) {
            self.text.clear();
        }
    }
}

fn render(event: &SessionEvent) {
    match event {
        SessionEvent::QuestionStarted {
            index,
            total,
            text,
            difficulty,
            time_limit_secs,
            ..
        } => {
            println!();
            println!("Question {}/{total} [{difficulty}, {time_limit_secs}s]", index + 1);
            println!("{text}");
        }
        SessionEvent::AnswerScored(scored) => {
            let how = if scored.forced { "time is up" } else { "submitted" };
            println!(
                "Answer {} {how}: {}/10. {}",
                scored.index + 1,
                scored.score,
                scored.feedback
            );
        }
        SessionEvent::Completed(completion) => {
            println!("Interview complete: {}/{}", completion.total_score, completion.max_score);
        }
        SessionEvent::Paused => {
            println!("Paused. Type :resume to continue; the question restarts with its full time.");
        }
        SessionEvent::Resumed => println!("Resumed."),
        SessionEvent::Rejected { reason } => println!("! {reason}"),
        SessionEvent::ViewChanged(tab) => println!("Active view: {tab}"),
    }
}

fn print_report(session: &Session) {
    println!(
        "The last interview is complete: {}/{}",
        session.total_score().unwrap_or_else(|| session.computed_total()),
        session.max_score()
    );
    if let Some(summary) = session.summary() {
        println!("{summary}");
    }
}

async fn prompt(input: &mut Input, label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let line = input
        .next_line()
        .await?
        .context("input closed before the interview started")?;
    Ok(line.trim().to_owned())
}

async fn confirm(input: &mut Input, label: &str) -> Result<bool> {
    let answer = prompt(input, label).await?;
    Ok(!matches!(answer.to_ascii_lowercase().as_str(), "n" | "no"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use interview_core::model::QuestionId;
    use services::ScoredAnswer;

    #[test]
    fn rejected_submit_keeps_the_typed_draft() {
        let mut draft = DraftBuffer::default();
        draft.push_line("Ownership moves values");
        assert_eq!(
            draft.submit(),
            SessionCommand::Submit("Ownership moves values".into())
        );

        draft.observe(&SessionEvent::Rejected {
            reason: "an answer is already being scored".into(),
        });
        assert_eq!(
            draft.push_line("and borrows check aliasing"),
            SessionCommand::Draft("Ownership moves values\nand borrows check aliasing".into())
        );
    }

    #[test]
    fn scored_answer_clears_the_draft() {
        let mut draft = DraftBuffer::default();
        draft.push_line("first answer");
        draft.observe(&SessionEvent::AnswerScored(ScoredAnswer {
            index: 0,
            question_id: QuestionId::for_position(0),
            answer: "first answer".into(),
            score: 7,
            feedback: "ok".into(),
            forced: false,
        }));
        assert_eq!(draft.push_line("next"), SessionCommand::Draft("next".into()));
    }
}
