use anyhow::{Context, Result};
use clap::Args;
use interview_core::model::CandidateId;
use services::dashboard::{CandidateDetail, DashboardView};
use services::{AppServices, DashboardQuery, SortKey};

#[derive(Debug, Args)]
pub struct DashboardArgs {
    /// Case-insensitive filter on name or email.
    #[arg(long)]
    search: Option<String>,

    /// Row order: score, name or date.
    #[arg(long, default_value_t = SortKey::Score)]
    sort: SortKey,

    /// Show one candidate's latest transcript instead of the list.
    #[arg(long, conflicts_with_all = ["search", "sort"])]
    candidate: Option<CandidateId>,
}

/// # Errors
///
/// Returns an error if the session store cannot be read.
pub async fn run(services: &AppServices, args: DashboardArgs) -> Result<()> {
    let dashboard = services.dashboard();
    if let Some(id) = args.candidate {
        let detail = dashboard
            .detail(id)
            .await
            .with_context(|| format!("loading candidate {id}"))?;
        print_detail(&detail);
        return Ok(());
    }

    let query = DashboardQuery {
        search: args.search,
        sort: args.sort,
    };
    let view = dashboard.list(&query).await?;
    print_list(&view);
    Ok(())
}

fn print_list(view: &DashboardView) {
    if view.rows.is_empty() {
        println!("No candidates found.");
        return;
    }
    println!(
        "{:<22} {:<28} {:<12} {:>7} {:<9} ID",
        "NAME", "EMAIL", "STATUS", "SCORE", "BAND"
    );
    for row in &view.rows {
        println!(
            "{:<22} {:<28} {:<12} {:>7} {:<9} {}",
            truncate(&row.name, 22),
            truncate(&row.email, 28),
            row.status.label(),
            format!("{}/{}", row.score, row.max_score),
            row.band.as_str(),
            row.candidate_id
        );
    }
    let stats = &view.stats;
    println!();
    println!(
        "{} candidates, {} completed, {} in progress, average score {}",
        stats.total, stats.completed, stats.in_progress, stats.average_score
    );
}

fn print_detail(detail: &CandidateDetail) {
    let candidate = &detail.candidate;
    println!("{} <{}> {}", candidate.name(), candidate.email(), candidate.phone());
    println!("Added {}", candidate.created_at().format("%Y-%m-%d %H:%M"));
    match candidate.final_score() {
        Some(score) => println!("Final score: {score}"),
        None => println!("No completed interview yet."),
    }
    if let Some(summary) = candidate.summary() {
        println!("{summary}");
    }

    let Some(session) = &detail.latest_session else {
        return;
    };
    println!();
    println!(
        "Latest of {} session(s): {} ({})",
        detail.session_count,
        session.id(),
        session.status()
    );
    for (i, question) in session.questions().iter().enumerate() {
        println!();
        println!(
            "Q{} [{}, {}s] {}",
            i + 1,
            question.difficulty(),
            question.time_limit_secs(),
            question.text()
        );
        match question.answer() {
            Some(answer) => {
                let text = if answer.text.is_empty() { "(no answer)" } else { answer.text.as_str() };
                println!("  A: {text}");
                if let Some(score) = answer.score {
                    println!("  Score: {score}/10");
                }
                if let Some(feedback) = &answer.feedback {
                    println!("  Feedback: {feedback}");
                }
            }
            None => println!("  (unanswered)"),
        }
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_owned();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}
