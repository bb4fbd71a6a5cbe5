use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use interview_core::model::{Candidate, CandidateId, MAX_ANSWER_SCORE, Session, SessionStatus};
use storage::repository::{CandidateRepository, SessionRepository, StorageError};

/// Score the dashboard assumes when a candidate has no completed session.
const REFERENCE_MAX_SCORE: u32 = 6 * MAX_ANSWER_SCORE as u32;

//
// ─── QUERY TYPES ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    /// Highest final score first.
    #[default]
    Score,
    /// Alphabetical by name.
    Name,
    /// Newest candidate first.
    Date,
}

impl SortKey {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Score => "score",
            SortKey::Name => "name",
            SortKey::Date => "date",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "score" => Ok(Self::Score),
            "name" => Ok(Self::Name),
            "date" => Ok(Self::Date),
            other => Err(format!("unknown sort key: {other} (expected score, name or date)")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardQuery {
    /// Case-insensitive substring of name or email.
    pub search: Option<String>,
    pub sort: SortKey,
}

//
// ─── ROWS ──────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterviewStatus {
    Completed,
    InProgress,
    NotStarted,
}

impl InterviewStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            InterviewStatus::Completed => "Completed",
            InterviewStatus::InProgress => "In Progress",
            InterviewStatus::NotStarted => "Not Started",
        }
    }
}

/// Coarse rating of a final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreBand {
    Strong,
    Moderate,
    Weak,
}

impl ScoreBand {
    /// At least 75% is strong and at least 50% is moderate (45 and 30 out of 60).
    #[must_use]
    pub fn classify(score: u32, max_score: u32) -> Self {
        if max_score == 0 {
            return ScoreBand::Weak;
        }
        let scaled = u64::from(score) * 100;
        let max = u64::from(max_score);
        if scaled >= max * 75 {
            ScoreBand::Strong
        } else if scaled >= max * 50 {
            ScoreBand::Moderate
        } else {
            ScoreBand::Weak
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreBand::Strong => "strong",
            ScoreBand::Moderate => "moderate",
            ScoreBand::Weak => "weak",
        }
    }
}

/// One row of the interviewer dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    pub candidate_id: CandidateId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: InterviewStatus,
    /// Zero when no interview has completed.
    pub score: u32,
    pub max_score: u32,
    pub band: ScoreBand,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    /// Rounded mean of row scores.
    pub average_score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub rows: Vec<CandidateRow>,
    pub stats: DashboardStats,
}

/// Full record of one candidate for the detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateDetail {
    pub candidate: Candidate,
    /// Latest session, with every question, answer, score and feedback.
    pub latest_session: Option<Session>,
    pub session_count: usize,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Read-only queries for the interviewer tab.
#[derive(Clone)]
pub struct DashboardService {
    candidates: Arc<dyn CandidateRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        candidates: Arc<dyn CandidateRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            candidates,
            sessions,
        }
    }

    /// Filtered, sorted candidate rows with aggregate stats.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if candidates or sessions cannot be loaded.
    pub async fn list(&self, query: &DashboardQuery) -> Result<DashboardView, StorageError> {
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut rows = Vec::new();
        for candidate in self.candidates.list_candidates().await? {
            if let Some(needle) = &needle {
                let hit = candidate.name().to_lowercase().contains(needle)
                    || candidate.email().to_lowercase().contains(needle);
                if !hit {
                    continue;
                }
            }
            let sessions = self
                .sessions
                .list_sessions_for_candidate(candidate.id())
                .await?;
            rows.push(build_row(&candidate, sessions.last()));
        }

        rows.sort_by(|a, b| compare_rows(a, b, query.sort));
        let stats = stats_for(&rows);
        Ok(DashboardView { rows, stats })
    }

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for an unknown candidate.
    pub async fn detail(&self, id: CandidateId) -> Result<CandidateDetail, StorageError> {
        let candidate = self.candidates.get_candidate(id).await?;
        let mut sessions = self.sessions.list_sessions_for_candidate(id).await?;
        let session_count = sessions.len();
        Ok(CandidateDetail {
            candidate,
            latest_session: sessions.pop(),
            session_count,
        })
    }
}

fn build_row(candidate: &Candidate, latest: Option<&Session>) -> CandidateRow {
    let status = match latest.map(Session::status) {
        Some(SessionStatus::Active | SessionStatus::Paused) => InterviewStatus::InProgress,
        Some(SessionStatus::Completed) => InterviewStatus::Completed,
        None if candidate.interview_complete() => InterviewStatus::Completed,
        None => InterviewStatus::NotStarted,
    };
    let score = latest
        .and_then(Session::total_score)
        .or_else(|| candidate.final_score())
        .unwrap_or(0);
    let max_score = latest
        .filter(|s| s.is_completed())
        .map_or(REFERENCE_MAX_SCORE, Session::max_score);
    let summary = latest
        .and_then(Session::summary)
        .or_else(|| candidate.summary())
        .map(str::to_owned);

    CandidateRow {
        candidate_id: candidate.id(),
        name: candidate.name().to_owned(),
        email: candidate.email().to_owned(),
        phone: candidate.phone().to_owned(),
        status,
        score,
        max_score,
        band: ScoreBand::classify(score, max_score),
        summary,
        created_at: candidate.created_at(),
    }
}

fn compare_rows(a: &CandidateRow, b: &CandidateRow, sort: SortKey) -> Ordering {
    match sort {
        SortKey::Score => b.score.cmp(&a.score),
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::Date => b.created_at.cmp(&a.created_at),
    }
}

fn stats_for(rows: &[CandidateRow]) -> DashboardStats {
    if rows.is_empty() {
        return DashboardStats::default();
    }
    let total = rows.len();
    let sum: u64 = rows.iter().map(|r| u64::from(r.score)).sum();
    let count = u64::try_from(total).unwrap_or(u64::MAX);
    let average = (sum + count / 2) / count;
    DashboardStats {
        total,
        completed: rows
            .iter()
            .filter(|r| r.status == InterviewStatus::Completed)
            .count(),
        in_progress: rows
            .iter()
            .filter(|r| r.status == InterviewStatus::InProgress)
            .count(),
        average_score: u32::try_from(average).unwrap_or(u32::MAX),
    }
}
