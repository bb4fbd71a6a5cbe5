#![forbid(unsafe_code)]

pub mod app_services;
pub mod dashboard;
pub mod error;
pub mod scoring;
pub mod sessions;
pub mod timer;

pub use interview_core::Clock;

pub use app_services::AppServices;
pub use dashboard::{DashboardQuery, DashboardService, SortKey};
pub use error::{AppServicesError, OrchestratorError, ScoringError};
pub use scoring::{AiConfig, AiSettings, FallbackScorer, RemoteScorer, Scorer, ScoringService};
pub use sessions::{
    Completion, CurrentSession, DriverHandle, InterviewOrchestrator, ScoredAnswer,
    SessionCommand, SessionDriver, SessionEvent, SubmitOutcome,
};
pub use timer::{QuestionTimer, TimerEvents, TimerExpired};
