mod current;
mod driver;
mod orchestrator;

// Public API of the session subsystem.
pub use crate::error::OrchestratorError;
pub use current::CurrentSession;
pub use driver::{DriverHandle, SessionCommand, SessionDriver, SessionEvent};
pub use orchestrator::{Completion, InterviewOrchestrator, ScoredAnswer, SubmitOutcome};
