mod candidate;
mod ids;
mod preferences;
mod question;
mod session;

pub use ids::{CandidateId, ParseIdError, QuestionId, SessionId};

pub use candidate::{Candidate, CandidateError, ProfileForm, ResumeDetails};
pub use preferences::{ParseViewTabError, UiPreferences, ViewTab};
pub use question::{Answer, Difficulty, MAX_ANSWER_SCORE, Question, QuestionDraft, QuestionError};
pub use session::{Session, SessionProgress, SessionStateError, SessionStatus};
