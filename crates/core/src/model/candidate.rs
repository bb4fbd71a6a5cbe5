use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use thiserror::Error;

use crate::model::ids::CandidateId;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern should compile")
});
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\d\s\-()+]{10,}$").expect("phone pattern should compile")
});

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CandidateError {
    #[error("name is required")]
    MissingName,

    #[error("email is required")]
    MissingEmail,

    #[error("please enter a valid email address")]
    InvalidEmail,

    #[error("phone number is required")]
    MissingPhone,

    #[error("please enter a valid phone number")]
    InvalidPhone,

    #[error("invalid persisted candidate: {0}")]
    InvalidPersistedState(String),
}

//
// ─── INPUTS ────────────────────────────────────────────────────────────────────
//

/// Contact details and raw text extracted from an uploaded resume.
///
/// Any field may be blank when the parser could not find it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub text: String,
}

/// Profile fields entered by the candidate when the resume was incomplete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl ProfileForm {
    /// Validate every field, reporting the first failure.
    ///
    /// # Errors
    ///
    /// Returns the `CandidateError` for the first missing or malformed field.
    pub fn validate(&self) -> Result<(), CandidateError> {
        if self.name.trim().is_empty() {
            return Err(CandidateError::MissingName);
        }
        let email = self.email.trim();
        if email.is_empty() {
            return Err(CandidateError::MissingEmail);
        }
        if !EMAIL_RE.is_match(email) {
            return Err(CandidateError::InvalidEmail);
        }
        let phone = self.phone.trim();
        if phone.is_empty() {
            return Err(CandidateError::MissingPhone);
        }
        if !PHONE_RE.is_match(phone) {
            return Err(CandidateError::InvalidPhone);
        }
        Ok(())
    }
}

//
// ─── CANDIDATE ─────────────────────────────────────────────────────────────────
//

/// A person taking interviews, with the outcome of their latest one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    id: CandidateId,
    name: String,
    email: String,
    phone: String,
    resume_text: Option<String>,
    profile_complete: bool,
    interview_complete: bool,
    final_score: Option<u32>,
    summary: Option<String>,
    created_at: DateTime<Utc>,
}

impl Candidate {
    /// Build a candidate from parsed resume details.
    ///
    /// The profile counts as complete only when name, email and phone were
    /// all found in the resume.
    #[must_use]
    pub fn from_resume(id: CandidateId, resume: ResumeDetails, created_at: DateTime<Utc>) -> Self {
        let name = resume.name.trim().to_owned();
        let email = resume.email.trim().to_owned();
        let phone = resume.phone.trim().to_owned();
        let profile_complete = !name.is_empty() && !email.is_empty() && !phone.is_empty();
        let resume_text = Some(resume.text).filter(|t| !t.trim().is_empty());

        Self {
            id,
            name,
            email,
            phone,
            resume_text,
            profile_complete,
            interview_complete: false,
            final_score: None,
            summary: None,
            created_at,
        }
    }

    /// Rehydrate a candidate from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `CandidateError::InvalidPersistedState` if the interview is
    /// marked complete without a final score.
    #[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
    pub fn from_persisted(
        id: CandidateId,
        name: String,
        email: String,
        phone: String,
        resume_text: Option<String>,
        profile_complete: bool,
        interview_complete: bool,
        final_score: Option<u32>,
        summary: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CandidateError> {
        if interview_complete && final_score.is_none() {
            return Err(CandidateError::InvalidPersistedState(
                "interview complete without final score".into(),
            ));
        }
        Ok(Self {
            id,
            name,
            email,
            phone,
            resume_text,
            profile_complete,
            interview_complete,
            final_score,
            summary,
            created_at,
        })
    }

    /// Fill in the profile from the form and mark it complete.
    ///
    /// # Errors
    ///
    /// Returns `CandidateError` if the form fails validation; the candidate
    /// is left unchanged.
    pub fn complete_profile(&mut self, form: &ProfileForm) -> Result<(), CandidateError> {
        form.validate()?;
        self.name = form.name.trim().to_owned();
        self.email = form.email.trim().to_owned();
        self.phone = form.phone.trim().to_owned();
        self.profile_complete = true;
        Ok(())
    }

    /// Interviews start only for a complete profile with resume text on file.
    #[must_use]
    pub fn can_start_interview(&self) -> bool {
        self.profile_complete && self.resume_text.is_some()
    }

    /// Store the outcome of a completed interview.
    pub fn record_result(&mut self, final_score: u32, summary: impl Into<String>) {
        self.interview_complete = true;
        self.final_score = Some(final_score);
        self.summary = Some(summary.into());
    }

    #[must_use]
    pub fn id(&self) -> CandidateId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn phone(&self) -> &str {
        &self.phone
    }

    #[must_use]
    pub fn resume_text(&self) -> Option<&str> {
        self.resume_text.as_deref()
    }

    #[must_use]
    pub fn profile_complete(&self) -> bool {
        self.profile_complete
    }

    #[must_use]
    pub fn interview_complete(&self) -> bool {
        self.interview_complete
    }

    #[must_use]
    pub fn final_score(&self) -> Option<u32> {
        self.final_score
    }

    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
