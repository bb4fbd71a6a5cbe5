use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Top-level view the front end shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewTab {
    /// Candidate-facing interview flow.
    #[default]
    Interviewee,
    /// Interviewer dashboard.
    Interviewer,
}

impl ViewTab {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ViewTab::Interviewee => "interviewee",
            ViewTab::Interviewer => "interviewer",
        }
    }
}

impl fmt::Display for ViewTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for parsing a `ViewTab`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseViewTabError(String);

impl fmt::Display for ParseViewTabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown view tab: {}", self.0)
    }
}

impl std::error::Error for ParseViewTabError {}

impl FromStr for ViewTab {
    type Err = ParseViewTabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interviewee" => Ok(Self::Interviewee),
            "interviewer" => Ok(Self::Interviewer),
            other => Err(ParseViewTabError(other.to_owned())),
        }
    }
}

/// Persisted UI preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiPreferences {
    pub active_tab: ViewTab,
    pub dark_mode: bool,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            active_tab: ViewTab::Interviewee,
            dark_mode: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_interviewee_in_dark_mode() {
        let prefs = UiPreferences::default();
        assert_eq!(prefs.active_tab, ViewTab::Interviewee);
        assert!(prefs.dark_mode);
    }

    #[test]
    fn view_tab_parses_its_own_display() {
        for tab in [ViewTab::Interviewee, ViewTab::Interviewer] {
            assert_eq!(tab.to_string().parse::<ViewTab>().unwrap(), tab);
        }
        assert!("settings".parse::<ViewTab>().is_err());
    }
}
