use std::env;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Connection settings for an OpenAI-compatible chat completions endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl AiConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Read `INTERVIEW_AI_*` variables. A missing or blank API key yields `None`.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("INTERVIEW_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("INTERVIEW_AI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let model = env::var("INTERVIEW_AI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        let timeout_secs = env::var("INTERVIEW_AI_TIMEOUT_SECS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Some(Self {
            base_url,
            api_key: api_key.trim().to_owned(),
            model,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// A key that is blank after trimming cannot authenticate anything.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.base_url.trim().is_empty()
    }
}

/// Shared, runtime-mutable remote scorer settings.
///
/// Clones share the same slot, so replacing the config is seen by every
/// holder on its next call.
#[derive(Clone, Debug, Default)]
pub struct AiSettings {
    inner: Arc<RwLock<Option<AiConfig>>>,
}

impl AiSettings {
    #[must_use]
    pub fn new(config: Option<AiConfig>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::new(AiConfig::from_env())
    }

    #[must_use]
    pub fn current(&self) -> Option<AiConfig> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, config: Option<AiConfig>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(AiConfig::is_usable)
    }
}
