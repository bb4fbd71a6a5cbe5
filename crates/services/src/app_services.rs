use std::sync::{Arc, Mutex, PoisonError};

use storage::repository::Storage;

use crate::Clock;
use crate::dashboard::DashboardService;
use crate::error::AppServicesError;
use crate::scoring::{AiSettings, ScoringService};
use crate::sessions::{DriverHandle, InterviewOrchestrator, SessionDriver};
use crate::timer::TimerEvents;

/// Assembles app-facing services over one storage backend.
pub struct AppServices {
    storage: Storage,
    ai_settings: AiSettings,
    orchestrator: Arc<InterviewOrchestrator>,
    dashboard: Arc<DashboardService>,
    timer_events: Mutex<Option<TimerEvents>>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the remote scorer.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        ai_settings: AiSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let scoring = ScoringService::remote(ai_settings.clone());
        Ok(Self::with_storage(storage, clock, ai_settings, scoring))
    }

    /// Build services over an existing storage aggregate.
    #[must_use]
    pub fn with_storage(
        storage: Storage,
        clock: Clock,
        ai_settings: AiSettings,
        scoring: ScoringService,
    ) -> Self {
        let (orchestrator, timer_events) = InterviewOrchestrator::new(clock, &storage, scoring);
        let dashboard = DashboardService::new(
            Arc::clone(&storage.candidates),
            Arc::clone(&storage.sessions),
        );
        Self {
            storage,
            ai_settings,
            orchestrator: Arc::new(orchestrator),
            dashboard: Arc::new(dashboard),
            timer_events: Mutex::new(Some(timer_events)),
        }
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn ai_settings(&self) -> &AiSettings {
        &self.ai_settings
    }

    #[must_use]
    pub fn orchestrator(&self) -> Arc<InterviewOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }

    /// Build the session driver. The timer's event stream can be consumed by
    /// only one driver, so this returns `None` after the first call.
    #[must_use]
    pub fn session_driver(&self) -> Option<(SessionDriver, DriverHandle)> {
        let events = self
            .timer_events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()?;
        Some(SessionDriver::new(self.orchestrator(), events))
    }
}
