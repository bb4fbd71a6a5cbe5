use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{
    CandidateRepository, SessionRepository, Storage, UiPreferencesRepository,
};

mod candidate_repo;
mod mapping;
mod migrate;
mod preferences_repo;
mod session_repo;

/// Session store on a single `SQLite` file. One pool serves the session,
/// candidate and preference repositories.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

/// Failure while opening or migrating the session store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error("cannot open session store at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("session store schema migration failed: {0}")]
    Migration(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Open the session store. Every pooled connection enforces foreign keys
    /// (answers belong to sessions, sessions to candidates) and runs in WAL
    /// mode so the dashboard can read while an interview writes.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError::Connect` if the file cannot be opened or a
    /// connection pragma is refused.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    for pragma in [
                        "PRAGMA foreign_keys = ON;",
                        "PRAGMA journal_mode = WAL;",
                        "PRAGMA busy_timeout = 5000;",
                    ] {
                        sqlx::query(pragma).execute(&mut *conn).await?;
                    }
                    Ok(())
                })
            })
            .connect(database_url)
            .await
            .map_err(|source| SqliteInitError::Connect {
                url: database_url.to_owned(),
                source,
            })?;
        Ok(Self { pool })
    }

    /// Bring the candidate, session, answer and preference tables up to the
    /// latest schema version.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError::Migration` if a schema step fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Open and migrate the session store, then hand the same pool to all
    /// three repositories.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the store cannot be opened or migrated.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let sessions: Arc<dyn SessionRepository> = Arc::new(repo.clone());
        let candidates: Arc<dyn CandidateRepository> = Arc::new(repo.clone());
        let preferences: Arc<dyn UiPreferencesRepository> = Arc::new(repo);
        Ok(Self {
            sessions,
            candidates,
            preferences,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_store_can_back_shared_repositories() {
        fn assert_shareable<T: Clone + Send + Sync + 'static>() {}
        assert_shareable::<SqliteRepository>();
    }

    #[tokio::test]
    async fn unreachable_store_reports_its_url() {
        let url = "sqlite:///nonexistent-dir/for-sure/interview.sqlite3";
        let Err(err) = SqliteRepository::connect(url).await else {
            panic!("opening a file in a missing directory should fail");
        };
        assert!(matches!(err, SqliteInitError::Connect { .. }));
        assert!(err.to_string().contains("nonexistent-dir/for-sure"));
    }
}
