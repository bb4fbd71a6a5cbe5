use async_trait::async_trait;
use interview_core::model::{UiPreferences, ViewTab};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{StorageError, UiPreferencesRepository};

#[async_trait]
impl UiPreferencesRepository for SqliteRepository {
    async fn load_preferences(&self) -> Result<UiPreferences, StorageError> {
        let row = sqlx::query("SELECT active_tab, dark_mode FROM ui_preferences WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(UiPreferences::default());
        };

        let active_tab: ViewTab = row
            .try_get::<String, _>("active_tab")
            .map_err(ser)?
            .parse()
            .map_err(ser)?;
        Ok(UiPreferences {
            active_tab,
            dark_mode: row.try_get("dark_mode").map_err(ser)?,
        })
    }

    async fn save_preferences(&self, prefs: &UiPreferences) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO ui_preferences (id, active_tab, dark_mode)
                VALUES (1, ?1, ?2)
                ON CONFLICT(id) DO UPDATE SET
                    active_tab = excluded.active_tab,
                    dark_mode = excluded.dark_mode
            ",
        )
        .bind(prefs.active_tab.as_str())
        .bind(prefs.dark_mode)
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }
}
