use async_trait::async_trait;
use interview_core::model::{CandidateId, Session, SessionId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    candidate_id_from_str, conn, i64_from_usize, map_question_row, ser, session_id_from_str,
    status_from_str, u32_from_i64, usize_from_i64,
};
use crate::repository::{SessionRepository, StorageError, check_overwrite};

const SESSION_COLUMNS: &str = r"
    id, candidate_id, current_index, status,
    started_at, ended_at, total_score, summary
";

impl SqliteRepository {
    async fn load_session(
        &self,
        row: &sqlx::sqlite::SqliteRow,
    ) -> Result<Session, StorageError> {
        let id = session_id_from_str(&row.try_get::<String, _>("id").map_err(ser)?)?;
        let candidate_id =
            candidate_id_from_str(&row.try_get::<String, _>("candidate_id").map_err(ser)?)?;
        let current_index = usize_from_i64(
            "current_index",
            row.try_get::<i64, _>("current_index").map_err(ser)?,
        )?;
        let status = status_from_str(&row.try_get::<String, _>("status").map_err(ser)?)?;
        let total_score = row
            .try_get::<Option<i64>, _>("total_score")
            .map_err(ser)?
            .map(|v| u32_from_i64("total_score", v))
            .transpose()?;

        let question_rows = sqlx::query(
            r"
                SELECT
                    question_id, text, difficulty, time_limit_secs,
                    answer_text, score, feedback, answered_at
                FROM session_questions
                WHERE session_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let questions = question_rows
            .iter()
            .map(map_question_row)
            .collect::<Result<Vec<_>, _>>()?;

        Session::from_persisted(
            id,
            candidate_id,
            questions,
            current_index,
            status,
            row.try_get("started_at").map_err(ser)?,
            row.try_get("ended_at").map_err(ser)?,
            total_score,
            row.try_get("summary").map_err(ser)?,
        )
        .map_err(ser)
    }

    async fn load_sessions(
        &self,
        rows: Vec<sqlx::sqlite::SqliteRow>,
    ) -> Result<Vec<Session>, StorageError> {
        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(self.load_session(row).await?);
        }
        Ok(out)
    }
}

#[async_trait]
impl SessionRepository for SqliteRepository {
    async fn save_session(&self, session: &Session) -> Result<(), StorageError> {
        let existing = match self.get_session(session.id()).await {
            Ok(stored) => Some(stored),
            Err(StorageError::NotFound) => None,
            Err(e) => return Err(e),
        };
        check_overwrite(existing.as_ref(), session)?;

        let id = session.id().to_string();
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
                INSERT INTO sessions (
                    id, candidate_id, current_index, status,
                    started_at, ended_at, total_score, summary
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(id) DO UPDATE SET
                    current_index = excluded.current_index,
                    status = excluded.status,
                    ended_at = excluded.ended_at,
                    total_score = excluded.total_score,
                    summary = excluded.summary
            ",
        )
        .bind(&id)
        .bind(session.candidate_id().to_string())
        .bind(i64_from_usize("current_index", session.current_index())?)
        .bind(session.status().as_str())
        .bind(session.started_at())
        .bind(session.ended_at())
        .bind(session.total_score().map(i64::from))
        .bind(session.summary())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM session_questions WHERE session_id = ?1")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for (position, question) in session.questions().iter().enumerate() {
            let answer = question.answer();
            sqlx::query(
                r"
                    INSERT INTO session_questions (
                        session_id, position, question_id, text, difficulty,
                        time_limit_secs, answer_text, score, feedback, answered_at
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ",
            )
            .bind(&id)
            .bind(i64_from_usize("position", position)?)
            .bind(question.id().as_str())
            .bind(question.text())
            .bind(question.difficulty().as_str())
            .bind(i64::from(question.time_limit_secs()))
            .bind(answer.map(|a| a.text.as_str()))
            .bind(answer.and_then(|a| a.score).map(i64::from))
            .bind(answer.and_then(|a| a.feedback.as_deref()))
            .bind(answer.map(|a| a.answered_at))
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Session, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        self.load_session(&row).await
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions ORDER BY started_at ASC, id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        self.load_sessions(rows).await
    }

    async fn list_sessions_for_candidate(
        &self,
        candidate_id: CandidateId,
    ) -> Result<Vec<Session>, StorageError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE candidate_id = ?1 \
             ORDER BY started_at ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(candidate_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        self.load_sessions(rows).await
    }

    async fn latest_resumable(&self) -> Result<Option<Session>, StorageError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE status IN ('active', 'paused') \
             ORDER BY started_at DESC, id DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match row {
            Some(row) => Ok(Some(self.load_session(&row).await?)),
            None => Ok(None),
        }
    }
}
