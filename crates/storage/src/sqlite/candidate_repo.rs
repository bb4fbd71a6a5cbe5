use async_trait::async_trait;
use interview_core::model::{Candidate, CandidateId};

use super::SqliteRepository;
use super::mapping::{conn, map_candidate_row};
use crate::repository::{CandidateRepository, StorageError};

#[async_trait]
impl CandidateRepository for SqliteRepository {
    async fn upsert_candidate(&self, candidate: &Candidate) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO candidates (
                    id, name, email, phone, resume_text, profile_complete,
                    interview_complete, final_score, summary, created_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    email = excluded.email,
                    phone = excluded.phone,
                    resume_text = excluded.resume_text,
                    profile_complete = excluded.profile_complete,
                    interview_complete = excluded.interview_complete,
                    final_score = excluded.final_score,
                    summary = excluded.summary
            ",
        )
        .bind(candidate.id().to_string())
        .bind(candidate.name())
        .bind(candidate.email())
        .bind(candidate.phone())
        .bind(candidate.resume_text())
        .bind(candidate.profile_complete())
        .bind(candidate.interview_complete())
        .bind(candidate.final_score().map(i64::from))
        .bind(candidate.summary())
        .bind(candidate.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_candidate(&self, id: CandidateId) -> Result<Candidate, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    id, name, email, phone, resume_text, profile_complete,
                    interview_complete, final_score, summary, created_at
                FROM candidates
                WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_candidate_row(&row)
    }

    async fn list_candidates(&self) -> Result<Vec<Candidate>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, name, email, phone, resume_text, profile_complete,
                    interview_complete, final_score, summary, created_at
                FROM candidates
                ORDER BY created_at ASC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_candidate_row).collect()
    }
}
