use exam_core::model::AttemptSummary;

use super::{SqliteRepository, mapping};
use crate::repository::{AttemptSummaryRepository, AttemptSummaryRow, StorageError};

#[async_trait::async_trait]
impl AttemptSummaryRepository for SqliteRepository {
    async fn append_summary(&self, summary: &AttemptSummary) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO attempt_summaries (
                session_id, started_at, completed_at, total_questions,
                answered, correct, elapsed_seconds
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(summary.session_id().to_string())
        .bind(summary.started_at())
        .bind(summary.completed_at())
        .bind(i64::from(summary.total_questions()))
        .bind(i64::from(summary.answered()))
        .bind(i64::from(summary.correct()))
        .bind(i64::from(summary.elapsed_seconds()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn get_summary(&self, id: i64) -> Result<AttemptSummary, StorageError> {
        let row = sqlx::query(
            r"
            SELECT session_id, started_at, completed_at, total_questions,
                   answered, correct, elapsed_seconds
            FROM attempt_summaries
            WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        mapping::map_summary_row(&row)
    }

    async fn list_summary_rows(&self, limit: u32) -> Result<Vec<AttemptSummaryRow>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, session_id, started_at, completed_at, total_questions,
                   answered, correct, elapsed_seconds
            FROM attempt_summaries
            ORDER BY completed_at DESC, id DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(mapping::map_summary_row_with_id).collect()
    }
}
