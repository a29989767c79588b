use exam_core::model::SessionId;

use super::{SqliteRepository, mapping};
use crate::repository::{AnswerEventRecord, AttemptEventRepository, ProgressRecord, StorageError};

#[async_trait::async_trait]
impl AttemptEventRepository for SqliteRepository {
    async fn append_answer(&self, record: &AnswerEventRecord) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO answer_events (
                session_id, question_id, choice, is_correct,
                time_spent_seconds, answer_change_count, recorded_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(record.session_id.to_string())
        .bind(mapping::u64_to_i64("question_id", record.question_id.value())?)
        .bind(record.choice.as_str())
        .bind(i64::from(record.is_correct))
        .bind(i64::from(record.time_spent_seconds))
        .bind(i64::from(record.answer_change_count))
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO attempt_progress (
                session_id, answered, correct, elapsed_seconds, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(session_id) DO UPDATE SET
                answered = excluded.answered,
                correct = excluded.correct,
                elapsed_seconds = excluded.elapsed_seconds,
                updated_at = excluded.updated_at
            ",
        )
        .bind(record.session_id.to_string())
        .bind(i64::from(record.answered))
        .bind(i64::from(record.correct))
        .bind(i64::from(record.elapsed_seconds))
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_progress(
        &self,
        session_id: SessionId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT session_id, answered, correct, elapsed_seconds, updated_at
            FROM attempt_progress
            WHERE session_id = ?1
            ",
        )
        .bind(session_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(mapping::map_progress_row).transpose()
    }

    async fn list_answers(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AnswerEventRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT session_id, question_id, choice, is_correct,
                   time_spent_seconds, answer_change_count, recorded_at
            FROM answer_events
            WHERE session_id = ?1
            ORDER BY id
            ",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(mapping::map_answer_event_row).collect()
    }
}
