use exam_core::model::{Question, TopicId};

use super::{SqliteRepository, mapping};
use crate::repository::{QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO questions (id, topic_id, correct_answer, passage_id)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                topic_id = excluded.topic_id,
                correct_answer = excluded.correct_answer,
                passage_id = excluded.passage_id
            ",
        )
        .bind(mapping::u64_to_i64("question_id", question.id().value())?)
        .bind(mapping::u64_to_i64("topic_id", question.topic_id().value())?)
        .bind(question.correct_answer().as_str())
        .bind(mapping::passage_id_to_i64(question.passage_id())?)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn list_by_topic(&self, topic_id: TopicId) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, topic_id, correct_answer, passage_id
            FROM questions
            WHERE topic_id = ?1
            ORDER BY id
            ",
        )
        .bind(mapping::u64_to_i64("topic_id", topic_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(mapping::map_question_row).collect()
    }
}
