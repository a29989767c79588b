use exam_core::model::{Topic, TopicId};

use super::{SqliteRepository, mapping};
use crate::repository::{StorageError, TopicRepository};

#[async_trait::async_trait]
impl TopicRepository for SqliteRepository {
    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO topics (id, name, available_questions)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                available_questions = excluded.available_questions
            ",
        )
        .bind(mapping::u64_to_i64("topic_id", topic.id().value())?)
        .bind(topic.name().to_owned())
        .bind(i64::from(topic.available_questions()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_topic(&self, id: TopicId) -> Result<Topic, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, available_questions
            FROM topics
            WHERE id = ?1
            ",
        )
        .bind(mapping::u64_to_i64("topic_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        .ok_or(StorageError::NotFound)?;

        mapping::map_topic_row(&row)
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, available_questions
            FROM topics
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(mapping::map_topic_row).collect()
    }
}
