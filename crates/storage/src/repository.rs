use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use exam_core::model::{
    AnswerChoice, AttemptSummary, Question, QuestionId, SessionId, Topic, TopicId,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of a single answer selection.
///
/// One event is appended per selection, so revisions of the same question
/// produce multiple events; the aggregate progress row always reflects the
/// current answer set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEventRecord {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub choice: AnswerChoice,
    pub is_correct: bool,
    pub time_spent_seconds: u32,
    pub answer_change_count: u32,
    pub recorded_at: DateTime<Utc>,
}

/// Aggregate progress counters for an attempt, updated after every answer and
/// on abandonment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub session_id: SessionId,
    pub answered: u32,
    pub correct: u32,
    pub elapsed_seconds: u32,
    pub updated_at: DateTime<Utc>,
}

/// A persisted attempt summary together with its storage-assigned row ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSummaryRow {
    pub id: i64,
    pub summary: AttemptSummary,
}

impl AttemptSummaryRow {
    #[must_use]
    pub fn new(id: i64, summary: AttemptSummary) -> Self {
        Self { id, summary }
    }
}

/// Repository contract for topics.
#[async_trait]
pub trait TopicRepository: Send + Sync {
    /// Persist or update a topic.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the topic cannot be stored.
    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError>;

    /// Fetch a topic by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_topic(&self, id: TopicId) -> Result<Topic, StorageError>;

    /// List every topic, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_topics(&self) -> Result<Vec<Topic>, StorageError>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or update a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// List the questions of a topic, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_by_topic(&self, topic_id: TopicId) -> Result<Vec<Question>, StorageError>;
}

/// Persistence for the per-answer event stream and aggregate progress.
#[async_trait]
pub trait AttemptEventRepository: Send + Sync {
    /// Append one answer event, returning its row ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the event cannot be stored.
    async fn append_answer(&self, record: &AnswerEventRecord) -> Result<i64, StorageError>;

    /// Insert or update the aggregate progress row for an attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError>;

    /// Fetch the aggregate progress row for an attempt, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_progress(
        &self,
        session_id: SessionId,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// List answer events for an attempt in append order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_answers(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AnswerEventRecord>, StorageError>;
}

#[async_trait]
pub trait AttemptSummaryRepository: Send + Sync {
    /// Append a finalized summary, returning its row ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the summary cannot be stored.
    async fn append_summary(&self, summary: &AttemptSummary) -> Result<i64, StorageError>;

    /// Fetch a summary by row ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_summary(&self, id: i64) -> Result<AttemptSummary, StorageError>;

    /// List recent summaries, most recently completed first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_summary_rows(&self, limit: u32) -> Result<Vec<AttemptSummaryRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    topics: Arc<Mutex<HashMap<TopicId, Topic>>>,
    questions: Arc<Mutex<HashMap<QuestionId, Question>>>,
    answers: Arc<Mutex<Vec<(i64, AnswerEventRecord)>>>,
    progress: Arc<Mutex<HashMap<SessionId, ProgressRecord>>>,
    summaries: Arc<Mutex<Vec<(i64, AttemptSummary)>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err<T>(e: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl TopicRepository for InMemoryRepository {
    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        let mut guard = self.topics.lock().map_err(lock_err)?;
        guard.insert(topic.id(), topic.clone());
        Ok(())
    }

    async fn get_topic(&self, id: TopicId) -> Result<Topic, StorageError> {
        let guard = self.topics.lock().map_err(lock_err)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, StorageError> {
        let guard = self.topics.lock().map_err(lock_err)?;
        let mut topics: Vec<Topic> = guard.values().cloned().collect();
        topics.sort_by_key(Topic::id);
        Ok(topics)
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(lock_err)?;
        guard.insert(question.id(), question.clone());
        Ok(())
    }

    async fn list_by_topic(&self, topic_id: TopicId) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(lock_err)?;
        let mut questions: Vec<Question> = guard
            .values()
            .filter(|q| q.topic_id() == topic_id)
            .cloned()
            .collect();
        questions.sort_by_key(Question::id);
        Ok(questions)
    }
}

#[async_trait]
impl AttemptEventRepository for InMemoryRepository {
    async fn append_answer(&self, record: &AnswerEventRecord) -> Result<i64, StorageError> {
        let mut guard = self.answers.lock().map_err(lock_err)?;
        let id = guard.len() as i64 + 1;
        guard.push((id, record.clone()));
        Ok(id)
    }

    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(lock_err)?;
        guard.insert(record.session_id, record.clone());
        Ok(())
    }

    async fn get_progress(
        &self,
        session_id: SessionId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let guard = self.progress.lock().map_err(lock_err)?;
        Ok(guard.get(&session_id).cloned())
    }

    async fn list_answers(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<AnswerEventRecord>, StorageError> {
        let guard = self.answers.lock().map_err(lock_err)?;
        Ok(guard
            .iter()
            .filter(|(_, r)| r.session_id == session_id)
            .map(|(_, r)| r.clone())
            .collect())
    }
}

#[async_trait]
impl AttemptSummaryRepository for InMemoryRepository {
    async fn append_summary(&self, summary: &AttemptSummary) -> Result<i64, StorageError> {
        let mut guard = self.summaries.lock().map_err(lock_err)?;
        let id = guard.len() as i64 + 1;
        guard.push((id, summary.clone()));
        Ok(id)
    }

    async fn get_summary(&self, id: i64) -> Result<AttemptSummary, StorageError> {
        let guard = self.summaries.lock().map_err(lock_err)?;
        guard
            .iter()
            .find(|(row_id, _)| *row_id == id)
            .map(|(_, s)| s.clone())
            .ok_or(StorageError::NotFound)
    }

    async fn list_summary_rows(&self, limit: u32) -> Result<Vec<AttemptSummaryRow>, StorageError> {
        let guard = self.summaries.lock().map_err(lock_err)?;
        let mut rows: Vec<AttemptSummaryRow> = guard
            .iter()
            .map(|(id, s)| AttemptSummaryRow::new(*id, s.clone()))
            .collect();
        rows.sort_by(|a, b| b.summary.completed_at().cmp(&a.summary.completed_at()));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub topics: Arc<dyn TopicRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub events: Arc<dyn AttemptEventRepository>,
    pub summaries: Arc<dyn AttemptSummaryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            topics: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            events: Arc::new(repo.clone()),
            summaries: Arc::new(repo),
        }
    }
}
