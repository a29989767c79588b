//! Retry queue for answer-event writes that failed mid-attempt.
//!
//! A storage hiccup must never block the candidate, so failed writes are
//! parked here and re-attempted later instead of being dropped after a log
//! line.

use std::collections::VecDeque;

use storage::repository::{AnswerEventRecord, AttemptEventRepository};

/// Append-only FIFO of answer events awaiting persistence.
#[derive(Debug, Default)]
pub struct PersistenceOutbox {
    pending: VecDeque<AnswerEventRecord>,
}

impl PersistenceOutbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events still awaiting persistence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Park a record for a later retry.
    pub fn enqueue(&mut self, record: AnswerEventRecord) {
        self.pending.push_back(record);
    }

    /// Re-attempt pending writes in FIFO order.
    ///
    /// Stops at the first failure, leaving that record and everything behind
    /// it queued. Returns the number of records flushed.
    pub async fn drain(&mut self, repo: &dyn AttemptEventRepository) -> usize {
        let mut flushed = 0;
        while let Some(record) = self.pending.front() {
            match repo.append_answer(record).await {
                Ok(_) => {
                    self.pending.pop_front();
                    flushed += 1;
                }
                Err(err) => {
                    tracing::warn!(
                        error = %err,
                        pending = self.pending.len(),
                        "outbox drain stopped at first failure"
                    );
                    break;
                }
            }
        }
        flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use exam_core::model::{AnswerChoice, QuestionId, SessionId};
    use exam_core::time::fixed_now;
    use std::sync::atomic::{AtomicBool, Ordering};
    use storage::repository::{InMemoryRepository, ProgressRecord, StorageError};

    fn build_record(question: u64, recorded_at: DateTime<Utc>) -> AnswerEventRecord {
        AnswerEventRecord {
            session_id: SessionId::generate(),
            question_id: QuestionId::new(question),
            choice: AnswerChoice::B,
            is_correct: false,
            time_spent_seconds: 20,
            answer_change_count: 0,
            recorded_at,
        }
    }

    // Rejects appends until healed; everything else delegates nowhere.
    #[derive(Default)]
    struct FlakyRepo {
        inner: InMemoryRepository,
        failing: AtomicBool,
    }

    #[async_trait]
    impl AttemptEventRepository for FlakyRepo {
        async fn append_answer(&self, record: &AnswerEventRecord) -> Result<i64, StorageError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::Connection("down".into()));
            }
            self.inner.append_answer(record).await
        }

        async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
            self.inner.upsert_progress(record).await
        }

        async fn get_progress(
            &self,
            session_id: SessionId,
        ) -> Result<Option<ProgressRecord>, StorageError> {
            self.inner.get_progress(session_id).await
        }

        async fn list_answers(
            &self,
            session_id: SessionId,
        ) -> Result<Vec<AnswerEventRecord>, StorageError> {
            self.inner.list_answers(session_id).await
        }
    }

    #[tokio::test]
    async fn drain_flushes_in_fifo_order() {
        let repo = InMemoryRepository::new();
        let mut outbox = PersistenceOutbox::new();
        let session = SessionId::generate();
        let now = fixed_now();

        for question in 1..=3 {
            let mut record = build_record(question, now);
            record.session_id = session;
            outbox.enqueue(record);
        }

        assert_eq!(outbox.drain(&repo).await, 3);
        assert!(outbox.is_empty());

        let stored = repo.list_answers(session).await.unwrap();
        let ids: Vec<u64> = stored.iter().map(|r| r.question_id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn drain_stops_at_first_failure_and_retries_later() {
        let repo = FlakyRepo::default();
        repo.failing.store(true, Ordering::SeqCst);

        let mut outbox = PersistenceOutbox::new();
        outbox.enqueue(build_record(1, fixed_now()));
        outbox.enqueue(build_record(2, fixed_now()));

        assert_eq!(outbox.drain(&repo).await, 0);
        assert_eq!(outbox.len(), 2);

        repo.failing.store(false, Ordering::SeqCst);
        assert_eq!(outbox.drain(&repo).await, 2);
        assert!(outbox.is_empty());
    }
}
