use std::sync::Arc;

use exam_core::model::AnswerChoice;
use exam_core::timer::Tick;
use storage::repository::{
    AnswerEventRecord, AttemptEventRepository, AttemptSummaryRepository, AttemptSummaryRow,
    ProgressRecord, QuestionRepository, TopicRepository,
};

use super::queries::AttemptQueries;
use super::service::{AnswerRecord, AttemptService, PartialProgress};
use crate::Clock;
use crate::error::AttemptError;
use crate::outbox::PersistenceOutbox;

/// Parameters for starting one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptConfig {
    /// Total number of questions to draw across topics.
    pub target_questions: u32,
    /// Countdown budget; `None` runs the attempt untimed (practice mode).
    pub budget_seconds: Option<u32>,
    /// Shuffle question order within each topic.
    pub shuffle: bool,
}

/// Result of answering a single question through the persisted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptAnswerResult {
    pub record: AnswerRecord,
    /// False when the answer event landed on the outbox instead of storage.
    pub persisted: bool,
}

/// Result of one persisted clock tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptTickResult {
    pub tick: Option<Tick>,
    /// Set when this tick expired the countdown and finalized the attempt.
    pub summary_id: Option<i64>,
}

/// Orchestrates attempt start, persisted answering, and submission.
#[derive(Clone)]
pub struct AttemptLoopService {
    clock: Clock,
    topics: Arc<dyn TopicRepository>,
    questions: Arc<dyn QuestionRepository>,
    events: Arc<dyn AttemptEventRepository>,
    summaries: Arc<dyn AttemptSummaryRepository>,
}

impl AttemptLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        topics: Arc<dyn TopicRepository>,
        questions: Arc<dyn QuestionRepository>,
        events: Arc<dyn AttemptEventRepository>,
        summaries: Arc<dyn AttemptSummaryRepository>,
    ) -> Self {
        Self {
            clock,
            topics,
            questions,
            events,
            summaries,
        }
    }

    /// Start a new attempt from the stored topic catalog.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Allocation` when the target exceeds the
    /// combined pool, `AttemptError::Empty` when no questions exist, or
    /// `AttemptError::Storage` on repository failures.
    pub async fn start_attempt(&self, config: AttemptConfig) -> Result<AttemptService, AttemptError> {
        let now = self.clock.now();
        AttemptQueries::start_from_storage(
            config.target_questions,
            config.budget_seconds,
            config.shuffle,
            self.topics.as_ref(),
            self.questions.as_ref(),
            now,
        )
        .await
    }

    /// Select an answer for the current question and persist it.
    ///
    /// The in-memory state always wins: a storage failure is logged and the
    /// event is parked on `outbox` for a later retry, never failing the call.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Completed` once the attempt has been submitted.
    pub async fn answer_current(
        &self,
        attempt: &mut AttemptService,
        choice: AnswerChoice,
        outbox: &mut PersistenceOutbox,
    ) -> Result<AttemptAnswerResult, AttemptError> {
        let now = self.clock.now();
        let record = attempt.select_answer(choice, now)?;

        let event = AnswerEventRecord {
            session_id: attempt.session_id(),
            question_id: record.question_id,
            choice: record.choice,
            is_correct: record.is_correct,
            time_spent_seconds: record.time_spent_seconds,
            answer_change_count: record.answer_change_count,
            recorded_at: record.selected_at,
        };

        let persisted = match self.events.append_answer(&event).await {
            Ok(_) => {
                self.save_progress(attempt).await;
                true
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    event = %serde_json::to_string(&event).unwrap_or_default(),
                    "answer event not persisted; queued for retry"
                );
                outbox.enqueue(event);
                false
            }
        };

        Ok(AttemptAnswerResult { record, persisted })
    }

    /// Advance the countdown by one second; on expiry the attempt is
    /// finalized through the same path as a manual submission.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError` when expiry finalization fails; the attempt
    /// stays submittable via [`finalize_attempt`](Self::finalize_attempt).
    pub async fn tick(
        &self,
        attempt: &mut AttemptService,
    ) -> Result<AttemptTickResult, AttemptError> {
        let tick = attempt.tick();
        let expired = tick.as_ref().is_some_and(|t| t.expired);

        let summary_id = if expired {
            Some(self.finalize_attempt(attempt).await?)
        } else {
            None
        };

        Ok(AttemptTickResult { tick, summary_id })
    }

    /// Manual submission: stop the clock and finalize.
    ///
    /// Returns `None` when another path (expiry, or an earlier click) already
    /// owns the submission; that path's finalization stands.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Completed` for an already-finalized attempt, or
    /// persistence errors from finalization.
    pub async fn submit_attempt(
        &self,
        attempt: &mut AttemptService,
    ) -> Result<Option<i64>, AttemptError> {
        if !attempt.begin_submit()? {
            return Ok(None);
        }
        let id = self.finalize_attempt(attempt).await?;
        Ok(Some(id))
    }

    /// Persist the attempt summary. Idempotent: an already-persisted attempt
    /// returns its existing summary ID, and a failed append can be retried.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotSubmitting` when no submission is in flight
    /// and `AttemptError::Storage` when the append fails.
    pub async fn finalize_attempt(
        &self,
        attempt: &mut AttemptService,
    ) -> Result<i64, AttemptError> {
        if let Some(id) = attempt.summary_id() {
            return Ok(id);
        }

        let now = self.clock.now();
        // A previous finalize may have computed the summary and then lost the
        // append; reuse it instead of re-finalizing.
        let summary = match attempt.summary() {
            Some(summary) => summary.clone(),
            None => attempt.finalize(now)?,
        };

        let id = self.summaries.append_summary(&summary).await?;
        attempt.set_summary_id(id);
        Ok(id)
    }

    /// Exit without submitting, saving partial progress best-effort.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Completed` once submission has begun.
    pub async fn abandon_attempt(
        &self,
        attempt: &mut AttemptService,
    ) -> Result<PartialProgress, AttemptError> {
        let now = self.clock.now();
        let partial = attempt.abandon(now)?;

        let record = ProgressRecord {
            session_id: partial.session_id,
            answered: partial.answered,
            correct: partial.correct,
            elapsed_seconds: partial.elapsed_seconds,
            updated_at: partial.abandoned_at,
        };
        if let Err(err) = self.events.upsert_progress(&record).await {
            tracing::warn!(error = %err, "partial progress not persisted on abandon");
        }

        Ok(partial)
    }

    /// Fetch a persisted attempt summary row by ID.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Storage` if the summary is missing or storage
    /// fails.
    pub async fn get_summary_row(&self, id: i64) -> Result<AttemptSummaryRow, AttemptError> {
        AttemptQueries::get_summary_row(id, self.summaries.as_ref()).await
    }

    /// List recent attempt summaries, most recently completed first.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Storage` on repository failures.
    pub async fn list_summary_rows(
        &self,
        limit: u32,
    ) -> Result<Vec<AttemptSummaryRow>, AttemptError> {
        AttemptQueries::list_summary_rows(limit, self.summaries.as_ref()).await
    }

    /// Retry pending answer-event writes.
    ///
    /// Returns the number of events flushed; anything left is observable via
    /// `outbox.len()`.
    pub async fn flush_outbox(&self, outbox: &mut PersistenceOutbox) -> usize {
        outbox.drain(self.events.as_ref()).await
    }

    // Aggregate progress row mirrors the current answer set. Best-effort.
    async fn save_progress(&self, attempt: &AttemptService) {
        let now = self.clock.now();
        let record = ProgressRecord {
            session_id: attempt.session_id(),
            answered: attempt.answered_count(),
            correct: attempt.correct_count(),
            elapsed_seconds: attempt.elapsed_seconds(now),
            updated_at: now,
        };
        if let Err(err) = self.events.upsert_progress(&record).await {
            tracing::warn!(error = %err, "progress row not persisted");
        }
    }
}
