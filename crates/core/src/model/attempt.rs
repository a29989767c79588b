use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::SessionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("answered count ({answered}) exceeds total questions ({total})")]
    AnsweredExceedsTotal { answered: u32, total: u32 },

    #[error("correct count ({correct}) exceeds answered count ({answered})")]
    CorrectExceedsAnswered { correct: u32, answered: u32 },
}

/// Aggregate result of one finished exam attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSummary {
    session_id: SessionId,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    total_questions: u32,
    answered: u32,
    correct: u32,
    elapsed_seconds: u32,
}

impl AttemptSummary {
    /// Rehydrate an attempt summary from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns an `AttemptSummaryError` if the counts or timestamps are
    /// inconsistent.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        session_id: SessionId,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        total_questions: u32,
        answered: u32,
        correct: u32,
        elapsed_seconds: u32,
    ) -> Result<Self, AttemptSummaryError> {
        if completed_at < started_at {
            return Err(AttemptSummaryError::InvalidTimeRange);
        }
        if answered > total_questions {
            return Err(AttemptSummaryError::AnsweredExceedsTotal {
                answered,
                total: total_questions,
            });
        }
        if correct > answered {
            return Err(AttemptSummaryError::CorrectExceedsAnswered { correct, answered });
        }

        Ok(Self {
            session_id,
            started_at,
            completed_at,
            total_questions,
            answered,
            correct,
            elapsed_seconds,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn answered(&self) -> u32 {
        self.answered
    }

    #[must_use]
    pub fn correct(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    /// Score as a whole percentage of the full question set, rounded to the
    /// nearest integer. Unanswered questions count against the score.
    #[must_use]
    pub fn score_percent(&self) -> u32 {
        if self.total_questions == 0 {
            return 0;
        }
        let scaled = f64::from(self.correct) * 100.0 / f64::from(self.total_questions);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            scaled.round() as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn summary_rejects_reversed_time_range() {
        let now = fixed_now();
        let err = AttemptSummary::from_persisted(
            SessionId::generate(),
            now,
            now - chrono::Duration::seconds(1),
            10,
            10,
            5,
            600,
        )
        .unwrap_err();
        assert_eq!(err, AttemptSummaryError::InvalidTimeRange);
    }

    #[test]
    fn summary_rejects_inconsistent_counts() {
        let now = fixed_now();
        let err =
            AttemptSummary::from_persisted(SessionId::generate(), now, now, 10, 12, 5, 600)
                .unwrap_err();
        assert!(matches!(
            err,
            AttemptSummaryError::AnsweredExceedsTotal { .. }
        ));

        let err =
            AttemptSummary::from_persisted(SessionId::generate(), now, now, 10, 8, 9, 600)
                .unwrap_err();
        assert!(matches!(
            err,
            AttemptSummaryError::CorrectExceedsAnswered { .. }
        ));
    }

    #[test]
    fn score_rounds_to_nearest_percent() {
        let now = fixed_now();
        let summary =
            AttemptSummary::from_persisted(SessionId::generate(), now, now, 3, 3, 2, 90).unwrap();
        // 2/3 = 66.67%
        assert_eq!(summary.score_percent(), 67);
    }

    #[test]
    fn empty_attempt_scores_zero() {
        let now = fixed_now();
        let summary =
            AttemptSummary::from_persisted(SessionId::generate(), now, now, 0, 0, 0, 0).unwrap();
        assert_eq!(summary.score_percent(), 0);
    }
}
