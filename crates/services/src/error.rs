//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::allocator::AllocationError;
use exam_core::model::AttemptSummaryError;
use exam_core::timer::TimerError;
use storage::repository::StorageError;

/// Errors emitted by attempt services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("no questions available for attempt")]
    Empty,

    #[error("attempt already completed")]
    Completed,

    #[error("attempt is not being submitted")]
    NotSubmitting,

    #[error("question index {index} out of range ({total} questions)")]
    QuestionOutOfRange { index: usize, total: usize },

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error(transparent)]
    Summary(#[from] AttemptSummaryError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
