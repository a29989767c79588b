#![forbid(unsafe_code)]

pub mod attempts;
pub mod error;
pub mod outbox;

pub use exam_core::Clock;

pub use error::AttemptError;
pub use outbox::PersistenceOutbox;

pub use attempts::{
    AnswerRecord, AttemptAnswerResult, AttemptConfig, AttemptLoopService, AttemptProgress,
    AttemptService, AttemptSummaryRow, AttemptTickResult, PartialProgress, PlanBuilder,
    QuestionPlan,
};
