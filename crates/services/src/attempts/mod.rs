mod plan;
mod progress;
mod queries;
mod service;
mod workflow;

// Public API of the attempt subsystem.
pub use crate::error::AttemptError;
pub use plan::{PlanBuilder, QuestionPlan};
pub use progress::AttemptProgress;
pub use service::{AnswerRecord, AttemptService, PartialProgress};
pub use storage::repository::AttemptSummaryRow;
pub use workflow::{AttemptAnswerResult, AttemptConfig, AttemptLoopService, AttemptTickResult};
