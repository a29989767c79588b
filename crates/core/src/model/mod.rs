mod attempt;
mod ids;
mod question;
mod topic;

pub use attempt::{AttemptSummary, AttemptSummaryError};
pub use ids::{ParseIdError, PassageId, QuestionId, SessionId, TopicId};
pub use question::{AnswerChoice, ParseAnswerChoiceError, Question};
pub use topic::{Topic, TopicError};
