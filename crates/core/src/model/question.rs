use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{PassageId, QuestionId, TopicId};

/// One of the five multiple-choice options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerChoice {
    A,
    B,
    C,
    D,
    E,
}

impl AnswerChoice {
    /// All choices in presentation order.
    pub const ALL: [AnswerChoice; 5] = [
        AnswerChoice::A,
        AnswerChoice::B,
        AnswerChoice::C,
        AnswerChoice::D,
        AnswerChoice::E,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerChoice::A => "A",
            AnswerChoice::B => "B",
            AnswerChoice::C => "C",
            AnswerChoice::D => "D",
            AnswerChoice::E => "E",
        }
    }
}

impl fmt::Display for AnswerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid answer choice: {provided}")]
pub struct ParseAnswerChoiceError {
    pub provided: String,
}

impl FromStr for AnswerChoice {
    type Err = ParseAnswerChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(AnswerChoice::A),
            "B" => Ok(AnswerChoice::B),
            "C" => Ok(AnswerChoice::C),
            "D" => Ok(AnswerChoice::D),
            "E" => Ok(AnswerChoice::E),
            other => Err(ParseAnswerChoiceError {
                provided: other.to_string(),
            }),
        }
    }
}

/// A single multiple-choice question.
///
/// The statement/option text lives in the content bank; the session engine
/// only needs identity, topic membership, the answer key, and the optional
/// reading-passage grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    topic_id: TopicId,
    correct_answer: AnswerChoice,
    passage_id: Option<PassageId>,
}

impl Question {
    #[must_use]
    pub fn new(
        id: QuestionId,
        topic_id: TopicId,
        correct_answer: AnswerChoice,
        passage_id: Option<PassageId>,
    ) -> Self {
        Self {
            id,
            topic_id,
            correct_answer,
            passage_id,
        }
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn correct_answer(&self) -> AnswerChoice {
        self.correct_answer
    }

    #[must_use]
    pub fn passage_id(&self) -> Option<PassageId> {
        self.passage_id
    }

    /// Returns true when the given choice matches the answer key.
    #[must_use]
    pub fn is_correct(&self, choice: AnswerChoice) -> bool {
        self.correct_answer == choice
    }
}
