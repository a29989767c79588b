use thiserror::Error;

use crate::model::ids::TopicId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic name cannot be empty")]
    EmptyName,
}

/// A subject area with a pool of available questions.
///
/// Immutable input to the distribution allocator; `available_questions` is the
/// number of questions the content bank currently holds for this topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    id: TopicId,
    name: String,
    available_questions: u32,
}

impl Topic {
    /// Creates a new topic.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::EmptyName` if the name is blank.
    pub fn new(
        id: TopicId,
        name: impl Into<String>,
        available_questions: u32,
    ) -> Result<Self, TopicError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TopicError::EmptyName);
        }
        Ok(Self {
            id,
            name,
            available_questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> TopicId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn available_questions(&self) -> u32 {
        self.available_questions
    }

    /// Returns true when the topic has no questions to draw from.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.available_questions == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_rejects_blank_name() {
        let err = Topic::new(TopicId::new(1), "   ", 10).unwrap_err();
        assert_eq!(err, TopicError::EmptyName);
    }

    #[test]
    fn topic_exposes_pool_size() {
        let topic = Topic::new(TopicId::new(1), "Algebra", 40).unwrap();
        assert_eq!(topic.available_questions(), 40);
        assert!(!topic.is_empty());

        let empty = Topic::new(TopicId::new(2), "Geometry", 0).unwrap();
        assert!(empty.is_empty());
    }
}
