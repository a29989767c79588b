use rand::rng;
use rand::seq::SliceRandom;

use exam_core::allocator::Allocation;
use exam_core::model::{Question, TopicId};

/// Selection result for an attempt build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionPlan {
    pub questions: Vec<Question>,
    /// How many questions each topic contributed, in allocation order.
    pub per_topic: Vec<(TopicId, usize)>,
}

impl QuestionPlan {
    /// Total number of questions in this plan.
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Returns true when no questions were selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Builds an ordered question set from an allocation and a question pool.
///
/// Topics are visited in allocation order; within a topic, questions sharing
/// a passage stay adjacent so reading context is presented in one block.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanBuilder {
    shuffle: bool,
}

impl PlanBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable shuffling within each topic before selection.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Build the ordered question set.
    ///
    /// Takes each topic's allocated count from `pool`; a topic whose pool
    /// holds fewer questions than its allocation contributes what it has.
    #[must_use]
    pub fn build(&self, allocation: &Allocation, pool: &[Question]) -> QuestionPlan {
        let mut questions = Vec::new();
        let mut per_topic = Vec::new();

        for entry in allocation.entries() {
            let mut candidates: Vec<Question> = pool
                .iter()
                .filter(|q| q.topic_id() == entry.topic_id)
                .cloned()
                .collect();

            if self.shuffle {
                let mut rng = rng();
                candidates.as_mut_slice().shuffle(&mut rng);
            } else {
                candidates.sort_by_key(|q| q.id().value());
            }

            let take = usize::try_from(entry.count).unwrap_or(usize::MAX);
            candidates.truncate(take);
            let selected = group_passages(candidates);

            per_topic.push((entry.topic_id, selected.len()));
            questions.extend(selected);
        }

        QuestionPlan {
            questions,
            per_topic,
        }
    }
}

// Stable regrouping: the first question of a passage keeps its position and
// pulls the rest of the passage up behind it.
fn group_passages(mut selected: Vec<Question>) -> Vec<Question> {
    let mut ordered = Vec::with_capacity(selected.len());
    while !selected.is_empty() {
        let question = selected.remove(0);
        let passage = question.passage_id();
        ordered.push(question);
        if let Some(passage) = passage {
            let mut i = 0;
            while i < selected.len() {
                if selected[i].passage_id() == Some(passage) {
                    ordered.push(selected.remove(i));
                } else {
                    i += 1;
                }
            }
        }
    }
    ordered
}
