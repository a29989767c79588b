use chrono::{DateTime, Utc};

use exam_core::allocator::allocate;
use exam_core::model::SessionId;
use storage::repository::{
    AttemptSummaryRepository, AttemptSummaryRow, QuestionRepository, TopicRepository,
};

use super::plan::{PlanBuilder, QuestionPlan};
use super::service::AttemptService;
use crate::error::AttemptError;

/// Storage-backed attempt builders and summary lookups.
pub(crate) struct AttemptQueries;

impl AttemptQueries {
    /// Build a question plan using repository data.
    ///
    /// Loads every topic, runs the proportional allocator for `target`, and
    /// fetches each allocated topic's questions.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Allocation` when `target` exceeds the combined
    /// pool, or `AttemptError::Storage` when repository access fails.
    pub async fn build_plan_from_storage(
        target: u32,
        shuffle: bool,
        topics: &dyn TopicRepository,
        questions: &dyn QuestionRepository,
    ) -> Result<QuestionPlan, AttemptError> {
        let topic_list = topics.list_topics().await?;
        let allocation = allocate(&topic_list, target)?;

        let mut pool = Vec::new();
        for entry in allocation.entries() {
            pool.extend(questions.list_by_topic(entry.topic_id).await?);
        }

        Ok(PlanBuilder::new()
            .with_shuffle(shuffle)
            .build(&allocation, &pool))
    }

    /// Create an attempt directly from storage-backed data.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Empty` if the plan comes out empty,
    /// `AttemptError::Allocation` for an over-sized target, or
    /// `AttemptError::Storage` on repository failures.
    pub async fn start_from_storage(
        target: u32,
        budget_seconds: Option<u32>,
        shuffle: bool,
        topics: &dyn TopicRepository,
        questions: &dyn QuestionRepository,
        now: DateTime<Utc>,
    ) -> Result<AttemptService, AttemptError> {
        let plan = Self::build_plan_from_storage(target, shuffle, topics, questions).await?;
        AttemptService::new(SessionId::generate(), plan.questions, budget_seconds, now)
    }

    /// Fetch a persisted attempt summary row by ID.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Storage` if the summary is missing or storage
    /// fails.
    pub async fn get_summary_row(
        id: i64,
        summaries: &dyn AttemptSummaryRepository,
    ) -> Result<AttemptSummaryRow, AttemptError> {
        let summary = summaries.get_summary(id).await?;
        Ok(AttemptSummaryRow::new(id, summary))
    }

    /// List recent attempt summaries, most recently completed first.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Storage` on repository failures.
    pub async fn list_summary_rows(
        limit: u32,
        summaries: &dyn AttemptSummaryRepository,
    ) -> Result<Vec<AttemptSummaryRow>, AttemptError> {
        let rows = summaries.list_summary_rows(limit).await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use exam_core::allocator::AllocationError;
    use exam_core::model::{AnswerChoice, AttemptSummary, Question, QuestionId, Topic, TopicId};
    use exam_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    async fn seed_catalog(repo: &InMemoryRepository, pools: &[(u64, u32)]) {
        let mut next_question = 1;
        for (topic, available) in pools {
            let topic_id = TopicId::new(*topic);
            repo.upsert_topic(&Topic::new(topic_id, format!("Topic {topic}"), *available).unwrap())
                .await
                .unwrap();
            for _ in 0..*available {
                repo.upsert_question(&Question::new(
                    QuestionId::new(next_question),
                    topic_id,
                    AnswerChoice::A,
                    None,
                ))
                .await
                .unwrap();
                next_question += 1;
            }
        }
    }

    #[tokio::test]
    async fn plan_from_storage_follows_allocation() {
        let repo = InMemoryRepository::new();
        seed_catalog(&repo, &[(1, 40), (2, 10)]).await;

        let plan = AttemptQueries::build_plan_from_storage(20, false, &repo, &repo)
            .await
            .unwrap();

        assert_eq!(plan.total(), 20);
        assert_eq!(plan.per_topic, vec![(TopicId::new(1), 16), (TopicId::new(2), 4)]);
    }

    #[tokio::test]
    async fn over_sized_target_is_a_configuration_error() {
        let repo = InMemoryRepository::new();
        seed_catalog(&repo, &[(1, 5)]).await;

        let err = AttemptQueries::build_plan_from_storage(6, false, &repo, &repo)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AttemptError::Allocation(AllocationError::InsufficientPool {
                requested: 6,
                available: 5
            })
        ));
    }

    #[tokio::test]
    async fn start_from_storage_builds_attempt() {
        let repo = InMemoryRepository::new();
        seed_catalog(&repo, &[(1, 3), (2, 3)]).await;

        let attempt =
            AttemptQueries::start_from_storage(4, Some(600), false, &repo, &repo, fixed_now())
                .await
                .unwrap();

        assert_eq!(attempt.total_questions(), 4);
        assert!(attempt.is_timed());
        assert_eq!(attempt.remaining_seconds(), Some(600));
    }

    #[tokio::test]
    async fn summary_rows_round_trip() {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        let summary = AttemptSummary::from_persisted(
            exam_core::model::SessionId::generate(),
            now - chrono::Duration::minutes(20),
            now,
            10,
            10,
            8,
            1200,
        )
        .unwrap();
        let id = repo.append_summary(&summary).await.unwrap();

        let row = AttemptQueries::get_summary_row(id, &repo).await.unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.summary, summary);

        let rows = AttemptQueries::list_summary_rows(10, &repo).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].summary.score_percent(), 80);
    }
}
