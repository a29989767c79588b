use exam_core::model::{
    AnswerChoice, AttemptSummary, PassageId, Question, QuestionId, SessionId, Topic, TopicId,
};
use sqlx::Row;

use crate::repository::{AnswerEventRecord, AttemptSummaryRow, ProgressRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn topic_id_from_i64(v: i64) -> Result<TopicId, StorageError> {
    Ok(TopicId::new(i64_to_u64("topic_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn passage_id_from_i64(v: i64) -> Result<PassageId, StorageError> {
    Ok(PassageId::new(i64_to_u64("passage_id", v)?))
}

pub(crate) fn passage_id_to_i64(pid: Option<PassageId>) -> Result<Option<i64>, StorageError> {
    pid.map(|p| u64_to_i64("passage_id", p.value())).transpose()
}

/// Session IDs are stored in their canonical hyphenated text form.
pub(crate) fn session_id_from_str(s: &str) -> Result<SessionId, StorageError> {
    s.parse::<SessionId>().map_err(ser)
}

pub(crate) fn parse_answer_choice(s: &str) -> Result<AnswerChoice, StorageError> {
    s.parse::<AnswerChoice>().map_err(ser)
}

pub(crate) fn map_topic_row(row: &sqlx::sqlite::SqliteRow) -> Result<Topic, StorageError> {
    let id = topic_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let name: String = row.try_get("name").map_err(ser)?;
    let available = u32_from_i64(
        "available_questions",
        row.try_get::<i64, _>("available_questions").map_err(ser)?,
    )?;
    Topic::new(id, name, available).map_err(ser)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let topic_id = topic_id_from_i64(row.try_get::<i64, _>("topic_id").map_err(ser)?)?;
    let choice_str: String = row.try_get("correct_answer").map_err(ser)?;
    let correct_answer = parse_answer_choice(choice_str.as_str())?;
    let passage_id = row
        .try_get::<Option<i64>, _>("passage_id")
        .map_err(ser)?
        .map(passage_id_from_i64)
        .transpose()?;
    Ok(Question::new(id, topic_id, correct_answer, passage_id))
}

pub(crate) fn map_answer_event_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AnswerEventRecord, StorageError> {
    let session_str: String = row.try_get("session_id").map_err(ser)?;
    let choice_str: String = row.try_get("choice").map_err(ser)?;
    Ok(AnswerEventRecord {
        session_id: session_id_from_str(session_str.as_str())?,
        question_id: question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        choice: parse_answer_choice(choice_str.as_str())?,
        is_correct: row.try_get::<i64, _>("is_correct").map_err(ser)? != 0,
        time_spent_seconds: u32_from_i64(
            "time_spent_seconds",
            row.try_get::<i64, _>("time_spent_seconds").map_err(ser)?,
        )?,
        answer_change_count: u32_from_i64(
            "answer_change_count",
            row.try_get::<i64, _>("answer_change_count").map_err(ser)?,
        )?,
        recorded_at: row.try_get("recorded_at").map_err(ser)?,
    })
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ProgressRecord, StorageError> {
    let session_str: String = row.try_get("session_id").map_err(ser)?;
    Ok(ProgressRecord {
        session_id: session_id_from_str(session_str.as_str())?,
        answered: u32_from_i64("answered", row.try_get::<i64, _>("answered").map_err(ser)?)?,
        correct: u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?,
        elapsed_seconds: u32_from_i64(
            "elapsed_seconds",
            row.try_get::<i64, _>("elapsed_seconds").map_err(ser)?,
        )?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_summary_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AttemptSummary, StorageError> {
    let session_str: String = row.try_get("session_id").map_err(ser)?;
    let session_id = session_id_from_str(session_str.as_str())?;
    let started_at = row.try_get("started_at").map_err(ser)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;
    let total_questions = u32_from_i64(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;
    let answered = u32_from_i64("answered", row.try_get::<i64, _>("answered").map_err(ser)?)?;
    let correct = u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?;
    let elapsed_seconds = u32_from_i64(
        "elapsed_seconds",
        row.try_get::<i64, _>("elapsed_seconds").map_err(ser)?,
    )?;

    AttemptSummary::from_persisted(
        session_id,
        started_at,
        completed_at,
        total_questions,
        answered,
        correct,
        elapsed_seconds,
    )
    .map_err(ser)
}

pub(crate) fn map_summary_row_with_id(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<AttemptSummaryRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let summary = map_summary_row(row)?;
    Ok(AttemptSummaryRow::new(id, summary))
}
