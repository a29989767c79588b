use chrono::{DateTime, Utc};
use std::fmt;

use exam_core::model::{AnswerChoice, AttemptSummary, Question, QuestionId, SessionId};
use exam_core::timer::{CountdownTimer, Pace, Tick, TimerPhase};

use super::progress::AttemptProgress;
use crate::error::AttemptError;

//
// ─── ANSWER RECORD ─────────────────────────────────────────────────────────────
//

/// Outcome of one answer selection, shaped for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question_id: QuestionId,
    pub choice: AnswerChoice,
    pub is_correct: bool,
    /// Seconds spent on the question in the visit that produced this answer.
    /// Not cumulative: re-visiting a question resets the baseline.
    pub time_spent_seconds: u32,
    /// Number of times a previously selected answer was replaced by a
    /// different one. Re-selecting the same answer does not count.
    pub answer_change_count: u32,
    pub selected_at: DateTime<Utc>,
}

/// Best-effort snapshot of an attempt that was exited without submission.
///
/// No score is computed for an abandoned attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialProgress {
    pub session_id: SessionId,
    pub answered: u32,
    pub correct: u32,
    pub elapsed_seconds: u32,
    pub abandoned_at: DateTime<Utc>,
}

// Per-question mutable state. The answer is always the latest selection.
#[derive(Debug, Clone, Default)]
struct QuestionState {
    answer: Option<AnswerChoice>,
    answer_change_count: u32,
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

/// In-memory state for one exam attempt.
///
/// Holds the ordered question set, the candidate's current answers, and the
/// optional countdown. Single-writer: all mutation flows through the owner,
/// which serializes UI events, clock ticks, and submission.
pub struct AttemptService {
    session_id: SessionId,
    questions: Vec<Question>,
    states: Vec<QuestionState>,
    current: usize,
    /// Furthest question index ever visited; drives the pace indicator.
    furthest: usize,
    correct: u32,
    timer: Option<CountdownTimer>,
    started_at: DateTime<Utc>,
    /// When the current question visit began; reset on every navigation.
    visit_started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    abandoned: bool,
    // Submission guard for untimed attempts; timed attempts use the timer
    // phase instead.
    submitting: bool,
    summary: Option<AttemptSummary>,
    summary_id: Option<i64>,
}

impl AttemptService {
    /// Create a new attempt over an ordered question set.
    ///
    /// With a budget the countdown starts immediately (the budget is treated
    /// as confirmed by the caller); without one the attempt runs untimed.
    /// `started_at` should come from the services layer clock.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Empty` if no questions are provided.
    pub fn new(
        session_id: SessionId,
        questions: Vec<Question>,
        budget_seconds: Option<u32>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, AttemptError> {
        if questions.is_empty() {
            return Err(AttemptError::Empty);
        }

        let states = vec![QuestionState::default(); questions.len()];
        Ok(Self {
            session_id,
            questions,
            states,
            current: 0,
            furthest: 0,
            correct: 0,
            timer: budget_seconds.map(CountdownTimer::started),
            started_at,
            visit_started_at: started_at,
            completed_at: None,
            abandoned: false,
            submitting: false,
            summary: None,
            summary_id: None,
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
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn summary_id(&self) -> Option<i64> {
        self.summary_id
    }

    #[must_use]
    pub fn summary(&self) -> Option<&AttemptSummary> {
        self.summary.as_ref()
    }

    #[must_use]
    pub fn is_timed(&self) -> bool {
        self.timer.is_some()
    }

    /// Seconds left on the countdown, or `None` for an untimed attempt.
    #[must_use]
    pub fn remaining_seconds(&self) -> Option<u32> {
        self.timer.as_ref().map(CountdownTimer::remaining_seconds)
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Number of questions currently holding an answer.
    #[must_use]
    pub fn answered_count(&self) -> u32 {
        let answered = self.states.iter().filter(|s| s.answer.is_some()).count();
        u32::try_from(answered).unwrap_or(u32::MAX)
    }

    /// Correct answers in the *current* answer set; revisions adjust it.
    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn furthest_index(&self) -> usize {
        self.furthest
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    /// The answer currently selected for the question at `index`, if any.
    #[must_use]
    pub fn answer_at(&self, index: usize) -> Option<AnswerChoice> {
        self.states.get(index).and_then(|s| s.answer)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    /// True while a submission is in flight and not yet finalized.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        if self.is_complete() {
            return false;
        }
        match &self.timer {
            Some(timer) => timer.phase() == TimerPhase::Submitting,
            None => self.submitting,
        }
    }

    /// Wall-clock or countdown-derived seconds elapsed so far.
    #[must_use]
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u32 {
        match &self.timer {
            Some(timer) => timer.elapsed_seconds(),
            None => wall_clock_seconds(self.started_at, now),
        }
    }

    /// Returns a summary of the current attempt progress.
    #[must_use]
    pub fn progress(&self) -> AttemptProgress {
        let total = self.questions.len();
        let answered = self.answered_count() as usize;
        AttemptProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            is_complete: self.is_complete(),
        }
    }

    /// Pace of the candidate against the clock; `None` for untimed attempts.
    ///
    /// Question progress counts the furthest question reached, so paging back
    /// to review does not report the candidate as falling behind.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn pace(&self) -> Option<Pace> {
        let timer = self.timer.as_ref()?;
        let question_fraction = (self.furthest + 1) as f64 / self.questions.len() as f64;
        Some(Pace::classify(timer.elapsed_fraction(), question_fraction))
    }

    fn ensure_active(&self) -> Result<(), AttemptError> {
        if self.is_complete() || self.abandoned {
            return Err(AttemptError::Completed);
        }
        if self.is_submitting() {
            return Err(AttemptError::Completed);
        }
        Ok(())
    }

    /// Jump to the question at `index`. The countdown keeps running;
    /// navigation only resets the per-visit timing baseline.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::QuestionOutOfRange` for an invalid index and
    /// `AttemptError::Completed` once the attempt has been submitted.
    pub fn goto(&mut self, index: usize, now: DateTime<Utc>) -> Result<(), AttemptError> {
        self.ensure_active()?;
        if index >= self.questions.len() {
            return Err(AttemptError::QuestionOutOfRange {
                index,
                total: self.questions.len(),
            });
        }
        self.current = index;
        self.furthest = self.furthest.max(index);
        self.visit_started_at = now;
        Ok(())
    }

    /// Advance to the next question; a no-op on the last one.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Completed` once the attempt has been submitted.
    pub fn next(&mut self, now: DateTime<Utc>) -> Result<(), AttemptError> {
        if self.current + 1 < self.questions.len() {
            self.goto(self.current + 1, now)
        } else {
            self.ensure_active()
        }
    }

    /// Go back one question; a no-op on the first one.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Completed` once the attempt has been submitted.
    pub fn previous(&mut self, now: DateTime<Utc>) -> Result<(), AttemptError> {
        match self.current.checked_sub(1) {
            Some(index) => self.goto(index, now),
            None => self.ensure_active(),
        }
    }

    /// Select an answer for the current question.
    ///
    /// Maintains the running correct count against the current answer set: a
    /// correct choice over none or an incorrect one adds a point, an
    /// incorrect choice over a correct one removes it. The change counter
    /// increments only when a *different* prior answer existed.
    ///
    /// The record's time spent covers only the current visit, measured from
    /// when the question was last navigated to.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Completed` once the attempt has been submitted.
    pub fn select_answer(
        &mut self,
        choice: AnswerChoice,
        now: DateTime<Utc>,
    ) -> Result<AnswerRecord, AttemptError> {
        self.ensure_active()?;
        let time_spent_seconds = wall_clock_seconds(self.visit_started_at, now);

        let question = &self.questions[self.current];
        let state = &mut self.states[self.current];

        let previous = state.answer;
        if let Some(prior) = previous {
            if prior != choice {
                state.answer_change_count += 1;
            }
        }

        let was_correct = previous.is_some_and(|prior| question.is_correct(prior));
        let is_correct = question.is_correct(choice);
        if is_correct && !was_correct {
            self.correct += 1;
        } else if was_correct && !is_correct {
            self.correct -= 1;
        }

        state.answer = Some(choice);

        Ok(AnswerRecord {
            question_id: question.id(),
            choice,
            is_correct,
            time_spent_seconds,
            answer_change_count: state.answer_change_count,
            selected_at: now,
        })
    }

    /// Advance the countdown by one second; `None` for untimed attempts and
    /// outside `Running`.
    ///
    /// The tick that exhausts the budget moves the timer to `Submitting`
    /// itself, so an expiry racing a manual submit cannot finalize twice.
    pub fn tick(&mut self) -> Option<Tick> {
        self.timer.as_mut()?.tick()
    }

    /// Manual submission path. Returns `true` only when this call won the
    /// transition out of the active state; a second trigger (double click, or
    /// expiry landing on the same second) gets `false`.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Completed` once the attempt is finalized or
    /// abandoned.
    pub fn begin_submit(&mut self) -> Result<bool, AttemptError> {
        if self.is_complete() || self.abandoned {
            return Err(AttemptError::Completed);
        }
        match self.timer.as_mut() {
            Some(timer) => Ok(timer.begin_submit()),
            None => {
                if self.submitting {
                    Ok(false)
                } else {
                    self.submitting = true;
                    Ok(true)
                }
            }
        }
    }

    /// Finalize the attempt and compute its summary. Only valid while a
    /// submission is in flight; afterwards every mutation is rejected.
    ///
    /// For timed attempts elapsed time is budget minus remaining; untimed
    /// attempts use the wall clock.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::NotSubmitting` when no submission is in flight
    /// and `AttemptError::Completed` if already finalized.
    pub fn finalize(&mut self, now: DateTime<Utc>) -> Result<AttemptSummary, AttemptError> {
        if self.is_complete() || self.abandoned {
            return Err(AttemptError::Completed);
        }
        if !self.is_submitting() {
            return Err(AttemptError::NotSubmitting);
        }

        let elapsed = self.elapsed_seconds(now);
        let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        let summary = AttemptSummary::from_persisted(
            self.session_id,
            self.started_at,
            now,
            total,
            self.answered_count(),
            self.correct,
            elapsed,
        )?;

        if let Some(timer) = self.timer.as_mut() {
            timer.complete()?;
        }
        self.completed_at = Some(now);
        self.summary = Some(summary.clone());
        Ok(summary)
    }

    /// Exit without submitting. Returns partial progress for a best-effort
    /// save; the attempt never reaches `Complete` and no score is computed.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Completed` once submission has begun or the
    /// attempt was already abandoned.
    pub fn abandon(&mut self, now: DateTime<Utc>) -> Result<PartialProgress, AttemptError> {
        self.ensure_active()?;
        self.abandoned = true;
        Ok(PartialProgress {
            session_id: self.session_id,
            answered: self.answered_count(),
            correct: self.correct,
            elapsed_seconds: self.elapsed_seconds(now),
            abandoned_at: now,
        })
    }

    pub(crate) fn set_summary_id(&mut self, id: i64) {
        self.summary_id = Some(id);
    }
}

impl fmt::Debug for AttemptService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptService")
            .field("session_id", &self.session_id)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("answered", &self.answered_count())
            .field("timed", &self.timer.is_some())
            .field("completed_at", &self.completed_at)
            .field("abandoned", &self.abandoned)
            .field("summary_id", &self.summary_id)
            .finish_non_exhaustive()
    }
}

fn wall_clock_seconds(from: DateTime<Utc>, to: DateTime<Utc>) -> u32 {
    u32::try_from((to - from).num_seconds().max(0)).unwrap_or(u32::MAX)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use exam_core::model::{QuestionId, TopicId};
    use exam_core::time::fixed_now;
    use exam_core::timer::Warning;

    fn build_question(id: u64, correct: AnswerChoice) -> Question {
        Question::new(QuestionId::new(id), TopicId::new(1), correct, None)
    }

    fn build_attempt(budget: Option<u32>) -> AttemptService {
        let questions = vec![
            build_question(1, AnswerChoice::A),
            build_question(2, AnswerChoice::B),
            build_question(3, AnswerChoice::C),
        ];
        AttemptService::new(SessionId::generate(), questions, budget, fixed_now()).unwrap()
    }

    #[test]
    fn empty_attempt_is_rejected() {
        let err =
            AttemptService::new(SessionId::generate(), Vec::new(), None, fixed_now()).unwrap_err();
        assert!(matches!(err, AttemptError::Empty));
    }

    #[test]
    fn first_correct_answer_scores_a_point() {
        let mut attempt = build_attempt(None);
        let record = attempt.select_answer(AnswerChoice::A, fixed_now()).unwrap();
        assert!(record.is_correct);
        assert_eq!(record.answer_change_count, 0);
        assert_eq!(attempt.correct_count(), 1);
        assert_eq!(attempt.answered_count(), 1);
    }

    #[test]
    fn revising_incorrect_to_correct_adds_a_point() {
        let mut attempt = build_attempt(None);
        attempt.select_answer(AnswerChoice::D, fixed_now()).unwrap();
        assert_eq!(attempt.correct_count(), 0);

        let record = attempt.select_answer(AnswerChoice::A, fixed_now()).unwrap();
        assert!(record.is_correct);
        assert_eq!(record.answer_change_count, 1);
        assert_eq!(attempt.correct_count(), 1);
        // Still one answered question.
        assert_eq!(attempt.answered_count(), 1);
    }

    #[test]
    fn revising_correct_to_incorrect_removes_the_point() {
        let mut attempt = build_attempt(None);
        attempt.select_answer(AnswerChoice::A, fixed_now()).unwrap();
        assert_eq!(attempt.correct_count(), 1);

        let record = attempt.select_answer(AnswerChoice::E, fixed_now()).unwrap();
        assert!(!record.is_correct);
        assert_eq!(attempt.correct_count(), 0);
    }

    #[test]
    fn reselecting_the_same_answer_is_not_a_change() {
        let mut attempt = build_attempt(None);
        attempt.select_answer(AnswerChoice::A, fixed_now()).unwrap();
        let record = attempt.select_answer(AnswerChoice::A, fixed_now()).unwrap();
        assert_eq!(record.answer_change_count, 0);
        assert_eq!(attempt.correct_count(), 1);
    }

    #[test]
    fn navigation_tracks_furthest_and_bounds() {
        let mut attempt = build_attempt(None);
        let now = fixed_now();

        attempt.previous(now).unwrap();
        assert_eq!(attempt.current_index(), 0);

        attempt.next(now).unwrap();
        attempt.next(now).unwrap();
        assert_eq!(attempt.current_index(), 2);
        assert_eq!(attempt.furthest_index(), 2);

        attempt.next(now).unwrap();
        assert_eq!(attempt.current_index(), 2);

        attempt.goto(0, now).unwrap();
        assert_eq!(attempt.current_index(), 0);
        // Paging back never lowers the furthest marker.
        assert_eq!(attempt.furthest_index(), 2);

        let err = attempt.goto(3, now).unwrap_err();
        assert!(matches!(
            err,
            AttemptError::QuestionOutOfRange { index: 3, total: 3 }
        ));
    }

    #[test]
    fn question_time_covers_only_the_current_visit() {
        let mut attempt = build_attempt(None);
        let now = fixed_now();

        // 10s on the first question, then away, then back at 15s.
        attempt.next(now + Duration::seconds(10)).unwrap();
        attempt.goto(0, now + Duration::seconds(15)).unwrap();
        let record = attempt
            .select_answer(AnswerChoice::A, now + Duration::seconds(22))
            .unwrap();

        // Re-visiting reset the baseline: only the second visit counts.
        assert_eq!(record.time_spent_seconds, 7);

        // A revision in the same visit still measures from the visit start.
        let record = attempt
            .select_answer(AnswerChoice::B, now + Duration::seconds(30))
            .unwrap();
        assert_eq!(record.time_spent_seconds, 15);
    }

    #[test]
    fn untimed_attempt_has_no_countdown_or_pace() {
        let mut attempt = build_attempt(None);
        assert!(!attempt.is_timed());
        assert!(attempt.tick().is_none());
        assert!(attempt.remaining_seconds().is_none());
        assert!(attempt.pace().is_none());
    }

    #[test]
    fn timed_attempt_ticks_and_warns() {
        let mut attempt = build_attempt(Some(90));
        let mut half_time = 0;
        loop {
            let Some(tick) = attempt.tick() else { break };
            half_time += tick
                .warnings
                .iter()
                .filter(|w| **w == Warning::HalfTime)
                .count();
            if tick.expired {
                break;
            }
        }
        assert_eq!(half_time, 1);
        assert!(attempt.is_submitting());
    }

    #[test]
    fn pace_reflects_furthest_question_against_clock() {
        let mut attempt = build_attempt(Some(300));
        // 1 of 3 questions reached, no time spent: ahead of the clock.
        assert_eq!(attempt.pace(), Some(Pace::Ahead));

        for _ in 0..270 {
            attempt.tick();
        }
        // 90% of time gone, still on question 1 of 3.
        assert_eq!(attempt.pace(), Some(Pace::Behind));

        attempt.next(fixed_now()).unwrap();
        attempt.next(fixed_now()).unwrap();
        // All questions reached.
        assert_eq!(attempt.pace(), Some(Pace::OnTrack));
    }

    #[test]
    fn manual_submit_wins_only_once() {
        let mut attempt = build_attempt(Some(60));
        assert!(attempt.begin_submit().unwrap());
        assert!(!attempt.begin_submit().unwrap());
        // The clock is stopped.
        assert!(attempt.tick().is_none());
    }

    #[test]
    fn expiry_beats_a_late_manual_submit() {
        let mut attempt = build_attempt(Some(2));
        attempt.tick();
        let tick = attempt.tick().unwrap();
        assert!(tick.expired);
        assert!(!attempt.begin_submit().unwrap());
    }

    #[test]
    fn finalize_requires_submission_in_flight() {
        let mut attempt = build_attempt(Some(60));
        let err = attempt.finalize(fixed_now()).unwrap_err();
        assert!(matches!(err, AttemptError::NotSubmitting));
    }

    #[test]
    fn finalize_scores_the_current_answer_set() {
        let mut attempt = build_attempt(Some(600));
        let now = fixed_now();
        attempt.select_answer(AnswerChoice::A, now).unwrap();
        attempt.next(now).unwrap();
        attempt.select_answer(AnswerChoice::E, now).unwrap();

        for _ in 0..45 {
            attempt.tick();
        }
        assert!(attempt.begin_submit().unwrap());
        let summary = attempt.finalize(now + Duration::seconds(45)).unwrap();

        assert_eq!(summary.total_questions(), 3);
        assert_eq!(summary.answered(), 2);
        assert_eq!(summary.correct(), 1);
        // Timed: elapsed comes from the countdown, not the wall clock.
        assert_eq!(summary.elapsed_seconds(), 45);
        assert!(attempt.is_complete());

        let err = attempt.select_answer(AnswerChoice::B, now).unwrap_err();
        assert!(matches!(err, AttemptError::Completed));
        let err = attempt.finalize(now).unwrap_err();
        assert!(matches!(err, AttemptError::Completed));
    }

    #[test]
    fn untimed_finalize_uses_wall_clock() {
        let mut attempt = build_attempt(None);
        let now = fixed_now();
        attempt.select_answer(AnswerChoice::A, now).unwrap();
        assert!(attempt.begin_submit().unwrap());
        let summary = attempt.finalize(now + Duration::seconds(125)).unwrap();
        assert_eq!(summary.elapsed_seconds(), 125);
    }

    #[test]
    fn abandon_returns_partial_progress_without_score() {
        let mut attempt = build_attempt(None);
        let now = fixed_now();
        attempt.select_answer(AnswerChoice::A, now).unwrap();

        let partial = attempt.abandon(now + Duration::seconds(40)).unwrap();
        assert_eq!(partial.answered, 1);
        assert_eq!(partial.correct, 1);
        assert_eq!(partial.elapsed_seconds, 40);
        assert!(attempt.is_abandoned());
        assert!(!attempt.is_complete());

        let err = attempt.select_answer(AnswerChoice::B, now).unwrap_err();
        assert!(matches!(err, AttemptError::Completed));
    }

    #[test]
    fn abandon_is_rejected_once_submitting() {
        let mut attempt = build_attempt(Some(60));
        assert!(attempt.begin_submit().unwrap());
        let err = attempt.abandon(fixed_now()).unwrap_err();
        assert!(matches!(err, AttemptError::Completed));
    }

    #[test]
    fn progress_counts_answers_not_position() {
        let mut attempt = build_attempt(None);
        let now = fixed_now();
        attempt.next(now).unwrap();
        attempt.select_answer(AnswerChoice::B, now).unwrap();

        let progress = attempt.progress();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.remaining, 2);
        assert!(!progress.is_complete);
    }
}
