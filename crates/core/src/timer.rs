use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TimerError {
    #[error("timer can only be primed while loading")]
    NotLoading,
    #[error("timer can only be started once primed")]
    NotPrimed,
    #[error("timer is not submitting")]
    NotSubmitting,
}

//
// ─── PHASES ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of one countdown.
///
/// The clock is primed with the confirmed budget before it may start, so a
/// stale default can never tick down while the real budget is still loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Loading,
    Primed,
    Running,
    Submitting,
    Complete,
}

//
// ─── WARNINGS ──────────────────────────────────────────────────────────────────
//

/// Remaining-time thresholds that surface a banner to the candidate.
///
/// Each fires at most once per attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    HalfTime,
    TenMinutes,
    FiveMinutes,
    OneMinute,
    ThirtySeconds,
}

impl Warning {
    const ALL: [Warning; 5] = [
        Warning::HalfTime,
        Warning::TenMinutes,
        Warning::FiveMinutes,
        Warning::OneMinute,
        Warning::ThirtySeconds,
    ];

    /// Remaining-seconds threshold at which this warning arms.
    #[must_use]
    pub fn threshold_seconds(&self, budget_seconds: u32) -> u32 {
        match self {
            Warning::HalfTime => budget_seconds / 2,
            Warning::TenMinutes => 600,
            Warning::FiveMinutes => 300,
            Warning::OneMinute => 60,
            Warning::ThirtySeconds => 30,
        }
    }

    fn latch_index(self) -> usize {
        match self {
            Warning::HalfTime => 0,
            Warning::TenMinutes => 1,
            Warning::FiveMinutes => 2,
            Warning::OneMinute => 3,
            Warning::ThirtySeconds => 4,
        }
    }
}

// One-shot latches; a set flag never resets for the lifetime of the attempt.
#[derive(Debug, Clone, Copy, Default)]
struct WarningLatches {
    fired: [bool; 5],
}

impl WarningLatches {
    fn fire_once(&mut self, warning: Warning) -> bool {
        let slot = &mut self.fired[warning.latch_index()];
        if *slot {
            false
        } else {
            *slot = true;
            true
        }
    }

    fn has_fired(&self, warning: Warning) -> bool {
        self.fired[warning.latch_index()]
    }
}

//
// ─── PACE ──────────────────────────────────────────────────────────────────────
//

/// Comparison of time spent against questions traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    Behind,
    OnTrack,
    Ahead,
}

impl Pace {
    /// Deadband that keeps the indicator from flickering on small swings.
    pub const DEADBAND: f64 = 0.10;

    /// Classify progress from the fraction of time elapsed and the fraction
    /// of questions traversed (both in `0.0..=1.0`).
    #[must_use]
    pub fn classify(time_fraction: f64, question_fraction: f64) -> Pace {
        if question_fraction + Self::DEADBAND < time_fraction {
            Pace::Behind
        } else if question_fraction > time_fraction + Self::DEADBAND {
            Pace::Ahead
        } else {
            Pace::OnTrack
        }
    }
}

//
// ─── COUNTDOWN ─────────────────────────────────────────────────────────────────
//

/// Result of one clock tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tick {
    pub remaining_seconds: u32,
    /// Warnings whose latch flipped on this tick. Multiple thresholds can
    /// coincide on the same second.
    pub warnings: Vec<Warning>,
    /// True exactly once, on the tick that exhausts the budget. The timer has
    /// already left `Running` when this is reported.
    pub expired: bool,
}

/// Wall-clock countdown for one timed attempt.
///
/// Caller-driven: there is no internal thread, the owner calls [`tick`] once
/// per second. The countdown is a single resource for the whole attempt;
/// question navigation never pauses or resets it.
///
/// [`tick`]: CountdownTimer::tick
#[derive(Debug, Clone)]
pub struct CountdownTimer {
    phase: TimerPhase,
    budget_seconds: u32,
    remaining_seconds: u32,
    latches: WarningLatches,
}

impl CountdownTimer {
    /// Creates a countdown waiting for its budget.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: TimerPhase::Loading,
            budget_seconds: 0,
            remaining_seconds: 0,
            latches: WarningLatches::default(),
        }
    }

    /// Creates a countdown already primed and running with the given budget.
    ///
    /// Convenience for callers that receive the budget and question set
    /// together.
    #[must_use]
    pub fn started(budget_seconds: u32) -> Self {
        let mut timer = Self::new();
        // Both transitions are valid from a fresh timer.
        let _ = timer.prime(budget_seconds);
        let _ = timer.start();
        timer
    }

    #[must_use]
    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    #[must_use]
    pub fn budget_seconds(&self) -> u32 {
        self.budget_seconds
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> u32 {
        self.budget_seconds - self.remaining_seconds
    }

    /// Fraction of the budget consumed, in `0.0..=1.0`.
    #[must_use]
    pub fn elapsed_fraction(&self) -> f64 {
        if self.budget_seconds == 0 {
            return 0.0;
        }
        f64::from(self.elapsed_seconds()) / f64::from(self.budget_seconds)
    }

    /// Returns true once the given warning has fired.
    #[must_use]
    pub fn has_warned(&self, warning: Warning) -> bool {
        self.latches.has_fired(warning)
    }

    /// Set the confirmed time budget. `Loading → Primed`.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::NotLoading` if the budget was already set.
    pub fn prime(&mut self, budget_seconds: u32) -> Result<(), TimerError> {
        if self.phase != TimerPhase::Loading {
            return Err(TimerError::NotLoading);
        }
        self.budget_seconds = budget_seconds;
        self.remaining_seconds = budget_seconds;
        self.phase = TimerPhase::Primed;
        Ok(())
    }

    /// Start the countdown. `Primed → Running`.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::NotPrimed` unless a budget has been primed.
    pub fn start(&mut self) -> Result<(), TimerError> {
        if self.phase != TimerPhase::Primed {
            return Err(TimerError::NotPrimed);
        }
        self.phase = TimerPhase::Running;
        Ok(())
    }

    /// Advance the countdown by one second.
    ///
    /// Outside `Running` this is a no-op and returns `None`, which makes a
    /// straggler tick after submission harmless. The tick that reaches zero
    /// moves the timer to `Submitting` itself, so expiry can trigger
    /// auto-submission exactly once even if a manual submit lands on the same
    /// second.
    pub fn tick(&mut self) -> Option<Tick> {
        if self.phase != TimerPhase::Running {
            return None;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        let remaining = self.remaining_seconds;

        // Window detection rather than equality: ticks may not land on exact
        // second boundaries, so `remaining == threshold` could be skipped.
        let mut warnings = Vec::new();
        for warning in Warning::ALL {
            let threshold = warning.threshold_seconds(self.budget_seconds);
            let in_window = remaining <= threshold && remaining > threshold.saturating_sub(60);
            if in_window && self.latches.fire_once(warning) {
                warnings.push(warning);
            }
        }

        let expired = remaining == 0;
        if expired {
            self.phase = TimerPhase::Submitting;
        }

        Some(Tick {
            remaining_seconds: remaining,
            warnings,
            expired,
        })
    }

    /// Manual-submit path: stop the clock. `Running → Submitting`.
    ///
    /// Returns true only when this call performed the transition; a submit
    /// racing against expiry (or a double click) gets false and must not
    /// finalize again.
    pub fn begin_submit(&mut self) -> bool {
        if self.phase == TimerPhase::Running {
            self.phase = TimerPhase::Submitting;
            true
        } else {
            false
        }
    }

    /// Finalization done. `Submitting → Complete`, terminal.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::NotSubmitting` if no submission is in flight.
    pub fn complete(&mut self) -> Result<(), TimerError> {
        if self.phase != TimerPhase::Submitting {
            return Err(TimerError::NotSubmitting);
        }
        self.phase = TimerPhase::Complete;
        Ok(())
    }
}

impl Default for CountdownTimer {
    fn default() -> Self {
        Self::new()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prime_gates_the_start() {
        let mut timer = CountdownTimer::new();
        assert_eq!(timer.phase(), TimerPhase::Loading);
        assert!(timer.tick().is_none());
        assert_eq!(timer.start().unwrap_err(), TimerError::NotPrimed);

        timer.prime(120).unwrap();
        assert_eq!(timer.phase(), TimerPhase::Primed);
        assert_eq!(timer.remaining_seconds(), 120);
        assert_eq!(timer.prime(60).unwrap_err(), TimerError::NotLoading);
        assert!(timer.tick().is_none());

        timer.start().unwrap();
        assert_eq!(timer.phase(), TimerPhase::Running);
    }

    #[test]
    fn ticks_decrement_by_one_and_never_go_negative() {
        let mut timer = CountdownTimer::started(3);
        assert_eq!(timer.tick().unwrap().remaining_seconds, 2);
        assert_eq!(timer.tick().unwrap().remaining_seconds, 1);
        let last = timer.tick().unwrap();
        assert_eq!(last.remaining_seconds, 0);
        assert!(last.expired);
        // Timer has left Running; further ticks are no-ops.
        assert!(timer.tick().is_none());
        assert_eq!(timer.remaining_seconds(), 0);
    }

    #[test]
    fn expiry_fires_exactly_once() {
        let mut timer = CountdownTimer::started(2);
        let mut expiries = 0;
        for _ in 0..10 {
            if let Some(tick) = timer.tick() {
                if tick.expired {
                    expiries += 1;
                }
            }
        }
        assert_eq!(expiries, 1);
        assert_eq!(timer.phase(), TimerPhase::Submitting);
    }

    #[test]
    fn manual_submit_after_expiry_is_a_noop() {
        let mut timer = CountdownTimer::started(1);
        let tick = timer.tick().unwrap();
        assert!(tick.expired);
        // The auto path already owns the submission.
        assert!(!timer.begin_submit());
        timer.complete().unwrap();
        assert_eq!(timer.phase(), TimerPhase::Complete);
    }

    #[test]
    fn expiry_after_manual_submit_is_a_noop() {
        let mut timer = CountdownTimer::started(5);
        assert!(timer.begin_submit());
        assert!(!timer.begin_submit());
        assert!(timer.tick().is_none());
        assert_eq!(timer.remaining_seconds(), 5);
    }

    #[test]
    fn warning_latches_fire_once_inside_window() {
        // Budget 90s: half-time threshold is 45s with a (0, 45] window
        // clamped to 60s width.
        let mut timer = CountdownTimer::started(90);
        let mut half_time_count = 0;
        while let Some(tick) = timer.tick() {
            half_time_count += tick
                .warnings
                .iter()
                .filter(|w| **w == Warning::HalfTime)
                .count();
            if tick.expired {
                break;
            }
        }
        assert_eq!(half_time_count, 1);
        assert!(timer.has_warned(Warning::HalfTime));
        assert!(timer.has_warned(Warning::OneMinute));
        assert!(timer.has_warned(Warning::ThirtySeconds));
    }

    #[test]
    fn long_budget_fires_minute_thresholds_in_order() {
        let mut timer = CountdownTimer::started(660);
        let mut fired = Vec::new();
        while let Some(tick) = timer.tick() {
            fired.extend(tick.warnings.clone());
            if tick.expired {
                break;
            }
        }
        let ten_pos = fired.iter().position(|w| *w == Warning::TenMinutes);
        let five_pos = fired.iter().position(|w| *w == Warning::FiveMinutes);
        let one_pos = fired.iter().position(|w| *w == Warning::OneMinute);
        assert!(ten_pos < five_pos && five_pos < one_pos);
        assert_eq!(
            fired.iter().filter(|w| **w == Warning::TenMinutes).count(),
            1
        );
    }

    #[test]
    fn short_budget_never_fires_thresholds_above_it() {
        // 5-minute budget: the 10-minute window (540, 600] is unreachable.
        let mut timer = CountdownTimer::started(300);
        while let Some(tick) = timer.tick() {
            if tick.expired {
                break;
            }
        }
        assert!(!timer.has_warned(Warning::TenMinutes));
        assert!(timer.has_warned(Warning::FiveMinutes));
    }

    #[test]
    fn elapsed_tracks_budget_minus_remaining() {
        let mut timer = CountdownTimer::started(100);
        for _ in 0..40 {
            timer.tick();
        }
        assert_eq!(timer.elapsed_seconds(), 40);
        assert!((timer.elapsed_fraction() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn pace_classification_uses_deadband() {
        assert_eq!(Pace::classify(0.50, 0.30), Pace::Behind);
        assert_eq!(Pace::classify(0.50, 0.45), Pace::OnTrack);
        assert_eq!(Pace::classify(0.50, 0.55), Pace::OnTrack);
        assert_eq!(Pace::classify(0.50, 0.65), Pace::Ahead);
        // Boundary sits inside the deadband.
        assert_eq!(Pace::classify(0.50, 0.40), Pace::OnTrack);
        assert_eq!(Pace::classify(0.50, 0.60), Pace::OnTrack);
    }
}
