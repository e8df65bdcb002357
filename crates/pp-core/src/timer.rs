//! Stopwatch engine for productive and rework time.
//!
//! The engine is a plain state machine: it never owns a clock or a tick
//! source. Callers feed it one-second [`TimerEngine::tick`]s, or wall-clock
//! instants through [`TimerEngine::catch_up`], which credits every whole
//! second elapsed since the last credited instant.
//!
//! # States
//!
//! - `Idle`: never started, or reset.
//! - `Running`: ticks are credited to the session or rework counter.
//! - `Paused`: started before, not ticking now.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SECONDS_PER_MINUTE: u64 = 60;
pub const SECONDS_PER_HOUR: u64 = 3600;

/// Converts an hours/minutes pair into seconds.
pub const fn hm_to_seconds(hours: u64, minutes: u64) -> u64 {
    hours
        .saturating_mul(SECONDS_PER_HOUR)
        .saturating_add(minutes.saturating_mul(SECONDS_PER_MINUTE))
}

/// Rejected timer operations. All of them leave the engine unchanged.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// `add_manual_time` was called with zero hours and zero minutes.
    #[error("enter a number of hours or minutes to add")]
    ZeroManualTime,

    /// `save_session` was called with an empty session.
    #[error("there is no session time to save")]
    NothingToSave,

    /// `reset` would discard unsaved session time.
    #[error("reset would discard {seconds}s of unsaved session time; confirm to proceed")]
    ConfirmationRequired { seconds: u64 },
}

/// Lifecycle phase of the stopwatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerPhase {
    #[default]
    Idle,
    Running {
        /// Instant up to which elapsed time has been credited.
        last_tick_at: DateTime<Utc>,
    },
    Paused,
}

/// Persisted form of the timer.
///
/// Session and accumulated seconds are kept apart so that an unsaved
/// session survives a restart. `total_seconds` is the older merged format
/// and is only read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerSnapshot {
    pub accumulated_seconds: u64,
    pub session_seconds: u64,
    pub rework_seconds: u64,
    pub rework_mode: bool,
    pub running_since: Option<DateTime<Utc>>,
    pub paused: bool,
    #[serde(skip_serializing)]
    pub total_seconds: Option<u64>,
}

/// Stopwatch state for a single piece.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerEngine {
    phase: TimerPhase,
    rework_mode: bool,
    accumulated_seconds: u64,
    current_session_seconds: u64,
    rework_seconds: u64,
}

impl TimerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds an engine from its persisted form.
    ///
    /// A timer that was running keeps running from its last credited
    /// instant, so the time spent while nothing was ticking is credited on
    /// the next [`catch_up`](Self::catch_up).
    pub fn restore(snapshot: &TimerSnapshot) -> Self {
        let accumulated_seconds = match snapshot.total_seconds {
            Some(total) if snapshot.accumulated_seconds == 0 && snapshot.session_seconds == 0 => {
                total
            }
            _ => snapshot.accumulated_seconds,
        };
        let phase = match (snapshot.running_since, snapshot.paused) {
            (Some(last_tick_at), _) => TimerPhase::Running { last_tick_at },
            (None, true) => TimerPhase::Paused,
            (None, false) => TimerPhase::Idle,
        };
        Self {
            phase,
            rework_mode: snapshot.rework_mode,
            accumulated_seconds,
            current_session_seconds: snapshot.session_seconds,
            rework_seconds: snapshot.rework_seconds,
        }
    }

    /// Returns the persisted form of the engine.
    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            accumulated_seconds: self.accumulated_seconds,
            session_seconds: self.current_session_seconds,
            rework_seconds: self.rework_seconds,
            rework_mode: self.rework_mode,
            running_since: match self.phase {
                TimerPhase::Running { last_tick_at } => Some(last_tick_at),
                TimerPhase::Idle | TimerPhase::Paused => None,
            },
            paused: self.is_paused(),
            total_seconds: None,
        }
    }

    pub const fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub const fn is_running(&self) -> bool {
        matches!(self.phase, TimerPhase::Running { .. })
    }

    pub const fn is_paused(&self) -> bool {
        matches!(self.phase, TimerPhase::Paused)
    }

    pub const fn is_rework_mode(&self) -> bool {
        self.rework_mode
    }

    pub const fn accumulated_seconds(&self) -> u64 {
        self.accumulated_seconds
    }

    pub const fn current_session_seconds(&self) -> u64 {
        self.current_session_seconds
    }

    pub const fn rework_seconds(&self) -> u64 {
        self.rework_seconds
    }

    /// Seconds shown on the stopwatch face: the counter ticks currently target.
    pub const fn display_seconds(&self) -> u64 {
        if self.rework_mode {
            self.rework_seconds
        } else {
            self.current_session_seconds
        }
    }

    pub const fn total_productive_seconds(&self) -> u64 {
        self.accumulated_seconds
            .saturating_add(self.current_session_seconds)
    }

    pub const fn total_seconds_for_labor(&self) -> u64 {
        self.total_productive_seconds()
            .saturating_add(self.rework_seconds)
    }

    /// Starts or resumes ticking. Returns `false` if already running.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_running() {
            return false;
        }
        self.phase = TimerPhase::Running { last_tick_at: now };
        tracing::debug!(rework = self.rework_mode, "timer started");
        true
    }

    /// Pauses ticking after crediting the seconds elapsed up to `now`.
    ///
    /// Returns `false` (and changes nothing) if the timer was not running.
    pub fn pause(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_running() {
            return false;
        }
        self.catch_up(now);
        self.phase = TimerPhase::Paused;
        tracing::debug!(
            session = self.current_session_seconds,
            rework = self.rework_seconds,
            "timer paused"
        );
        true
    }

    /// Credits exactly one second. No-op unless running.
    pub fn tick(&mut self) -> bool {
        let TimerPhase::Running { last_tick_at } = self.phase else {
            return false;
        };
        self.credit(1);
        self.phase = TimerPhase::Running {
            last_tick_at: last_tick_at + Duration::seconds(1),
        };
        true
    }

    /// Credits every whole second between the last credited instant and `now`.
    ///
    /// Returns the number of seconds credited. The fractional remainder stays
    /// pending for the next call.
    pub fn catch_up(&mut self, now: DateTime<Utc>) -> u64 {
        let TimerPhase::Running { last_tick_at } = self.phase else {
            return 0;
        };
        let elapsed = (now - last_tick_at).num_seconds();
        let Ok(seconds) = u64::try_from(elapsed) else {
            return 0;
        };
        if seconds == 0 {
            return 0;
        }
        self.credit(seconds);
        self.phase = TimerPhase::Running {
            last_tick_at: last_tick_at + Duration::seconds(elapsed),
        };
        seconds
    }

    /// Whole seconds `catch_up(now)` would credit, without crediting them.
    pub fn pending_seconds(&self, now: DateTime<Utc>) -> u64 {
        let TimerPhase::Running { last_tick_at } = self.phase else {
            return 0;
        };
        u64::try_from((now - last_tick_at).num_seconds()).unwrap_or(0)
    }

    /// Flips rework mode. Elapsed time is credited to the previous mode first.
    ///
    /// Returns the new mode.
    pub fn toggle_rework(&mut self, now: DateTime<Utc>) -> bool {
        self.catch_up(now);
        self.rework_mode = !self.rework_mode;
        tracing::debug!(rework = self.rework_mode, "rework mode toggled");
        self.rework_mode
    }

    /// Returns to `Idle`, zeroing every counter and leaving rework mode.
    ///
    /// Unsaved session time is only discarded when `confirmed` is set.
    /// A rejected reset leaves the engine untouched.
    pub fn reset(&mut self, now: DateTime<Utc>, confirmed: bool) -> Result<(), TimerError> {
        let pending = if self.rework_mode {
            0
        } else {
            self.pending_seconds(now)
        };
        let session_seconds = self.current_session_seconds.saturating_add(pending);
        if session_seconds > 0 && !confirmed {
            return Err(TimerError::ConfirmationRequired {
                seconds: session_seconds,
            });
        }
        self.clear();
        Ok(())
    }

    /// Unconditionally returns to a pristine `Idle` engine.
    pub fn clear(&mut self) {
        *self = Self::default();
        tracing::debug!("timer reset");
    }

    /// Adds manually entered time to the accumulated total.
    ///
    /// Returns the number of seconds added.
    pub fn add_manual_time(&mut self, hours: u64, minutes: u64) -> Result<u64, TimerError> {
        let seconds = hm_to_seconds(hours, minutes);
        if seconds == 0 {
            return Err(TimerError::ZeroManualTime);
        }
        self.accumulated_seconds = self.accumulated_seconds.saturating_add(seconds);
        Ok(seconds)
    }

    /// Folds the current session into the accumulated total, pausing first.
    ///
    /// Returns the number of seconds folded.
    pub fn save_session(&mut self, now: DateTime<Utc>) -> Result<u64, TimerError> {
        self.catch_up(now);
        if self.current_session_seconds == 0 {
            return Err(TimerError::NothingToSave);
        }
        self.pause(now);
        let folded = self.current_session_seconds;
        self.accumulated_seconds = self.accumulated_seconds.saturating_add(folded);
        self.current_session_seconds = 0;
        Ok(folded)
    }

    /// Sets the accumulated total so that `accumulated + session` equals the
    /// entered time, clamping at zero.
    pub fn edit_total(&mut self, hours: u64, minutes: u64) {
        self.accumulated_seconds =
            hm_to_seconds(hours, minutes).saturating_sub(self.current_session_seconds);
    }

    /// Replaces the totals with those of a loaded piece or recipe.
    ///
    /// Stops ticking; the engine ends up `Paused` if it had been started and
    /// `Idle` otherwise.
    pub fn load_totals(&mut self, now: DateTime<Utc>, productive_seconds: u64, rework_seconds: u64) {
        self.pause(now);
        self.accumulated_seconds = productive_seconds;
        self.current_session_seconds = 0;
        self.rework_seconds = rework_seconds;
        self.rework_mode = false;
    }

    fn credit(&mut self, seconds: u64) {
        if self.rework_mode {
            self.rework_seconds = self.rework_seconds.saturating_add(seconds);
        } else {
            self.current_session_seconds = self.current_session_seconds.saturating_add(seconds);
        }
    }
}
